use std::path::{Path, PathBuf};

use crate::compose::graph::{CompositionGraph, GraphBuilder};
use crate::encode::Encoder;
use crate::foundation::core::CancelToken;
use crate::foundation::error::{DuckgenError, DuckgenResult};
use crate::generate::manifest::Artifact;
use crate::render::log::{LogEvent, RenderLog};
use crate::render::verify::{OutputVerifier, Verification};

/// Total encode attempts per artifact.
pub const MAX_RENDER_ATTEMPTS: u32 = 3;

/// Final state of one artifact in a render run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderStatus {
    /// A new output file was produced.
    Rendered,
    /// The output already existed; the encoder was not invoked.
    Skipped,
    /// Every attempt failed; carries the last error.
    Failed(String),
    /// Not rendered because the run was cancelled.
    Cancelled,
}

/// Per-artifact outcome.
#[derive(Clone, Debug)]
pub struct RenderResult {
    /// Rendered artifact.
    pub artifact: Artifact,
    /// Final output path.
    pub output_path: PathBuf,
    /// Outcome.
    pub status: RenderStatus,
    /// Encoder invocations made.
    pub attempts_used: u32,
    /// Verification outcome (`NotRun` unless rendered).
    pub verification: Verification,
}

/// Renders one artifact at a time: skip-if-exists, bounded retry, temp-then-rename, verify.
pub struct RenderExecutor<'a> {
    encoder: &'a dyn Encoder,
    verifier: OutputVerifier<'a>,
    log: &'a RenderLog,
    output_dir: PathBuf,
    output_extension: String,
    max_attempts: u32,
    cancel: CancelToken,
}

impl<'a> RenderExecutor<'a> {
    /// Create an executor writing `<filename>.<ext>` files into `output_dir`.
    pub fn new(
        encoder: &'a dyn Encoder,
        verifier: OutputVerifier<'a>,
        log: &'a RenderLog,
        output_dir: impl Into<PathBuf>,
        output_extension: impl Into<String>,
    ) -> Self {
        Self {
            encoder,
            verifier,
            log,
            output_dir: output_dir.into(),
            output_extension: output_extension.into(),
            max_attempts: MAX_RENDER_ATTEMPTS,
            cancel: CancelToken::new(),
        }
    }

    /// Override the attempt ceiling (minimum 1).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Observe `cancel` between attempts and inside the encoder.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Shared render log.
    pub fn log(&self) -> &RenderLog {
        self.log
    }

    /// Cancellation token observed by this executor.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Final output path for `artifact`.
    pub fn output_path(&self, artifact: &Artifact) -> PathBuf {
        self.output_dir
            .join(artifact.output_file_name(&self.output_extension))
    }

    /// Temporary path the encoder writes to before the final rename.
    pub fn partial_path(&self, artifact: &Artifact) -> PathBuf {
        self.output_dir.join(format!(
            ".{}.partial.{}",
            artifact.filename, self.output_extension
        ))
    }

    /// Skip, or build the graph with `builder` and render it.
    ///
    /// Missing assets are logged per layer. Returns [`DuckgenError::NoComposableLayers`] when the
    /// artifact has nothing to compose.
    pub fn render_artifact(
        &self,
        artifact: &Artifact,
        builder: &GraphBuilder<'_>,
    ) -> DuckgenResult<RenderResult> {
        let output_path = self.output_path(artifact);
        if output_path.exists() {
            return Ok(self.skipped(artifact, output_path));
        }
        if self.cancel.is_cancelled() {
            return Ok(self.cancelled(artifact, output_path, 0));
        }

        let file = artifact.output_file_name(&self.output_extension);
        let mut missing = Vec::new();
        let built = builder.build(artifact, &mut missing);
        for m in missing {
            self.log.record(&LogEvent::MissingAsset {
                file: file.clone(),
                layer: m.layer,
                path: m.path,
            });
        }
        match built {
            Ok(graph) => Ok(self.render(artifact, &graph)),
            Err(e @ DuckgenError::NoComposableLayers { .. }) => {
                self.log.record(&LogEvent::NoComposableLayers { file });
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Render `graph` for `artifact`.
    ///
    /// An existing output is returned as `Skipped` without invoking the encoder. Otherwise the
    /// encoder runs up to the attempt ceiling with the same graph; a final failure is returned as
    /// `Failed`, never as an error.
    #[tracing::instrument(skip_all, fields(artifact = %artifact.filename))]
    pub fn render(&self, artifact: &Artifact, graph: &CompositionGraph) -> RenderResult {
        let output_path = self.output_path(artifact);
        if output_path.exists() {
            return self.skipped(artifact, output_path);
        }

        let file = artifact.output_file_name(&self.output_extension);
        let partial = self.partial_path(artifact);
        let mut attempts = 0u32;
        let mut last_error = String::new();

        while attempts < self.max_attempts {
            if self.cancel.is_cancelled() {
                return self.cancelled(artifact, output_path, attempts);
            }
            attempts += 1;
            remove_if_exists(&partial);

            let outcome = self
                .encoder
                .encode(graph, &partial, &self.cancel)
                .and_then(|()| promote(&partial, &output_path));
            match outcome {
                Ok(()) => {
                    let verification = self.verifier.verify(&output_path);
                    match &verification {
                        Verification::Warned(reason) => {
                            self.log.record(&LogEvent::FormatWarning {
                                file,
                                reason: reason.clone(),
                            })
                        }
                        _ => self.log.record(&LogEvent::Verified { file }),
                    }
                    return RenderResult {
                        artifact: artifact.clone(),
                        output_path,
                        status: RenderStatus::Rendered,
                        attempts_used: attempts,
                        verification,
                    };
                }
                Err(DuckgenError::Cancelled) => {
                    remove_if_exists(&partial);
                    return self.cancelled(artifact, output_path, attempts);
                }
                Err(e) => {
                    remove_if_exists(&partial);
                    last_error = e.to_string();
                    if attempts < self.max_attempts {
                        self.log.record(&LogEvent::Retry {
                            file: file.clone(),
                            attempt: attempts,
                            reason: last_error.clone(),
                        });
                    }
                }
            }
        }

        self.log.record(&LogEvent::Failed {
            file,
            attempts,
            reason: last_error.clone(),
        });
        RenderResult {
            artifact: artifact.clone(),
            output_path,
            status: RenderStatus::Failed(last_error),
            attempts_used: attempts,
            verification: Verification::NotRun,
        }
    }

    fn skipped(&self, artifact: &Artifact, output_path: PathBuf) -> RenderResult {
        self.log.record(&LogEvent::Skipped {
            file: artifact.output_file_name(&self.output_extension),
        });
        RenderResult {
            artifact: artifact.clone(),
            output_path,
            status: RenderStatus::Skipped,
            attempts_used: 0,
            verification: Verification::NotRun,
        }
    }

    pub(crate) fn cancelled(
        &self,
        artifact: &Artifact,
        output_path: PathBuf,
        attempts: u32,
    ) -> RenderResult {
        self.log.record(&LogEvent::Cancelled {
            file: artifact.output_file_name(&self.output_extension),
        });
        RenderResult {
            artifact: artifact.clone(),
            output_path,
            status: RenderStatus::Cancelled,
            attempts_used: attempts,
            verification: Verification::NotRun,
        }
    }
}

fn promote(partial: &Path, output: &Path) -> DuckgenResult<()> {
    if !partial.is_file() {
        return Err(DuckgenError::encode(format!(
            "encoder reported success but '{}' was not written",
            partial.display()
        )));
    }
    std::fs::rename(partial, output).map_err(|e| {
        DuckgenError::encode(format!(
            "failed to move '{}' to '{}': {e}",
            partial.display(),
            output.display()
        ))
    })
}

fn remove_if_exists(path: &Path) {
    if path.exists()
        && let Err(e) = std::fs::remove_file(path)
    {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove partial output");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/executor.rs"]
mod tests;
