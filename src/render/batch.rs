use rayon::prelude::*;

use crate::compose::graph::GraphBuilder;
use crate::foundation::error::{DuckgenError, DuckgenResult};
use crate::generate::manifest::{Artifact, Manifest};
use crate::render::executor::{RenderExecutor, RenderResult, RenderStatus};
use crate::render::verify::Verification;

/// Worker configuration for [`render_manifest`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderThreading {
    /// Concurrent artifact renders. `1` renders sequentially on the calling thread.
    pub workers: usize,
}

impl Default for RenderThreading {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

/// Options for [`render_manifest`].
#[derive(Clone, Debug, Default)]
pub struct BatchOptions {
    /// Render only the first `limit` artifacts of the manifest.
    pub limit: Option<usize>,
    /// Worker pool settings.
    pub threading: RenderThreading,
}

/// Outcome of a batch render, ordered by artifact id.
#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    /// Per-artifact results for every artifact that reached the executor.
    pub results: Vec<RenderResult>,
    /// Artifacts with no layer resolving to an existing asset.
    pub uncomposable: Vec<Artifact>,
}

impl BatchReport {
    fn count(&self, f: impl Fn(&RenderResult) -> bool) -> usize {
        self.results.iter().filter(|r| f(r)).count()
    }

    /// Newly rendered outputs.
    pub fn rendered(&self) -> usize {
        self.count(|r| r.status == RenderStatus::Rendered)
    }

    /// Outputs that already existed.
    pub fn skipped(&self) -> usize {
        self.count(|r| r.status == RenderStatus::Skipped)
    }

    /// Artifacts whose attempts were all exhausted.
    pub fn failed(&self) -> usize {
        self.count(|r| matches!(r.status, RenderStatus::Failed(_)))
    }

    /// Rendered outputs with a verification warning.
    pub fn warned(&self) -> usize {
        self.count(|r| matches!(r.verification, Verification::Warned(_)))
    }

    /// Artifacts not rendered because the run was cancelled.
    pub fn cancelled(&self) -> usize {
        self.count(|r| r.status == RenderStatus::Cancelled)
    }

    /// `true` when any artifact failed or had nothing to compose.
    pub fn has_failures(&self) -> bool {
        self.failed() > 0 || !self.uncomposable.is_empty()
    }
}

enum Outcome {
    Done(RenderResult),
    Uncomposable(Artifact),
}

/// Render the manifest's artifacts with `executor`.
///
/// A per-artifact failure never aborts the batch: exhausted retries come back as
/// [`RenderStatus::Failed`] and artifacts with nothing to compose are listed in
/// [`BatchReport::uncomposable`]. Only configuration errors are returned as `Err`.
#[tracing::instrument(skip_all, fields(artifacts = manifest.len(), workers = opts.threading.workers))]
pub fn render_manifest(
    manifest: &Manifest,
    executor: &RenderExecutor<'_>,
    builder: &GraphBuilder<'_>,
    opts: &BatchOptions,
) -> DuckgenResult<BatchReport> {
    let artifacts = manifest.limited(opts.limit);

    let outcomes: Vec<Outcome> = if opts.threading.workers == 1 {
        artifacts
            .iter()
            .map(|a| render_one(a, executor, builder))
            .collect::<DuckgenResult<_>>()?
    } else {
        let pool = build_thread_pool(opts.threading.workers)?;
        pool.install(|| {
            artifacts
                .par_iter()
                .map(|a| render_one(a, executor, builder))
                .collect::<DuckgenResult<_>>()
        })?
    };

    let mut report = BatchReport::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Done(r) => report.results.push(r),
            Outcome::Uncomposable(a) => report.uncomposable.push(a),
        }
    }
    report.results.sort_by_key(|r| r.artifact.id);
    report.uncomposable.sort_by_key(|a| a.id);

    executor.log().flush()?;
    tracing::info!(
        rendered = report.rendered(),
        skipped = report.skipped(),
        failed = report.failed(),
        warned = report.warned(),
        uncomposable = report.uncomposable.len(),
        cancelled = report.cancelled(),
        "render batch finished"
    );
    Ok(report)
}

fn render_one(
    artifact: &Artifact,
    executor: &RenderExecutor<'_>,
    builder: &GraphBuilder<'_>,
) -> DuckgenResult<Outcome> {
    if executor.cancel_token().is_cancelled() {
        let path = executor.output_path(artifact);
        return Ok(Outcome::Done(executor.cancelled(artifact, path, 0)));
    }
    match executor.render_artifact(artifact, builder) {
        Ok(r) => Ok(Outcome::Done(r)),
        Err(DuckgenError::NoComposableLayers { .. }) => {
            Ok(Outcome::Uncomposable(artifact.clone()))
        }
        Err(e) => Err(e),
    }
}

fn build_thread_pool(workers: usize) -> DuckgenResult<rayon::ThreadPool> {
    if workers == 0 {
        return Err(DuckgenError::validation("render workers must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| DuckgenError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/batch.rs"]
mod tests;
