use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::Context as _;

use crate::foundation::error::{DuckgenError, DuckgenResult};

/// A significant per-artifact render event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogEvent {
    /// Output already existed; nothing was encoded.
    Skipped {
        /// Output file name.
        file: String,
    },
    /// A layer asset was missing and the layer was left out.
    MissingAsset {
        /// Output file name.
        file: String,
        /// Layer name.
        layer: String,
        /// Expected asset path.
        path: PathBuf,
    },
    /// No layer resolved to an existing asset.
    NoComposableLayers {
        /// Output file name.
        file: String,
    },
    /// An encode attempt failed and will be retried.
    Retry {
        /// Output file name.
        file: String,
        /// 1-based attempt that failed.
        attempt: u32,
        /// Failure reason.
        reason: String,
    },
    /// All attempts failed.
    Failed {
        /// Output file name.
        file: String,
        /// Attempts used.
        attempts: u32,
        /// Last failure reason.
        reason: String,
    },
    /// Rendered and verified.
    Verified {
        /// Output file name.
        file: String,
    },
    /// Rendered, but verification did not pass.
    FormatWarning {
        /// Output file name.
        file: String,
        /// Mismatch or probe failure description.
        reason: String,
    },
    /// Not rendered because the run was cancelled.
    Cancelled {
        /// Output file name.
        file: String,
    },
}

impl std::fmt::Display for LogEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skipped { file } => write!(f, "SKIP {file} (already exists)"),
            Self::MissingAsset { file, layer, path } => write!(
                f,
                "MISSING {file}: {} for layer '{layer}', skipping this layer",
                path.display()
            ),
            Self::NoComposableLayers { file } => {
                write!(f, "FAIL {file}: no usable traits, skipping")
            }
            Self::Retry {
                file,
                attempt,
                reason,
            } => write!(f, "RETRY {file} (attempt {attempt} failed: {reason})"),
            Self::Failed {
                file,
                attempts,
                reason,
            } => write!(
                f,
                "FAIL {file}: render failed after {attempts} attempts: {reason}"
            ),
            Self::Verified { file } => write!(f, "OK {file} rendered & verified"),
            Self::FormatWarning { file, reason } => {
                write!(f, "WARN {file}: format warning: {reason}")
            }
            Self::Cancelled { file } => write!(f, "CANCEL {file} (run cancelled)"),
        }
    }
}

enum Sink {
    File(BufWriter<File>),
    Memory(Vec<u8>),
}

impl Sink {
    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Sink::File(w) => w,
            Sink::Memory(v) => v,
        }
    }
}

/// Append-only, human-readable render log (`render_log.txt`).
///
/// One line per event. Safe to share between render workers; lines from different workers may
/// interleave but are never torn.
pub struct RenderLog {
    sink: Mutex<Sink>,
}

impl RenderLog {
    /// Create (truncate) the log file at `path` and write the timestamped header.
    pub fn create(path: impl AsRef<Path>) -> DuckgenResult<Self> {
        let path = path.as_ref();
        crate::encode::ffmpeg::ensure_parent_dir(path)?;
        let f = File::create(path)
            .with_context(|| format!("create render log '{}'", path.display()))?;
        Self::open(Sink::File(BufWriter::new(f)))
    }

    /// Log held in memory; read it back with [`RenderLog::contents`].
    pub fn in_memory() -> Self {
        let mut sink = Sink::Memory(Vec::new());
        // Writing to a Vec cannot fail.
        let _ = write_header(sink.writer());
        Self {
            sink: Mutex::new(sink),
        }
    }

    fn open(mut sink: Sink) -> DuckgenResult<Self> {
        write_header(sink.writer()).context("write render log header")?;
        Ok(Self {
            sink: Mutex::new(sink),
        })
    }

    /// Append one event line. Write failures are traced, never propagated.
    pub fn record(&self, event: &LogEvent) {
        match event {
            LogEvent::Verified { .. } | LogEvent::Skipped { .. } => {
                tracing::info!(%event, "render")
            }
            LogEvent::Failed { .. } | LogEvent::NoComposableLayers { .. } => {
                tracing::error!(%event, "render")
            }
            _ => tracing::warn!(%event, "render"),
        }

        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(sink.writer(), "{event}") {
            tracing::error!(error = %e, "failed to append to render log");
        }
    }

    /// Flush buffered lines to the underlying file.
    pub fn flush(&self) -> DuckgenResult<()> {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.writer()
            .flush()
            .map_err(|e| DuckgenError::Other(anyhow::Error::new(e).context("flush render log")))
    }

    /// Log text for in-memory logs; `None` for file-backed logs.
    pub fn contents(&self) -> Option<String> {
        let sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        match &*sink {
            Sink::Memory(v) => Some(String::from_utf8_lossy(v).into_owned()),
            Sink::File(_) => None,
        }
    }
}

fn write_header(w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "DuckGen Render Log - {}\n",
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    )
}

#[cfg(test)]
#[path = "../../tests/unit/render/log.rs"]
mod tests;
