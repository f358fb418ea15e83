//! External encoder and prober capabilities.
//!
//! The render executor only sees these traits; how the external tool is invoked (a blocking
//! child process today) stays behind them.

/// System `ffmpeg`/`ffprobe` implementations.
pub mod ffmpeg;

use std::path::Path;

use crate::compose::graph::CompositionGraph;
use crate::foundation::core::CancelToken;
use crate::foundation::error::DuckgenResult;

/// Technical properties of a produced media file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeInfo {
    /// Video codec name (for example `h264`).
    pub codec: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format (for example `yuv420p`).
    pub pixel_format: String,
}

impl std::fmt::Display for ProbeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "codec={} width={} height={} pix_fmt={}",
            self.codec, self.width, self.height, self.pixel_format
        )
    }
}

/// Turns a composition graph into a media file at `out_path`.
///
/// Implementations block until the file is complete or the attempt failed, and should stop early
/// when `cancel` is triggered.
pub trait Encoder: Send + Sync {
    /// Encode `graph` into `out_path`.
    fn encode(
        &self,
        graph: &CompositionGraph,
        out_path: &Path,
        cancel: &CancelToken,
    ) -> DuckgenResult<()>;
}

/// Reads technical properties back from a produced file.
pub trait Prober: Send + Sync {
    /// Probe the first video stream of `path`.
    fn probe(&self, path: &Path) -> DuckgenResult<ProbeInfo>;
}
