use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::error::{DuckgenError, DuckgenResult};

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a validated canvas.
    ///
    /// Both dimensions must be non-zero and even (required for yuv420p output).
    pub fn new(width: u32, height: u32) -> DuckgenResult<Self> {
        if width == 0 || height == 0 {
            return Err(DuckgenError::validation(
                "canvas width/height must be non-zero",
            ));
        }
        if !width.is_multiple_of(2) || !height.is_multiple_of(2) {
            return Err(DuckgenError::validation(
                "canvas width/height must be even (required for yuv420p output)",
            ));
        }
        Ok(Self { width, height })
    }
}

/// Integer frames-per-second used for output and animated-layer normalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps(pub u32);

impl Fps {
    /// Create a validated frame rate.
    pub fn new(fps: u32) -> DuckgenResult<Self> {
        if fps == 0 {
            return Err(DuckgenError::validation("fps must be non-zero"));
        }
        Ok(Self(fps))
    }
}

/// Run-level cancellation flag shared between the batch driver, workers and encoders.
///
/// Cloning yields a handle to the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the "not cancelled" state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Return `true` once [`CancelToken::cancel`] has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Return [`DuckgenError::Cancelled`] when cancellation was requested.
    pub fn check(&self) -> DuckgenResult<()> {
        if self.is_cancelled() {
            return Err(DuckgenError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
