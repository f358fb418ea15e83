//! Render stage: per-artifact execution, verification, logging, and the batch driver.

/// Batch driver with limit, worker pool and cancellation.
pub mod batch;
/// Single-artifact executor.
pub mod executor;
/// `render_log.txt` writer.
pub mod log;
/// Post-render format checks.
pub mod verify;
