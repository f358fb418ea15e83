//! Shared primitives: error taxonomy, canvas/frame-rate types, cancellation.

/// Canvas, frame rate and cancellation token.
pub mod core;
/// `DuckgenError` and `DuckgenResult`.
pub mod error;
