//! Post-generation reports: marketplace metadata and trait statistics.

/// Per-artifact and master metadata files.
pub mod metadata;
/// Trait usage summary.
pub mod summary;
