//! Trait mixing: weighted selection, DNA uniqueness, and the artifact manifest.

/// DNA fingerprints and the per-run uniqueness set.
pub mod dna;
/// Artifact manifest (`traitList.json`).
pub mod manifest;
/// Rejection-sampling collection generator.
pub mod mixer;
/// Weighted random selection over a CSPRNG.
pub mod sampler;
