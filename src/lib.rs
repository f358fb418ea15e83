//! DuckGen builds generative collectible collections from layered trait assets.
//!
//! # Pipeline overview
//!
//! 1. **Mix**: `CollectionConfig + LayerSet -> Manifest` by weighted rejection sampling, with a
//!    SHA-256 DNA per attribute combination guaranteeing uniqueness within a run.
//! 2. **Compose**: `Artifact -> CompositionGraph` (ordered inputs and an overlay chain over them).
//! 3. **Render**: the graph is handed to an [`Encoder`] (system `ffmpeg` by default) with
//!    skip-if-exists, bounded retry and an advisory [`OutputVerifier`] check via [`Prober`].
//! 4. **Report** (optional): per-artifact metadata files and a trait usage summary.
//!
//! Randomness always comes from a cryptographically secure generator; tests inject a seeded one.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod compose;
mod config;
mod encode;
mod foundation;
mod generate;
mod render;
mod report;

pub use compose::graph::{CompositionGraph, GraphBuilder, GraphInput, MissingAsset, NodeLabel, Pass};
pub use config::collection::{CollectionConfig, RenderSettings};
pub use config::layers::{Layer, LayerSet, Trait};
pub use encode::ffmpeg::{
    FfmpegEncoder, FfprobeProber, ensure_parent_dir, is_ffmpeg_on_path, is_tool_on_path,
};
pub use encode::{Encoder, ProbeInfo, Prober};
pub use foundation::core::{CancelToken, Canvas, Fps};
pub use foundation::error::{DuckgenError, DuckgenResult};
pub use generate::dna::{Dna, DnaSet, fingerprint};
pub use generate::manifest::{Artifact, Attribute, Manifest};
pub use generate::mixer::{Generation, GenerationReport, TraitMixer, generate_collection};
pub use generate::sampler::WeightedSampler;
pub use render::batch::{BatchOptions, BatchReport, RenderThreading, render_manifest};
pub use render::executor::{MAX_RENDER_ATTEMPTS, RenderExecutor, RenderResult, RenderStatus};
pub use render::log::{LogEvent, RenderLog};
pub use render::verify::{ExpectedOutput, OutputVerifier, Verification};
pub use report::metadata::{
    ArtifactMetadata, CollectionInfo, MetadataAttribute, build_metadata, write_metadata,
};
pub use report::summary::{LayerUsage, TraitCount, TraitSummary};
