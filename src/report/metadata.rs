use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use anyhow::Context as _;

use crate::config::collection::CollectionConfig;
use crate::foundation::error::{DuckgenError, DuckgenResult};
use crate::generate::manifest::{Artifact, Manifest};

/// Collection block embedded in every metadata record.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CollectionInfo {
    /// Collection display name.
    pub name: String,
    /// Collection description.
    pub description: String,
}

/// Marketplace-style attribute.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetadataAttribute {
    /// Display trait type.
    pub trait_type: String,
    /// Trait value.
    pub value: String,
}

/// Public metadata for one artifact (`output/metadata/<filename>.json`).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ArtifactMetadata {
    /// Artifact filename.
    pub name: String,
    /// Rendered video file name.
    pub video: String,
    /// Still preview file name.
    pub image: String,
    /// Collection info.
    pub collection: CollectionInfo,
    /// Attributes in compositing order.
    pub attributes: Vec<MetadataAttribute>,
}

impl ArtifactMetadata {
    /// Build the record for `artifact`.
    pub fn for_artifact(artifact: &Artifact, config: &CollectionConfig) -> Self {
        Self {
            name: artifact.filename.clone(),
            video: artifact.output_file_name(&config.render.output_extension),
            image: artifact.output_file_name(&config.render.static_ext),
            collection: CollectionInfo {
                name: config.collection_name.clone(),
                description: config.description.clone(),
            },
            attributes: artifact
                .attributes
                .iter()
                .map(|a| MetadataAttribute {
                    trait_type: if a.trait_type.is_empty() {
                        a.layer.clone()
                    } else {
                        a.trait_type.clone()
                    },
                    value: a.value.clone(),
                })
                .collect(),
        }
    }
}

/// Build metadata records for the whole manifest, in manifest order.
pub fn build_metadata(manifest: &Manifest, config: &CollectionConfig) -> Vec<ArtifactMetadata> {
    manifest
        .artifacts
        .iter()
        .map(|a| ArtifactMetadata::for_artifact(a, config))
        .collect()
}

/// Write one JSON file per artifact into `metadata_dir` plus the combined array at `master_path`.
pub fn write_metadata(
    manifest: &Manifest,
    config: &CollectionConfig,
    metadata_dir: &Path,
    master_path: &Path,
) -> DuckgenResult<Vec<ArtifactMetadata>> {
    std::fs::create_dir_all(metadata_dir)
        .with_context(|| format!("create metadata dir '{}'", metadata_dir.display()))?;

    let records = build_metadata(manifest, config);
    for record in &records {
        write_json(&metadata_dir.join(format!("{}.json", record.name)), record)?;
    }
    write_json(master_path, &records)?;

    tracing::info!(
        count = records.len(),
        dir = %metadata_dir.display(),
        master = %master_path.display(),
        "metadata written"
    );
    Ok(records)
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> DuckgenResult<()> {
    crate::encode::ffmpeg::ensure_parent_dir(path)?;
    let f = File::create(path).with_context(|| format!("create '{}'", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, value)
        .map_err(|e| DuckgenError::serde(format!("serialize '{}': {e}", path.display())))?;
    w.flush()
        .with_context(|| format!("flush '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/report/metadata.rs"]
mod tests;
