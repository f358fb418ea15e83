use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{DuckgenError, DuckgenResult};

/// One selected trait on an artifact.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Attribute {
    /// Layer the trait was drawn from.
    pub layer: String,
    /// Display type (the layer's `traitType`).
    pub trait_type: String,
    /// Selected trait name.
    pub value: String,
}

/// A generated, unique attribute combination.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Artifact {
    /// Sequential id, starting at the collection's `startIndex`.
    pub id: u64,
    /// `{prefix}#{id}`.
    pub filename: String,
    /// Attributes in compositing order.
    #[serde(rename = "traits")]
    pub attributes: Vec<Attribute>,
    /// Golden marker flag.
    #[serde(rename = "goldenEgg", default)]
    pub golden: bool,
}

impl Artifact {
    /// Derive the artifact filename for `prefix` and `id`.
    pub fn filename_for(prefix: &str, id: u64) -> String {
        format!("{prefix}#{id}")
    }

    /// Attribute drawn from `layer`, if any.
    pub fn attribute_for(&self, layer: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.layer == layer)
    }

    /// Output file name with `ext` appended.
    pub fn output_file_name(&self, ext: &str) -> String {
        format!("{}.{ext}", self.filename)
    }
}

/// Ordered artifact list: the hand-off between generation and composition (`traitList.json`).
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    /// Artifacts in generation order.
    pub artifacts: Vec<Artifact>,
}

impl Manifest {
    /// Parse a manifest from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> DuckgenResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| DuckgenError::serde(format!("parse manifest JSON: {e}")))
    }

    /// Parse a manifest from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> DuckgenResult<Self> {
        let path = path.as_ref();
        let f = File::open(path)
            .with_context(|| format!("open manifest '{}'", path.display()))?;
        Self::from_reader(BufReader::new(f))
    }

    /// Write the manifest as pretty-printed JSON, creating parent directories.
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> DuckgenResult<()> {
        let path = path.as_ref();
        crate::encode::ffmpeg::ensure_parent_dir(path)?;
        let f = File::create(path)
            .with_context(|| format!("create manifest '{}'", path.display()))?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, self)
            .map_err(|e| DuckgenError::serde(format!("serialize manifest: {e}")))?;
        w.flush()
            .with_context(|| format!("flush manifest '{}'", path.display()))?;
        Ok(())
    }

    /// Number of artifacts.
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Return `true` when the manifest has no artifacts.
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Number of golden-marked artifacts.
    pub fn golden_count(&self) -> usize {
        self.artifacts.iter().filter(|a| a.golden).count()
    }

    /// First `limit` artifacts, or all when `limit` is `None`.
    pub fn limited(&self, limit: Option<usize>) -> &[Artifact] {
        match limit {
            Some(n) => &self.artifacts[..n.min(self.artifacts.len())],
            None => &self.artifacts,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/generate/manifest.rs"]
mod tests;
