use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::config::collection::RenderSettings;
use crate::foundation::error::{DuckgenError, DuckgenResult};

/// One candidate value within a layer.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Trait {
    /// Trait value; also the asset file stem.
    pub name: String,
    /// Selection weight. Zero-weight traits are never selected.
    pub weight: u32,
}

/// A visual slot in the compositing stack (`config/layers.json` entry).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Layer name; also the asset directory name.
    pub name: String,
    /// Compositing order (ascending, lowest is the base).
    pub order: i64,
    /// Display name used as the attribute type; defaults to `name`.
    #[serde(default)]
    pub trait_type: Option<String>,
    /// Inclusion probability in percent (0-100). Ignored when `required`.
    #[serde(default)]
    pub rarity: u32,
    /// Always include this layer.
    #[serde(default)]
    pub required: bool,
    /// Layer assets are video clips rather than still images.
    #[serde(default)]
    pub animated: bool,
    /// Extension for animated assets; falls back to the render default.
    #[serde(default)]
    pub video_ext: Option<String>,
    /// Candidate traits.
    #[serde(default)]
    pub traits: Vec<Trait>,
}

impl Layer {
    /// Attribute type recorded on artifacts for this layer.
    pub fn trait_type(&self) -> &str {
        self.trait_type.as_deref().unwrap_or(&self.name)
    }

    /// Asset file extension for this layer under `settings`.
    pub fn asset_extension<'a>(&'a self, settings: &'a RenderSettings) -> &'a str {
        if self.animated {
            self.video_ext
                .as_deref()
                .unwrap_or(&settings.default_video_ext)
        } else {
            &settings.static_ext
        }
    }

    fn validate(&self) -> DuckgenResult<()> {
        if self.name.is_empty() {
            return Err(DuckgenError::validation("layer name must be non-empty"));
        }
        check_path_component("layer", &self.name)?;
        if self.rarity > 100 {
            return Err(DuckgenError::validation(format!(
                "layer '{}' rarity must be within 0..=100 (got {})",
                self.name, self.rarity
            )));
        }
        for t in &self.traits {
            if t.name.is_empty() {
                return Err(DuckgenError::validation(format!(
                    "layer '{}' has a trait with an empty name",
                    self.name
                )));
            }
            check_path_component(&format!("layer '{}' trait", self.name), &t.name)?;
        }
        Ok(())
    }
}

/// Layer and trait names become `traits/<layer>/<trait>.<ext>` path segments.
fn check_path_component(what: &str, name: &str) -> DuckgenResult<()> {
    if name.contains(['/', '\\']) || name.contains("..") {
        return Err(DuckgenError::validation(format!(
            "{what} name '{name}' must not contain path separators or '..'"
        )));
    }
    Ok(())
}

/// Layers sorted by compositing order.
///
/// The sort is stable, so layers sharing an `order` keep their file order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerSet {
    layers: Vec<Layer>,
}

impl LayerSet {
    /// Sort `layers` by `order` and validate them.
    pub fn new(mut layers: Vec<Layer>) -> DuckgenResult<Self> {
        layers.sort_by_key(|l| l.order);
        let set = Self { layers };
        set.validate()?;
        Ok(set)
    }

    /// Parse a layer list from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> DuckgenResult<Self> {
        let layers: Vec<Layer> = serde_json::from_reader(r)
            .map_err(|e| DuckgenError::validation(format!("parse layers JSON: {e}")))?;
        Self::new(layers)
    }

    /// Parse a layer list from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> DuckgenResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            DuckgenError::validation(format!("open layers JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    fn validate(&self) -> DuckgenResult<()> {
        if self.layers.is_empty() {
            return Err(DuckgenError::validation("at least one layer is required"));
        }
        let mut seen = BTreeSet::new();
        for l in &self.layers {
            l.validate()?;
            if !seen.insert(l.name.as_str()) {
                return Err(DuckgenError::validation(format!(
                    "duplicate layer name '{}'",
                    l.name
                )));
            }
        }
        Ok(())
    }

    /// Layers in compositing order.
    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    /// Look up a layer by name.
    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Return `true` when there are no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl<'a> IntoIterator for &'a LayerSet {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/layers.rs"]
mod tests;
