use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use anyhow::Context as _;

use crate::config::layers::LayerSet;
use crate::foundation::error::DuckgenResult;
use crate::generate::manifest::Manifest;

/// Occurrences of one trait value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraitCount {
    /// Trait value.
    pub value: String,
    /// Artifacts carrying it.
    pub count: usize,
}

/// Usage of one trait type across the manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerUsage {
    /// Display trait type.
    pub trait_type: String,
    /// Artifacts carrying any trait of this type.
    pub count: usize,
    /// Values sorted by descending count, then by name.
    pub traits: Vec<TraitCount>,
}

/// Collection-wide trait statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraitSummary {
    /// Artifact count.
    pub total: usize,
    /// Golden-marked artifacts.
    pub golden: usize,
    /// Per trait type, in compositing order.
    pub layers: Vec<LayerUsage>,
}

impl TraitSummary {
    /// Tally `manifest`, ordering trait types by `layers`.
    ///
    /// Trait types present in the manifest but unknown to `layers` follow in first-seen order.
    pub fn from_manifest(manifest: &Manifest, layers: &LayerSet) -> Self {
        let mut order: Vec<String> = layers.iter().map(|l| l.trait_type().to_string()).collect();
        let mut counts: HashMap<&str, (usize, HashMap<&str, usize>)> = HashMap::new();

        for artifact in &manifest.artifacts {
            for attr in &artifact.attributes {
                if !order.iter().any(|t| t == &attr.trait_type) {
                    order.push(attr.trait_type.clone());
                }
                let entry = counts.entry(attr.trait_type.as_str()).or_default();
                entry.0 += 1;
                *entry.1.entry(attr.value.as_str()).or_default() += 1;
            }
        }

        let layers = order
            .iter()
            .map(|trait_type| {
                let (count, values) = counts.remove(trait_type.as_str()).unwrap_or_default();
                let mut traits: Vec<TraitCount> = values
                    .into_iter()
                    .map(|(value, count)| TraitCount {
                        value: value.to_string(),
                        count,
                    })
                    .collect();
                traits.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
                LayerUsage {
                    trait_type: trait_type.clone(),
                    count,
                    traits,
                }
            })
            .collect();

        Self {
            total: manifest.len(),
            golden: manifest.golden_count(),
            layers,
        }
    }

    /// Percentage of the collection, as shown in the report.
    pub fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }

    /// Write the report with a timestamped header.
    pub fn write_to_path(&self, path: &Path) -> DuckgenResult<()> {
        crate::encode::ffmpeg::ensure_parent_dir(path)?;
        let text = format!(
            "DuckGen Trait Summary - {}\n\n{self}",
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        );
        std::fs::write(path, text)
            .with_context(|| format!("write trait summary '{}'", path.display()))?;
        Ok(())
    }
}

impl fmt::Display for TraitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total NFTs: {}", self.total)?;
        writeln!(f, "Golden Eggs: {}", self.golden)?;
        writeln!(f)?;
        writeln!(f, "Layer Usage:")?;
        for layer in &self.layers {
            writeln!(
                f,
                "  {}: {} ({:.2}%)",
                layer.trait_type,
                layer.count,
                self.percent(layer.count)
            )?;
        }
        writeln!(f)?;
        write!(f, "Trait Frequencies by Layer:")?;
        for layer in self.layers.iter().filter(|l| !l.traits.is_empty()) {
            writeln!(f)?;
            writeln!(f)?;
            write!(f, "  [{}]", layer.trait_type)?;
            for t in &layer.traits {
                writeln!(f)?;
                write!(f, "    {}: {} ({:.2}%)", t.value, t.count, self.percent(t.count))?;
            }
        }
        writeln!(f)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/report/summary.rs"]
mod tests;
