use rand::{CryptoRng, Rng};

use crate::config::collection::CollectionConfig;
use crate::config::layers::{Layer, LayerSet};
use crate::foundation::error::{DuckgenError, DuckgenResult};
use crate::generate::dna::{DnaSet, fingerprint};
use crate::generate::manifest::{Artifact, Attribute, Manifest};
use crate::generate::sampler::WeightedSampler;

/// Outcome counters for one generation run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Requested artifact count.
    pub requested: usize,
    /// Accepted artifact count.
    pub accepted: usize,
    /// Candidates drawn.
    pub attempts: usize,
    /// Candidates discarded because an included layer had no selectable trait.
    pub rejected_no_trait: usize,
    /// Candidates discarded for falling outside `[minTraits, maxTraits]`.
    pub rejected_bounds: usize,
    /// Candidates discarded as duplicates of an accepted fingerprint.
    pub rejected_duplicate: usize,
    /// The attempt budget ran out before `requested` artifacts were accepted.
    pub exhausted: bool,
}

impl GenerationReport {
    /// Number of requested artifacts that were not produced.
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.accepted)
    }
}

/// Manifest plus run report. A partial manifest is returned when the budget is exhausted.
#[derive(Clone, Debug)]
pub struct Generation {
    /// Accepted artifacts.
    pub manifest: Manifest,
    /// Run counters.
    pub report: GenerationReport,
}

/// Rejection sampler producing unique, count-bounded attribute combinations.
pub struct TraitMixer<'a, R> {
    config: &'a CollectionConfig,
    layers: &'a LayerSet,
    sampler: WeightedSampler<R>,
}

impl<'a, R: Rng + CryptoRng> TraitMixer<'a, R> {
    /// Create a mixer over validated inputs.
    pub fn new(
        config: &'a CollectionConfig,
        layers: &'a LayerSet,
        sampler: WeightedSampler<R>,
    ) -> DuckgenResult<Self> {
        config.validate()?;
        if config.golden_marker_count() > config.nfts_to_generate {
            return Err(DuckgenError::validation(format!(
                "goldenEggsToInject ({}) exceeds nftsToGenerate ({})",
                config.golden_marker_count(),
                config.nfts_to_generate
            )));
        }
        Ok(Self {
            config,
            layers,
            sampler,
        })
    }

    /// Generate the collection.
    ///
    /// `seen` holds fingerprints that count as already taken; accepted fingerprints are added to it.
    /// The loop stops once `maxRetries` consecutive candidates fail to produce the next artifact; a
    /// shortfall is reported in [`GenerationReport`], not as an error. When the shortfall leaves
    /// fewer artifacts than golden markers, [`DuckgenError::InvalidGoldenMarkerCount`] carries the
    /// partial generation in `partial`.
    #[tracing::instrument(skip_all, fields(requested = self.config.nfts_to_generate))]
    pub fn generate(&mut self, seen: &mut DnaSet) -> DuckgenResult<Generation> {
        let target = self.config.nfts_to_generate;
        let mut report = GenerationReport {
            requested: target,
            ..GenerationReport::default()
        };
        let mut manifest = Manifest::default();
        let mut since_accept = 0usize;

        while manifest.len() < target {
            if since_accept >= self.config.max_retries {
                report.exhausted = true;
                tracing::warn!(
                    attempts = report.attempts,
                    accepted = manifest.len(),
                    "attempt budget exhausted; not enough unique combinations for the constraints"
                );
                break;
            }
            report.attempts += 1;
            since_accept += 1;

            let attributes = match self.draw_candidate() {
                Ok(a) => a,
                Err(e @ DuckgenError::NoSelectableTrait { .. }) => {
                    tracing::debug!(error = %e, "candidate discarded");
                    report.rejected_no_trait += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let n = attributes.len();
            if n < self.config.min_traits || n > self.config.max_traits {
                report.rejected_bounds += 1;
                continue;
            }

            if !seen.insert(fingerprint(&attributes)) {
                report.rejected_duplicate += 1;
                continue;
            }

            let id = self.config.start_index + manifest.len() as u64;
            manifest.artifacts.push(Artifact {
                id,
                filename: Artifact::filename_for(&self.config.file_prefix, id),
                attributes,
                golden: false,
            });
            since_accept = 0;
        }
        report.accepted = manifest.len();

        let golden = self.config.golden_marker_count();
        if golden > manifest.len() {
            return Err(DuckgenError::InvalidGoldenMarkerCount {
                requested: golden,
                available: manifest.len(),
                partial: Some(Box::new(Generation { manifest, report })),
            });
        }
        if golden > 0 {
            self.mark_golden(&mut manifest, golden)?;
        }

        tracing::info!(
            accepted = report.accepted,
            attempts = report.attempts,
            golden = manifest.golden_count(),
            "generation finished"
        );
        Ok(Generation { manifest, report })
    }

    /// Mark exactly `count` distinct artifacts golden, chosen uniformly without replacement.
    pub fn mark_golden(&mut self, manifest: &mut Manifest, count: usize) -> DuckgenResult<()> {
        let indices = self.sampler.distinct_indices(manifest.len(), count)?;
        for i in indices {
            manifest.artifacts[i].golden = true;
        }
        Ok(())
    }

    fn draw_candidate(&mut self) -> DuckgenResult<Vec<Attribute>> {
        let layers = self.layers;
        let mut attributes = Vec::new();
        for layer in layers {
            if !self.includes(layer) {
                continue;
            }
            let picked = self
                .sampler
                .pick(&layer.traits, |t| t.weight)
                .map_err(|_| DuckgenError::NoSelectableTrait {
                    layer: layer.name.clone(),
                })?;
            attributes.push(Attribute {
                layer: layer.name.clone(),
                trait_type: layer.trait_type().to_string(),
                value: picked.name.clone(),
            });
        }
        Ok(attributes)
    }

    fn includes(&mut self, layer: &Layer) -> bool {
        layer.required || self.sampler.chance_percent(layer.rarity)
    }
}

/// Generate a collection with a fresh uniqueness set and the thread-local CSPRNG.
pub fn generate_collection(
    config: &CollectionConfig,
    layers: &LayerSet,
) -> DuckgenResult<Generation> {
    let mut seen = DnaSet::new();
    TraitMixer::new(config, layers, WeightedSampler::from_entropy())?.generate(&mut seen)
}

#[cfg(test)]
#[path = "../../tests/unit/generate/mixer.rs"]
mod tests;
