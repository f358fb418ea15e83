use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::config::collection::RenderSettings;
use crate::config::layers::{Layer, LayerSet};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{DuckgenError, DuckgenResult};
use crate::generate::manifest::Artifact;

/// Name of a node in the filter graph (rendered as `[label]`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeLabel(pub String);

impl std::fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// One asset fed to the encoder, in input-index order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphInput {
    /// Source layer name.
    pub layer: String,
    /// Asset file path.
    pub path: PathBuf,
    /// Video clip (`true`) or still image looped for the output duration (`false`).
    pub animated: bool,
}

/// A single step of a [`CompositionGraph`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pass {
    /// Reset timestamps and scale input `input` to the canvas; animated inputs also get `fps`.
    Normalize {
        /// Index into [`CompositionGraph::inputs`].
        input: usize,
        /// Output node.
        output: NodeLabel,
        /// Frame-rate normalization, present only for animated inputs.
        fps: Option<Fps>,
    },
    /// Overlay `top` onto `base`.
    Overlay {
        /// Running composite.
        base: NodeLabel,
        /// Layer drawn on top.
        top: NodeLabel,
        /// Output node.
        output: NodeLabel,
        /// Treat `top` alpha as straight (animated layers).
        straight_alpha: bool,
    },
}

/// Ordered asset inputs plus the overlay chain that composes them.
///
/// The first input seeds the base; each following input is normalized and overlaid onto the
/// running composite. Every pass writes a distinct node, and `output` is the last one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositionGraph {
    /// Output canvas.
    pub canvas: Canvas,
    /// Inputs in compositing order.
    pub inputs: Vec<GraphInput>,
    /// Passes in execution order.
    pub passes: Vec<Pass>,
    /// Final node of the graph.
    pub output: NodeLabel,
}

impl CompositionGraph {
    /// Render the graph as an ffmpeg `-filter_complex` expression.
    pub fn filter_complex(&self) -> String {
        let mut out = String::new();
        for (i, pass) in self.passes.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            match pass {
                Pass::Normalize { input, output, fps } => {
                    let _ = write!(
                        out,
                        "[{input}:v]setpts=PTS-STARTPTS,scale={}:{}",
                        self.canvas.width, self.canvas.height
                    );
                    if let Some(fps) = fps {
                        let _ = write!(out, ",fps={}", fps.0);
                    }
                    let _ = write!(out, "{output}");
                }
                Pass::Overlay {
                    base,
                    top,
                    output,
                    straight_alpha,
                } => {
                    let _ = write!(out, "{base}{top}overlay=format=auto");
                    if *straight_alpha {
                        out.push_str(":alpha=straight");
                    }
                    let _ = write!(out, "{output}");
                }
            }
        }
        out
    }
}

/// A layer skipped because its asset file does not exist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissingAsset {
    /// Layer name.
    pub layer: String,
    /// Expected asset path.
    pub path: PathBuf,
}

/// Maps artifacts to composition graphs using the `traits/<layer>/<value>.<ext>` layout.
#[derive(Clone, Copy, Debug)]
pub struct GraphBuilder<'a> {
    layers: &'a LayerSet,
    traits_dir: &'a Path,
    settings: &'a RenderSettings,
}

impl<'a> GraphBuilder<'a> {
    /// Create a builder for assets under `traits_dir`.
    pub fn new(layers: &'a LayerSet, traits_dir: &'a Path, settings: &'a RenderSettings) -> Self {
        Self {
            layers,
            traits_dir,
            settings,
        }
    }

    /// Expected asset path for `value` on `layer`.
    pub fn asset_path(&self, layer: &Layer, value: &str) -> PathBuf {
        self.traits_dir
            .join(&layer.name)
            .join(format!("{value}.{}", layer.asset_extension(self.settings)))
    }

    /// Build the graph for `artifact`.
    ///
    /// Layers whose asset is missing are skipped and reported through `missing`. Fails with
    /// [`DuckgenError::NoComposableLayers`] when no layer resolves to an existing asset.
    pub fn build(
        &self,
        artifact: &Artifact,
        missing: &mut Vec<MissingAsset>,
    ) -> DuckgenResult<CompositionGraph> {
        let canvas = self.settings.canvas()?;
        let fps = self.settings.frame_rate()?;

        let mut inputs = Vec::new();
        for layer in self.layers {
            let Some(attr) = artifact.attribute_for(&layer.name) else {
                continue;
            };
            let path = self.asset_path(layer, &attr.value);
            if !path.is_file() {
                tracing::warn!(
                    artifact = %artifact.filename,
                    layer = %layer.name,
                    path = %path.display(),
                    "missing asset; skipping layer"
                );
                missing.push(MissingAsset {
                    layer: layer.name.clone(),
                    path,
                });
                continue;
            }
            inputs.push(GraphInput {
                layer: layer.name.clone(),
                path,
                animated: layer.animated,
            });
        }

        if inputs.is_empty() {
            return Err(DuckgenError::NoComposableLayers {
                artifact: artifact.filename.clone(),
            });
        }

        let mut passes = Vec::with_capacity(inputs.len() * 2);
        let mut running: Option<NodeLabel> = None;
        for (i, input) in inputs.iter().enumerate() {
            let normalized = NodeLabel(format!("t{i}"));
            passes.push(Pass::Normalize {
                input: i,
                output: normalized.clone(),
                fps: input.animated.then_some(fps),
            });
            running = Some(match running {
                None => normalized,
                Some(base) => {
                    let output = NodeLabel(format!("tmp{i}"));
                    passes.push(Pass::Overlay {
                        base,
                        top: normalized,
                        output: output.clone(),
                        straight_alpha: input.animated,
                    });
                    output
                }
            });
        }

        let output = running.ok_or_else(|| DuckgenError::NoComposableLayers {
            artifact: artifact.filename.clone(),
        })?;
        Ok(CompositionGraph {
            canvas,
            inputs,
            passes,
            output,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/graph.rs"]
mod tests;
