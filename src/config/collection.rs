use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{DuckgenError, DuckgenResult};

/// Collection-level generation settings (`config/collection.json`).
///
/// Field names follow the JSON file (`nftsToGenerate`, `minTraits`, ...).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionConfig {
    /// Number of unique artifacts to generate.
    pub nfts_to_generate: usize,
    /// Number of artifacts to mark golden after generation.
    #[serde(default)]
    pub golden_eggs_to_inject: usize,
    /// Filename prefix; filenames are `{prefix}#{id}`.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// First artifact id.
    #[serde(default = "default_start_index")]
    pub start_index: u64,
    /// Minimum attribute count per artifact (inclusive).
    #[serde(default = "default_min_traits")]
    pub min_traits: usize,
    /// Maximum attribute count per artifact (inclusive).
    #[serde(default = "default_max_traits")]
    pub max_traits: usize,
    /// Candidates drawn for one artifact before generation gives up.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Collection display name (metadata only).
    #[serde(default)]
    pub collection_name: String,
    /// Collection description (metadata only).
    #[serde(default)]
    pub description: String,
    /// Enable golden marker injection.
    #[serde(default)]
    pub include_golden_eggs: bool,
    /// Output/encoding settings.
    #[serde(default)]
    pub render: RenderSettings,
}

fn default_file_prefix() -> String {
    "duck".to_string()
}

fn default_start_index() -> u64 {
    1
}

fn default_min_traits() -> usize {
    3
}

fn default_max_traits() -> usize {
    8
}

fn default_max_retries() -> usize {
    10_000
}

impl CollectionConfig {
    /// Parse a collection config from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> DuckgenResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| DuckgenError::validation(format!("parse collection JSON: {e}")))
    }

    /// Parse a collection config from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> DuckgenResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            DuckgenError::validation(format!("open collection JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Validate bounds and render settings.
    pub fn validate(&self) -> DuckgenResult<()> {
        if self.nfts_to_generate == 0 {
            return Err(DuckgenError::validation("nftsToGenerate must be > 0"));
        }
        if self.min_traits > self.max_traits {
            return Err(DuckgenError::validation(format!(
                "minTraits ({}) must be <= maxTraits ({})",
                self.min_traits, self.max_traits
            )));
        }
        if self.max_retries == 0 {
            return Err(DuckgenError::validation("maxRetries must be > 0"));
        }
        if self.file_prefix.is_empty() {
            return Err(DuckgenError::validation("filePrefix must be non-empty"));
        }
        if self.file_prefix.contains(['/', '\\']) {
            return Err(DuckgenError::validation(
                "filePrefix must not contain path separators",
            ));
        }
        self.render.validate()
    }

    /// Number of golden markers to apply, or zero when injection is disabled.
    pub fn golden_marker_count(&self) -> usize {
        if self.include_golden_eggs {
            self.golden_eggs_to_inject
        } else {
            0
        }
    }
}

/// Output and encoding parameters shared by the graph builder, encoder and verifier.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderSettings {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frame rate; animated layers are normalized to it.
    pub fps: u32,
    /// Number of frames encoded per artifact.
    pub frames: u32,
    /// Encoder passed to `-c:v`.
    pub video_codec: String,
    /// Codec name the prober is expected to report.
    pub expected_codec: String,
    /// Output pixel format.
    pub pixel_format: String,
    /// Extension of rendered files.
    pub output_extension: String,
    /// Extension for animated layer assets when the layer does not set one.
    pub default_video_ext: String,
    /// Extension for static layer assets.
    pub static_ext: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1080,
            fps: 24,
            frames: 120,
            video_codec: "libx264".to_string(),
            expected_codec: "h264".to_string(),
            pixel_format: "yuv420p".to_string(),
            output_extension: "mp4".to_string(),
            default_video_ext: "mov".to_string(),
            static_ext: "png".to_string(),
        }
    }
}

impl RenderSettings {
    /// Validate dimensions, timing and non-empty codec fields.
    pub fn validate(&self) -> DuckgenResult<()> {
        self.canvas()?;
        self.frame_rate()?;
        if self.frames == 0 {
            return Err(DuckgenError::validation("render frames must be > 0"));
        }
        for (name, v) in [
            ("videoCodec", &self.video_codec),
            ("expectedCodec", &self.expected_codec),
            ("pixelFormat", &self.pixel_format),
            ("outputExtension", &self.output_extension),
            ("defaultVideoExt", &self.default_video_ext),
            ("staticExt", &self.static_ext),
        ] {
            if v.is_empty() {
                return Err(DuckgenError::validation(format!(
                    "render {name} must be non-empty"
                )));
            }
        }
        Ok(())
    }

    /// Validated output canvas.
    pub fn canvas(&self) -> DuckgenResult<Canvas> {
        Canvas::new(self.width, self.height)
    }

    /// Validated output frame rate.
    pub fn frame_rate(&self) -> DuckgenResult<Fps> {
        Fps::new(self.fps)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/collection.rs"]
mod tests;
