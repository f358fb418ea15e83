use std::path::Path;

use crate::config::collection::RenderSettings;
use crate::encode::{ProbeInfo, Prober};

/// Technical properties a rendered file is expected to have.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectedOutput {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub pixel_format: String,
    /// Codec name as reported by the prober.
    pub codec: String,
}

impl From<&RenderSettings> for ExpectedOutput {
    fn from(s: &RenderSettings) -> Self {
        Self {
            width: s.width,
            height: s.height,
            pixel_format: s.pixel_format.clone(),
            codec: s.expected_codec.clone(),
        }
    }
}

/// Advisory verification outcome. Never fails a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verification {
    /// All probed properties matched.
    Passed,
    /// A property mismatched or probing failed; the reason carries observed values.
    Warned(String),
    /// No file was produced in this run.
    NotRun,
}

/// Probes produced files and compares them field by field with [`ExpectedOutput`].
pub struct OutputVerifier<'a> {
    prober: &'a dyn Prober,
    expected: ExpectedOutput,
}

impl<'a> OutputVerifier<'a> {
    /// Create a verifier.
    pub fn new(prober: &'a dyn Prober, expected: ExpectedOutput) -> Self {
        Self { prober, expected }
    }

    /// Expected properties.
    pub fn expected(&self) -> &ExpectedOutput {
        &self.expected
    }

    /// Probe `path` and compare.
    pub fn verify(&self, path: &Path) -> Verification {
        match self.prober.probe(path) {
            Ok(info) => compare(&self.expected, &info),
            Err(e) => Verification::Warned(format!("probe failed: {e}")),
        }
    }
}

fn compare(expected: &ExpectedOutput, observed: &ProbeInfo) -> Verification {
    let mut mismatches = Vec::new();
    if observed.codec != expected.codec {
        mismatches.push(format!("codec {} != {}", observed.codec, expected.codec));
    }
    if observed.width != expected.width {
        mismatches.push(format!("width {} != {}", observed.width, expected.width));
    }
    if observed.height != expected.height {
        mismatches.push(format!("height {} != {}", observed.height, expected.height));
    }
    if observed.pixel_format != expected.pixel_format {
        mismatches.push(format!(
            "pix_fmt {} != {}",
            observed.pixel_format, expected.pixel_format
        ));
    }

    if mismatches.is_empty() {
        Verification::Passed
    } else {
        Verification::Warned(format!("{} (observed {observed})", mismatches.join(", ")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/verify.rs"]
mod tests;
