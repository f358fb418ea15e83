/// Convenience result type used across duckgen.
pub type DuckgenResult<T> = Result<T, DuckgenError>;

/// Top-level error taxonomy used by generation and render APIs.
///
/// Only [`DuckgenError::Validation`] and [`DuckgenError::NoComposableLayers`] are meant to stop a
/// run; everything else is either local to one candidate or captured per artifact.
#[derive(thiserror::Error, Debug)]
pub enum DuckgenError {
    /// Invalid user-provided configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// A weighted pick was requested over items that all have weight zero (or no items).
    #[error("empty candidate set: no item with non-zero weight")]
    EmptyCandidateSet,

    /// A layer was included in a candidate but has no selectable trait.
    #[error("layer '{layer}' has no selectable trait")]
    NoSelectableTrait {
        /// Layer name.
        layer: String,
    },

    /// More golden markers were requested than artifacts exist.
    #[error("cannot mark {requested} golden artifacts in a manifest of {available}")]
    InvalidGoldenMarkerCount {
        /// Requested marker count.
        requested: usize,
        /// Manifest size.
        available: usize,
        /// Artifacts generated before the markers could not be placed, when raised by generation.
        partial: Option<Box<crate::generate::mixer::Generation>>,
    },

    /// None of an artifact's layers resolved to an existing asset.
    #[error("artifact '{artifact}' has no composable layers")]
    NoComposableLayers {
        /// Artifact filename.
        artifact: String,
    },

    /// The external encoder failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// The external prober failed or returned unusable output.
    #[error("probe error: {0}")]
    Probe(String),

    /// The run was cancelled before the operation completed.
    #[error("cancelled")]
    Cancelled,

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DuckgenError {
    /// Build a [`DuckgenError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`DuckgenError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`DuckgenError::Probe`] value.
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Build a [`DuckgenError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
