/// Error taxonomy for mesh ingestion
use thiserror::Error;

use crate::payload::Attribute;

/// Coarse classification of fatal ingestion failures, as shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The asset could not be fetched.
    Transport,
    /// Position data is absent or shorter than one vertex.
    MissingData,
    /// A stream is structurally broken (bad stride, bad values, unreadable format).
    MalformedStream,
}

/// Errors that abort the ingestion pipeline before any geometry is exposed.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Network failure or non-success status.
    #[error("error loading: {0}")]
    Transport(String),

    /// Position data is absent or shorter than one vertex.
    #[error("no positions array found or it's too short")]
    MissingPositions {
        /// Number of position values found, if the field was present at all.
        found: Option<usize>,
    },

    /// A stream length is not divisible by its stride.
    #[error("{attribute} stream has {len} values, which is not a multiple of {stride}")]
    MalformedStream {
        attribute: Attribute,
        len: usize,
        stride: usize,
    },

    /// An attribute does not line up with the vertex buffer.
    #[error("{attribute} stream has {actual} values, expected {expected}")]
    AttributeMismatch {
        attribute: Attribute,
        expected: usize,
        actual: usize,
    },

    /// A value in a numeric stream is not a number.
    #[error("{attribute} value at position {position} is not a number")]
    NonNumeric {
        attribute: Attribute,
        position: usize,
    },

    /// A coordinate is NaN, infinite, or too large for a 32-bit float.
    #[error("{attribute} value {value} at position {position} is not a finite 32-bit float")]
    NonFinite {
        attribute: Attribute,
        position: usize,
        value: f64,
    },

    /// An index is negative, fractional, non-finite or wider than 32 bits.
    #[error("index value {value} at position {position} is not a valid vertex index")]
    InvalidIndex { position: usize, value: f64 },

    /// The payload is not JSON.
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The payload is JSON but not an object.
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// A packaged glTF scene could not be read.
    #[error("failed to read glTF scene: {0}")]
    Gltf(#[from] gltf::Error),

    /// A packaged STL scene could not be read.
    #[error("failed to read STL scene: {0}")]
    Stl(String),

    /// More vertices than 32-bit indices can address.
    #[error("{0} vertices exceed the 32-bit index range")]
    TooManyVertices(usize),

    /// The bytes match no known model format.
    #[error("unrecognized model format")]
    UnsupportedFormat,
}

impl IngestError {
    /// Map this error onto the operator-facing taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) => ErrorCategory::Transport,
            Self::MissingPositions { .. } => ErrorCategory::MissingData,
            Self::MalformedStream { .. }
            | Self::AttributeMismatch { .. }
            | Self::NonNumeric { .. }
            | Self::NonFinite { .. }
            | Self::InvalidIndex { .. }
            | Self::InvalidJson(_)
            | Self::NotAnObject
            | Self::Gltf(_)
            | Self::Stl(_)
            | Self::TooManyVertices(_)
            | Self::UnsupportedFormat => ErrorCategory::MalformedStream,
        }
    }
}

/// Errors raised while rewriting an index buffer in place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// Rebasing would push an entry below zero.
    #[error("index at position {position} would become negative")]
    Underflow { position: usize },
}
