//! Error types for effects

use coinfx_core::ImageId;
use thiserror::Error;

/// A problem found in an effect configuration
///
/// Effects never refuse a configuration. Each finding is logged and the value
/// is replaced by the nearest usable one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field}: range is inverted ({min} > {max}), swapped")]
    InvertedRange {
        field: &'static str,
        min: f32,
        max: f32,
    },

    #[error("{field}: {value} is not a finite number")]
    NotFinite { field: &'static str, value: f32 },

    #[error("{field}: {value} is negative, clamped to 0")]
    Negative { field: &'static str, value: f32 },

    #[error("{field}: count is zero, the effect will be empty")]
    EmptyCount { field: &'static str },

    #[error("{field}: {value} is outside [{min}, {max}], clamped")]
    OutOfBounds {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
}

/// Error type for effect resources
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EffectError {
    #[error("image {0:?} failed to load: {1}")]
    ImageFailed(ImageId, String),

    #[error("image {0:?} is still loading")]
    ImageLoading(ImageId),

    #[error("unknown effect '{0}'")]
    UnknownEffect(String),
}

/// Result type alias for effect operations
pub type Result<T> = std::result::Result<T, EffectError>;
