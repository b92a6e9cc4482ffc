//! Error types for the data module.

use thiserror::Error;

/// Data-loading errors.
#[derive(Debug, Error)]
pub enum DataError {
    /// URL failed to parse after template resolution.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The resolved URL string.
        url: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// A `{name}` placeholder had no matching parameter.
    #[error("unresolved placeholder '{{{name}}}' in URL template '{template}'")]
    UnresolvedPlaceholder {
        /// The placeholder name.
        name: String,
        /// The full template.
        template: String,
    },

    /// The loaded payload did not have the shape the collection expects.
    #[error("unexpected payload shape: {0}")]
    UnexpectedShape(String),

    /// The transport reported a failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error from the core object model.
    #[error(transparent)]
    Core(#[from] horizon_trellis_core::TrellisError),
}

/// Result alias for data operations.
pub type Result<T> = std::result::Result<T, DataError>;
