use thiserror::Error;

use crate::parameters::container::SerializationError;
use crate::parameters::parameter::ParameterError;

/// Error types for the hyperparam-rs library.
#[derive(Error, Debug)]
pub enum HyperParamError {
    /// Error raised by a parameter or parameter container operation.
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    /// Error raised while exporting or restoring parameter state.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for hyperparam-rs operations.
pub type Result<T> = std::result::Result<T, HyperParamError>;
