//! Error types for nuxsec

use thiserror::Error;

/// nuxsec error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed or inconsistent configuration (bin definitions, widths, matrices).
    #[error("configuration error: {0}")]
    Config(String),

    /// Vector/matrix length mismatch.
    #[error("dimension mismatch in {context}: expected {expected}, got {got}")]
    Dimension {
        /// Where the mismatch was detected.
        context: String,
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// Validation error
    #[error("validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("computation error: {0}")]
    Computation(String),
}

impl Error {
    /// Shorthand for a [`Error::Dimension`] error.
    pub fn dimension(context: impl Into<String>, expected: usize, got: usize) -> Self {
        Error::Dimension { context: context.into(), expected, got }
    }

    /// True for [`Error::Config`].
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// True for [`Error::Dimension`].
    pub fn is_dimension(&self) -> bool {
        matches!(self, Error::Dimension { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
