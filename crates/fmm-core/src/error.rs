//! Error types for the fastFMM bridge

use thiserror::Error;

/// Bridge error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid combination of caller-supplied parameters.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed input table.
    #[error("parse error: {0}")]
    Parse(String),

    /// The foreign engine rejected or failed to fit the model.
    #[error("model fit failed: {0}")]
    ModelFit(String),

    /// No conversion rule applies to a value.
    #[error("no conversion rule for {type_name} value at '{field}'")]
    Conversion {
        /// Dotted path of the offending field (empty at top level).
        field: String,
        /// R type name or host kind of the value.
        type_name: String,
    },

    /// The foreign package version could not be determined.
    #[error("could not determine version of R package '{package}': {reason}")]
    VersionDetection {
        /// Package name.
        package: String,
        /// Diagnostic from the last strategy tried.
        reason: String,
    },

    /// An R-level error raised while evaluating a call.
    #[error("R error in {call}: {message}")]
    Foreign {
        /// Function that raised.
        call: String,
        /// `conditionMessage()` text.
        message: String,
    },

    /// The foreign runtime is unavailable or broke protocol.
    #[error("engine error: {0}")]
    Engine(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl Error {
    /// Build a [`Error::Conversion`] for a value at `field`.
    pub fn conversion(field: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::Conversion { field: field.into(), type_name: type_name.into() }
    }

    /// Prefix the field path of a [`Error::Conversion`] with `parent`.
    ///
    /// Other variants pass through unchanged.
    pub fn within(self, parent: &str) -> Self {
        match self {
            Self::Conversion { field, type_name } => {
                let field = if field.is_empty() { parent.to_string() } else { format!("{parent}.{field}") };
                Self::Conversion { field, type_name }
            }
            other => other,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
