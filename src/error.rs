//! Unified error handling for the sourcesift crate
//!
//! Per-record probe failures are data, not errors: they never reach this type.
//! What does reach it is fatal for the run: a stage that cannot complete, a
//! configuration that does not validate, an output directory that cannot be
//! written.
//!
//! # Architecture
//!
//! - [`SiftErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors

use thiserror::Error;

pub use crate::utils::error::ProbeError;

/// Common trait for all sourcesift error types
pub trait SiftErrorTrait: std::error::Error {
    /// Check if this error is transient (a later run might succeed)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, TLS)
    Network,
    /// Parsing and decoding errors
    Parsing,
    /// Storage and I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
}

impl ErrorCategory {
    /// Get a short description for the category
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "network error",
            Self::Parsing => "parsing error",
            Self::Storage => "storage error",
            Self::Config => "configuration error",
        }
    }
}

impl SiftErrorTrait for ProbeError {
    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidUrl(_))
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode(_) => ErrorCategory::Parsing,
            Self::InvalidUrl(_) => ErrorCategory::Config,
            _ => ErrorCategory::Network,
        }
    }
}

/// Unified error type for the sourcesift crate
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// A pipeline stage failed as a whole
    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// Reading input or writing output failed; the context chain is rendered
    #[error("{context}")]
    Storage { context: String },
}

impl SiftErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Config(_) => false,
            Self::Stage { source, .. } => source.is_recoverable(),
            Self::Storage { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Http(_) => ErrorCategory::Network,
            Self::Config(_) => ErrorCategory::Config,
            Self::Stage { source, .. } => source.category(),
            Self::Storage { .. } => ErrorCategory::Storage,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap an error raised inside a pipeline stage
    pub fn stage(stage: &'static str, source: Error) -> Self {
        Self::Stage {
            stage,
            source: Box::new(source),
        }
    }
}

// The file glue reports through anyhow
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage {
            context: format!("{err:#}"),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
