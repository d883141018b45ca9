//! Error types for the patcher.
//!
//! All errors use thiserror for consistent error handling across the codebase.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Input file does not exist
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// Translation directory does not exist or is not a directory
    #[error("Translation directory not found: {}", .0.display())]
    MissingTranslations(PathBuf),

    /// Missing required configuration value
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

/// Patcher errors.
#[derive(Debug, Error)]
pub enum PatcherError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failed to read or write a file
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Translation file is not valid base64
    #[error("Invalid translation file {}: {source}", .path.display())]
    TranslationDecode {
        /// Path of the translation file
        path: PathBuf,
        /// Underlying decode error
        #[source]
        source: base64::DecodeError,
    },

    /// URL could not be parsed
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        /// The URL as received
        url: String,
        /// Underlying parse error
        #[source]
        source: url::ParseError,
    },

    /// Format engine error
    #[error("Format error: {0}")]
    Format(#[from] aigis_formats::Error),

    /// Legacy XML transport error
    #[error("XML transport error: {0}")]
    Legacy(#[from] aigis_formats::legacy::LegacyError),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PatcherError {
    /// Wrap an I/O error with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for patcher operations
pub type PatcherResult<T> = Result<T, PatcherError>;
