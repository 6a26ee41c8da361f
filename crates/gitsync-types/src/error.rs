//! Error types shared across gitsync crates.

use thiserror::Error;

/// Unified error type for configuration and domain validation.
#[derive(Debug, Error)]
pub enum GitsyncError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No repository path configured for the reader
    #[error("Repository path is not configured")]
    MissingRepositoryConfiguration,

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
