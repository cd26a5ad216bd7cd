//! Custom error types for Threadkeep
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for Threadkeep operations
#[derive(Error, Debug)]
pub enum ThreadkeepError {
    /// Model provider connection or API errors
    #[error("Model error: {0}")]
    Model(String),

    /// Model not available on the provider
    #[error("Model '{0}' not available")]
    ModelNotFound(String),

    /// A credential required at startup is absent
    #[error("{0} environment variable not set. Please configure it.")]
    MissingCredential(String),

    /// Checkpoint storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Tool execution errors
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Threadkeep operations
pub type Result<T> = std::result::Result<T, ThreadkeepError>;

impl From<rusqlite::Error> for ThreadkeepError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl ThreadkeepError {
    /// Create a model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a tool execution error
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::ToolExecution(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error means the process cannot serve any thread
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingCredential(_) | Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_message() {
        let err = ThreadkeepError::MissingCredential("GOOGLE_API_KEY".to_string());
        assert_eq!(
            err.to_string(),
            "GOOGLE_API_KEY environment variable not set. Please configure it."
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_storage_is_not_fatal() {
        assert!(!ThreadkeepError::storage("disk full").is_fatal());
    }
}
