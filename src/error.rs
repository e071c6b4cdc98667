//! Error types for voxledger.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxledgerError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Startup assets
    #[error("Failed to load schema from {path}: {message}")]
    SchemaLoad { path: String, message: String },

    #[error("Schema does not compile: {message}")]
    SchemaCompile { message: String },

    #[error("Failed to load instruction template from {path}: {message}")]
    PromptLoad { path: String, message: String },

    // Outbound service errors
    #[error("{service}: OPENAI_API_KEY missing")]
    MissingCredential { service: &'static str },

    #[error("{service} error ({status}): {body}")]
    ServiceStatus {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} returned an unreadable response: {message}")]
    ServiceDecode {
        service: &'static str,
        message: String,
    },

    #[error("{service} request failed: {message}")]
    ServiceTransport {
        service: &'static str,
        message: String,
    },

    #[error("completion service returned no choices")]
    NoCompletions,

    #[error("{service} did not answer before the request deadline")]
    DeadlineExceeded { service: &'static str },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl VoxledgerError {
    /// True when the error came from running out of request time.
    pub fn is_deadline(&self) -> bool {
        matches!(self, VoxledgerError::DeadlineExceeded { .. })
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoxledgerError>;
