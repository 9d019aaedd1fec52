//! Error types for litlisten.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LitlistenError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Decoder errors
    #[error("Failed to decode {locator}: {message}")]
    DecodeFailure { locator: String, message: String },

    #[error("No audio source loaded")]
    NoSource,

    // Processing errors
    #[error("Audio processing failed: {message}")]
    ProcessingFailure { message: String },

    #[error("A processing request is already in flight (request #{token})")]
    ProcessingInFlight { token: u64 },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl LitlistenError {
    /// Whether the operator can keep working after this error.
    ///
    /// Everything in the playback core is recoverable; only broken
    /// configuration stops the binary from starting.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            LitlistenError::ConfigFileNotFound { .. }
                | LitlistenError::ConfigInvalidValue { .. }
                | LitlistenError::Config(_)
        )
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, LitlistenError>;
