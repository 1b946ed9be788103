/// Core error types for Cadence
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type shared by collaborator implementations
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistent store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Media catalogue errors
    #[error("Catalogue error: {0}")]
    Catalogue(String),

    /// Audio engine or decoding errors
    #[error("Audio error: {0}")]
    Audio(String),

    /// Audio session (category/activation) errors
    #[error("Audio session error: {0}")]
    Session(String),

    /// Locator could not be turned into something openable
    #[error("Unsupported locator: {0}")]
    UnsupportedLocator(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a catalogue error
    pub fn catalogue(msg: impl Into<String>) -> Self {
        Self::Catalogue(msg.into())
    }

    /// Create an audio error
    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    /// Create an audio session error
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }
}
