//! Error types for credential storage.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, CredentialError>;

/// Errors that can occur while loading or saving credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Reading or writing the credential file failed.
    #[error("Storage error: {0}")]
    Io(String),

    /// The credential file could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}
