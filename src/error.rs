//! Error types for the video archiver

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Session is locked by another process")]
    SessionLocked,

    #[error("Failed to acquire session lock: {0}")]
    LockError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Telegram API error: {0}")]
    TelegramError(String),

    #[error("Authorization required")]
    AuthorizationRequired,

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Invalid group reference: {0}")]
    InvalidGroupReference(String),

    #[error("Archiver executable not found (tried: {0})")]
    ArchiverNotFound(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Compression failed: {0}")]
    Compression(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<grammers_client::InvocationError> for Error {
    fn from(err: grammers_client::InvocationError) -> Self {
        Error::TelegramError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}
