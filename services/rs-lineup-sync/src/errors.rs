//!
//! src/errors.rs  Andrew Belles  Sept 13th, 2025
//!
//! Defines enums and methods of error conversion
//! for errors the lineup sync uses
//!
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("page source error: {0}")]
    Source(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    // catalog facing taxonomy
    #[error("catalog authorization expired, reconnect required")]
    AuthExpired,
    #[error("catalog unavailable: {message}")]
    CatalogUnavailable { status: Option<u16>, message: String },
    #[error("no tracks to write")]
    NoTracksToWrite,
    #[error("could not determine acting user: {0}")]
    OwnerLookupFailed(String),
    #[error("write failed after {written} tracks were written: {source}")]
    WriteFailed {
        written: usize,
        #[source]
        source: Box<SyncError>
    },
    #[error("clear failed after {removed} tracks were removed: {source}")]
    ClearFailed {
        removed: usize,
        #[source]
        source: Box<SyncError>
    }
}

impl SyncError {
    pub fn unavailable(status: Option<u16>, message: impl Into<String>) -> Self {
        SyncError::CatalogUnavailable { status, message: message.into() }
    }

    /// True when the failure (or the cause of a failed write or clear) was
    /// an expired credential, so callers can prompt for a reconnect
    pub fn is_auth_expired(&self) -> bool {
        match self {
            SyncError::AuthExpired => true,
            SyncError::WriteFailed { source, .. }
            | SyncError::ClearFailed { source, .. } => source.is_auth_expired(),
            _ => false
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self { SyncError::Http(e.to_string()) }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self { SyncError::Parse(e.to_string()) }
}
