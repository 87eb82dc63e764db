//! Error types for the VIGIL system.
//!
//! Every variant carries a stable machine-readable code via
//! [`VigilError::code`]. Codes are part of the operational contract
//! (alerting rules key on them) and must never change meaning.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum VigilError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity} with id {id}")]
    AlreadyExists { entity: String, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Search projection error: {0}")]
    Projection(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Message decode error: {0}")]
    MessageDecode(String),

    /// Signature mismatch on a read path. Indicates tampering or
    /// corruption; never locally recoverable.
    #[error("Audit integrity failure: event {event_id} signature invalid")]
    Integrity { event_id: Uuid },

    #[error("Authentication failed: {reason}")]
    Auth { reason: String },

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VigilError {
    /// Stable error code for logs, metrics, and API surfaces.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CONFIG",
            Self::Storage(_) => "STORAGE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::Validation { .. } => "VALIDATION",
            Self::Projection(_) => "PROJECTION",
            Self::Archive(_) => "ARCHIVE",
            Self::MessageDecode(_) => "MESSAGE_DECODE",
            Self::Integrity { .. } => "INTEGRITY",
            Self::Auth { .. } => "AUTH",
            Self::Crypto(_) => "CRYPTO",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

pub type VigilResult<T> = Result<T, VigilError>;
