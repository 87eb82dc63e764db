//! Database-specific error types and conversions.

use vigil_core::VigilError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity} with id {id}")]
    Duplicate { entity: String, id: String },

    #[error("Stored record is malformed: {0}")]
    Decode(String),
}

impl From<DbError> for VigilError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => VigilError::NotFound { entity, id },
            DbError::Duplicate { entity, id } => VigilError::AlreadyExists { entity, id },
            other => VigilError::Storage(other.to_string()),
        }
    }
}
