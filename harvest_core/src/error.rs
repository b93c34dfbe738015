use std::path::PathBuf;

use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error")]
    Db(#[from] DbErr),

    #[error("io error on store document")]
    Io(#[from] std::io::Error),

    #[error("store document at {path} is corrupt: {source}")]
    CorruptStore {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize store document")]
    Json(#[from] serde_json::Error),

    #[error("remote storage call timed out")]
    Timeout,
}

impl StorageError {
    /// Whether re-issuing the failed call can reasonably succeed. Reads and
    /// upserts are idempotent, so timeouts and connection-level database
    /// failures qualify; a corrupt store document never does.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::Timeout
                | StorageError::Db(DbErr::Conn(_))
                | StorageError::Db(DbErr::ConnectionAcquire(_))
        )
    }
}
