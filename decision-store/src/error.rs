//! Error types for decision-store

use thiserror::Error;
use verdict::VerdictError;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Another writer already persisted this decision id.
    #[error("Decision already exists: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Store operation timed out after {0}ms")]
    Timeout(u64),

    /// A persisted row no longer parses into a decision or audit entry.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<VerdictError> for StoreError {
    fn from(e: VerdictError) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}
