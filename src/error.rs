//! Error types for sync runs.
//!
//! Classified by blast radius:
//! - Auth failures abort the whole run
//! - Transient network faults are retried inside the client; exhausted retries
//!   become a per-call error and the run continues
//! - Per-call data errors (malformed provider payloads) never escape the call
//!   they belong to

use thiserror::Error;

use crate::db::DbError;
use crate::grain::GrainError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Provider(#[from] GrainError),

    #[error(transparent)]
    Db(#[from] DbError),

    /// A provider record is missing or mangles a required field.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl SyncError {
    /// True when the run must abort (credential problem, not a transient fault).
    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Provider(e) if e.is_auth())
    }

    /// True for faults that were already retried and should be recorded as a
    /// per-call error rather than ending the run.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::Provider(
                GrainError::Http(_) | GrainError::ApiError { .. } | GrainError::RetriesExhausted
            )
        )
    }
}
