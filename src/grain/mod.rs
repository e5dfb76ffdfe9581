//! Grain integration: recording retrieval and enrichment.
//!
//! `client` talks to the public API (retry + auth-scheme fallback),
//! `thumbnail` resolves preview images through a fallback cascade, and
//! `RecordingSource` is the seam the sync orchestrator consumes so tests can
//! substitute a scripted source.

pub mod client;
pub mod thumbnail;
pub mod types;

pub use client::{GrainClient, RetryPolicy};
pub use types::{FetchWindow, GrainActionItem, GrainParticipant, GrainRecording};

use async_trait::async_trait;

/// Errors from Grain API operations.
#[derive(Debug, thiserror::Error)]
pub enum GrainError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    /// Credential rejected (401 after scheme fallback, or 403).
    /// Never retried; aborts the whole run.
    #[error("Authentication rejected ({status}): {message}")]
    AuthRejected { status: u16, message: String },
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },
    #[error("Recording not found: {0}")]
    RecordingNotFound(String),
    #[error("Retries exhausted")]
    RetriesExhausted,
}

impl GrainError {
    /// True when this failure means the credential itself is bad.
    pub fn is_auth(&self) -> bool {
        matches!(self, GrainError::AuthRejected { .. })
    }
}

/// Provider seam consumed by the sync orchestrator.
///
/// `GrainClient` is the production implementation; tests inject scripted
/// sources to exercise the orchestrator without a network.
#[async_trait]
pub trait RecordingSource: Send + Sync {
    /// Fetch recordings, optionally constrained to a window, following the
    /// pagination cursor until exhausted or `limit` records are accumulated.
    async fn list_recordings(
        &self,
        window: Option<&FetchWindow>,
        limit: usize,
    ) -> Result<Vec<GrainRecording>, GrainError>;

    /// Fetch a single recording by id (webhook syncs).
    async fn fetch_recording(&self, recording_id: &str) -> Result<GrainRecording, GrainError>;

    /// Fetch action items for a recording. Absence is an empty list.
    async fn fetch_action_items(
        &self,
        recording_id: &str,
    ) -> Result<Vec<GrainActionItem>, GrainError>;

    /// Fetch the summary for a recording, when the bulk payload lacked one.
    /// Absence is `None`, never an error.
    async fn fetch_summary(&self, recording_id: &str) -> Result<Option<String>, GrainError>;
}
