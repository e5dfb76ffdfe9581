//! Wire types for the Grain public API.
//!
//! Everything here is transient, provider-shaped data: deserialized from JSON,
//! consumed by the sync pipeline, never persisted as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recording as returned by the list/detail endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrainRecording {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_datetime: Option<String>,
    #[serde(default)]
    pub end_datetime: Option<String>,
    /// Public share page URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Provider-hosted thumbnail, present for some recordings.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub participants: Vec<GrainParticipant>,
    /// Present in detail payloads; absent from most bulk list responses.
    #[serde(default)]
    pub summary: Option<String>,
    /// Present when the list endpoint is asked to include them.
    #[serde(default)]
    pub action_items: Vec<GrainActionItem>,
}

/// A meeting participant. `scope` distinguishes the recording owner's
/// organization ("internal") from everyone else ("external").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrainParticipant {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl GrainParticipant {
    /// True when the provider flagged this participant external.
    pub fn is_external(&self) -> bool {
        self.scope.as_deref() == Some("external")
    }
}

/// An action item attached to a recording. `ai_generated` distinguishes
/// provider-native items from ones the provider's AI derived.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrainActionItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ai_generated: bool,
}

/// One page of the recordings list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingsPage {
    #[serde(default)]
    pub recordings: Vec<GrainRecording>,
    pub cursor: Option<String>,
}

/// The `[start, end)` range a recordings query is constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}
