//! Shared type definitions for the database layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

/// A row from the `companies` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbCompany {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub domain: Option<String>,
    pub website: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A row from the `contacts` table.
///
/// `meeting_count` and `last_meeting_at` are activity signals maintained by
/// the resolver; the primary selector orders candidates by them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbContact {
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub title: Option<String>,
    pub company_id: Option<String>,
    pub meeting_count: i64,
    pub last_meeting_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A row from the `meetings` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbMeeting {
    pub id: String,
    pub user_id: String,
    pub recording_id: String,
    pub title: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub duration_seconds: Option<i64>,
    pub share_url: Option<String>,
    pub embed_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub summary: Option<String>,
    pub company_id: Option<String>,
    pub primary_contact_id: Option<String>,
    pub sync_status: String,
    pub last_synced_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields written by the meeting upsert. The writer derives `duration_seconds`
/// and stamps `sync_status` / `last_synced_at` itself.
#[derive(Debug, Clone, Default)]
pub struct MeetingFields {
    pub title: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub share_url: Option<String>,
    pub embed_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub summary: Option<String>,
    pub company_id: Option<String>,
    pub primary_contact_id: Option<String>,
}

/// A row from the `action_items` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbActionItem {
    pub id: String,
    pub meeting_id: String,
    pub text: String,
    pub ai_generated: bool,
    pub source_key: String,
    pub created_at: String,
}

/// A row from the `sync_state` table: one per user, overwritten each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbSyncState {
    pub user_id: String,
    pub status: String,
    pub meetings_synced: i64,
    pub total_meetings_found: i64,
    /// JSON array of `{callId, error}` entries, truncated to the first 10.
    pub last_error: Option<String>,
    pub last_synced_at: Option<String>,
    pub started_at: Option<String>,
    pub updated_at: String,
}
