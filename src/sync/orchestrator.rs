//! Sync orchestration: retrieval, resolution, enrichment, persistence.
//!
//! A run moves the per-user sync state `idle → syncing → {idle, error}`.
//! Per-call failures are accumulated and the loop keeps going; only an
//! authentication failure (or an unhandled error) ends a run early. The
//! caller always gets the structured summary for partial failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::db::{CrmDb, DbActionItem, DbContact, MeetingFields};
use crate::error::SyncError;
use crate::grain::thumbnail::{ProbeContext, ThumbnailResolver};
use crate::grain::{FetchWindow, GrainRecording, RecordingSource};

use super::{dedup, primary, resolver};

/// Hard cap on records fetched by one run. Keeps a bad cursor or an
/// unbounded all-time window from looping forever.
pub const MAX_RECORDS_PER_SYNC: usize = 10_000;

/// Only the first N error entries are persisted to sync_state.
const MAX_PERSISTED_ERRORS: usize = 10;

const INCREMENTAL_WINDOW_HOURS: i64 = 24;
const DEFAULT_WINDOW_DAYS: i64 = 30;

/// What kind of run this is; selects the query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncType {
    Initial,
    Incremental,
    Manual,
    Webhook,
    AllTime,
}

impl SyncType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "initial" => Some(SyncType::Initial),
            "incremental" => Some(SyncType::Incremental),
            "manual" => Some(SyncType::Manual),
            "webhook" => Some(SyncType::Webhook),
            "all_time" | "all-time" => Some(SyncType::AllTime),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncType::Initial => "initial",
            SyncType::Incremental => "incremental",
            SyncType::Manual => "manual",
            SyncType::Webhook => "webhook",
            SyncType::AllTime => "all_time",
        }
    }
}

/// Inputs for one sync invocation.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub sync_type: SyncType,
    /// Explicit window override for initial/manual runs.
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Required for webhook runs.
    pub recording_id: Option<String>,
    pub limit: Option<usize>,
}

impl SyncRequest {
    pub fn new(sync_type: SyncType) -> Self {
        Self {
            sync_type,
            start_date: None,
            end_date: None,
            recording_id: None,
            limit: None,
        }
    }
}

/// One failed call in a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallError {
    pub call_id: String,
    pub error: String,
}

/// The run summary, the only thing callers see for partial failures.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub meetings_synced: usize,
    pub total_meetings_found: usize,
    pub errors: Vec<CallError>,
}

/// Select the `[start, end)` query window for a request.
///
/// Incremental looks back 24 hours; initial/manual look back 30 days unless
/// the request carries explicit bounds; all-time and webhook are unwindowed.
pub fn query_window(request: &SyncRequest, now: DateTime<Utc>) -> Option<FetchWindow> {
    match request.sync_type {
        SyncType::Incremental => Some(FetchWindow {
            start: now - Duration::hours(INCREMENTAL_WINDOW_HOURS),
            end: now,
        }),
        SyncType::Initial | SyncType::Manual => Some(FetchWindow {
            start: request
                .start_date
                .unwrap_or_else(|| now - Duration::days(DEFAULT_WINDOW_DAYS)),
            end: request.end_date.unwrap_or(now),
        }),
        SyncType::AllTime | SyncType::Webhook => None,
    }
}

pub struct SyncEngine<S: RecordingSource> {
    db: CrmDb,
    source: S,
    thumbnails: ThumbnailResolver,
    user_id: String,
    cancelled: Arc<AtomicBool>,
}

impl<S: RecordingSource> SyncEngine<S> {
    pub fn new(db: CrmDb, source: S, thumbnails: ThumbnailResolver, user_id: &str) -> Self {
        Self {
            db,
            source,
            thumbnails,
            user_id: user_id.to_string(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the run issuing new calls. In-flight requests finish
    /// or time out naturally.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn db(&self) -> &CrmDb {
        &self.db
    }

    /// Run one sync and persist its outcome to the user's sync_state row.
    ///
    /// Partial failures come back as `Ok(summary)` with error entries; only
    /// an auth failure or an unhandled error returns `Err`, after recording
    /// run-level `status = error`.
    pub async fn sync(&self, request: &SyncRequest) -> Result<SyncSummary, SyncError> {
        log::info!(
            "Sync run starting: type={} user={}",
            request.sync_type.as_str(),
            self.user_id
        );
        self.db.begin_sync_run(&self.user_id)?;

        match self.run(request).await {
            Ok(summary) => {
                let errors_json = persisted_errors_json(&summary.errors);
                self.db.finish_sync_run(
                    &self.user_id,
                    "idle",
                    summary.meetings_synced as i64,
                    summary.total_meetings_found as i64,
                    errors_json.as_deref(),
                )?;
                log::info!(
                    "Sync run complete: {}/{} synced, {} errors",
                    summary.meetings_synced,
                    summary.total_meetings_found,
                    summary.errors.len()
                );
                Ok(summary)
            }
            Err(e) => {
                let entry = vec![CallError {
                    call_id: request.recording_id.clone().unwrap_or_default(),
                    error: e.to_string(),
                }];
                let errors_json = persisted_errors_json(&entry);
                let _ = self.db.finish_sync_run(
                    &self.user_id,
                    "error",
                    0,
                    0,
                    errors_json.as_deref(),
                );
                log::warn!("Sync run failed: {}", e);
                Err(e)
            }
        }
    }

    async fn run(&self, request: &SyncRequest) -> Result<SyncSummary, SyncError> {
        let limit = request
            .limit
            .unwrap_or(MAX_RECORDS_PER_SYNC)
            .min(MAX_RECORDS_PER_SYNC);

        let recordings = match request.sync_type {
            SyncType::Webhook => {
                let id = request.recording_id.as_deref().ok_or_else(|| {
                    SyncError::InvalidRecord("webhook sync requires a recording id".to_string())
                })?;
                vec![self.source.fetch_recording(id).await?]
            }
            _ => {
                let window = query_window(request, Utc::now());
                let mut recordings =
                    self.source.list_recordings(window.as_ref(), limit).await?;

                // An empty windowed result gets one unwindowed retry before
                // we conclude there is nothing to sync.
                if recordings.is_empty() && window.is_some() {
                    log::info!("Windowed query returned nothing; retrying unwindowed once");
                    recordings = self.source.list_recordings(None, limit).await?;
                }
                recordings
            }
        };

        let mut summary = SyncSummary {
            total_meetings_found: recordings.len(),
            ..Default::default()
        };

        for recording in &recordings {
            if self.cancelled.load(Ordering::Relaxed) {
                log::info!("Sync cancelled; not issuing further calls");
                break;
            }

            match self.process_recording(recording).await {
                Ok(()) => summary.meetings_synced += 1,
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    log::warn!("Recording {} failed: {}", recording.id, e);
                    summary.errors.push(CallError {
                        call_id: recording.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(summary)
    }

    /// Pipeline for one recording: validate → resolve attendees → pick
    /// primary → thumbnail → upsert meeting + links → action items.
    async fn process_recording(&self, recording: &GrainRecording) -> Result<(), SyncError> {
        if recording.id.is_empty() {
            return Err(SyncError::InvalidRecord("recording has no id".to_string()));
        }
        let started_at = parse_required_timestamp(recording.start_datetime.as_deref(), "start")?;
        let ended_at = parse_optional_timestamp(recording.end_datetime.as_deref(), "end")?;

        // Entity resolution for external attendees
        let mut resolutions = Vec::new();
        for participant in &recording.participants {
            if let Some(resolution) =
                resolver::resolve_attendee(&self.db, &self.user_id, participant)?
            {
                resolutions.push(resolution);
            }
        }

        let candidates: Vec<DbContact> = resolutions
            .iter()
            .filter_map(|r| self.db.get_contact(&r.contact_id).ok().flatten())
            .collect();
        let primary_contact = primary::select_primary(&candidates);
        let company_id = primary_contact.and_then(|c| c.company_id.clone());

        let title = recording
            .title
            .clone()
            .unwrap_or_else(|| "(Untitled call)".to_string());

        // Provider thumbnail wins; the cascade only runs when it's absent
        let thumbnail_url = match recording.thumbnail_url.clone() {
            Some(url) => Some(url),
            None => {
                self.thumbnails
                    .resolve(&ProbeContext {
                        recording_id: &recording.id,
                        title: &title,
                        share_url: recording.url.as_deref(),
                    })
                    .await
            }
        };

        // Summary is fetched lazily, only when the bulk payload lacked one
        let summary = match recording.summary.clone() {
            Some(s) => Some(s),
            None => self.source.fetch_summary(&recording.id).await?,
        };

        let fields = MeetingFields {
            title,
            started_at: started_at.to_rfc3339(),
            ended_at: ended_at.map(|t| t.to_rfc3339()),
            share_url: recording.url.clone(),
            embed_url: recording
                .url
                .as_deref()
                .and_then(crate::grain::thumbnail::embed_url_from_share),
            thumbnail_url,
            summary,
            company_id,
            primary_contact_id: primary_contact.map(|c| c.id.clone()),
        };

        let started_at_str = fields.started_at.clone();
        let primary_id = fields.primary_contact_id.clone();
        let meeting_id = self.db.with_transaction(|db| {
            let meeting_id = db.upsert_meeting(&self.user_id, &recording.id, &fields)?;
            for resolution in &resolutions {
                // Activity signals bump at most once per (meeting, contact)
                if db.link_meeting_contact(&meeting_id, &resolution.contact_id)? {
                    db.bump_contact_meeting_signal(&resolution.contact_id, &started_at_str)?;
                }
            }
            if let Some(ref contact_id) = primary_id {
                db.set_primary_contact(&meeting_id, contact_id)?;
            }
            Ok(meeting_id)
        })?;

        self.store_action_items(recording, &meeting_id).await?;

        Ok(())
    }

    /// Persist action items for a recording, suppressing AI-derived items
    /// that restate a native one.
    async fn store_action_items(
        &self,
        recording: &GrainRecording,
        meeting_id: &str,
    ) -> Result<(), SyncError> {
        let mut items = recording.action_items.clone();
        if items.is_empty() {
            items = self.source.fetch_action_items(&recording.id).await?;
        }
        if items.is_empty() {
            return Ok(());
        }

        // Native texts from this payload plus anything already persisted, so
        // dedup holds across repeated analysis passes.
        let mut native_texts: Vec<String> = items
            .iter()
            .filter(|i| !i.ai_generated)
            .map(|i| i.text.clone())
            .collect();
        for existing in self.db.get_action_items(meeting_id)? {
            if !existing.ai_generated {
                native_texts.push(existing.text);
            }
        }

        for item in &items {
            if item.text.trim().is_empty() {
                continue;
            }
            if item.ai_generated && dedup::is_duplicate(&item.text, &native_texts) {
                log::debug!("Suppressing duplicate AI action item: {}", item.text);
                continue;
            }
            let source_key = item
                .id
                .clone()
                .unwrap_or_else(|| text_source_key(&item.text));
            self.db.insert_action_item(&DbActionItem {
                id: format!("ai-{}", uuid::Uuid::new_v4()),
                meeting_id: meeting_id.to_string(),
                text: item.text.clone(),
                ai_generated: item.ai_generated,
                source_key,
                created_at: Utc::now().to_rfc3339(),
            })?;
        }

        Ok(())
    }
}

/// Stable key for action items the provider didn't assign an id.
fn text_source_key(text: &str) -> String {
    let normalized: String = text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

fn parse_required_timestamp(
    value: Option<&str>,
    field: &str,
) -> Result<DateTime<Utc>, SyncError> {
    let raw = value
        .ok_or_else(|| SyncError::InvalidRecord(format!("missing {} time", field)))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| SyncError::InvalidRecord(format!("malformed {} time: {}", field, raw)))
}

fn parse_optional_timestamp(
    value: Option<&str>,
    field: &str,
) -> Result<Option<DateTime<Utc>>, SyncError> {
    match value {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|_| SyncError::InvalidRecord(format!("malformed {} time: {}", field, raw))),
    }
}

fn persisted_errors_json(errors: &[CallError]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }
    let truncated = &errors[..errors.len().min(MAX_PERSISTED_ERRORS)];
    serde_json::to_string(truncated).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;
    use crate::grain::{GrainActionItem, GrainError, GrainParticipant};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    // -----------------------------------------------------------------------
    // Scripted source
    // -----------------------------------------------------------------------

    #[derive(Default)]
    struct MockSource {
        windowed: Vec<GrainRecording>,
        unwindowed: Vec<GrainRecording>,
        windowed_calls: AtomicUsize,
        unwindowed_calls: AtomicUsize,
        fail_action_items_auth: bool,
    }

    #[async_trait]
    impl RecordingSource for MockSource {
        async fn list_recordings(
            &self,
            window: Option<&FetchWindow>,
            _limit: usize,
        ) -> Result<Vec<GrainRecording>, GrainError> {
            if window.is_some() {
                self.windowed_calls.fetch_add(1, Ordering::SeqCst);
                Ok(self.windowed.clone())
            } else {
                self.unwindowed_calls.fetch_add(1, Ordering::SeqCst);
                Ok(self.unwindowed.clone())
            }
        }

        async fn fetch_recording(
            &self,
            recording_id: &str,
        ) -> Result<GrainRecording, GrainError> {
            self.windowed
                .iter()
                .chain(self.unwindowed.iter())
                .find(|r| r.id == recording_id)
                .cloned()
                .ok_or_else(|| GrainError::RecordingNotFound(recording_id.to_string()))
        }

        async fn fetch_action_items(
            &self,
            _recording_id: &str,
        ) -> Result<Vec<GrainActionItem>, GrainError> {
            if self.fail_action_items_auth {
                return Err(GrainError::AuthRejected {
                    status: 401,
                    message: "token revoked".to_string(),
                });
            }
            Ok(Vec::new())
        }

        async fn fetch_summary(&self, _recording_id: &str) -> Result<Option<String>, GrainError> {
            Ok(None)
        }
    }

    fn external(email: &str) -> GrainParticipant {
        GrainParticipant {
            name: None,
            email: Some(email.to_string()),
            scope: Some("external".to_string()),
        }
    }

    fn recording(id: &str, start: &str) -> GrainRecording {
        GrainRecording {
            id: id.to_string(),
            title: Some(format!("Call {}", id)),
            start_datetime: Some(start.to_string()),
            end_datetime: Some("2026-03-10T16:00:00Z".to_string()),
            url: Some(format!("https://grain.com/share/recording/{}/tok", id)),
            thumbnail_url: Some(format!("https://media.grain.com/r/{}.jpeg", id)),
            participants: vec![external("ana@acme.com")],
            ..Default::default()
        }
    }

    fn engine(source: MockSource) -> SyncEngine<MockSource> {
        SyncEngine::new(test_db(), source, ThumbnailResolver::offline(), "u1")
    }

    fn count(engine: &SyncEngine<MockSource>, table: &str) -> i64 {
        engine
            .db()
            .conn_ref()
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // Window selection
    // -----------------------------------------------------------------------

    #[test]
    fn test_query_window_per_sync_type() {
        let now = Utc::now();

        let incremental = query_window(&SyncRequest::new(SyncType::Incremental), now).unwrap();
        assert_eq!(incremental.end - incremental.start, Duration::hours(24));

        let initial = query_window(&SyncRequest::new(SyncType::Initial), now).unwrap();
        assert_eq!(initial.end - initial.start, Duration::days(30));

        let mut manual = SyncRequest::new(SyncType::Manual);
        manual.start_date = Some(now - Duration::days(90));
        manual.end_date = Some(now - Duration::days(60));
        let window = query_window(&manual, now).unwrap();
        assert_eq!(window.start, now - Duration::days(90));
        assert_eq!(window.end, now - Duration::days(60));

        assert!(query_window(&SyncRequest::new(SyncType::AllTime), now).is_none());
        assert!(query_window(&SyncRequest::new(SyncType::Webhook), now).is_none());
    }

    // -----------------------------------------------------------------------
    // Run behavior
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_partial_failure_yields_summary_not_error() {
        // Scenario: 3 calls; one has no thumbnail (fine), one has a malformed
        // start timestamp (per-call data error)
        let mut no_thumbnail = recording("rec-2", "2026-03-10T15:00:00Z");
        no_thumbnail.thumbnail_url = None;
        let mut malformed = recording("rec-3", "2026-03-10T15:00:00Z");
        malformed.start_datetime = Some("yesterday-ish".to_string());

        let source = MockSource {
            windowed: vec![recording("rec-1", "2026-03-10T15:00:00Z"), no_thumbnail, malformed],
            ..Default::default()
        };
        let engine = engine(source);

        let summary = engine
            .sync(&SyncRequest::new(SyncType::Incremental))
            .await
            .unwrap();

        assert_eq!(summary.total_meetings_found, 3);
        assert_eq!(summary.meetings_synced, 2);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].call_id, "rec-3");

        let state = engine.db().get_sync_state("u1").unwrap().unwrap();
        assert_eq!(state.status, "idle");
        assert_eq!(state.meetings_synced, 2);
        assert_eq!(state.total_meetings_found, 3);
        assert!(state.last_error.is_some());
    }

    #[tokio::test]
    async fn test_empty_window_retries_unwindowed_exactly_once() {
        let source = MockSource {
            windowed: Vec::new(),
            unwindowed: vec![recording("rec-old", "2025-06-01T10:00:00Z")],
            ..Default::default()
        };
        let engine = engine(source);

        let summary = engine
            .sync(&SyncRequest::new(SyncType::Incremental))
            .await
            .unwrap();

        assert_eq!(summary.meetings_synced, 1);
        assert_eq!(engine.source.windowed_calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.source.unwindowed_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unwindowed_empty_result_is_not_retried() {
        let source = MockSource::default();
        let engine = engine(source);

        let summary = engine
            .sync(&SyncRequest::new(SyncType::AllTime))
            .await
            .unwrap();

        assert_eq!(summary.total_meetings_found, 0);
        assert_eq!(engine.source.unwindowed_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_run() {
        let source = MockSource {
            windowed: vec![
                recording("rec-1", "2026-03-10T15:00:00Z"),
                recording("rec-2", "2026-03-10T15:00:00Z"),
            ],
            fail_action_items_auth: true,
            ..Default::default()
        };
        // Items absent from the bulk payload force the per-recording fetch
        let engine = engine(source);

        let result = engine.sync(&SyncRequest::new(SyncType::Incremental)).await;
        assert!(matches!(result, Err(ref e) if e.is_auth()));

        // The second recording was never processed
        assert_eq!(count(&engine, "meetings"), 1);

        let state = engine.db().get_sync_state("u1").unwrap().unwrap();
        assert_eq!(state.status, "error");
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let make_source = || MockSource {
            windowed: vec![
                recording("rec-1", "2026-03-10T15:00:00Z"),
                recording("rec-2", "2026-03-11T15:00:00Z"),
            ],
            ..Default::default()
        };

        let engine = engine(make_source());
        engine
            .sync(&SyncRequest::new(SyncType::Incremental))
            .await
            .unwrap();

        let after_first = (
            count(&engine, "meetings"),
            count(&engine, "contacts"),
            count(&engine, "companies"),
            count(&engine, "meeting_contacts"),
        );

        engine
            .sync(&SyncRequest::new(SyncType::Incremental))
            .await
            .unwrap();

        let after_second = (
            count(&engine, "meetings"),
            count(&engine, "contacts"),
            count(&engine, "companies"),
            count(&engine, "meeting_contacts"),
        );
        assert_eq!(after_first, after_second);
        assert_eq!(after_first.0, 2);
        assert_eq!(after_first.1, 1);
        assert_eq!(after_first.2, 1);

        // Re-linking did not inflate activity signals
        let contact = engine
            .db()
            .get_contact_by_email("u1", "ana@acme.com")
            .unwrap()
            .unwrap();
        assert_eq!(contact.meeting_count, 2);
    }

    #[tokio::test]
    async fn test_primary_contact_and_company_follow_winner() {
        let mut rec = recording("rec-1", "2026-03-10T15:00:00Z");
        rec.participants = vec![external("ana@acme.com"), external("ben@globex.io")];

        let engine = engine(MockSource {
            windowed: vec![rec],
            ..Default::default()
        });

        // Ana has history; she should win primary
        engine
            .db()
            .conn_ref()
            .execute_batch(
                "INSERT INTO contacts (id, user_id, email, meeting_count, created_at, updated_at)
                 VALUES ('ct-ana', 'u1', 'ana@acme.com', 7, '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z');",
            )
            .unwrap();

        engine
            .sync(&SyncRequest::new(SyncType::Incremental))
            .await
            .unwrap();

        let meeting = engine
            .db()
            .get_meeting_by_recording_id("u1", "rec-1")
            .unwrap()
            .unwrap();
        assert_eq!(meeting.primary_contact_id.as_deref(), Some("ct-ana"));
        assert_eq!(meeting.sync_status, "synced");
        assert_eq!(meeting.duration_seconds, Some(3600));
        assert_eq!(
            meeting.embed_url.as_deref(),
            Some("https://grain.com/_/embed/recording/rec-1/tok")
        );

        // Ana's company (backfilled during resolution) became the meeting's
        let ana = engine.db().get_contact("ct-ana").unwrap().unwrap();
        assert_eq!(meeting.company_id, ana.company_id);
        assert!(meeting.company_id.is_some());

        let primaries: i64 = engine
            .db()
            .conn_ref()
            .query_row(
                "SELECT COUNT(*) FROM meeting_contacts WHERE is_primary = 1",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(primaries, 1);
    }

    #[tokio::test]
    async fn test_internal_only_meeting_has_no_primary() {
        let mut rec = recording("rec-1", "2026-03-10T15:00:00Z");
        rec.participants = vec![GrainParticipant {
            name: Some("Host".to_string()),
            email: Some("host@ourco.com".to_string()),
            scope: Some("internal".to_string()),
        }];

        let engine = engine(MockSource {
            windowed: vec![rec],
            ..Default::default()
        });
        let summary = engine
            .sync(&SyncRequest::new(SyncType::Incremental))
            .await
            .unwrap();
        assert_eq!(summary.meetings_synced, 1);

        let meeting = engine
            .db()
            .get_meeting_by_recording_id("u1", "rec-1")
            .unwrap()
            .unwrap();
        assert!(meeting.primary_contact_id.is_none());
        assert!(meeting.company_id.is_none());
        assert_eq!(count(&engine, "contacts"), 0);
    }

    #[tokio::test]
    async fn test_webhook_syncs_single_recording() {
        let engine = engine(MockSource {
            unwindowed: vec![recording("rec-99", "2026-03-10T15:00:00Z")],
            ..Default::default()
        });

        let mut request = SyncRequest::new(SyncType::Webhook);
        request.recording_id = Some("rec-99".to_string());
        let summary = engine.sync(&request).await.unwrap();

        assert_eq!(summary.total_meetings_found, 1);
        assert_eq!(summary.meetings_synced, 1);
        // Webhook runs never hit the list endpoint
        assert_eq!(engine.source.windowed_calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.source.unwindowed_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ai_action_items_deduped_against_native() {
        let mut rec = recording("rec-1", "2026-03-10T15:00:00Z");
        rec.action_items = vec![
            GrainActionItem {
                id: Some("it-1".to_string()),
                text: "Send the proposal to Acme".to_string(),
                ai_generated: false,
            },
            GrainActionItem {
                id: None,
                text: "send the proposal to acme!".to_string(),
                ai_generated: true,
            },
            GrainActionItem {
                id: None,
                text: "Investigate the staging API latency spike".to_string(),
                ai_generated: true,
            },
        ];

        let engine = engine(MockSource {
            windowed: vec![rec],
            ..Default::default()
        });
        engine
            .sync(&SyncRequest::new(SyncType::Incremental))
            .await
            .unwrap();
        // Second pass re-inserts nothing
        engine
            .sync(&SyncRequest::new(SyncType::Incremental))
            .await
            .unwrap();

        let meeting = engine
            .db()
            .get_meeting_by_recording_id("u1", "rec-1")
            .unwrap()
            .unwrap();
        let items = engine.db().get_action_items(&meeting.id).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().any(|i| !i.ai_generated));
        assert!(items
            .iter()
            .any(|i| i.ai_generated && i.text.contains("latency")));
    }

    #[tokio::test]
    async fn test_cancel_stops_issuing_calls() {
        let engine = engine(MockSource {
            windowed: vec![
                recording("rec-1", "2026-03-10T15:00:00Z"),
                recording("rec-2", "2026-03-10T15:00:00Z"),
            ],
            ..Default::default()
        });
        engine.cancel_handle().store(true, Ordering::Relaxed);

        let summary = engine
            .sync(&SyncRequest::new(SyncType::Incremental))
            .await
            .unwrap();
        assert_eq!(summary.total_meetings_found, 2);
        assert_eq!(summary.meetings_synced, 0);
        assert!(summary.errors.is_empty());
    }
}
