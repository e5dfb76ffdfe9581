//! The sync pipeline: orchestration, entity resolution, primary selection,
//! and action-item deduplication.

pub mod dedup;
pub mod orchestrator;
pub mod primary;
pub mod resolver;

pub use orchestrator::{
    query_window, CallError, SyncEngine, SyncRequest, SyncSummary, SyncType,
    MAX_RECORDS_PER_SYNC,
};
pub use resolver::{resolve_attendee, Resolution};
