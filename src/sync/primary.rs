//! Primary contact selection.
//!
//! A meeting gets exactly one primary external contact. The ranking is a
//! documented total order over stable signals so repeated runs on the same
//! candidate set always pick the same winner:
//!
//! 1. `meeting_count` descending (most meeting history wins)
//! 2. `last_meeting_at` descending, contacts never met sort last
//! 3. `created_at` ascending (earliest known contact breaks ties)
//! 4. `id` ascending (total order even for identical rows)

use std::cmp::Ordering;

use crate::db::DbContact;

/// Pick the primary contact. An empty candidate set is a valid terminal
/// state (internal-only meeting) and returns `None`.
pub fn select_primary(candidates: &[DbContact]) -> Option<&DbContact> {
    candidates.iter().min_by(|a, b| rank_cmp(a, b))
}

/// Best-first comparison implementing the documented order.
fn rank_cmp(a: &DbContact, b: &DbContact) -> Ordering {
    b.meeting_count
        .cmp(&a.meeting_count)
        .then_with(|| match (&a.last_meeting_at, &b.last_meeting_at) {
            // RFC 3339 strings in the same zone compare lexicographically
            (Some(x), Some(y)) => y.cmp(x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}
