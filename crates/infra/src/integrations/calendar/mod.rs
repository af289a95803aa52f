//! Calendar providers and the background sync worker
//!
//! ```text
//! CalendarSyncWorker ──list_events(window)──▶ GraphCalendarProvider | GoogleCalendarProvider
//!        │                                              │
//!        ├── apply_snapshot ──▶ SharedEventCache        └── ApiClient (bearer + retries)
//!        └── index_events   ──▶ SharedEmbeddingIndex
//! ```

pub mod google;
pub mod graph;
pub mod sync;

pub use google::GoogleCalendarProvider;
pub use graph::GraphCalendarProvider;
pub use sync::{CalendarSyncWorker, SyncHandle, SyncOutcome};

use tracing::warn;

/// Trims an attendee address; drops empty ones.
///
/// Addresses without `@` are kept since provider data is canonical.
pub(crate) fn validate_and_log_email(email: &str, event_id: &str) -> Option<String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        warn!(event_id, "empty attendee email");
        return None;
    }
    if !trimmed.contains('@') {
        warn!(event_id, email = trimmed, "attendee email missing @ symbol");
    }
    Some(trimmed.to_string())
}
