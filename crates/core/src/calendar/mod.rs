//! Calendar working set: the synced event cache and its embedding index

pub mod cache;
pub mod index;

use std::sync::Arc;

use actionarc_domain::{ActionArcError, CalendarEvent, Result};
use parking_lot::RwLock;

pub use cache::{CacheDiff, EventCache};
pub use index::{cosine_similarity, EmbeddingIndex};

use crate::ports::Embedder;

/// Cache shared between the sync worker and the calendar agent.
pub type SharedEventCache = Arc<RwLock<EventCache>>;

/// Index shared between the sync worker and the calendar agent.
pub type SharedEmbeddingIndex = Arc<RwLock<EmbeddingIndex>>;

pub fn shared_cache() -> SharedEventCache {
    Arc::new(RwLock::new(EventCache::new()))
}

pub fn shared_index() -> SharedEmbeddingIndex {
    Arc::new(RwLock::new(EmbeddingIndex::new()))
}

/// Text embedded for an event: subject, plus location when present.
pub fn event_text(event: &CalendarEvent) -> String {
    match &event.location {
        Some(location) if !location.trim().is_empty() => format!("{} ({})", event.subject, location),
        _ => event.subject.clone(),
    }
}

/// Embeds `events` in one batch and upserts the vectors.
///
/// Returns the number of vectors written.
pub async fn index_events(
    embedder: &dyn Embedder,
    index: &SharedEmbeddingIndex,
    events: &[CalendarEvent],
) -> Result<usize> {
    if events.is_empty() {
        return Ok(0);
    }
    let texts: Vec<String> = events.iter().map(event_text).collect();
    let vectors = embedder.embed(&texts).await?;
    if vectors.len() != events.len() {
        return Err(ActionArcError::Internal(format!(
            "embedder returned {} vectors for {} inputs",
            vectors.len(),
            events.len()
        )));
    }

    let mut index = index.write();
    for (event, vector) in events.iter().zip(vectors) {
        index.upsert(event.id.clone(), vector);
    }
    Ok(events.len())
}
