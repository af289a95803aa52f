//! Best-effort mirror of the provider's calendar window
//!
//! Each sync replaces the working set wholesale: everything fetched is added
//! or updated, everything no longer returned is dropped.

use std::collections::{HashMap, HashSet};

use actionarc_domain::{CalendarEvent, EventTimeRange};
use chrono::{DateTime, Utc};

use crate::matching::{rank_events_by_participants, rank_events_by_subject};

/// Ids touched by one snapshot, each list sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheDiff {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
}

impl CacheDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Ids whose content needs (re-)indexing.
    pub fn changed(&self) -> impl Iterator<Item = &String> {
        self.added.iter().chain(self.updated.iter())
    }
}

#[derive(Debug, Default)]
pub struct EventCache {
    events: HashMap<String, CalendarEvent>,
    last_synced: Option<DateTime<Utc>>,
}

impl EventCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the working set with `events`.
    pub fn apply_snapshot(&mut self, events: Vec<CalendarEvent>) -> CacheDiff {
        let mut diff = CacheDiff::default();
        let fetched: HashSet<String> = events.iter().map(|e| e.id.clone()).collect();

        diff.removed = self.events.keys().filter(|id| !fetched.contains(*id)).cloned().collect();
        for id in &diff.removed {
            self.events.remove(id);
        }

        for event in events {
            match self.events.get(&event.id) {
                None => diff.added.push(event.id.clone()),
                Some(existing) if *existing != event => diff.updated.push(event.id.clone()),
                Some(_) => {}
            }
            self.events.insert(event.id.clone(), event);
        }

        diff.added.sort();
        diff.updated.sort();
        diff.removed.sort();
        self.last_synced = Some(Utc::now());
        diff
    }

    /// Adds one event outside a sync (e.g. right after creating it).
    pub fn insert(&mut self, event: CalendarEvent) {
        self.events.insert(event.id.clone(), event);
    }

    pub fn remove(&mut self, id: &str) -> Option<CalendarEvent> {
        self.events.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&CalendarEvent> {
        self.events.get(id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// When the last full snapshot was applied; `None` before the first sync.
    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        self.last_synced
    }

    /// Every cached event, ordered by start.
    pub fn all(&self) -> Vec<&CalendarEvent> {
        let mut events: Vec<_> = self.events.values().collect();
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        events
    }

    /// Events intersecting the range, ordered by start.
    pub fn in_range(&self, range: &EventTimeRange) -> Vec<&CalendarEvent> {
        self.all().into_iter().filter(|e| e.overlaps(range)).collect()
    }

    pub fn find_by_subject(&self, query: &str) -> Vec<&CalendarEvent> {
        rank_events_by_subject(self.events.values(), query).into_iter().map(|(e, _)| e).collect()
    }

    pub fn find_by_participants(&self, participants: &[String]) -> Vec<&CalendarEvent> {
        rank_events_by_participants(self.events.values(), participants)
            .into_iter()
            .map(|(e, _)| e)
            .collect()
    }

    /// Next `n` events starting at or after `now`.
    pub fn upcoming(&self, now: DateTime<Utc>, n: usize) -> Vec<&CalendarEvent> {
        self.all().into_iter().filter(|e| e.start >= now).take(n).collect()
    }
}
