//! Calendar agent
//!
//! Reads are served from the shared [`EventCache`](crate::calendar::EventCache)
//! kept fresh by the sync worker; writes go to the provider first and are then
//! mirrored into the cache (and the embedding index, when enabled).

use std::collections::HashSet;
use std::sync::Arc;

use actionarc_domain::constants::{DEFAULT_LOOKAHEAD_DAYS, DEFAULT_LOOKBACK_DAYS};
use actionarc_domain::{
    parse_action, ActionArcError, ActionResult, Attendee, CalendarAction, CalendarEvent,
    EmailAddress, EventTimeRange, NewCalendarEvent, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{system_clock, Agent, Clock};
use crate::calendar::{index_events, SharedEmbeddingIndex, SharedEventCache};
use crate::matching::{rank_events_by_participants, rank_events_by_subject};
use crate::ports::{CalendarProvider, Embedder};

const DEFAULT_EVENT_MINUTES: i64 = 30;

/// Similarity below which an embedding hit is not considered a match.
const MIN_SEMANTIC_SCORE: f32 = 0.3;

const ACTIONS: &[&str] =
    &["addEvent", "findEvents", "deleteEvent", "findTodaysEvents", "findThisWeeksEvents"];

struct SemanticSearch {
    index: SharedEmbeddingIndex,
    embedder: Arc<dyn Embedder>,
}

pub struct CalendarAgent {
    provider: Arc<dyn CalendarProvider>,
    cache: SharedEventCache,
    semantic: Option<SemanticSearch>,
    lookback_days: i64,
    lookahead_days: i64,
    clock: Clock,
}

impl CalendarAgent {
    pub fn new(provider: Arc<dyn CalendarProvider>, cache: SharedEventCache) -> Self {
        Self {
            provider,
            cache,
            semantic: None,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            clock: system_clock(),
        }
    }

    /// Rank subject searches by embedding similarity.
    pub fn with_embeddings(mut self, index: SharedEmbeddingIndex, embedder: Arc<dyn Embedder>) -> Self {
        self.semantic = Some(SemanticSearch { index, embedder });
        self
    }

    /// Window fetched when the cache has never been synced.
    pub fn with_window(mut self, lookback_days: i64, lookahead_days: i64) -> Self {
        self.lookback_days = lookback_days;
        self.lookahead_days = lookahead_days;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Populates the cache from the provider if no sync has happened yet.
    async fn ensure_loaded(&self) -> Result<()> {
        if self.cache.read().last_synced().is_some() {
            return Ok(());
        }

        let range = EventTimeRange::around(self.now(), self.lookback_days, self.lookahead_days);
        let events = self.provider.list_events(range).await?;
        debug!(provider = self.provider.provider_name(), count = events.len(), "initial calendar load");

        let diff = self.cache.write().apply_snapshot(events.clone());
        if let Some(semantic) = &self.semantic {
            let changed: HashSet<&String> = diff.changed().collect();
            let fresh: Vec<CalendarEvent> =
                events.into_iter().filter(|e| changed.contains(&e.id)).collect();
            if let Err(e) = index_events(semantic.embedder.as_ref(), &semantic.index, &fresh).await {
                warn!(error = %e, "failed to index calendar events");
            }
        }
        Ok(())
    }

    async fn add_event(&self, new: NewCalendarEvent) -> Result<ActionResult> {
        let created = self.provider.create_event(&new).await?;
        info!(provider = self.provider.provider_name(), event_id = %created.id, "created calendar event");

        self.cache.write().insert(created.clone());
        if let Some(semantic) = &self.semantic {
            if let Err(e) =
                index_events(semantic.embedder.as_ref(), &semantic.index, std::slice::from_ref(&created)).await
            {
                warn!(event_id = %created.id, error = %e, "failed to index new event");
            }
        }

        Ok(ActionResult::with_data(
            format!("Created event: {}", describe_event(&created)),
            json!({ "event": created }),
        ))
    }

    /// Orders `candidates` by subject relevance, semantic first when enabled.
    async fn rank_by_subject(&self, candidates: Vec<CalendarEvent>, subject: &str) -> Vec<CalendarEvent> {
        if let Some(semantic) = &self.semantic {
            match self.semantic_rank(semantic, &candidates, subject).await {
                Ok(ranked) if !ranked.is_empty() => return ranked,
                Ok(_) => debug!(query = subject, "no semantic match, falling back to token overlap"),
                Err(e) => warn!(error = %e, "semantic search failed, falling back to token overlap"),
            }
        }
        rank_events_by_subject(&candidates, subject).into_iter().map(|(e, _)| e.clone()).collect()
    }

    async fn semantic_rank(
        &self,
        semantic: &SemanticSearch,
        candidates: &[CalendarEvent],
        subject: &str,
    ) -> Result<Vec<CalendarEvent>> {
        let query = semantic.embedder.embed(&[subject.to_string()]).await?;
        let query = query
            .into_iter()
            .next()
            .ok_or_else(|| ActionArcError::Internal("embedder returned no vector".into()))?;

        let hits = {
            let index = semantic.index.read();
            index.nearest(&query, index.len())
        };
        Ok(hits
            .into_iter()
            .filter(|(_, score)| *score >= MIN_SEMANTIC_SCORE)
            .filter_map(|(id, _)| candidates.iter().find(|e| e.id == id).cloned())
            .collect())
    }

    /// Applies the participant filter, then subject ranking.
    async fn search(
        &self,
        candidates: Vec<CalendarEvent>,
        subject: Option<&str>,
        participants: &[String],
    ) -> Vec<CalendarEvent> {
        let candidates = if participants.is_empty() {
            candidates
        } else {
            rank_events_by_participants(&candidates, participants)
                .into_iter()
                .map(|(e, _)| e.clone())
                .collect()
        };

        match subject.map(str::trim).filter(|s| !s.is_empty()) {
            Some(subject) => self.rank_by_subject(candidates, subject).await,
            None => candidates,
        }
    }

    async fn find_events(
        &self,
        subject: Option<String>,
        participants: Vec<String>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<ActionResult> {
        self.ensure_loaded().await?;

        let range = match (start, end) {
            (Some(start), Some(end)) => Some(EventTimeRange::new(start, end)),
            (Some(start), None) => Some(EventTimeRange::new(start, start + Duration::days(1))),
            (None, Some(end)) => Some(EventTimeRange::new(self.now(), end)),
            (None, None) => None,
        };
        if let Some(range) = &range {
            if range.end <= range.start {
                return Err(ActionArcError::InvalidInput("end must be after start".into()));
            }
        }

        let candidates: Vec<CalendarEvent> = {
            let cache = self.cache.read();
            match &range {
                Some(range) => cache.in_range(range).into_iter().cloned().collect(),
                None => cache.all().into_iter().cloned().collect(),
            }
        };

        let found = self.search(candidates, subject.as_deref(), &participants).await;
        Ok(event_listing("No matching events found.", found))
    }

    async fn delete_event(
        &self,
        event_id: Option<String>,
        subject: Option<String>,
        participants: Vec<String>,
    ) -> Result<ActionResult> {
        let target = match event_id {
            Some(id) => {
                let cached = self.cache.read().get(&id).cloned();
                match cached {
                    Some(event) => event,
                    None => self.provider.get_event(&id).await?.ok_or_else(|| {
                        ActionArcError::NotFound(format!("no event with id {id}"))
                    })?,
                }
            }
            None => {
                if subject.as_deref().map_or(true, |s| s.trim().is_empty()) && participants.is_empty() {
                    return Err(ActionArcError::InvalidInput(
                        "deleteEvent needs an eventId, a subject or participants".into(),
                    ));
                }
                self.ensure_loaded().await?;
                let candidates: Vec<CalendarEvent> =
                    self.cache.read().all().into_iter().cloned().collect();
                self.search(candidates, subject.as_deref(), &participants)
                    .await
                    .into_iter()
                    .next()
                    .ok_or_else(|| ActionArcError::NotFound("no matching event to delete".into()))?
            }
        };

        self.provider.delete_event(&target.id).await?;
        info!(provider = self.provider.provider_name(), event_id = %target.id, "deleted calendar event");

        self.cache.write().remove(&target.id);
        if let Some(semantic) = &self.semantic {
            semantic.index.write().remove(&target.id);
        }

        Ok(ActionResult::with_data(
            format!("Deleted event: {}", describe_event(&target)),
            json!({ "event": target }),
        ))
    }

    async fn events_in(&self, range: EventTimeRange, empty: &str) -> Result<ActionResult> {
        self.ensure_loaded().await?;
        let events: Vec<CalendarEvent> = self.cache.read().in_range(&range).into_iter().cloned().collect();
        Ok(event_listing(empty, events))
    }
}

/// Builds the provider request for an `addEvent` action.
///
/// All-day events are pinned to UTC midnight and span whole days. Timed events
/// without an explicit end last `duration_minutes` (30 by default).
#[allow(clippy::too_many_arguments)]
pub fn new_event(
    subject: String,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    duration_minutes: Option<i64>,
    location: Option<String>,
    body: Option<String>,
    attendees: Vec<String>,
    is_all_day: bool,
) -> Result<NewCalendarEvent> {
    if subject.trim().is_empty() {
        return Err(ActionArcError::InvalidInput("event subject is required".into()));
    }

    let (start, end) = if is_all_day {
        let first = midnight(start);
        let last = end.map(midnight).filter(|d| *d >= first).unwrap_or(first);
        let end = last.checked_add_signed(Duration::days(1)).ok_or_else(out_of_range)?;
        (first, end)
    } else {
        let end = match end {
            Some(end) => end,
            None => {
                let minutes = duration_minutes.unwrap_or(DEFAULT_EVENT_MINUTES);
                Duration::try_minutes(minutes)
                    .and_then(|length| start.checked_add_signed(length))
                    .ok_or_else(out_of_range)?
            }
        };
        if end <= start {
            return Err(ActionArcError::InvalidInput("event must end after it starts".into()));
        }
        (start, end)
    };

    let attendees = attendees
        .iter()
        .map(|raw| {
            let address: EmailAddress = raw.parse()?;
            Ok(Attendee { email: address.address, name: address.name, required: true })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(NewCalendarEvent { subject, body, start, end, location, attendees, is_all_day })
}

fn out_of_range() -> ActionArcError {
    ActionArcError::InvalidInput("event end is out of range".into())
}

fn midnight(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// `[00:00 today, 00:00 tomorrow)` in UTC.
pub fn today_range(now: DateTime<Utc>) -> EventTimeRange {
    let start = midnight(now);
    EventTimeRange::new(start, start + Duration::days(1))
}

/// From 00:00 today up to the next Monday 00:00, in UTC.
pub fn this_week_range(now: DateTime<Utc>) -> EventTimeRange {
    let start = midnight(now);
    let days_left = 7 - i64::from(now.weekday().num_days_from_monday());
    EventTimeRange::new(start, start + Duration::days(days_left))
}

pub fn describe_event(event: &CalendarEvent) -> String {
    let when = if event.is_all_day {
        format!("{} (all day)", event.start.format("%Y-%m-%d"))
    } else {
        format!("{}-{} UTC", event.start.format("%Y-%m-%d %H:%M"), event.end.format("%H:%M"))
    };
    match &event.location {
        Some(location) => format!("{when} {} @ {location}", event.subject),
        None => format!("{when} {}", event.subject),
    }
}

fn event_listing(empty: &str, events: Vec<CalendarEvent>) -> ActionResult {
    if events.is_empty() {
        return ActionResult::with_data(empty, json!({ "events": [] }));
    }
    let text = events.iter().map(|e| format!("- {}", describe_event(e))).collect::<Vec<_>>().join("\n");
    ActionResult::with_data(text, json!({ "events": events }))
}

#[async_trait]
impl Agent for CalendarAgent {
    fn name(&self) -> &'static str {
        "calendar"
    }

    fn action_names(&self) -> &'static [&'static str] {
        ACTIONS
    }

    async fn execute(&self, action: Value) -> Result<ActionResult> {
        match parse_action::<CalendarAction>(action)? {
            CalendarAction::AddEvent {
                subject,
                start,
                end,
                duration_minutes,
                location,
                body,
                attendees,
                is_all_day,
            } => {
                let new = new_event(
                    subject,
                    start,
                    end,
                    duration_minutes,
                    location,
                    body,
                    attendees,
                    is_all_day,
                )?;
                self.add_event(new).await
            }
            CalendarAction::FindEvents { subject, participants, start, end } => {
                self.find_events(subject, participants, start, end).await
            }
            CalendarAction::DeleteEvent { event_id, subject, participants } => {
                self.delete_event(event_id, subject, participants).await
            }
            CalendarAction::FindTodaysEvents {} => {
                self.events_in(today_range(self.now()), "No events today.").await
            }
            CalendarAction::FindThisWeeksEvents {} => {
                self.events_in(this_week_range(self.now()), "No events for the rest of this week.").await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, d, h, m, 0).unwrap()
    }

    #[test]
    fn timed_event_defaults_to_thirty_minutes() {
        let event =
            new_event("Sync".into(), at(6, 9, 0), None, None, None, None, vec![], false).unwrap();
        assert_eq!(event.end, at(6, 9, 30));

        let longer =
            new_event("Sync".into(), at(6, 9, 0), None, Some(90), None, None, vec![], false).unwrap();
        assert_eq!(longer.end, at(6, 10, 30));
    }

    #[test]
    fn all_day_event_spans_whole_days() {
        let single =
            new_event("Offsite".into(), at(6, 15, 0), None, None, None, None, vec![], true).unwrap();
        assert_eq!((single.start, single.end), (at(6, 0, 0), at(7, 0, 0)));

        let multi = new_event("Offsite".into(), at(6, 15, 0), Some(at(8, 1, 0)), None, None, None, vec![], true)
            .unwrap();
        assert_eq!(multi.end, at(9, 0, 0));
    }

    #[test]
    fn out_of_range_duration_is_invalid_input() {
        for minutes in [i64::MAX, i64::MIN] {
            let err = new_event("x".into(), at(6, 9, 0), None, Some(minutes), None, None, vec![], false)
                .unwrap_err();
            assert!(matches!(err, ActionArcError::InvalidInput(msg) if msg.contains("out of range")));
        }

        let last_day = DateTime::<Utc>::MAX_UTC;
        assert!(matches!(
            new_event("x".into(), last_day, None, None, None, None, vec![], true),
            Err(ActionArcError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_bad_events() {
        assert!(new_event(" ".into(), at(6, 9, 0), None, None, None, None, vec![], false).is_err());
        assert!(new_event("x".into(), at(6, 9, 0), Some(at(6, 8, 0)), None, None, None, vec![], false).is_err());
        assert!(new_event("x".into(), at(6, 9, 0), None, None, None, None, vec!["nope".into()], false).is_err());
    }

    #[test]
    fn attendees_accept_display_names() {
        let event = new_event(
            "x".into(),
            at(6, 9, 0),
            None,
            None,
            None,
            None,
            vec!["Ada <ada@example.com>".into()],
            false,
        )
        .unwrap();
        assert_eq!(event.attendees[0].email, "ada@example.com");
        assert_eq!(event.attendees[0].name.as_deref(), Some("Ada"));
    }

    #[test]
    fn week_runs_until_next_monday() {
        // 2025-05-07 is a Wednesday
        let range = this_week_range(at(7, 13, 0));
        assert_eq!(range.start, at(7, 0, 0));
        assert_eq!(range.end, at(12, 0, 0));

        // on a Monday the whole week is included
        let monday = this_week_range(at(5, 8, 0));
        assert_eq!(monday.end, at(12, 0, 0));

        assert_eq!(today_range(at(7, 23, 59)).end, at(8, 0, 0));
    }
}
