use std::sync::{Arc, Mutex};

use actionarc_core::{CalendarProvider, Embedder};
use actionarc_domain::{
    ActionArcError, Attendee, CalendarEvent, EventTimeRange, NewCalendarEvent, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

pub fn event(id: &str, subject: &str, start: DateTime<Utc>, attendees: &[&str]) -> CalendarEvent {
    CalendarEvent {
        id: id.into(),
        subject: subject.into(),
        body: None,
        start,
        end: start + Duration::minutes(30),
        is_all_day: false,
        location: None,
        attendees: attendees.iter().map(|a| Attendee::new(*a)).collect(),
        organizer: None,
        web_link: None,
    }
}

/// In-memory calendar that records every write.
#[derive(Default, Clone)]
pub struct MockCalendarProvider {
    events: Arc<Mutex<Vec<CalendarEvent>>>,
    pub created: Arc<Mutex<Vec<NewCalendarEvent>>>,
    pub deleted: Arc<Mutex<Vec<String>>>,
    pub list_calls: Arc<Mutex<usize>>,
}

impl MockCalendarProvider {
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        Self { events: Arc::new(Mutex::new(events)), ..Default::default() }
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

#[async_trait]
impl CalendarProvider for MockCalendarProvider {
    fn provider_name(&self) -> &'static str {
        "mock"
    }

    async fn list_events(&self, range: EventTimeRange) -> Result<Vec<CalendarEvent>> {
        *self.list_calls.lock().unwrap() += 1;
        Ok(self.events.lock().unwrap().iter().filter(|e| e.overlaps(&range)).cloned().collect())
    }

    async fn get_event(&self, id: &str) -> Result<Option<CalendarEvent>> {
        Ok(self.events.lock().unwrap().iter().find(|e| e.id == id).cloned())
    }

    async fn create_event(&self, new: &NewCalendarEvent) -> Result<CalendarEvent> {
        self.created.lock().unwrap().push(new.clone());
        let created = CalendarEvent {
            id: format!("created-{}", self.created.lock().unwrap().len()),
            subject: new.subject.clone(),
            body: new.body.clone(),
            start: new.start,
            end: new.end,
            is_all_day: new.is_all_day,
            location: new.location.clone(),
            attendees: new.attendees.clone(),
            organizer: None,
            web_link: None,
        };
        self.events.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn delete_event(&self, id: &str) -> Result<()> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e.id != id);
        if events.len() == before {
            return Err(ActionArcError::Api { status: 404, message: "not found".into() });
        }
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn user_email(&self) -> Result<Option<String>> {
        Ok(Some("me@example.com".into()))
    }
}

/// Embeds text as a bag of fixed keywords, one dimension each.
///
/// Synonyms map to the same dimension so semantic matches can be told apart
/// from plain token overlap.
pub struct KeywordEmbedder {
    pub fail: bool,
}

const DIMENSIONS: &[&[&str]] = &[
    &["dentist", "teeth", "dental"],
    &["budget", "finance", "money"],
    &["standup", "sync", "daily"],
    &["lunch", "food", "meal"],
];

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.fail {
            return Err(ActionArcError::Network("embedding service unavailable".into()));
        }
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                DIMENSIONS
                    .iter()
                    .map(|words| if words.iter().any(|w| lower.contains(w)) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect())
    }
}
