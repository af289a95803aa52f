//! Google Calendar provider

use std::sync::Arc;

use actionarc_core::{get_k_cursor, AccessTokenSource, CalendarProvider, Page};
use actionarc_domain::{
    ActionArcError, Attendee, CalendarEvent, EventTimeRange, NewCalendarEvent, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::validate_and_log_email;
use crate::http::HttpClient;
use crate::integrations::rest::{ApiClient, GOOGLE_CALENDAR_BASE_URL};

const EVENTS_PATH: &str = "calendars/primary/events";
const MAX_RESULTS: &str = "250";

pub struct GoogleCalendarProvider {
    api: ApiClient,
}

impl GoogleCalendarProvider {
    pub fn new(http: HttpClient, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self::with_api(ApiClient::new("google-calendar", GOOGLE_CALENDAR_BASE_URL, http, tokens))
    }

    pub fn with_api(api: ApiClient) -> Self {
        Self { api }
    }

    async fn events_page(
        &self,
        range: EventTimeRange,
        page_token: Option<String>,
    ) -> Result<Page<CalendarEvent>> {
        let mut query = vec![
            ("timeMin", range.start.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("timeMax", range.end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("maxResults", MAX_RESULTS.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response: GoogleEventsResponse = self.api.get_json(EVENTS_PATH, &query).await?;
        let events = response
            .items
            .into_iter()
            .filter(|event| event.status.as_deref() != Some("cancelled"))
            .filter_map(|event| event.into_event())
            .collect();
        Ok(Page::new(events, response.next_page_token))
    }

    fn event_path(id: &str) -> String {
        format!("{EVENTS_PATH}/{}", urlencoding::encode(id))
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarProvider {
    fn provider_name(&self) -> &'static str {
        "google"
    }

    #[instrument(skip(self), fields(start = %range.start, end = %range.end))]
    async fn list_events(&self, range: EventTimeRange) -> Result<Vec<CalendarEvent>> {
        let events = get_k_cursor(usize::MAX, move |token| self.events_page(range, token)).await?;
        debug!(count = events.len(), "fetched Google calendar events");
        Ok(events)
    }

    #[instrument(skip(self))]
    async fn get_event(&self, id: &str) -> Result<Option<CalendarEvent>> {
        match self.api.get_json::<GoogleCalendarEvent>(&Self::event_path(id), &[]).await {
            Ok(event) if event.status.as_deref() == Some("cancelled") => Ok(None),
            Ok(event) => Ok(event.into_event()),
            // 410 Gone for deleted events
            Err(err) if err.is_status(404) || err.is_status(410) => Ok(None),
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, event), fields(subject = %event.subject))]
    async fn create_event(&self, event: &NewCalendarEvent) -> Result<CalendarEvent> {
        let body = GoogleNewEvent::from(event);
        let created: GoogleCalendarEvent = self.api.post_json(EVENTS_PATH, &body).await?;
        created
            .into_event()
            .ok_or_else(|| ActionArcError::Internal("Google returned an unreadable event".into()))
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, id: &str) -> Result<()> {
        self.api.send_no_content::<()>(Method::DELETE, &Self::event_path(id), None).await
    }

    /// The primary calendar's id is the account address.
    async fn user_email(&self) -> Result<Option<String>> {
        let calendar: GoogleCalendar = self.api.get_json("calendars/primary", &[]).await?;
        Ok(Some(calendar.id).filter(|id| id.contains('@')))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventsResponse {
    #[serde(default)]
    items: Vec<GoogleCalendarEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleCalendar {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleCalendarEvent {
    id: String,
    status: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<GoogleEventDateTime>,
    end: Option<GoogleEventDateTime>,
    #[serde(default)]
    attendees: Vec<GoogleAttendee>,
    organizer: Option<GoogleOrganizer>,
    html_link: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    /// All-day events carry only a date.
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleAttendee {
    #[serde(default)]
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(default)]
    optional: bool,
}

#[derive(Debug, Deserialize)]
struct GoogleOrganizer {
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct GoogleNewEvent {
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    start: GoogleEventDateTime,
    end: GoogleEventDateTime,
    attendees: Vec<GoogleAttendee>,
}

impl GoogleEventDateTime {
    fn from_utc(time: DateTime<Utc>, all_day: bool) -> Self {
        if all_day {
            Self { date: Some(time.format("%Y-%m-%d").to_string()), ..Self::default() }
        } else {
            Self {
                date_time: Some(time.to_rfc3339_opts(SecondsFormat::Secs, true)),
                time_zone: Some("UTC".to_string()),
                ..Self::default()
            }
        }
    }

    /// Returns the instant and whether it was a date-only (all-day) value.
    fn parse(&self) -> Option<(DateTime<Utc>, bool)> {
        if let Some(value) = &self.date_time {
            return DateTime::parse_from_rfc3339(value).ok().map(|t| (t.with_timezone(&Utc), false));
        }
        let date = NaiveDate::parse_from_str(self.date.as_deref()?, "%Y-%m-%d").ok()?;
        Some((date.and_hms_opt(0, 0, 0)?.and_utc(), true))
    }
}

impl From<&NewCalendarEvent> for GoogleNewEvent {
    fn from(event: &NewCalendarEvent) -> Self {
        Self {
            summary: event.subject.clone(),
            description: event.body.clone(),
            location: event.location.clone(),
            start: GoogleEventDateTime::from_utc(event.start, event.is_all_day),
            end: GoogleEventDateTime::from_utc(event.end, event.is_all_day),
            attendees: event
                .attendees
                .iter()
                .map(|a| GoogleAttendee {
                    email: a.email.clone(),
                    display_name: a.name.clone(),
                    optional: !a.required,
                })
                .collect(),
        }
    }
}

impl GoogleCalendarEvent {
    fn into_event(self) -> Option<CalendarEvent> {
        let start = self.start.as_ref().and_then(GoogleEventDateTime::parse);
        let end = self.end.as_ref().and_then(GoogleEventDateTime::parse);
        let (Some((start, all_day)), Some((end, _))) = (start, end) else {
            warn!(event_id = %self.id, "skipping event with unparseable time");
            return None;
        };

        let attendees = self
            .attendees
            .into_iter()
            .filter_map(|attendee| {
                let email = validate_and_log_email(&attendee.email, &self.id)?;
                Some(Attendee { email, name: attendee.display_name, required: !attendee.optional })
            })
            .collect();

        Some(CalendarEvent {
            subject: self.summary.unwrap_or_else(|| "(no title)".to_string()),
            body: self.description.filter(|d| !d.trim().is_empty()),
            start,
            end,
            is_all_day: all_day,
            location: self.location.filter(|l| !l.trim().is_empty()),
            attendees,
            organizer: self.organizer.and_then(|o| o.email),
            web_link: self.html_link,
            id: self.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::integrations::rest::testing::api;

    fn range() -> EventTimeRange {
        EventTimeRange::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 8, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn list_pages_and_skips_cancelled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("singleEvents", "true"))
            .and(query_param("timeMin", "2025-03-01T00:00:00Z"))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {
                        "id": "g1",
                        "summary": "Planning",
                        "start": { "dateTime": "2025-03-03T10:00:00+01:00" },
                        "end": { "dateTime": "2025-03-03T11:00:00+01:00" },
                        "attendees": [
                            { "email": "bob@example.com", "displayName": "Bob" },
                            { "email": "room@resource.calendar.google.com", "optional": true }
                        ],
                        "organizer": { "email": "alice@example.com" }
                    },
                    {
                        "id": "g-cancelled",
                        "status": "cancelled",
                        "start": { "dateTime": "2025-03-03T10:00:00Z" },
                        "end": { "dateTime": "2025-03-03T11:00:00Z" }
                    }
                ],
                "nextPageToken": "p2"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "g2",
                    "summary": "Offsite",
                    "start": { "date": "2025-03-05" },
                    "end": { "date": "2025-03-06" }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GoogleCalendarProvider::with_api(api("google-calendar", &server.uri()));
        let events = provider.list_events(range()).await.unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].start, Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap());
        assert!(!events[0].attendees[1].required);
        assert!(events[1].is_all_day);
        assert_eq!(events[1].start, Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn gone_event_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events/old"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let provider = GoogleCalendarProvider::with_api(api("google-calendar", &server.uri()));
        assert!(provider.get_event("old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn all_day_insert_uses_dates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(body_partial_json(json!({
                "summary": "Holiday",
                "start": { "date": "2025-03-05" },
                "end": { "date": "2025-03-06" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "h1",
                "summary": "Holiday",
                "start": { "date": "2025-03-05" },
                "end": { "date": "2025-03-06" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GoogleCalendarProvider::with_api(api("google-calendar", &server.uri()));
        let created = provider
            .create_event(&NewCalendarEvent {
                subject: "Holiday".into(),
                body: None,
                start: Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2025, 3, 6, 0, 0, 0).unwrap(),
                location: None,
                attendees: vec![],
                is_all_day: true,
            })
            .await
            .unwrap();
        assert!(created.is_all_day);
    }

    #[tokio::test]
    async fn user_email_is_primary_calendar_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "alice@gmail.com" })))
            .mount(&server)
            .await;

        let provider = GoogleCalendarProvider::with_api(api("google-calendar", &server.uri()));
        assert_eq!(provider.user_email().await.unwrap().as_deref(), Some("alice@gmail.com"));
    }
}
