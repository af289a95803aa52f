//! Microsoft Graph calendar provider

use std::sync::Arc;

use actionarc_core::{get_k_cursor, AccessTokenSource, CalendarProvider, Page};
use actionarc_domain::{
    ActionArcError, Attendee, CalendarEvent, EventTimeRange, NewCalendarEvent, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::validate_and_log_email;
use crate::http::HttpClient;
use crate::integrations::rest::{ApiClient, GRAPH_BASE_URL};

const PREFER_UTC: &str = "outlook.timezone=\"UTC\"";
const PREFER_PAGE_SIZE: &str = "odata.maxpagesize=50";
const EVENT_FIELDS: &str =
    "id,subject,bodyPreview,start,end,isAllDay,location,attendees,organizer,webLink";
const GRAPH_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Microsoft 365 / Outlook calendar via Graph v1.0
pub struct GraphCalendarProvider {
    api: ApiClient,
}

impl GraphCalendarProvider {
    pub fn new(http: HttpClient, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self::with_api(ApiClient::new("graph", GRAPH_BASE_URL, http, tokens))
    }

    pub fn with_api(api: ApiClient) -> Self {
        Self { api }
    }

    async fn view_page(&self, range: EventTimeRange, cursor: Option<String>) -> Result<Page<CalendarEvent>> {
        let builder = match &cursor {
            // nextLink already carries the original query
            Some(next_link) => self.api.request(Method::GET, next_link).await?,
            None => self.api.request(Method::GET, "me/calendarView").await?.query(&[
                ("startDateTime", range.start.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
                ("endDateTime", range.end.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
                ("$select", EVENT_FIELDS.to_string()),
                ("$orderby", "start/dateTime".to_string()),
            ]),
        };
        let builder = builder.header("Prefer", PREFER_UTC).header("Prefer", PREFER_PAGE_SIZE);

        let response: GraphEventsResponse = self.api.execute_json(builder).await?;
        let events = response.value.into_iter().filter_map(|event| event.into_event()).collect();
        Ok(Page::new(events, response.next_link))
    }
}

#[async_trait]
impl CalendarProvider for GraphCalendarProvider {
    fn provider_name(&self) -> &'static str {
        "microsoft"
    }

    #[instrument(skip(self), fields(start = %range.start, end = %range.end))]
    async fn list_events(&self, range: EventTimeRange) -> Result<Vec<CalendarEvent>> {
        let events = get_k_cursor(usize::MAX, move |cursor| self.view_page(range, cursor)).await?;
        debug!(count = events.len(), "fetched Graph calendar view");
        Ok(events)
    }

    #[instrument(skip(self))]
    async fn get_event(&self, id: &str) -> Result<Option<CalendarEvent>> {
        let path = format!("me/events/{}", urlencoding::encode(id));
        let builder = self
            .api
            .request(Method::GET, &path)
            .await?
            .query(&[("$select", EVENT_FIELDS)])
            .header("Prefer", PREFER_UTC);

        match self.api.execute_json::<GraphEvent>(builder).await {
            Ok(event) => Ok(event.into_event()),
            Err(err) if err.is_status(404) => Ok(None),
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, event), fields(subject = %event.subject))]
    async fn create_event(&self, event: &NewCalendarEvent) -> Result<CalendarEvent> {
        let body = GraphNewEvent::from(event);
        let builder = self.api.request(Method::POST, "me/events").await?.json(&body).header("Prefer", PREFER_UTC);
        let created: GraphEvent = self.api.execute_json(builder).await?;
        created
            .into_event()
            .ok_or_else(|| ActionArcError::Internal("Graph returned an unreadable event".into()))
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, id: &str) -> Result<()> {
        let path = format!("me/events/{}", urlencoding::encode(id));
        self.api.send_no_content::<()>(Method::DELETE, &path, None).await
    }

    async fn user_email(&self) -> Result<Option<String>> {
        let me: GraphUser = self.api.get_json("me", &[("$select", "mail,userPrincipalName".into())]).await?;
        Ok(me.mail.filter(|m| !m.is_empty()).or(me.user_principal_name))
    }
}

#[derive(Debug, Deserialize)]
struct GraphEventsResponse {
    #[serde(default)]
    value: Vec<GraphEvent>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphUser {
    mail: Option<String>,
    user_principal_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphEvent {
    id: String,
    subject: Option<String>,
    body_preview: Option<String>,
    start: EventDateTime,
    end: EventDateTime,
    #[serde(default)]
    is_all_day: bool,
    location: Option<GraphLocation>,
    #[serde(default)]
    attendees: Vec<GraphAttendee>,
    organizer: Option<GraphRecipient>,
    web_link: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: String,
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphLocation {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphAttendee {
    email_address: GraphEmailAddress,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphRecipient {
    email_address: GraphEmailAddress,
}

#[derive(Debug, Deserialize, Serialize)]
struct GraphEmailAddress {
    #[serde(default)]
    address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphItemBody {
    content_type: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphNewEvent {
    subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<GraphItemBody>,
    start: EventDateTime,
    end: EventDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<GraphLocation>,
    attendees: Vec<GraphAttendee>,
    is_all_day: bool,
}

impl From<&NewCalendarEvent> for GraphNewEvent {
    fn from(event: &NewCalendarEvent) -> Self {
        let utc = |time: DateTime<Utc>| EventDateTime {
            date_time: time.format(GRAPH_TIME_FORMAT).to_string(),
            time_zone: Some("UTC".to_string()),
        };
        Self {
            subject: event.subject.clone(),
            body: event
                .body
                .as_ref()
                .map(|content| GraphItemBody { content_type: "text", content: content.clone() }),
            start: utc(event.start),
            end: utc(event.end),
            location: event.location.as_ref().map(|name| GraphLocation { display_name: Some(name.clone()) }),
            attendees: event
                .attendees
                .iter()
                .map(|attendee| GraphAttendee {
                    email_address: GraphEmailAddress {
                        address: Some(attendee.email.clone()),
                        name: attendee.name.clone(),
                    },
                    kind: Some(if attendee.required { "required" } else { "optional" }.to_string()),
                })
                .collect(),
            is_all_day: event.is_all_day,
        }
    }
}

impl GraphEvent {
    fn into_event(self) -> Option<CalendarEvent> {
        let start = parse_graph_time(&self.start);
        let end = parse_graph_time(&self.end);
        let (Some(start), Some(end)) = (start, end) else {
            warn!(event_id = %self.id, "skipping event with unparseable time");
            return None;
        };

        let attendees = self
            .attendees
            .into_iter()
            .filter_map(|attendee| {
                let email = validate_and_log_email(attendee.email_address.address.as_deref()?, &self.id)?;
                Some(Attendee {
                    email,
                    name: attendee.email_address.name,
                    required: !matches!(attendee.kind.as_deref(), Some("optional")),
                })
            })
            .collect();

        Some(CalendarEvent {
            subject: self.subject.unwrap_or_default(),
            body: self.body_preview.filter(|b| !b.trim().is_empty()),
            start,
            end,
            is_all_day: self.is_all_day,
            location: self
                .location
                .and_then(|l| l.display_name)
                .filter(|name| !name.trim().is_empty()),
            attendees,
            organizer: self.organizer.and_then(|o| o.email_address.address),
            web_link: self.web_link,
            id: self.id,
        })
    }
}

fn normalise_event_time(event: &EventDateTime) -> String {
    let value = event.date_time.trim();
    if value.ends_with('Z') {
        value.to_owned()
    } else if event.time_zone.as_deref().map(|tz| tz.eq_ignore_ascii_case("utc")).unwrap_or(false) {
        format!("{value}Z")
    } else {
        value.to_owned()
    }
}

/// Graph returns `2025-03-03T09:00:00.0000000` plus a separate zone name.
fn parse_graph_time(event: &EventDateTime) -> Option<DateTime<Utc>> {
    let value = normalise_event_time(event);
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&value) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = value.trim_end_matches('Z');
    // Zones other than UTC only appear if the Prefer header was ignored.
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|t| t.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::integrations::rest::testing::api;

    fn graph_event(id: &str, subject: &str) -> serde_json::Value {
        json!({
            "id": id,
            "subject": subject,
            "bodyPreview": "",
            "start": { "dateTime": "2025-03-03T09:00:00.0000000", "timeZone": "UTC" },
            "end": { "dateTime": "2025-03-03T09:30:00.0000000", "timeZone": "UTC" },
            "isAllDay": false,
            "location": { "displayName": "Room 1" },
            "attendees": [
                { "emailAddress": { "address": "bob@example.com", "name": "Bob" }, "type": "required" },
                { "emailAddress": { "address": "", "name": "Nobody" }, "type": "optional" },
                { "emailAddress": { "address": "carol@example.com" }, "type": "optional" }
            ],
            "organizer": { "emailAddress": { "address": "alice@example.com" } },
            "webLink": "https://outlook.office.com/e1"
        })
    }

    #[test]
    fn graph_times_are_read_as_utc() {
        let time = EventDateTime { date_time: "2025-03-03T09:00:00.0000000".into(), time_zone: Some("UTC".into()) };
        assert_eq!(parse_graph_time(&time), Some(Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()));

        let offset = EventDateTime { date_time: "2025-03-03T09:00:00+01:00".into(), time_zone: None };
        assert_eq!(parse_graph_time(&offset), Some(Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap()));
    }

    #[tokio::test]
    async fn list_follows_next_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/calendarView"))
            .and(query_param("startDateTime", "2025-03-01T00:00:00Z"))
            .and(header_exists("prefer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [graph_event("e1", "Standup")],
                "@odata.nextLink": format!("{}/page2", server.uri())
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [graph_event("e2", "Retro")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GraphCalendarProvider::with_api(api("graph", &server.uri()));
        let range = EventTimeRange::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 8, 0, 0, 0).unwrap(),
        );
        let events = provider.list_events(range).await.unwrap();

        assert_eq!(events.len(), 2);
        let first = &events[0];
        assert_eq!(first.subject, "Standup");
        assert_eq!(first.location.as_deref(), Some("Room 1"));
        assert_eq!(first.organizer.as_deref(), Some("alice@example.com"));
        assert_eq!(first.attendees.len(), 2);
        assert!(!first.attendees[1].required);
        assert!(first.body.is_none());
    }

    #[tokio::test]
    async fn missing_event_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/events/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": "ErrorItemNotFound", "message": "not found" }
            })))
            .mount(&server)
            .await;

        let provider = GraphCalendarProvider::with_api(api("graph", &server.uri()));
        assert!(provider.get_event("gone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_sends_utc_times() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/me/events"))
            .and(body_partial_json(json!({
                "subject": "Standup",
                "start": { "dateTime": "2025-03-03T09:00:00", "timeZone": "UTC" },
                "attendees": [{ "emailAddress": { "address": "bob@example.com" }, "type": "required" }]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(graph_event("new-1", "Standup")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GraphCalendarProvider::with_api(api("graph", &server.uri()));
        let created = provider
            .create_event(&NewCalendarEvent {
                subject: "Standup".into(),
                body: None,
                start: Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2025, 3, 3, 9, 30, 0).unwrap(),
                location: None,
                attendees: vec![Attendee::new("bob@example.com")],
                is_all_day: false,
            })
            .await
            .unwrap();
        assert_eq!(created.id, "new-1");
    }

    #[tokio::test]
    async fn user_email_falls_back_to_principal_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "mail": null,
                "userPrincipalName": "alice@contoso.com"
            })))
            .mount(&server)
            .await;

        let provider = GraphCalendarProvider::with_api(api("graph", &server.uri()));
        assert_eq!(provider.user_email().await.unwrap().as_deref(), Some("alice@contoso.com"));
    }

    #[tokio::test]
    async fn delete_accepts_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/me/events/e1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GraphCalendarProvider::with_api(api("graph", &server.uri()));
        provider.delete_event("e1").await.unwrap();
    }
}
