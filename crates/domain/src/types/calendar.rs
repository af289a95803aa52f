//! Calendar event DTOs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Attendee on a calendar event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl Attendee {
    pub fn new(email: impl Into<String>) -> Self {
        Self { email: email.into(), name: None, required: true }
    }
}

/// Calendar event as mirrored from a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_link: Option<String>,
}

impl CalendarEvent {
    /// Every address on the event, organizer included, lowercased.
    pub fn participant_addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> =
            self.attendees.iter().map(|a| a.email.trim().to_lowercase()).collect();
        if let Some(organizer) = &self.organizer {
            addresses.push(organizer.trim().to_lowercase());
        }
        addresses.sort();
        addresses.dedup();
        addresses
    }

    /// True when the event intersects the half-open range.
    pub fn overlaps(&self, range: &EventTimeRange) -> bool {
        self.start < range.end && self.end > range.start
    }
}

/// Event to be created on a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCalendarEvent {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    #[serde(default)]
    pub is_all_day: bool,
}

/// Half-open UTC time range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EventTimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Sync window around `now`.
    pub fn around(now: DateTime<Utc>, lookback_days: i64, lookahead_days: i64) -> Self {
        Self { start: now - Duration::days(lookback_days), end: now + Duration::days(lookahead_days) }
    }
}
