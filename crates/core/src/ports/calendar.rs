//! Calendar provider port

use actionarc_domain::{CalendarEvent, EventTimeRange, NewCalendarEvent, Result};
use async_trait::async_trait;

/// Provider-agnostic calendar operations (Microsoft Graph, Google Calendar)
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Short provider label for logs (`"microsoft"`, `"google"`).
    fn provider_name(&self) -> &'static str;

    /// Every event intersecting the range, all pages included.
    async fn list_events(&self, range: EventTimeRange) -> Result<Vec<CalendarEvent>>;

    /// `Ok(None)` when the provider reports the event as missing.
    async fn get_event(&self, id: &str) -> Result<Option<CalendarEvent>>;

    async fn create_event(&self, event: &NewCalendarEvent) -> Result<CalendarEvent>;

    async fn delete_event(&self, id: &str) -> Result<()>;

    /// Address of the signed-in account, when the provider exposes it.
    async fn user_email(&self) -> Result<Option<String>>;
}
