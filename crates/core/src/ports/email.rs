//! Mail provider port

use actionarc_domain::{EmailAddress, EmailMessage, OutgoingEmail, Result};
use async_trait::async_trait;

/// Provider-agnostic mailbox operations (Microsoft Graph, Gmail)
#[async_trait]
pub trait EmailProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn send(&self, email: &OutgoingEmail) -> Result<()>;

    /// Replies in the original thread.
    async fn reply(&self, message_id: &str, body: &str, reply_all: bool) -> Result<()>;

    async fn forward(
        &self,
        message_id: &str,
        to: &[EmailAddress],
        comment: Option<&str>,
    ) -> Result<()>;

    /// Newest first.
    async fn list_inbox(&self, max: usize) -> Result<Vec<EmailMessage>>;

    /// Provider-native full text search, newest first.
    async fn search(&self, query: &str, max: usize) -> Result<Vec<EmailMessage>>;

    async fn get_message(&self, id: &str) -> Result<EmailMessage>;
}
