//! Email agent

use std::sync::Arc;

use actionarc_domain::constants::{DEFAULT_INBOX_LIMIT, DEFAULT_SEARCH_LIMIT};
use actionarc_domain::{
    parse_action, ActionArcError, ActionResult, EmailAction, EmailAddress, EmailMessage,
    OutgoingEmail, Result,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::Agent;
use crate::matching::overlap_score;
use crate::ports::EmailProvider;

const ACTIONS: &[&str] = &["sendEmail", "replyEmail", "forwardEmail", "findEmail", "listInbox"];

pub struct EmailAgent {
    provider: Arc<dyn EmailProvider>,
}

impl EmailAgent {
    pub fn new(provider: Arc<dyn EmailProvider>) -> Self {
        Self { provider }
    }

    /// Picks the message to reply to or forward.
    ///
    /// An explicit id wins. Otherwise the provider is searched for the subject
    /// and the hit sharing the most subject words is taken, newest on ties.
    async fn resolve_target(&self, message_id: Option<String>, subject: Option<String>) -> Result<EmailMessage> {
        if let Some(id) = message_id.filter(|id| !id.trim().is_empty()) {
            return self.provider.get_message(&id).await;
        }

        let subject = subject.filter(|s| !s.trim().is_empty()).ok_or_else(|| {
            ActionArcError::InvalidInput("a messageId or subject is required".into())
        })?;

        let hits = self.provider.search(&subject, DEFAULT_SEARCH_LIMIT).await?;
        best_by_subject(hits, &subject)
            .ok_or_else(|| ActionArcError::NotFound(format!("no message matching '{subject}'")))
    }
}

/// Highest subject overlap; the first (newest) message wins ties.
fn best_by_subject(messages: Vec<EmailMessage>, subject: &str) -> Option<EmailMessage> {
    messages
        .into_iter()
        .map(|m| (overlap_score(&m.subject, subject), m))
        .filter(|(score, _)| *score > 0)
        .rev()
        .max_by_key(|(score, _)| *score)
        .map(|(_, m)| m)
}

fn parse_addresses(raw: &[String]) -> Result<Vec<EmailAddress>> {
    raw.iter().map(|a| a.parse()).collect()
}

fn describe_message(message: &EmailMessage) -> String {
    let from = message.from.as_ref().map(ToString::to_string).unwrap_or_else(|| "(unknown)".into());
    let when = message
        .received_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let unread = if message.is_read { "" } else { " *" };
    format!("{when} {from}: {}{unread}", message.subject).trim_start().to_string()
}

fn message_listing(empty: &str, messages: Vec<EmailMessage>) -> ActionResult {
    if messages.is_empty() {
        return ActionResult::with_data(empty, json!({ "messages": [] }));
    }
    let text = messages.iter().map(|m| format!("- {}", describe_message(m))).collect::<Vec<_>>().join("\n");
    ActionResult::with_data(text, json!({ "messages": messages }))
}

#[async_trait]
impl Agent for EmailAgent {
    fn name(&self) -> &'static str {
        "email"
    }

    fn action_names(&self) -> &'static [&'static str] {
        ACTIONS
    }

    async fn execute(&self, action: Value) -> Result<ActionResult> {
        match parse_action::<EmailAction>(action)? {
            EmailAction::SendEmail { to, cc, bcc, subject, body, is_html } => {
                let email = OutgoingEmail {
                    to: parse_addresses(&to)?,
                    cc: parse_addresses(&cc)?,
                    bcc: parse_addresses(&bcc)?,
                    subject,
                    body,
                    is_html,
                };
                email.validate()?;
                self.provider.send(&email).await?;
                info!(provider = self.provider.provider_name(), recipients = email.to.len(), "sent email");

                let to = email.to.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
                Ok(ActionResult::text(format!("Sent '{}' to {to}", email.subject)))
            }
            EmailAction::ReplyEmail { message_id, subject, body, reply_all } => {
                let target = self.resolve_target(message_id, subject).await?;
                self.provider.reply(&target.id, &body, reply_all).await?;
                info!(provider = self.provider.provider_name(), message_id = %target.id, reply_all, "replied to email");
                Ok(ActionResult::with_data(
                    format!("Replied to '{}'", target.subject),
                    json!({ "messageId": target.id }),
                ))
            }
            EmailAction::ForwardEmail { message_id, subject, to, comment } => {
                let recipients = parse_addresses(&to)?;
                if recipients.is_empty() {
                    return Err(ActionArcError::InvalidInput("forwardEmail needs at least one recipient".into()));
                }
                let target = self.resolve_target(message_id, subject).await?;
                self.provider.forward(&target.id, &recipients, comment.as_deref()).await?;
                info!(provider = self.provider.provider_name(), message_id = %target.id, "forwarded email");
                Ok(ActionResult::with_data(
                    format!("Forwarded '{}' to {}", target.subject, to.join(", ")),
                    json!({ "messageId": target.id }),
                ))
            }
            EmailAction::FindEmail { query, max_results } => {
                if query.trim().is_empty() {
                    return Err(ActionArcError::InvalidInput("search query is empty".into()));
                }
                let hits = self.provider.search(&query, max_results.unwrap_or(DEFAULT_SEARCH_LIMIT)).await?;
                Ok(message_listing("No matching messages.", hits))
            }
            EmailAction::ListInbox { max_results } => {
                let messages = self.provider.list_inbox(max_results.unwrap_or(DEFAULT_INBOX_LIMIT)).await?;
                Ok(message_listing("Inbox is empty.", messages))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, subject: &str) -> EmailMessage {
        EmailMessage {
            id: id.into(),
            thread_id: None,
            subject: subject.into(),
            from: Some(EmailAddress::new("a@example.com")),
            to: vec![],
            cc: vec![],
            body: String::new(),
            received_at: None,
            is_read: true,
        }
    }

    #[test]
    fn best_subject_prefers_overlap_then_newest() {
        let hits = vec![
            message("new", "Budget"),
            message("old", "Budget"),
            message("best", "Q3 budget review"),
        ];
        assert_eq!(best_by_subject(hits.clone(), "budget review").unwrap().id, "best");
        assert_eq!(best_by_subject(hits[..2].to_vec(), "budget").unwrap().id, "new");
        assert!(best_by_subject(hits, "holiday").is_none());
    }

    #[test]
    fn unread_messages_are_marked() {
        let mut m = message("1", "Hi");
        m.is_read = false;
        assert_eq!(describe_message(&m), "a@example.com: Hi *");
    }
}
