//! Outlook mail via Microsoft Graph

use std::sync::Arc;

use actionarc_core::{get_k_cursor, AccessTokenSource, EmailProvider, Page};
use actionarc_domain::{EmailAddress, EmailMessage, OutgoingEmail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::http::HttpClient;
use crate::integrations::rest::{ApiClient, GRAPH_BASE_URL};

const LIST_FIELDS: &str = "id,conversationId,subject,from,toRecipients,ccRecipients,bodyPreview,receivedDateTime,isRead";
const MAX_PAGE: usize = 50;

pub struct GraphEmailProvider {
    api: ApiClient,
}

impl GraphEmailProvider {
    pub fn new(http: HttpClient, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self::with_api(ApiClient::new("graph", GRAPH_BASE_URL, http, tokens))
    }

    pub fn with_api(api: ApiClient) -> Self {
        Self { api }
    }

    fn message_path(id: &str, action: &str) -> String {
        let id = urlencoding::encode(id);
        if action.is_empty() {
            format!("me/messages/{id}")
        } else {
            format!("me/messages/{id}/{action}")
        }
    }

    async fn messages_page(
        &self,
        path: &str,
        query: &[(&str, String)],
        consistency: bool,
        cursor: Option<String>,
    ) -> Result<Page<EmailMessage>> {
        let builder = match &cursor {
            Some(next_link) => self.api.request(Method::GET, next_link).await?,
            None => self.api.request(Method::GET, path).await?.query(query),
        };
        // $search is only honoured with eventual consistency
        let builder = if consistency { builder.header("ConsistencyLevel", "eventual") } else { builder };

        let response: GraphMessagesResponse = self.api.execute_json(builder).await?;
        let messages = response.value.into_iter().map(GraphMessage::into_message).collect();
        Ok(Page::new(messages, response.next_link))
    }
}

#[async_trait]
impl EmailProvider for GraphEmailProvider {
    fn provider_name(&self) -> &'static str {
        "microsoft"
    }

    #[instrument(skip(self, email), fields(recipients = email.to.len()))]
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        email.validate()?;
        let body = json!({
            "message": {
                "subject": email.subject,
                "body": {
                    "contentType": if email.is_html { "HTML" } else { "Text" },
                    "content": email.body,
                },
                "toRecipients": recipients(&email.to),
                "ccRecipients": recipients(&email.cc),
                "bccRecipients": recipients(&email.bcc),
            },
            "saveToSentItems": true,
        });
        self.api.send_no_content(Method::POST, "me/sendMail", Some(&body)).await?;
        info!("mail sent via Graph");
        Ok(())
    }

    #[instrument(skip(self, body))]
    async fn reply(&self, message_id: &str, body: &str, reply_all: bool) -> Result<()> {
        let action = if reply_all { "replyAll" } else { "reply" };
        let payload = json!({ "comment": body });
        self.api
            .send_no_content(Method::POST, &Self::message_path(message_id, action), Some(&payload))
            .await
    }

    #[instrument(skip(self, to, comment))]
    async fn forward(&self, message_id: &str, to: &[EmailAddress], comment: Option<&str>) -> Result<()> {
        let payload = json!({
            "toRecipients": recipients(to),
            "comment": comment.unwrap_or_default(),
        });
        self.api
            .send_no_content(Method::POST, &Self::message_path(message_id, "forward"), Some(&payload))
            .await
    }

    #[instrument(skip(self))]
    async fn list_inbox(&self, max: usize) -> Result<Vec<EmailMessage>> {
        let query = [
            ("$top", max.clamp(1, MAX_PAGE).to_string()),
            ("$orderby", "receivedDateTime desc".to_string()),
            ("$select", LIST_FIELDS.to_string()),
        ];
        let query = &query;
        get_k_cursor(max, move |cursor| {
            self.messages_page("me/mailFolders/inbox/messages", query, false, cursor)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, max: usize) -> Result<Vec<EmailMessage>> {
        let escaped = query.replace('"', "\\\"");
        let params = [
            ("$search", format!("\"{escaped}\"")),
            ("$top", max.clamp(1, MAX_PAGE).to_string()),
            ("$select", LIST_FIELDS.to_string()),
        ];
        let params = &params;
        let mut messages =
            get_k_cursor(max, move |cursor| self.messages_page("me/messages", params, true, cursor)).await?;
        // $search results come back by relevance and cannot be combined with $orderby.
        messages.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        debug!(hits = messages.len(), "Graph mail search");
        Ok(messages)
    }

    #[instrument(skip(self))]
    async fn get_message(&self, id: &str) -> Result<EmailMessage> {
        let builder = self
            .api
            .request(Method::GET, &Self::message_path(id, ""))
            .await?
            .header("Prefer", "outlook.body-content-type=\"text\"");
        let message: GraphMessage = self.api.execute_json(builder).await?;
        Ok(message.into_message())
    }
}

fn recipients(addresses: &[EmailAddress]) -> Vec<GraphRecipient> {
    addresses
        .iter()
        .map(|a| GraphRecipient {
            email_address: GraphEmailAddress { address: Some(a.address.clone()), name: a.name.clone() },
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct GraphMessagesResponse {
    #[serde(default)]
    value: Vec<GraphMessage>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphMessage {
    id: String,
    conversation_id: Option<String>,
    subject: Option<String>,
    from: Option<GraphRecipient>,
    #[serde(default)]
    to_recipients: Vec<GraphRecipient>,
    #[serde(default)]
    cc_recipients: Vec<GraphRecipient>,
    body: Option<GraphBody>,
    body_preview: Option<String>,
    received_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    is_read: bool,
}

#[derive(Debug, Deserialize)]
struct GraphBody {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphRecipient {
    email_address: GraphEmailAddress,
}

#[derive(Debug, Deserialize, Serialize)]
struct GraphEmailAddress {
    address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl GraphRecipient {
    fn into_address(self) -> Option<EmailAddress> {
        let address = self.email_address.address.filter(|a| !a.trim().is_empty())?;
        Some(EmailAddress { name: self.email_address.name.filter(|n| !n.is_empty()), address })
    }
}

impl GraphMessage {
    fn into_message(self) -> EmailMessage {
        let body = self
            .body
            .map(|b| b.content)
            .filter(|c| !c.trim().is_empty())
            .or(self.body_preview)
            .unwrap_or_default();
        EmailMessage {
            id: self.id,
            thread_id: self.conversation_id,
            subject: self.subject.unwrap_or_default(),
            from: self.from.and_then(GraphRecipient::into_address),
            to: self.to_recipients.into_iter().filter_map(GraphRecipient::into_address).collect(),
            cc: self.cc_recipients.into_iter().filter_map(GraphRecipient::into_address).collect(),
            body,
            received_at: self.received_date_time,
            is_read: self.is_read,
        }
    }
}
