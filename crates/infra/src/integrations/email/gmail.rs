//! Gmail API provider
//!
//! Messages are assembled as RFC 2822 text and sent through `raw`. Listing
//! and search return ids only, so each hit needs a metadata fetch.

use std::sync::Arc;

use actionarc_core::{get_k_cursor, AccessTokenSource, EmailProvider, Page};
use actionarc_domain::{ActionArcError, EmailAddress, EmailMessage, OutgoingEmail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::mime::{decode_body, forward_subject, parse_address_list, reply_subject, MimeMessage};
use crate::http::HttpClient;
use crate::integrations::rest::{ApiClient, GMAIL_BASE_URL};

const MAX_PAGE: usize = 100;
const METADATA_HEADERS: &[&str] = &["From", "To", "Cc", "Subject", "Date", "Message-ID", "References"];

pub struct GmailProvider {
    api: ApiClient,
}

impl GmailProvider {
    pub fn new(http: HttpClient, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self::with_api(ApiClient::new("gmail", GMAIL_BASE_URL, http, tokens))
    }

    pub fn with_api(api: ApiClient) -> Self {
        Self { api }
    }

    async fn fetch(&self, id: &str, format: &str) -> Result<GmailMessage> {
        let path = format!("users/me/messages/{}", urlencoding::encode(id));
        let mut query = vec![("format", format.to_string())];
        if format == "metadata" {
            query.extend(METADATA_HEADERS.iter().map(|h| ("metadataHeaders", h.to_string())));
        }
        self.api.get_json(&path, &query).await
    }

    async fn ids_page(&self, query: &[(&str, String)], page_token: Option<String>) -> Result<Page<String>> {
        let mut params = query.to_vec();
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        let response: GmailListResponse = self.api.get_json("users/me/messages", &params).await?;
        let ids = response.messages.into_iter().map(|m| m.id).collect();
        Ok(Page::new(ids, response.next_page_token))
    }

    async fn list(&self, mut query: Vec<(&'static str, String)>, max: usize) -> Result<Vec<EmailMessage>> {
        query.push(("maxResults", max.clamp(1, MAX_PAGE).to_string()));
        let query = &query;
        let ids = get_k_cursor(max, move |token| self.ids_page(query, token)).await?;

        let mut messages = Vec::with_capacity(ids.len());
        for id in ids {
            messages.push(self.fetch(&id, "metadata").await?.into_message());
        }
        Ok(messages)
    }

    async fn own_address(&self) -> Result<Option<String>> {
        let profile: GmailProfile = self.api.get_json("users/me/profile", &[]).await?;
        Ok(profile.email_address)
    }

    async fn send_raw(&self, message: &MimeMessage, thread_id: Option<String>) -> Result<()> {
        let body = GmailSendRequest { raw: message.to_raw(), thread_id };
        let sent: GmailMessageRef = self.api.post_json("users/me/messages/send", &body).await?;
        debug!(message_id = %sent.id, "Gmail accepted message");
        Ok(())
    }
}

#[async_trait]
impl EmailProvider for GmailProvider {
    fn provider_name(&self) -> &'static str {
        "google"
    }

    #[instrument(skip(self, email), fields(recipients = email.to.len()))]
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        email.validate()?;
        let message = MimeMessage {
            to: email.to.clone(),
            cc: email.cc.clone(),
            bcc: email.bcc.clone(),
            subject: email.subject.clone(),
            body: email.body.clone(),
            is_html: email.is_html,
            ..MimeMessage::default()
        };
        self.send_raw(&message, None).await?;
        info!("mail sent via Gmail");
        Ok(())
    }

    #[instrument(skip(self, body))]
    async fn reply(&self, message_id: &str, body: &str, reply_all: bool) -> Result<()> {
        let original = self.fetch(message_id, "metadata").await?;
        let headers = original.headers();

        let from = headers.get("From").map(parse_address_list).unwrap_or_default();
        if from.is_empty() {
            return Err(ActionArcError::InvalidInput(format!("message {message_id} has no sender to reply to")));
        }

        let mut to = from;
        let mut cc = Vec::new();
        if reply_all {
            let me = self.own_address().await?.map(|a| a.to_lowercase());
            let not_me = |a: &EmailAddress| Some(a.address.to_lowercase()) != me;
            to.extend(headers.get("To").map(parse_address_list).unwrap_or_default().into_iter().filter(not_me));
            cc = headers.get("Cc").map(parse_address_list).unwrap_or_default().into_iter().filter(not_me).collect();
            dedup_addresses(&mut to);
            cc.retain(|c| !to.iter().any(|t| t.address.eq_ignore_ascii_case(&c.address)));
        }

        let message_ref = headers.get("Message-ID").map(str::to_string);
        let references = match (headers.get("References"), &message_ref) {
            (Some(existing), Some(id)) => Some(format!("{existing} {id}")),
            (None, Some(id)) => Some(id.clone()),
            (existing, None) => existing.map(str::to_string),
        };

        let message = MimeMessage {
            to,
            cc,
            subject: reply_subject(headers.get("Subject").unwrap_or_default()),
            body: body.to_string(),
            in_reply_to: message_ref,
            references,
            ..MimeMessage::default()
        };
        self.send_raw(&message, original.thread_id).await
    }

    #[instrument(skip(self, to, comment))]
    async fn forward(&self, message_id: &str, to: &[EmailAddress], comment: Option<&str>) -> Result<()> {
        if to.is_empty() {
            return Err(ActionArcError::InvalidInput("forward needs at least one recipient".into()));
        }
        let original = self.fetch(message_id, "full").await?;
        let headers = original.headers();
        let subject = headers.get("Subject").unwrap_or_default().to_string();

        let mut body = String::new();
        if let Some(comment) = comment.filter(|c| !c.trim().is_empty()) {
            body.push_str(comment);
            body.push_str("\n\n");
        }
        body.push_str("---------- Forwarded message ---------\n");
        for name in ["From", "Date", "Subject", "To"] {
            if let Some(value) = headers.get(name) {
                body.push_str(&format!("{name}: {value}\n"));
            }
        }
        body.push('\n');
        body.push_str(&original.body_text());

        let message = MimeMessage {
            to: to.to_vec(),
            subject: forward_subject(&subject),
            body,
            ..MimeMessage::default()
        };
        self.send_raw(&message, None).await
    }

    #[instrument(skip(self))]
    async fn list_inbox(&self, max: usize) -> Result<Vec<EmailMessage>> {
        self.list(vec![("labelIds", "INBOX".to_string())], max).await
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, max: usize) -> Result<Vec<EmailMessage>> {
        self.list(vec![("q", query.to_string())], max).await
    }

    #[instrument(skip(self))]
    async fn get_message(&self, id: &str) -> Result<EmailMessage> {
        let message = self.fetch(id, "full").await?;
        let body = message.body_text();
        let mut converted = message.into_message();
        if !body.is_empty() {
            converted.body = body;
        }
        Ok(converted)
    }
}

fn dedup_addresses(addresses: &mut Vec<EmailAddress>) {
    let mut seen = std::collections::HashSet::new();
    addresses.retain(|a| seen.insert(a.address.to_lowercase()));
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GmailSendRequest {
    raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GmailMessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailProfile {
    email_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailListResponse {
    #[serde(default)]
    messages: Vec<GmailMessageRef>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailMessage {
    id: String,
    thread_id: Option<String>,
    #[serde(default)]
    label_ids: Vec<String>,
    #[serde(default)]
    snippet: String,
    /// Milliseconds since the epoch, as a string.
    internal_date: Option<String>,
    payload: Option<GmailPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailPart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<GmailHeader>,
    body: Option<GmailBody>,
    #[serde(default)]
    parts: Vec<GmailPart>,
}

#[derive(Debug, Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct GmailBody {
    data: Option<String>,
}

/// Case-insensitive header lookup over the top-level payload.
struct Headers<'a>(&'a [GmailHeader]);

impl<'a> Headers<'a> {
    fn get(&self, name: &str) -> Option<&'a str> {
        self.0.iter().find(|h| h.name.eq_ignore_ascii_case(name)).map(|h| h.value.as_str())
    }
}

impl GmailPart {
    /// First decodable part of `mime_type`, depth first.
    fn find_body(&self, mime_type: &str) -> Option<String> {
        if self.mime_type.eq_ignore_ascii_case(mime_type) {
            if let Some(text) = self.body.as_ref().and_then(|b| b.data.as_deref()).and_then(decode_body) {
                return Some(text);
            }
        }
        self.parts.iter().find_map(|part| part.find_body(mime_type))
    }
}

impl GmailMessage {
    fn headers(&self) -> Headers<'_> {
        Headers(self.payload.as_ref().map(|p| p.headers.as_slice()).unwrap_or_default())
    }

    /// Plain text preferred, HTML otherwise.
    fn body_text(&self) -> String {
        let Some(payload) = &self.payload else {
            return String::new();
        };
        payload
            .find_body("text/plain")
            .or_else(|| payload.find_body("text/html"))
            .unwrap_or_default()
    }

    fn into_message(self) -> EmailMessage {
        let headers = self.headers();
        let addresses = |name: &str| headers.get(name).map(parse_address_list).unwrap_or_default();
        EmailMessage {
            id: self.id.clone(),
            thread_id: self.thread_id.clone(),
            subject: headers.get("Subject").unwrap_or_default().to_string(),
            from: addresses("From").into_iter().next(),
            to: addresses("To"),
            cc: addresses("Cc"),
            body: self.snippet.clone(),
            received_at: self
                .internal_date
                .as_deref()
                .and_then(|ms| ms.parse::<i64>().ok())
                .and_then(DateTime::<Utc>::from_timestamp_millis),
            is_read: !self.label_ids.iter().any(|l| l == "UNREAD"),
        }
    }
}
