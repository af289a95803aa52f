use std::sync::{Arc, Mutex};

use actionarc_core::EmailProvider;
use actionarc_domain::{ActionArcError, EmailAddress, EmailMessage, OutgoingEmail, Result};
use async_trait::async_trait;

pub fn message(id: &str, subject: &str) -> EmailMessage {
    EmailMessage {
        id: id.into(),
        thread_id: Some(format!("thread-{id}")),
        subject: subject.into(),
        from: Some(EmailAddress::with_name("Sender", "sender@example.com")),
        to: vec![EmailAddress::new("me@example.com")],
        cc: vec![],
        body: format!("body of {id}"),
        received_at: None,
        is_read: false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MailCall {
    Send(OutgoingEmail),
    Reply { id: String, body: String, reply_all: bool },
    Forward { id: String, to: Vec<EmailAddress>, comment: Option<String> },
}

/// Inbox held in memory, newest first. Search is a case-insensitive
/// substring match on subject and body.
#[derive(Default, Clone)]
pub struct MockEmailProvider {
    inbox: Arc<Mutex<Vec<EmailMessage>>>,
    pub calls: Arc<Mutex<Vec<MailCall>>>,
}

impl MockEmailProvider {
    pub fn new(inbox: Vec<EmailMessage>) -> Self {
        Self { inbox: Arc::new(Mutex::new(inbox)), ..Default::default() }
    }

    pub fn calls(&self) -> Vec<MailCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailProvider for MockEmailProvider {
    fn provider_name(&self) -> &'static str {
        "mock"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        self.calls.lock().unwrap().push(MailCall::Send(email.clone()));
        Ok(())
    }

    async fn reply(&self, message_id: &str, body: &str, reply_all: bool) -> Result<()> {
        self.calls.lock().unwrap().push(MailCall::Reply {
            id: message_id.into(),
            body: body.into(),
            reply_all,
        });
        Ok(())
    }

    async fn forward(&self, message_id: &str, to: &[EmailAddress], comment: Option<&str>) -> Result<()> {
        self.calls.lock().unwrap().push(MailCall::Forward {
            id: message_id.into(),
            to: to.to_vec(),
            comment: comment.map(str::to_string),
        });
        Ok(())
    }

    async fn list_inbox(&self, max: usize) -> Result<Vec<EmailMessage>> {
        Ok(self.inbox.lock().unwrap().iter().take(max).cloned().collect())
    }

    async fn search(&self, query: &str, max: usize) -> Result<Vec<EmailMessage>> {
        let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        Ok(self
            .inbox
            .lock()
            .unwrap()
            .iter()
            .filter(|m| {
                let haystack = format!("{} {}", m.subject, m.body).to_lowercase();
                words.iter().any(|w| haystack.contains(w.as_str()))
            })
            .take(max)
            .cloned()
            .collect())
    }

    async fn get_message(&self, id: &str) -> Result<EmailMessage> {
        self.inbox
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| ActionArcError::NotFound(format!("message {id}")))
    }
}
