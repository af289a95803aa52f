//! Mail DTOs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ActionArcError;

/// Mailbox address with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub address: String,
}

impl EmailAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self { name: None, address: address.into() }
    }

    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self { name: Some(name.into()), address: address.into() }
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if !name.is_empty() => write!(f, "{} <{}>", name, self.address),
            _ => write!(f, "{}", self.address),
        }
    }
}

/// Accepts `addr@host` and `Display Name <addr@host>`.
impl FromStr for EmailAddress {
    type Err = ActionArcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, address) = match (s.rfind('<'), s.ends_with('>')) {
            (Some(open), true) => {
                let name = s[..open].trim().trim_matches('"').trim();
                let address = s[open + 1..s.len() - 1].trim();
                ((!name.is_empty()).then(|| name.to_string()), address)
            }
            _ => (None, s),
        };

        let valid = match address.split_once('@') {
            Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !address.contains(' '),
            None => false,
        };
        if !valid {
            return Err(ActionArcError::InvalidInput(format!("invalid email address: {s}")));
        }

        Ok(Self { name, address: address.to_string() })
    }
}

/// Message as read from a mailbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<EmailAddress>,
    #[serde(default)]
    pub to: Vec<EmailAddress>,
    #[serde(default)]
    pub cc: Vec<EmailAddress>,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_read: bool,
}

/// Message to be sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub to: Vec<EmailAddress>,
    #[serde(default)]
    pub cc: Vec<EmailAddress>,
    #[serde(default)]
    pub bcc: Vec<EmailAddress>,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub is_html: bool,
}

impl OutgoingEmail {
    pub fn validate(&self) -> crate::Result<()> {
        if self.to.is_empty() {
            return Err(ActionArcError::InvalidInput("email needs at least one recipient".into()));
        }
        Ok(())
    }
}
