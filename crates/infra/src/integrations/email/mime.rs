//! Minimal RFC 2822 message assembly and header parsing for Gmail

use actionarc_domain::EmailAddress;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;

/// Headers and body of a plain single-part message.
#[derive(Debug, Default, Clone)]
pub(crate) struct MimeMessage {
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub bcc: Vec<EmailAddress>,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
    pub in_reply_to: Option<String>,
    pub references: Option<String>,
}

impl MimeMessage {
    /// CRLF-delimited message text.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        push_addresses(&mut lines, "To", &self.to);
        push_addresses(&mut lines, "Cc", &self.cc);
        push_addresses(&mut lines, "Bcc", &self.bcc);
        lines.push(format!("Subject: {}", encode_header_word(&self.subject)));
        if let Some(id) = &self.in_reply_to {
            lines.push(format!("In-Reply-To: {}", sanitize(id)));
        }
        if let Some(refs) = &self.references {
            lines.push(format!("References: {}", sanitize(refs)));
        }
        lines.push("MIME-Version: 1.0".to_string());
        let subtype = if self.is_html { "html" } else { "plain" };
        lines.push(format!("Content-Type: text/{subtype}; charset=\"UTF-8\""));
        lines.push("Content-Transfer-Encoding: base64".to_string());
        lines.push(String::new());

        // 76-column base64 body lines
        let encoded = STANDARD.encode(self.body.as_bytes());
        let chunks: Vec<&str> = encoded
            .as_bytes()
            .chunks(76)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok())
            .collect();
        lines.extend(chunks.into_iter().map(str::to_string));

        lines.join("\r\n")
    }

    /// The `raw` field expected by `users.messages.send`.
    pub fn to_raw(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.render().as_bytes())
    }
}

fn push_addresses(lines: &mut Vec<String>, header: &str, addresses: &[EmailAddress]) {
    if addresses.is_empty() {
        return;
    }
    let rendered: Vec<String> = addresses.iter().map(format_address).collect();
    lines.push(format!("{header}: {}", rendered.join(", ")));
}

fn format_address(address: &EmailAddress) -> String {
    match address.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => {
            format!("{} <{}>", encode_display_name(name), sanitize(&address.address))
        }
        _ => sanitize(&address.address),
    }
}

fn encode_display_name(name: &str) -> String {
    if name.is_ascii() {
        format!("\"{}\"", sanitize(name).replace('"', "'"))
    } else {
        encode_header_word(name)
    }
}

/// RFC 2047 encoded-word for non-ASCII header text.
fn encode_header_word(value: &str) -> String {
    let value = sanitize(value);
    if value.is_ascii() {
        value
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

/// Header values never carry line breaks.
fn sanitize(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Splits an address header on commas outside quotes and angle brackets.
pub(crate) fn parse_address_list(header: &str) -> Vec<EmailAddress> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut in_angle = false;

    for ch in header.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => in_angle = true,
            '>' if !in_quotes => in_angle = false,
            ',' if !in_quotes && !in_angle => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    parts.push(current);

    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok())
        .collect()
}

/// Gmail body data is base64url, with or without padding.
pub(crate) fn decode_body(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(data.trim().trim_end_matches('=')).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// `Re: subject` unless already prefixed.
pub(crate) fn reply_subject(subject: &str) -> String {
    prefixed(subject, "Re:")
}

pub(crate) fn forward_subject(subject: &str) -> String {
    prefixed(subject, "Fwd:")
}

fn prefixed(subject: &str, prefix: &str) -> String {
    let trimmed = subject.trim();
    if trimmed.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix)) {
        trimmed.to_string()
    } else {
        format!("{prefix} {trimmed}")
    }
}
