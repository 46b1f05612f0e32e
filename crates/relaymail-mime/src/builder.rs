//! Message composition.

use crate::content_type::ContentType;
use crate::encoding::{
    encode_base64_wrapped, encode_quoted_printable, encode_rfc2047, encode_rfc2047_words,
    has_unfoldable_word, is_plain_header_text,
};
use crate::error::{Error, Result};
use crate::header::Headers;
use chrono::{DateTime, FixedOffset, Local};
use std::fmt::{self, Write as _};
use uuid::Uuid;

/// Mailbox (optional display name + address) for address headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Email address.
    pub email: String,
}

impl Mailbox {
    /// Creates a mailbox with just an address.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Creates a mailbox with a display name and address.
    #[must_use]
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Returns the domain part of the address, if any.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.email
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .filter(|domain| !domain.is_empty())
    }

    /// Formats the mailbox for an address header.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is empty or contains characters that
    /// cannot appear in an `addr-spec`.
    pub fn to_header(&self) -> Result<String> {
        let email = self.email.trim();
        if email.is_empty()
            || email
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || "<>,;\"".contains(c))
        {
            return Err(Error::InvalidMailbox(self.email.clone()));
        }

        let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) else {
            return Ok(email.to_string());
        };

        let display = if !is_plain_header_text(name) {
            encode_rfc2047(name)
        } else if name.contains(|c: char| "()<>[]:;@\\,.\"".contains(c)) {
            format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
        } else {
            name.to_string()
        };

        Ok(format!("{display} <{email}>"))
    }
}

impl From<&str> for Mailbox {
    fn from(email: &str) -> Self {
        Self::new(email)
    }
}

/// Binary attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name presented to the recipient.
    pub filename: String,
    /// Raw content.
    pub content: Vec<u8>,
    /// Explicit content type; guessed from the file name when absent.
    pub content_type: Option<ContentType>,
}

impl Attachment {
    /// Creates an attachment whose content type is guessed from the file name.
    #[must_use]
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content,
            content_type: None,
        }
    }

    /// Sets an explicit content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    fn to_entity(&self) -> Result<Entity> {
        let filename = parameter_value(&self.filename);
        let content_type = self
            .content_type
            .clone()
            .unwrap_or_else(|| ContentType::for_filename(&self.filename))
            .with_parameter("name", filename.clone());

        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string())?;
        headers.add("Content-Transfer-Encoding", "base64")?;
        headers.add(
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        )?;

        Ok(Entity {
            headers,
            body: encode_base64_wrapped(&self.content),
        })
    }
}

/// Encodes a file name for use as a quoted MIME parameter. Non-ASCII or
/// unfoldable names become encoded words.
fn parameter_value(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();

    if sanitized.is_ascii() && !has_unfoldable_word(&sanitized) {
        sanitized
    } else {
        encode_rfc2047_words(&sanitized)
    }
}

/// Header block plus encoded body of one MIME entity.
#[derive(Debug)]
struct Entity {
    headers: Headers,
    body: String,
}

impl Entity {
    fn text(content_type: ContentType, text: &str) -> Result<Self> {
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string())?;
        headers.add("Content-Transfer-Encoding", "quoted-printable")?;
        Ok(Self {
            headers,
            body: encode_quoted_printable(text),
        })
    }

    fn multipart(content_type: ContentType, boundary: &str, parts: Vec<Self>) -> Result<Self> {
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string())?;

        let mut body = String::new();
        for part in parts {
            let _ = write!(body, "--{boundary}\r\n{}\r\n{}\r\n", part.headers, part.body);
        }
        let _ = write!(body, "--{boundary}--\r\n");

        Ok(Self { headers, body })
    }
}

/// A composed RFC 5322 message.
#[derive(Debug, Clone)]
pub struct Message {
    headers: Headers,
    body: String,
}

impl Message {
    /// Returns the top-level headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the encoded body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the full message as bytes, ready for the SMTP `DATA` phase.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n{}", self.headers, self.body)
    }
}

/// Builder for outgoing messages.
///
/// There is intentionally no Bcc setter: blind copies only exist in the SMTP
/// envelope and never appear in the message headers.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<Mailbox>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    reply_to: Vec<Mailbox>,
    subject: Option<String>,
    date: Option<DateTime<FixedOffset>>,
    message_id: Option<String>,
    headers: Vec<(String, String)>,
    text: Option<String>,
    html: Option<String>,
    attachments: Vec<Attachment>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the From mailbox.
    #[must_use]
    pub fn from(mut self, mailbox: impl Into<Mailbox>) -> Self {
        self.from = Some(mailbox.into());
        self
    }

    /// Adds a To recipient.
    #[must_use]
    pub fn to(mut self, mailbox: impl Into<Mailbox>) -> Self {
        self.to.push(mailbox.into());
        self
    }

    /// Adds a Cc recipient.
    #[must_use]
    pub fn cc(mut self, mailbox: impl Into<Mailbox>) -> Self {
        self.cc.push(mailbox.into());
        self
    }

    /// Adds a Reply-To mailbox.
    #[must_use]
    pub fn reply_to(mut self, mailbox: impl Into<Mailbox>) -> Self {
        self.reply_to.push(mailbox.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the Date header (defaults to the local time at build).
    #[must_use]
    pub const fn date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the Message-ID (generated from the sender domain when absent).
    #[must_use]
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Adds a custom header, validated at build time.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn text_body(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html_body(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Builds the message.
    ///
    /// Text + HTML produce `multipart/alternative`; any attachment wraps the
    /// content in `multipart/mixed`.
    ///
    /// # Errors
    ///
    /// Returns an error if a mailbox or custom header is invalid.
    pub fn build(self) -> Result<Message> {
        let mut headers = Headers::new();

        let date = self.date.unwrap_or_else(|| Local::now().fixed_offset());
        headers.add("Date", date.to_rfc2822())?;

        if let Some(from) = &self.from {
            headers.add("From", from.to_header()?)?;
        }
        add_mailbox_list(&mut headers, "To", &self.to)?;
        add_mailbox_list(&mut headers, "Cc", &self.cc)?;
        add_mailbox_list(&mut headers, "Reply-To", &self.reply_to)?;

        if let Some(subject) = &self.subject {
            headers.add("Subject", encode_rfc2047(subject))?;
        }

        let message_id = self.message_id.clone().map_or_else(
            || {
                let domain = self
                    .from
                    .as_ref()
                    .and_then(Mailbox::domain)
                    .unwrap_or("localhost");
                format!("<{}@{domain}>", Uuid::new_v4().simple())
            },
            |id| {
                if id.starts_with('<') {
                    id
                } else {
                    format!("<{id}>")
                }
            },
        );
        headers.add("Message-ID", message_id)?;

        for (name, value) in &self.headers {
            headers.add(name.as_str(), value.as_str())?;
        }
        headers.add("MIME-Version", "1.0")?;

        let entity = self.content_entity()?;
        for (name, value) in entity.headers.iter() {
            headers.add(name, value)?;
        }

        Ok(Message {
            headers,
            body: entity.body,
        })
    }

    fn content_entity(&self) -> Result<Entity> {
        let content = match (&self.text, &self.html) {
            (Some(text), Some(html)) => {
                let boundary = new_boundary();
                Entity::multipart(
                    ContentType::multipart_alternative(boundary.as_str()),
                    &boundary,
                    vec![
                        Entity::text(ContentType::text_plain(), text)?,
                        Entity::text(ContentType::text_html(), html)?,
                    ],
                )?
            }
            (None, Some(html)) => Entity::text(ContentType::text_html(), html)?,
            (Some(text), None) => Entity::text(ContentType::text_plain(), text)?,
            (None, None) => Entity::text(ContentType::text_plain(), "")?,
        };

        if self.attachments.is_empty() {
            return Ok(content);
        }

        let mut parts = vec![content];
        for attachment in &self.attachments {
            parts.push(attachment.to_entity()?);
        }
        let boundary = new_boundary();
        Entity::multipart(ContentType::multipart_mixed(boundary.as_str()), &boundary, parts)
    }
}

fn new_boundary() -> String {
    format!("=_{}", Uuid::new_v4().simple())
}

fn add_mailbox_list(headers: &mut Headers, name: &str, mailboxes: &[Mailbox]) -> Result<()> {
    if mailboxes.is_empty() {
        return Ok(());
    }

    let formatted = mailboxes
        .iter()
        .map(Mailbox::to_header)
        .collect::<Result<Vec<_>>>()?;
    headers.add(name, formatted.join(",\r\n "))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn fixed_date() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc2822("Thu, 10 Jul 2025 10:52:37 +0200").unwrap()
    }

    #[test]
    fn test_mailbox_header_forms() {
        assert_eq!(
            Mailbox::new("a@example.com").to_header().unwrap(),
            "a@example.com"
        );
        assert_eq!(
            Mailbox::with_name("Jane Doe", "jane@example.com")
                .to_header()
                .unwrap(),
            "Jane Doe <jane@example.com>"
        );
        assert_eq!(
            Mailbox::with_name("Doe, Jane", "jane@example.com")
                .to_header()
                .unwrap(),
            "\"Doe, Jane\" <jane@example.com>"
        );
        assert_eq!(
            Mailbox::with_name("Zoë", "zoe@example.com")
                .to_header()
                .unwrap(),
            "=?utf-8?B?Wm/Dqw==?= <zoe@example.com>"
        );
    }

    #[test]
    fn test_mailbox_rejects_injection() {
        assert!(Mailbox::new("a@example.com>\r\nBcc: x").to_header().is_err());
        assert!(Mailbox::new("").to_header().is_err());
    }

    #[test]
    fn test_plain_text_message() {
        let message = MessageBuilder::new()
            .from(Mailbox::with_name("Sender", "sender@example.com"))
            .to("a@example.com")
            .to("b@example.com")
            .subject("Hi")
            .date(fixed_date())
            .message_id("fixed@example.com")
            .text_body("hello")
            .build()
            .unwrap();

        let headers = message.headers();
        assert_eq!(headers.get("From"), Some("Sender <sender@example.com>"));
        assert_eq!(headers.get("To"), Some("a@example.com,\r\n b@example.com"));
        assert_eq!(headers.get("Subject"), Some("Hi"));
        assert_eq!(headers.get("Date"), Some("Thu, 10 Jul 2025 10:52:37 +0200"));
        assert_eq!(headers.get("Message-ID"), Some("<fixed@example.com>"));
        assert_eq!(headers.get("MIME-Version"), Some("1.0"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(message.body(), "hello");

        let raw = message.to_string();
        assert!(raw.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn test_generated_message_id_uses_sender_domain() {
        let message = MessageBuilder::new()
            .from("sender@relay.example.org")
            .build()
            .unwrap();
        let id = message.headers().get("Message-ID").unwrap();
        assert!(id.starts_with('<'));
        assert!(id.ends_with("@relay.example.org>"));
    }

    #[test]
    fn test_html_with_alternative() {
        let message = MessageBuilder::new()
            .text_body("plain")
            .html_body("<p>html</p>")
            .build()
            .unwrap();

        let content_type = message.headers().get("Content-Type").unwrap();
        assert!(content_type.starts_with("multipart/alternative; boundary="));
        assert!(message.body().contains("text/plain; charset=utf-8"));
        assert!(message.body().contains("text/html; charset=utf-8"));
        assert!(message.body().contains("<p>html</p>"));
    }

    #[test]
    fn test_attachments_use_mixed() {
        let message = MessageBuilder::new()
            .text_body("see attached")
            .attach(Attachment::new("report.csv", b"a,b,c".to_vec()))
            .build()
            .unwrap();

        let content_type =
            ContentType::parse(message.headers().get("Content-Type").unwrap()).unwrap();
        assert_eq!(content_type.sub_type, "mixed");
        let boundary = content_type.boundary().unwrap();

        let body = message.body();
        assert_eq!(body.matches(&format!("--{boundary}\r\n")).count(), 2);
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));
        assert!(body.contains("Content-Type: text/csv; name=report.csv"));
        assert!(body.contains("Content-Disposition: attachment; filename=\"report.csv\""));
        assert!(body.contains("YSxiLGM="));
    }

    #[test]
    fn test_attachment_filename_is_sanitized() {
        let entity = Attachment::new("we\"ird\r\n.bin", vec![1, 2, 3])
            .to_entity()
            .unwrap();
        assert_eq!(
            entity.headers.get("Content-Disposition"),
            Some("attachment; filename=\"we_ird__.bin\"")
        );
    }

    fn longest_line(message: &Message) -> usize {
        message
            .to_string()
            .split("\r\n")
            .map(str::len)
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_long_subject_and_filename_stay_within_line_limit() {
        let message = MessageBuilder::new()
            .from("sender@example.com")
            .to("a@example.com")
            .subject("word ".repeat(240))
            .text_body("see attached")
            .attach(Attachment::new(
                format!("{} report.csv", "quarterly ".repeat(120)),
                b"a,b,c".to_vec(),
            ))
            .attach(Attachment::new(format!("{}.csv", "x".repeat(1200)), vec![1]))
            .build()
            .unwrap();

        assert!(longest_line(&message) <= 998);
        let raw = message.to_string();
        let subject_line = raw
            .split("\r\n")
            .find(|line| line.starts_with("Subject: "))
            .unwrap();
        assert!(subject_line.len() <= 78);
    }

    #[test]
    fn test_long_non_ascii_filename_is_split_into_words() {
        let entity = Attachment::new(format!("{}.txt", "é".repeat(200)), vec![1])
            .to_entity()
            .unwrap();
        let disposition = entity.headers.get("Content-Disposition").unwrap();
        assert!(disposition.contains("\r\n =?utf-8?B?"));
        assert!(entity.headers.to_string().split("\r\n").all(|line| line.len() <= 998));
    }

    #[test]
    fn test_non_ascii_subject_is_encoded() {
        let message = MessageBuilder::new().subject("Grüße").build().unwrap();
        assert_eq!(
            message.headers().get("Subject"),
            Some("=?utf-8?B?R3LDvMOfZQ==?=")
        );
    }

    #[test]
    fn test_custom_header_validated() {
        let result = MessageBuilder::new()
            .header("X-Mailer", "relaymail\r\nBcc: x@example.com")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_message_has_text_body() {
        let message = MessageBuilder::new().build().unwrap();
        assert_eq!(
            message.headers().get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(message.body(), "");
    }
}
