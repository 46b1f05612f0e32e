//! The composed message model.

use std::borrow::Cow;

use crate::address::MailAddress;

/// Part name holding the primary content.
pub const PART_BODY: &str = "body";

/// Part name holding the alternate-format content.
pub const PART_ALTERNATIVE: &str = "alternative";

/// A named chunk of message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    content: Vec<u8>,
    mime_type: Option<String>,
}

impl Part {
    /// Creates a part from raw content.
    #[must_use]
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            mime_type: None,
        }
    }

    /// Sets an explicit MIME type (used for attachments).
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Returns the raw content.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Returns the explicit MIME type, if any.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Returns the content as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

/// A mail message as populated by the caller.
///
/// Parts are keyed by name: [`PART_BODY`] and [`PART_ALTERNATIVE`] hold
/// content, every other part is an attachment whose name is the filename.
/// Parts keep insertion order; adding a part under an existing name
/// replaces it in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailMessage {
    subject: String,
    from: Option<MailAddress>,
    to: Vec<MailAddress>,
    cc: Vec<MailAddress>,
    bcc: Vec<MailAddress>,
    reply_to: Option<MailAddress>,
    is_html: bool,
    parts: Vec<(String, Part)>,
}

impl MailMessage {
    /// Creates an empty plain-text message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subject.
    pub fn set_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.subject = subject.into();
        self
    }

    /// Sets the sender.
    pub fn set_from(&mut self, from: MailAddress) -> &mut Self {
        self.from = Some(from);
        self
    }

    /// Adds a primary recipient.
    pub fn add_to(&mut self, address: MailAddress) -> &mut Self {
        self.to.push(address);
        self
    }

    /// Adds a carbon-copy recipient.
    pub fn add_cc(&mut self, address: MailAddress) -> &mut Self {
        self.cc.push(address);
        self
    }

    /// Adds a blind-copy recipient.
    pub fn add_bcc(&mut self, address: MailAddress) -> &mut Self {
        self.bcc.push(address);
        self
    }

    /// Sets the reply-to address.
    pub fn set_reply_to(&mut self, address: MailAddress) -> &mut Self {
        self.reply_to = Some(address);
        self
    }

    /// Marks the primary content as HTML.
    pub fn set_html(&mut self, is_html: bool) -> &mut Self {
        self.is_html = is_html;
        self
    }

    /// Sets the primary content.
    pub fn set_message(&mut self, content: impl Into<String>) -> &mut Self {
        self.add_part(PART_BODY, Part::new(content.into()))
    }

    /// Sets the alternate-format content.
    pub fn set_alternative(&mut self, content: impl Into<String>) -> &mut Self {
        self.add_part(PART_ALTERNATIVE, Part::new(content.into()))
    }

    /// Adds an attachment under `filename`.
    pub fn add_attachment(
        &mut self,
        filename: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.add_part(filename, Part::new(content))
    }

    /// Adds or replaces a named part.
    pub fn add_part(&mut self, name: impl Into<String>, part: Part) -> &mut Self {
        let name = name.into();
        match self.parts.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = part,
            None => self.parts.push((name, part)),
        }
        self
    }

    /// Returns the subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the sender, if set.
    #[must_use]
    pub const fn from(&self) -> Option<&MailAddress> {
        self.from.as_ref()
    }

    /// Returns the primary recipients.
    #[must_use]
    pub fn to(&self) -> &[MailAddress] {
        &self.to
    }

    /// Returns the carbon-copy recipients.
    #[must_use]
    pub fn cc(&self) -> &[MailAddress] {
        &self.cc
    }

    /// Returns the blind-copy recipients.
    #[must_use]
    pub fn bcc(&self) -> &[MailAddress] {
        &self.bcc
    }

    /// Returns the reply-to address, if set.
    #[must_use]
    pub const fn reply_to(&self) -> Option<&MailAddress> {
        self.reply_to.as_ref()
    }

    /// Returns true if the primary content is HTML.
    #[must_use]
    pub const fn is_html(&self) -> bool {
        self.is_html
    }

    /// Returns the primary content, or `""` when no body part is set.
    #[must_use]
    pub fn message(&self) -> Cow<'_, str> {
        self.part(PART_BODY).map_or(Cow::Borrowed(""), Part::text)
    }

    /// Returns the alternate-format content, if set.
    #[must_use]
    pub fn alternative(&self) -> Option<Cow<'_, str>> {
        self.part(PART_ALTERNATIVE).map(Part::text)
    }

    /// Looks up a part by name.
    #[must_use]
    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, part)| part)
    }

    /// Returns all parts in insertion order.
    pub fn parts(&self) -> impl Iterator<Item = (&str, &Part)> {
        self.parts.iter().map(|(name, part)| (name.as_str(), part))
    }

    /// Returns the attachment parts (every part except body and alternative).
    pub fn attachments(&self) -> impl Iterator<Item = (&str, &Part)> {
        self.parts()
            .filter(|(name, _)| *name != PART_BODY && *name != PART_ALTERNATIVE)
    }
}
