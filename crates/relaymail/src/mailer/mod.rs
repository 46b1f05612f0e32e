//! The protocol collaborator driven by the transport.
//!
//! [`Mailer`] is the capability set the transport needs from a wire-level
//! client. [`SmtpMailer`] is the default implementation; tests and
//! alternative relays plug in their own.

mod smtp;

pub use smtp::SmtpMailer;

use std::future::Future;
use std::time::Duration;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encryption {
    /// Plain TCP.
    #[default]
    None,
    /// Plain TCP upgraded with STARTTLS after the greeting.
    StartTls,
    /// TLS from connection start.
    Implicit,
}

/// Capabilities a protocol client exposes to the transport.
///
/// Address and attachment setters may reject their input; a rejection is
/// also reflected in [`Mailer::last_error`].
pub trait Mailer: Send {
    /// Failure type reported by this mailer.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sets the relay host and port.
    fn configure_endpoint(&mut self, host: &str, port: u16);

    /// Sets the credentials. An empty username disables authentication.
    fn configure_credentials(&mut self, username: &str, password: &str);

    /// Sets the connection security mode.
    fn configure_encryption(&mut self, mode: Encryption);

    /// Sets connect and per-exchange timeouts.
    fn configure_timeouts(&mut self, _connect: Duration, _io: Duration) {}

    /// Sets the name announced in the greeting.
    fn configure_hello_name(&mut self, _name: &str) {}

    /// Sets the subject.
    fn set_subject(&mut self, subject: &str);

    /// Sets the sender.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is rejected.
    fn set_sender(&mut self, email: &str, name: Option<&str>) -> Result<(), Self::Error>;

    /// Adds a primary recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is rejected.
    fn add_recipient(&mut self, email: &str, name: Option<&str>) -> Result<(), Self::Error>;

    /// Adds a carbon-copy recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is rejected.
    fn add_carbon_copy(&mut self, email: &str, name: Option<&str>) -> Result<(), Self::Error>;

    /// Adds a blind-copy recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is rejected.
    fn add_blind_copy(&mut self, email: &str, name: Option<&str>) -> Result<(), Self::Error>;

    /// Adds a reply-to address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is rejected.
    fn add_reply_to(&mut self, email: &str, name: Option<&str>) -> Result<(), Self::Error>;

    /// Switches the body between HTML and plain text.
    fn set_html(&mut self, is_html: bool);

    /// Replaces the body.
    fn set_body(&mut self, body: &str);

    /// Appends to the body.
    fn append_body(&mut self, text: &str);

    /// Sets the alternate (plain-text) body.
    fn set_alternate_body(&mut self, text: &str);

    /// Adds a binary attachment.
    ///
    /// # Errors
    ///
    /// Returns an error if the attachment is rejected.
    fn add_attachment(
        &mut self,
        content: &[u8],
        filename: &str,
        mime_type: Option<&str>,
    ) -> Result<(), Self::Error>;

    /// Delivers the message.
    fn transmit(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Description of the most recent failure, empty if none.
    fn last_error(&self) -> &str;
}
