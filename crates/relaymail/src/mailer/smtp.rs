//! SMTP implementation of [`Mailer`].

use std::collections::HashSet;
use std::time::Duration;

use relaymail_mime::{Attachment, ContentType, Mailbox, Message, MessageBuilder};
use relaymail_smtp::connection::{connect, connect_tls};
use relaymail_smtp::{Address, Client, Rejected, SmtpConnection};

use super::{Encryption, Mailer};
use crate::error::MailerError;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 1025;
const DEFAULT_HELLO: &str = "localhost";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(60);

/// Delivers messages to an SMTP relay.
///
/// Collects envelope, body and attachments through the [`Mailer`] setters,
/// then renders the message and runs one SMTP session in
/// [`Mailer::transmit`]. Bcc recipients receive the message but never
/// appear in its headers.
pub struct SmtpMailer {
    host: String,
    port: u16,
    username: String,
    password: String,
    encryption: Encryption,
    hello_name: String,
    connect_timeout: Duration,
    io_timeout: Duration,

    subject: String,
    sender: Option<Mailbox>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    reply_to: Vec<Mailbox>,
    is_html: bool,
    body: String,
    alternate_body: String,
    attachments: Vec<Attachment>,

    last_error: String,
}

impl SmtpMailer {
    /// Creates a mailer pointed at `127.0.0.1:1025` with no credentials.
    #[must_use]
    pub fn new() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            encryption: Encryption::None,
            hello_name: DEFAULT_HELLO.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
            subject: String::new(),
            sender: None,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            reply_to: Vec::new(),
            is_html: false,
            body: String::new(),
            alternate_body: String::new(),
            attachments: Vec::new(),
            last_error: String::new(),
        }
    }

    /// Renders the message as it will be sent in DATA.
    ///
    /// # Errors
    ///
    /// Returns an error if a header cannot be encoded.
    pub fn compose(&self) -> Result<Message, MailerError> {
        let mut builder = MessageBuilder::new()
            .subject(&self.subject)
            .header("X-Mailer", "relaymail");

        if let Some(sender) = &self.sender {
            builder = builder.from(sender.clone());
        }
        for mailbox in &self.to {
            builder = builder.to(mailbox.clone());
        }
        for mailbox in &self.cc {
            builder = builder.cc(mailbox.clone());
        }
        for mailbox in &self.reply_to {
            builder = builder.reply_to(mailbox.clone());
        }

        builder = if self.is_html {
            let builder = builder.html_body(&self.body);
            if self.alternate_body.is_empty() {
                builder
            } else {
                builder.text_body(&self.alternate_body)
            }
        } else if self.body.is_empty() {
            builder.text_body(&self.alternate_body)
        } else {
            builder.text_body(&self.body)
        };

        for attachment in &self.attachments {
            builder = builder.attach(attachment.clone());
        }

        Ok(builder.build()?)
    }

    /// Envelope recipients: to, cc and bcc, without case-insensitive duplicates.
    fn envelope_recipients(&self) -> Result<Vec<Address>, MailerError> {
        let mut seen = HashSet::new();
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .filter(|mailbox| seen.insert(mailbox.email.to_lowercase()))
            .map(|mailbox| Address::new(mailbox.email.as_str()).map_err(MailerError::from))
            .collect()
    }

    async fn deliver(&self) -> Result<(), MailerError> {
        let sender = self.sender.as_ref().ok_or(MailerError::MissingSender)?;
        let recipients = self.envelope_recipients()?;
        let Some((first, rest)) = recipients.split_first() else {
            return Err(MailerError::NoRecipients);
        };
        let from = Address::new(sender.email.as_str())?;
        let payload = self.compose()?.to_bytes();

        let stream = match self.encryption {
            Encryption::Implicit => connect_tls(&self.host, self.port, self.connect_timeout).await,
            Encryption::StartTls | Encryption::None => {
                connect(&self.host, self.port, self.connect_timeout).await
            }
        }
        .map_err(MailerError::Connect)?;

        let mut client = Client::from_stream(stream, self.io_timeout)
            .await
            .map_err(MailerError::Connect)?
            .ehlo(&self.hello_name)
            .await?;

        if self.encryption == Encryption::StartTls {
            client = client.starttls(&self.host, &self.hello_name).await?;
        }

        let client = if self.username.is_empty() {
            client.mail_from(Some(&from), Some(payload.len())).await?
        } else {
            let mechanism = client.server_info().preferred_auth_mechanism();
            client
                .authenticate(mechanism, &self.username, &self.password)
                .await?
                .mail_from(Some(&from), Some(payload.len()))
                .await?
        };

        let mut client = match client.rcpt_to(first).await {
            Ok(client) => client,
            Err(rejected) => return Err(abandon(rejected).await),
        };
        for recipient in rest {
            client = match client.rcpt_to(recipient).await {
                Ok(client) => client,
                Err(rejected) => return Err(abandon(rejected).await),
            };
        }

        let client = client.data().await?.send_message(&payload).await?;

        // The message is accepted at this point
        if let Err(e) = client.quit().await {
            tracing::debug!(error = %e, "QUIT failed after delivery");
        }

        Ok(())
    }

    fn check_address(&mut self, email: &str) -> Result<(), MailerError> {
        Address::new(email).map(|_| ()).map_err(|e| {
            let err = MailerError::Address(e.to_string());
            self.last_error = err.to_string();
            err
        })
    }

    fn mailbox(email: &str, name: Option<&str>) -> Mailbox {
        Mailbox {
            name: name.map(str::to_string),
            email: email.to_string(),
        }
    }
}

/// Resets the transaction a refused recipient left open and ends the
/// session. The refusal is what gets reported.
async fn abandon<S>(rejected: Rejected<S>) -> MailerError {
    let Rejected { client, error } = rejected;
    match client.reset().await {
        Ok(client) => {
            if let Err(e) = client.quit().await {
                tracing::debug!(error = %e, "QUIT failed after refused recipient");
            }
        }
        Err(e) => tracing::debug!(error = %e, "RSET failed after refused recipient"),
    }
    error.into()
}

impl Default for SmtpMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("encryption", &self.encryption)
            .field("subject", &self.subject)
            .field("recipients", &(self.to.len() + self.cc.len() + self.bcc.len()))
            .field("attachments", &self.attachments.len())
            .finish_non_exhaustive()
    }
}

impl Mailer for SmtpMailer {
    type Error = MailerError;

    fn configure_endpoint(&mut self, host: &str, port: u16) {
        self.host = host.to_string();
        self.port = port;
    }

    fn configure_credentials(&mut self, username: &str, password: &str) {
        self.username = username.to_string();
        self.password = password.to_string();
    }

    fn configure_encryption(&mut self, mode: Encryption) {
        self.encryption = mode;
    }

    fn configure_timeouts(&mut self, connect: Duration, io: Duration) {
        self.connect_timeout = connect;
        self.io_timeout = io;
    }

    fn configure_hello_name(&mut self, name: &str) {
        self.hello_name = name.to_string();
    }

    fn set_subject(&mut self, subject: &str) {
        self.subject = subject.to_string();
    }

    fn set_sender(&mut self, email: &str, name: Option<&str>) -> Result<(), MailerError> {
        self.check_address(email)?;
        self.sender = Some(Self::mailbox(email, name));
        Ok(())
    }

    fn add_recipient(&mut self, email: &str, name: Option<&str>) -> Result<(), MailerError> {
        self.check_address(email)?;
        self.to.push(Self::mailbox(email, name));
        Ok(())
    }

    fn add_carbon_copy(&mut self, email: &str, name: Option<&str>) -> Result<(), MailerError> {
        self.check_address(email)?;
        self.cc.push(Self::mailbox(email, name));
        Ok(())
    }

    fn add_blind_copy(&mut self, email: &str, name: Option<&str>) -> Result<(), MailerError> {
        self.check_address(email)?;
        self.bcc.push(Self::mailbox(email, name));
        Ok(())
    }

    fn add_reply_to(&mut self, email: &str, name: Option<&str>) -> Result<(), MailerError> {
        self.check_address(email)?;
        self.reply_to.push(Self::mailbox(email, name));
        Ok(())
    }

    fn set_html(&mut self, is_html: bool) {
        self.is_html = is_html;
    }

    fn set_body(&mut self, body: &str) {
        self.body = body.to_string();
    }

    fn append_body(&mut self, text: &str) {
        self.body.push_str(text);
    }

    fn set_alternate_body(&mut self, text: &str) {
        self.alternate_body = text.to_string();
    }

    fn add_attachment(
        &mut self,
        content: &[u8],
        filename: &str,
        mime_type: Option<&str>,
    ) -> Result<(), MailerError> {
        let mut attachment = Attachment::new(filename, content.to_vec());
        if let Some(mime_type) = mime_type {
            match ContentType::parse(mime_type) {
                Ok(content_type) => attachment = attachment.with_content_type(content_type),
                Err(e) => {
                    let err = MailerError::Compose(e);
                    self.last_error = err.to_string();
                    return Err(err);
                }
            }
        }
        self.attachments.push(attachment);
        Ok(())
    }

    async fn transmit(&mut self) -> Result<(), MailerError> {
        let result = self.deliver().await;
        if let Err(e) = &result {
            self.last_error = e.to_string();
        }
        result
    }

    fn last_error(&self) -> &str {
        &self.last_error
    }
}
