//! Message-to-mailer mapping and delivery.

use tracing::{debug, info, warn};

use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::mailer::{Mailer, SmtpMailer};
use crate::message::MailMessage;
use crate::resolve::{RecipientKind, resolve_address, resolve_addresses};

/// Banner prepended to HTML bodies while the debug recipient override is on.
pub const DEBUG_BANNER: &str = "<div style=\"padding: 15px; margin: 25px 50px; \
    border: 1px solid red; color: red; background-color: #FFC\">\
    This mail is sent in debug mode.</div>";

/// Delivers [`MailMessage`]s through a [`Mailer`].
///
/// Every [`send`](Self::send) builds a fresh mailer from the factory and
/// configures it from the immutable [`TransportConfig`], so one transport
/// can be shared between tasks.
#[derive(Debug, Clone)]
pub struct SmtpTransport<F = fn() -> SmtpMailer> {
    config: TransportConfig,
    new_mailer: F,
}

impl SmtpTransport {
    /// Creates a transport delivering over SMTP.
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            new_mailer: SmtpMailer::new,
        }
    }
}

impl<F, M> SmtpTransport<F>
where
    F: Fn() -> M,
    M: Mailer,
{
    /// Creates a transport that obtains its mailer from `new_mailer`.
    #[must_use]
    pub fn with_mailer(config: TransportConfig, new_mailer: F) -> Self {
        Self { config, new_mailer }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Creates an empty message for this transport.
    #[must_use]
    pub fn create_message(&self) -> MailMessage {
        MailMessage::new()
    }

    /// Delivers `message`.
    ///
    /// The message is only read. Sender, reply-to and recipients are
    /// subject to the configured defaults and debug override.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Delivery`] wrapping the mailer's failure when any
    /// step fails. Nothing is retried.
    pub async fn send(&self, message: &MailMessage) -> Result<()> {
        let mut mailer = (self.new_mailer)();

        let outcome = match self.prepare(&mut mailer, message) {
            Ok(()) => mailer.transmit().await,
            Err(e) => Err(e),
        };

        if let Err(source) = outcome {
            let detail = match mailer.last_error() {
                "" => source.to_string(),
                reported => reported.to_string(),
            };
            warn!(error = %detail, "Mail delivery failed");
            return Err(Error::Delivery {
                detail,
                source: Box::new(source),
            });
        }

        info!(subject = message.subject(), "Mail delivered");
        Ok(())
    }

    /// Copies configuration and message fields onto the mailer.
    fn prepare(&self, mailer: &mut M, message: &MailMessage) -> std::result::Result<(), M::Error> {
        let config = &self.config;

        mailer.configure_endpoint(config.host(), config.port());
        mailer.configure_credentials(config.username(), config.password());
        mailer.configure_encryption(config.encryption());
        mailer.configure_timeouts(config.connect_timeout(), config.io_timeout());
        mailer.configure_hello_name(config.hello_name());

        mailer.set_subject(message.subject());

        if let Some(from) = message.from().or_else(|| config.default_from()) {
            let sender = resolve_address(from, None);
            mailer.set_sender(&sender.email, sender.name.as_deref())?;
        }

        if let Some(debug_to) = config.debug_to() {
            let target = resolve_address(debug_to, None);
            mailer.add_recipient(&target.email, target.name.as_deref())?;
        } else {
            for to in resolve_addresses(message.to()) {
                mailer.add_recipient(&to.email, to.name.as_deref())?;
            }
        }

        for cc in message.cc() {
            let cc = resolve_address(cc, Some(RecipientKind::Cc));
            mailer.add_carbon_copy(&cc.email, cc.name.as_deref())?;
        }

        let bcc = message.bcc().iter().chain(config.default_bcc());
        for bcc in bcc {
            let bcc = resolve_address(bcc, Some(RecipientKind::Bcc));
            mailer.add_blind_copy(&bcc.email, bcc.name.as_deref())?;
        }

        if let Some(reply_to) = message.reply_to().or_else(|| config.default_reply_to()) {
            let reply_to = resolve_address(reply_to, None);
            mailer.add_reply_to(&reply_to.email, reply_to.name.as_deref())?;
        }

        if message.is_html() {
            mailer.set_html(true);
            if config.debug_to().is_some() {
                mailer.set_body(DEBUG_BANNER);
            }
            mailer.append_body(&message.message());
            if let Some(alternative) = message.alternative() {
                mailer.set_alternate_body(&alternative);
            }
        } else {
            mailer.set_alternate_body(&message.message());
        }

        let mut attachments = 0_usize;
        for (name, part) in message.attachments() {
            mailer.add_attachment(part.content(), name, part.mime_type())?;
            attachments += 1;
        }

        let debug_override = config.debug_to().is_some();
        let to = if debug_override { 1 } else { message.to().len() };
        let bcc = message.bcc().len() + usize::from(config.default_bcc().is_some());
        debug!(
            to,
            cc = message.cc().len(),
            bcc,
            debug_override,
            html = message.is_html(),
            attachments,
            "Prepared mail"
        );

        Ok(())
    }
}
