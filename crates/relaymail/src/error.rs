//! Error types for the transport.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed failure carried as the cause of a delivery error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced to callers of the transport.
#[derive(Debug, Error)]
pub enum Error {
    /// Delivery failed.
    ///
    /// `detail` is the mailer's last reported error; the original failure is
    /// kept as the source.
    #[error("Could not send the mail: {detail}")]
    Delivery {
        /// Human-readable error reported by the mailer.
        detail: String,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },

    /// An address string could not be parsed.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be read.
    #[error("Could not read {}: {source}", path.display())]
    ConfigFile {
        /// Path that was read.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON for the expected shape.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if retrying the delivery later may succeed.
    ///
    /// Only delivery errors whose cause is a [`MailerError`] can be
    /// classified; everything else is treated as permanent.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Delivery { source, .. } => source
                .downcast_ref::<MailerError>()
                .is_some_and(MailerError::is_transient),
            _ => false,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by [`SmtpMailer`](crate::SmtpMailer).
#[derive(Debug, Error)]
pub enum MailerError {
    /// An address was rejected before transmission.
    #[error("Invalid address: {0}")]
    Address(String),

    /// No sender was set.
    #[error("You must provide a sender address")]
    MissingSender,

    /// No to, cc or bcc recipient was set.
    #[error("You must provide at least one recipient email address")]
    NoRecipients,

    /// The relay could not be reached or did not greet us.
    #[error("SMTP connect() failed: {0}")]
    Connect(#[source] relaymail_smtp::Error),

    /// The relay rejected a command or the exchange broke down.
    #[error(transparent)]
    Smtp(#[from] relaymail_smtp::Error),

    /// The message could not be rendered.
    #[error("Could not compose message: {0}")]
    Compose(#[from] relaymail_mime::Error),
}

impl MailerError {
    /// Returns true for connection failures, timeouts and 4xx replies.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Connect(_) => true,
            Self::Smtp(err) => err.is_transient(),
            Self::Address(_) | Self::MissingSender | Self::NoRecipients | Self::Compose(_) => {
                false
            }
        }
    }
}
