//! # relaymail
//!
//! Mail composition and delivery to an SMTP relay.
//!
//! This crate provides:
//! - [`MailMessage`] and [`MailAddress`], the message model callers populate
//! - [`TransportConfig`], relay settings plus debug overrides (redirect all
//!   primary recipients, default sender, default bcc, default reply-to)
//! - [`SmtpTransport`], which maps a message onto a [`Mailer`] and delivers it
//! - [`SmtpMailer`], the default [`Mailer`] speaking SMTP over TCP or TLS
//!
//! ## Example
//!
//! ```ignore
//! use relaymail::{MailAddress, SmtpTransport, TransportConfig};
//!
//! let config = TransportConfig::builder()
//!     .host("smtp.example.com")
//!     .port(465)
//!     .security(true)
//!     .default_from("App <noreply@example.com>")
//!     .build()?;
//! let transport = SmtpTransport::new(config);
//!
//! let mut message = transport.create_message();
//! message
//!     .set_subject("Weekly report")
//!     .add_to(MailAddress::new("team@example.com")?)
//!     .set_message("See attached.")
//!     .add_attachment("report.csv", b"a,b,c".to_vec());
//!
//! transport.send(&message).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
pub mod config;
mod error;
pub mod mailer;
mod message;
pub mod resolve;
mod transport;

pub use address::MailAddress;
pub use config::{ConfigFile, TransportConfig, TransportConfigBuilder};
pub use error::{BoxError, Error, MailerError, Result};
pub use mailer::{Encryption, Mailer, SmtpMailer};
pub use message::{MailMessage, PART_ALTERNATIVE, PART_BODY, Part};
pub use resolve::{RecipientKind, ResolvedAddress, resolve_address, resolve_addresses};
pub use transport::{DEBUG_BANNER, SmtpTransport};
