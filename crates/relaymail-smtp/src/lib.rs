//! # relaymail-smtp
//!
//! Asynchronous SMTP client implementing the submission side of RFC 5321.
//!
//! ## Features
//!
//! - **Type-state connection management**: invalid command sequences do not
//!   compile
//! - **TLS support**: implicit TLS (port 465) and STARTTLS, via rustls
//! - **Authentication**: PLAIN and LOGIN
//! - **Extensions**: SIZE, STARTTLS and AUTH discovery from EHLO
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use relaymail_smtp::{Address, AuthMechanism, Client};
//! use relaymail_smtp::connection::connect;
//!
//! let timeout = Duration::from_secs(30);
//! let stream = connect("127.0.0.1", 1025, timeout).await?;
//! let client = Client::from_stream(stream, timeout).await?.ehlo("localhost").await?;
//! let client = client.authenticate(AuthMechanism::Plain, "user", "secret").await?;
//!
//! let client = client
//!     .mail_from(Some(&Address::new("sender@example.com")?), None)
//!     .await?
//!     .rcpt_to(&Address::new("recipient@example.com")?)
//!     .await?
//!     .data()
//!     .await?;
//!
//! let client = client.send_message(b"Subject: Test\r\n\r\nHello!\r\n").await?;
//! client.quit().await?;
//! ```
//!
//! ## Connection States
//!
//! ```text
//! Connected ── authenticate() ──→ Authenticated
//!     │                                │
//!     └──────── mail_from() ───────────┘
//!                   │
//!                   ↓
//!          MailTransaction ── rcpt_to() ──→ RecipientAdded ── data() ──→ Data
//!
//! A refused `rcpt_to()` returns [`Rejected`], which still owns the client;
//! `reset()` (RSET) brings any state back to `Connected`.
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, Rejected,
    ServerInfo, SmtpConnection,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
