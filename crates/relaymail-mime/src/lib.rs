//! # relaymail-mime
//!
//! RFC 5322 message composition with MIME bodies and attachments.
//!
//! ## Features
//!
//! - **Message generation**: address headers, subject, date and message id
//! - **Multipart**: `multipart/alternative` for text + HTML, `multipart/mixed`
//!   for attachments
//! - **Encoding**: Base64 (wrapped at 76 columns), Quoted-Printable and
//!   RFC 2047 encoded words for non-ASCII headers
//!
//! ## Quick Start
//!
//! ```ignore
//! use relaymail_mime::{Attachment, Mailbox, MessageBuilder};
//!
//! let message = MessageBuilder::new()
//!     .from(Mailbox::with_name("Reports", "reports@example.com"))
//!     .to(Mailbox::new("team@example.com"))
//!     .subject("Weekly report")
//!     .text_body("See attached.")
//!     .attach(Attachment::new("report.csv", b"a,b,c".to_vec()))
//!     .build()?;
//!
//! let bytes = message.to_bytes();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod builder;
mod content_type;
mod error;
mod header;

pub mod encoding;

pub use builder::{Attachment, Mailbox, Message, MessageBuilder};
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::{FOLD_WIDTH, Headers, MAX_HEADER_LINE};
