//! Type-state SMTP client.

use super::stream::with_timeout;
use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::time::Duration;

/// Type-state marker for connected state.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Connected {}
    impl Sealed for super::Authenticated {}
}

/// States from which a mail transaction may start.
pub trait Ready: sealed::Sealed {}
impl Ready for Connected {}
impl Ready for Authenticated {}

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    timeout: Duration,
    _state: PhantomData<State>,
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;
}

impl<S> SmtpConnection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }
}

impl Client<Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// Every later reply must arrive within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server returns an error.
    pub async fn from_stream(mut stream: SmtpStream, timeout: Duration) -> Result<Self> {
        let greeting = read_reply(&mut stream, timeout).await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(reply_error(&greeting));
        }

        // First word of the greeting is the server's name
        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: HashSet::new(),
            },
            timeout,
            _state: PhantomData,
        })
    }

    /// Sends EHLO and discovers server capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self
            .expect_success(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;

        // First line echoes the server name, the rest are extensions
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        Ok(self)
    }

    /// Upgrades the connection to TLS using STARTTLS and repeats EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not advertised or the upgrade fails.
    pub async fn starttls(mut self, server_hostname: &str, client_hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.expect_success(Command::StartTls).await?;

        let timeout = self.timeout;
        self.stream = with_timeout(timeout, self.stream.upgrade_to_tls(server_hostname)).await??;

        // Capabilities learned before the upgrade must be discarded
        self.server_info.extensions.clear();
        self.ehlo(client_hostname).await
    }

    /// Authenticates with the given SASL mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the credentials.
    pub async fn authenticate(
        mut self,
        mechanism: AuthMechanism,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        tracing::debug!(mechanism = mechanism.as_str(), "Authenticating");

        match mechanism {
            AuthMechanism::Plain => {
                let credentials = format!("\0{username}\0{password}");
                self.expect_success(Command::Auth {
                    mechanism,
                    initial_response: Some(STANDARD.encode(credentials)),
                })
                .await?;
            }
            AuthMechanism::Login => {
                self.expect_challenge(Command::Auth {
                    mechanism,
                    initial_response: None,
                })
                .await?;
                self.expect_challenge(Command::AuthResponse(STANDARD.encode(username)))
                    .await?;
                self.expect_success(Command::AuthResponse(STANDARD.encode(password)))
                    .await?;
            }
        }

        Ok(self.into_state())
    }
}

impl<S: Ready> Client<S> {
    /// Starts a mail transaction.
    ///
    /// `from` of `None` sends the null reverse path. `size` is announced only
    /// when the server advertises SIZE, and is checked against its limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is larger than the server accepts or
    /// the MAIL FROM command fails.
    pub async fn mail_from(
        mut self,
        from: Option<&Address>,
        size: Option<usize>,
    ) -> Result<Client<MailTransaction>> {
        if let (Some(size), Some(limit)) = (size, self.server_info.max_message_size()) {
            if size > limit {
                return Err(Error::MessageTooLarge { size, limit });
            }
        }

        let size = size.filter(|_| self.server_info.size_extension().is_some());
        self.expect_success(Command::MailFrom {
            from: from.cloned(),
            size,
        })
        .await?;

        Ok(self.into_state())
    }
}

impl Client<MailTransaction> {
    /// Adds the first recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`], holding the client, if the RCPT TO command fails.
    #[allow(clippy::result_large_err)]
    pub async fn rcpt_to(
        mut self,
        to: &Address,
    ) -> std::result::Result<Client<RecipientAdded>, Rejected<MailTransaction>> {
        let outcome = self.expect_success(Command::RcptTo { to: to.clone() }).await;
        match outcome {
            Ok(_) => Ok(self.into_state()),
            Err(error) => Err(Rejected {
                client: self,
                error,
            }),
        }
    }
}

impl Client<RecipientAdded> {
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`], holding the client, if the RCPT TO command fails.
    #[allow(clippy::result_large_err)]
    pub async fn rcpt_to(
        mut self,
        to: &Address,
    ) -> std::result::Result<Self, Rejected<RecipientAdded>> {
        let outcome = self.expect_success(Command::RcptTo { to: to.clone() }).await;
        match outcome {
            Ok(_) => Ok(self),
            Err(error) => Err(Rejected {
                client: self,
                error,
            }),
        }
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the DATA command is not answered with 354.
    pub async fn data(mut self) -> Result<Client<Data>> {
        let reply = self.command(Command::Data).await?;
        if reply.code != ReplyCode::START_DATA {
            return Err(reply_error(&reply));
        }
        Ok(self.into_state())
    }
}

/// A refused recipient, handed back with the client so the open
/// transaction can be reset.
#[derive(Debug)]
pub struct Rejected<State> {
    /// Client in the state it had before the refused command.
    pub client: Client<State>,
    /// Why the command failed.
    pub error: Error,
}

impl<S> From<Rejected<S>> for Error {
    fn from(rejected: Rejected<S>) -> Self {
        rejected.error
    }
}

impl Client<Data> {
    /// Sends the message content and completes the transaction.
    ///
    /// Line endings are normalized to CRLF, lines starting with `.` are
    /// dot-stuffed and the terminating `.` line is appended.
    ///
    /// # Errors
    ///
    /// Returns an error if sending the message fails or server rejects it.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<Connected>> {
        let payload = encode_data(message);
        let timeout = self.timeout;
        with_timeout(timeout, self.stream.write_all(&payload)).await??;

        let reply = read_reply(&mut self.stream, timeout).await?;
        if !reply.is_success() {
            return Err(reply_error(&reply));
        }

        Ok(self.into_state())
    }
}

// Common implementation for all states
impl<S> Client<S> {
    /// Aborts any open transaction with RSET (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the RSET command fails.
    pub async fn reset(mut self) -> Result<Client<Connected>> {
        self.expect_success(Command::Rset).await?;
        Ok(self.into_state())
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.command(Command::Quit).await?;
        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(reply_error(&reply));
        }
        Ok(())
    }

    fn into_state<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            timeout: self.timeout,
            _state: PhantomData,
        }
    }

    async fn command(&mut self, cmd: Command) -> Result<Reply> {
        tracing::trace!(command = cmd.verb(), "SMTP >");
        let timeout = self.timeout;
        with_timeout(timeout, self.stream.write_all(&cmd.serialize())).await??;

        let reply = read_reply(&mut self.stream, timeout).await?;
        tracing::trace!(code = reply.code.as_u16(), "SMTP <");
        Ok(reply)
    }

    async fn expect_success(&mut self, cmd: Command) -> Result<Reply> {
        let reply = self.command(cmd).await?;
        if !reply.is_success() {
            return Err(reply_error(&reply));
        }
        Ok(reply)
    }

    async fn expect_challenge(&mut self, cmd: Command) -> Result<Reply> {
        let reply = self.command(cmd).await?;
        if reply.code != ReplyCode::AUTH_CONTINUE {
            return Err(reply_error(&reply));
        }
        Ok(reply)
    }
}

async fn read_reply(stream: &mut SmtpStream, timeout: Duration) -> Result<Reply> {
    with_timeout(timeout, async {
        let mut lines = Vec::new();
        loop {
            let line = stream.read_line().await?;
            if line.is_empty() {
                continue;
            }

            let is_last = is_last_reply_line(&line);
            lines.push(line);

            if is_last {
                break;
            }
        }
        parse_reply(&lines)
    })
    .await?
}

fn reply_error(reply: &Reply) -> Error {
    Error::smtp_error(reply.code.as_u16(), reply.message_text())
}

/// Normalizes line endings to CRLF, dot-stuffs, and appends the terminator.
fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(message.len() + message.len() / 64 + 5);

    let body = message
        .strip_suffix(b"\n")
        .map_or(message, |m| m.strip_suffix(b"\r").unwrap_or(m));

    if !body.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                payload.push(b'.');
            }
            payload.extend_from_slice(line);
            payload.extend_from_slice(b"\r\n");
        }
    }

    payload.extend_from_slice(b".\r\n");
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_data_normalizes_line_endings() {
        assert_eq!(encode_data(b"a\nb\r\nc"), b"a\r\nb\r\nc\r\n.\r\n");
    }

    #[test]
    fn test_encode_data_trailing_newline_not_doubled() {
        assert_eq!(encode_data(b"hello\r\n"), b"hello\r\n.\r\n");
        assert_eq!(encode_data(b"hello\n"), b"hello\r\n.\r\n");
    }

    #[test]
    fn test_encode_data_dot_stuffing() {
        assert_eq!(encode_data(b".hidden\n..\nok"), b"..hidden\r\n...\r\nok\r\n.\r\n");
    }

    #[test]
    fn test_encode_data_empty() {
        assert_eq!(encode_data(b""), b".\r\n");
    }

    #[test]
    fn test_encode_data_keeps_blank_lines() {
        assert_eq!(encode_data(b"H: v\r\n\r\nbody"), b"H: v\r\n\r\nbody\r\n.\r\n");
    }
}
