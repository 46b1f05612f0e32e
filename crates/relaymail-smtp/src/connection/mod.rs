//! SMTP connection management with type-state pattern.

mod client;
mod stream;

pub use client::{
    Authenticated, Client, Connected, Data, MailTransaction, Ready, RecipientAdded, Rejected,
    SmtpConnection,
};
pub use stream::{SmtpStream, connect, connect_tls};

use crate::types::{AuthMechanism, Extension};
use std::collections::HashSet;

/// Server capabilities from EHLO response.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from greeting.
    pub hostname: String,
    /// Supported extensions.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Returns the SIZE extension, if advertised, with its optional limit.
    #[must_use]
    pub fn size_extension(&self) -> Option<Option<usize>> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(limit) => Some(*limit),
            _ => None,
        })
    }

    /// Returns the maximum message size, if advertised.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.size_extension().flatten().filter(|limit| *limit > 0)
    }

    /// Returns supported authentication mechanisms.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Picks the mechanism to authenticate with: PLAIN when offered, LOGIN
    /// when it is the only one offered, PLAIN when nothing is advertised.
    #[must_use]
    pub fn preferred_auth_mechanism(&self) -> AuthMechanism {
        let mechanisms = self.auth_mechanisms();
        if mechanisms.contains(&AuthMechanism::Login) && !mechanisms.contains(&AuthMechanism::Plain)
        {
            AuthMechanism::Login
        } else {
            AuthMechanism::Plain
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(lines: &[&str]) -> ServerInfo {
        ServerInfo {
            hostname: "relay.example.com".into(),
            extensions: lines.iter().map(|l| Extension::parse(l)).collect(),
        }
    }

    #[test]
    fn test_size_limits() {
        assert_eq!(info(&["SIZE 1000"]).max_message_size(), Some(1000));
        assert_eq!(info(&["SIZE 0"]).max_message_size(), None);
        assert_eq!(info(&["SIZE"]).size_extension(), Some(None));
        assert_eq!(info(&["PIPELINING"]).size_extension(), None);
    }

    #[test]
    fn test_preferred_auth_mechanism() {
        assert_eq!(
            info(&["AUTH LOGIN PLAIN"]).preferred_auth_mechanism(),
            AuthMechanism::Plain
        );
        assert_eq!(
            info(&["AUTH LOGIN"]).preferred_auth_mechanism(),
            AuthMechanism::Login
        );
        assert_eq!(info(&[]).preferred_auth_mechanism(), AuthMechanism::Plain);
    }

    #[test]
    fn test_starttls_support() {
        assert!(info(&["STARTTLS"]).supports_starttls());
        assert!(!info(&["8BITMIME"]).supports_starttls());
    }
}
