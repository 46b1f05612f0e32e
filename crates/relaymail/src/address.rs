//! Email address value type.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// An email address with an optional display name.
///
/// Immutable once constructed. The address part is checked for basic
/// syntax (`local@domain`, no whitespace or control characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MailAddress {
    email: String,
    display_name: Option<String>,
}

impl MailAddress {
    /// Creates an address without a display name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if `email` is not a plausible address.
    pub fn new(email: impl Into<String>) -> Result<Self> {
        let email = email.into();
        validate(&email)?;
        Ok(Self {
            email,
            display_name: None,
        })
    }

    /// Creates an address with a display name.
    ///
    /// A blank name is treated as no name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if `email` is not a plausible address.
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut address = Self::new(email)?;
        address.display_name = Some(name.trim().to_string()).filter(|n| !n.is_empty());
        Ok(address)
    }

    /// Parses `user@host`, `<user@host>` or `Display Name <user@host>`.
    ///
    /// Surrounding double quotes on the display name are removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the input is malformed.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let Some((name, rest)) = input.rsplit_once('<') else {
            return Self::new(input);
        };
        let email = rest
            .strip_suffix('>')
            .ok_or_else(|| Error::InvalidAddress(input.to_string()))?;

        let name = name.trim();
        let name = name
            .strip_prefix('"')
            .and_then(|n| n.strip_suffix('"'))
            .unwrap_or(name);

        Self::with_name(name, email.trim())
    }

    /// Returns the address part.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}

fn validate(email: &str) -> Result<()> {
    relaymail_smtp::Address::new(email)
        .map(|_| ())
        .map_err(|_| Error::InvalidAddress(email.to_string()))
}

impl FromStr for MailAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for MailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}
