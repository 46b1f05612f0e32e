//! Transport configuration.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::address::MailAddress;
use crate::error::{Error, Result};
use crate::mailer::Encryption;

/// Immutable relay and override settings read by every send.
///
/// Build one with [`TransportConfig::builder`] or load it from JSON with
/// [`TransportConfig::from_json_str`] / [`TransportConfig::from_json_file`].
#[derive(Clone, PartialEq, Eq)]
pub struct TransportConfig {
    host: String,
    port: u16,
    username: String,
    password: String,
    use_encryption: bool,
    debug_to: Option<MailAddress>,
    default_from: Option<MailAddress>,
    default_bcc: Option<MailAddress>,
    default_reply_to: Option<MailAddress>,
    hello_name: String,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl TransportConfig {
    /// Starts a builder with the default settings.
    #[must_use]
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }

    /// Parses a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or a value is invalid.
    pub fn from_json_str(json: &str) -> Result<Self> {
        ConfigFile::from_json_str(json)?.into_builder().build()
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed, or holds
    /// an invalid value.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        ConfigFile::from_json_file(path)?.into_builder().build()
    }

    /// Relay host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Relay port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Username; empty means no authentication.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Whether the relay is reached over implicit TLS.
    #[must_use]
    pub const fn use_encryption(&self) -> bool {
        self.use_encryption
    }

    /// Connection mode derived from [`Self::use_encryption`].
    #[must_use]
    pub const fn encryption(&self) -> Encryption {
        if self.use_encryption {
            Encryption::Implicit
        } else {
            Encryption::None
        }
    }

    /// Address replacing every primary recipient, if set.
    #[must_use]
    pub const fn debug_to(&self) -> Option<&MailAddress> {
        self.debug_to.as_ref()
    }

    /// Sender used when a message has none.
    #[must_use]
    pub const fn default_from(&self) -> Option<&MailAddress> {
        self.default_from.as_ref()
    }

    /// Blind copy added to every message.
    #[must_use]
    pub const fn default_bcc(&self) -> Option<&MailAddress> {
        self.default_bcc.as_ref()
    }

    /// Reply-to used when a message has none.
    #[must_use]
    pub const fn default_reply_to(&self) -> Option<&MailAddress> {
        self.default_reply_to.as_ref()
    }

    /// Name announced in EHLO.
    #[must_use]
    pub fn hello_name(&self) -> &str {
        &self.hello_name
    }

    /// Time allowed to open the connection.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Time allowed for each command/reply exchange.
    #[must_use]
    pub const fn io_timeout(&self) -> Duration {
        self.io_timeout
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1025,
            username: String::new(),
            password: String::new(),
            use_encryption: false,
            debug_to: None,
            default_from: None,
            default_bcc: None,
            default_reply_to: None,
            hello_name: "localhost".to_string(),
            connect_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(60),
        }
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("use_encryption", &self.use_encryption)
            .field("debug_to", &self.debug_to)
            .field("default_from", &self.default_from)
            .field("default_bcc", &self.default_bcc)
            .field("default_reply_to", &self.default_reply_to)
            .field("hello_name", &self.hello_name)
            .field("connect_timeout", &self.connect_timeout)
            .field("io_timeout", &self.io_timeout)
            .finish()
    }
}

/// Builder for [`TransportConfig`].
///
/// Address options take strings (`user@host` or `Name <user@host>`) and
/// are parsed by [`TransportConfigBuilder::build`].
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct TransportConfigBuilder {
    config: TransportConfig,
    debug_to: Option<String>,
    default_from: Option<String>,
    default_bcc: Option<String>,
    default_reply_to: Option<String>,
}

impl TransportConfigBuilder {
    /// Sets the relay host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the relay port.
    pub const fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the credentials.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = username.into();
        self.config.password = password.into();
        self
    }

    /// Enables implicit TLS.
    pub const fn security(mut self, enabled: bool) -> Self {
        self.config.use_encryption = enabled;
        self
    }

    /// Redirects every message to `address` instead of its primary recipients.
    pub fn debug_to(mut self, address: impl Into<String>) -> Self {
        self.debug_to = Some(address.into());
        self
    }

    /// Sets the sender used when a message has none.
    pub fn default_from(mut self, address: impl Into<String>) -> Self {
        self.default_from = Some(address.into());
        self
    }

    /// Adds a blind copy to every message.
    pub fn default_bcc(mut self, address: impl Into<String>) -> Self {
        self.default_bcc = Some(address.into());
        self
    }

    /// Sets the reply-to used when a message has none.
    pub fn default_reply_to(mut self, address: impl Into<String>) -> Self {
        self.default_reply_to = Some(address.into());
        self
    }

    /// Sets the EHLO name.
    pub fn hello_name(mut self, name: impl Into<String>) -> Self {
        self.config.hello_name = name.into();
        self
    }

    /// Sets the connect timeout.
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Sets the per-exchange timeout.
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.config.io_timeout = timeout;
        self
    }

    /// Validates the settings and builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty host, port 0, an unusable EHLO
    /// name or a zero timeout, and [`Error::InvalidAddress`] for an address
    /// option that does not parse.
    pub fn build(self) -> Result<TransportConfig> {
        let mut config = self.config;

        if config.host.trim().is_empty() {
            return Err(Error::Config("Host cannot be empty".into()));
        }
        if config.port == 0 {
            return Err(Error::Config("Port cannot be 0".into()));
        }
        if config.hello_name.is_empty() || config.hello_name.contains(char::is_whitespace) {
            return Err(Error::Config(format!(
                "Invalid EHLO name: {:?}",
                config.hello_name
            )));
        }
        if config.connect_timeout.is_zero() || config.io_timeout.is_zero() {
            return Err(Error::Config("Timeouts must be greater than zero".into()));
        }

        config.debug_to = parse_optional(self.debug_to)?;
        config.default_from = parse_optional(self.default_from)?;
        config.default_bcc = parse_optional(self.default_bcc)?;
        config.default_reply_to = parse_optional(self.default_reply_to)?;

        Ok(config)
    }
}

/// Empty strings mean "not set", matching unset keys in a config file.
fn parse_optional(value: Option<String>) -> Result<Option<MailAddress>> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| MailAddress::parse(&v))
        .transpose()
}

/// File form of [`TransportConfig`]; every key is optional.
///
/// ```json
/// {
///   "host": "smtp.example.com",
///   "port": 465,
///   "username": "mailer",
///   "password": "secret",
///   "security": true,
///   "debug_to": "QA <qa@example.com>",
///   "default_from": "App <noreply@example.com>"
/// }
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Relay host.
    pub host: Option<String>,
    /// Relay port.
    pub port: Option<u16>,
    /// Username.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Implicit TLS.
    pub security: Option<bool>,
    /// Debug recipient override.
    pub debug_to: Option<String>,
    /// Fallback sender.
    pub default_from: Option<String>,
    /// Blind copy added to every message.
    pub default_bcc: Option<String>,
    /// Fallback reply-to.
    pub default_reply_to: Option<String>,
    /// EHLO name.
    pub hello_name: Option<String>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Per-exchange timeout in seconds.
    pub io_timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Parses a JSON configuration document without validating values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serde`] if the document is malformed or has an
    /// unknown key.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file, leaving validation to
    /// [`TransportConfigBuilder::build`] so callers can layer overrides first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigFile`] if the file cannot be read and
    /// [`Error::Serde`] if it is malformed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| Error::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Applies every present key on top of the defaults.
    pub fn into_builder(self) -> TransportConfigBuilder {
        let mut builder = TransportConfig::builder();

        if let Some(host) = self.host {
            builder = builder.host(host);
        }
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if self.username.is_some() || self.password.is_some() {
            builder = builder.credentials(
                self.username.unwrap_or_default(),
                self.password.unwrap_or_default(),
            );
        }
        if let Some(security) = self.security {
            builder = builder.security(security);
        }
        if let Some(name) = self.hello_name {
            builder = builder.hello_name(name);
        }
        if let Some(secs) = self.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.io_timeout_secs {
            builder = builder.io_timeout(Duration::from_secs(secs));
        }

        builder.debug_to = self.debug_to;
        builder.default_from = self.default_from;
        builder.default_bcc = self.default_bcc;
        builder.default_reply_to = self.default_reply_to;
        builder
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.host(), "127.0.0.1");
        assert_eq!(config.port(), 1025);
        assert_eq!(config.username(), "");
        assert_eq!(config.password(), "");
        assert!(!config.use_encryption());
        assert_eq!(config.encryption(), Encryption::None);
        assert!(config.debug_to().is_none());
        assert_eq!(TransportConfig::builder().build().unwrap(), config);
    }

    #[test]
    fn test_builder_parses_addresses() {
        let config = TransportConfig::builder()
            .host("smtp.example.com")
            .port(465)
            .credentials("user", "pass")
            .security(true)
            .debug_to("QA <qa@example.com>")
            .default_from("noreply@example.com")
            .build()
            .unwrap();

        assert_eq!(config.encryption(), Encryption::Implicit);
        assert_eq!(config.debug_to().unwrap().display_name(), Some("QA"));
        assert_eq!(config.default_from().unwrap().email(), "noreply@example.com");
    }

    #[test]
    fn test_builder_rejects_invalid() {
        assert!(matches!(
            TransportConfig::builder().host(" ").build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            TransportConfig::builder().port(0).build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            TransportConfig::builder().hello_name("my host").build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            TransportConfig::builder().debug_to("not-an-address").build(),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_empty_address_means_unset() {
        let config = TransportConfig::builder().default_bcc("").build().unwrap();
        assert!(config.default_bcc().is_none());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = TransportConfig::builder()
            .credentials("user", "hunter2")
            .build()
            .unwrap();
        let debug = format!("{config:?}");
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_from_json_str() {
        let config = TransportConfig::from_json_str(
            r#"{
                "host": "relay.example.com",
                "port": 2525,
                "username": "mailer",
                "password": "secret",
                "debug_to": "debug@example.com",
                "io_timeout_secs": 5
            }"#,
        )
        .unwrap();

        assert_eq!(config.host(), "relay.example.com");
        assert_eq!(config.port(), 2525);
        assert_eq!(config.username(), "mailer");
        assert_eq!(config.debug_to().unwrap().email(), "debug@example.com");
        assert_eq!(config.io_timeout(), Duration::from_secs(5));
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_json_str_rejects_unknown_keys() {
        assert!(matches!(
            TransportConfig::from_json_str(r#"{"hots": "typo"}"#),
            Err(Error::Serde(_))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("relaymail-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"host": "file.example.com", "security": true}"#).unwrap();

        let file = ConfigFile::from_json_file(&path).unwrap();
        let config = TransportConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(file.host.as_deref(), Some("file.example.com"));
        assert_eq!(config.host(), "file.example.com");
        assert_eq!(config.encryption(), Encryption::Implicit);
    }

    #[test]
    fn test_from_json_file_missing() {
        let err = TransportConfig::from_json_file("/nonexistent/relaymail.json").unwrap_err();
        assert!(matches!(err, Error::ConfigFile { .. }));
    }
}
