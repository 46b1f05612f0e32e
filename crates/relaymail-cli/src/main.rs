//! `relaymail` - send one message through an SMTP relay.
//!
//! Relay settings come from an optional JSON config file, with a few
//! command-line overrides on top.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use relaymail::{ConfigFile, MailAddress, MailMessage, SmtpTransport, TransportConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "relaymail", version, about = "Send a mail through an SMTP relay")]
#[command(group(ArgGroup::new("content").args(["text", "html"])))]
struct Cli {
    /// JSON transport configuration.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Relay host (overrides the config file).
    #[arg(long)]
    host: Option<String>,

    /// Relay port (overrides the config file).
    #[arg(long)]
    port: Option<u16>,

    /// Send every message to this address instead of its recipients.
    #[arg(long, value_name = "ADDRESS")]
    debug_to: Option<String>,

    /// Primary recipient; repeatable.
    #[arg(long, value_name = "ADDRESS")]
    to: Vec<String>,

    /// Carbon-copy recipient; repeatable.
    #[arg(long, value_name = "ADDRESS")]
    cc: Vec<String>,

    /// Blind-copy recipient; repeatable.
    #[arg(long, value_name = "ADDRESS")]
    bcc: Vec<String>,

    /// Sender (falls back to `default_from` in the config).
    #[arg(long, value_name = "ADDRESS")]
    from: Option<String>,

    /// Reply-to address.
    #[arg(long, value_name = "ADDRESS")]
    reply_to: Option<String>,

    /// Subject line.
    #[arg(short, long, default_value = "")]
    subject: String,

    /// Plain-text body.
    #[arg(long)]
    text: Option<String>,

    /// HTML body.
    #[arg(long)]
    html: Option<String>,

    /// File to attach; repeatable.
    #[arg(short, long, value_name = "FILE")]
    attach: Vec<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn transport_config(&self) -> Result<TransportConfig> {
        let file = match &self.config {
            Some(path) => ConfigFile::from_json_file(path)
                .with_context(|| format!("Invalid config file {}", path.display()))?,
            None => ConfigFile::default(),
        };

        let mut builder = file.into_builder();
        if let Some(host) = &self.host {
            builder = builder.host(host);
        }
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(debug_to) = &self.debug_to {
            builder = builder.debug_to(debug_to);
        }

        builder.build().context("Invalid transport configuration")
    }

    fn fill_message(&self, message: &mut MailMessage) -> Result<()> {
        message.set_subject(self.subject.as_str());

        if let Some(from) = &self.from {
            message.set_from(parse_address(from)?);
        }
        for to in &self.to {
            message.add_to(parse_address(to)?);
        }
        for cc in &self.cc {
            message.add_cc(parse_address(cc)?);
        }
        for bcc in &self.bcc {
            message.add_bcc(parse_address(bcc)?);
        }
        if let Some(reply_to) = &self.reply_to {
            message.set_reply_to(parse_address(reply_to)?);
        }

        if let Some(html) = &self.html {
            message.set_html(true).set_message(html.as_str());
        } else if let Some(text) = &self.text {
            message.set_message(text.as_str());
        }

        for path in &self.attach {
            let content =
                std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            message.add_attachment(attachment_name(path)?, content);
        }

        Ok(())
    }
}

fn parse_address(input: &str) -> Result<MailAddress> {
    MailAddress::parse(input).with_context(|| format!("Bad address {input:?}"))
}

fn attachment_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "relaymail=info,relaymail_smtp=info",
        1 => "relaymail=debug,relaymail_smtp=debug",
        _ => "relaymail=trace,relaymail_smtp=trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.transport_config()?;
    info!(host = config.host(), port = config.port(), "Using relay");

    let transport = SmtpTransport::new(config);
    let mut message = transport.create_message();
    cli.fill_message(&mut message)?;

    transport.send(&message).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_text_and_html_conflict() {
        let result = Cli::try_parse_from([
            "relaymail", "--to", "a@x.com", "--text", "hi", "--html", "<p>hi</p>",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_apply_on_defaults() {
        let cli = Cli::try_parse_from([
            "relaymail",
            "--host",
            "smtp.example.com",
            "--port",
            "2525",
            "--debug-to",
            "qa@example.com",
        ])
        .unwrap();
        let config = cli.transport_config().unwrap();

        assert_eq!(config.host(), "smtp.example.com");
        assert_eq!(config.port(), 2525);
        assert_eq!(config.debug_to().unwrap().email(), "qa@example.com");
    }

    #[test]
    fn test_config_file_with_overrides() {
        let path = std::env::temp_dir().join(format!("relaymail-cli-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"host": "file.example.com", "port": 465}"#).unwrap();

        let cli = Cli::try_parse_from([
            "relaymail",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "2525",
        ])
        .unwrap();
        let config = cli.transport_config();
        std::fs::remove_file(&path).unwrap();
        let config = config.unwrap();

        assert_eq!(config.host(), "file.example.com");
        assert_eq!(config.port(), 2525);
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        let cli = Cli::try_parse_from(["relaymail", "--config", "/nonexistent/relaymail.json"])
            .unwrap();
        let err = cli.transport_config().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/relaymail.json"));
    }

    #[test]
    fn test_fill_message() {
        let cli = Cli::try_parse_from([
            "relaymail",
            "--to",
            "A <a@x.com>",
            "--to",
            "b@x.com",
            "--bcc",
            "c@x.com",
            "--subject",
            "Hi",
            "--html",
            "<p>hi</p>",
        ])
        .unwrap();
        let mut message = MailMessage::new();
        cli.fill_message(&mut message).unwrap();

        assert_eq!(message.subject(), "Hi");
        assert_eq!(message.to().len(), 2);
        assert_eq!(message.to()[0].display_name(), Some("A"));
        assert_eq!(message.bcc()[0].email(), "c@x.com");
        assert!(message.is_html());
        assert_eq!(message.message(), "<p>hi</p>");
    }

    #[test]
    fn test_bad_address_is_reported() {
        let cli = Cli::try_parse_from(["relaymail", "--to", "nope"]).unwrap();
        let err = cli.fill_message(&mut MailMessage::new()).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
