//! Transport behavior against a recording mailer.
//!
//! Each mailer the transport creates records every call it receives and
//! hands the record to a shared sink when dropped.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use relaymail::{
    DEBUG_BANNER, Encryption, Error, MailAddress, MailMessage, Mailer, Part, SmtpTransport,
    TransportConfig,
};

#[derive(Debug, thiserror::Error)]
enum FakeError {
    #[error("SMTP Error: Could not connect to fake relay")]
    Unreachable,
    #[error("Invalid address: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Recipient {
    email: String,
    name: Option<String>,
    kind: &'static str,
}

#[derive(Debug, Default)]
struct Session {
    endpoint: Option<(String, u16)>,
    credentials: Option<(String, String)>,
    encryption: Option<Encryption>,
    timeouts: Option<(Duration, Duration)>,
    subject: String,
    sender: Option<(String, Option<String>)>,
    recipients: Vec<Recipient>,
    is_html: bool,
    body: String,
    alternate_body: String,
    attachments: Vec<(String, Vec<u8>, Option<String>)>,
    transmitted: bool,
}

impl Session {
    fn emails(&self, kind: &str) -> Vec<&str> {
        self.recipients
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.email.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Behavior {
    fail_transmit: bool,
    reject: Option<&'static str>,
}

struct RecordingMailer {
    session: Session,
    behavior: Behavior,
    last_error: String,
    sink: Arc<Mutex<Vec<Session>>>,
}

impl RecordingMailer {
    fn record(
        &mut self,
        email: &str,
        name: Option<&str>,
        kind: &'static str,
    ) -> Result<(), FakeError> {
        if self.behavior.reject == Some(email) {
            let err = FakeError::Rejected(email.to_string());
            self.last_error = err.to_string();
            return Err(err);
        }
        self.session.recipients.push(Recipient {
            email: email.to_string(),
            name: name.map(str::to_string),
            kind,
        });
        Ok(())
    }
}

impl Drop for RecordingMailer {
    fn drop(&mut self) {
        let session = std::mem::take(&mut self.session);
        self.sink.lock().unwrap().push(session);
    }
}

impl Mailer for RecordingMailer {
    type Error = FakeError;

    fn configure_endpoint(&mut self, host: &str, port: u16) {
        self.session.endpoint = Some((host.to_string(), port));
    }

    fn configure_credentials(&mut self, username: &str, password: &str) {
        self.session.credentials = Some((username.to_string(), password.to_string()));
    }

    fn configure_encryption(&mut self, mode: Encryption) {
        self.session.encryption = Some(mode);
    }

    fn configure_timeouts(&mut self, connect: Duration, io: Duration) {
        self.session.timeouts = Some((connect, io));
    }

    fn set_subject(&mut self, subject: &str) {
        self.session.subject = subject.to_string();
    }

    fn set_sender(&mut self, email: &str, name: Option<&str>) -> Result<(), FakeError> {
        self.session.sender = Some((email.to_string(), name.map(str::to_string)));
        Ok(())
    }

    fn add_recipient(&mut self, email: &str, name: Option<&str>) -> Result<(), FakeError> {
        self.record(email, name, "to")
    }

    fn add_carbon_copy(&mut self, email: &str, name: Option<&str>) -> Result<(), FakeError> {
        self.record(email, name, "cc")
    }

    fn add_blind_copy(&mut self, email: &str, name: Option<&str>) -> Result<(), FakeError> {
        self.record(email, name, "bcc")
    }

    fn add_reply_to(&mut self, email: &str, name: Option<&str>) -> Result<(), FakeError> {
        self.record(email, name, "reply-to")
    }

    fn set_html(&mut self, is_html: bool) {
        self.session.is_html = is_html;
    }

    fn set_body(&mut self, body: &str) {
        self.session.body = body.to_string();
    }

    fn append_body(&mut self, text: &str) {
        self.session.body.push_str(text);
    }

    fn set_alternate_body(&mut self, text: &str) {
        self.session.alternate_body = text.to_string();
    }

    fn add_attachment(
        &mut self,
        content: &[u8],
        filename: &str,
        mime_type: Option<&str>,
    ) -> Result<(), FakeError> {
        self.session.attachments.push((
            filename.to_string(),
            content.to_vec(),
            mime_type.map(str::to_string),
        ));
        Ok(())
    }

    async fn transmit(&mut self) -> Result<(), FakeError> {
        if self.behavior.fail_transmit {
            let err = FakeError::Unreachable;
            self.last_error = err.to_string();
            return Err(err);
        }
        self.session.transmitted = true;
        Ok(())
    }

    fn last_error(&self) -> &str {
        &self.last_error
    }
}

fn transport(
    config: TransportConfig,
    behavior: Behavior,
) -> (
    SmtpTransport<impl Fn() -> RecordingMailer>,
    Arc<Mutex<Vec<Session>>>,
) {
    let sink = Arc::new(Mutex::new(Vec::new()));
    let factory_sink = Arc::clone(&sink);
    let transport = SmtpTransport::with_mailer(config, move || RecordingMailer {
        session: Session::default(),
        behavior,
        last_error: String::new(),
        sink: Arc::clone(&factory_sink),
    });
    (transport, sink)
}

async fn send_one(config: TransportConfig, message: &MailMessage) -> Session {
    let (transport, sink) = transport(config, Behavior::default());
    transport.send(message).await.unwrap();
    let mut sessions = sink.lock().unwrap();
    assert_eq!(sessions.len(), 1);
    sessions.pop().unwrap()
}

fn addr(input: &str) -> MailAddress {
    input.parse().unwrap()
}

fn message_to(recipients: &[&str]) -> MailMessage {
    let mut message = MailMessage::new();
    message.set_subject("Hi").set_message("hello");
    for recipient in recipients {
        message.add_to(addr(recipient));
    }
    message
}

#[tokio::test]
async fn configures_endpoint_credentials_and_encryption() {
    let config = TransportConfig::builder()
        .host("smtp.example.com")
        .port(465)
        .credentials("mailer", "secret")
        .security(true)
        .io_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let session = send_one(config, &message_to(&["a@x.com"])).await;

    assert_eq!(session.endpoint, Some(("smtp.example.com".to_string(), 465)));
    assert_eq!(
        session.credentials,
        Some(("mailer".to_string(), "secret".to_string()))
    );
    assert_eq!(session.encryption, Some(Encryption::Implicit));
    assert_eq!(
        session.timeouts,
        Some((Duration::from_secs(30), Duration::from_secs(5)))
    );
    assert_eq!(session.subject, "Hi");
    assert!(session.transmitted);
}

#[tokio::test]
async fn default_config_is_plain_local_relay() {
    let session = send_one(TransportConfig::default(), &message_to(&["a@x.com"])).await;
    assert_eq!(session.endpoint, Some(("127.0.0.1".to_string(), 1025)));
    assert_eq!(session.encryption, Some(Encryption::None));
}

#[tokio::test]
async fn default_from_used_when_message_has_no_sender() {
    let config = TransportConfig::builder()
        .default_from("App <noreply@x.com>")
        .build()
        .unwrap();
    let session = send_one(config, &message_to(&["a@x.com"])).await;

    assert_eq!(
        session.sender,
        Some(("noreply@x.com".to_string(), Some("App".to_string())))
    );
}

#[tokio::test]
async fn message_sender_wins_over_default() {
    let config = TransportConfig::builder()
        .default_from("noreply@x.com")
        .build()
        .unwrap();
    let mut message = message_to(&["a@x.com"]);
    message.set_from(addr("me@x.com"));
    let session = send_one(config, &message).await;

    assert_eq!(session.sender, Some(("me@x.com".to_string(), None)));
}

#[tokio::test]
async fn no_sender_when_neither_is_set() {
    let session = send_one(TransportConfig::default(), &message_to(&["a@x.com"])).await;
    assert_eq!(session.sender, None);
}

#[tokio::test]
async fn debug_to_replaces_primary_recipients() {
    let config = TransportConfig::builder()
        .debug_to("debug@x.com")
        .build()
        .unwrap();
    let session = send_one(config, &message_to(&["a@x.com", "b@x.com"])).await;

    assert_eq!(session.emails("to"), vec!["debug@x.com"]);
}

#[tokio::test]
async fn recipients_pass_through_in_order_with_names() {
    let session = send_one(
        TransportConfig::default(),
        &message_to(&["Ann <a@x.com>", "b@x.com"]),
    )
    .await;

    assert_eq!(
        session.recipients,
        vec![
            Recipient {
                email: "a@x.com".into(),
                name: Some("Ann".into()),
                kind: "to"
            },
            Recipient {
                email: "b@x.com".into(),
                name: None,
                kind: "to"
            },
        ]
    );
}

#[tokio::test]
async fn cc_added_as_carbon_copy_and_bcc_as_blind_copy() {
    let mut message = message_to(&["a@x.com"]);
    message
        .add_cc(addr("c1@x.com"))
        .add_cc(addr("c2@x.com"))
        .add_bcc(addr("hidden@x.com"));
    let session = send_one(TransportConfig::default(), &message).await;

    assert_eq!(session.emails("cc"), vec!["c1@x.com", "c2@x.com"]);
    assert_eq!(session.emails("bcc"), vec!["hidden@x.com"]);
}

#[tokio::test]
async fn cc_and_bcc_still_added_under_debug_override() {
    let config = TransportConfig::builder()
        .debug_to("debug@x.com")
        .build()
        .unwrap();
    let mut message = message_to(&["a@x.com"]);
    message.add_cc(addr("c@x.com")).add_bcc(addr("b@x.com"));
    let session = send_one(config, &message).await;

    assert_eq!(session.emails("to"), vec!["debug@x.com"]);
    assert_eq!(session.emails("cc"), vec!["c@x.com"]);
    assert_eq!(session.emails("bcc"), vec!["b@x.com"]);
}

#[tokio::test]
async fn default_bcc_always_appended() {
    let config = TransportConfig::builder()
        .default_bcc("archive@x.com")
        .build()
        .unwrap();

    let session = send_one(config.clone(), &message_to(&["a@x.com"])).await;
    assert_eq!(session.emails("bcc"), vec!["archive@x.com"]);

    let mut message = message_to(&["a@x.com"]);
    message.add_bcc(addr("own@x.com"));
    let session = send_one(config, &message).await;
    assert_eq!(session.emails("bcc"), vec!["own@x.com", "archive@x.com"]);
}

#[tokio::test]
async fn reply_to_falls_back_to_default() {
    let config = TransportConfig::builder()
        .default_reply_to("support@x.com")
        .build()
        .unwrap();

    let session = send_one(config.clone(), &message_to(&["a@x.com"])).await;
    assert_eq!(session.emails("reply-to"), vec!["support@x.com"]);

    let mut message = message_to(&["a@x.com"]);
    message.set_reply_to(addr("me@x.com"));
    let session = send_one(config, &message).await;
    assert_eq!(session.emails("reply-to"), vec!["me@x.com"]);
}

#[tokio::test]
async fn no_reply_to_when_unset() {
    let session = send_one(TransportConfig::default(), &message_to(&["a@x.com"])).await;
    assert!(session.emails("reply-to").is_empty());
}

#[tokio::test]
async fn body_and_attachment_example() {
    let mut message = message_to(&["a@x.com"]);
    message.add_attachment("report.csv", "a,b,c");
    let session = send_one(TransportConfig::default(), &message).await;

    // Plain text travels as the alternate body
    assert!(!session.is_html);
    assert_eq!(session.alternate_body, "hello");
    assert_eq!(
        session.attachments,
        vec![("report.csv".to_string(), b"a,b,c".to_vec(), None)]
    );
}

#[tokio::test]
async fn content_parts_are_never_attachments() {
    let mut message = message_to(&["a@x.com"]);
    message
        .set_alternative("plain")
        .add_part("logo.png", Part::new(vec![0x89, b'P']).with_mime_type("image/png"))
        .add_attachment("notes.txt", "n");
    let session = send_one(TransportConfig::default(), &message).await;

    let names: Vec<_> = session.attachments.iter().map(|a| a.0.as_str()).collect();
    assert_eq!(names, vec!["logo.png", "notes.txt"]);
    assert_eq!(session.attachments[0].2.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn html_debug_mode_prepends_banner() {
    let config = TransportConfig::builder()
        .debug_to("debug@x.com")
        .build()
        .unwrap();
    let mut message = message_to(&["a@x.com"]);
    message.set_html(true).set_message("<p>hello</p>");
    let session = send_one(config, &message).await;

    assert!(session.is_html);
    assert_eq!(session.body, format!("{DEBUG_BANNER}<p>hello</p>"));
}

#[tokio::test]
async fn html_without_debug_has_no_banner() {
    let mut message = message_to(&["a@x.com"]);
    message
        .set_html(true)
        .set_message("<p>hello</p>")
        .set_alternative("hello");
    let session = send_one(TransportConfig::default(), &message).await;

    assert_eq!(session.body, "<p>hello</p>");
    assert_eq!(session.alternate_body, "hello");
}

#[tokio::test]
async fn plain_debug_mode_has_no_banner() {
    let config = TransportConfig::builder()
        .debug_to("debug@x.com")
        .build()
        .unwrap();
    let session = send_one(config, &message_to(&["a@x.com"])).await;

    assert!(session.body.is_empty());
    assert_eq!(session.alternate_body, "hello");
}

#[tokio::test]
async fn transmit_failure_becomes_delivery_error() {
    let (transport, _sink) = transport(
        TransportConfig::default(),
        Behavior {
            fail_transmit: true,
            ..Behavior::default()
        },
    );

    let err = transport
        .send(&message_to(&["a@x.com"]))
        .await
        .unwrap_err();

    assert!(
        err.to_string()
            .contains("SMTP Error: Could not connect to fake relay")
    );
    let Error::Delivery { source, .. } = err else {
        panic!("expected a delivery error");
    };
    assert!(matches!(
        source.downcast_ref::<FakeError>(),
        Some(FakeError::Unreachable)
    ));
}

#[tokio::test]
async fn rejected_address_stops_before_transmit() {
    let (transport, sink) = transport(
        TransportConfig::default(),
        Behavior {
            reject: Some("b@x.com"),
            ..Behavior::default()
        },
    );

    let err = transport
        .send(&message_to(&["a@x.com", "b@x.com"]))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Could not send the mail: Invalid address: b@x.com"
    );
    assert!(!err.is_transient());
    assert!(!sink.lock().unwrap()[0].transmitted);
}

#[tokio::test]
async fn message_is_not_mutated() {
    let mut message = message_to(&["a@x.com"]);
    message.set_html(true).add_attachment("a.txt", "a");
    let before = message.clone();

    let config = TransportConfig::builder()
        .debug_to("debug@x.com")
        .default_from("noreply@x.com")
        .build()
        .unwrap();
    send_one(config, &message).await;

    assert_eq!(message, before);
}

#[tokio::test]
async fn every_send_gets_a_fresh_mailer() {
    let (transport, sink) = transport(TransportConfig::default(), Behavior::default());

    transport.send(&message_to(&["a@x.com"])).await.unwrap();
    transport.send(&message_to(&["b@x.com"])).await.unwrap();

    let sessions = sink.lock().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].emails("to"), vec!["a@x.com"]);
    assert_eq!(sessions[1].emails("to"), vec!["b@x.com"]);
}
