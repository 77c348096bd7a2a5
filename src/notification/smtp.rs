//! SMTP mail transport backed by lettre's async client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::config::EmailSettings;

use super::{MailTransport, OutgoingMail, TransportError};

/// Port served with implicit TLS; every other port negotiates STARTTLS
pub const SMTPS_PORT: u16 = 465;

/// SMTP reply codes meaning the credentials were refused
const AUTH_FAILURE_CODES: &[&str] = &["530", "534", "535"];

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(settings: &EmailSettings) -> Result<Self> {
        let builder = if settings.port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)
        }
        .with_context(|| format!("Failed to configure SMTP relay {}", settings.server))?;

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.address.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(settings.timeout))
            .build();

        Ok(Self { transport })
    }

    fn build_message(mail: &OutgoingMail) -> Result<Message, TransportError> {
        let from: Mailbox = mail
            .from
            .parse()
            .map_err(|e| TransportError::Rejected(format!("invalid sender address: {e}")))?;
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| TransportError::Rejected(format!("invalid recipient address: {e}")))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|e| TransportError::Rejected(format!("failed to build message: {e}")))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError> {
        let message = Self::build_message(mail)?;
        let response = self.transport.send(message).await.map_err(classify_error)?;
        debug!(code = %response.code(), "SMTP server accepted message");
        Ok(())
    }
}

/// Map a lettre SMTP error onto the retry taxonomy
fn classify_error(error: lettre::transport::smtp::Error) -> TransportError {
    let code = error.status().map(|code| code.to_string());
    let message = error.to_string();

    if error.is_permanent() {
        if code
            .as_deref()
            .is_some_and(|code| AUTH_FAILURE_CODES.contains(&code))
        {
            TransportError::Auth(message)
        } else {
            TransportError::Rejected(message)
        }
    } else if error.is_timeout() {
        TransportError::Timeout(message)
    } else {
        TransportError::Connection(message)
    }
}
