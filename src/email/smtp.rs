//! src/email/smtp.rs
use super::{EmailSender, SendError};
use crate::domain::{AlertEmail, SubscriberEmail};
use anyhow::Context;
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

/// Delivers through an SMTP relay with `lettre`.
pub struct Smtp {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl Smtp {
    /// STARTTLS relay with credentials, as offered by hosted mail accounts.
    pub fn relay(
        host: &str,
        port: u16,
        username: String,
        password: Secret<String>,
        sender: Mailbox,
        timeout: Duration,
    ) -> Result<Self, anyhow::Error> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .with_context(|| format!("Failed to configure SMTP relay {}", host))?
            .port(port)
            .credentials(Credentials::new(
                username,
                password.expose_secret().to_string(),
            ))
            .timeout(Some(timeout))
            .build();

        Ok(Self { transport, sender })
    }

    /// Plain connection without TLS or authentication, for local catch-all
    /// servers such as Mailpit.
    pub fn unencrypted(host: &str, port: u16, sender: Mailbox, timeout: Duration) -> Self {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .timeout(Some(timeout))
            .build();

        Self { transport, sender }
    }

    fn message(&self, recipient: &SubscriberEmail, email: &AlertEmail) -> Result<Message, SendError> {
        let to: Mailbox = recipient
            .as_ref()
            .parse()
            .map_err(|_| SendError::InvalidAddress(recipient.to_string()))?;

        Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_content.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_content.clone()),
                    ),
            )
            .context("Failed to build message")
            .map_err(SendError::Transport)
    }
}

#[async_trait]
impl EmailSender for Smtp {
    #[tracing::instrument(
        name = "Sending email over SMTP",
        skip(self, recipient, email),
        fields(recipient = %recipient)
    )]
    async fn send_email(
        &self,
        recipient: &SubscriberEmail,
        email: &AlertEmail,
    ) -> Result<(), SendError> {
        let message = self.message(recipient, email)?;

        self.transport
            .send(message)
            .await
            .with_context(|| format!("SMTP relay rejected the email to {}", recipient))
            .map_err(SendError::Transport)?;

        Ok(())
    }
}
