//! src/email/brevo/mod.rs
use super::{EmailSender, SendError};
use crate::domain::{AlertEmail, SubscriberEmail};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::Secret;
use std::time::Duration;

mod email;
use email::{Contact, EmailBuilder, EmailClient};

/// Delivers through the Brevo transactional email HTTP API.
#[derive(Debug)]
pub struct Brevo {
    sender_name: String,
    sender_email: String,
    email_client: EmailClient,
}

impl Brevo {
    pub fn new(
        api_url: String,
        api_key: Secret<String>,
        sender_name: String,
        sender_email: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;

        let email_client = EmailClient {
            http_client,
            url: api_url,
            api_key,
        };

        Ok(Self {
            sender_name,
            sender_email,
            email_client,
        })
    }

    fn email_builder(&self) -> EmailBuilder {
        EmailBuilder::new(Contact {
            name: Some(&self.sender_name),
            email: &self.sender_email,
        })
    }
}

#[async_trait]
impl EmailSender for Brevo {
    #[tracing::instrument(
        name = "Sending email through Brevo",
        skip(self, recipient, email),
        fields(recipient = %recipient)
    )]
    async fn send_email(
        &self,
        recipient: &SubscriberEmail,
        email: &AlertEmail,
    ) -> Result<(), SendError> {
        let payload = self
            .email_builder()
            .to(recipient.as_ref())
            .subject(&email.subject)
            .html_content(&email.html_content)
            .text_content(&email.text_content)
            .build();

        self.email_client
            .send_email(&payload)
            .await
            .with_context(|| format!("Brevo rejected the email to {}", recipient))
            .map_err(SendError::Transport)?;

        Ok(())
    }
}
