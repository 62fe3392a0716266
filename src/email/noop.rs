//! src/email/noop.rs
use super::{EmailSender, SendError};
use crate::domain::{AlertEmail, SubscriberEmail};
use async_trait::async_trait;

/// Logs instead of sending. Meant for local runs without mail credentials.
#[derive(Debug, Clone, Default)]
pub struct Noop;

#[async_trait]
impl EmailSender for Noop {
    async fn send_email(
        &self,
        recipient: &SubscriberEmail,
        email: &AlertEmail,
    ) -> Result<(), SendError> {
        tracing::info!(
            recipient = %recipient,
            subject = %email.subject,
            "Skipping email delivery"
        );
        Ok(())
    }
}
