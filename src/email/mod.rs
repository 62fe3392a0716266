//! src/email/mod.rs
//!
//! Mail transports. Each one delivers a rendered alert to a single recipient;
//! fan-out over the subscriber list happens in the dispatcher.
use crate::domain::{AlertEmail, SubscriberEmail};
use async_trait::async_trait;

mod brevo;
pub use brevo::Brevo;

mod noop;
pub use noop::Noop;

mod smtp;
pub use smtp::Smtp;

#[derive(thiserror::Error, Debug)]
pub enum SendError {
    #[error("{0} is not a deliverable address.")]
    InvalidAddress(String),
    #[error("Failed to deliver email.")]
    Transport(#[source] anyhow::Error),
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(
        &self,
        recipient: &SubscriberEmail,
        email: &AlertEmail,
    ) -> Result<(), SendError>;
}
