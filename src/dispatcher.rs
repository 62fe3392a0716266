//! src/dispatcher.rs
//!
//! Broadcasts one alert to every current subscriber.
//!
//! Delivery is best-effort: a recipient whose send fails is recorded in the
//! report and the remaining recipients are still attempted. Sends run with at
//! most `max_concurrent_sends` in flight, and the report lists recipients in
//! the store's listing order whatever order the sends complete in.
use crate::domain::{AlertMessage, AlertTemplate, SubscriberEmail};
use crate::email::EmailSender;
use crate::store::{StoreError, SubscriberStore};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const DEADLINE_EXCEEDED: &str = "delivery deadline exceeded";

#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDelivery {
    pub recipient: SubscriberEmail,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: Vec<SubscriberEmail>,
    pub failed: Vec<FailedDelivery>,
}

impl DeliveryReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.sent.len() + self.failed.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertOutcome {
    NoSubscribers,
    Dispatched(DeliveryReport),
}

pub struct AlertDispatcher {
    store: Arc<dyn SubscriberStore>,
    sender: Arc<dyn EmailSender>,
    template: AlertTemplate,
    max_concurrent_sends: usize,
    deadline: Duration,
}

impl AlertDispatcher {
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        sender: Arc<dyn EmailSender>,
        template: AlertTemplate,
        max_concurrent_sends: usize,
        deadline: Duration,
    ) -> Self {
        Self {
            store,
            sender,
            template,
            max_concurrent_sends: max_concurrent_sends.max(1),
            deadline,
        }
    }

    #[tracing::instrument(
        name = "Sending alert to subscribers",
        skip(self, message),
        fields(subject = %message.subject(), sent = tracing::field::Empty, failed = tracing::field::Empty)
    )]
    pub async fn send_alert(&self, message: &AlertMessage) -> Result<AlertOutcome, DispatchError> {
        let subscribers = self.store.list().await.map_err(|e| {
            tracing::error!(error.cause_chain = ?e, "Failed to read subscribers");
            e
        })?;

        if subscribers.is_empty() {
            tracing::info!("No subscribers to send alerts to");
            return Ok(AlertOutcome::NoSubscribers);
        }

        let email = self.template.render(message);
        let deadline = Instant::now() + self.deadline;
        let sender = &self.sender;
        let email = &email;

        let results: Vec<(SubscriberEmail, Result<(), String>)> = stream::iter(subscribers)
            .map(|recipient| async move {
                // Recipients reached after the deadline are never handed to the sender.
                if Instant::now() >= deadline {
                    return (recipient, Err(DEADLINE_EXCEEDED.to_string()));
                }
                let result =
                    match tokio::time::timeout_at(deadline, sender.send_email(&recipient, email))
                        .await
                    {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => Err(error_chain(&e)),
                        Err(_) => Err(DEADLINE_EXCEEDED.to_string()),
                    };
                (recipient, result)
            })
            .buffered(self.max_concurrent_sends)
            .collect()
            .await;

        let mut report = DeliveryReport::default();
        for (recipient, result) in results {
            match result {
                Ok(()) => report.sent.push(recipient),
                Err(reason) => {
                    tracing::warn!(recipient = %recipient, reason = %reason, "Failed to deliver alert");
                    report.failed.push(FailedDelivery { recipient, reason });
                }
            }
        }

        let span = tracing::Span::current();
        span.record("sent", report.sent.len());
        span.record("failed", report.failed.len());

        if !report.is_complete() {
            tracing::error!(
                "Alert reached {} of {} subscribers",
                report.sent.len(),
                report.total()
            );
        }

        Ok(AlertOutcome::Dispatched(report))
    }
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut reason = e.to_string();
    let mut current = e.source();
    while let Some(cause) = current {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        current = cause.source();
    }
    reason
}
