//! src/store/memory.rs
use super::{StoreError, SubscriberStore, Subscription, Unsubscription};
use crate::domain::SubscriberEmail;
use async_trait::async_trait;
use std::sync::Mutex;

/// Process-local list, lost on restart. Listing order is insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    subscribers: Mutex<Vec<SubscriberEmail>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<SubscriberEmail>>, StoreError> {
        self.subscribers
            .lock()
            .map_err(|_| StoreError::Unavailable(anyhow::anyhow!("Subscriber list lock poisoned")))
    }
}

#[async_trait]
impl SubscriberStore for MemoryStore {
    #[tracing::instrument(name = "Adding subscriber to memory", skip(self))]
    async fn add(&self, email: &SubscriberEmail) -> Result<Subscription, StoreError> {
        let mut subscribers = self.lock()?;
        if subscribers.contains(email) {
            return Ok(Subscription::AlreadySubscribed);
        }
        subscribers.push(email.clone());
        Ok(Subscription::Added)
    }

    #[tracing::instrument(name = "Removing subscriber from memory", skip(self))]
    async fn remove(&self, email: &SubscriberEmail) -> Result<Unsubscription, StoreError> {
        let mut subscribers = self.lock()?;
        match subscribers.iter().position(|s| s == email) {
            Some(index) => {
                subscribers.remove(index);
                Ok(Unsubscription::Removed)
            }
            None => Ok(Unsubscription::NotFound),
        }
    }

    async fn list(&self) -> Result<Vec<SubscriberEmail>, StoreError> {
        Ok(self.lock()?.clone())
    }
}
