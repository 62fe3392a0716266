//! src/store/mod.rs
//!
//! The subscriber list and the backends that persist it. Every backend keeps
//! at most one entry per address and makes each change durable before
//! reporting it.
use crate::domain::SubscriberEmail;
use async_trait::async_trait;

mod file;
pub use file::FileStore;

mod memory;
pub use memory::MemoryStore;

mod postgres;
pub use postgres::PostgresStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Subscriber storage is unavailable.")]
    Unavailable(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Added,
    AlreadySubscribed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsubscription {
    Removed,
    NotFound,
}

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn add(&self, email: &SubscriberEmail) -> Result<Subscription, StoreError>;

    async fn remove(&self, email: &SubscriberEmail) -> Result<Unsubscription, StoreError>;

    /// Every current subscriber, in the backend's listing order.
    async fn list(&self) -> Result<Vec<SubscriberEmail>, StoreError>;
}
