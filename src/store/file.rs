//! src/store/file.rs
use super::{StoreError, SubscriberStore, Subscription, Unsubscription};
use crate::domain::SubscriberEmail;
use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Subscribers kept as a pretty-printed JSON array on disk.
///
/// The whole list is held in memory and rewritten after every change. A change
/// only becomes visible once the rewrite succeeded; on failure the in-memory
/// list is left as it was.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    subscribers: Mutex<Vec<SubscriberEmail>>,
}

impl FileStore {
    /// Loads `path` if it exists, otherwise starts with an empty list.
    #[tracing::instrument(name = "Opening subscriber file")]
    pub async fn open(path: impl AsRef<Path> + std::fmt::Debug) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let subscribers = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Vec<SubscriberEmail>>(&bytes)
                .with_context(|| format!("Failed to parse subscribers from {}", path.display()))
                .map_err(StoreError::Unavailable)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(StoreError::Unavailable(anyhow::Error::new(e).context(
                    format!("Failed to read subscribers from {}", path.display()),
                )))
            }
        };

        let mut unique: Vec<SubscriberEmail> = Vec::with_capacity(subscribers.len());
        for subscriber in subscribers {
            if !unique.contains(&subscriber) {
                unique.push(subscriber);
            }
        }

        tracing::info!("Loaded {} subscribers from {}", unique.len(), path.display());

        Ok(Self {
            path,
            subscribers: Mutex::new(unique),
        })
    }

    async fn save(&self, subscribers: &[SubscriberEmail]) -> Result<(), StoreError> {
        write_atomically(&self.path, subscribers)
            .await
            .map_err(|e| {
                tracing::error!(error.cause_chain = ?e, "Failed to save subscribers");
                StoreError::Unavailable(e)
            })
    }
}

async fn write_atomically(path: &Path, subscribers: &[SubscriberEmail]) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(subscribers).context("Failed to serialize subscribers")?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}

#[async_trait]
impl SubscriberStore for FileStore {
    #[tracing::instrument(name = "Adding subscriber to file", skip(self))]
    async fn add(&self, email: &SubscriberEmail) -> Result<Subscription, StoreError> {
        let mut subscribers = self.subscribers.lock().await;
        if subscribers.contains(email) {
            return Ok(Subscription::AlreadySubscribed);
        }

        let mut updated = subscribers.clone();
        updated.push(email.clone());
        self.save(&updated).await?;
        *subscribers = updated;

        Ok(Subscription::Added)
    }

    #[tracing::instrument(name = "Removing subscriber from file", skip(self))]
    async fn remove(&self, email: &SubscriberEmail) -> Result<Unsubscription, StoreError> {
        let mut subscribers = self.subscribers.lock().await;
        let Some(index) = subscribers.iter().position(|s| s == email) else {
            return Ok(Unsubscription::NotFound);
        };

        let mut updated = subscribers.clone();
        updated.remove(index);
        self.save(&updated).await?;
        *subscribers = updated;

        Ok(Unsubscription::Removed)
    }

    async fn list(&self) -> Result<Vec<SubscriberEmail>, StoreError> {
        Ok(self.subscribers.lock().await.clone())
    }
}
