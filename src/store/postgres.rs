//! src/store/postgres.rs
use super::{StoreError, SubscriberStore, Subscription, Unsubscription};
use crate::domain::SubscriberEmail;
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::future::Future;
use std::time::Duration;

/// Subscribers kept in the `subscribers` table. The primary key on `email`
/// is what keeps concurrent subscribes of one address down to a single row.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    timeout: Duration,
}

impl PostgresStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bounded<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, query).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::error!("Failed to execute query: {:#?}", e);
                Err(StoreError::Unavailable(
                    anyhow::Error::new(e).context("Failed to execute query"),
                ))
            }
            Err(_) => {
                tracing::error!("Query did not complete within {:?}", self.timeout);
                Err(StoreError::Unavailable(anyhow::anyhow!(
                    "Query did not complete within {:?}",
                    self.timeout
                )))
            }
        }
    }
}

#[async_trait]
impl SubscriberStore for PostgresStore {
    #[tracing::instrument(name = "Saving new subscriber in the database", skip(self))]
    async fn add(&self, email: &SubscriberEmail) -> Result<Subscription, StoreError> {
        let query = sqlx::query(
            r#"
    INSERT INTO subscribers (email, subscribed_at)
    VALUES ($1, $2)
    ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(email.as_ref())
        .bind(Utc::now())
        .execute(&self.pool);

        let result = self.bounded(query).await?;

        if result.rows_affected() == 0 {
            Ok(Subscription::AlreadySubscribed)
        } else {
            Ok(Subscription::Added)
        }
    }

    #[tracing::instrument(name = "Deleting subscriber from the database", skip(self))]
    async fn remove(&self, email: &SubscriberEmail) -> Result<Unsubscription, StoreError> {
        let query = sqlx::query(
            r#"
    DELETE FROM subscribers
    WHERE email = $1
            "#,
        )
        .bind(email.as_ref())
        .execute(&self.pool);

        let result = self.bounded(query).await?;

        if result.rows_affected() == 0 {
            Ok(Unsubscription::NotFound)
        } else {
            Ok(Unsubscription::Removed)
        }
    }

    #[tracing::instrument(name = "Get subscribers from the database", skip(self))]
    async fn list(&self) -> Result<Vec<SubscriberEmail>, StoreError> {
        let query = sqlx::query_scalar::<_, String>(
            r#"
        SELECT email
        FROM subscribers
        ORDER BY subscribed_at, email
        "#,
        )
        .fetch_all(&self.pool);

        let rows = self.bounded(query).await?;

        Ok(parse_subscribers(rows))
    }
}

/// Rows written by other tools may hold blank addresses; those are skipped
/// rather than failing the whole listing.
fn parse_subscribers(rows: Vec<String>) -> Vec<SubscriberEmail> {
    let mut subscribers = Vec::with_capacity(rows.len());

    for row in rows {
        match SubscriberEmail::parse(row.clone())
            .with_context(|| format!("Invalid stored subscriber {:?}", row))
        {
            Ok(subscriber) => subscribers.push(subscriber),
            Err(e) => {
                tracing::warn!(
                    error.cause_chain = ?e,
                    "Skipping stored subscriber {:?} because {}", row, e);
            }
        }
    }

    subscribers
}
