//! src/routes/subscriptions.rs
use super::{error_chain_fmt, MessageBody};
use crate::domain::SubscriberEmail;
use crate::store::{StoreError, SubscriberStore, Subscription, Unsubscription};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use uuid::Uuid;

#[derive(serde::Deserialize)]
pub struct SubscriberRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct SubscriberList {
    pub subscribers: Vec<SubscriberEmail>,
}

#[derive(thiserror::Error)]
pub enum SubscriptionError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Already subscribed.")]
    AlreadySubscribed,
    #[error("Email not found.")]
    NotFound,
    #[error(transparent)]
    StorageUnavailable(#[from] StoreError),
}

impl std::fmt::Debug for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscriptionError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionError::ValidationError(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::AlreadySubscribed => StatusCode::CONFLICT,
            SubscriptionError::NotFound => StatusCode::NOT_FOUND,
            SubscriptionError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(MessageBody::new(self.to_string()))
    }
}

fn parse_email(request: SubscriberRequest) -> Result<SubscriberEmail, SubscriptionError> {
    SubscriberEmail::parse(request.email)
        .map_err(|e| SubscriptionError::ValidationError(e.to_string()))
}

fn storage_failure(e: StoreError) -> SubscriptionError {
    tracing::error!(error.cause_chain = ?e, "Subscriber storage failed");
    SubscriptionError::StorageUnavailable(e)
}

#[tracing::instrument(
    name = "Adding a new subscriber",
    skip(payload, store),
    fields(
        request_id = %Uuid::new_v4(),
        subscriber_email = %payload.email,
    )
)]
pub async fn subscribe(
    payload: web::Json<SubscriberRequest>,
    store: web::Data<dyn SubscriberStore>,
) -> Result<HttpResponse, SubscriptionError> {
    let email = parse_email(payload.into_inner())?;

    match store.add(&email).await.map_err(storage_failure)? {
        Subscription::Added => {
            tracing::info!("New subscriber saved");
            Ok(HttpResponse::Ok().json(MessageBody::new("Successfully subscribed!")))
        }
        Subscription::AlreadySubscribed => Err(SubscriptionError::AlreadySubscribed),
    }
}

#[tracing::instrument(
    name = "Removing a subscriber",
    skip(payload, store),
    fields(
        request_id = %Uuid::new_v4(),
        subscriber_email = %payload.email,
    )
)]
pub async fn unsubscribe(
    payload: web::Json<SubscriberRequest>,
    store: web::Data<dyn SubscriberStore>,
) -> Result<HttpResponse, SubscriptionError> {
    let email = parse_email(payload.into_inner())?;

    match store.remove(&email).await.map_err(storage_failure)? {
        Unsubscription::Removed => {
            tracing::info!("Subscriber removed");
            Ok(HttpResponse::Ok().json(MessageBody::new("Successfully unsubscribed.")))
        }
        Unsubscription::NotFound => Err(SubscriptionError::NotFound),
    }
}

#[tracing::instrument(name = "Listing subscribers", skip(store))]
pub async fn list_subscribers(
    store: web::Data<dyn SubscriberStore>,
) -> Result<HttpResponse, SubscriptionError> {
    let subscribers = store.list().await.map_err(storage_failure)?;

    Ok(HttpResponse::Ok().json(SubscriberList { subscribers }))
}
