//! src/routes/alerts.rs
use super::error_chain_fmt;
use crate::dispatcher::{AlertDispatcher, AlertOutcome, DeliveryReport, DispatchError};
use crate::domain::AlertMessage;
use crate::store::StoreError;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use uuid::Uuid;

/// Only `{subject, body}` is accepted; any other field, such as a bare
/// `title`, fails deserialization.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertRequest {
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: String,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct AlertSummary {
    pub message: String,
    pub sent: usize,
    pub failed: usize,
    pub failed_recipients: Vec<FailedRecipient>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct FailedRecipient {
    pub email: String,
    pub reason: String,
}

impl AlertSummary {
    fn new(message: String, report: &DeliveryReport) -> Self {
        Self {
            message,
            sent: report.sent.len(),
            failed: report.failed.len(),
            failed_recipients: report
                .failed
                .iter()
                .map(|f| FailedRecipient {
                    email: f.recipient.to_string(),
                    reason: f.reason.clone(),
                })
                .collect(),
        }
    }
}

#[derive(thiserror::Error)]
pub enum AlertError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Failed to send emails to {} of {} subscribers.", .0.failed.len(), .0.total())]
    DeliveryFailed(DeliveryReport),
    #[error(transparent)]
    StorageUnavailable(#[from] StoreError),
}

impl std::fmt::Debug for AlertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for AlertError {
    fn status_code(&self) -> StatusCode {
        match self {
            AlertError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AlertError::DeliveryFailed(_) => StatusCode::BAD_GATEWAY,
            AlertError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let summary = match self {
            AlertError::DeliveryFailed(report) => AlertSummary::new(self.to_string(), report),
            _ => AlertSummary::new(self.to_string(), &DeliveryReport::default()),
        };
        HttpResponse::build(self.status_code()).json(summary)
    }
}

impl From<DispatchError> for AlertError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::Storage(e) => AlertError::StorageUnavailable(e),
        }
    }
}

#[tracing::instrument(
    name = "Sending an alert",
    skip(payload, dispatcher),
    fields(request_id = %Uuid::new_v4())
)]
pub async fn send_alert(
    payload: web::Json<AlertRequest>,
    dispatcher: web::Data<AlertDispatcher>,
) -> Result<HttpResponse, AlertError> {
    let AlertRequest { subject, body } = payload.into_inner();
    let message =
        AlertMessage::parse(subject, body).map_err(|e| AlertError::ValidationError(e.to_string()))?;

    match dispatcher.send_alert(&message).await? {
        AlertOutcome::NoSubscribers => Ok(HttpResponse::Ok().json(AlertSummary::new(
            "No subscribers to send alerts.".to_string(),
            &DeliveryReport::default(),
        ))),
        AlertOutcome::Dispatched(report) if report.is_complete() => {
            let message = format!("Emails sent to {} subscribers!", report.sent.len());
            Ok(HttpResponse::Ok().json(AlertSummary::new(message, &report)))
        }
        AlertOutcome::Dispatched(report) => Err(AlertError::DeliveryFailed(report)),
    }
}
