//! src/routes/mod.rs
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{HttpRequest, HttpResponse};

mod alerts;
pub use alerts::*;

mod health_check;
pub use health_check::*;

mod subscriptions;
pub use subscriptions::*;

/// Body of every plain confirmation or error response.
#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Malformed or mistyped JSON bodies get the same `{"message": ...}` shape
/// as every other rejection.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(MessageBody::new(err.to_string()));
    InternalError::from_response(err, response).into()
}

fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
