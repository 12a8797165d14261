use std::any::Any;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::ops::analysis::AnalysisError;
use crate::ops::coalesce::CoalesceError;
use crate::ops::reports::ReportError;

/// Hint attached to unexpected failures.
pub const SERVER_LOG_HINT: &str = "Check server logs/terminal for full stack trace";

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    /// Failure with a known cause, e.g. unparseable model output.
    Internal(String),
    /// Anything else; the body carries a hint to check the logs.
    Unexpected(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Internal(msg) => {
                error!("{}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
            AppError::Unexpected(msg) => {
                error!("Unexpected error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": msg, "details": SERVER_LOG_HINT }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Turns a handler panic into the unexpected-error response.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    AppError::Unexpected(detail).into_response()
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<CoalesceError> for AppError {
    fn from(e: CoalesceError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<AnalysisError> for AppError {
    fn from(e: AnalysisError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<ReportError> for AppError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::MissingData | ReportError::InvalidPayload(_) => {
                AppError::BadRequest(e.to_string())
            }
            ReportError::Io(_) => AppError::Internal(e.to_string()),
        }
    }
}
