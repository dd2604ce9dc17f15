pub mod health;
pub mod jobs;
pub mod resumes;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jobscout_core::{QueueError, StoreError};

use crate::models::ErrorJson;

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorJson {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Map a storage failure onto an HTTP status.
pub fn store_error(e: &StoreError) -> Response {
    match e {
        StoreError::NotFound(_) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        StoreError::Superseded { .. } | StoreError::InvalidTransition { .. } => {
            error_response(StatusCode::CONFLICT, e.to_string())
        }
        StoreError::Database(_) => {
            tracing::error!(error = %e, "storage failure");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Storage error")
        }
    }
}

pub fn queue_error(e: &QueueError) -> Response {
    match e {
        QueueError::Store(store) => store_error(store),
        QueueError::Closed => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down")
        }
    }
}
