//! Response envelope and the API failure type.
//!
//! Every response leaves the service in one of two shapes, with `code`
//! mirroring the HTTP status:
//!
//!   success: {"data": {...}, "code": 200, "message": "..."}
//!   failure: {"error": "...", "code": 4xx/5xx, "message": "..."}

use axum::response::{IntoResponse, Response};
use axum::Json;
use hyper::StatusCode;
use serde_json::{json, Value};

use crate::runtime::{classify, ErrorKind, RuntimeError};

/// Success envelope.
pub fn ok(message: &str, data: Value) -> Json<Value> {
    Json(json!({
        "data": data,
        "code": 200,
        "message": message,
    }))
}

/// The single failure type handlers return. Built either eagerly by
/// validation or from a classified runtime failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "Method Not Allowed".into(),
        }
    }

    pub fn sandbox_not_found(id: &str) -> Self {
        Self::not_found(format!("Sandbox not found: {id}"))
    }
}

impl From<RuntimeError> for ApiError {
    /// The classification seam: every runtime failure passes through here
    /// exactly once, keeping the upstream wording as the error message.
    fn from(err: RuntimeError) -> Self {
        let kind = classify(&err);
        let message = err.to_string();
        if kind == ErrorKind::Internal {
            tracing::error!(error = %message, "runtime failure");
        }
        Self {
            status: StatusCode::from_u16(kind.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.message,
            "code": self.status.as_u16(),
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

/// Destructive operations are idempotent at the response level: absence is
/// an `existed: false` result, not a failure. Any other failure surfaces.
pub fn absence_as_existed(result: Result<(), RuntimeError>) -> Result<bool, ApiError> {
    match result {
        Ok(()) => Ok(true),
        Err(err) if classify(&err) == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Lookup helper: absence is `None`, any other failure surfaces.
pub fn found<T>(result: Result<T, RuntimeError>) -> Result<Option<T>, ApiError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if classify(&err) == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}
