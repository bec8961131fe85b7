//! Request identity and input resolution.
//!
//! The sandbox ID comes from exactly one place, the `x-sandbox-id` header.
//! Session IDs arrive in endpoint-specific locations (JSON body field,
//! query parameter, under two spellings) with fixed precedence: body before
//! query. Paths are normalized before anything touches the runtime.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, OptionalFromRequest, Query, Request};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::envelope::ApiError;
use crate::runtime::SandboxId;

pub const SANDBOX_ID_HEADER: &str = "x-sandbox-id";

/// Tenant identity. Missing or blank header is a validation failure on
/// every endpoint; the value itself is used verbatim.
pub fn sandbox_id(headers: &HeaderMap) -> Result<SandboxId, ApiError> {
    let value = headers
        .get(SANDBOX_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or("");
    if value.is_empty() {
        return Err(ApiError::bad_request("x-sandbox-id header is required"));
    }
    Ok(value.to_string())
}

/// Query-side session selector. Both spellings are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "sessionId", alias = "session_id")]
    pub session_id: Option<String>,
}

/// Body-before-query precedence. Blank values count as absent.
pub fn resolve_session(body: Option<&str>, query: Option<&str>) -> Option<String> {
    body.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .or_else(|| {
            query
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
}

/// Normalize a filesystem path: trim, require non-empty, force a leading
/// slash, collapse runs of slashes. Idempotent.
pub fn normalize_path(raw: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }

    let mut out = String::with_capacity(trimmed.len() + 1);
    out.push('/');
    let mut prev_slash = true;
    for c in trimmed.chars() {
        if c == '/' {
            if !prev_slash {
                out.push('/');
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }
    Ok(out)
}

// ── Enveloped extractors ────────────────────────────────────────────
// axum's stock Json/Query rejections answer with bare text; these wrap
// them so malformed input gets the same envelope as every other failure.

pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match <Json<T> as FromRequest<S>>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Payload(value)),
            Err(rejection) => Err(reject_json(rejection)),
        }
    }
}

impl<S, T> OptionalFromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        match <Json<T> as OptionalFromRequest<S>>::from_request(req, state).await {
            Ok(Some(Json(value))) => Ok(Some(Payload(value))),
            Ok(None) => Ok(None),
            Err(rejection) => Err(reject_json(rejection)),
        }
    }
}

fn reject_json(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request(format!("invalid request body: {}", rejection.body_text()))
}

pub struct Params<T>(pub T);

impl<S, T> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Params(value)),
            Err(rejection) => Err(reject_query(rejection)),
        }
    }
}

fn reject_query(rejection: QueryRejection) -> ApiError {
    ApiError::bad_request(format!("invalid query string: {}", rejection.body_text()))
}
