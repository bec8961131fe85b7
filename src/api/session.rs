//! Session lifecycle. Sessions share the sandbox filesystem and only carry
//! execution context (cwd, env); the reserved `default` session always
//! exists conceptually and cannot be deleted.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::envelope::{self, ok, ApiError};
use super::identity::{self, Params, Payload, SessionQuery};
use super::AppState;
use crate::runtime::{SessionSpec, DEFAULT_SESSION};

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionBody {
    #[serde(alias = "sessionId", alias = "session_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    pub cwd: Option<String>,
}

/// POST /session
///
/// Create-or-get: asking for an ID that already exists acknowledges it
/// with `created: false` instead of failing.
pub(crate) async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Payload<CreateSessionBody>>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let body = body.map(|Payload(b)| b).unwrap_or_default();

    let id = body
        .id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("session-{}", Uuid::new_v4()));

    state.require_sandbox(&sandbox).await?;

    if envelope::found(state.runtime.get_session(&sandbox, &id).await)?.is_some() {
        return Ok(ok(
            "session already exists",
            json!({ "sessionId": id, "created": false }),
        ));
    }

    let spec = SessionSpec {
        id: id.clone(),
        env: body.env,
        cwd: body.cwd,
    };
    let info = state.runtime.create_session(&sandbox, spec).await?;

    tracing::info!(sandbox_id = %sandbox, session_id = %info.id, "session created");
    Ok(ok(
        "session created",
        json!({ "sessionId": info.id, "created": true }),
    ))
}

/// GET /session
pub(crate) async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<SessionQuery>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let session = identity::resolve_session(None, query.session_id.as_deref())
        .ok_or_else(|| ApiError::bad_request("sessionId is required"))?;

    state.require_sandbox(&sandbox).await?;

    let info = envelope::found(state.runtime.get_session(&sandbox, &session).await)?
        .ok_or_else(|| ApiError::not_found(format!("Session not found: {session}")))?;

    Ok(ok(
        "session found",
        json!({ "sessionId": info.id, "cwd": info.cwd, "env": info.env }),
    ))
}

/// DELETE /session
///
/// Idempotent: deleting an absent session reports `existed: false`. The
/// reserved `default` session is refused outright.
pub(crate) async fn delete_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<SessionQuery>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let session = identity::resolve_session(None, query.session_id.as_deref())
        .ok_or_else(|| ApiError::bad_request("sessionId is required"))?;

    if session == DEFAULT_SESSION {
        return Err(ApiError::bad_request("default session cannot be deleted"));
    }

    state.require_sandbox(&sandbox).await?;

    let existed =
        envelope::absence_as_existed(state.runtime.delete_session(&sandbox, &session).await)?;

    tracing::info!(sandbox_id = %sandbox, session_id = %session, existed, "session deleted");
    Ok(ok(
        "session deleted",
        json!({
            "sessionId": session,
            "deleted": true,
            "existed": existed,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnvBody {
    pub env_vars: Option<BTreeMap<String, String>>,
    #[serde(alias = "session_id")]
    pub session_id: Option<String>,
}

/// POST /session/env
///
/// Applies environment variables to a session, defaulting to `default`
/// and creating the session if it does not exist yet.
pub(crate) async fn set_session_env(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<SessionQuery>,
    Payload(body): Payload<SessionEnvBody>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let env_vars = body
        .env_vars
        .ok_or_else(|| ApiError::bad_request("envVars is required"))?;
    let session = identity::resolve_session(body.session_id.as_deref(), query.session_id.as_deref())
        .unwrap_or_else(|| DEFAULT_SESSION.to_string());

    state.require_sandbox(&sandbox).await?;

    let created = ensure_session(&state, &sandbox, &session).await?;
    state
        .runtime
        .set_session_env(&sandbox, &session, &env_vars)
        .await?;

    Ok(ok(
        "environment applied",
        json!({ "sessionId": session, "applied": true, "created": created }),
    ))
}

/// Create the session if the runtime does not know it yet. Returns whether
/// a create was needed.
pub(crate) async fn ensure_session(
    state: &AppState,
    sandbox: &str,
    session: &str,
) -> Result<bool, ApiError> {
    if envelope::found(state.runtime.get_session(sandbox, session).await)?.is_some() {
        return Ok(false);
    }
    let spec = SessionSpec {
        id: session.to_string(),
        ..Default::default()
    };
    state.runtime.create_session(sandbox, spec).await?;
    Ok(true)
}
