//! Command execution, sandbox-scoped and session-scoped.
//!
//! A command that runs and exits non-zero is a successful dispatch: HTTP
//! 200 with `success: false`. Only failures to run at all become errors.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::envelope::{ok, ApiError};
use super::identity::{self, Params, Payload, SessionQuery};
use super::AppState;
use crate::runtime::{ExecOutcome, ExecSpec};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecBody {
    pub command: Option<String>,
    pub cwd: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Per-call deadline in milliseconds, forwarded to the runtime.
    pub timeout: Option<u64>,
    #[serde(alias = "session_id")]
    pub session_id: Option<String>,
}

fn exec_result(outcome: &ExecOutcome) -> Value {
    json!({
        "output": outcome.stdout,
        "error": outcome.stderr,
        "exitCode": outcome.exit_code,
        "success": outcome.success(),
    })
}

fn spec_from_body(body: ExecBody, session: Option<String>) -> Result<ExecSpec, ApiError> {
    let command = body
        .command
        .as_deref()
        .map(str::trim)
        .unwrap_or("")
        .to_string();
    if command.is_empty() {
        return Err(ApiError::bad_request("command is required"));
    }
    Ok(ExecSpec {
        command,
        cwd: body.cwd,
        env: body.env,
        timeout_ms: body.timeout,
        session,
    })
}

/// POST /exec
pub(crate) async fn exec(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<SessionQuery>,
    Payload(body): Payload<ExecBody>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let session = identity::resolve_session(body.session_id.as_deref(), query.session_id.as_deref());
    let spec = spec_from_body(body, session)?;

    state.require_sandbox(&sandbox).await?;

    let outcome = state.runtime.exec(&sandbox, spec).await?;
    Ok(ok("command executed", exec_result(&outcome)))
}

/// POST /session/exec
pub(crate) async fn session_exec(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<SessionQuery>,
    Payload(body): Payload<ExecBody>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let session = identity::resolve_session(body.session_id.as_deref(), query.session_id.as_deref())
        .ok_or_else(|| ApiError::bad_request("sessionId is required"))?;
    let spec = spec_from_body(body, Some(session.clone()))?;

    state.require_sandbox(&sandbox).await?;

    let outcome = state.runtime.exec(&sandbox, spec).await?;
    Ok(ok(
        "command executed",
        json!({ "sessionId": session, "result": exec_result(&outcome) }),
    ))
}
