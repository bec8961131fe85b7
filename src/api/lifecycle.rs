//! Sandbox lifecycle: the only endpoint allowed to materialize state, and
//! the idempotent teardown.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::envelope::{self, ok, ApiError};
use super::identity::{self, Payload};
use super::AppState;
use crate::runtime::probe;

#[derive(Debug, Default, Deserialize)]
pub struct CreateSandboxBody {
    /// Opaque runtime options, forwarded as-is.
    pub options: Option<Value>,
}

/// POST /lifecycle
///
/// Create-or-get. A sandbox that already probes as alive is acknowledged
/// with `created: false`; otherwise the runtime provisions it and a probe
/// confirms the container actually came up.
pub(crate) async fn create_sandbox(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Payload<CreateSandboxBody>>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let options = body.and_then(|Payload(b)| b.options);

    if probe::probe(state.runtime.as_ref(), &sandbox).await {
        return Ok(ok(
            "sandbox already running",
            json!({ "sandboxId": sandbox, "created": false }),
        ));
    }

    state.runtime.provision(&sandbox, options.as_ref()).await?;

    if !probe::probe(state.runtime.as_ref(), &sandbox).await {
        return Err(ApiError::internal(format!(
            "sandbox failed to start: {sandbox}"
        )));
    }

    tracing::info!(sandbox_id = %sandbox, "sandbox created");
    Ok(ok(
        "sandbox created",
        json!({ "sandboxId": sandbox, "created": true }),
    ))
}

/// DELETE /lifecycle
///
/// Always reports `destroyed: true`; `existed` carries the prior state.
/// A sandbox that never existed is not touched at all, so a destroy can
/// never materialize one.
pub(crate) async fn destroy_sandbox(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;

    let existed = probe::probe(state.runtime.as_ref(), &sandbox).await;
    if existed {
        // The sandbox can vanish between probe and destroy; that absence
        // is absorbed, anything else surfaces.
        envelope::absence_as_existed(state.runtime.destroy(&sandbox).await)?;
    }

    tracing::info!(sandbox_id = %sandbox, existed, "sandbox destroyed");
    Ok(ok(
        "sandbox destroyed",
        json!({ "sandboxId": sandbox, "destroyed": true, "existed": existed }),
    ))
}
