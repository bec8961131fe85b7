//! Bucket mounts. Credentials resolve in a fixed order: explicit
//! per-request credentials ride inside the mount call; otherwise the
//! service's ambient storage credentials are pushed into the target
//! session's environment first, as their own side effect, and the mount
//! call itself carries none.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::envelope::{self, ok, ApiError};
use super::identity::{self, Params, Payload, SessionQuery};
use super::session::ensure_session;
use super::AppState;
use crate::runtime::{MountCredentials, MountSpec, DEFAULT_SESSION};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountBucketBody {
    pub bucket: Option<String>,
    pub mount_path: Option<String>,
    pub options: Option<MountOptionsBody>,
    #[serde(alias = "session_id")]
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountOptionsBody {
    pub endpoint: Option<String>,
    pub provider: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    pub credentials: Option<CredentialsBody>,
    #[serde(default)]
    pub s3fs_options: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsBody {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UnmountQuery {
    #[serde(rename = "mountPath", alias = "mount_path")]
    pub mount_path: Option<String>,
    #[serde(rename = "sessionId", alias = "session_id")]
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmountBody {
    pub mount_path: Option<String>,
    #[serde(alias = "session_id")]
    pub session_id: Option<String>,
}

/// POST /mount-bucket
pub(crate) async fn mount_bucket(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<SessionQuery>,
    Payload(body): Payload<MountBucketBody>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;

    let bucket = body
        .bucket
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("bucket is required"))?
        .to_string();
    let mount_path =
        identity::normalize_path(body.mount_path.as_deref().unwrap_or(""), "mountPath")?;
    let options = body
        .options
        .ok_or_else(|| ApiError::bad_request("options.endpoint is required"))?;
    let endpoint = options
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("options.endpoint is required"))?
        .to_string();

    let explicit = match options.credentials {
        None => None,
        Some(creds) => match (creds.access_key_id, creds.secret_access_key) {
            (Some(id), Some(secret)) => Some(MountCredentials {
                access_key_id: id,
                secret_access_key: secret,
            }),
            _ => {
                return Err(ApiError::bad_request(
                    "credentials require accessKeyId and secretAccessKey",
                ));
            }
        },
    };

    let session = identity::resolve_session(body.session_id.as_deref(), query.session_id.as_deref());

    state.require_sandbox(&sandbox).await?;

    let credentials = match explicit {
        Some(creds) => Some(creds),
        None => {
            if let Some((id, secret)) = state.config.storage_credentials() {
                // Ambient credentials travel as session environment, set
                // before the mount call ever happens.
                let target = session.as_deref().unwrap_or(DEFAULT_SESSION);
                ensure_session(&state, &sandbox, target).await?;
                let env = BTreeMap::from([
                    ("AWS_ACCESS_KEY_ID".to_string(), id.to_string()),
                    ("AWS_SECRET_ACCESS_KEY".to_string(), secret.to_string()),
                ]);
                state
                    .runtime
                    .set_session_env(&sandbox, target, &env)
                    .await?;
            }
            None
        }
    };

    let spec = MountSpec {
        bucket: bucket.clone(),
        mount_path: mount_path.clone(),
        endpoint,
        provider: options.provider,
        read_only: options.read_only,
        credentials,
        s3fs_options: options.s3fs_options,
    };

    state
        .runtime
        .mount_bucket(&sandbox, spec, session.as_deref())
        .await?;

    tracing::info!(
        sandbox_id = %sandbox,
        bucket = %bucket,
        mount_path = %mount_path,
        "bucket mounted"
    );
    Ok(ok(
        "bucket mounted",
        json!({ "bucket": bucket, "mountPath": mount_path, "mounted": true }),
    ))
}

/// DELETE /unmount-bucket
pub(crate) async fn unmount_bucket_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<UnmountQuery>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let session = identity::resolve_session(None, query.session_id.as_deref());
    unmount_inner(&state, &sandbox, query.mount_path, session).await
}

/// POST /unmount-bucket
pub(crate) async fn unmount_bucket_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<SessionQuery>,
    Payload(body): Payload<UnmountBody>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let session = identity::resolve_session(body.session_id.as_deref(), query.session_id.as_deref());
    unmount_inner(&state, &sandbox, body.mount_path, session).await
}

async fn unmount_inner(
    state: &AppState,
    sandbox: &str,
    mount_path: Option<String>,
    session: Option<String>,
) -> Result<Json<Value>, ApiError> {
    let mount_path = identity::normalize_path(mount_path.as_deref().unwrap_or(""), "mountPath")?;

    state.require_sandbox(sandbox).await?;

    let existed = envelope::absence_as_existed(
        state
            .runtime
            .unmount_bucket(sandbox, &mount_path, session.as_deref())
            .await,
    )?;

    tracing::info!(sandbox_id = %sandbox, mount_path = %mount_path, existed, "bucket unmounted");
    Ok(ok(
        "bucket unmounted",
        json!({ "mountPath": mount_path, "unmounted": true, "existed": existed }),
    ))
}
