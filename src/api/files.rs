//! File operations against the sandbox's single shared filesystem. The
//! optional session parameter selects execution context only; there is no
//! per-session file isolation.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};

use super::envelope::{self, ok, ApiError};
use super::identity::{self, Params, Payload, SessionQuery};
use super::AppState;

/// Query side of the GET/DELETE file endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    pub path: Option<String>,
    pub encoding: Option<String>,
    #[serde(rename = "sessionId", alias = "session_id")]
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteFileBody {
    pub path: Option<String>,
    pub content: Option<String>,
    #[serde(alias = "session_id")]
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileBody {
    pub path: Option<String>,
    pub encoding: Option<String>,
    #[serde(alias = "session_id")]
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathBody {
    pub path: Option<String>,
    #[serde(alias = "session_id")]
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MkdirBody {
    pub path: Option<String>,
    #[serde(default)]
    pub recursive: bool,
    #[serde(alias = "session_id")]
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameBody {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    #[serde(alias = "session_id")]
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveBody {
    pub source_path: Option<String>,
    pub dest_path: Option<String>,
    #[serde(alias = "session_id")]
    pub session_id: Option<String>,
}

/// POST /files/write
pub(crate) async fn write_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<SessionQuery>,
    Payload(body): Payload<WriteFileBody>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let path = identity::normalize_path(body.path.as_deref().unwrap_or(""), "path")?;
    let content = body
        .content
        .ok_or_else(|| ApiError::bad_request("content is required"))?;
    let session = identity::resolve_session(body.session_id.as_deref(), query.session_id.as_deref());

    state.require_sandbox(&sandbox).await?;

    state
        .runtime
        .write_file(&sandbox, &path, &content, session.as_deref())
        .await?;

    Ok(ok("file written", json!({ "path": path, "written": true })))
}

/// GET /files/read
pub(crate) async fn read_file_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<FileQuery>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let session = identity::resolve_session(None, query.session_id.as_deref());
    read_file_inner(&state, &sandbox, query.path, query.encoding, session).await
}

/// POST /files/read
pub(crate) async fn read_file_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<SessionQuery>,
    Payload(body): Payload<ReadFileBody>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let session = identity::resolve_session(body.session_id.as_deref(), query.session_id.as_deref());
    read_file_inner(&state, &sandbox, body.path, body.encoding, session).await
}

async fn read_file_inner(
    state: &AppState,
    sandbox: &str,
    path: Option<String>,
    encoding: Option<String>,
    session: Option<String>,
) -> Result<Json<Value>, ApiError> {
    let path = identity::normalize_path(path.as_deref().unwrap_or(""), "path")?;
    let base64_wanted = match encoding.as_deref() {
        None | Some("utf-8") | Some("utf8") => false,
        Some("base64") => true,
        Some(other) => {
            return Err(ApiError::bad_request(format!("invalid encoding: {other}")));
        }
    };

    state.require_sandbox(sandbox).await?;

    let content = state
        .runtime
        .read_file(sandbox, &path, session.as_deref())
        .await?;
    let content = if base64_wanted {
        BASE64.encode(content.as_bytes())
    } else {
        content
    };

    Ok(ok("file read", json!({ "path": path, "content": content })))
}

/// DELETE /files/delete
pub(crate) async fn delete_file_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<FileQuery>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let session = identity::resolve_session(None, query.session_id.as_deref());
    delete_file_inner(&state, &sandbox, query.path, session).await
}

/// POST /files/delete
pub(crate) async fn delete_file_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<SessionQuery>,
    Payload(body): Payload<PathBody>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let session = identity::resolve_session(body.session_id.as_deref(), query.session_id.as_deref());
    delete_file_inner(&state, &sandbox, body.path, session).await
}

async fn delete_file_inner(
    state: &AppState,
    sandbox: &str,
    path: Option<String>,
    session: Option<String>,
) -> Result<Json<Value>, ApiError> {
    let path = identity::normalize_path(path.as_deref().unwrap_or(""), "path")?;

    state.require_sandbox(sandbox).await?;

    let existed = envelope::absence_as_existed(
        state
            .runtime
            .delete_file(sandbox, &path, session.as_deref())
            .await,
    )?;

    Ok(ok(
        "file deleted",
        json!({ "path": path, "deleted": true, "existed": existed }),
    ))
}

/// POST /files/mkdir
pub(crate) async fn make_dir(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<SessionQuery>,
    Payload(body): Payload<MkdirBody>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let path = identity::normalize_path(body.path.as_deref().unwrap_or(""), "path")?;
    let session = identity::resolve_session(body.session_id.as_deref(), query.session_id.as_deref());

    state.require_sandbox(&sandbox).await?;

    state
        .runtime
        .make_dir(&sandbox, &path, body.recursive, session.as_deref())
        .await?;

    Ok(ok(
        "directory created",
        json!({ "path": path, "created": true }),
    ))
}

/// POST /files/rename
pub(crate) async fn rename_path(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<SessionQuery>,
    Payload(body): Payload<RenameBody>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let old_path = identity::normalize_path(body.old_path.as_deref().unwrap_or(""), "oldPath")?;
    let new_path = identity::normalize_path(body.new_path.as_deref().unwrap_or(""), "newPath")?;
    let session = identity::resolve_session(body.session_id.as_deref(), query.session_id.as_deref());

    state.require_sandbox(&sandbox).await?;

    state
        .runtime
        .rename_path(&sandbox, &old_path, &new_path, session.as_deref())
        .await?;

    Ok(ok(
        "file renamed",
        json!({ "oldPath": old_path, "newPath": new_path, "renamed": true }),
    ))
}

/// POST /files/move
pub(crate) async fn move_path(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<SessionQuery>,
    Payload(body): Payload<MoveBody>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let source_path =
        identity::normalize_path(body.source_path.as_deref().unwrap_or(""), "sourcePath")?;
    let dest_path = identity::normalize_path(body.dest_path.as_deref().unwrap_or(""), "destPath")?;
    let session = identity::resolve_session(body.session_id.as_deref(), query.session_id.as_deref());

    state.require_sandbox(&sandbox).await?;

    state
        .runtime
        .move_path(&sandbox, &source_path, &dest_path, session.as_deref())
        .await?;

    Ok(ok(
        "file moved",
        json!({ "sourcePath": source_path, "destPath": dest_path, "moved": true }),
    ))
}

/// GET /files/exists
pub(crate) async fn path_exists_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<FileQuery>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let session = identity::resolve_session(None, query.session_id.as_deref());
    path_exists_inner(&state, &sandbox, query.path, session).await
}

/// POST /files/exists
pub(crate) async fn path_exists_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(query): Params<SessionQuery>,
    Payload(body): Payload<PathBody>,
) -> Result<Json<Value>, ApiError> {
    let sandbox = identity::sandbox_id(&headers)?;
    let session = identity::resolve_session(body.session_id.as_deref(), query.session_id.as_deref());
    path_exists_inner(&state, &sandbox, body.path, session).await
}

async fn path_exists_inner(
    state: &AppState,
    sandbox: &str,
    path: Option<String>,
    session: Option<String>,
) -> Result<Json<Value>, ApiError> {
    let path = identity::normalize_path(path.as_deref().unwrap_or(""), "path")?;

    state.require_sandbox(sandbox).await?;

    let exists = state
        .runtime
        .path_exists(sandbox, &path, session.as_deref())
        .await?;

    Ok(ok("path checked", json!({ "path": path, "exists": exists })))
}
