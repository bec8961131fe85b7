//! Rust client for the dispatch API.
//!
//! Three tiers: [`SandboxManager`] owns the HTTP plumbing, [`Sandbox`] binds a
//! sandbox id and injects the `x-sandbox-id` header, [`Session`] binds a
//! session id on top of that. Sandbox-level file and exec operations delegate
//! to the reserved `default` session, so a bare handle behaves like a plain
//! single-shell sandbox.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::identity::SANDBOX_ID_HEADER;
use crate::runtime::DEFAULT_SESSION;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response arrived but did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

// ── Typed results ───────────────────────────────────────────────────

/// Outcome of a command run inside a sandbox.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecResult {
    pub output: String,
    pub error: String,
    pub exit_code: i32,
    pub success: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxDestroyed {
    pub sandbox_id: String,
    pub destroyed: bool,
    pub existed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDeleted {
    pub session_id: String,
    pub deleted: bool,
    pub existed: bool,
    pub timestamp: String,
}

/// Options for mounting an S3-compatible bucket. `endpoint` is mandatory on
/// the server side; credentials may be omitted when the service carries
/// ambient storage credentials.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MountOptions {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<BucketCredentials>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub s3fs_options: Vec<String>,
}

impl MountOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            provider: None,
            read_only: None,
            credentials: None,
            s3fs_options: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

// ── Envelope plumbing ───────────────────────────────────────────────

/// Pull a human-readable message out of an error envelope, falling back to
/// the raw body when it is not JSON.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Extract the `data` payload from a success envelope. Responses without the
/// envelope wrapper pass through unchanged.
fn unwrap_data(mut envelope: Value) -> Value {
    match envelope.get_mut("data") {
        Some(data) => data.take(),
        None => envelope,
    }
}

/// Exec responses nest the outcome under `result` on session routes and put
/// it at the top level on `/exec`. Accept both.
fn parse_exec_result(mut data: Value) -> Result<ExecResult, ClientError> {
    let inner = match data.get_mut("result") {
        Some(result) => result.take(),
        None => data,
    };
    serde_json::from_value(inner)
        .map_err(|e| ClientError::Decode(format!("invalid exec result: {e}")))
}

fn parse_typed<T: serde::de::DeserializeOwned>(data: Value, what: &str) -> Result<T, ClientError> {
    serde_json::from_value(data).map_err(|e| ClientError::Decode(format!("invalid {what}: {e}")))
}

fn string_field(data: &Value, field: &str) -> Result<String, ClientError> {
    data.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ClientError::Decode(format!("response missing `{field}`")))
}

fn bool_field(data: &Value, field: &str) -> bool {
    data.get(field).and_then(Value::as_bool).unwrap_or(false)
}

// ── Transport ───────────────────────────────────────────────────────

#[derive(Debug)]
struct Transport {
    base_url: String,
    client: reqwest::Client,
}

impl Transport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        sandbox_id: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .client
            .request(method, &url)
            .header(SANDBOX_ID_HEADER, sandbox_id);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = &body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ClientError::Transport(format!("reading response from {url} failed: {e}")))?;

        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let envelope: Value = serde_json::from_str(&text)
            .map_err(|e| ClientError::Decode(format!("invalid response body: {e}")))?;
        Ok(unwrap_data(envelope))
    }
}

// ── Manager ─────────────────────────────────────────────────────────

/// Entry point: creates and destroys sandboxes and hands out [`Sandbox`]
/// handles. Cheap to clone; all handles share one reqwest client.
#[derive(Debug, Clone)]
pub struct SandboxManager {
    transport: Arc<Transport>,
}

impl SandboxManager {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Build against a caller-supplied reqwest client (timeouts, proxies).
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            transport: Arc::new(Transport { base_url, client }),
        }
    }

    /// Read the base URL from `SANDBOX_BASE_URL`, defaulting to the local
    /// dispatch port.
    pub fn from_env() -> Self {
        let base_url = std::env::var("SANDBOX_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8787".to_string());
        Self::new(base_url)
    }

    /// Bind a handle to a sandbox id without touching the server.
    pub fn sandbox(&self, sandbox_id: impl Into<String>) -> Sandbox {
        Sandbox {
            sandbox_id: sandbox_id.into(),
            transport: Arc::clone(&self.transport),
        }
    }

    /// Create the sandbox if it does not exist yet and return a handle to it.
    /// `options` is forwarded opaquely to the runtime.
    pub async fn create(
        &self,
        sandbox_id: &str,
        options: Option<Value>,
    ) -> Result<Sandbox, ClientError> {
        let data = self
            .transport
            .request(
                Method::POST,
                "/lifecycle",
                sandbox_id,
                &[],
                Some(json!({ "options": options })),
            )
            .await?;

        tracing::info!(
            sandbox_id = %sandbox_id,
            created = bool_field(&data, "created"),
            "sandbox ready"
        );
        Ok(self.sandbox(sandbox_id))
    }

    /// Destroy a sandbox. Destroying one that never existed is not an error;
    /// the result says whether it was there.
    pub async fn destroy(&self, sandbox_id: &str) -> Result<SandboxDestroyed, ClientError> {
        let data = self
            .transport
            .request(Method::DELETE, "/lifecycle", sandbox_id, &[], None)
            .await?;

        let destroyed = parse_typed::<SandboxDestroyed>(data, "destroy response")?;
        tracing::info!(
            sandbox_id = %sandbox_id,
            existed = destroyed.existed,
            "sandbox destroyed"
        );
        Ok(destroyed)
    }
}

// ── Sandbox handle ──────────────────────────────────────────────────

/// View over a single sandbox. File and exec operations run in the `default`
/// session; use [`Sandbox::create_session`] for isolated cwd/env contexts.
#[derive(Debug, Clone)]
pub struct Sandbox {
    sandbox_id: String,
    transport: Arc<Transport>,
}

impl Sandbox {
    pub fn id(&self) -> &str {
        &self.sandbox_id
    }

    /// Bind a session handle without touching the server. The session must
    /// already exist (or be `default`) for operations through it to succeed.
    pub fn session(&self, session_id: impl Into<String>) -> Session {
        Session {
            sandbox_id: self.sandbox_id.clone(),
            session_id: session_id.into(),
            transport: Arc::clone(&self.transport),
        }
    }

    fn default_session(&self) -> Session {
        self.session(DEFAULT_SESSION)
    }

    /// Create a session (or pick up the existing one with the same id) and
    /// return a handle bound to it. Omitting `session_id` lets the server
    /// generate one.
    pub async fn create_session(
        &self,
        session_id: Option<&str>,
        env: Option<&BTreeMap<String, String>>,
        cwd: Option<&str>,
    ) -> Result<Session, ClientError> {
        let mut body = json!({});
        if let Some(id) = session_id {
            body["id"] = json!(id);
        }
        if let Some(env) = env {
            body["env"] = json!(env);
        }
        if let Some(cwd) = cwd {
            body["cwd"] = json!(cwd);
        }

        let data = self
            .transport
            .request(Method::POST, "/session", &self.sandbox_id, &[], Some(body))
            .await?;

        let created_id = string_field(&data, "sessionId")
            .ok()
            .or_else(|| session_id.map(str::to_string))
            .ok_or_else(|| ClientError::Decode("response missing `sessionId`".to_string()))?;
        Ok(self.session(created_id))
    }

    /// Delete a session. The `default` session cannot be deleted; destroy the
    /// sandbox instead.
    pub async fn delete_session(&self, session_id: &str) -> Result<SessionDeleted, ClientError> {
        let data = self
            .transport
            .request(
                Method::DELETE,
                "/session",
                &self.sandbox_id,
                &[("sessionId", session_id)],
                None,
            )
            .await?;
        parse_typed(data, "session delete response")
    }

    /// Set environment variables on the `default` session. Call before other
    /// operations so the variables are visible to them.
    pub async fn set_env(&self, env: &BTreeMap<String, String>) -> Result<(), ClientError> {
        self.default_session().set_env(env).await
    }

    pub async fn exec(&self, command: &str) -> Result<ExecResult, ClientError> {
        self.default_session().exec(command).await
    }

    pub async fn write_file(&self, path: &str, content: &str) -> Result<(), ClientError> {
        self.default_session().write_file(path, content).await
    }

    pub async fn read_file(&self, path: &str) -> Result<String, ClientError> {
        self.default_session().read_file(path).await
    }

    /// Read a file as raw bytes (transported base64-encoded).
    pub async fn download(&self, path: &str) -> Result<Vec<u8>, ClientError> {
        self.default_session().download(path).await
    }

    pub async fn delete_file(&self, path: &str) -> Result<bool, ClientError> {
        self.default_session().delete_file(path).await
    }

    pub async fn make_dir(&self, path: &str, recursive: bool) -> Result<(), ClientError> {
        self.default_session().make_dir(path, recursive).await
    }

    pub async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), ClientError> {
        self.default_session().rename(old_path, new_path).await
    }

    pub async fn move_to(&self, source_path: &str, dest_path: &str) -> Result<(), ClientError> {
        self.default_session().move_to(source_path, dest_path).await
    }

    pub async fn exists(&self, path: &str) -> Result<bool, ClientError> {
        self.default_session().exists(path).await
    }

    pub async fn mount_bucket(
        &self,
        bucket: &str,
        mount_path: &str,
        options: &MountOptions,
    ) -> Result<(), ClientError> {
        self.default_session()
            .mount_bucket(bucket, mount_path, options)
            .await
    }

    pub async fn unmount_bucket(&self, mount_path: &str) -> Result<bool, ClientError> {
        self.default_session().unmount_bucket(mount_path).await
    }
}

// ── Session handle ──────────────────────────────────────────────────

/// Execution context bound to one session. Sessions isolate cwd/env/processes;
/// the filesystem is shared across all sessions of a sandbox. The session id
/// rides in the JSON body on POST and in the query string on GET/DELETE.
#[derive(Debug, Clone)]
pub struct Session {
    sandbox_id: String,
    session_id: String,
    transport: Arc<Transport>,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.session_id
    }

    pub async fn exec(&self, command: &str) -> Result<ExecResult, ClientError> {
        let body = json!({ "command": command, "sessionId": self.session_id });
        let data = self
            .transport
            .request(Method::POST, "/session/exec", &self.sandbox_id, &[], Some(body))
            .await?;
        parse_exec_result(data)
    }

    pub async fn set_env(&self, env: &BTreeMap<String, String>) -> Result<(), ClientError> {
        let body = json!({ "envVars": env, "sessionId": self.session_id });
        self.transport
            .request(Method::POST, "/session/env", &self.sandbox_id, &[], Some(body))
            .await?;
        Ok(())
    }

    pub async fn write_file(&self, path: &str, content: &str) -> Result<(), ClientError> {
        let body = json!({
            "path": path,
            "content": content,
            "sessionId": self.session_id,
        });
        self.transport
            .request(Method::POST, "/files/write", &self.sandbox_id, &[], Some(body))
            .await?;
        Ok(())
    }

    pub async fn read_file(&self, path: &str) -> Result<String, ClientError> {
        let data = self
            .transport
            .request(
                Method::GET,
                "/files/read",
                &self.sandbox_id,
                &[("path", path), ("sessionId", &self.session_id)],
                None,
            )
            .await?;
        string_field(&data, "content")
    }

    /// Read a file as raw bytes. The server encodes the content base64 on the
    /// wire; this decodes it back.
    pub async fn download(&self, path: &str) -> Result<Vec<u8>, ClientError> {
        let data = self
            .transport
            .request(
                Method::GET,
                "/files/read",
                &self.sandbox_id,
                &[
                    ("path", path),
                    ("encoding", "base64"),
                    ("sessionId", &self.session_id),
                ],
                None,
            )
            .await?;
        let content = string_field(&data, "content")?;
        BASE64
            .decode(content.as_bytes())
            .map_err(|e| ClientError::Decode(format!("invalid base64 content: {e}")))
    }

    /// Delete a file. Returns whether it existed.
    pub async fn delete_file(&self, path: &str) -> Result<bool, ClientError> {
        let data = self
            .transport
            .request(
                Method::DELETE,
                "/files/delete",
                &self.sandbox_id,
                &[("path", path), ("sessionId", &self.session_id)],
                None,
            )
            .await?;
        Ok(bool_field(&data, "existed"))
    }

    pub async fn make_dir(&self, path: &str, recursive: bool) -> Result<(), ClientError> {
        let body = json!({
            "path": path,
            "recursive": recursive,
            "sessionId": self.session_id,
        });
        self.transport
            .request(Method::POST, "/files/mkdir", &self.sandbox_id, &[], Some(body))
            .await?;
        Ok(())
    }

    pub async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), ClientError> {
        let body = json!({
            "oldPath": old_path,
            "newPath": new_path,
            "sessionId": self.session_id,
        });
        self.transport
            .request(Method::POST, "/files/rename", &self.sandbox_id, &[], Some(body))
            .await?;
        Ok(())
    }

    pub async fn move_to(&self, source_path: &str, dest_path: &str) -> Result<(), ClientError> {
        let body = json!({
            "sourcePath": source_path,
            "destPath": dest_path,
            "sessionId": self.session_id,
        });
        self.transport
            .request(Method::POST, "/files/move", &self.sandbox_id, &[], Some(body))
            .await?;
        Ok(())
    }

    pub async fn exists(&self, path: &str) -> Result<bool, ClientError> {
        let data = self
            .transport
            .request(
                Method::GET,
                "/files/exists",
                &self.sandbox_id,
                &[("path", path), ("sessionId", &self.session_id)],
                None,
            )
            .await?;
        Ok(bool_field(&data, "exists"))
    }

    pub async fn mount_bucket(
        &self,
        bucket: &str,
        mount_path: &str,
        options: &MountOptions,
    ) -> Result<(), ClientError> {
        let options = serde_json::to_value(options)
            .map_err(|e| ClientError::Decode(format!("invalid mount options: {e}")))?;
        let body = json!({
            "bucket": bucket,
            "mountPath": mount_path,
            "options": options,
            "sessionId": self.session_id,
        });
        self.transport
            .request(Method::POST, "/mount-bucket", &self.sandbox_id, &[], Some(body))
            .await?;
        Ok(())
    }

    /// Unmount a bucket. Returns whether a mount was there.
    pub async fn unmount_bucket(&self, mount_path: &str) -> Result<bool, ClientError> {
        let data = self
            .transport
            .request(
                Method::DELETE,
                "/unmount-bucket",
                &self.sandbox_id,
                &[("mountPath", mount_path), ("sessionId", &self.session_id)],
                None,
            )
            .await?;
        Ok(bool_field(&data, "existed"))
    }
}

// ── Tests ───────────────────────────────────────────────────────────
