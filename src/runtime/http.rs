//! HTTP adapter for the remote sandbox runtime.
//!
//! The runtime supervisor owns the actual containers: process trees, the
//! shared per-sandbox filesystem, session contexts, s3fs mounts. This
//! adapter forwards calls and hands upstream failures back verbatim so the
//! classifier sees the original wording.
//!
//! API: POST /sandboxes, DELETE /sandboxes/{id}, POST /sandboxes/{id}/exec,
//! POST|GET|DELETE /sandboxes/{id}/sessions[/{session}], POST
//! /sandboxes/{id}/files/*, POST|DELETE /sandboxes/{id}/mounts

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::RuntimeError;
use super::{ExecOutcome, ExecSpec, MountSpec, SandboxRuntime, SessionInfo, SessionSpec};

// ── Request / Response types ────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProvisionRequest<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'a serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecRequest<'a> {
    command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cwd: Option<&'a str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    env: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecResponse {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    exit_code: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionCreateRequest<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    env: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cwd: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    id: String,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
struct SessionEnvRequest<'a> {
    env: &'a BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteFileRequest<'a> {
    path: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PathRequest<'a> {
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReadFileResponse {
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ExistsResponse {
    exists: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct MkdirRequest<'a> {
    path: &'a str,
    recursive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenamePathRequest<'a> {
    old_path: &'a str,
    new_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct MovePathRequest<'a> {
    source_path: &'a str,
    dest_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct MountRequest<'a> {
    bucket: &'a str,
    mount_path: &'a str,
    endpoint: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<&'a str>,
    read_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    credentials: Option<MountCredentialsWire<'a>>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    s3fs_options: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct MountCredentialsWire<'a> {
    access_key_id: &'a str,
    secret_access_key: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct UnmountRequest<'a> {
    mount_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a str>,
}

// ── Client ──────────────────────────────────────────────────────────

/// HTTP client for the sandbox runtime REST API.
#[derive(Debug, Clone)]
pub struct HttpRuntime {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRuntime {
    pub fn new(base_url: String, client: reqwest::Client) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    fn url(&self, rest: &str) -> String {
        format!("{}/sandboxes{}", self.base_url, rest)
    }
}

/// Turn a non-2xx response into an `Api` error carrying the body verbatim.
async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, RuntimeError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(RuntimeError::Api { status, body })
}

#[async_trait]
impl SandboxRuntime for HttpRuntime {
    async fn provision(
        &self,
        sandbox: &str,
        options: Option<&serde_json::Value>,
    ) -> Result<(), RuntimeError> {
        let url = self.url("");

        tracing::info!(sandbox_id = %sandbox, "provisioning sandbox via runtime");

        let resp = self
            .client
            .post(&url)
            .json(&ProvisionRequest {
                id: sandbox,
                options,
            })
            .send()
            .await
            .map_err(RuntimeError::from_reqwest)?;
        error_for_status(resp).await?;

        tracing::info!(sandbox_id = %sandbox, "sandbox provisioned");
        Ok(())
    }

    async fn destroy(&self, sandbox: &str) -> Result<(), RuntimeError> {
        let url = self.url(&format!("/{sandbox}"));

        tracing::info!(sandbox_id = %sandbox, "destroying sandbox via runtime");

        let resp = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(RuntimeError::from_reqwest)?;
        error_for_status(resp).await?;
        Ok(())
    }

    async fn exec(&self, sandbox: &str, spec: ExecSpec) -> Result<ExecOutcome, RuntimeError> {
        let url = self.url(&format!("/{sandbox}/exec"));

        let mut req = self.client.post(&url).json(&ExecRequest {
            command: &spec.command,
            cwd: spec.cwd.as_deref(),
            env: &spec.env,
            timeout_ms: spec.timeout_ms,
            session: spec.session.as_deref(),
        });
        if let Some(ms) = spec.timeout_ms {
            // The transport deadline must outlive the command budget the
            // runtime enforces, or we kill the request before the runtime
            // can report the result.
            req = req.timeout(Duration::from_millis(ms) + Duration::from_secs(10));
        }

        let resp = req.send().await.map_err(RuntimeError::from_reqwest)?;
        let resp = error_for_status(resp).await?;

        let out = resp
            .json::<ExecResponse>()
            .await
            .map_err(|e| RuntimeError::Decode(format!("failed to parse exec response: {e}")))?;

        Ok(ExecOutcome {
            stdout: out.stdout,
            stderr: out.stderr,
            exit_code: out.exit_code,
        })
    }

    async fn create_session(
        &self,
        sandbox: &str,
        spec: SessionSpec,
    ) -> Result<SessionInfo, RuntimeError> {
        let url = self.url(&format!("/{sandbox}/sessions"));

        let resp = self
            .client
            .post(&url)
            .json(&SessionCreateRequest {
                id: &spec.id,
                env: &spec.env,
                cwd: spec.cwd.as_deref(),
            })
            .send()
            .await
            .map_err(RuntimeError::from_reqwest)?;
        let resp = error_for_status(resp).await?;

        let session = resp
            .json::<SessionResponse>()
            .await
            .map_err(|e| RuntimeError::Decode(format!("failed to parse session response: {e}")))?;

        Ok(SessionInfo {
            id: session.id,
            cwd: session.cwd,
            env: session.env,
        })
    }

    async fn get_session(
        &self,
        sandbox: &str,
        session: &str,
    ) -> Result<SessionInfo, RuntimeError> {
        let url = self.url(&format!("/{sandbox}/sessions/{session}"));

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(RuntimeError::from_reqwest)?;
        let resp = error_for_status(resp).await?;

        let session = resp
            .json::<SessionResponse>()
            .await
            .map_err(|e| RuntimeError::Decode(format!("failed to parse session response: {e}")))?;

        Ok(SessionInfo {
            id: session.id,
            cwd: session.cwd,
            env: session.env,
        })
    }

    async fn delete_session(&self, sandbox: &str, session: &str) -> Result<(), RuntimeError> {
        let url = self.url(&format!("/{sandbox}/sessions/{session}"));

        let resp = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(RuntimeError::from_reqwest)?;
        error_for_status(resp).await?;
        Ok(())
    }

    async fn set_session_env(
        &self,
        sandbox: &str,
        session: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<(), RuntimeError> {
        let url = self.url(&format!("/{sandbox}/sessions/{session}/env"));

        let resp = self
            .client
            .post(&url)
            .json(&SessionEnvRequest { env })
            .send()
            .await
            .map_err(RuntimeError::from_reqwest)?;
        error_for_status(resp).await?;
        Ok(())
    }

    async fn write_file(
        &self,
        sandbox: &str,
        path: &str,
        content: &str,
        session: Option<&str>,
    ) -> Result<(), RuntimeError> {
        let url = self.url(&format!("/{sandbox}/files/write"));

        let resp = self
            .client
            .post(&url)
            .json(&WriteFileRequest {
                path,
                content,
                session,
            })
            .send()
            .await
            .map_err(RuntimeError::from_reqwest)?;
        error_for_status(resp).await?;
        Ok(())
    }

    async fn read_file(
        &self,
        sandbox: &str,
        path: &str,
        session: Option<&str>,
    ) -> Result<String, RuntimeError> {
        let url = self.url(&format!("/{sandbox}/files/read"));

        let resp = self
            .client
            .post(&url)
            .json(&PathRequest { path, session })
            .send()
            .await
            .map_err(RuntimeError::from_reqwest)?;
        let resp = error_for_status(resp).await?;

        let file = resp
            .json::<ReadFileResponse>()
            .await
            .map_err(|e| RuntimeError::Decode(format!("failed to parse read response: {e}")))?;
        Ok(file.content)
    }

    async fn delete_file(
        &self,
        sandbox: &str,
        path: &str,
        session: Option<&str>,
    ) -> Result<(), RuntimeError> {
        let url = self.url(&format!("/{sandbox}/files/delete"));

        let resp = self
            .client
            .post(&url)
            .json(&PathRequest { path, session })
            .send()
            .await
            .map_err(RuntimeError::from_reqwest)?;
        error_for_status(resp).await?;
        Ok(())
    }

    async fn make_dir(
        &self,
        sandbox: &str,
        path: &str,
        recursive: bool,
        session: Option<&str>,
    ) -> Result<(), RuntimeError> {
        let url = self.url(&format!("/{sandbox}/files/mkdir"));

        let resp = self
            .client
            .post(&url)
            .json(&MkdirRequest {
                path,
                recursive,
                session,
            })
            .send()
            .await
            .map_err(RuntimeError::from_reqwest)?;
        error_for_status(resp).await?;
        Ok(())
    }

    async fn rename_path(
        &self,
        sandbox: &str,
        old_path: &str,
        new_path: &str,
        session: Option<&str>,
    ) -> Result<(), RuntimeError> {
        let url = self.url(&format!("/{sandbox}/files/rename"));

        let resp = self
            .client
            .post(&url)
            .json(&RenamePathRequest {
                old_path,
                new_path,
                session,
            })
            .send()
            .await
            .map_err(RuntimeError::from_reqwest)?;
        error_for_status(resp).await?;
        Ok(())
    }

    async fn move_path(
        &self,
        sandbox: &str,
        source_path: &str,
        dest_path: &str,
        session: Option<&str>,
    ) -> Result<(), RuntimeError> {
        let url = self.url(&format!("/{sandbox}/files/move"));

        let resp = self
            .client
            .post(&url)
            .json(&MovePathRequest {
                source_path,
                dest_path,
                session,
            })
            .send()
            .await
            .map_err(RuntimeError::from_reqwest)?;
        error_for_status(resp).await?;
        Ok(())
    }

    async fn path_exists(
        &self,
        sandbox: &str,
        path: &str,
        session: Option<&str>,
    ) -> Result<bool, RuntimeError> {
        let url = self.url(&format!("/{sandbox}/files/exists"));

        let resp = self
            .client
            .post(&url)
            .json(&PathRequest { path, session })
            .send()
            .await
            .map_err(RuntimeError::from_reqwest)?;
        let resp = error_for_status(resp).await?;

        let out = resp
            .json::<ExistsResponse>()
            .await
            .map_err(|e| RuntimeError::Decode(format!("failed to parse exists response: {e}")))?;
        Ok(out.exists)
    }

    async fn mount_bucket(
        &self,
        sandbox: &str,
        spec: MountSpec,
        session: Option<&str>,
    ) -> Result<(), RuntimeError> {
        let url = self.url(&format!("/{sandbox}/mounts"));

        tracing::info!(
            sandbox_id = %sandbox,
            bucket = %spec.bucket,
            mount_path = %spec.mount_path,
            "mounting bucket via runtime"
        );

        let resp = self
            .client
            .post(&url)
            .json(&MountRequest {
                bucket: &spec.bucket,
                mount_path: &spec.mount_path,
                endpoint: &spec.endpoint,
                provider: spec.provider.as_deref(),
                read_only: spec.read_only,
                credentials: spec.credentials.as_ref().map(|c| MountCredentialsWire {
                    access_key_id: &c.access_key_id,
                    secret_access_key: &c.secret_access_key,
                }),
                s3fs_options: &spec.s3fs_options,
                session,
            })
            .send()
            .await
            .map_err(RuntimeError::from_reqwest)?;
        error_for_status(resp).await?;
        Ok(())
    }

    async fn unmount_bucket(
        &self,
        sandbox: &str,
        mount_path: &str,
        session: Option<&str>,
    ) -> Result<(), RuntimeError> {
        let url = self.url(&format!("/{sandbox}/mounts"));

        let resp = self
            .client
            .delete(&url)
            .json(&UnmountRequest {
                mount_path,
                session,
            })
            .send()
            .await
            .map_err(RuntimeError::from_reqwest)?;
        error_for_status(resp).await?;
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────
