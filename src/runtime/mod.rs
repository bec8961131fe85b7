pub mod classify;
pub mod error;
pub mod http;
pub mod probe;

use std::collections::BTreeMap;

use async_trait::async_trait;

pub use classify::{classify, classify_message, ErrorKind};
pub use error::RuntimeError;
pub use http::HttpRuntime;

// ── Identity ────────────────────────────────────────────────────────

pub type SandboxId = String;
pub type SessionId = String;

/// The reserved session every sandbox conceptually always has. It cannot
/// be deleted and is the target of session-less convenience operations.
pub const DEFAULT_SESSION: &str = "default";

// ── Exec ────────────────────────────────────────────────────────────

/// One command execution. `env` overlays the session environment for this
/// call only; `session` selects the execution context (cwd, env), never a
/// separate filesystem.
#[derive(Debug, Clone, Default)]
pub struct ExecSpec {
    pub command: String,
    pub cwd: Option<String>,
    pub env: BTreeMap<String, String>,
    pub timeout_ms: Option<u64>,
    pub session: Option<SessionId>,
}

impl ExecSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecOutcome {
    /// A completed command with a non-zero exit is still a successful
    /// dispatch; callers decide what the exit code means.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

// ── Sessions ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SessionSpec {
    pub id: SessionId,
    pub env: BTreeMap<String, String>,
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionInfo {
    pub id: SessionId,
    pub cwd: Option<String>,
    pub env: BTreeMap<String, String>,
}

// ── Mounts ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Debug, Clone, Default)]
pub struct MountSpec {
    pub bucket: String,
    pub mount_path: String,
    pub endpoint: String,
    pub provider: Option<String>,
    pub read_only: bool,
    pub credentials: Option<MountCredentials>,
    pub s3fs_options: Vec<String>,
}

// ── Runtime seam ────────────────────────────────────────────────────

/// Interface to the remote sandbox runtime.
///
/// The runtime is untrusted: any call may fail with unstructured text, and
/// an ID always resolves to a handle whether or not backing state exists.
/// Callers must not treat a handle as proof of existence, and must not
/// invoke anything but `provision` against an ID they have not verified
/// (see `probe`): some backends materialize state on first touch.
#[async_trait]
pub trait SandboxRuntime: Send + Sync {
    // ── Lifecycle ───────────────────────────────────────────────

    /// Explicitly materialize the sandbox. The only call allowed to create
    /// backing state; may block through a container cold start.
    async fn provision(
        &self,
        sandbox: &str,
        options: Option<&serde_json::Value>,
    ) -> Result<(), RuntimeError>;

    async fn destroy(&self, sandbox: &str) -> Result<(), RuntimeError>;

    // ── Exec ────────────────────────────────────────────────────

    /// Run a command to completion, capturing stdout/stderr. A non-zero
    /// exit code is an `ExecOutcome`, not an error.
    async fn exec(&self, sandbox: &str, spec: ExecSpec) -> Result<ExecOutcome, RuntimeError>;

    // ── Sessions ────────────────────────────────────────────────

    async fn create_session(
        &self,
        sandbox: &str,
        spec: SessionSpec,
    ) -> Result<SessionInfo, RuntimeError>;

    async fn get_session(&self, sandbox: &str, session: &str)
        -> Result<SessionInfo, RuntimeError>;

    async fn delete_session(&self, sandbox: &str, session: &str) -> Result<(), RuntimeError>;

    async fn set_session_env(
        &self,
        sandbox: &str,
        session: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<(), RuntimeError>;

    // ── Files ───────────────────────────────────────────────────
    // All sessions share one filesystem; `session` only selects the
    // resolution context for relative paths and the environment.

    async fn write_file(
        &self,
        sandbox: &str,
        path: &str,
        content: &str,
        session: Option<&str>,
    ) -> Result<(), RuntimeError>;

    async fn read_file(
        &self,
        sandbox: &str,
        path: &str,
        session: Option<&str>,
    ) -> Result<String, RuntimeError>;

    async fn delete_file(
        &self,
        sandbox: &str,
        path: &str,
        session: Option<&str>,
    ) -> Result<(), RuntimeError>;

    async fn make_dir(
        &self,
        sandbox: &str,
        path: &str,
        recursive: bool,
        session: Option<&str>,
    ) -> Result<(), RuntimeError>;

    async fn rename_path(
        &self,
        sandbox: &str,
        old_path: &str,
        new_path: &str,
        session: Option<&str>,
    ) -> Result<(), RuntimeError>;

    async fn move_path(
        &self,
        sandbox: &str,
        source_path: &str,
        dest_path: &str,
        session: Option<&str>,
    ) -> Result<(), RuntimeError>;

    async fn path_exists(
        &self,
        sandbox: &str,
        path: &str,
        session: Option<&str>,
    ) -> Result<bool, RuntimeError>;

    // ── Mounts ──────────────────────────────────────────────────

    async fn mount_bucket(
        &self,
        sandbox: &str,
        spec: MountSpec,
        session: Option<&str>,
    ) -> Result<(), RuntimeError>;

    async fn unmount_bucket(
        &self,
        sandbox: &str,
        mount_path: &str,
        session: Option<&str>,
    ) -> Result<(), RuntimeError>;
}
