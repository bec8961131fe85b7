pub mod envelope;
pub mod exec;
pub mod files;
pub mod identity;
pub mod lifecycle;
pub mod middleware;
pub mod mounts;
pub mod routes;
pub mod session;


use std::sync::Arc;

use crate::config::Config;
use crate::runtime::{probe, SandboxRuntime};
use envelope::ApiError;

/// Shared state for all API handlers. The dispatcher itself is stateless:
/// no locks, no caches, nothing survives a request.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<dyn SandboxRuntime>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(runtime: Arc<dyn SandboxRuntime>, config: Arc<Config>) -> Self {
        Self { runtime, config }
    }

    /// Gate for every non-create operation: verify the sandbox has backing
    /// state before dispatching, so nothing materializes implicitly.
    pub(crate) async fn require_sandbox(&self, sandbox: &str) -> Result<(), ApiError> {
        if probe::probe(self.runtime.as_ref(), sandbox).await {
            Ok(())
        } else {
            Err(ApiError::sandbox_not_found(sandbox))
        }
    }
}
