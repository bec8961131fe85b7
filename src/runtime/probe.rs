//! Existence probing.
//!
//! A sandbox ID always resolves to a runtime handle whether or not backing
//! state exists, and some backends materialize state on first touch. The
//! probe runs a no-op command through the normal exec channel and reads the
//! failure, so callers can refuse to operate on sandboxes that were never
//! created instead of fabricating them.

use super::classify::{classify, ErrorKind};
use super::{ExecSpec, SandboxRuntime};

/// Side-effect-free command used to test reachability.
pub const PROBE_COMMAND: &str = "true";

/// Whether the sandbox has live backing state.
///
/// Ambiguous failures count as existing: the sandbox may be present but
/// erroring, and the real operation will surface the real error. Only a
/// failure that classifies as NotFound is treated as absence.
pub async fn probe(runtime: &dyn SandboxRuntime, sandbox: &str) -> bool {
    match runtime.exec(sandbox, ExecSpec::new(PROBE_COMMAND)).await {
        Ok(_) => true,
        Err(err) => match classify(&err) {
            ErrorKind::NotFound => false,
            _ => {
                tracing::warn!(
                    sandbox_id = %sandbox,
                    error = %err,
                    "ambiguous probe failure, treating sandbox as existing"
                );
                true
            }
        },
    }
}
