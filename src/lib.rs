//! HTTP dispatch service for per-tenant sandboxed execution.
//!
//! The server exposes a flat sandbox API (lifecycle, exec, sessions, files,
//! bucket mounts) addressed by an `x-sandbox-id` header and forwards every
//! operation to a remote container runtime. The `client` module is the
//! matching typed facade for programs that talk to such a server.

pub mod api;
pub mod client;
pub mod config;
pub mod runtime;
