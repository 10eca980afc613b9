use std::path::PathBuf;

use thiserror::Error;

/// Startup and fatal runtime failures. Every variant here maps to a nonzero
/// process exit code (`spec.md` §6) — everything else (decode, per-request DB,
/// transport, overflow) is handled inline by the worker that hit it and never
/// propagates as a `GatewayError`.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to read config file {0}: {1}")]
    ConfigRead(PathBuf, std::io::Error),
    #[error("failed to parse config file {0}: {1}")]
    ConfigParse(PathBuf, serde_json::Error),
    #[error("platform authentication failed: {0}")]
    AuthFailed(String),
    #[error("failed to bind listener on port {0}: {1}")]
    BindFailed(u16, std::io::Error),
    #[error("database connection failed: {0}")]
    DbConnect(#[from] postgres::Error),
    #[error("failed to spawn thread: {0}")]
    ThreadSpawn(std::io::Error),
}
