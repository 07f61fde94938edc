use std::str::FromStr;

use subjob_core::provenance::{ProvenanceSeed, DEFAULT_DESCRIPTION};
use subjob_worker::pool::DEFAULT_CONCURRENCY;

/// Which subjob executor the server wires behind the job queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorKind {
    /// No executor: submitted jobs stay `pending`.
    None,
    /// Built-in runner that completes every job immediately.
    Immediate,
}

impl FromStr for ExecutorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(ExecutorKind::None),
            "immediate" => Ok(ExecutorKind::Immediate),
            other => Err(format!(
                "Unknown executor '{other}' (expected 'none' or 'immediate')"
            )),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for running next to a local job
/// runner. Override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `4176`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Expose error class and detail on 500 responses.
    pub debug: bool,
    /// Idle sessions older than this are purged; `0` keeps them forever.
    pub session_idle_ttl_secs: u64,
    pub executor: ExecutorKind,
    /// Maximum number of concurrently running subjobs.
    pub worker_concurrency: usize,
    /// Header values for every new session's provenance record.
    pub provenance: ProvenanceSeed,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default    |
    /// |-------------------------------|------------|
    /// | `HOST`                        | `0.0.0.0`  |
    /// | `PORT`                        | `4176`     |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`       |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `30`       |
    /// | `DEBUG`                       | `false`    |
    /// | `SESSION_IDLE_TTL_SECS`       | `86400`    |
    /// | `SUBJOB_EXECUTOR`             | `none`     |
    /// | `WORKER_CONCURRENCY`          | `4`        |
    /// | `PROVENANCE_*`                | see [`provenance_from_env`] |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "4176".into())
            .parse()
            .expect("PORT must be a valid u16");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let debug = std::env::var("DEBUG").map(|v| parse_flag(&v)).unwrap_or(false);

        let session_idle_ttl_secs: u64 = std::env::var("SESSION_IDLE_TTL_SECS")
            .unwrap_or_else(|_| "86400".into())
            .parse()
            .expect("SESSION_IDLE_TTL_SECS must be a valid u64");

        let executor: ExecutorKind = std::env::var("SUBJOB_EXECUTOR")
            .unwrap_or_default()
            .parse()
            .unwrap_or_else(|e| panic!("Invalid SUBJOB_EXECUTOR: {e}"));

        let worker_concurrency: usize = std::env::var("WORKER_CONCURRENCY")
            .map(|v| v.parse().expect("WORKER_CONCURRENCY must be a valid usize"))
            .unwrap_or(DEFAULT_CONCURRENCY);

        Self {
            host,
            port,
            request_timeout_secs,
            shutdown_timeout_secs,
            debug,
            session_idle_ttl_secs,
            executor,
            worker_concurrency,
            provenance: provenance_from_env(),
        }
    }
}

/// Read the provenance seed supplied by the hosting environment.
///
/// | Env Var                        | Default                   |
/// |--------------------------------|---------------------------|
/// | `PROVENANCE_SERVICE`           | empty                     |
/// | `PROVENANCE_METHOD`            | empty                     |
/// | `PROVENANCE_SERVICE_VER`       | empty                     |
/// | `PROVENANCE_DESCRIPTION`       | [`DEFAULT_DESCRIPTION`]   |
/// | `PROVENANCE_METHOD_PARAMS`     | `[]` (any JSON document)  |
/// | `PROVENANCE_INPUT_WS_OBJECTS`  | empty, comma-separated    |
pub fn provenance_from_env() -> ProvenanceSeed {
    let method_params = std::env::var("PROVENANCE_METHOD_PARAMS")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            serde_json::from_str(&v)
                .unwrap_or_else(|e| panic!("PROVENANCE_METHOD_PARAMS must be valid JSON: {e}"))
        })
        .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));

    ProvenanceSeed {
        description: std::env::var("PROVENANCE_DESCRIPTION")
            .unwrap_or_else(|_| DEFAULT_DESCRIPTION.into()),
        service: std::env::var("PROVENANCE_SERVICE").unwrap_or_default(),
        method: std::env::var("PROVENANCE_METHOD").unwrap_or_default(),
        service_ver: std::env::var("PROVENANCE_SERVICE_VER").unwrap_or_default(),
        method_params,
        input_ws_objects: split_list(
            &std::env::var("PROVENANCE_INPUT_WS_OBJECTS").unwrap_or_default(),
        ),
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
