use std::sync::Arc;

use subjob_core::executor::JobQueue;
use subjob_core::session::SessionStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Per-caller provenance and job tables.
    pub sessions: Arc<dyn SessionStore>,
    /// Outbound side of the subjob executor.
    pub job_queue: Arc<dyn JobQueue>,
}
