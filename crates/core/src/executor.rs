//! Message boundary between the dispatcher and the subjob executor.
//!
//! Submissions push a [`JobStart`] through a [`JobQueue`]; whatever runs the
//! subjob reports back with [`JobStatusUpdate`]s applied via
//! [`SessionStore::update_job_status`](crate::session::SessionStore::update_job_status).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::jobs::JobStatus;
use crate::types::{JobId, SessionToken};

/// Request to start one subjob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStart {
    pub session_token: SessionToken,
    pub job_id: JobId,
    pub module: String,
    pub sub_method: String,
    pub service_ver: String,
    pub params: Option<Value>,
    pub context: Option<Value>,
}

impl JobStart {
    /// `"Module.method"` of the subjob.
    pub fn name(&self) -> String {
        format!("{}.{}", self.module, self.sub_method)
    }
}

/// Status change reported by the executor for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusUpdate {
    pub session_token: SessionToken,
    pub job_id: JobId,
    pub status: JobStatus,
}

/// Outbound side of the executor boundary.
///
/// `enqueue` must not block; it either accepts the message or fails at once.
pub trait JobQueue: Send + Sync {
    fn enqueue(&self, start: JobStart) -> Result<(), CoreError>;
}
