//! Job status tracker: the per-session table of submitted subjobs.
//!
//! The tracker only inserts `pending` records and answers lookups. Status
//! changes come from the executor through [`JobTable::update_status`], which
//! callers must invoke while holding the owning session's lock.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Allowed moves: `pending -> running | failed`,
    /// `running -> completed | failed`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    /// `"Module.method"` of the submitted call.
    pub name: String,
    pub created_at: Timestamp,
}

/// Mapping from job id to job record for one session.
#[derive(Debug, Clone, Default)]
pub struct JobTable {
    jobs: HashMap<JobId, JobRecord>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new `pending` job under a freshly generated id.
    pub fn insert_pending(&mut self, name: String) -> JobId {
        let id = uuid::Uuid::new_v4().to_string();
        self.jobs.insert(
            id.clone(),
            JobRecord {
                id: id.clone(),
                status: JobStatus::Pending,
                name,
                created_at: chrono::Utc::now(),
            },
        );
        id
    }

    /// Current status of `job_id`.
    pub fn check(&self, job_id: &str) -> Result<JobStatus, CoreError> {
        self.jobs
            .get(job_id)
            .map(|job| job.status)
            .ok_or_else(|| CoreError::JobNotFound {
                id: job_id.to_string(),
            })
    }

    /// Move `job_id` to `status`, returning the previous status.
    pub fn update_status(&mut self, job_id: &str, status: JobStatus) -> Result<JobStatus, CoreError> {
        let job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| CoreError::JobNotFound {
                id: job_id.to_string(),
            })?;

        let previous = job.status;
        if !previous.can_transition_to(status) {
            return Err(CoreError::InvalidTransition {
                id: job_id.to_string(),
                from: previous,
                to: status,
            });
        }
        job.status = status;

        if status.is_terminal() {
            let elapsed = chrono::Utc::now() - job.created_at;
            tracing::info!(
                job_id = %job.id,
                name = %job.name,
                status = %status,
                elapsed_ms = elapsed.num_milliseconds(),
                "Job reached a final status",
            );
        }
        Ok(previous)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
