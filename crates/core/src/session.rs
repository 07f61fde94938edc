//! Session state and the store that binds it to a caller's token.
//!
//! Every [`SessionState`] sits behind its own `tokio::sync::Mutex`, so
//! requests for one token are serialized while other tokens proceed
//! independently. Executor status updates go through the same lock via
//! [`SessionStore::update_job_status`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use crate::error::CoreError;
use crate::executor::JobStatusUpdate;
use crate::jobs::{JobStatus, JobTable};
use crate::provenance::{ProvenanceRecord, ProvenanceSeed};
use crate::types::{JobId, Timestamp};

/// One caller's provenance trail and job table.
#[derive(Debug, Clone)]
pub struct SessionState {
    provenance: ProvenanceRecord,
    jobs: JobTable,
}

impl SessionState {
    pub fn new(seed: &ProvenanceSeed, now: Timestamp) -> Self {
        Self {
            provenance: ProvenanceRecord::init(seed, now.timestamp_millis()),
            jobs: JobTable::new(),
        }
    }

    pub fn provenance(&self) -> &ProvenanceRecord {
        &self.provenance
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    /// Register a subjob: a `pending` job record plus one provenance
    /// subaction.
    ///
    /// The subaction is recorded first; it is the only fallible step, so a
    /// [`CoreError::MissingContext`] leaves the session untouched.
    pub fn submit_job(
        &mut self,
        module: &str,
        sub_method: &str,
        context: Option<&Value>,
    ) -> Result<JobId, CoreError> {
        self.provenance
            .record_subaction(module, sub_method, context)?;
        Ok(self.jobs.insert_pending(format!("{module}.{sub_method}")))
    }

    pub fn check_job(&self, job_id: &str) -> Result<JobStatus, CoreError> {
        self.jobs.check(job_id)
    }

    pub fn update_job_status(
        &mut self,
        job_id: &str,
        status: JobStatus,
    ) -> Result<JobStatus, CoreError> {
        self.jobs.update_status(job_id, status)
    }
}

/// Shared, lockable handle to one session.
pub type SessionHandle = Arc<Mutex<SessionState>>;

/// Storage for sessions keyed by an opaque token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Return the session for `token`, creating it on first contact.
    async fn get_or_init(&self, token: &str) -> SessionHandle;

    /// Return the session for `token` if it exists.
    async fn get(&self, token: &str) -> Option<SessionHandle>;

    /// Write back a session after mutation. In-memory backends share the
    /// handle itself and need nothing here.
    async fn persist(&self, _token: &str, _session: &SessionHandle) -> Result<(), CoreError> {
        Ok(())
    }

    async fn session_count(&self) -> usize;

    /// Drop sessions not touched since `cutoff`, returning how many went.
    async fn purge_idle(&self, cutoff: Timestamp) -> usize;

    /// Apply an executor status update under the session's lock.
    ///
    /// Returns the job's previous status.
    async fn update_job_status(&self, update: &JobStatusUpdate) -> Result<JobStatus, CoreError> {
        let session = self
            .get(&update.session_token)
            .await
            .ok_or_else(|| CoreError::SessionNotFound(update.session_token.clone()))?;

        let previous = {
            let mut state = session.lock().await;
            state.update_job_status(&update.job_id, update.status)?
        };
        self.persist(&update.session_token, &session).await?;
        Ok(previous)
    }
}

struct StoredSession {
    handle: SessionHandle,
    last_seen: Timestamp,
}

/// Process-local [`SessionStore`].
pub struct InMemorySessionStore {
    seed: ProvenanceSeed,
    sessions: RwLock<HashMap<String, StoredSession>>,
}

impl InMemorySessionStore {
    /// Create an empty store; new sessions take their provenance header
    /// from `seed`.
    pub fn new(seed: ProvenanceSeed) -> Self {
        Self {
            seed,
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_init(&self, token: &str) -> SessionHandle {
        let now = chrono::Utc::now();
        let mut sessions = self.sessions.write().await;
        let stored = sessions.entry(token.to_string()).or_insert_with(|| {
            tracing::debug!(session = %token, "Initializing session state");
            StoredSession {
                handle: Arc::new(Mutex::new(SessionState::new(&self.seed, now))),
                last_seen: now,
            }
        });
        stored.last_seen = now;
        Arc::clone(&stored.handle)
    }

    async fn get(&self, token: &str) -> Option<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(token)
            .map(|stored| Arc::clone(&stored.handle))
    }

    async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn purge_idle(&self, cutoff: Timestamp) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        // Sessions still referenced by an in-flight request are kept.
        sessions.retain(|_, stored| {
            stored.last_seen >= cutoff || Arc::strong_count(&stored.handle) > 1
        });
        before - sessions.len()
    }
}
