//! Background worker pool.
//!
//! Drains [`JobStart`] messages, runs each through a [`SubjobRunner`] with at
//! most `concurrency` jobs in flight, and reports `running` then `completed`
//! or `failed` through [`SessionStore::update_job_status`], which serializes
//! against requests for the same session.

use std::sync::Arc;

use subjob_core::executor::{JobStart, JobStatusUpdate};
use subjob_core::jobs::JobStatus;
use subjob_core::session::SessionStore;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::runner::SubjobRunner;

/// Default number of subjobs allowed to run at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

pub struct WorkerPool {
    store: Arc<dyn SessionStore>,
    runner: Arc<dyn SubjobRunner>,
    slots: Arc<Semaphore>,
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(
        store: Arc<dyn SessionStore>,
        runner: Arc<dyn SubjobRunner>,
        concurrency: usize,
    ) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            store,
            runner,
            slots: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    /// Run until `cancel` fires or every queue handle is dropped, then wait
    /// for in-flight jobs to finish.
    pub async fn run(self, mut jobs: mpsc::UnboundedReceiver<JobStart>, cancel: CancellationToken) {
        let tracker = TaskTracker::new();
        tracing::info!(concurrency = self.concurrency, "Worker pool started");

        loop {
            let job = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Worker pool shutting down");
                    break;
                }
                job = jobs.recv() => match job {
                    Some(job) => job,
                    None => {
                        tracing::info!("Job queue closed, worker pool stopping");
                        break;
                    }
                },
            };

            let permit = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::warn!(job_id = %job.job_id, "Shutdown before subjob could start");
                    break;
                }
                permit = Arc::clone(&self.slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let store = Arc::clone(&self.store);
            let runner = Arc::clone(&self.runner);
            tracker.spawn(async move {
                execute(store.as_ref(), runner.as_ref(), job).await;
                drop(permit);
            });
        }

        tracker.close();
        tracker.wait().await;
        tracing::info!("Worker pool stopped");
    }
}

/// Run one subjob and report its status transitions.
async fn execute(store: &dyn SessionStore, runner: &dyn SubjobRunner, job: JobStart) {
    if !report(store, &job, JobStatus::Running).await {
        return;
    }
    tracing::info!(job_id = %job.job_id, subjob = %job.name(), "Subjob running");

    let outcome = match runner.run(&job).await {
        Ok(()) => JobStatus::Completed,
        Err(e) => {
            tracing::error!(job_id = %job.job_id, error = %e, "Subjob failed");
            JobStatus::Failed
        }
    };

    if report(store, &job, outcome).await {
        tracing::info!(job_id = %job.job_id, status = %outcome, "Subjob finished");
    }
}

async fn report(store: &dyn SessionStore, job: &JobStart, status: JobStatus) -> bool {
    let update = JobStatusUpdate {
        session_token: job.session_token.clone(),
        job_id: job.job_id.clone(),
        status,
    };
    match store.update_job_status(&update).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(
                job_id = %job.job_id,
                status = %status,
                error = %e,
                "Failed to record subjob status",
            );
            false
        }
    }
}
