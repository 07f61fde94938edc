use subjob_core::error::CoreError;
use subjob_core::executor::{JobQueue, JobStart};
use tokio::sync::mpsc;

/// Queue feeding a [`WorkerPool`](crate::WorkerPool) over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelJobQueue {
    tx: mpsc::UnboundedSender<JobStart>,
}

impl ChannelJobQueue {
    /// Create a queue and the receiver the pool drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<JobStart>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl JobQueue for ChannelJobQueue {
    fn enqueue(&self, start: JobStart) -> Result<(), CoreError> {
        self.tx.send(start).map_err(|e| {
            CoreError::Internal(format!(
                "Worker pool is not accepting jobs (job {})",
                e.0.job_id
            ))
        })
    }
}

/// Queue used when no executor is configured.
///
/// Accepts every job and drops it, so submitted jobs stay `pending`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedJobQueue;

impl JobQueue for DetachedJobQueue {
    fn enqueue(&self, start: JobStart) -> Result<(), CoreError> {
        tracing::debug!(
            job_id = %start.job_id,
            subjob = %start.name(),
            "No executor configured, job stays pending",
        );
        Ok(())
    }
}
