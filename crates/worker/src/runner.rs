use async_trait::async_trait;
use subjob_core::executor::JobStart;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Subjob {name} failed: {reason}")]
    Failed { name: String, reason: String },
}

/// Performs one subjob to completion.
///
/// `Ok` marks the job `completed`, `Err` marks it `failed`. Implementations
/// own how the subjob is located, built and launched.
#[async_trait]
pub trait SubjobRunner: Send + Sync {
    async fn run(&self, job: &JobStart) -> Result<(), RunnerError>;
}

/// Runner that reports every job as completed without doing any work.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateRunner;

#[async_trait]
impl SubjobRunner for ImmediateRunner {
    async fn run(&self, job: &JobStart) -> Result<(), RunnerError> {
        tracing::debug!(job_id = %job.job_id, subjob = %job.name(), "Completing subjob immediately");
        Ok(())
    }
}
