//! Subjob executor side of the callback server.
//!
//! - [`queue`] -- [`JobQueue`](subjob_core::executor::JobQueue)
//!   implementations handed to the dispatcher.
//! - [`runner`] -- the [`SubjobRunner`] trait that actually performs a subjob.
//! - [`pool`] -- [`WorkerPool`], the long-lived task draining the queue and
//!   reporting status changes back into the session store.

pub mod pool;
pub mod queue;
pub mod runner;

pub use pool::WorkerPool;
pub use queue::{ChannelJobQueue, DetachedJobQueue};
pub use runner::{ImmediateRunner, RunnerError, SubjobRunner};
