//! Background job queue for order notifications and outbound email.
//!
//! Each [`Job`] carries a typed [`Task`]. A [`JobRunner`] routes jobs to the
//! handler registered for their [`TaskKind`]. Failed runs are retried with
//! exponential backoff until the job's [`RetryPolicy`] is exhausted, after
//! which the job is moved to the dead-letter list.

pub mod job;
pub mod runner;
pub mod store;
pub mod task;

pub use job::{DeadLetter, Job, JobId, JobStatus, RetryPolicy};
pub use runner::{JobRunner, RunOutcome, RunnerConfig, RunnerHandle, RunnerStats, TaskHandler};
pub use store::{InMemoryJobStore, JobStats, JobStore, JobStoreError};
pub use task::{Task, TaskKind};
