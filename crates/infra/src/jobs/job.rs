//! Queued jobs, their lifecycle and retry policy.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{Task, TaskKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    /// Failed and waiting for its backoff to elapse.
    Retrying { error: String, attempt: u32 },
    DeadLettered { error: String, attempts: u32 },
}

/// How often a failing job runs and how long it waits in between.
///
/// `max_attempts` counts every run, the first one included. The wait before
/// run `n + 1` is `base_delay * 2^(n - 1)`, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Run once and dead-letter on the first failure.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Wait after the `attempt`-th failed run (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub fn allows_another_attempt(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub task: Task,
    pub status: JobStatus,
    pub retry_policy: RetryPolicy,
    /// Runs started so far.
    pub attempt: u32,
    pub enqueued_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Earliest time the next run may start.
    pub not_before: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(task: Task) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            task,
            status: JobStatus::Pending,
            retry_policy: RetryPolicy::default(),
            attempt: 0,
            enqueued_at: now,
            updated_at: now,
            not_before: None,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn kind(&self) -> TaskKind {
        self.task.kind()
    }

    /// Waiting to run and past its backoff at `now`.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, JobStatus::Pending | JobStatus::Retrying { .. })
            && self.not_before.is_none_or(|at| at <= now)
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Running;
        self.attempt += 1;
        self.updated_at = now;
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Completed;
        self.not_before = None;
        self.updated_at = now;
    }

    /// Record a failed run, scheduling a retry while the policy allows one.
    pub fn fail(&mut self, error: String, now: DateTime<Utc>) {
        self.updated_at = now;
        if self.retry_policy.allows_another_attempt(self.attempt) {
            let delay = self.retry_policy.delay_for_attempt(self.attempt);
            self.not_before = Some(now + chrono::Duration::from_std(delay).unwrap_or_default());
            self.status = JobStatus::Retrying {
                error,
                attempt: self.attempt,
            };
        } else {
            self.not_before = None;
            self.status = JobStatus::DeadLettered {
                error,
                attempts: self.attempt,
            };
        }
    }

    pub fn is_dead_lettered(&self) -> bool {
        matches!(self.status, JobStatus::DeadLettered { .. })
    }

    /// Put the job back in the queue as if it had never run.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Pending;
        self.attempt = 0;
        self.not_before = None;
        self.updated_at = now;
    }
}

/// A job that exhausted its retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub job: Job,
    pub reason: String,
    pub dead_lettered_at: DateTime<Utc>,
}
