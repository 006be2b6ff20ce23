//! Job queue storage.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use super::job::{DeadLetter, Job, JobId, JobStatus};
use super::task::TaskKind;

pub trait JobStore: Send + Sync {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError>;

    fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError>;

    /// Persist a job's new state. Fails for jobs no longer in the queue.
    fn update(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Start the oldest claimable job, optionally of one kind only.
    fn claim_next(&self, kind: Option<TaskKind>) -> Result<Option<Job>, JobStoreError>;

    /// Queued jobs in enqueue order.
    fn jobs(&self, kind: Option<TaskKind>) -> Result<Vec<Job>, JobStoreError>;

    /// Move a job out of the queue into the dead-letter list.
    fn dead_letter(&self, job: Job, reason: String) -> Result<(), JobStoreError>;

    fn dead_letters(&self) -> Result<Vec<DeadLetter>, JobStoreError>;

    /// Put a dead-lettered job back in the queue with a fresh attempt count.
    fn requeue(&self, job_id: JobId) -> Result<Job, JobStoreError>;

    fn stats(&self) -> Result<JobStats, JobStoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct JobStats {
    pub pending: usize,
    pub running: usize,
    pub retrying: usize,
    pub completed: usize,
    pub dead_lettered: usize,
}

#[derive(Debug, Default)]
struct Queue {
    jobs: Vec<Job>,
    dead: Vec<DeadLetter>,
}

impl Queue {
    fn position(&self, job_id: JobId) -> Option<usize> {
        self.jobs.iter().position(|j| j.id == job_id)
    }
}

/// Process-local job queue.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    queue: Mutex<Queue>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn queue(&self) -> Result<MutexGuard<'_, Queue>, JobStoreError> {
        self.queue
            .lock()
            .map_err(|_| JobStoreError::Storage("job queue lock poisoned".to_string()))
    }
}

impl JobStore for InMemoryJobStore {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        let mut queue = self.queue()?;
        if queue.position(job.id).is_some() || queue.dead.iter().any(|d| d.job.id == job.id) {
            return Err(JobStoreError::AlreadyExists(job.id));
        }
        let id = job.id;
        queue.jobs.push(job);
        Ok(id)
    }

    fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        let queue = self.queue()?;
        Ok(queue.position(job_id).map(|i| queue.jobs[i].clone()))
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        let mut queue = self.queue()?;
        let i = queue
            .position(job.id)
            .ok_or(JobStoreError::NotFound(job.id))?;
        queue.jobs[i] = job.clone();
        Ok(())
    }

    fn claim_next(&self, kind: Option<TaskKind>) -> Result<Option<Job>, JobStoreError> {
        let now = Utc::now();
        let mut queue = self.queue()?;
        let next = queue
            .jobs
            .iter_mut()
            .filter(|j| kind.is_none_or(|k| j.kind() == k))
            .find(|j| j.is_claimable(now));

        Ok(next.map(|job| {
            job.start(now);
            job.clone()
        }))
    }

    fn jobs(&self, kind: Option<TaskKind>) -> Result<Vec<Job>, JobStoreError> {
        let queue = self.queue()?;
        Ok(queue
            .jobs
            .iter()
            .filter(|j| kind.is_none_or(|k| j.kind() == k))
            .cloned()
            .collect())
    }

    fn dead_letter(&self, job: Job, reason: String) -> Result<(), JobStoreError> {
        let mut queue = self.queue()?;
        if let Some(i) = queue.position(job.id) {
            queue.jobs.remove(i);
        }
        queue.dead.push(DeadLetter {
            job,
            reason,
            dead_lettered_at: Utc::now(),
        });
        Ok(())
    }

    fn dead_letters(&self) -> Result<Vec<DeadLetter>, JobStoreError> {
        Ok(self.queue()?.dead.clone())
    }

    fn requeue(&self, job_id: JobId) -> Result<Job, JobStoreError> {
        let mut queue = self.queue()?;
        let i = queue
            .dead
            .iter()
            .position(|d| d.job.id == job_id)
            .ok_or(JobStoreError::NotFound(job_id))?;

        let mut job = queue.dead.remove(i).job;
        job.reset(Utc::now());
        queue.jobs.push(job.clone());
        Ok(job)
    }

    fn stats(&self) -> Result<JobStats, JobStoreError> {
        let queue = self.queue()?;
        let mut stats = JobStats {
            dead_lettered: queue.dead.len(),
            ..JobStats::default()
        };
        for job in &queue.jobs {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Retrying { .. } => stats.retrying += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::DeadLettered { .. } => stats.dead_lettered += 1,
            }
        }
        Ok(stats)
    }
}

impl<T: JobStore + ?Sized> JobStore for Arc<T> {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        (**self).enqueue(job)
    }

    fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        (**self).get(job_id)
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        (**self).update(job)
    }

    fn claim_next(&self, kind: Option<TaskKind>) -> Result<Option<Job>, JobStoreError> {
        (**self).claim_next(kind)
    }

    fn jobs(&self, kind: Option<TaskKind>) -> Result<Vec<Job>, JobStoreError> {
        (**self).jobs(kind)
    }

    fn dead_letter(&self, job: Job, reason: String) -> Result<(), JobStoreError> {
        (**self).dead_letter(job, reason)
    }

    fn dead_letters(&self) -> Result<Vec<DeadLetter>, JobStoreError> {
        (**self).dead_letters()
    }

    fn requeue(&self, job_id: JobId) -> Result<Job, JobStoreError> {
        (**self).requeue(job_id)
    }

    fn stats(&self) -> Result<JobStats, JobStoreError> {
        (**self).stats()
    }
}
