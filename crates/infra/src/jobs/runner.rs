//! Runs queued jobs through the handler registered for their task.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::job::Job;
use super::store::{JobStore, JobStoreError};
use super::task::{Task, TaskKind};

/// Handles one task. An `Err` fails the current attempt.
pub type TaskHandler = Box<dyn Fn(&Task) -> Result<(), String> + Send + Sync>;

/// What became of a job after one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Retrying,
    DeadLettered,
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub name: String,
    pub poll_interval: Duration,
    /// Only claim jobs of this task.
    pub kind: Option<TaskKind>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            name: "job-runner".to_string(),
            poll_interval: Duration::from_millis(100),
            kind: None,
        }
    }
}

impl RunnerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RunnerStats {
    pub completed: u64,
    pub retrying: u64,
    pub dead_lettered: u64,
}

impl RunnerStats {
    fn record(&mut self, outcome: RunOutcome) {
        match outcome {
            RunOutcome::Completed => self.completed += 1,
            RunOutcome::Retrying => self.retrying += 1,
            RunOutcome::DeadLettered => self.dead_lettered += 1,
        }
    }
}

fn lock(stats: &Mutex<RunnerStats>) -> MutexGuard<'_, RunnerStats> {
    stats.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a runner thread started with [`JobRunner::spawn`].
#[derive(Debug)]
pub struct RunnerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<RunnerStats>>,
}

impl RunnerHandle {
    /// Stop polling and wait for the job in flight to finish.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }

    pub fn stats(&self) -> RunnerStats {
        lock(&self.stats).clone()
    }
}

pub struct JobRunner<S: JobStore> {
    store: S,
    handlers: HashMap<TaskKind, TaskHandler>,
}

impl<S: JobStore + 'static> JobRunner<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            handlers: HashMap::new(),
        }
    }

    /// Route jobs of `kind` to `handler`, replacing any earlier handler.
    pub fn handle<F>(&mut self, kind: TaskKind, handler: F)
    where
        F: Fn(&Task) -> Result<(), String> + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
    }

    pub fn handles(&self, kind: TaskKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Run claimable jobs until none is left, returning how many ran.
    ///
    /// Jobs that fail wait for their backoff, so they are not run twice in
    /// one call unless the backoff is zero.
    pub fn run_pending(&self, kind: Option<TaskKind>) -> Result<usize, JobStoreError> {
        let mut ran = 0;
        while let Some(job) = self.store.claim_next(kind)? {
            self.run(job)?;
            ran += 1;
        }
        Ok(ran)
    }

    /// Move the runner onto its own thread, polling the store until shut down.
    pub fn spawn(self, config: RunnerConfig) -> io::Result<RunnerHandle>
    where
        S: Send,
    {
        let (shutdown, shutdown_rx) = mpsc::channel();
        let stats = Arc::new(Mutex::new(RunnerStats::default()));
        let thread_stats = Arc::clone(&stats);

        let join = thread::Builder::new()
            .name(config.name.clone())
            .spawn(move || self.poll(&config, &shutdown_rx, &thread_stats))?;

        Ok(RunnerHandle {
            shutdown,
            join: Some(join),
            stats,
        })
    }

    fn poll(
        &self,
        config: &RunnerConfig,
        shutdown: &mpsc::Receiver<()>,
        stats: &Mutex<RunnerStats>,
    ) {
        info!(runner = %config.name, "job runner started");

        while shutdown.try_recv().is_err() {
            let ran = self
                .store
                .claim_next(config.kind)
                .and_then(|job| job.map(|job| self.run(job)).transpose());

            match ran {
                Ok(Some(outcome)) => lock(stats).record(outcome),
                Ok(None) => thread::sleep(config.poll_interval),
                Err(e) => {
                    error!(runner = %config.name, error = %e, "job queue unavailable");
                    thread::sleep(config.poll_interval);
                }
            }
        }

        info!(runner = %config.name, "job runner stopped");
    }

    /// Run one claimed job and persist its outcome.
    fn run(&self, mut job: Job) -> Result<RunOutcome, JobStoreError> {
        let kind = job.kind();
        let result = match self.handlers.get(&kind) {
            Some(handler) => handler(&job.task),
            None => Err(format!("no handler for {kind}")),
        };
        let now = Utc::now();

        let Err(error) = result else {
            job.complete(now);
            self.store.update(&job)?;
            debug!(job_id = %job.id, task = %kind, attempt = job.attempt, "job completed");
            return Ok(RunOutcome::Completed);
        };

        job.fail(error.clone(), now);
        if job.is_dead_lettered() {
            warn!(
                job_id = %job.id,
                task = %kind,
                attempts = job.attempt,
                error = %error,
                "job dead-lettered"
            );
            self.store.dead_letter(job, error)?;
            return Ok(RunOutcome::DeadLettered);
        }

        debug!(
            job_id = %job.id,
            task = %kind,
            attempt = job.attempt,
            error = %error,
            "job will be retried"
        );
        self.store.update(&job)?;
        Ok(RunOutcome::Retrying)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::job::{JobStatus, RetryPolicy};
    use crate::jobs::store::InMemoryJobStore;
    use bookhub_core::OrderId;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn notification(policy: RetryPolicy) -> Job {
        Job::new(Task::NotificationSender {
            order_id: OrderId::new(),
        })
        .with_retry_policy(policy)
    }

    fn immediate(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn handler_receives_the_typed_task() {
        let store = InMemoryJobStore::arc();
        let job = notification(RetryPolicy::default());
        let expected = job.task.clone();
        let job_id = store.enqueue(job).unwrap();

        let seen = Arc::new(Mutex::new(None));
        let mut runner = JobRunner::new(store.clone());
        let sink = Arc::clone(&seen);
        runner.handle(TaskKind::NotificationSender, move |task| {
            *sink.lock().unwrap() = Some(task.clone());
            Ok(())
        });

        assert_eq!(runner.run_pending(None).unwrap(), 1);
        assert_eq!(*seen.lock().unwrap(), Some(expected));
        assert_eq!(store.get(job_id).unwrap().unwrap().status, JobStatus::Completed);
    }

    #[test]
    fn failing_job_retries_then_dead_letters() {
        let store = InMemoryJobStore::arc();
        let job_id = store.enqueue(notification(immediate(3))).unwrap();

        let calls = Arc::new(AtomicU32::new(0));
        let mut runner = JobRunner::new(store.clone());
        let counter = Arc::clone(&calls);
        runner.handle(TaskKind::NotificationSender, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("order not found".to_string())
        });

        assert_eq!(runner.run_pending(None).unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(store.get(job_id).unwrap().is_none());

        let dead = store.dead_letters().unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].reason, "order not found");
        assert_eq!(
            dead[0].job.status,
            JobStatus::DeadLettered {
                error: "order not found".to_string(),
                attempts: 3
            }
        );
    }

    #[test]
    fn retry_waits_for_backoff() {
        let store = InMemoryJobStore::arc();
        let job_id = store
            .enqueue(notification(RetryPolicy::default()))
            .unwrap();

        let mut runner = JobRunner::new(store.clone());
        runner.handle(TaskKind::NotificationSender, |_| {
            Err("unresolved recipient".to_string())
        });

        assert_eq!(runner.run_pending(None).unwrap(), 1);
        let job = store.get(job_id).unwrap().unwrap();
        assert!(matches!(job.status, JobStatus::Retrying { attempt: 1, .. }));
        assert!(job.not_before.is_some());
    }

    #[test]
    fn task_without_handler_fails() {
        let store = InMemoryJobStore::arc();
        store.enqueue(notification(RetryPolicy::no_retry())).unwrap();

        let runner = JobRunner::new(store.clone());
        assert!(!runner.handles(TaskKind::NotificationSender));
        assert_eq!(runner.run_pending(None).unwrap(), 1);

        let dead = store.dead_letters().unwrap();
        assert_eq!(dead[0].reason, "no handler for notification_sender");
    }

    #[test]
    fn run_pending_only_claims_the_requested_task() {
        let store = InMemoryJobStore::arc();
        store.enqueue(notification(RetryPolicy::default())).unwrap();

        let mut runner = JobRunner::new(store.clone());
        runner.handle(TaskKind::NotificationSender, |_| Ok(()));

        assert_eq!(runner.run_pending(Some(TaskKind::GenericEmailSender)).unwrap(), 0);
        assert_eq!(store.stats().unwrap().pending, 1);
        assert_eq!(runner.run_pending(Some(TaskKind::NotificationSender)).unwrap(), 1);
    }

    #[test]
    fn spawned_runner_processes_jobs_and_shuts_down() {
        let store = InMemoryJobStore::arc();
        let mut runner = JobRunner::new(store.clone());
        runner.handle(TaskKind::NotificationSender, |_| Ok(()));
        store.enqueue(notification(RetryPolicy::default())).unwrap();

        let handle = runner
            .spawn(
                RunnerConfig::default()
                    .with_name("notification-runner")
                    .with_kind(TaskKind::NotificationSender)
                    .with_poll_interval(Duration::from_millis(5)),
            )
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.stats().completed == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(handle.stats().completed, 1);
        handle.shutdown();
        assert_eq!(store.stats().unwrap().completed, 1);
    }
}
