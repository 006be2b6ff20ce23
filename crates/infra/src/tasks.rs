//! Job handlers for the order notification tasks.

use std::sync::Arc;

use tracing::{error, info};

use bookhub_core::OrderId;
use bookhub_notifications::{DispatchOutcome, OrderNotificationDispatcher};

use crate::jobs::{Job, JobRunner, JobStore, RetryPolicy, Task, TaskKind};

/// Build a `notification_sender` job for `order_id`.
pub fn notification_job(order_id: OrderId, retry_policy: RetryPolicy) -> Job {
    Job::new(Task::NotificationSender { order_id }).with_retry_policy(retry_policy)
}

/// Route `notification_sender` jobs to `dispatcher`.
///
/// Each job dispatches in its own transaction. Dispatch errors fail the job,
/// so the job's retry policy decides whether it is retried or dead-lettered.
pub fn register_notification_sender<S>(
    runner: &mut JobRunner<S>,
    dispatcher: Arc<OrderNotificationDispatcher>,
) where
    S: JobStore + 'static,
{
    runner.handle(TaskKind::NotificationSender, move |task| {
        let Task::NotificationSender { order_id } = task else {
            return Err(format!("notification_sender cannot run {}", task.kind()));
        };

        match dispatcher.dispatch_and_commit(*order_id) {
            Ok(DispatchOutcome::Dispatched {
                notifications,
                emails,
            }) => {
                info!(
                    order_id = %order_id,
                    notifications,
                    emails,
                    "notification_sender finished"
                );
                Ok(())
            }
            Ok(DispatchOutcome::Skipped { .. }) => Ok(()),
            Err(e) => {
                error!(order_id = %order_id, error = %e, "notification_sender failed");
                Err(e.to_string())
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::InMemoryJobStore;
    use crate::mail::JobMailSender;
    use crate::memory::{
        InMemoryNotificationStore, InMemoryOrderRepository, InMemoryUserDirectory,
    };

    #[test]
    fn notification_job_carries_order_id() {
        let order_id = OrderId::new();
        let job = notification_job(order_id, RetryPolicy::no_retry());

        assert_eq!(job.task, Task::NotificationSender { order_id });
        assert_eq!(job.kind(), TaskKind::NotificationSender);
        assert_eq!(job.retry_policy.max_attempts, 1);
    }

    #[test]
    fn missing_order_dead_letters_with_the_dispatch_error() {
        let store = InMemoryJobStore::arc();
        let dispatcher = OrderNotificationDispatcher::new(
            Arc::new(InMemoryOrderRepository::new()),
            Arc::new(InMemoryUserDirectory::new()),
            Arc::new(InMemoryNotificationStore::new()),
            Arc::new(JobMailSender::new(store.clone())),
        );
        let mut runner = JobRunner::new(store.clone());
        register_notification_sender(&mut runner, Arc::new(dispatcher));
        assert!(!runner.handles(TaskKind::GenericEmailSender));

        let order_id = OrderId::new();
        store
            .enqueue(notification_job(order_id, RetryPolicy::no_retry()))
            .unwrap();

        assert_eq!(runner.run_pending(None).unwrap(), 1);
        let dead = store.dead_letters().unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].reason, format!("order not found: {order_id}"));
        assert!(store.jobs(Some(TaskKind::GenericEmailSender)).unwrap().is_empty());
    }
}
