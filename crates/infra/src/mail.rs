//! Mail sender that queues each email as a `generic_email_sender` job.

use tracing::debug;

use bookhub_notifications::{EmailRequest, MailError, MailSender};

use crate::jobs::{Job, JobStore, RetryPolicy, Task};

pub struct JobMailSender<S: JobStore> {
    store: S,
    retry_policy: RetryPolicy,
}

impl<S: JobStore> JobMailSender<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}

impl<S: JobStore> MailSender for JobMailSender<S> {
    fn enqueue_email(&self, request: EmailRequest) -> Result<(), MailError> {
        let recipients = request.recipients.len();
        let job = Job::new(Task::GenericEmailSender { request })
            .with_retry_policy(self.retry_policy.clone());

        let job_id = self
            .store
            .enqueue(job)
            .map_err(|e| MailError::Enqueue(e.to_string()))?;

        debug!(
            job_id = %job_id,
            recipients,
            "email queued"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{InMemoryJobStore, TaskKind};
    use bookhub_notifications::{EmailCategory, OrderData, OrderEmailContext};
    use bookhub_orders::OrderStatus;
    use std::sync::Arc;

    fn request() -> EmailRequest {
        EmailRequest {
            subject: "Your order BH-1 has been successfully cancelled.".to_string(),
            message: "Your order BH-1 has been successfully cancelled.".to_string(),
            recipients: vec!["reader@example.com".to_string()],
            html_context: OrderEmailContext {
                heading: "Your item(s) have been cancelled".to_string(),
                message: "Your order BH-1 has been successfully cancelled.".to_string(),
                full_name: "Reader".to_string(),
                order_data: OrderData {
                    total_price: 0,
                    order_code: "BH-1".to_string(),
                    status: OrderStatus::Cancelled,
                    order_placed_at: None,
                    order_items: vec![],
                },
            },
            category: EmailCategory::Order,
        }
    }

    #[test]
    fn email_becomes_a_generic_email_sender_job() {
        let store = InMemoryJobStore::arc();
        let sender = JobMailSender::new(store.clone()).with_retry_policy(RetryPolicy::no_retry());

        sender.enqueue_email(request()).unwrap();

        let jobs = store.jobs(Some(TaskKind::GenericEmailSender)).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].retry_policy, RetryPolicy::no_retry());
        assert_eq!(
            jobs[0].task,
            Task::GenericEmailSender { request: request() }
        );
    }

    #[test]
    fn works_through_a_shared_store() {
        let store: Arc<InMemoryJobStore> = InMemoryJobStore::arc();
        let sender = JobMailSender::new(Arc::clone(&store));
        sender.enqueue_email(request()).unwrap();
        sender.enqueue_email(request()).unwrap();
        assert_eq!(store.stats().unwrap().pending, 2);
    }
}
