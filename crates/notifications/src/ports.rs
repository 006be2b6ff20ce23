//! Collaborators the dispatcher reads from and writes to.

use thiserror::Error;

use bookhub_auth::User;
use bookhub_core::{ExpectedVersion, OrderId, PublisherId, UserId};
use bookhub_orders::Order;

use crate::{EmailRequest, NotificationRecord, Transaction};

/// Storage failure in one of the collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Optimistic concurrency check failed.
    #[error("version conflict: {0}")]
    Conflict(String),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MailError {
    #[error("failed to enqueue email: {0}")]
    Enqueue(String),
}

pub trait OrderRepository: Send + Sync {
    fn get(&self, order_id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Stage `order` in `tx`; the stored version must match `expected`.
    fn save(
        &self,
        tx: &mut Transaction,
        order: &Order,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError>;
}

pub trait UserDirectory: Send + Sync {
    fn get(&self, user_id: UserId) -> Result<Option<User>, StoreError>;

    /// Users attached to a publisher profile, earliest registration first.
    fn publisher_users(&self, publisher_id: PublisherId) -> Result<Vec<User>, StoreError>;
}

pub trait NotificationStore: Send + Sync {
    /// Stage `record` in `tx`.
    fn create(&self, tx: &mut Transaction, record: NotificationRecord) -> Result<(), StoreError>;
}

/// Asynchronous mail transport.
pub trait MailSender: Send + Sync {
    fn enqueue_email(&self, request: EmailRequest) -> Result<(), MailError>;
}
