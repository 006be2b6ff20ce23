//! The background tasks an order can schedule.

use serde::{Deserialize, Serialize};

use bookhub_core::OrderId;
use bookhub_notifications::EmailRequest;

/// Task name used to route a job and to filter runners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    NotificationSender,
    GenericEmailSender,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::NotificationSender => "notification_sender",
            TaskKind::GenericEmailSender => "generic_email_sender",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of background work together with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Task {
    /// Fan the order's committed status out to notifications and emails.
    NotificationSender { order_id: OrderId },
    /// Hand one rendered order email to the mail transport.
    GenericEmailSender { request: EmailRequest },
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        match self {
            Task::NotificationSender { .. } => TaskKind::NotificationSender,
            Task::GenericEmailSender { .. } => TaskKind::GenericEmailSender,
        }
    }
}
