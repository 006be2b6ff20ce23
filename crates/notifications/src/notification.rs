use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookhub_core::{NotificationId, OrderId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    OrderReceived,
    OrderPacked,
    OrderCompleted,
    OrderCancelled,
}

/// In-app notification about an order, addressed to one user.
///
/// Written once by the dispatcher and never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub order_id: OrderId,
    pub recipient: UserId,
    pub notification_type: NotificationType,
    pub title_en: String,
    pub title_ne: String,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn new(
        order_id: OrderId,
        recipient: UserId,
        notification_type: NotificationType,
        title_en: impl Into<String>,
        title_ne: impl Into<String>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            order_id,
            recipient,
            notification_type,
            title_en: title_en.into(),
            title_ne: title_ne.into(),
            created_at: Utc::now(),
        }
    }
}
