//! Order notifications.
//!
//! Turns an order's current status into localized in-app notification
//! records and order emails. Records are written inside the caller's
//! transaction; emails are handed to the mail transport only after commit.

pub mod dispatcher;
pub mod email;
pub mod error;
pub mod locale;
pub mod notification;
pub mod ports;
pub mod template;
pub mod transaction;

pub use dispatcher::{DispatchOutcome, NotificationConfig, OrderNotificationDispatcher};
pub use email::{EmailCategory, EmailRequest, OrderData, OrderEmailContext, OrderItemData};
pub use error::{DispatchError, RecipientRef};
pub use locale::Locale;
pub use notification::{NotificationRecord, NotificationType};
pub use ports::{MailError, MailSender, NotificationStore, OrderRepository, StoreError, UserDirectory};
pub use template::{DateAttrs, RecipientMode, RenderedNotification, render};
pub use transaction::{CommitHook, StagedWrite, Transaction};
