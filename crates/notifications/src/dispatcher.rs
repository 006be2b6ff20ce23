//! Order status notifications: in-app records plus one email per mailbox.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use tracing::{error, info, warn};

use bookhub_auth::User;
use bookhub_core::OrderId;
use bookhub_orders::{Order, OrderStatus};

use crate::template::{DateAttrs, RecipientMode, RenderedNotification, render};
use crate::{
    DispatchError, EmailCategory, EmailRequest, MailSender, NotificationRecord,
    NotificationStore, OrderData, OrderEmailContext, OrderRepository, RecipientRef, Transaction,
    UserDirectory,
};

/// Dispatcher settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    /// Offset used to render the placement time in titles and subjects.
    pub display_offset: FixedOffset,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            display_offset: Utc.fix(),
        }
    }
}

impl NotificationConfig {
    /// `None` when the offset is outside +/- 24h.
    pub fn with_utc_offset_minutes(minutes: i32) -> Option<Self> {
        let display_offset = FixedOffset::east_opt(minutes.checked_mul(60)?)?;
        Some(Self { display_offset })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The order's status has no template; nothing was written.
    Skipped { status: OrderStatus },
    Dispatched { notifications: usize, emails: usize },
}

pub struct OrderNotificationDispatcher {
    orders: Arc<dyn OrderRepository>,
    users: Arc<dyn UserDirectory>,
    notifications: Arc<dyn NotificationStore>,
    mail: Arc<dyn MailSender>,
    config: NotificationConfig,
}

impl OrderNotificationDispatcher {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        users: Arc<dyn UserDirectory>,
        notifications: Arc<dyn NotificationStore>,
        mail: Arc<dyn MailSender>,
    ) -> Self {
        Self {
            orders,
            users,
            notifications,
            mail,
            config: NotificationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: NotificationConfig) -> Self {
        self.config = config;
        self
    }

    /// Notify the parties concerned by the order's committed status.
    ///
    /// The order is read through [`OrderRepository::get`], which sees
    /// committed state only. A caller that changes the status inside `tx`
    /// must use [`dispatch_order`](Self::dispatch_order) with the new state.
    pub fn dispatch(
        &self,
        tx: &mut Transaction,
        order_id: OrderId,
    ) -> Result<DispatchOutcome, DispatchError> {
        let order = self
            .orders
            .get(order_id)?
            .ok_or(DispatchError::OrderNotFound(order_id))?;
        self.dispatch_order(tx, &order)
    }

    /// Notify the parties concerned by `order` as given.
    ///
    /// Records are staged in `tx`; emails are enqueued only once `tx`
    /// commits. Recipients are resolved before anything is staged, so a
    /// lookup failure leaves `tx` untouched. If `tx` fails to commit, neither
    /// records nor emails survive.
    pub fn dispatch_order(
        &self,
        tx: &mut Transaction,
        order: &Order,
    ) -> Result<DispatchOutcome, DispatchError> {
        let order_id = order.id_typed();
        if !order.is_created() {
            return Err(DispatchError::OrderNotFound(order_id));
        }
        let placed_at = order
            .order_placed_at()
            .ok_or(DispatchError::OrderNotFound(order_id))?;

        let attrs = DateAttrs::new(order.order_code(), placed_at, self.config.display_offset);
        let Some(rendered) = render(order.status(), &attrs) else {
            warn!(
                order_id = %order_id,
                status = %order.status(),
                "no notification template for order status"
            );
            return Ok(DispatchOutcome::Skipped {
                status: order.status(),
            });
        };

        let recipients = match rendered.recipients {
            RecipientMode::Publishers => self.publisher_recipients(order)?,
            RecipientMode::Customer => vec![self.customer(order)?],
        };

        for user in &recipients {
            self.notifications.create(
                tx,
                NotificationRecord::new(
                    order_id,
                    user.id,
                    rendered.notification_type,
                    rendered.title_en.clone(),
                    rendered.title_ne.clone(),
                ),
            )?;
        }

        let order_data = OrderData::from(order);
        let mut mailboxes = HashSet::new();
        for user in &recipients {
            if !mailboxes.insert(user.email.to_lowercase()) {
                continue;
            }
            let request = email_for(user, &rendered, order_data.clone());
            let mail = Arc::clone(&self.mail);
            tx.on_commit(move || {
                if let Err(e) = mail.enqueue_email(request) {
                    error!(order_id = %order_id, error = %e, "failed to enqueue order email");
                }
            });
        }

        info!(
            order_id = %order_id,
            status = %order.status(),
            notifications = recipients.len(),
            emails = mailboxes.len(),
            "order notification dispatched"
        );

        Ok(DispatchOutcome::Dispatched {
            notifications: recipients.len(),
            emails: mailboxes.len(),
        })
    }

    /// [`dispatch`](Self::dispatch) in a transaction of its own.
    pub fn dispatch_and_commit(&self, order_id: OrderId) -> Result<DispatchOutcome, DispatchError> {
        let mut tx = Transaction::begin();
        match self.dispatch(&mut tx, order_id) {
            Ok(outcome) => {
                tx.commit()?;
                Ok(outcome)
            }
            Err(e) => {
                tx.rollback();
                Err(e)
            }
        }
    }

    /// One user per distinct publisher, deduplicated by user id.
    fn publisher_recipients(&self, order: &Order) -> Result<Vec<User>, DispatchError> {
        let mut recipients: Vec<User> = Vec::new();

        for publisher_id in order.publishers() {
            let mut users = self.users.publisher_users(publisher_id)?;
            if users.is_empty() {
                return Err(DispatchError::UnresolvedRecipient(RecipientRef::Publisher(
                    publisher_id,
                )));
            }
            if users.len() > 1 {
                warn!(
                    publisher_id = %publisher_id,
                    users = users.len(),
                    "publisher has several users, notifying the earliest registered"
                );
            }
            let user = users.swap_remove(0);
            if !recipients.iter().any(|r| r.id == user.id) {
                recipients.push(user);
            }
        }

        Ok(recipients)
    }

    fn customer(&self, order: &Order) -> Result<User, DispatchError> {
        let user_id = order
            .created_by()
            .ok_or(DispatchError::OrderNotFound(order.id_typed()))?;
        self.users
            .get(user_id)?
            .ok_or(DispatchError::UnresolvedRecipient(RecipientRef::Customer(
                user_id,
            )))
    }
}

fn email_for(user: &User, rendered: &RenderedNotification, order_data: OrderData) -> EmailRequest {
    EmailRequest {
        subject: rendered.mail_subject.clone(),
        message: rendered.mail_subject.clone(),
        recipients: vec![user.email.clone()],
        html_context: OrderEmailContext {
            heading: rendered.heading.to_string(),
            message: rendered.mail_subject.clone(),
            full_name: user.full_name.clone(),
            order_data,
        },
        category: EmailCategory::Order,
    }
}
