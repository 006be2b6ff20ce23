//! Order status workflow.
//!
//! ```text
//! authorize -> load order -> execute command -> save (tx) -> commit
//!                                                   |
//!                            on commit: enqueue notification_sender job
//! ```
//!
//! The notification job runs the dispatcher in a transaction of its own, so
//! it always reads the committed order.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info};

use bookhub_auth::{AuthzError, Permission, PermissionCatalog, RequestContext, require_permissions};
use bookhub_core::{AggregateRoot, DomainError, ExpectedVersion, OrderId};
use bookhub_events::{Event, execute};
use bookhub_notifications::{OrderRepository, StoreError, Transaction};
use bookhub_orders::{BookOrder, ChangeStatus, Order, OrderCommand, OrderStatus, PlaceOrder};

use crate::jobs::{JobStore, RetryPolicy};
use crate::tasks::notification_job;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct OrderWorkflow {
    orders: Arc<dyn OrderRepository>,
    jobs: Arc<dyn JobStore>,
    catalog: PermissionCatalog,
    notification_retry: RetryPolicy,
}

impl OrderWorkflow {
    pub fn new(orders: Arc<dyn OrderRepository>, jobs: Arc<dyn JobStore>) -> Self {
        Self {
            orders,
            jobs,
            catalog: PermissionCatalog::standard(),
            notification_retry: RetryPolicy::default(),
        }
    }

    pub fn with_catalog(mut self, catalog: PermissionCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_notification_retry(mut self, policy: RetryPolicy) -> Self {
        self.notification_retry = policy;
        self
    }

    /// Place an order for the caller. Requires `order.create`.
    pub fn place_order(
        &self,
        ctx: &RequestContext,
        items: Vec<BookOrder>,
    ) -> Result<Order, WorkflowError> {
        require_permissions(ctx, &[Permission::CREATE_ORDER], &self.catalog)?;
        let created_by = ctx.user_id().ok_or_else(|| AuthzError::Forbidden {
            permission: None,
            message: self.catalog.default_message().to_string(),
        })?;

        let order_id = OrderId::new();
        let command = OrderCommand::PlaceOrder(PlaceOrder {
            order_id,
            order_code: Order::code_for(order_id),
            created_by,
            items,
            occurred_at: Utc::now(),
        });

        self.run(Order::empty(order_id), command)
    }

    /// Move an order to `status`. Requires `order.update`.
    pub fn change_status(
        &self,
        ctx: &RequestContext,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, WorkflowError> {
        require_permissions(ctx, &[Permission::UPDATE_ORDER], &self.catalog)?;

        let order = self
            .orders
            .get(order_id)?
            .ok_or(WorkflowError::OrderNotFound(order_id))?;

        let command = OrderCommand::ChangeStatus(ChangeStatus {
            order_id,
            status,
            occurred_at: Utc::now(),
        });

        self.run(order, command)
    }

    fn run(&self, mut order: Order, command: OrderCommand) -> Result<Order, WorkflowError> {
        let expected = ExpectedVersion::Exact(order.version());
        let events = execute(&mut order, &command)?;

        let mut tx = Transaction::begin();
        self.orders.save(&mut tx, &order, expected)?;

        let jobs = Arc::clone(&self.jobs);
        let job = notification_job(order.id_typed(), self.notification_retry.clone());
        let order_id = order.id_typed();
        tx.on_commit(move || match jobs.enqueue(job) {
            Ok(job_id) => debug!(order_id = %order_id, job_id = %job_id, "notification job queued"),
            Err(e) => error!(order_id = %order_id, error = %e, "failed to queue notification job"),
        });

        tx.commit()?;

        for event in &events {
            info!(
                order_id = %order_id,
                event = event.event_type(),
                status = %order.status(),
                version = order.version(),
                "order updated"
            );
        }

        Ok(order)
    }
}
