use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookhub_core::{Aggregate, AggregateRoot, BookId, DomainError, OrderId, PublisherId, UserId};
use bookhub_events::Event;

/// Order status lifecycle.
///
/// `Unrecognized` absorbs status values written by newer producers; such
/// orders are readable but cannot be transitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Received,
    Packed,
    Completed,
    Cancelled,
    #[serde(other)]
    Unrecognized,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Received => "RECEIVED",
            OrderStatus::Packed => "PACKED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Unrecognized => "UNRECOGNIZED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// RECEIVED -> PACKED -> COMPLETED, with CANCELLED reachable from either
    /// open state.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Received, OrderStatus::Packed)
                | (OrderStatus::Packed, OrderStatus::Completed)
                | (OrderStatus::Received, OrderStatus::Cancelled)
                | (OrderStatus::Packed, OrderStatus::Cancelled)
        )
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order line: one book, its publisher, quantity and unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookOrder {
    pub book_id: BookId,
    pub publisher_id: PublisherId,
    pub title: String,
    pub isbn: String,
    pub edition: String,
    pub image: Option<String>,
    pub quantity: u32,
    /// Unit price in smallest currency unit.
    pub price: u64,
}

impl BookOrder {
    /// `price * quantity`.
    pub fn total_price(&self) -> u64 {
        self.price.saturating_mul(u64::from(self.quantity))
    }
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    order_code: String,
    created_by: Option<UserId>,
    status: OrderStatus,
    order_placed_at: Option<DateTime<Utc>>,
    items: Vec<BookOrder>,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            order_code: String::new(),
            created_by: None,
            status: OrderStatus::Received,
            order_placed_at: None,
            items: Vec::new(),
            version: 0,
            created: false,
        }
    }

    /// Human-facing order code derived from the order id.
    pub fn code_for(id: OrderId) -> String {
        let hex = id.as_uuid().simple().to_string();
        format!("BH-{}", hex[hex.len() - 8..].to_ascii_uppercase())
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn order_code(&self) -> &str {
        &self.order_code
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn order_placed_at(&self) -> Option<DateTime<Utc>> {
        self.order_placed_at
    }

    pub fn items(&self) -> &[BookOrder] {
        &self.items
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Sum of line totals.
    pub fn total_price(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |acc, item| acc.saturating_add(item.total_price()))
    }

    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Distinct publishers in first-appearance order.
    pub fn publishers(&self) -> Vec<PublisherId> {
        let mut seen = Vec::new();
        for item in &self.items {
            if !seen.contains(&item.publisher_id) {
                seen.push(item.publisher_id);
            }
        }
        seen
    }

    /// Line items belonging to one publisher.
    pub fn items_for(&self, publisher_id: PublisherId) -> impl Iterator<Item = &BookOrder> {
        self.items
            .iter()
            .filter(move |item| item.publisher_id == publisher_id)
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub order_code: String,
    pub created_by: UserId,
    pub items: Vec<BookOrder>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    ChangeStatus(ChangeStatus),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub order_code: String,
    pub created_by: UserId,
    pub items: Vec<BookOrder>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    StatusChanged(StatusChanged),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "orders.order.placed",
            OrderEvent::StatusChanged(_) => "orders.order.status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::StatusChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.order_code = e.order_code.clone();
                self.created_by = Some(e.created_by);
                self.status = OrderStatus::Received;
                self.order_placed_at = Some(e.occurred_at);
                self.items = e.items.clone();
                self.created = true;
            }
            OrderEvent::StatusChanged(e) => {
                self.status = e.to;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
        }
    }
}

impl Order {
    fn ensure_order_id(&self, order_id: OrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }
        self.ensure_order_id(cmd.order_id)?;

        if cmd.order_code.trim().is_empty() {
            return Err(DomainError::validation("order_code cannot be empty"));
        }

        if cmd.items.is_empty() {
            return Err(DomainError::validation(
                "cannot place an order without books",
            ));
        }

        if let Some(item) = cmd.items.iter().find(|item| item.quantity == 0) {
            return Err(DomainError::validation(format!(
                "quantity must be positive for '{}'",
                item.title
            )));
        }

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            order_code: cmd.order_code.trim().to_string(),
            created_by: cmd.created_by,
            items: cmd.items.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> Result<Vec<OrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_order_id(cmd.order_id)?;

        if cmd.status == OrderStatus::Unrecognized {
            return Err(DomainError::validation("unrecognized target status"));
        }

        if self.status == cmd.status {
            return Err(DomainError::invariant(format!(
                "order is already {}",
                self.status
            )));
        }

        if self.status.is_terminal() {
            return Err(DomainError::invariant(format!(
                "cannot change status of a {} order",
                self.status
            )));
        }

        if !self.status.can_transition_to(cmd.status) {
            return Err(DomainError::invariant(format!(
                "cannot move order from {} to {}",
                self.status, cmd.status
            )));
        }

        Ok(vec![OrderEvent::StatusChanged(StatusChanged {
            order_id: cmd.order_id,
            from: self.status,
            to: cmd.status,
            occurred_at: cmd.occurred_at,
        })])
    }
}
