//! Outbound email payload for order notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookhub_orders::{BookOrder, Order, OrderStatus};

/// Tag the mail transport uses to pick the order email layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailCategory {
    Order,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemData {
    pub title: String,
    pub price: u64,
    pub quantity: u32,
    pub isbn: String,
    pub edition: String,
    pub total_price: u64,
    /// Cover image URL; empty when the book has none.
    pub image: String,
}

impl From<&BookOrder> for OrderItemData {
    fn from(item: &BookOrder) -> Self {
        Self {
            title: item.title.clone(),
            price: item.price,
            quantity: item.quantity,
            isbn: item.isbn.clone(),
            edition: item.edition.clone(),
            total_price: item.total_price(),
            image: item.image.clone().unwrap_or_default(),
        }
    }
}

/// Order summary rendered into the email body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderData {
    pub total_price: u64,
    pub order_code: String,
    pub status: OrderStatus,
    pub order_placed_at: Option<DateTime<Utc>>,
    pub order_items: Vec<OrderItemData>,
}

impl From<&Order> for OrderData {
    fn from(order: &Order) -> Self {
        Self {
            total_price: order.total_price(),
            order_code: order.order_code().to_string(),
            status: order.status(),
            order_placed_at: order.order_placed_at(),
            order_items: order.items().iter().map(OrderItemData::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEmailContext {
    pub heading: String,
    pub message: String,
    pub full_name: String,
    pub order_data: OrderData,
}

/// One outbound email, possibly to several mailboxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRequest {
    pub subject: String,
    pub message: String,
    pub recipients: Vec<String>,
    pub html_context: OrderEmailContext,
    pub category: EmailCategory,
}
