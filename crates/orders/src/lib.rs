//! Book orders domain module.
//!
//! Business rules for orders and their line items, implemented as
//! deterministic domain logic (no IO, no storage).

pub mod order;
pub mod stats;

pub use order::{
    BookOrder, ChangeStatus, Order, OrderCommand, OrderEvent, OrderPlaced, OrderStatus,
    PlaceOrder, StatusChanged,
};
pub use stats::{CatalogBook, DailyStat, OrderStat, StatScope, order_stat};
