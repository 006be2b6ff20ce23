//! Order statistics as seen by one viewer.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use bookhub_auth::{Role, User};
use bookhub_core::{BookId, PublisherId, UserId};

use crate::{Order, OrderStatus};

/// A book in the catalog, reduced to what the statistics count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogBook {
    pub book_id: BookId,
    pub publisher_id: PublisherId,
}

/// Which orders (and which line items) a viewer may count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatScope {
    All,
    Publisher(PublisherId),
    Customer(UserId),
}

impl StatScope {
    /// Admins see everything, publisher staff see their publisher's line
    /// items, everyone else sees the orders they created.
    ///
    /// Publisher staff without a publisher profile fall back to their own
    /// orders.
    pub fn for_user(user: &User) -> Self {
        match (user.role, user.publisher_id) {
            (Role::Admin, _) => StatScope::All,
            (Role::Publisher, Some(publisher_id)) => StatScope::Publisher(publisher_id),
            _ => StatScope::Customer(user.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub total_price: u64,
    pub total_quantity: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderStat {
    /// Line items visible to the viewer.
    pub books_ordered_count: u64,
    /// Catalog books the viewer's organization published. Always 0 for
    /// customers.
    pub books_uploaded_count: u64,
    /// Completed orders with at least one visible line item.
    pub orders_completed_count: u64,
    pub total_quantity: u64,
    /// Completed-order totals per placement day (UTC), oldest first.
    pub stat: Vec<DailyStat>,
}

/// Aggregate order and catalog statistics for `scope`.
pub fn order_stat<'a, O, B>(orders: O, books: B, scope: &StatScope) -> OrderStat
where
    O: IntoIterator<Item = &'a Order>,
    B: IntoIterator<Item = &'a CatalogBook>,
{
    let mut out = OrderStat {
        books_uploaded_count: books_uploaded(books, scope),
        ..OrderStat::default()
    };
    let mut per_day: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();

    for order in orders {
        if !order.is_created() {
            continue;
        }
        if let StatScope::Customer(user_id) = scope {
            if order.created_by() != Some(*user_id) {
                continue;
            }
        }

        let visible: Vec<_> = order
            .items()
            .iter()
            .filter(|item| match scope {
                StatScope::Publisher(publisher_id) => item.publisher_id == *publisher_id,
                StatScope::All | StatScope::Customer(_) => true,
            })
            .collect();

        if visible.is_empty() {
            continue;
        }

        let quantity: u64 = visible.iter().map(|item| u64::from(item.quantity)).sum();
        out.books_ordered_count += visible.len() as u64;
        out.total_quantity += quantity;

        if order.status() == OrderStatus::Completed {
            out.orders_completed_count += 1;

            if let Some(placed_at) = order.order_placed_at() {
                let price = visible
                    .iter()
                    .fold(0u64, |acc, item| acc.saturating_add(item.total_price()));
                let day = per_day.entry(placed_at.date_naive()).or_default();
                day.0 = day.0.saturating_add(price);
                day.1 += quantity;
            }
        }
    }

    out.stat = per_day
        .into_iter()
        .map(|(date, (total_price, total_quantity))| DailyStat {
            date,
            total_price,
            total_quantity,
        })
        .collect();

    out
}

fn books_uploaded<'a, B>(books: B, scope: &StatScope) -> u64
where
    B: IntoIterator<Item = &'a CatalogBook>,
{
    match scope {
        StatScope::All => books.into_iter().count() as u64,
        StatScope::Publisher(publisher_id) => books
            .into_iter()
            .filter(|book| book.publisher_id == *publisher_id)
            .count() as u64,
        StatScope::Customer(_) => 0,
    }
}
