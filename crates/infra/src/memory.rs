//! In-memory adapters for the notification collaborators.
//!
//! Intended for tests/dev. Writes go through the caller's [`Transaction`]
//! and only become visible on commit.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use bookhub_auth::User;
use bookhub_core::{AggregateRoot, ExpectedVersion, OrderId, PublisherId, UserId};
use bookhub_notifications::{
    NotificationRecord, NotificationStore, OrderRepository, StagedWrite, StoreError,
    Transaction, UserDirectory,
};
use bookhub_orders::Order;

fn poisoned() -> StoreError {
    StoreError::Storage("lock poisoned".to_string())
}

fn check_version(
    orders: &HashMap<OrderId, Order>,
    order_id: OrderId,
    expected: ExpectedVersion,
) -> Result<(), StoreError> {
    let current = orders.get(&order_id).map(|o| o.version()).unwrap_or(0);
    if expected.matches(current) {
        Ok(())
    } else {
        Err(StoreError::Conflict(format!(
            "order {order_id}: expected {expected:?}, found {current}"
        )))
    }
}

/// Order snapshots keyed by id.
#[derive(Debug, Default, Clone)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored order, oldest placement first.
    pub fn all(&self) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().map_err(|_| poisoned())?;
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by_key(|o| o.order_placed_at());
        Ok(all)
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn get(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.read().map_err(|_| poisoned())?;
        Ok(orders.get(&order_id).cloned())
    }

    fn save(
        &self,
        tx: &mut Transaction,
        order: &Order,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError> {
        let order_id = order.id_typed();
        {
            let orders = self.orders.read().map_err(|_| poisoned())?;
            check_version(&orders, order_id, expected)?;
        }

        // Re-checked at commit: another transaction may have won.
        let check = {
            let orders = Arc::clone(&self.orders);
            move || {
                let orders = orders.read().map_err(|_| poisoned())?;
                check_version(&orders, order_id, expected)
            }
        };
        let apply = {
            let orders = Arc::clone(&self.orders);
            let snapshot = order.clone();
            move || {
                orders
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(order_id, snapshot);
            }
        };
        tx.stage(StagedWrite::new(check, apply));
        Ok(())
    }
}

/// Registered users, in registration order.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user.
    pub fn insert(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user,
            None => users.push(user),
        }
        Ok(())
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn get(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.iter().find(|u| u.id == user_id).cloned())
    }

    fn publisher_users(&self, publisher_id: PublisherId) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        let mut matching: Vec<User> = users
            .iter()
            .filter(|u| u.publisher_id == Some(publisher_id))
            .cloned()
            .collect();
        // Stable: ties keep insertion order.
        matching.sort_by_key(|u| u.date_joined);
        Ok(matching)
    }
}

/// Append-only notification records.
#[derive(Debug, Default, Clone)]
pub struct InMemoryNotificationStore {
    records: Arc<RwLock<Vec<NotificationRecord>>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Result<Vec<NotificationRecord>, StoreError> {
        Ok(self.records.read().map_err(|_| poisoned())?.clone())
    }

    pub fn for_recipient(&self, user_id: UserId) -> Result<Vec<NotificationRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records
            .iter()
            .filter(|r| r.recipient == user_id)
            .cloned()
            .collect())
    }
}

impl NotificationStore for InMemoryNotificationStore {
    fn create(&self, tx: &mut Transaction, record: NotificationRecord) -> Result<(), StoreError> {
        let records = Arc::clone(&self.records);
        tx.stage(StagedWrite::unconditional(move || {
            records
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(record);
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookhub_auth::Role;
    use bookhub_core::{Aggregate, BookId, NotificationId};
    use bookhub_notifications::NotificationType;
    use bookhub_orders::{BookOrder, ChangeStatus, OrderCommand, OrderStatus, PlaceOrder};
    use chrono::{Duration, Utc};

    fn changed(order: &Order, status: OrderStatus) -> Order {
        let mut next = order.clone();
        let events = next
            .handle(&OrderCommand::ChangeStatus(ChangeStatus {
                order_id: order.id_typed(),
                status,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        next.apply(&events[0]);
        next
    }

    fn placed_order() -> Order {
        let order_id = OrderId::new();
        let mut order = Order::empty(order_id);
        let events = order
            .handle(&OrderCommand::PlaceOrder(PlaceOrder {
                order_id,
                order_code: Order::code_for(order_id),
                created_by: UserId::new(),
                items: vec![BookOrder {
                    book_id: BookId::new(),
                    publisher_id: PublisherId::new(),
                    title: "Seto Dharti".to_string(),
                    isbn: "978-9937".to_string(),
                    edition: "1st".to_string(),
                    image: None,
                    quantity: 1,
                    price: 700,
                }],
                occurred_at: Utc::now(),
            }))
            .unwrap();
        order.apply(&events[0]);
        order
    }

    #[test]
    fn saved_order_is_visible_only_after_commit() {
        let repo = InMemoryOrderRepository::new();
        let order = placed_order();

        let mut tx = Transaction::begin();
        repo.save(&mut tx, &order, ExpectedVersion::Exact(0)).unwrap();
        assert!(repo.get(order.id_typed()).unwrap().is_none());

        tx.commit().unwrap();
        assert_eq!(repo.get(order.id_typed()).unwrap(), Some(order));
    }

    #[test]
    fn stale_version_is_a_conflict() {
        let repo = InMemoryOrderRepository::new();
        let order = placed_order();

        let mut tx = Transaction::begin();
        repo.save(&mut tx, &order, ExpectedVersion::Exact(0)).unwrap();
        tx.commit().unwrap();

        let mut tx = Transaction::begin();
        let err = repo
            .save(&mut tx, &order, ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn concurrent_writers_conflict_at_commit() {
        let repo = InMemoryOrderRepository::new();
        let order = placed_order();

        let mut first = Transaction::begin();
        let mut second = Transaction::begin();
        repo.save(&mut first, &order, ExpectedVersion::Exact(0)).unwrap();
        repo.save(&mut second, &order, ExpectedVersion::Exact(0)).unwrap();

        first.commit().unwrap();
        assert!(matches!(second.commit(), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn conflicting_order_save_discards_records_of_the_same_transaction() {
        let repo = InMemoryOrderRepository::new();
        let store = InMemoryNotificationStore::new();
        let order = placed_order();

        let mut setup = Transaction::begin();
        repo.save(&mut setup, &order, ExpectedVersion::Exact(0)).unwrap();
        setup.commit().unwrap();

        let mut tx = Transaction::begin();
        store
            .create(
                &mut tx,
                NotificationRecord::new(
                    order.id_typed(),
                    UserId::new(),
                    NotificationType::OrderReceived,
                    "received".to_string(),
                    "प्राप्त".to_string(),
                ),
            )
            .unwrap();
        let packed = changed(&order, OrderStatus::Packed);
        repo.save(&mut tx, &packed, ExpectedVersion::Exact(1)).unwrap();

        // Another writer wins the race before `tx` commits
        let cancelled = changed(&order, OrderStatus::Cancelled);
        let mut other = Transaction::begin();
        repo.save(&mut other, &cancelled, ExpectedVersion::Exact(1)).unwrap();
        other.commit().unwrap();

        assert!(matches!(tx.commit(), Err(StoreError::Conflict(_))));
        assert!(store.list().unwrap().is_empty());
        assert_eq!(
            repo.get(order.id_typed()).unwrap().unwrap().status(),
            OrderStatus::Cancelled
        );
    }

    #[test]
    fn publisher_users_are_ordered_by_registration() {
        let directory = InMemoryUserDirectory::new();
        let publisher = PublisherId::new();
        let now = Utc::now();

        let later = User::new(UserId::new(), "later@press.com", "Later", Role::Publisher, now)
            .unwrap()
            .with_publisher(publisher);
        let earlier = User::new(
            UserId::new(),
            "earlier@press.com",
            "Earlier",
            Role::Publisher,
            now - Duration::days(3),
        )
        .unwrap()
        .with_publisher(publisher);

        directory.insert(later.clone()).unwrap();
        directory.insert(earlier.clone()).unwrap();

        let users = directory.publisher_users(publisher).unwrap();
        assert_eq!(users, vec![earlier, later]);
        assert!(directory.publisher_users(PublisherId::new()).unwrap().is_empty());
    }

    #[test]
    fn notification_records_commit_with_the_transaction() {
        let store = InMemoryNotificationStore::new();
        let recipient = UserId::new();
        let record = NotificationRecord {
            id: NotificationId::new(),
            order_id: OrderId::new(),
            recipient,
            notification_type: NotificationType::OrderPacked,
            title_en: "packed".to_string(),
            title_ne: "प्याक".to_string(),
            created_at: Utc::now(),
        };

        let mut tx = Transaction::begin();
        store.create(&mut tx, record.clone()).unwrap();
        tx.rollback();
        assert!(store.list().unwrap().is_empty());

        let mut tx = Transaction::begin();
        store.create(&mut tx, record.clone()).unwrap();
        tx.commit().unwrap();
        assert_eq!(store.for_recipient(recipient).unwrap(), vec![record]);
    }
}
