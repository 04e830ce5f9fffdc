// ============================================================================
// Document Store - Persistence Layer
// ============================================================================
//
// One trait per collection, each exposing only the primitives the lifecycle
// engine needs. Every conditional primitive is atomic inside the backend:
//
// - CounterStore::increment       upsert-increment, idempotent per request id
// - OrderStore::update_status     compare-and-set on the document version
// - OrderStore::replace_order     compare-and-set on the document version
// - OrderStore::soft_delete       compare-and-set on the document version
// - ShipmentStore::append_history compare-and-set on the history length
// - DirectoryStore inserts        unique office and shipper codes
//
// Backends:
// - memory  - tokio-mutex guarded collections (development, tests)
// - scylladb - ScyllaDB with lightweight transactions
//
// ============================================================================

pub mod memory;
pub mod scylladb;

pub use memory::InMemoryStore;
pub use scylladb::ScyllaStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::network::{PostOffice, Shipper};
use crate::domain::notification::Notification;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::shipment::{HistoryEntry, Shipment};
use crate::domain::transaction::Transaction;
use crate::utils::IsTransient;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Duplicate {field}: {value}")]
    Duplicate { field: &'static str, value: String },

    #[error("Corrupt document: {0}")]
    Corrupt(String),
}

impl IsTransient for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

/// Run a store call with an upper bound on its duration
pub async fn bounded<T, F>(timeout: Duration, operation: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(timeout)),
    }
}

// ============================================================================
// Query Types
// ============================================================================

/// Listing filter. Soft-deleted orders are excluded unless asked for.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub query: Option<String>,
    pub status: Option<OrderStatus>,
    pub include_deleted: bool,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        if order.is_deleted && !self.include_deleted {
            return false;
        }
        if let Some(status) = self.status {
            if order.current_status != status {
                return false;
            }
        }
        match &self.query {
            Some(query) => order.matches_query(query),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub skip: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: u64,
}

/// Filter, newest-first sort, skip and limit over a loaded set of orders
pub(crate) fn select_page(orders: impl IntoIterator<Item = Order>, filter: &OrderFilter, page: PageRequest) -> Vec<Order> {
    let mut selected: Vec<Order> = orders.into_iter().filter(|o| filter.matches(o)).collect();
    selected.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.order_code.cmp(&a.order_code))
    });
    selected
        .into_iter()
        .skip(page.skip as usize)
        .take(page.limit as usize)
        .collect()
}

/// Count of non-deleted orders per status, largest group first
pub(crate) fn summarize<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Vec<StatusCount> {
    let mut counts: BTreeMap<&'static str, (OrderStatus, u64)> = BTreeMap::new();
    for order in orders.into_iter().filter(|o| !o.is_deleted) {
        counts
            .entry(order.current_status.as_str())
            .or_insert((order.current_status, 0))
            .1 += 1;
    }

    let mut summary: Vec<StatusCount> = counts
        .into_values()
        .map(|(status, count)| StatusCount { status, count })
        .collect();
    summary.sort_by(|a, b| b.count.cmp(&a.count));
    summary
}

// ============================================================================
// Conditional Write Outcomes
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalWrite {
    /// Condition held; carries the stored order after the write
    Applied(Order),
    /// Order changed since it was read; carries the order as found
    Stale(Order),
    /// No live (non-deleted) order with that id
    Missing,
}

/// Whether a write prepared from an earlier read of `current` still applies:
/// the status is the one the caller saw and nothing was written since.
pub(crate) fn write_applies(current: &Order, expected: OrderStatus, next_version: u64) -> bool {
    current.current_status == expected && current.version + 1 == next_version
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryAppend {
    Appended(Shipment),
    /// History length differed from the expected one; carries the shipment as found
    LengthMismatch(Shipment),
    Missing,
}

// ============================================================================
// Collection Traits
// ============================================================================

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter for `day_key` (creating it at 1) and
    /// return the post-increment value. Repeating a call with the same
    /// `request_id` returns the value already issued to it.
    async fn increment(&self, day_key: &str, request_id: Uuid) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order; `Duplicate` when its order or tracking code is taken
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError>;

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn find_order_by_code(&self, order_code: &str) -> Result<Option<Order>, StoreError>;

    /// Set status, bump the version and `updated_at` if the live order is
    /// still in `expected`. Atomic against every other order write.
    async fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<ConditionalWrite, StoreError>;

    /// Replace the whole document if the live order is still in `expected`
    /// and still at `order.version - 1`
    async fn replace_order(&self, order: &Order, expected: OrderStatus) -> Result<ConditionalWrite, StoreError>;

    /// Flag a live order as deleted; false if absent or already deleted
    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError>;

    async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<Vec<Order>, StoreError>;

    async fn count_orders(&self, filter: &OrderFilter) -> Result<u64, StoreError>;

    async fn status_summary(&self) -> Result<Vec<StatusCount>, StoreError>;
}

#[async_trait]
pub trait ShipmentStore: Send + Sync {
    /// Insert a new shipment; `Duplicate` when the order already has one
    async fn insert_shipment(&self, shipment: &Shipment) -> Result<(), StoreError>;

    async fn find_shipment(&self, order_id: Uuid) -> Result<Option<Shipment>, StoreError>;

    async fn find_shipment_by_tracking_code(&self, tracking_code: &str) -> Result<Option<Shipment>, StoreError>;

    /// Append one entry if the history still has `expected_len` entries
    async fn append_history(
        &self,
        order_id: Uuid,
        entry: &HistoryEntry,
        expected_len: usize,
    ) -> Result<HistoryAppend, StoreError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notifications(&self, notifications: &[Notification]) -> Result<(), StoreError>;

    async fn notifications_for_order(&self, order_code: &str) -> Result<Vec<Notification>, StoreError>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert or overwrite the COD transaction of an order
    async fn upsert_transaction(&self, transaction: &Transaction) -> Result<(), StoreError>;

    async fn find_transaction(&self, order_id: Uuid) -> Result<Option<Transaction>, StoreError>;

    /// Sum of completed COD collections
    async fn cod_total(&self) -> Result<f64, StoreError>;
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// `Duplicate` when the office code is taken
    async fn insert_post_office(&self, office: &PostOffice) -> Result<(), StoreError>;

    /// Overwrite an existing office; false if absent. `Duplicate` when the
    /// new office code belongs to another office.
    async fn update_post_office(&self, office: &PostOffice) -> Result<bool, StoreError>;

    async fn delete_post_office(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn find_post_office(&self, id: Uuid) -> Result<Option<PostOffice>, StoreError>;

    async fn list_post_offices(&self) -> Result<Vec<PostOffice>, StoreError>;

    /// `Duplicate` when the shipper code is taken
    async fn insert_shipper(&self, shipper: &Shipper) -> Result<(), StoreError>;

    async fn update_shipper(&self, shipper: &Shipper) -> Result<bool, StoreError>;

    async fn delete_shipper(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn find_shipper(&self, id: Uuid) -> Result<Option<Shipper>, StoreError>;

    async fn list_shippers(&self) -> Result<Vec<Shipper>, StoreError>;
}

/// Every collection the tracking service touches
pub trait TrackingStore:
    CounterStore + OrderStore + ShipmentStore + NotificationStore + TransactionStore + DirectoryStore
{
}

impl<T> TrackingStore for T where
    T: CounterStore + OrderStore + ShipmentStore + NotificationStore + TransactionStore + DirectoryStore
{
}

/// Offices by code, shippers by code
pub(crate) fn sort_directory<T>(items: &mut [T], code: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| code(a).cmp(code(b)));
}
