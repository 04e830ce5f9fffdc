use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::network::{PostOffice, Shipper};
use crate::domain::notification::Notification;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::shipment::{HistoryEntry, Shipment};
use crate::domain::transaction::{cod_total, Transaction};
use super::{
    select_page, sort_directory, summarize, write_applies, ConditionalWrite, CounterStore, DirectoryStore,
    HistoryAppend, NotificationStore, OrderFilter, OrderStore, PageRequest, ShipmentStore, StatusCount,
    StoreError, TransactionStore,
};

// ============================================================================
// In-Memory Store
// ============================================================================
//
// All collections live behind one tokio mutex, so every primitive is atomic
// with respect to every other. Used for local runs and tests.
//
// ============================================================================

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    orders: HashMap<Uuid, Order>,
    shipments: HashMap<Uuid, Shipment>,
    notifications: Vec<Notification>,
    counters: HashMap<String, SequenceCounter>,
    transactions: HashMap<Uuid, Transaction>,
    post_offices: HashMap<Uuid, PostOffice>,
    shippers: HashMap<Uuid, Shipper>,
}

#[derive(Default)]
struct SequenceCounter {
    seq: u64,
    /// Value handed to each request id, for retried increments
    issued: HashMap<Uuid, u64>,
}

impl MemoryState {
    fn code_taken(&self, field: &'static str, value: &str, except: Option<Uuid>) -> bool {
        self.orders.values().any(|existing| {
            Some(existing.id) != except
                && match field {
                    "order_code" => existing.order_code == value,
                    _ => existing.tracking_code == value,
                }
        })
    }

    fn live_order_mut(&mut self, id: Uuid) -> Option<&mut Order> {
        self.orders.get_mut(&id).filter(|order| !order.is_deleted)
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryStore {
    async fn increment(&self, day_key: &str, request_id: Uuid) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;

        let counter = state.counters.entry(day_key.to_string()).or_default();

        if let Some(&issued) = counter.issued.get(&request_id) {
            return Ok(issued);
        }

        counter.seq += 1;
        counter.issued.insert(request_id, counter.seq);
        Ok(counter.seq)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;

        if state.code_taken("order_code", &order.order_code, None) {
            return Err(StoreError::Duplicate { field: "order_code", value: order.order_code.clone() });
        }
        if state.code_taken("tracking_code", &order.tracking_code, None) {
            return Err(StoreError::Duplicate { field: "tracking_code", value: order.tracking_code.clone() });
        }

        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn find_order_by_code(&self, order_code: &str) -> Result<Option<Order>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.orders.values().find(|o| o.order_code == order_code).cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<ConditionalWrite, StoreError> {
        let mut state = self.state.lock().await;

        let Some(order) = state.live_order_mut(id) else {
            return Ok(ConditionalWrite::Missing);
        };
        if order.current_status != expected {
            return Ok(ConditionalWrite::Stale(order.clone()));
        }

        *order = order.with_status(next, at);
        Ok(ConditionalWrite::Applied(order.clone()))
    }

    async fn replace_order(&self, order: &Order, expected: OrderStatus) -> Result<ConditionalWrite, StoreError> {
        let mut state = self.state.lock().await;

        if state.code_taken("order_code", &order.order_code, Some(order.id)) {
            return Err(StoreError::Duplicate { field: "order_code", value: order.order_code.clone() });
        }

        let Some(current) = state.live_order_mut(order.id) else {
            return Ok(ConditionalWrite::Missing);
        };
        if !write_applies(current, expected, order.version) {
            return Ok(ConditionalWrite::Stale(current.clone()));
        }

        *current = order.clone();
        Ok(ConditionalWrite::Applied(current.clone()))
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;

        match state.live_order_mut(id) {
            Some(order) => {
                *order = order.deleted(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<Vec<Order>, StoreError> {
        let state = self.state.lock().await;
        Ok(select_page(state.orders.values().cloned(), filter, page))
    }

    async fn count_orders(&self, filter: &OrderFilter) -> Result<u64, StoreError> {
        let state = self.state.lock().await;
        Ok(state.orders.values().filter(|o| filter.matches(o)).count() as u64)
    }

    async fn status_summary(&self) -> Result<Vec<StatusCount>, StoreError> {
        let state = self.state.lock().await;
        Ok(summarize(state.orders.values()))
    }
}

#[async_trait]
impl ShipmentStore for InMemoryStore {
    async fn insert_shipment(&self, shipment: &Shipment) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;

        if state.shipments.contains_key(&shipment.order_id) {
            return Err(StoreError::Duplicate { field: "shipment", value: shipment.order_id.to_string() });
        }

        state.shipments.insert(shipment.order_id, shipment.clone());
        Ok(())
    }

    async fn find_shipment(&self, order_id: Uuid) -> Result<Option<Shipment>, StoreError> {
        Ok(self.state.lock().await.shipments.get(&order_id).cloned())
    }

    async fn find_shipment_by_tracking_code(&self, tracking_code: &str) -> Result<Option<Shipment>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.shipments.values().find(|s| s.tracking_code == tracking_code).cloned())
    }

    async fn append_history(
        &self,
        order_id: Uuid,
        entry: &HistoryEntry,
        expected_len: usize,
    ) -> Result<HistoryAppend, StoreError> {
        let mut state = self.state.lock().await;

        let Some(shipment) = state.shipments.get_mut(&order_id) else {
            return Ok(HistoryAppend::Missing);
        };
        if shipment.status_history.len() != expected_len {
            return Ok(HistoryAppend::LengthMismatch(shipment.clone()));
        }

        shipment.status_history.push(entry.clone());
        Ok(HistoryAppend::Appended(shipment.clone()))
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn insert_notifications(&self, notifications: &[Notification]) -> Result<(), StoreError> {
        self.state.lock().await.notifications.extend_from_slice(notifications);
        Ok(())
    }

    async fn notifications_for_order(&self, order_code: &str) -> Result<Vec<Notification>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.order_code == order_code)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn upsert_transaction(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.transactions.insert(transaction.order_id, transaction.clone());
        Ok(())
    }

    async fn find_transaction(&self, order_id: Uuid) -> Result<Option<Transaction>, StoreError> {
        Ok(self.state.lock().await.transactions.get(&order_id).cloned())
    }

    async fn cod_total(&self) -> Result<f64, StoreError> {
        Ok(cod_total(self.state.lock().await.transactions.values()))
    }
}

#[async_trait]
impl DirectoryStore for InMemoryStore {
    async fn insert_post_office(&self, office: &PostOffice) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;

        if state.post_offices.values().any(|o| o.office_code == office.office_code) {
            return Err(StoreError::Duplicate { field: "office_code", value: office.office_code.clone() });
        }

        state.post_offices.insert(office.id, office.clone());
        Ok(())
    }

    async fn update_post_office(&self, office: &PostOffice) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;

        if state
            .post_offices
            .values()
            .any(|o| o.id != office.id && o.office_code == office.office_code)
        {
            return Err(StoreError::Duplicate { field: "office_code", value: office.office_code.clone() });
        }

        match state.post_offices.get_mut(&office.id) {
            Some(existing) => {
                *existing = office.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_post_office(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state.lock().await.post_offices.remove(&id).is_some())
    }

    async fn find_post_office(&self, id: Uuid) -> Result<Option<PostOffice>, StoreError> {
        Ok(self.state.lock().await.post_offices.get(&id).cloned())
    }

    async fn list_post_offices(&self) -> Result<Vec<PostOffice>, StoreError> {
        let mut offices: Vec<PostOffice> = self.state.lock().await.post_offices.values().cloned().collect();
        sort_directory(&mut offices, |o| o.office_code.as_str());
        Ok(offices)
    }

    async fn insert_shipper(&self, shipper: &Shipper) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;

        if state.shippers.values().any(|s| s.shipper_code == shipper.shipper_code) {
            return Err(StoreError::Duplicate { field: "shipper_code", value: shipper.shipper_code.clone() });
        }

        state.shippers.insert(shipper.id, shipper.clone());
        Ok(())
    }

    async fn update_shipper(&self, shipper: &Shipper) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;

        if state
            .shippers
            .values()
            .any(|s| s.id != shipper.id && s.shipper_code == shipper.shipper_code)
        {
            return Err(StoreError::Duplicate { field: "shipper_code", value: shipper.shipper_code.clone() });
        }

        match state.shippers.get_mut(&shipper.id) {
            Some(existing) => {
                *existing = shipper.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_shipper(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state.lock().await.shippers.remove(&id).is_some())
    }

    async fn find_shipper(&self, id: Uuid) -> Result<Option<Shipper>, StoreError> {
        Ok(self.state.lock().await.shippers.get(&id).cloned())
    }

    async fn list_shippers(&self) -> Result<Vec<Shipper>, StoreError> {
        let mut shippers: Vec<Shipper> = self.state.lock().await.shippers.values().cloned().collect();
        sort_directory(&mut shippers, |s| s.shipper_code.as_str());
        Ok(shippers)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
