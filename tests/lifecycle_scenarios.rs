use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures_util::future::join_all;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use parcel_tracking::domain::notification::{Notification, NotificationKind};
use parcel_tracking::domain::order::{NumericInput, Order, OrderForm, OrderStatus, TransitionRequest};
use parcel_tracking::domain::shipment::{HistoryEntry, HistoryStatus, Shipment};
use parcel_tracking::lifecycle::{
    build_manager, Clock, LifecycleError, LifecycleSettings, ManualClock, NotificationEmitter, OrderLifecycleManager,
    SequenceAllocator, ShipmentHistoryRecorder,
};
use parcel_tracking::metrics::Metrics;
use parcel_tracking::store::{
    ConditionalWrite, CounterStore, HistoryAppend, InMemoryStore, NotificationStore, OrderFilter, OrderStore,
    PageRequest, ShipmentStore, StatusCount, StoreError,
};
use parcel_tracking::utils::RetryConfig;
use parcel_tracking::views::{ListQuery, TrackingViews};

// ============================================================================
// Helpers
// ============================================================================

fn start() -> DateTime<Utc> {
    // 09:00 on 2025-01-15 in UTC+7
    DateTime::parse_from_rfc3339("2025-01-15T02:00:00Z").unwrap().with_timezone(&Utc)
}

fn create_test_form() -> OrderForm {
    OrderForm {
        sender_name: "Shop Hoa Mai".to_string(),
        sender_phone: "0281234567".to_string(),
        sender_address: "45 Nguyen Trai, Q5".to_string(),
        recipient_name: "Nguyen Thi B".to_string(),
        recipient_phone: "0909876543".to_string(),
        recipient_address: "12 Le Loi, Q1".to_string(),
        assigned_shipper_code: Some("SHP1004".to_string()),
        weight: Some("1.2".into()),
        cod_amount: Some("250000".into()),
        shipping_fee: Some("30000".into()),
        ..Default::default()
    }
}

fn test_settings() -> LifecycleSettings {
    LifecycleSettings {
        business_utc_offset_hours: 7,
        store_timeout: Duration::from_millis(500),
        allocator_retry: RetryConfig::immediate(3),
        history_retry: RetryConfig::immediate(5),
    }
}

struct Harness {
    store: Arc<InMemoryStore>,
    clock: Arc<ManualClock>,
    manager: Arc<OrderLifecycleManager>,
    views: TrackingViews,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(start()));
    let manager = build_manager(
        store.clone(),
        clock.clone(),
        Arc::new(Metrics::new().unwrap()),
        test_settings(),
    );
    let views = TrackingViews::new(store.clone(), Duration::from_millis(500));

    Harness {
        store,
        clock,
        manager: Arc::new(manager),
        views,
    }
}

/// Manager over separately chosen collections, with the standard hooks
fn wired(
    orders: Arc<dyn OrderStore>,
    counters: Arc<dyn CounterStore>,
    shipments: Arc<dyn ShipmentStore>,
    notifications: Arc<dyn NotificationStore>,
    metrics: Arc<Metrics>,
) -> OrderLifecycleManager {
    let settings = test_settings();
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(start()));

    let allocator = SequenceAllocator::new(
        counters,
        settings.allocator_retry.clone(),
        settings.store_timeout,
        metrics.clone(),
    );
    let history = ShipmentHistoryRecorder::new(
        shipments,
        clock.clone(),
        settings.history_retry.clone(),
        settings.store_timeout,
    );
    let emitter = NotificationEmitter::new(notifications, clock.clone(), settings.store_timeout);

    OrderLifecycleManager::new(orders, allocator, clock, metrics, settings)
        .with_hook(Arc::new(history))
        .with_hook(Arc::new(emitter))
}

fn hook_failures(metrics: &Metrics, hook: &str) -> f64 {
    metrics
        .registry()
        .gather()
        .iter()
        .filter(|family| family.name() == "lifecycle_hook_failures_total")
        .flat_map(|family| family.metric.iter())
        .filter(|m| m.label.iter().any(|l| l.value() == hook))
        .map(|m| m.counter.value.unwrap_or(0.0))
        .sum()
}

// ============================================================================
// Fault-Injecting Stores
// ============================================================================

struct DownCounter;

#[async_trait]
impl CounterStore for DownCounter {
    async fn increment(&self, _day_key: &str, _request_id: Uuid) -> Result<u64, StoreError> {
        Err(StoreError::Timeout(Duration::from_millis(500)))
    }
}

/// Moves the order to `interloper` right before the first conditional write
struct RacingOrders {
    inner: Arc<InMemoryStore>,
    interloper: OrderStatus,
    raced: AtomicU32,
}

#[async_trait]
impl OrderStore for RacingOrders {
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        self.inner.insert_order(order).await
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        self.inner.find_order(id).await
    }

    async fn find_order_by_code(&self, order_code: &str) -> Result<Option<Order>, StoreError> {
        self.inner.find_order_by_code(order_code).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<ConditionalWrite, StoreError> {
        if self.raced.fetch_add(1, Ordering::SeqCst) == 0 {
            self.inner.update_status(id, expected, self.interloper, at).await?;
        }
        self.inner.update_status(id, expected, next, at).await
    }

    async fn replace_order(&self, order: &Order, expected: OrderStatus) -> Result<ConditionalWrite, StoreError> {
        self.inner.replace_order(order, expected).await
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError> {
        self.inner.soft_delete(id, at).await
    }

    async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<Vec<Order>, StoreError> {
        self.inner.list_orders(filter, page).await
    }

    async fn count_orders(&self, filter: &OrderFilter) -> Result<u64, StoreError> {
        self.inner.count_orders(filter).await
    }

    async fn status_summary(&self) -> Result<Vec<StatusCount>, StoreError> {
        self.inner.status_summary().await
    }
}

/// History appends fail transiently a fixed number of times
struct FlakyShipments {
    inner: Arc<InMemoryStore>,
    failures_left: AtomicU32,
}

#[async_trait]
impl ShipmentStore for FlakyShipments {
    async fn insert_shipment(&self, shipment: &Shipment) -> Result<(), StoreError> {
        self.inner.insert_shipment(shipment).await
    }

    async fn find_shipment(&self, order_id: Uuid) -> Result<Option<Shipment>, StoreError> {
        self.inner.find_shipment(order_id).await
    }

    async fn find_shipment_by_tracking_code(&self, tracking_code: &str) -> Result<Option<Shipment>, StoreError> {
        self.inner.find_shipment_by_tracking_code(tracking_code).await
    }

    async fn append_history(
        &self,
        order_id: Uuid,
        entry: &HistoryEntry,
        expected_len: usize,
    ) -> Result<HistoryAppend, StoreError> {
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("write timeout".to_string()));
        }
        self.inner.append_history(order_id, entry, expected_len).await
    }
}

/// The first increment lands, another writer takes the next value, and the
/// reply to the first caller is lost
struct LostReplyCounter {
    inner: Arc<InMemoryStore>,
    replies_lost: AtomicU32,
}

#[async_trait]
impl CounterStore for LostReplyCounter {
    async fn increment(&self, day_key: &str, request_id: Uuid) -> Result<u64, StoreError> {
        let issued = self.inner.increment(day_key, request_id).await?;
        if self.replies_lost.fetch_add(1, Ordering::SeqCst) == 0 {
            self.inner.increment(day_key, Uuid::new_v4()).await?;
            return Err(StoreError::Timeout(Duration::from_millis(500)));
        }
        Ok(issued)
    }
}

/// The first history append carrying `status` fails for good
struct DroppingShipments {
    inner: Arc<InMemoryStore>,
    status: OrderStatus,
    dropped: AtomicU32,
}

#[async_trait]
impl ShipmentStore for DroppingShipments {
    async fn insert_shipment(&self, shipment: &Shipment) -> Result<(), StoreError> {
        self.inner.insert_shipment(shipment).await
    }

    async fn find_shipment(&self, order_id: Uuid) -> Result<Option<Shipment>, StoreError> {
        self.inner.find_shipment(order_id).await
    }

    async fn find_shipment_by_tracking_code(&self, tracking_code: &str) -> Result<Option<Shipment>, StoreError> {
        self.inner.find_shipment_by_tracking_code(tracking_code).await
    }

    async fn append_history(
        &self,
        order_id: Uuid,
        entry: &HistoryEntry,
        expected_len: usize,
    ) -> Result<HistoryAppend, StoreError> {
        if entry.status == HistoryStatus::Order(self.status) && self.dropped.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(StoreError::Corrupt("entry rejected by shipments keyspace".to_string()));
        }
        self.inner.append_history(order_id, entry, expected_len).await
    }
}

/// Another editor's full-record edit lands right before the first replace
struct InterleavedEdits {
    inner: Arc<InMemoryStore>,
    raced: AtomicU32,
}

#[async_trait]
impl OrderStore for InterleavedEdits {
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        self.inner.insert_order(order).await
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        self.inner.find_order(id).await
    }

    async fn find_order_by_code(&self, order_code: &str) -> Result<Option<Order>, StoreError> {
        self.inner.find_order_by_code(order_code).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<ConditionalWrite, StoreError> {
        self.inner.update_status(id, expected, next, at).await
    }

    async fn replace_order(&self, order: &Order, expected: OrderStatus) -> Result<ConditionalWrite, StoreError> {
        if self.raced.fetch_add(1, Ordering::SeqCst) == 0 {
            let mut other = order.clone();
            other.recipient.phone = "0911222333".to_string();
            self.inner.replace_order(&other, expected).await?;
        }
        self.inner.replace_order(order, expected).await
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError> {
        self.inner.soft_delete(id, at).await
    }

    async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<Vec<Order>, StoreError> {
        self.inner.list_orders(filter, page).await
    }

    async fn count_orders(&self, filter: &OrderFilter) -> Result<u64, StoreError> {
        self.inner.count_orders(filter).await
    }

    async fn status_summary(&self) -> Result<Vec<StatusCount>, StoreError> {
        self.inner.status_summary().await
    }
}

struct DownNotifications;

#[async_trait]
impl NotificationStore for DownNotifications {
    async fn insert_notifications(&self, _notifications: &[Notification]) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("notifications keyspace offline".to_string()))
    }

    async fn notifications_for_order(&self, _order_code: &str) -> Result<Vec<Notification>, StoreError> {
        Ok(Vec::new())
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_codes_start_at_one_each_day() {
    let h = harness();

    let first = h.manager.create(create_test_form()).await.unwrap();
    let second = h.manager.create(create_test_form()).await.unwrap();

    assert_eq!(first.order_code, "VT202501150001");
    assert_eq!(second.order_code, "VT202501150002");
    assert_eq!(first.tracking_code, first.order_code);
    assert_eq!(first.current_status, OrderStatus::PendingPickup);

    h.clock.advance(ChronoDuration::days(1));
    let next_day = h.manager.create(create_test_form()).await.unwrap();
    assert_eq!(next_day.order_code, "VT202501160001");
}

#[tokio::test]
async fn test_create_initializes_shipment_and_notifies() {
    let h = harness();
    let order = h.manager.create(create_test_form()).await.unwrap();

    let shipment = h.store.find_shipment(order.id).await.unwrap().unwrap();
    assert_eq!(shipment.status_history.len(), 1);
    assert_eq!(shipment.status_history[0].status, HistoryStatus::Created);
    assert_eq!(shipment.status_history[0].timestamp, order.created_at);

    let notifications = h.views.notifications(&order.order_code).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::OrderCreated);
}

#[tokio::test]
async fn test_skipping_ahead_is_rejected_without_side_effects() {
    let h = harness();
    let order = h.manager.create(create_test_form()).await.unwrap();

    let err = h.manager.transition(order.id, OrderStatus::Delivered).await.unwrap_err();
    assert_eq!(
        err,
        LifecycleError::InvalidTransition {
            current: OrderStatus::PendingPickup,
            requested: OrderStatus::Delivered,
        }
    );

    let stored = h.store.find_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.current_status, OrderStatus::PendingPickup);
    let shipment = h.store.find_shipment(order.id).await.unwrap().unwrap();
    assert_eq!(shipment.status_history.len(), 1);
    assert_eq!(h.views.notifications(&order.order_code).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_in_transit_appends_history_and_notifies_recipient() {
    let h = harness();
    let order = h.manager.create(create_test_form()).await.unwrap();

    h.clock.advance(ChronoDuration::minutes(30));
    h.manager
        .transition_with(
            order.id,
            TransitionRequest::to(OrderStatus::PickedUp)
                .with_actor("SHP1004")
                .with_location("Buu cuc Q5"),
        )
        .await
        .unwrap();

    h.clock.advance(ChronoDuration::minutes(30));
    let updated = h.manager.transition(order.id, OrderStatus::InTransit).await.unwrap();
    assert_eq!(updated.current_status, OrderStatus::InTransit);

    let shipment = h.store.find_shipment(order.id).await.unwrap().unwrap();
    let statuses: Vec<String> = shipment.status_history.iter().map(|e| e.status.to_string()).collect();
    assert_eq!(statuses, vec!["CREATED", "PICKED_UP", "IN_TRANSIT"]);
    assert_eq!(shipment.status_history[1].actor.as_deref(), Some("SHP1004"));
    assert!(shipment.is_chronological());

    let in_transit: Vec<Notification> = h
        .views
        .notifications(&order.order_code)
        .await
        .unwrap()
        .into_iter()
        .filter(|n| n.kind == NotificationKind::StatusChanged(OrderStatus::InTransit))
        .collect();
    assert_eq!(in_transit.len(), 1);
    assert_eq!(in_transit[0].recipient.as_deref(), Some("Nguyen Thi B"));
}

#[tokio::test]
async fn test_soft_deleted_order_is_hidden_and_frozen() {
    let h = harness();
    let kept = h.manager.create(create_test_form()).await.unwrap();
    let removed = h.manager.create(create_test_form()).await.unwrap();

    h.manager.soft_delete(removed.id).await.unwrap();

    let page = h.views.list(&ListQuery::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].id, kept.id);

    let err = h.manager.transition(removed.id, OrderStatus::PickedUp).await.unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound(_)));

    let err = h.manager.soft_delete(removed.id).await.unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound(_)));

    let stored = h.store.find_order(removed.id).await.unwrap().unwrap();
    assert!(stored.is_deleted);
    assert_eq!(stored.current_status, OrderStatus::PendingPickup);
}

#[tokio::test]
async fn test_concurrent_creates_get_contiguous_codes() {
    let h = harness();
    const WRITERS: usize = 40;

    let results = join_all((0..WRITERS).map(|_| {
        let manager = h.manager.clone();
        async move { manager.create(create_test_form()).await }
    }))
    .await;

    let mut suffixes: Vec<u64> = results
        .into_iter()
        .map(|r| r.unwrap().order_code)
        .map(|code| {
            assert!(code.starts_with("VT20250115"));
            code["VT20250115".len()..].parse().unwrap()
        })
        .collect();
    suffixes.sort_unstable();

    assert_eq!(suffixes, (1..=WRITERS as u64).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_repeated_same_status_leaves_history_alone() {
    let h = harness();
    let order = h.manager.create(create_test_form()).await.unwrap();
    h.manager.transition(order.id, OrderStatus::PickedUp).await.unwrap();

    h.manager.transition(order.id, OrderStatus::PickedUp).await.unwrap();
    h.manager.transition(order.id, OrderStatus::PickedUp).await.unwrap();

    let shipment = h.store.find_shipment(order.id).await.unwrap().unwrap();
    assert_eq!(shipment.status_history.len(), 2);
}

#[tokio::test]
async fn test_total_tracks_components_on_create_and_edit() {
    let h = harness();

    let zero = OrderForm {
        cod_amount: None,
        shipping_fee: Some("".into()),
        insurance_fee: Some("abc".into()),
        ..create_test_form()
    };
    let order = h.manager.create(zero).await.unwrap();
    assert_eq!(order.financials.total_amount(), 0.0);

    let large = OrderForm {
        cod_amount: Some(NumericInput::Number(9_000_000_000.0)),
        shipping_fee: Some("45000".into()),
        insurance_fee: Some("1500.5".into()),
        ..create_test_form()
    };
    let edited = h.manager.edit(order.id, large).await.unwrap();
    let financials = &edited.financials;
    assert_eq!(
        financials.total_amount(),
        financials.cod_amount() + financials.shipping_fee() + financials.insurance_fee()
    );
    assert_eq!(financials.total_amount(), 9_000_046_500.5);
    assert_eq!(edited.order_code, order.order_code);
}

#[tokio::test]
async fn test_edit_with_status_change_records_history() {
    let h = harness();
    let order = h.manager.create(create_test_form()).await.unwrap();

    let form = OrderForm {
        current_status: Some("PICKED_UP".to_string()),
        recipient_address: "99 Hai Ba Trung, Q3".to_string(),
        ..create_test_form()
    };
    let edited = h.manager.edit(order.id, form).await.unwrap();
    assert_eq!(edited.current_status, OrderStatus::PickedUp);
    assert_eq!(edited.recipient.address, "99 Hai Ba Trung, Q3");

    let shipment = h.store.find_shipment(order.id).await.unwrap().unwrap();
    assert_eq!(shipment.effective_status(), Some(OrderStatus::PickedUp));

    let kinds: Vec<NotificationKind> = h
        .views
        .notifications(&order.order_code)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.kind)
        .collect();
    assert_eq!(kinds, vec![NotificationKind::OrderCreated, NotificationKind::OrderUpdated]);

    let form = OrderForm {
        current_status: Some("DELIVERED".to_string()),
        ..create_test_form()
    };
    let err = h.manager.edit(order.id, form).await.unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_lost_race_reports_conflict() {
    let inner = Arc::new(InMemoryStore::new());
    let orders = Arc::new(RacingOrders {
        inner: inner.clone(),
        interloper: OrderStatus::Cancelled,
        raced: AtomicU32::new(0),
    });
    let manager = wired(orders, inner.clone(), inner.clone(), inner.clone(), Arc::new(Metrics::new().unwrap()));

    let order = manager.create(create_test_form()).await.unwrap();
    let err = manager.transition(order.id, OrderStatus::PickedUp).await.unwrap_err();

    assert_eq!(
        err,
        LifecycleError::Conflict {
            expected: OrderStatus::PendingPickup,
            actual: OrderStatus::Cancelled,
        }
    );
    let shipment = inner.find_shipment(order.id).await.unwrap().unwrap();
    assert_eq!(shipment.status_history.len(), 1);
}

#[tokio::test]
async fn test_concurrent_same_status_edit_is_not_overwritten() {
    let inner = Arc::new(InMemoryStore::new());
    let orders = Arc::new(InterleavedEdits {
        inner: inner.clone(),
        raced: AtomicU32::new(0),
    });
    let manager = wired(orders, inner.clone(), inner.clone(), inner.clone(), Arc::new(Metrics::new().unwrap()));

    let order = manager.create(create_test_form()).await.unwrap();
    let form = OrderForm {
        recipient_address: "99 Hai Ba Trung, Q3".to_string(),
        ..create_test_form()
    };
    let err = manager.edit(order.id, form).await.unwrap_err();

    assert_eq!(
        err,
        LifecycleError::Conflict {
            expected: OrderStatus::PendingPickup,
            actual: OrderStatus::PendingPickup,
        }
    );
    let stored = inner.find_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.recipient.phone, "0911222333");
    assert_eq!(stored.version, 2);
}

#[tokio::test]
async fn test_retried_code_allocation_keeps_its_number() {
    let inner = Arc::new(InMemoryStore::new());
    let counters = Arc::new(LostReplyCounter {
        inner: inner.clone(),
        replies_lost: AtomicU32::new(0),
    });
    let manager = wired(inner.clone(), counters, inner.clone(), inner.clone(), Arc::new(Metrics::new().unwrap()));

    // first create retries after its reply was lost; the other writer holds 0002
    let first = manager.create(create_test_form()).await.unwrap();
    assert_eq!(first.order_code, "VT202501150001");

    let next = manager.create(create_test_form()).await.unwrap();
    assert_eq!(next.order_code, "VT202501150003");
}

#[tokio::test]
async fn test_permanently_lost_history_entry_does_not_block_later_ones() {
    let inner = Arc::new(InMemoryStore::new());
    let shipments = Arc::new(DroppingShipments {
        inner: inner.clone(),
        status: OrderStatus::PickedUp,
        dropped: AtomicU32::new(0),
    });
    let metrics = Arc::new(Metrics::new().unwrap());
    let manager = wired(inner.clone(), inner.clone(), shipments, inner.clone(), metrics.clone());

    let order = manager.create(create_test_form()).await.unwrap();
    manager.transition(order.id, OrderStatus::PickedUp).await.unwrap();
    assert_eq!(hook_failures(&metrics, "shipment_history"), 1.0);

    manager.transition(order.id, OrderStatus::InTransit).await.unwrap();
    manager.transition(order.id, OrderStatus::Delivering).await.unwrap();

    let shipment = inner.find_shipment(order.id).await.unwrap().unwrap();
    let statuses: Vec<String> = shipment.status_history.iter().map(|e| e.status.to_string()).collect();
    assert_eq!(statuses, vec!["CREATED", "PICKED_UP", "IN_TRANSIT", "DELIVERING"]);
    assert_eq!(hook_failures(&metrics, "shipment_history"), 1.0);
    assert!(shipment.is_chronological());
}

#[tokio::test]
async fn test_cod_follows_order_to_delivery() {
    let h = harness();
    let delivered = h.manager.create(create_test_form()).await.unwrap();
    let cancelled = h.manager.create(create_test_form()).await.unwrap();

    for status in [OrderStatus::PickedUp, OrderStatus::InTransit, OrderStatus::Delivering, OrderStatus::Delivered] {
        h.manager.transition(delivered.id, status).await.unwrap();
    }
    h.manager.transition(cancelled.id, OrderStatus::Cancelled).await.unwrap();

    assert_eq!(h.views.cod_total().await.unwrap(), 250000.0);

    let dashboard = h.views.dashboard().await.unwrap();
    assert_eq!(dashboard.total_orders, 2);
    assert_eq!(dashboard.cod_total, 250000.0);
    assert_eq!(dashboard.recent_orders.len(), 2);
    assert_eq!(dashboard.orders_by_status.len(), 2);
}

#[tokio::test]
async fn test_counter_outage_aborts_create() {
    let inner = Arc::new(InMemoryStore::new());
    let manager = wired(
        inner.clone(),
        Arc::new(DownCounter),
        inner.clone(),
        inner.clone(),
        Arc::new(Metrics::new().unwrap()),
    );

    let err = manager.create(create_test_form()).await.unwrap_err();
    assert!(matches!(err, LifecycleError::StoreUnavailable(StoreError::Timeout(_))));
    assert_eq!(inner.count_orders(&OrderFilter::default()).await.unwrap(), 0);

    let explicit = OrderForm {
        order_code: Some("VTP202510000".to_string()),
        ..create_test_form()
    };
    assert!(manager.create(explicit).await.is_ok());
}

#[tokio::test]
async fn test_history_append_retries_until_it_lands() {
    let inner = Arc::new(InMemoryStore::new());
    let shipments = Arc::new(FlakyShipments {
        inner: inner.clone(),
        failures_left: AtomicU32::new(2),
    });
    let metrics = Arc::new(Metrics::new().unwrap());
    let manager = wired(inner.clone(), inner.clone(), shipments, inner.clone(), metrics.clone());

    let order = manager.create(create_test_form()).await.unwrap();
    manager.transition(order.id, OrderStatus::PickedUp).await.unwrap();

    let shipment = inner.find_shipment(order.id).await.unwrap().unwrap();
    assert_eq!(shipment.status_history.len(), 2);
    assert_eq!(hook_failures(&metrics, "shipment_history"), 0.0);
}

#[tokio::test]
async fn test_notification_outage_is_swallowed() {
    let inner = Arc::new(InMemoryStore::new());
    let metrics = Arc::new(Metrics::new().unwrap());
    let manager = wired(
        inner.clone(),
        inner.clone(),
        inner.clone(),
        Arc::new(DownNotifications),
        metrics.clone(),
    );

    let order = manager.create(create_test_form()).await.unwrap();
    let picked = manager.transition(order.id, OrderStatus::PickedUp).await.unwrap();
    assert_eq!(picked.current_status, OrderStatus::PickedUp);

    let shipment = inner.find_shipment(order.id).await.unwrap().unwrap();
    assert_eq!(shipment.status_history.len(), 2);
    assert_eq!(hook_failures(&metrics, "notifications"), 2.0);
}

#[tokio::test]
async fn test_tracking_views() {
    let h = harness();
    let first = h.manager.create(create_test_form()).await.unwrap();
    h.clock.advance(ChronoDuration::minutes(1));
    let second = h.manager.create(create_test_form()).await.unwrap();
    h.manager.transition(second.id, OrderStatus::PickedUp).await.unwrap();

    let view = h.views.track(&first.order_code).await.unwrap();
    assert_eq!(view.order.id, first.id);
    assert_eq!(view.shipment.unwrap().order_id, first.id);
    assert!(matches!(h.views.track("VT000000000000").await, Err(LifecycleError::NotFound(_))));

    let summary = h.views.summary().await.unwrap();
    assert_eq!(summary.len(), 2);
    assert!(summary.iter().all(|s| s.count == 1));

    let page = h
        .views
        .list(&ListQuery {
            limit: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!((page.total, page.pages), (2, 2));
    assert_eq!(page.data[0].id, second.id);

    let filtered = h
        .views
        .list(&ListQuery {
            status: Some("PICKED_UP".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(filtered.total, 1);
}
