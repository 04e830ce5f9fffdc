// ============================================================================
// Order Lifecycle Engine
// ============================================================================
//
// - SequenceAllocator        daily order codes from the store's counter
// - OrderLifecycleManager    create, transition, edit, soft delete
// - ShipmentHistoryRecorder  post-commit hook: append-only tracking trail
// - NotificationEmitter      post-commit hook: notification records
// - CodLedger                post-commit hook: cash-on-delivery transactions
//
// ============================================================================

pub mod clock;
pub mod errors;
pub mod history;
pub mod hooks;
pub mod ledger;
pub mod manager;
pub mod notifications;
pub mod sequence;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::LifecycleError;
pub use history::{HistoryError, ShipmentHistoryRecorder};
pub use hooks::{TransitionEvent, TransitionHook};
pub use ledger::CodLedger;
pub use manager::OrderLifecycleManager;
pub use notifications::NotificationEmitter;
pub use sequence::{business_day, SequenceAllocator};

use std::sync::Arc;
use std::time::Duration;

use crate::metrics::Metrics;
use crate::store::TrackingStore;
use crate::utils::RetryConfig;

#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Business timezone used to pick the day of an order code
    pub business_utc_offset_hours: i32,
    /// Upper bound on any single store call
    pub store_timeout: Duration,
    pub allocator_retry: RetryConfig,
    pub history_retry: RetryConfig,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            business_utc_offset_hours: 7,
            store_timeout: Duration::from_millis(2000),
            allocator_retry: RetryConfig::with_attempts(3),
            history_retry: RetryConfig::with_attempts(5),
        }
    }
}

/// Wire the manager over one store, with history, notification and COD ledger hooks
pub fn build_manager<S>(
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
    settings: LifecycleSettings,
) -> OrderLifecycleManager
where
    S: TrackingStore + 'static,
{
    let allocator = SequenceAllocator::new(
        store.clone(),
        settings.allocator_retry.clone(),
        settings.store_timeout,
        metrics.clone(),
    );
    let history = ShipmentHistoryRecorder::new(
        store.clone(),
        clock.clone(),
        settings.history_retry.clone(),
        settings.store_timeout,
    );
    let notifications = NotificationEmitter::new(store.clone(), clock.clone(), settings.store_timeout);
    let ledger = CodLedger::new(store.clone(), clock.clone(), settings.store_timeout);

    OrderLifecycleManager::new(store, allocator, clock, metrics, settings)
        .with_hook(Arc::new(history))
        .with_hook(Arc::new(notifications))
        .with_hook(Arc::new(ledger))
}
