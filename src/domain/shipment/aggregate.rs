use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus};
use super::value_objects::{describe, HistoryEntry, HistoryStatus};

// ============================================================================
// Shipment - Tracking record linked 1:1 to an order
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub order_id: Uuid,
    pub tracking_code: String,
    pub status_history: Vec<HistoryEntry>,
}

impl Shipment {
    /// New shipment with a single `CREATED` entry at the order's creation time
    pub fn initialize(order: &Order) -> Self {
        let entry = HistoryEntry::new(
            HistoryStatus::Created,
            describe(HistoryStatus::Created, None),
            order.created_at,
        )
        .with_location(Some("Online".to_string()))
        .for_order_version(order.version);

        Self {
            order_id: order.id,
            tracking_code: order.tracking_code.clone(),
            status_history: vec![entry],
        }
    }

    pub fn last_entry(&self) -> Option<&HistoryEntry> {
        self.status_history.last()
    }

    /// Order status implied by the tail of the history
    pub fn effective_status(&self) -> Option<OrderStatus> {
        self.last_entry().map(|entry| entry.status.effective())
    }

    pub fn contains_entry(&self, entry_id: Uuid) -> bool {
        self.status_history.iter().any(|entry| entry.id == entry_id)
    }

    /// An entry for `order_version` or a later one is already recorded
    pub fn records_version(&self, order_version: u64) -> bool {
        self.status_history
            .iter()
            .any(|entry| entry.order_version.is_some_and(|v| v >= order_version))
    }

    /// Timestamps never decrease along the history
    pub fn is_chronological(&self) -> bool {
        self.status_history
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    }
}
