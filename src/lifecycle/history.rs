use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus};
use crate::domain::shipment::{describe, HistoryEntry, HistoryStatus, Shipment};
use crate::store::{bounded, HistoryAppend, ShipmentStore, StoreError};
use crate::utils::{retry_on_transient, IsTransient, RetryConfig};
use super::clock::Clock;
use super::hooks::{TransitionEvent, TransitionHook};

// ============================================================================
// Shipment History Recorder
// ============================================================================
//
// Appends are compare-and-set on the history length and wait until the
// history ends in the event's previous status, so entries appear in commit
// order even when hooks for consecutive transitions race. Each event has a
// fixed entry id; an append that already landed is not repeated.
//
// A predecessor that never lands (its hook gave up) must not block the
// order's history for good: on the last attempt the missing status is
// filled in from the event itself, and a predecessor arriving afterwards is
// dropped because a later order version is already recorded.
//
// ============================================================================

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No shipment for order {0}")]
    MissingShipment(Uuid),

    #[error("History for order {order_id} ends in {found}, waiting for {expected}")]
    PredecessorPending {
        order_id: Uuid,
        expected: OrderStatus,
        found: OrderStatus,
    },

    #[error("History for order {0} changed during append")]
    Contended(Uuid),
}

impl IsTransient for HistoryError {
    fn is_transient(&self) -> bool {
        match self {
            HistoryError::Store(e) => e.is_transient(),
            HistoryError::MissingShipment(_) => false,
            HistoryError::PredecessorPending { .. } | HistoryError::Contended(_) => true,
        }
    }
}

pub struct ShipmentHistoryRecorder {
    shipments: Arc<dyn ShipmentStore>,
    clock: Arc<dyn Clock>,
    retry: RetryConfig,
    timeout: Duration,
}

impl ShipmentHistoryRecorder {
    pub fn new(shipments: Arc<dyn ShipmentStore>, clock: Arc<dyn Clock>, retry: RetryConfig, timeout: Duration) -> Self {
        Self {
            shipments,
            clock,
            retry,
            timeout,
        }
    }

    /// Create the shipment with its single `CREATED` entry
    pub async fn initialize(&self, order: &Order) -> Result<Shipment, HistoryError> {
        let shipment = Shipment::initialize(order);

        let candidate = &shipment;
        retry_on_transient(self.retry.clone(), "shipment_initialize", |_attempt| async move {
            match bounded(self.timeout, self.shipments.insert_shipment(candidate)).await {
                Err(StoreError::Duplicate { .. }) => Ok(()),
                other => other.map_err(HistoryError::from),
            }
        })
        .await
        .into_result()?;

        tracing::debug!(order_id = %order.id, tracking_code = %shipment.tracking_code, "Shipment initialized");
        Ok(shipment)
    }

    /// Append the entry for a committed status change
    pub async fn append(&self, event: &TransitionEvent) -> Result<Shipment, HistoryError> {
        retry_on_transient(self.retry.clone(), "history_append", |attempt| self.try_append(event, attempt))
            .await
            .into_result()
    }

    async fn try_append(&self, event: &TransitionEvent, attempt: u32) -> Result<Shipment, HistoryError> {
        let order_id = event.order.id;

        let mut shipment = bounded(self.timeout, self.shipments.find_shipment(order_id))
            .await?
            .ok_or(HistoryError::MissingShipment(order_id))?;

        if shipment.contains_entry(event.entry_id) {
            return Ok(shipment);
        }
        if shipment.records_version(event.order.version) {
            tracing::debug!(
                order_id = %order_id,
                status = %event.current,
                version = event.order.version,
                "History already past this event, skipping"
            );
            return Ok(shipment);
        }

        let found = shipment.effective_status().unwrap_or(OrderStatus::PendingPickup);
        if found != event.previous {
            if attempt < self.retry.max_attempts {
                return Err(HistoryError::PredecessorPending {
                    order_id,
                    expected: event.previous,
                    found,
                });
            }

            tracing::warn!(
                order_id = %order_id,
                expected = %event.previous,
                found = %found,
                "Predecessor entry never arrived, filling it in"
            );
            let gap = self.gap_entry_for(event, &shipment);
            shipment = self.push(order_id, &gap, &shipment).await?;
        }

        let entry = self.entry_for(event, &shipment);
        self.push(order_id, &entry, &shipment).await
    }

    /// Compare-and-set append of one entry onto `shipment` as read
    async fn push(&self, order_id: Uuid, entry: &HistoryEntry, shipment: &Shipment) -> Result<Shipment, HistoryError> {
        let expected_len = shipment.status_history.len();

        match bounded(self.timeout, self.shipments.append_history(order_id, entry, expected_len)).await? {
            HistoryAppend::Appended(updated) => {
                tracing::debug!(
                    order_id = %order_id,
                    status = %entry.status,
                    entries = updated.status_history.len(),
                    "History entry appended"
                );
                Ok(updated)
            }
            HistoryAppend::LengthMismatch(_) => Err(HistoryError::Contended(order_id)),
            HistoryAppend::Missing => Err(HistoryError::MissingShipment(order_id)),
        }
    }

    /// Stand-in for the event's predecessor, with no actor or location
    fn gap_entry_for(&self, event: &TransitionEvent, shipment: &Shipment) -> HistoryEntry {
        let status = HistoryStatus::Order(event.previous);
        HistoryEntry::new(status, describe(status, None), self.timestamp_for(event, shipment))
            .for_order_version(event.order.version.saturating_sub(1))
    }

    fn entry_for(&self, event: &TransitionEvent, shipment: &Shipment) -> HistoryEntry {
        let status = HistoryStatus::Order(event.current);
        let mut entry = HistoryEntry::new(
            status,
            describe(status, event.actor.as_deref()),
            self.timestamp_for(event, shipment),
        )
        .with_location(event.location.clone())
        .with_actor(event.actor.clone())
        .for_order_version(event.order.version);
        entry.id = event.entry_id;
        entry
    }

    /// Event time, clamped so the history stays chronological
    fn timestamp_for(&self, event: &TransitionEvent, shipment: &Shipment) -> DateTime<Utc> {
        let mut timestamp = event.occurred_at;

        if let Some(last) = shipment.last_entry() {
            if timestamp < last.timestamp {
                let clamped = self.clock.now().max(last.timestamp);
                tracing::warn!(
                    order_id = %event.order.id,
                    reported = %timestamp,
                    last_entry = %last.timestamp,
                    clamped = %clamped,
                    "Stale event timestamp clamped"
                );
                timestamp = clamped;
            }
        }

        timestamp
    }
}

#[async_trait]
impl TransitionHook for ShipmentHistoryRecorder {
    fn name(&self) -> &'static str {
        "shipment_history"
    }

    async fn after_create(&self, order: &Order) -> anyhow::Result<()> {
        self.initialize(order).await?;
        Ok(())
    }

    async fn after_transition(&self, event: &TransitionEvent) -> anyhow::Result<()> {
        self.append(event).await?;
        Ok(())
    }

    async fn after_edit(&self, event: &TransitionEvent) -> anyhow::Result<()> {
        if event.status_changed() {
            self.append(event).await?;
        }
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
