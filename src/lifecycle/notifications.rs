use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::notification::{Notification, NotificationKind};
use crate::domain::order::{Order, OrderStatus};
use crate::store::{bounded, NotificationStore, StoreError};
use super::clock::Clock;
use super::hooks::{TransitionEvent, TransitionHook};

// ============================================================================
// Notification Emitter
// ============================================================================
//
// Who hears about a status change is a fixed table. Statuses without an
// entry (and entries whose audience resolves to nobody) still leave one
// generic, unaddressed record so every change is visible per order code.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Audience {
    Sender,
    Recipient,
    AssignedShipper,
}

struct NotificationRule {
    message: &'static str,
    audience: &'static [Audience],
}

fn rule_for(status: OrderStatus) -> Option<NotificationRule> {
    match status {
        OrderStatus::PickedUp => Some(NotificationRule {
            message: "Parcel picked up by shipper",
            audience: &[Audience::Sender, Audience::AssignedShipper],
        }),
        OrderStatus::InTransit => Some(NotificationRule {
            message: "Parcel will be delivered within 30 minutes",
            audience: &[Audience::Recipient],
        }),
        OrderStatus::Delivered => Some(NotificationRule {
            message: "Parcel delivered successfully",
            audience: &[Audience::Sender],
        }),
        OrderStatus::PendingPickup | OrderStatus::Delivering | OrderStatus::Cancelled => None,
    }
}

fn resolve(order: &Order, audience: Audience) -> Option<String> {
    let addressee = match audience {
        Audience::Sender => Some(order.sender.name.as_str()),
        Audience::Recipient => Some(order.recipient.name.as_str()),
        Audience::AssignedShipper => order.assigned_shipper_code.as_deref(),
    };
    addressee.map(str::trim).filter(|a| !a.is_empty()).map(str::to_string)
}

/// Records for a creation
pub fn created_notifications(order: &Order, now: DateTime<Utc>) -> Vec<Notification> {
    vec![Notification::new(
        order.id,
        &order.order_code,
        NotificationKind::OrderCreated,
        "New order created",
        now,
    )]
}

/// Records for a status change, one per resolved addressee
pub fn transition_notifications(
    order: &Order,
    previous: OrderStatus,
    current: OrderStatus,
    now: DateTime<Utc>,
) -> Vec<Notification> {
    let kind = NotificationKind::StatusChanged(current);

    let addressed: Vec<Notification> = rule_for(current)
        .map(|rule| {
            rule.audience
                .iter()
                .filter_map(|audience| resolve(order, *audience))
                .map(|addressee| {
                    Notification::new(order.id, &order.order_code, kind, rule.message, now).addressed_to(addressee)
                })
                .collect()
        })
        .unwrap_or_default();

    if !addressed.is_empty() {
        return addressed;
    }

    vec![Notification::new(
        order.id,
        &order.order_code,
        kind,
        format!("Order status changed: {} -> {}", previous, current),
        now,
    )]
}

/// Records for a full-record edit
pub fn edited_notifications(order: &Order, now: DateTime<Utc>) -> Vec<Notification> {
    vec![Notification::new(
        order.id,
        &order.order_code,
        NotificationKind::OrderUpdated,
        format!("Order updated, status {}", order.current_status),
        now,
    )]
}

pub struct NotificationEmitter {
    notifications: Arc<dyn NotificationStore>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl NotificationEmitter {
    pub fn new(notifications: Arc<dyn NotificationStore>, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self {
            notifications,
            clock,
            timeout,
        }
    }

    pub async fn on_create(&self, order: &Order) -> Result<Vec<Notification>, StoreError> {
        self.persist(created_notifications(order, self.clock.now())).await
    }

    pub async fn on_transition(
        &self,
        order: &Order,
        previous: OrderStatus,
        current: OrderStatus,
    ) -> Result<Vec<Notification>, StoreError> {
        self.persist(transition_notifications(order, previous, current, self.clock.now()))
            .await
    }

    pub async fn on_edit(&self, order: &Order) -> Result<Vec<Notification>, StoreError> {
        self.persist(edited_notifications(order, self.clock.now())).await
    }

    async fn persist(&self, batch: Vec<Notification>) -> Result<Vec<Notification>, StoreError> {
        bounded(self.timeout, self.notifications.insert_notifications(&batch)).await?;

        if let Some(first) = batch.first() {
            tracing::debug!(
                order_code = %first.order_code,
                kind = %first.kind,
                count = batch.len(),
                "Notifications recorded"
            );
        }
        Ok(batch)
    }
}

#[async_trait]
impl TransitionHook for NotificationEmitter {
    fn name(&self) -> &'static str {
        "notifications"
    }

    async fn after_create(&self, order: &Order) -> anyhow::Result<()> {
        self.on_create(order).await?;
        Ok(())
    }

    async fn after_transition(&self, event: &TransitionEvent) -> anyhow::Result<()> {
        self.on_transition(&event.order, event.previous, event.current).await?;
        Ok(())
    }

    async fn after_edit(&self, event: &TransitionEvent) -> anyhow::Result<()> {
        self.on_edit(&event.order).await?;
        Ok(())
    }
}
