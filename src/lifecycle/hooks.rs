use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus};

// ============================================================================
// Post-Commit Hooks
// ============================================================================
//
// Hooks run after the authoritative order write has landed, in registration
// order. A failing hook is logged and counted by the manager; it never fails
// or rolls back the operation that triggered it.
//
// ============================================================================

/// A committed status change (or an edit, where `previous` may equal `current`)
#[derive(Debug, Clone)]
pub struct TransitionEvent {
    /// The order as stored after the write
    pub order: Order,
    pub previous: OrderStatus,
    pub current: OrderStatus,
    pub actor: Option<String>,
    pub location: Option<String>,
    /// Reported field time, or the commit time when none was reported
    pub occurred_at: DateTime<Utc>,
    /// Id of the history entry this event produces; fixed across retries
    pub entry_id: Uuid,
}

impl TransitionEvent {
    pub fn status_changed(&self) -> bool {
        self.previous != self.current
    }
}

#[async_trait]
pub trait TransitionHook: Send + Sync {
    fn name(&self) -> &'static str;

    async fn after_create(&self, _order: &Order) -> anyhow::Result<()> {
        Ok(())
    }

    async fn after_transition(&self, _event: &TransitionEvent) -> anyhow::Result<()> {
        Ok(())
    }

    async fn after_edit(&self, _event: &TransitionEvent) -> anyhow::Result<()> {
        Ok(())
    }
}
