use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::order::Order;
use crate::domain::transaction::{settle, Transaction};
use crate::store::{bounded, StoreError, TransactionStore};
use super::clock::Clock;
use super::hooks::{TransitionEvent, TransitionHook};

// ============================================================================
// COD Ledger
// ============================================================================
//
// Keeps one cash-on-delivery transaction per order in step with the order
// as committed. Delivery completes it, cancellation voids it.
//
// ============================================================================

pub struct CodLedger {
    transactions: Arc<dyn TransactionStore>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl CodLedger {
    pub fn new(transactions: Arc<dyn TransactionStore>, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self {
            transactions,
            clock,
            timeout,
        }
    }

    /// Write the order's transaction if it needs to change; returns what was written
    pub async fn sync(&self, order: &Order) -> Result<Option<Transaction>, StoreError> {
        let existing = bounded(self.timeout, self.transactions.find_transaction(order.id)).await?;

        let Some(next) = settle(existing.as_ref(), order, self.clock.now()) else {
            return Ok(None);
        };
        bounded(self.timeout, self.transactions.upsert_transaction(&next)).await?;

        tracing::debug!(
            order_code = %order.order_code,
            status = next.status.as_str(),
            amount = next.amount,
            "COD transaction recorded"
        );
        Ok(Some(next))
    }
}

#[async_trait]
impl TransitionHook for CodLedger {
    fn name(&self) -> &'static str {
        "cod_ledger"
    }

    async fn after_create(&self, order: &Order) -> anyhow::Result<()> {
        self.sync(order).await?;
        Ok(())
    }

    async fn after_transition(&self, event: &TransitionEvent) -> anyhow::Result<()> {
        self.sync(&event.order).await?;
        Ok(())
    }

    async fn after_edit(&self, event: &TransitionEvent) -> anyhow::Result<()> {
        self.sync(&event.order).await?;
        Ok(())
    }
}
