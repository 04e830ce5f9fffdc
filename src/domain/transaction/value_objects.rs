use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus};

// ============================================================================
// Transaction Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    CodCollection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Cash-on-delivery money owed for one order. At most one per order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub order_id: Uuid,
    pub order_code: String,
    #[serde(rename = "transaction_type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    fn cod_collection(order: &Order, status: TransactionStatus, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: order.id,
            order_code: order.order_code.clone(),
            kind: TransactionKind::CodCollection,
            amount: order.financials.cod_amount(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status != TransactionStatus::Pending
    }

    pub fn counts_toward_cod_total(&self) -> bool {
        self.kind == TransactionKind::CodCollection && self.status == TransactionStatus::Completed
    }
}

/// Bring an order's COD transaction in line with the order as stored.
///
/// Delivery completes it, cancellation voids it, and while the order is open
/// the amount follows the order's COD amount. Settled transactions are never
/// touched. Returns `None` when nothing needs writing.
pub fn settle(existing: Option<&Transaction>, order: &Order, now: DateTime<Utc>) -> Option<Transaction> {
    let cod = order.financials.cod_amount();

    let Some(current) = existing else {
        return match order.current_status {
            _ if cod <= 0.0 => None,
            OrderStatus::Cancelled => None,
            OrderStatus::Delivered => Some(Transaction::cod_collection(order, TransactionStatus::Completed, now)),
            _ => Some(Transaction::cod_collection(order, TransactionStatus::Pending, now)),
        };
    };

    if current.is_settled() {
        return None;
    }

    let status = match order.current_status {
        OrderStatus::Delivered => TransactionStatus::Completed,
        OrderStatus::Cancelled => TransactionStatus::Cancelled,
        _ if cod <= 0.0 => TransactionStatus::Cancelled,
        _ => TransactionStatus::Pending,
    };
    let amount = if status == TransactionStatus::Cancelled { current.amount } else { cod };

    if status == current.status && amount == current.amount {
        return None;
    }

    Some(Transaction {
        amount,
        status,
        updated_at: now,
        ..current.clone()
    })
}

/// Sum of completed COD collections
pub fn cod_total<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> f64 {
    transactions
        .into_iter()
        .filter(|t| t.counts_toward_cod_total())
        .map(|t| t.amount)
        .sum()
}
