use thiserror::Error;
use uuid::Uuid;

use crate::domain::order::OrderStatus;
use crate::store::StoreError;

// ============================================================================
// Lifecycle Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LifecycleError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("{kind} not found: {id}")]
    RecordNotFound { kind: &'static str, id: Uuid },

    #[error("Cannot change status from {current} to {requested}")]
    InvalidTransition {
        current: OrderStatus,
        requested: OrderStatus,
    },

    #[error("Order changed concurrently: expected status {expected}, found {actual}")]
    Conflict {
        expected: OrderStatus,
        actual: OrderStatus,
    },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(StoreError),
}

impl LifecycleError {
    /// Short label used for rejection metrics
    pub fn reason(&self) -> &'static str {
        match self {
            LifecycleError::Validation(_) => "validation",
            LifecycleError::NotFound(_) | LifecycleError::RecordNotFound { .. } => "not_found",
            LifecycleError::InvalidTransition { .. } => "invalid_transition",
            LifecycleError::Conflict { .. } => "conflict",
            LifecycleError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field, value } => {
                LifecycleError::Validation(format!("{} already in use: {}", field, value))
            }
            other => LifecycleError::StoreUnavailable(other),
        }
    }
}
