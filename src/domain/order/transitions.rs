use super::value_objects::OrderStatus;

// ============================================================================
// Status Transition Validator
// ============================================================================
//
// The allowed-transition table for the delivery state machine:
//
//   PENDING_PICKUP -> PICKED_UP | CANCELLED
//   PICKED_UP      -> IN_TRANSIT | CANCELLED
//   IN_TRANSIT     -> DELIVERING | PICKED_UP
//   DELIVERING     -> DELIVERED | IN_TRANSIT | CANCELLED
//   DELIVERED      -> (terminal)
//   CANCELLED      -> (terminal)
//
// Shared by the edit path and the quick status-patch path.
//
// ============================================================================

pub struct StatusTransitionValidator;

impl StatusTransitionValidator {
    /// Successor set for a status
    pub fn successors(current: OrderStatus) -> &'static [OrderStatus] {
        match current {
            OrderStatus::PendingPickup => &[OrderStatus::PickedUp, OrderStatus::Cancelled],
            OrderStatus::PickedUp => &[OrderStatus::InTransit, OrderStatus::Cancelled],
            OrderStatus::InTransit => &[OrderStatus::Delivering, OrderStatus::PickedUp],
            OrderStatus::Delivering => &[
                OrderStatus::Delivered,
                OrderStatus::InTransit,
                OrderStatus::Cancelled,
            ],
            OrderStatus::Delivered | OrderStatus::Cancelled => &[],
        }
    }

    /// Same-status requests are allowed as no-ops
    pub fn is_allowed(current: OrderStatus, next: OrderStatus) -> bool {
        current == next || Self::successors(current).contains(&next)
    }

    /// Raw status names. An unrecognised current status has no successors.
    pub fn is_allowed_str(current: &str, next: &str) -> bool {
        match (current.parse::<OrderStatus>(), next.parse::<OrderStatus>()) {
            (Ok(current), Ok(next)) => Self::is_allowed(current, next),
            _ => false,
        }
    }
}
