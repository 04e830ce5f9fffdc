// ============================================================================
// Order Domain
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (OrderStatus, ContactInfo, Parcel, Financials)
// - Commands (OrderForm, TransitionRequest, numeric coercion policy)
// - Aggregate (Order record with derived-field rules)
// - Transitions (StatusTransitionValidator)
//
// ============================================================================

pub mod value_objects;
pub mod commands;
pub mod aggregate;
pub mod transitions;

// Re-export for convenience
pub use value_objects::*;
pub use commands::*;
pub use aggregate::*;
pub use transitions::*;
