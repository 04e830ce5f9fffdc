// ============================================================================
// Shipment Domain
// ============================================================================
//
// - Value objects (HistoryStatus, HistoryEntry)
// - Aggregate (Shipment with its append-only status history)
//
// ============================================================================

pub mod value_objects;
pub mod aggregate;

pub use value_objects::*;
pub use aggregate::*;
