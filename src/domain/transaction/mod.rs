// ============================================================================
// Transaction Domain
// ============================================================================
//
// - Value objects (TransactionKind, TransactionStatus)
// - Transaction record and its settlement rule against an order
//
// ============================================================================

pub mod value_objects;

pub use value_objects::*;
