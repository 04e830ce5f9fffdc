// ============================================================================
// Domain Layer - Records and Business Rules
// ============================================================================
//
// Each record type has its own subdirectory. Nothing in here performs I/O;
// persistence lives in `crate::store` and orchestration in `crate::lifecycle`.
//
// ============================================================================

pub mod order;
pub mod shipment;
pub mod notification;
pub mod transaction;
pub mod network;
