// ============================================================================
// Network Domain
// ============================================================================
//
// Post offices and shippers that orders move between:
// - Value objects (PostOffice, OfficeAddress, Shipper, ShipperStatus)
// - Commands (PostOfficeForm, ShipperForm)
//
// ============================================================================

pub mod value_objects;
pub mod commands;

pub use value_objects::*;
pub use commands::*;
