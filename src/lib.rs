pub mod api;
pub mod config;
pub mod directory;
pub mod domain;
pub mod lifecycle;
pub mod metrics;
pub mod store;
pub mod utils;
pub mod views;
