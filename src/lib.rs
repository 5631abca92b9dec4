//! Retry-aware reload and health monitoring for managed search-engine cores.
//!
//! - [`reload::CoreReloader`] reloads a core and confirms it came back
//! - [`monitor::CoreStatusMonitor`] runs interval-gated status and schema drift checks
//! - [`schema::SchemaValidator`] checks a configuration set before upload

pub mod admin;
pub mod bootstrap;
pub mod client;
pub mod config;
pub mod identity;
pub mod monitor;
pub mod notify;
pub mod reload;
pub mod schema;
pub mod state;
pub mod stats;
pub mod telemetry;
