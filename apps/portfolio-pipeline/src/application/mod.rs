//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the aggregation pipeline and the port interfaces
//! through which it reaches its data sources and the holdings store.

/// Port interfaces for external collaborators (sources, store, notifier).
pub mod ports;

/// Pipeline, reload tracking, and periodic refresh.
pub mod services;
