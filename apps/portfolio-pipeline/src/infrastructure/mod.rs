//! Infrastructure Layer - Adapters and ambient services.
//!
//! - `memory`, `fixture`, `notify`: port implementations
//! - `config`, `telemetry`, `metrics`, `health`: process plumbing

/// Configuration loading from environment.
pub mod config;

/// JSON-file-backed coin and market sources.
pub mod fixture;

/// HTTP health, readiness, and metrics endpoint.
pub mod health;

/// In-memory holdings store and hand-fed sources.
pub mod memory;

/// Prometheus metrics.
pub mod metrics;

/// Reload cue implementations.
pub mod notify;

/// Tracing subscriber and OpenTelemetry export.
pub mod telemetry;
