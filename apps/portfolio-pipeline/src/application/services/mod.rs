//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `pipeline`: the aggregation event loop and its handle
//! - `reload`: outstanding-fetch tracking behind the reloading flag
//! - `refresh`: periodic source refresh

pub mod pipeline;
pub mod refresh;
pub mod reload;

pub use pipeline::{
    AggregationPipeline, DEFAULT_SEARCH_DEBOUNCE, PipelineError, PipelineHandle, PipelineSettings,
};
pub use refresh::spawn_periodic_refresh;
pub use reload::{Feed, ReloadTracker};
