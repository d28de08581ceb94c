//! Per-run event bus fanning `iceos_execution::Event` out to subscribers,
//! plus the in-memory metrics registry the scheduler records node and run
//! counters into.

mod event;
mod metrics;
mod tracing_init;

pub use event::{EventBus, EventSubscriber};
pub use metrics::{Counter, Gauge, Histogram, MetricsRegistry};
pub use tracing_init::init_tracing;
