//! Process-wide `tracing` subscriber setup.
//!
//! One format toggle, mirroring `iceos_execution::RuntimeConfig::event_json_stdout`:
//! human-readable compact lines for a terminal, or JSON lines for a log
//! collector. Filtering is controlled the usual way, via `RUST_LOG`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global `tracing` subscriber. Call once, at process startup.
///
/// `json` selects the output format; pass
/// `RuntimeConfig::from_env().event_json_stdout` to honor
/// `ICE_EVENT_JSON_STDOUT`. Returns an error string if a subscriber is
/// already installed rather than panicking, since test binaries may call
/// this more than once across the same process.
pub fn init_tracing(json: bool) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry.with(fmt::layer().json().with_current_span(false)).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };

    result.map_err(|err| err.to_string())
}
