//! Resource sandboxing for node execution: wall-clock timeouts, best-effort
//! memory/CPU caps, and capability gating for `code` and `tool` nodes.

mod capability;
mod limits;
mod run;

pub use capability::{capabilities_match, host_matches, Capability, IsolationLevel};
pub use limits::ResourceLimits;
pub use run::{run_with_limits, SandboxError};
