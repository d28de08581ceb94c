use serde::{Deserialize, Serialize};

/// A single grant checked before a node is allowed to perform a
/// capability-restricted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Capability {
    /// Outbound network access, optionally restricted to a host pattern
    /// (supports `*` and `*.suffix` wildcards).
    Network { host_pattern: String },
    /// Filesystem access, optionally read-only and/or path-prefixed.
    FileSystem { path_prefix: String, read_only: bool },
    /// A named external resource handle (database connection, queue, ...).
    Resource { name: String },
    /// Access to a named credential.
    Credential { key: String },
    /// An address-space cap in bytes.
    MaxMemory { bytes: u64 },
    /// A CPU-time cap in milliseconds.
    MaxCpuTime { millis: u64 },
    /// A single environment variable the sandbox may read.
    Environment { name: String },
}

/// How strictly a node's execution is isolated from the host process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// No isolation; used for trusted built-in executors.
    None,
    /// Capability checks are enforced but the node runs in-process.
    #[default]
    CapabilityGated,
    /// The node runs in a separate sandboxed runtime (WASM for `code`).
    Isolated,
}

/// Checks whether `granted` covers `required`, per capability kind. A
/// `FileSystem` grant covers a narrower or equally-scoped request (same or
/// longer path prefix, read-only granted covers a read-only request but
/// never a write request).
#[must_use]
pub fn capabilities_match(granted: &[Capability], required: &Capability) -> bool {
    granted.iter().any(|g| single_match(g, required))
}

fn single_match(granted: &Capability, required: &Capability) -> bool {
    match (granted, required) {
        (Capability::Network { host_pattern }, Capability::Network { host_pattern: req }) => {
            host_matches(host_pattern, req)
        }
        (
            Capability::FileSystem { path_prefix, read_only },
            Capability::FileSystem { path_prefix: req_prefix, read_only: req_read_only },
        ) => {
            if *req_read_only && !*read_only {
                // granted is read-write, request is read-only: fine.
            } else if !*req_read_only && *read_only {
                return false;
            }
            req_prefix.starts_with(path_prefix.as_str())
        }
        (Capability::Resource { name }, Capability::Resource { name: req }) => name == req,
        (Capability::Credential { key }, Capability::Credential { key: req }) => key == req,
        (Capability::MaxMemory { bytes }, Capability::MaxMemory { bytes: req }) => bytes >= req,
        (Capability::MaxCpuTime { millis }, Capability::MaxCpuTime { millis: req }) => millis >= req,
        (Capability::Environment { name }, Capability::Environment { name: req }) => name == req,
        _ => false,
    }
}

/// Wildcard host matching: `*` matches anything, `*.suffix` matches any
/// subdomain of `suffix` (and `suffix` itself), anything else is an exact
/// match.
#[must_use]
pub fn host_matches(pattern: &str, host: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return host == suffix || host.ends_with(&format!(".{suffix}"));
    }
    pattern == host
}
