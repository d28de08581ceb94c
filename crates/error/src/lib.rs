//! Error taxonomy shared across the iceOS runtime.
//!
//! Every fallible operation in the runtime returns (or wraps) an
//! [`IceError`]. The taxonomy classifies errors along two axes a caller
//! actually needs: whether a retry is worth attempting
//! ([`IceError::is_retryable`]) and a stable machine-readable code for API
//! surfaces ([`IceError::error_code`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The full error taxonomy consumed by the node executor, scheduler, and
/// registry.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IceError {
    /// A blueprint failed structural or schema validation.
    #[error("blueprint invalid: {reason}")]
    ValidationError { reason: String },

    /// The dependency graph of a blueprint contains a cycle.
    #[error("circular dependency through node {node_id}")]
    CircularDependency { node_id: String },

    /// A blueprint mixes an `airgap` node with one requiring external I/O.
    #[error("node {node_id} requires external I/O but the blueprint is airgapped")]
    AirgapViolation { node_id: String },

    /// Registry lookup or registration failed.
    #[error("registry error: {reason}")]
    RegistryError { reason: String },

    /// An `input_mappings` source could not be resolved.
    #[error("could not resolve input for node {node_id}: {reason}")]
    InputUnresolvedError { node_id: String, reason: String },

    /// A node's output failed its declared `output_schema`.
    #[error("output of node {node_id} failed schema validation: {reason}")]
    OutputSchemaError { node_id: String, reason: String },

    /// A transient failure (network blip, 5xx) worth retrying.
    #[error("transient failure: {reason}")]
    Transient { reason: String },

    /// An upstream provider signaled rate limiting.
    #[error("rate limited{}", retry_after_ms.map(|ms| format!(", retry after {ms}ms")).unwrap_or_default())]
    RateLimited { retry_after_ms: Option<u64> },

    /// A node or the overall run exceeded its wall-clock deadline.
    #[error("timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The run or node was cancelled, optionally because an upstream
    /// dependency failed.
    #[error("cancelled{}", reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    Canceled { reason: Option<String> },

    /// A configured budget limit was exceeded.
    #[error("budget exceeded: {counter}")]
    BudgetExceeded { counter: String },

    /// A node attempted an action outside its granted capabilities.
    #[error("sandbox violation: {capability} not granted to {node_id}")]
    SandboxViolation { node_id: String, capability: String },

    /// A node exceeded a resource cap (memory, CPU, payload size).
    #[error("resource exceeded: {resource}")]
    ResourceExceeded { resource: String },

    /// Catch-all for invariant violations that should never happen in
    /// correct operation.
    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl IceError {
    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::ValidationError { reason: reason.into() }
    }

    #[must_use]
    pub fn registry(reason: impl Into<String>) -> Self {
        Self::RegistryError { reason: reason.into() }
    }

    #[must_use]
    pub fn input_unresolved(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InputUnresolvedError { node_id: node_id.into(), reason: reason.into() }
    }

    #[must_use]
    pub fn output_schema(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OutputSchemaError { node_id: node_id.into(), reason: reason.into() }
    }

    #[must_use]
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient { reason: reason.into() }
    }

    #[must_use]
    pub fn canceled(reason: Option<String>) -> Self {
        Self::Canceled { reason }
    }

    #[must_use]
    pub fn budget_exceeded(counter: impl Into<String>) -> Self {
        Self::BudgetExceeded { counter: counter.into() }
    }

    #[must_use]
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal { reason: reason.into() }
    }

    #[must_use]
    pub fn resource_exceeded(resource: impl Into<String>) -> Self {
        Self::ResourceExceeded { resource: resource.into() }
    }

    #[must_use]
    pub fn sandbox_violation(node_id: impl Into<String>, capability: impl Into<String>) -> Self {
        Self::SandboxViolation { node_id: node_id.into(), capability: capability.into() }
    }

    /// Whether the failure is plausibly transient and worth a retry per the
    /// node's `retry_policy`.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::RateLimited { .. } | Self::Timeout { .. })
    }

    /// A stable, machine-readable code for event payloads and API surfaces.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ValidationError { .. } => "validation_error",
            Self::CircularDependency { .. } => "circular_dependency",
            Self::AirgapViolation { .. } => "airgap_violation",
            Self::RegistryError { .. } => "registry_error",
            Self::InputUnresolvedError { .. } => "input_unresolved",
            Self::OutputSchemaError { .. } => "output_schema_error",
            Self::Transient { .. } => "transient",
            Self::RateLimited { .. } => "rate_limited",
            Self::Timeout { .. } => "timeout",
            Self::Canceled { .. } => "canceled",
            Self::BudgetExceeded { .. } => "budget_exceeded",
            Self::SandboxViolation { .. } => "sandbox_violation",
            Self::ResourceExceeded { .. } => "resource_exceeded",
            Self::Internal { .. } => "internal",
        }
    }

    /// The HTTP status an API surface would map this onto, per the failure
    /// code table.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ValidationError { .. }
            | Self::CircularDependency { .. }
            | Self::AirgapViolation { .. }
            | Self::InputUnresolvedError { .. }
            | Self::OutputSchemaError { .. } => 400,
            Self::RegistryError { .. } => 404,
            Self::BudgetExceeded { .. } => 402,
            Self::Canceled { .. } => 409,
            Self::Transient { .. } | Self::RateLimited { .. } | Self::Timeout { .. } => 503,
            Self::SandboxViolation { .. } | Self::ResourceExceeded { .. } => 403,
            Self::Internal { .. } => 500,
        }
    }

    /// Attaches a JSON detail payload, used when surfacing an error to an
    /// event stream subscriber.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
            "retryable": self.is_retryable(),
        })
    }
}

/// Convenience alias used throughout the runtime crates.
pub type Result<T> = std::result::Result<T, IceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(IceError::transient("boom").is_retryable());
        assert!(IceError::Timeout { elapsed_ms: 5 }.is_retryable());
        assert!(IceError::RateLimited { retry_after_ms: None }.is_retryable());
    }

    #[test]
    fn non_retryable_kinds() {
        assert!(!IceError::validation("bad").is_retryable());
        assert!(!IceError::budget_exceeded("max_llm_calls").is_retryable());
        assert!(!IceError::canceled(None).is_retryable());
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(IceError::validation("x").error_code(), "validation_error");
        assert_eq!(IceError::budget_exceeded("x").error_code(), "budget_exceeded");
        assert_eq!(
            IceError::SandboxViolation { node_id: "n1".into(), capability: "network".into() }
                .error_code(),
            "sandbox_violation"
        );
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(IceError::validation("x").http_status(), 400);
        assert_eq!(IceError::budget_exceeded("x").http_status(), 402);
        assert_eq!(IceError::internal("x").http_status(), 500);
    }

    #[test]
    fn payload_contains_code_and_message() {
        let err = IceError::transient("network blip");
        let payload = err.to_payload();
        assert_eq!(payload["code"], "transient");
        assert_eq!(payload["retryable"], true);
    }

    #[test]
    fn serde_roundtrip() {
        let err = IceError::Timeout { elapsed_ms: 1200 };
        let json = serde_json::to_string(&err).unwrap();
        let back: IceError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.error_code(), err.error_code());
    }
}
