//! Environment-driven runtime configuration.
//!
//! Mirrors the handful of knobs the rest of the runtime actually reads:
//! whether this deployment is production (gates auto-approval and similar
//! development-only fallbacks) and the per-run budget caps. There is no
//! global mutable instance — a caller builds one `RuntimeConfig` and
//! threads it through explicitly.

use std::env;

use crate::budget::{BudgetLimits, BudgetPolicy};

/// Whether this process is a production deployment. Gates fallbacks that
/// are only safe outside production, such as auto-approving `human` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeMode {
    Development,
    #[default]
    Production,
}

impl RuntimeMode {
    #[must_use]
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Process-wide knobs read once at startup and passed explicitly into the
/// scheduler and executors that need them.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub runtime_mode: RuntimeMode,
    /// Whether structured logs should be emitted as JSON lines rather than
    /// the default human-readable format. Consumed by
    /// `iceos_telemetry::init_tracing`.
    pub event_json_stdout: bool,
    pub budget_fail_open: bool,
    pub org_budget_usd: Option<f64>,
    pub max_llm_calls: Option<u32>,
    pub max_tool_executions: Option<u32>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            runtime_mode: RuntimeMode::Production,
            event_json_stdout: false,
            budget_fail_open: false,
            org_budget_usd: None,
            max_llm_calls: None,
            max_tool_executions: None,
        }
    }
}

impl RuntimeConfig {
    /// Reads every knob from the environment, falling back to
    /// [`RuntimeConfig::default`] for anything unset or unparseable.
    /// `ICE_RUNTIME_MODE`, `ICE_EVENT_JSON_STDOUT`, `BUDGET_FAIL_OPEN`,
    /// `ORG_BUDGET_USD`, `ICE_MAX_LLM_CALLS`, `ICE_MAX_TOOL_EXECUTIONS`.
    #[must_use]
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            runtime_mode: env::var("ICE_RUNTIME_MODE").map(|v| RuntimeMode::parse(&v)).unwrap_or(default.runtime_mode),
            event_json_stdout: env::var("ICE_EVENT_JSON_STDOUT").ok().map(|v| parse_bool(&v)).unwrap_or(default.event_json_stdout),
            budget_fail_open: env::var("BUDGET_FAIL_OPEN").ok().map(|v| parse_bool(&v)).unwrap_or(default.budget_fail_open),
            org_budget_usd: env::var("ORG_BUDGET_USD").ok().and_then(|v| v.parse().ok()).or(default.org_budget_usd),
            max_llm_calls: env::var("ICE_MAX_LLM_CALLS").ok().and_then(|v| v.parse().ok()).or(default.max_llm_calls),
            max_tool_executions: env::var("ICE_MAX_TOOL_EXECUTIONS").ok().and_then(|v| v.parse().ok()).or(default.max_tool_executions),
        }
    }

    #[must_use]
    pub fn budget_policy(&self) -> BudgetPolicy {
        if self.budget_fail_open {
            BudgetPolicy::FailOpen
        } else {
            BudgetPolicy::FailClosed
        }
    }

    #[must_use]
    pub fn budget_limits(&self) -> BudgetLimits {
        BudgetLimits {
            max_llm_calls: self.max_llm_calls,
            max_tool_executions: self.max_tool_executions,
            org_budget_usd: self.org_budget_usd,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_production_fail_closed() {
        let cfg = RuntimeConfig::default();
        assert!(cfg.runtime_mode.is_production());
        assert_eq!(cfg.budget_policy(), BudgetPolicy::FailClosed);
    }

    #[test]
    fn unrecognized_mode_string_falls_back_to_development() {
        assert_eq!(RuntimeMode::parse("staging"), RuntimeMode::Development);
        assert_eq!(RuntimeMode::parse("Production"), RuntimeMode::Production);
    }

    #[test]
    fn parse_bool_accepts_common_truthy_spellings() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(parse_bool("YES"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn budget_limits_carries_every_cap_through() {
        let cfg = RuntimeConfig { org_budget_usd: Some(5.0), max_llm_calls: Some(3), max_tool_executions: Some(4), ..Default::default() };
        let limits = cfg.budget_limits();
        assert_eq!(limits.max_llm_calls, Some(3));
        assert_eq!(limits.max_tool_executions, Some(4));
        assert!((limits.org_budget_usd.unwrap() - 5.0).abs() < f64::EPSILON);
    }
}
