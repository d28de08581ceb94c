use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use iceos_error::IceError;

/// Per-run caps; `None` means unbounded for that counter.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BudgetLimits {
    pub max_llm_calls: Option<u32>,
    pub max_tool_executions: Option<u32>,
    pub org_budget_usd: Option<f64>,
}

/// Whether exceeding a limit aborts the node (`FailClosed`, production
/// default) or is logged and allowed through (`FailOpen`, development only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPolicy {
    FailOpen,
    FailClosed,
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        Self::FailClosed
    }
}

/// Mutable per-run counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BudgetState {
    pub llm_calls: u32,
    pub tool_execs: u32,
    pub total_cost_usd: f64,
}

/// Enforces [`BudgetLimits`] against a mutable [`BudgetState`], consulted by
/// the node executor immediately before LLM/tool dispatch.
pub struct BudgetEnforcer {
    limits: BudgetLimits,
    policy: BudgetPolicy,
    state: Mutex<BudgetState>,
}

impl BudgetEnforcer {
    #[must_use]
    pub fn new(limits: BudgetLimits, policy: BudgetPolicy) -> Self {
        Self { limits, policy, state: Mutex::new(BudgetState::default()) }
    }

    /// Reserves one LLM call slot, enforcing `max_llm_calls`. Called before
    /// dispatch so a call that would exceed the budget never reaches the
    /// provider; the actual cost is only known afterward, so it is recorded
    /// separately via [`Self::record_llm_cost`].
    pub fn reserve_llm_call(&self) -> Result<(), IceError> {
        let mut state = self.state.lock();
        let would_exceed = self.limits.max_llm_calls.is_some_and(|max| state.llm_calls + 1 > max);
        if would_exceed && self.policy == BudgetPolicy::FailClosed {
            return Err(IceError::budget_exceeded("max_llm_calls"));
        }
        state.llm_calls += 1;
        Ok(())
    }

    /// Adds a completed call's cost, enforcing `org_budget_usd`. The cost is
    /// always recorded even when the limit is exceeded; only the caller's
    /// next dispatch is blocked.
    pub fn record_llm_cost(&self, cost_usd: f64) -> Result<(), IceError> {
        let mut state = self.state.lock();
        let would_exceed = self.limits.org_budget_usd.is_some_and(|max| state.total_cost_usd + cost_usd > max);
        state.total_cost_usd += cost_usd;
        if would_exceed && self.policy == BudgetPolicy::FailClosed {
            return Err(IceError::budget_exceeded("org_budget_usd"));
        }
        Ok(())
    }

    /// Registers a tool execution, enforcing `max_tool_executions`.
    pub fn register_tool_exec(&self) -> Result<(), IceError> {
        let mut state = self.state.lock();
        let would_exceed = self.limits.max_tool_executions.is_some_and(|max| state.tool_execs + 1 > max);
        if would_exceed && self.policy == BudgetPolicy::FailClosed {
            return Err(IceError::budget_exceeded("max_tool_executions"));
        }
        state.tool_execs += 1;
        Ok(())
    }

    #[must_use]
    pub fn get_status(&self) -> BudgetState {
        *self.state.lock()
    }
}
