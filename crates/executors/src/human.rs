use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use iceos_core::NodeId;
use iceos_error::IceError;
use iceos_execution::{EventKind, NodeExecutionResult, NodeOutputData, RunContext, RuntimeMode};
use iceos_registry::{NodeExecutor, WorkflowRuntime};
use iceos_sandbox::{run_with_limits, ResourceLimits, SandboxError};
use iceos_workflow::{NodeKind, NodeSpec};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::support::metadata;

/// A consumed capability resolving a pending approval to `true`/`false`.
/// Production implementations poll a durable store or block on a channel
/// fed by an external approve/reject API call; [`AutoApprove`] is the
/// non-production stub that resolves immediately.
#[async_trait]
pub trait HumanApprovalResolver: Send + Sync {
    async fn resolve(&self, node_id: &NodeId, prompt: &str) -> Result<bool, IceError>;
}

/// Approves immediately in development, and refuses outright in
/// production rather than silently granting approval a human never saw.
/// Mirrors the reference human-approval executor's own environment check,
/// which raises rather than auto-approving once `ICE_ENV`/`ENV` says
/// production.
pub struct AutoApprove {
    mode: RuntimeMode,
}

impl AutoApprove {
    #[must_use]
    pub fn new(mode: RuntimeMode) -> Self {
        Self { mode }
    }
}

impl Default for AutoApprove {
    /// Defaults to [`RuntimeMode::Production`], the same fail-closed
    /// default as [`RuntimeMode`] itself — opting into auto-approval
    /// requires naming [`RuntimeMode::Development`] explicitly.
    fn default() -> Self {
        Self::new(RuntimeMode::default())
    }
}

#[async_trait]
impl HumanApprovalResolver for AutoApprove {
    async fn resolve(&self, node_id: &NodeId, _prompt: &str) -> Result<bool, IceError> {
        if self.mode.is_production() {
            return Err(IceError::validation(format!("no human approval resolver configured for node {node_id} in production")));
        }
        Ok(true)
    }
}

/// Emits `HumanApprovalRequested`, awaits resolution bounded by
/// `timeout_ms`, and emits `HumanApprovalResolved` on completion. A timeout
/// is reported as a failed result rather than propagated, so the node
/// executor's retry policy decides whether to re-request approval.
pub struct HumanExecutor {
    resolver: Arc<dyn HumanApprovalResolver>,
}

impl HumanExecutor {
    #[must_use]
    pub fn new(resolver: Arc<dyn HumanApprovalResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl NodeExecutor for HumanExecutor {
    async fn exec(
        &self,
        runtime: &dyn WorkflowRuntime,
        node: &NodeSpec,
        _ctx: &RunContext,
        _input: Value,
    ) -> Result<NodeExecutionResult, IceError> {
        let NodeKind::Human { prompt_for_approval, timeout_ms } = &node.kind else {
            return Err(IceError::internal("HumanExecutor invoked on a non-human node"));
        };

        runtime.emit(EventKind::HumanApprovalRequested { node_id: node.id.clone() }, Some(node.id.clone()), Value::Null).await;

        let start = Instant::now();
        let limits = ResourceLimits::with_timeout(Duration::from_millis(*timeout_ms));
        let cancel = CancellationToken::new();
        let outcome = run_with_limits(self.resolver.resolve(&node.id, prompt_for_approval), &limits, &cancel).await;

        match outcome {
            Ok(Ok(approved)) => {
                runtime
                    .emit(EventKind::HumanApprovalResolved { node_id: node.id.clone(), approved }, Some(node.id.clone()), Value::Null)
                    .await;
                if approved {
                    Ok(NodeExecutionResult::success(NodeOutputData::inline(serde_json::json!({"approved": true})), metadata(1, start, false)))
                } else {
                    Ok(NodeExecutionResult::failure("human approval was rejected", "canceled", metadata(1, start, false)))
                }
            }
            Ok(Err(err)) => Ok(NodeExecutionResult::failure(err.to_string(), err.error_code(), metadata(1, start, false))),
            Err(SandboxError::TimedOut { .. }) => {
                Ok(NodeExecutionResult::failure(format!("approval timed out after {timeout_ms}ms"), "timeout", metadata(1, start, false)))
            }
            Err(SandboxError::Cancelled) => Ok(NodeExecutionResult::failure("approval wait was cancelled", "canceled", metadata(1, start, false))),
        }
    }
}
