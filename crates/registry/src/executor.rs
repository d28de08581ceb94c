use async_trait::async_trait;
use iceos_error::IceError;
use iceos_execution::{NodeExecutionResult, RunContext};
use iceos_workflow::NodeSpec;
use serde_json::Value;

use crate::runtime::WorkflowRuntime;

/// The shared signature every built-in executor implements: given the
/// runtime facade, the node's own spec, the run context, and its already
/// resolved+validated input, produce a result. Side effects occur only
/// inside executor bodies, never in the scheduler or node executor.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    async fn exec(
        &self,
        runtime: &dyn WorkflowRuntime,
        node: &NodeSpec,
        ctx: &RunContext,
        input: Value,
    ) -> Result<NodeExecutionResult, IceError>;
}
