use std::time::Instant;

use async_trait::async_trait;
use iceos_error::IceError;
use iceos_execution::{EventKind, NodeExecutionResult, NodeOutputData, RunContext};
use iceos_expression::Expression;
use iceos_registry::{AgentStep, NodeExecutor, WorkflowRuntime};
use iceos_workflow::{NodeKind, NodeSpec};
use serde_json::Value;

use crate::support::metadata;

/// Alternates invocations of `agent_package`'s agent against the most
/// recent output recorded for `partner_node_id`, until `stop_predicate`
/// evaluates true against the accumulated state or `max_iterations` is
/// reached. Each round emits `RecursionRound`.
///
/// `partner_node_id` is read from the already-recorded outputs in `ctx`;
/// coordinating two recursive nodes that are siblings at the same DAG level
/// (neither has run yet when the other starts) needs scheduling support the
/// executor layer alone cannot provide, so the partner's message is `null`
/// until it has produced output.
pub struct RecursiveExecutor;

#[async_trait]
impl NodeExecutor for RecursiveExecutor {
    async fn exec(
        &self,
        runtime: &dyn WorkflowRuntime,
        node: &NodeSpec,
        ctx: &RunContext,
        _input: Value,
    ) -> Result<NodeExecutionResult, IceError> {
        let NodeKind::Recursive { agent_package, partner_node_id, convergence } = &node.kind else {
            return Err(IceError::internal("RecursiveExecutor invoked on a non-recursive node"));
        };
        let factory = runtime.registry().get_agent(agent_package).ok_or_else(|| IceError::registry(format!("no agent registered for '{agent_package}'")))?;
        let agent = factory.create(vec![]);
        let stop_predicate = Expression::parse(&convergence.stop_predicate).map_err(|err| IceError::validation(err.to_string()))?;

        let start = Instant::now();
        let mut rounds = Vec::new();

        for round in 0..convergence.max_iterations {
            let partner_message = ctx.output_of(partner_node_id).and_then(|output| output.as_inline().cloned()).unwrap_or(Value::Null);
            let transcript = serde_json::json!({"rounds": rounds, "partner": partner_message});

            let message = match agent.step(&transcript).await? {
                AgentStep::FinalAnswer(value) => value,
                AgentStep::ToolCall { .. } => {
                    return Ok(NodeExecutionResult::failure(
                        "recursive coordination agents may not call tools",
                        "validation_error",
                        metadata(1, start, false),
                    ));
                }
            };
            rounds.push(message.clone());

            runtime
                .emit(EventKind::RecursionRound { node_id: node.id.clone(), round }, Some(node.id.clone()), message.clone())
                .await;

            let state = serde_json::json!({"count": rounds.len(), "rounds": rounds});
            if stop_predicate.evaluate_bool(&state).map_err(|err| IceError::validation(err.to_string()))? {
                return Ok(NodeExecutionResult::success(
                    NodeOutputData::inline(serde_json::json!({"rounds": rounds, "converged": true})),
                    metadata(round + 1, start, false),
                ));
            }
        }

        Ok(NodeExecutionResult::failure(
            "recursive coordination exceeded max_iterations without converging",
            "resource_exceeded",
            metadata(convergence.max_iterations, start, false),
        ))
    }
}
