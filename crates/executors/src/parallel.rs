use std::time::Instant;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use iceos_error::IceError;
use iceos_execution::{NodeExecutionResult, NodeOutputData, RunContext};
use iceos_registry::{NodeExecutor, WorkflowRuntime};
use iceos_workflow::{NodeKind, NodeSpec, WaitStrategy};
use serde_json::Value;

use crate::support::metadata;

/// Runs each branch as a sub-scheduler invocation sharing the same context,
/// polling every branch concurrently through a `FuturesUnordered` so the
/// first branches to finish are seen first rather than waiting for the
/// slowest. `any` stops at the first success; `n_of_m` stops once `n`
/// branches have succeeded. Either way, dropping the `FuturesUnordered`
/// once the strategy is satisfied stops polling the remaining branches —
/// since a branch is driven by this task's own polling rather than spawned
/// onto the runtime's task pool, dropping it is what cancels it.
pub struct ParallelExecutor;

#[async_trait]
impl NodeExecutor for ParallelExecutor {
    async fn exec(
        &self,
        runtime: &dyn WorkflowRuntime,
        node: &NodeSpec,
        ctx: &RunContext,
        _input: Value,
    ) -> Result<NodeExecutionResult, IceError> {
        let NodeKind::Parallel { branches, wait_strategy } = &node.kind else {
            return Err(IceError::internal("ParallelExecutor invoked on a non-parallel node"));
        };

        let start = Instant::now();
        let mut pending: FuturesUnordered<_> =
            branches.iter().enumerate().map(|(i, branch)| async move { (i, runtime.run_subgraph(branch, ctx).await) }).collect();

        let outcome = match wait_strategy {
            WaitStrategy::All => {
                let mut outputs: Vec<Option<Value>> = vec![None; branches.len()];
                let mut failed = None;
                while let Some((i, result)) = pending.next().await {
                    match result {
                        Ok(output) => outputs[i] = Some(output),
                        Err(err) => {
                            failed = Some(err);
                            break;
                        }
                    }
                }
                match failed {
                    Some(err) => Err(err),
                    // Every slot is filled once the loop drains without an
                    // error — the `unwrap` can't fail.
                    None => Ok(NodeOutputData::inline(Value::Array(outputs.into_iter().map(|o| o.unwrap()).collect()))),
                }
            }
            WaitStrategy::Any => {
                let mut result = Err(IceError::transient("all parallel branches failed"));
                while let Some((_, branch_result)) = pending.next().await {
                    if let Ok(output) = branch_result {
                        result = Ok(NodeOutputData::inline(output));
                        break;
                    }
                }
                result
            }
            WaitStrategy::NOfM { n } => {
                let mut succeeded = Vec::with_capacity(*n);
                while succeeded.len() < *n {
                    match pending.next().await {
                        Some((_, Ok(output))) => succeeded.push(output),
                        Some((_, Err(_))) => {}
                        None => break,
                    }
                }
                if succeeded.len() >= *n {
                    Ok(NodeOutputData::inline(Value::Array(succeeded)))
                } else {
                    Err(IceError::transient(format!("only {} of {n} required branches succeeded", succeeded.len())))
                }
            }
        };

        // Any branch still in `pending` at this point has not been polled
        // to completion; dropping it here is the cancellation.
        drop(pending);

        match outcome {
            Ok(output) => Ok(NodeExecutionResult::success(output, metadata(1, start, false))),
            Err(err) if matches!(wait_strategy, WaitStrategy::All) => Err(err),
            Err(err) => Ok(NodeExecutionResult::failure(err.to_string(), "transient", metadata(1, start, false))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRuntime;
    use iceos_core::NodeId;
    use iceos_execution::{BudgetEnforcer, BudgetLimits, BudgetPolicy, EventKind, MemoryStore};
    use iceos_registry::ExecutorRegistry;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// A `WorkflowRuntime` whose `run_subgraph` sleeps for a duration keyed
    /// off the branch's single node id, so a test can run a "fast" branch
    /// against a "slow" one and observe whether the slow branch was ever
    /// polled to completion.
    struct RacingRuntime {
        registry: ExecutorRegistry,
        budget: BudgetEnforcer,
        slow_finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl WorkflowRuntime for RacingRuntime {
        fn registry(&self) -> &ExecutorRegistry {
            &self.registry
        }
        fn budget(&self) -> &BudgetEnforcer {
            &self.budget
        }
        fn memory(&self) -> Option<&dyn MemoryStore> {
            None
        }
        async fn run_subgraph(&self, nodes: &[NodeSpec], _ctx: &RunContext) -> Result<Value, IceError> {
            if nodes[0].id.to_string() == "slow" {
                tokio::time::sleep(Duration::from_millis(500)).await;
                self.slow_finished.store(true, Ordering::SeqCst);
                Ok(json!("slow"))
            } else {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(json!("fast"))
            }
        }
        async fn emit(&self, _kind: EventKind, _node_id: Option<NodeId>, _payload: Value) {}
    }

    fn branch(id: &str) -> Vec<NodeSpec> {
        vec![NodeSpec::new(NodeId::new(id), vec![], NodeKind::Tool { tool_name: "noop".into(), tool_args: Value::Null })]
    }

    #[tokio::test]
    async fn any_strategy_races_branches_and_drops_the_loser() {
        let slow_finished = Arc::new(AtomicBool::new(false));
        let runtime = RacingRuntime {
            registry: ExecutorRegistry::new(true),
            budget: BudgetEnforcer::new(BudgetLimits::default(), BudgetPolicy::FailClosed),
            slow_finished: slow_finished.clone(),
        };
        let ctx = RunContext::new(json!({}));
        let node = NodeSpec::new(
            NodeId::new("n1"),
            vec![],
            NodeKind::Parallel { branches: vec![branch("fast"), branch("slow")], wait_strategy: WaitStrategy::Any },
        );

        let start = Instant::now();
        let result = ParallelExecutor.exec(&runtime, &node, &ctx, Value::Null).await.unwrap();
        let elapsed = start.elapsed();

        assert!(result.success);
        assert_eq!(result.output.unwrap().as_inline().unwrap(), &json!("fast"));
        assert!(elapsed < Duration::from_millis(300), "should return as soon as the fast branch wins, not wait for the slow one: {elapsed:?}");

        // Give the slow branch's sleep ample time to finish if it were
        // still running; it should never flip this flag because dropping
        // the loser's future stopped polling it.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!slow_finished.load(Ordering::SeqCst), "the losing branch should have been cancelled, not run to completion");
    }

    fn node(wait_strategy: WaitStrategy, branch_count: usize) -> NodeSpec {
        NodeSpec::new(
            NodeId::new("n1"),
            vec![],
            NodeKind::Parallel { branches: vec![vec![]; branch_count], wait_strategy },
        )
    }

    #[tokio::test]
    async fn all_strategy_collects_every_branch_output() {
        let runtime = TestRuntime::new().returning_subgraph(Ok(json!(1)));
        let ctx = RunContext::new(json!({}));
        let result = ParallelExecutor.exec(&runtime, &node(WaitStrategy::All, 3), &ctx, Value::Null).await.unwrap();
        assert_eq!(result.output.unwrap().as_inline().unwrap(), &json!([1, 1, 1]));
    }

    #[tokio::test]
    async fn all_strategy_fails_if_any_branch_fails() {
        let runtime = TestRuntime::new().returning_subgraph(Err(IceError::transient("boom")));
        let ctx = RunContext::new(json!({}));
        assert!(matches!(
            ParallelExecutor.exec(&runtime, &node(WaitStrategy::All, 2), &ctx, Value::Null).await,
            Err(IceError::Transient { .. })
        ));
    }

    #[tokio::test]
    async fn n_of_m_succeeds_when_enough_branches_succeed() {
        let runtime = TestRuntime::new().returning_subgraph(Ok(json!("ok")));
        let ctx = RunContext::new(json!({}));
        let result = ParallelExecutor.exec(&runtime, &node(WaitStrategy::NOfM { n: 2 }, 3), &ctx, Value::Null).await.unwrap();
        assert!(result.success);
    }
}
