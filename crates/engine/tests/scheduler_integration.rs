use std::sync::Arc;

use async_trait::async_trait;
use iceos_core::NodeId;
use iceos_engine::{RunOptions, WorkflowScheduler};
use iceos_error::IceError;
use iceos_execution::{BudgetEnforcer, BudgetLimits, BudgetPolicy, RunContext};
use iceos_executors::{ConditionExecutor, LoopExecutor, ParallelExecutor, ToolExecutor};
use iceos_registry::{ExecutorRegistry, Tool};
use iceos_workflow::{Blueprint, NodeKind, NodeSpec, WaitStrategy};
use semver::Version;
use serde_json::{json, Value};

struct Echo;

#[async_trait]
impl Tool for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    async fn call(&self, args: Value) -> Result<Value, IceError> {
        Ok(args)
    }
}

fn registry() -> ExecutorRegistry {
    let mut registry = ExecutorRegistry::new(true);
    registry.register_executor("tool", Arc::new(ToolExecutor)).unwrap();
    registry.register_executor("condition", Arc::new(ConditionExecutor)).unwrap();
    registry.register_executor("loop", Arc::new(LoopExecutor)).unwrap();
    registry.register_executor("parallel", Arc::new(ParallelExecutor)).unwrap();
    registry.register_tool(Arc::new(Echo)).unwrap();
    registry
}

fn tool_node(id: &str, deps: &[&str], args: Value) -> NodeSpec {
    NodeSpec::new(
        NodeId::new(id),
        deps.iter().map(|d| NodeId::new(*d)).collect(),
        NodeKind::Tool { tool_name: "echo".into(), tool_args: args },
    )
}

fn budget() -> BudgetEnforcer {
    BudgetEnforcer::new(BudgetLimits::default(), BudgetPolicy::FailClosed)
}

#[tokio::test]
async fn condition_node_runs_its_taken_branch_through_run_subgraph() {
    let true_path = vec![tool_node("inline", &[], json!({"via": "true_path"}))];
    let node = NodeSpec::new(
        NodeId::new("gate"),
        vec![],
        NodeKind::Condition { expression: "inputs.score > 5".into(), true_path, false_path: vec![] },
    );
    let blueprint = Blueprint::new("bp", Version::new(1, 0, 0), vec![node]);
    let scheduler = WorkflowScheduler::new(blueprint, registry(), budget(), RunOptions::default()).unwrap();
    let ctx = RunContext::new(json!({"score": 10}));

    let result = scheduler.run(&ctx).await.unwrap();
    assert!(result.is_success());
    let output = result.node_output(&NodeId::new("gate")).unwrap().output.as_ref().unwrap().as_inline().unwrap();
    assert_eq!(output["taken"], json!(true));
    assert_eq!(output["branch_output"], json!({"via": "true_path"}));
}

#[tokio::test]
async fn loop_node_runs_its_body_once_per_item() {
    let body = vec![tool_node("echo_item", &[], json!({}))];
    let node = NodeSpec::new(
        NodeId::new("iterate"),
        vec![],
        NodeKind::Loop { items_source: "inputs.values".into(), item_var: "item".into(), body, max_iterations: 10 },
    );
    let blueprint = Blueprint::new("bp", Version::new(1, 0, 0), vec![node]);
    let scheduler = WorkflowScheduler::new(blueprint, registry(), budget(), RunOptions::default()).unwrap();
    let ctx = RunContext::new(json!({"values": [1, 2, 3]}));

    let result = scheduler.run(&ctx).await.unwrap();
    assert!(result.is_success());
    let output = result.node_output(&NodeId::new("iterate")).unwrap().output.as_ref().unwrap().as_inline().unwrap();
    assert_eq!(output.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn parallel_node_waits_for_all_branches_via_run_subgraph() {
    let branches = vec![
        vec![tool_node("b1", &[], json!({"n": 1}))],
        vec![tool_node("b2", &[], json!({"n": 2}))],
    ];
    let node = NodeSpec::new(NodeId::new("fan_out"), vec![], NodeKind::Parallel { branches, wait_strategy: WaitStrategy::All });
    let blueprint = Blueprint::new("bp", Version::new(1, 0, 0), vec![node]);
    let scheduler = WorkflowScheduler::new(blueprint, registry(), budget(), RunOptions::default()).unwrap();
    let ctx = RunContext::new(json!({}));

    let result = scheduler.run(&ctx).await.unwrap();
    assert!(result.is_success());
    let output = result.node_output(&NodeId::new("fan_out")).unwrap().output.as_ref().unwrap().as_inline().unwrap();
    let branch_outputs = output.as_array().unwrap();
    assert_eq!(branch_outputs.len(), 2);
    assert_eq!(branch_outputs[0], json!({"n": 1}));
    assert_eq!(branch_outputs[1], json!({"n": 2}));
}
