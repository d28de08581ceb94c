//! One `NodeExecutor` per built-in node type. `swarm` ships no body here —
//! it is a registry interface point; a deployment registers its own
//! `NodeExecutor` for `"swarm"` the same way it would for a custom node
//! type.

mod agent;
mod code;
mod condition;
mod human;
mod llm;
mod loop_;
mod parallel;
mod recursive;
mod support;
mod tool;
mod workflow;

#[cfg(test)]
mod test_support;

pub use agent::AgentExecutor;
pub use code::{CodeExecutor, CodeRuntime};
pub use condition::ConditionExecutor;
pub use human::{AutoApprove, HumanApprovalResolver, HumanExecutor};
pub use llm::LlmExecutor;
pub use loop_::LoopExecutor;
pub use parallel::ParallelExecutor;
pub use recursive::RecursiveExecutor;
pub use tool::ToolExecutor;
pub use workflow::WorkflowExecutor;
