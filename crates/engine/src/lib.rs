//! The node executor lifecycle and the level-based DAG scheduler that ties
//! the blueprint model, registry, sandbox, and budget crates into a
//! runnable workflow engine.

mod branch_gate;
mod cache;
mod node_executor;
mod options;
mod result;
mod scheduler;

pub use branch_gate::BranchGatingResolver;
pub use cache::NodeCache;
pub use options::{FailurePolicy, RunOptions};
pub use result::WorkflowResult;
pub use scheduler::WorkflowScheduler;
