//! Shared identifiers, scope, and small marker types used across the
//! iceOS runtime crates.

mod id;
mod scope;

pub use id::{BlueprintId, ExecutionId, NodeId, OrgId, SessionId, UserId};
pub use scope::ScopeLevel;

/// Common re-exports for crates that consume `iceos-core` broadly.
pub mod prelude {
    pub use crate::{BlueprintId, ExecutionId, NodeId, OrgId, ScopeLevel, SessionId, UserId};
}
