use serde::{Deserialize, Serialize};

/// The breadth at which a piece of state (variables, memory, credentials) is
/// shared. Wider scopes outlive narrower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeLevel {
    /// Visible only within a single node's execution.
    Node,
    /// Visible to every node within one run.
    Run,
    /// Visible across runs within one session (agent/loop iteration).
    Session,
    /// Visible to every run owned by the organization.
    Org,
}

impl ScopeLevel {
    /// Returns `true` if `self` is at least as broad as `other`.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.rank() >= other.rank()
    }

    fn rank(self) -> u8 {
        match self {
            Self::Node => 0,
            Self::Run => 1,
            Self::Session => 2,
            Self::Org => 3,
        }
    }
}
