use chrono::{DateTime, Utc};
use iceos_core::{BlueprintId, ExecutionId, OrgId};
use serde::{Deserialize, Serialize};

/// The overall status of a run. Richer than the five states named in the
/// external persisted-state layout (`pending|running|completed|failed|
/// canceled`) to carry the operational states (`Paused`, `Cancelling`,
/// `TimedOut`) a production scheduler needs; [`ExecutionStatus::external_label`]
/// projects back down to that vocabulary for API surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Created,
    Running,
    Paused,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

impl ExecutionStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled | Self::TimedOut)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Cancelling)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut)
    }

    /// Projects onto the five-state vocabulary of the persisted-state layout.
    #[must_use]
    pub fn external_label(&self) -> &'static str {
        match self {
            Self::Created => "pending",
            Self::Running | Self::Paused | Self::Cancelling => "running",
            Self::Completed => "completed",
            Self::Failed | Self::TimedOut => "failed",
            Self::Cancelled => "canceled",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.external_label())
    }
}

/// A single run record, per the persisted-state layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub blueprint_id: BlueprintId,
    pub status: ExecutionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub org_id: Option<OrgId>,
}

impl Execution {
    #[must_use]
    pub fn new(blueprint_id: BlueprintId) -> Self {
        Self {
            id: ExecutionId::new(),
            blueprint_id,
            status: ExecutionStatus::Created,
            started_at: None,
            finished_at: None,
            org_id: None,
        }
    }
}
