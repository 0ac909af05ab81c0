use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a projection.
///
/// Transitions: `Idle -> Running` when a run starts;
/// `Running -> Stopping | Deleting | Resetting` when requested out of
/// band (observed by the runner at the start of its next tick);
/// back to `Idle` when the run loop exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionStatus {
    Idle,
    Running,
    Stopping,
    Deleting,
    Resetting,
}

impl ProjectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionStatus::Idle => "idle",
            ProjectionStatus::Running => "running",
            ProjectionStatus::Stopping => "stopping",
            ProjectionStatus::Deleting => "deleting",
            ProjectionStatus::Resetting => "resetting",
        }
    }
}

impl fmt::Display for ProjectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
