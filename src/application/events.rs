//! Observer events emitted on every terminal transition.

use crate::domain::{MovePlan, NodeId, SourceError, Target, TreeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    Loaded { parent: Target, count: usize },
    Created { id: NodeId, parent: Target },
    Updated { id: NodeId },
    Deleted { id: NodeId, removed: usize },
    Moved { plan: MovePlan },
    /// Refused locally, no request was sent
    Rejected { reason: TreeError },
    /// Remote call failed, tree unchanged
    Failed { error: SourceError },
}

impl TreeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TreeEvent::Loaded { .. } => "loaded",
            TreeEvent::Created { .. } => "created",
            TreeEvent::Updated { .. } => "updated",
            TreeEvent::Deleted { .. } => "deleted",
            TreeEvent::Moved { .. } => "moved",
            TreeEvent::Rejected { .. } => "rejected",
            TreeEvent::Failed { .. } => "failed",
        }
    }
}
