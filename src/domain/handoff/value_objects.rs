use serde::{Deserialize, Serialize};

/// Represents the lifecycle status of a handoff
///
/// # Status Transitions
/// ```text
/// Pending -> InProgress -> Completed
///                     \--> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffStatus {
    /// Handoff created, not executed yet
    Pending,
    /// Target agent is running
    InProgress,
    /// Target agent returned a result
    Completed,
    /// Target agent failed
    Failed,
}

impl HandoffStatus {
    /// Checks if a transition from current status to next status is valid
    ///
    /// # Example
    /// ```
    /// use agent_primitives::domain::handoff::HandoffStatus;
    ///
    /// assert!(HandoffStatus::Pending.can_transition_to(HandoffStatus::InProgress));
    /// assert!(!HandoffStatus::Pending.can_transition_to(HandoffStatus::Completed));
    /// ```
    pub fn can_transition_to(&self, next: HandoffStatus) -> bool {
        use HandoffStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress) | (InProgress, Completed) | (InProgress, Failed)
        )
    }

    /// Completed and failed handoffs never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, HandoffStatus::Completed | HandoffStatus::Failed)
    }
}

impl std::fmt::Display for HandoffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandoffStatus::Pending => write!(f, "pending"),
            HandoffStatus::InProgress => write!(f, "in_progress"),
            HandoffStatus::Completed => write!(f, "completed"),
            HandoffStatus::Failed => write!(f, "failed"),
        }
    }
}
