use uuid::Uuid;

/// Domain events that occur within the Handoff aggregate
///
/// One event is produced by every status transition, so a handoff that ran
/// to completion has exactly `Created`, `Started` and one of `Completed` or
/// `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum HandoffEvent {
    /// Fired when a handoff is created
    Created {
        handoff_id: Uuid,
        from_agent: String,
        to_agent: String,
    },
    /// Fired when the target agent starts running
    Started { handoff_id: Uuid },
    /// Fired when the target agent returned a result
    Completed { handoff_id: Uuid },
    /// Fired when the target agent failed
    Failed { handoff_id: Uuid, error: String },
}

impl HandoffEvent {
    /// Returns the handoff_id for this event
    pub fn handoff_id(&self) -> Uuid {
        match self {
            HandoffEvent::Created { handoff_id, .. } => *handoff_id,
            HandoffEvent::Started { handoff_id } => *handoff_id,
            HandoffEvent::Completed { handoff_id } => *handoff_id,
            HandoffEvent::Failed { handoff_id, .. } => *handoff_id,
        }
    }
}
