use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map};
use uuid::Uuid;

use super::events::HandoffEvent;
use super::value_objects::HandoffStatus;
use crate::agents::{AgentError, AgentHandle, AgentResult, Payload};

/// Predicate gating whether a handoff should happen for an input
pub type HandoffCondition = Box<dyn Fn(&Payload) -> bool + Send + Sync>;

/// Context attached to a handoff envelope
pub type HandoffContext = Map<String, Payload>;

/// Handoff aggregate root
///
/// A one-shot delegation of an input from one agent to another.
///
/// # Invariants
/// - Status moves Pending -> InProgress -> (Completed | Failed) exactly once
/// - A handoff is never executed twice
/// - `completed_at` is set together with the terminal status
///
/// # Example
/// ```
/// use agent_primitives::domain::handoff::{Handoff, HandoffStatus};
/// use serde_json::{json, Map};
///
/// let handoff = Handoff::new("greeter", "helper", Map::new())
///     .with_condition(|input| input.as_str().is_some_and(|s| s.contains("help")));
///
/// assert_eq!(handoff.status(), HandoffStatus::Pending);
/// assert!(!handoff.should_handoff(&json!("hello")));
/// assert!(handoff.should_handoff(&json!("I need help")));
/// ```
pub struct Handoff {
    id: Uuid,
    from_agent: String,
    to_agent: String,
    context: HandoffContext,
    condition: Option<HandoffCondition>,
    status: HandoffStatus,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    result: Option<Payload>,
    error: Option<String>,
    events: Vec<HandoffEvent>,
}

impl Handoff {
    /// Creates a new pending handoff and records its Created event
    pub fn new(from_agent: impl Into<String>, to_agent: impl Into<String>, context: HandoffContext) -> Self {
        let id = Uuid::new_v4();
        let from_agent = from_agent.into();
        let to_agent = to_agent.into();

        let created = HandoffEvent::Created {
            handoff_id: id,
            from_agent: from_agent.clone(),
            to_agent: to_agent.clone(),
        };

        Self {
            id,
            from_agent,
            to_agent,
            context,
            condition: None,
            status: HandoffStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            result: None,
            error: None,
            events: vec![created],
        }
    }

    /// Gate the handoff on a predicate over the input
    pub fn with_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&Payload) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Box::new(condition));
        self
    }

    /// True when no condition is set, otherwise the condition's verdict
    pub fn should_handoff(&self, input: &Payload) -> bool {
        match &self.condition {
            Some(condition) => condition(input),
            None => true,
        }
    }

    /// Delegates `input` to `target`.
    ///
    /// The target receives an envelope
    /// `{"original_input", "context", "from_agent"}`. The target's failure is
    /// recorded on the handoff and returned unchanged.
    ///
    /// # Errors
    /// - `InvalidStateTransition` if the handoff was already executed; the
    ///   target is not invoked in that case
    /// - whatever the target agent returns
    pub async fn execute(&mut self, target: &AgentHandle, input: Payload) -> AgentResult<Payload> {
        let started = self.start()?;
        self.events.push(started);

        let envelope = json!({
            "original_input": input,
            "context": self.context,
            "from_agent": self.from_agent,
        });

        tracing::info!(
            handoff_id = %self.id,
            from = %self.from_agent,
            to = %self.to_agent,
            "executing handoff"
        );

        match target.run(envelope).await {
            Ok(result) => {
                let completed = self.complete(result.clone())?;
                self.events.push(completed);
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(handoff_id = %self.id, error = %e, "handoff failed");
                let failed = self.fail(e.to_string())?;
                self.events.push(failed);
                Err(e)
            }
        }
    }

    fn start(&mut self) -> AgentResult<HandoffEvent> {
        self.transition(HandoffStatus::InProgress)?;
        Ok(HandoffEvent::Started { handoff_id: self.id })
    }

    fn complete(&mut self, result: Payload) -> AgentResult<HandoffEvent> {
        self.transition(HandoffStatus::Completed)?;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
        Ok(HandoffEvent::Completed { handoff_id: self.id })
    }

    fn fail(&mut self, error: String) -> AgentResult<HandoffEvent> {
        self.transition(HandoffStatus::Failed)?;
        self.error = Some(error.clone());
        self.completed_at = Some(Utc::now());
        Ok(HandoffEvent::Failed {
            handoff_id: self.id,
            error,
        })
    }

    fn transition(&mut self, next: HandoffStatus) -> AgentResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AgentError::InvalidStateTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    // ===== Getters =====

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn from_agent(&self) -> &str {
        &self.from_agent
    }

    pub fn to_agent(&self) -> &str {
        &self.to_agent
    }

    pub fn context(&self) -> &HandoffContext {
        &self.context
    }

    pub fn status(&self) -> HandoffStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn result(&self) -> Option<&Payload> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Events produced so far, oldest first
    pub fn events(&self) -> &[HandoffEvent] {
        &self.events
    }

    /// Serializable snapshot of this handoff
    pub fn get_info(&self) -> HandoffInfo {
        HandoffInfo {
            id: self.id,
            from_agent: self.from_agent.clone(),
            to_agent: self.to_agent.clone(),
            status: self.status,
            created_at: self.created_at,
            completed_at: self.completed_at,
            has_result: self.result.is_some(),
            error: self.error.clone(),
        }
    }
}

impl std::fmt::Debug for Handoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handoff")
            .field("id", &self.id)
            .field("from_agent", &self.from_agent)
            .field("to_agent", &self.to_agent)
            .field("status", &self.status)
            .field("has_condition", &self.condition.is_some())
            .finish()
    }
}

/// Read-only view of a handoff
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandoffInfo {
    pub id: Uuid,
    pub from_agent: String,
    pub to_agent: String,
    pub status: HandoffStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub has_result: bool,
    pub error: Option<String>,
}
