use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use super::handoff::{Handoff, HandoffContext};
use super::value_objects::HandoffStatus;
use crate::agents::{AgentError, AgentHandle, AgentResult, Payload};

/// Aggregate handoff counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandoffMetrics {
    pub total_handoffs: usize,
    pub completed: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub handoff_chain_length: usize,
}

/// Registry of delegation targets plus the handoffs created between them.
///
/// The chain log records `"from -> to"` for every handoff that was actually
/// executed, in execution order.
#[derive(Debug, Default)]
pub struct HandoffManager {
    agents: HashMap<String, AgentHandle>,
    handoffs: Vec<Handoff>,
    handoff_chain: Vec<String>,
}

impl HandoffManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent under `name` as a handoff target
    pub fn register_agent(&mut self, name: impl Into<String>, agent: AgentHandle) {
        self.agents.insert(name.into(), agent);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// Create an unconditional handoff
    ///
    /// # Errors
    /// `AgentNotFound` if `to_agent` is not registered
    pub fn create_handoff(
        &mut self,
        from_agent: &str,
        to_agent: &str,
        context: HandoffContext,
    ) -> AgentResult<Uuid> {
        self.push(Handoff::new(from_agent, to_agent, context))
    }

    /// Create a handoff gated by `condition`
    ///
    /// # Errors
    /// `AgentNotFound` if `to_agent` is not registered
    pub fn create_conditional_handoff<F>(
        &mut self,
        from_agent: &str,
        to_agent: &str,
        context: HandoffContext,
        condition: F,
    ) -> AgentResult<Uuid>
    where
        F: Fn(&Payload) -> bool + Send + Sync + 'static,
    {
        self.push(Handoff::new(from_agent, to_agent, context).with_condition(condition))
    }

    /// Execute a previously created handoff.
    ///
    /// Returns `Ok(None)` without touching the chain when the handoff's
    /// condition rejects `input`.
    pub async fn execute_handoff(&mut self, id: Uuid, input: Payload) -> AgentResult<Option<Payload>> {
        let index = self
            .handoffs
            .iter()
            .position(|h| h.id() == id)
            .ok_or_else(|| AgentError::HandoffNotFound(id.to_string()))?;

        let handoff = &mut self.handoffs[index];
        if !handoff.should_handoff(&input) {
            tracing::debug!(handoff_id = %id, "handoff condition not met, skipping");
            return Ok(None);
        }

        let target = self
            .agents
            .get(handoff.to_agent())
            .cloned()
            .ok_or_else(|| AgentError::AgentNotFound(handoff.to_agent().to_string()))?;

        if handoff.status() != HandoffStatus::Pending {
            return Err(AgentError::InvalidStateTransition {
                from: handoff.status().to_string(),
                to: HandoffStatus::InProgress.to_string(),
            });
        }

        self.handoff_chain
            .push(format!("{} -> {}", handoff.from_agent(), handoff.to_agent()));

        handoff.execute(&target, input).await.map(Some)
    }

    /// Create and immediately execute an unconditional handoff.
    ///
    /// # Errors
    /// - `AgentNotFound` if `to_agent` is not registered, before any side effect
    /// - whatever the target agent returns
    pub async fn handoff_to(
        &mut self,
        from_agent: &str,
        to_agent: &str,
        input: Payload,
        context: Option<HandoffContext>,
    ) -> AgentResult<Payload> {
        let id = self.create_handoff(from_agent, to_agent, context.unwrap_or_default())?;
        let result = self.execute_handoff(id, input).await?;
        // Unconditional handoffs always run
        Ok(result.unwrap_or(Payload::Null))
    }

    pub fn handoff(&self, id: Uuid) -> Option<&Handoff> {
        self.handoffs.iter().find(|h| h.id() == id)
    }

    pub fn handoffs(&self) -> &[Handoff] {
        &self.handoffs
    }

    /// Snapshot of the executed `"from -> to"` chain
    pub fn get_handoff_chain(&self) -> Vec<String> {
        self.handoff_chain.clone()
    }

    pub fn get_metrics(&self) -> HandoffMetrics {
        let total = self.handoffs.len();
        let completed = self
            .handoffs
            .iter()
            .filter(|h| h.status() == HandoffStatus::Completed)
            .count();
        let failed = self
            .handoffs
            .iter()
            .filter(|h| h.status() == HandoffStatus::Failed)
            .count();

        HandoffMetrics {
            total_handoffs: total,
            completed,
            failed,
            success_rate: if total > 0 {
                completed as f64 / total as f64
            } else {
                0.0
            },
            handoff_chain_length: self.handoff_chain.len(),
        }
    }

    fn push(&mut self, handoff: Handoff) -> AgentResult<Uuid> {
        if !self.agents.contains_key(handoff.to_agent()) {
            return Err(AgentError::AgentNotFound(handoff.to_agent().to_string()));
        }

        let id = handoff.id();
        tracing::debug!(
            handoff_id = %id,
            from = handoff.from_agent(),
            to = handoff.to_agent(),
            "handoff created"
        );
        self.handoffs.push(handoff);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::FnAgent;
    use serde_json::{json, Map};

    fn manager() -> HandoffManager {
        let mut manager = HandoffManager::new();
        manager.register_agent("greeter", FnAgent::new("GreeterAgent").into_handle());
        manager.register_agent(
            "helper",
            FnAgent::new("HelpAgent")
                .on_act(|envelope| Ok(envelope["original_input"].clone()))
                .into_handle(),
        );
        manager
    }

    #[test]
    fn create_handoff_rejects_unregistered_target() {
        let mut manager = manager();

        let err = manager.create_handoff("greeter", "ghost", Map::new()).unwrap_err();

        assert!(matches!(err, AgentError::AgentNotFound(ref name) if name == "ghost"));
        assert!(manager.handoffs().is_empty());
    }

    #[tokio::test]
    async fn handoff_to_records_chain() {
        let mut manager = manager();

        let result = manager.handoff_to("greeter", "helper", json!("help"), None).await.unwrap();

        assert_eq!(result, json!("help"));
        assert_eq!(manager.get_handoff_chain(), vec!["greeter -> helper".to_string()]);
        assert_eq!(manager.get_metrics().completed, 1);
    }

    #[tokio::test]
    async fn handoff_to_unregistered_target_has_no_side_effects() {
        let mut manager = manager();

        let err = manager.handoff_to("greeter", "ghost", json!("x"), None).await.unwrap_err();

        assert!(err.is_topology_error());
        assert!(manager.get_handoff_chain().is_empty());
        assert_eq!(manager.get_metrics().total_handoffs, 0);
    }

    #[tokio::test]
    async fn skipped_conditional_handoff_is_not_chained() {
        let mut manager = manager();
        let id = manager
            .create_conditional_handoff("greeter", "helper", Map::new(), |input| {
                input.as_str().is_some_and(|s| s.contains("help"))
            })
            .unwrap();

        let skipped = manager.execute_handoff(id, json!("hello")).await.unwrap();

        assert!(skipped.is_none());
        assert!(manager.get_handoff_chain().is_empty());
        assert_eq!(manager.handoff(id).unwrap().status(), HandoffStatus::Pending);

        let ran = manager.execute_handoff(id, json!("I need help")).await.unwrap();
        assert_eq!(ran, Some(json!("I need help")));
        assert_eq!(manager.get_handoff_chain().len(), 1);
    }

    #[tokio::test]
    async fn executing_twice_is_rejected_without_chaining() {
        let mut manager = manager();
        let id = manager.create_handoff("greeter", "helper", Map::new()).unwrap();
        manager.execute_handoff(id, json!(1)).await.unwrap();

        let err = manager.execute_handoff(id, json!(2)).await.unwrap_err();

        assert!(matches!(err, AgentError::InvalidStateTransition { .. }));
        assert_eq!(manager.get_handoff_chain().len(), 1);
    }

    #[tokio::test]
    async fn metrics_count_failures() {
        let mut manager = manager();
        manager.register_agent(
            "broken",
            FnAgent::new("broken")
                .on_act(|_| Err(AgentError::TaskExecutionFailed("no".to_string())))
                .into_handle(),
        );

        manager.handoff_to("greeter", "helper", json!(1), None).await.unwrap();
        assert!(manager.handoff_to("greeter", "broken", json!(1), None).await.is_err());

        let metrics = manager.get_metrics();
        assert_eq!(metrics.total_handoffs, 2);
        assert_eq!(metrics.completed, 1);
        assert_eq!(metrics.failed, 1);
        assert_eq!(metrics.success_rate, 0.5);
        assert_eq!(metrics.handoff_chain_length, 2);
    }

    #[tokio::test]
    async fn unknown_handoff_id_is_reported() {
        let mut manager = manager();

        let err = manager.execute_handoff(Uuid::new_v4(), json!(1)).await.unwrap_err();

        assert!(matches!(err, AgentError::HandoffNotFound(_)));
    }
}
