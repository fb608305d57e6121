use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::runner::outcome_of;
use crate::agents::{AgentError, AgentHandle, AgentResult, Outcome, Payload};

/// Maps a task to the name of the agent that should handle it
pub type RoutingRule = Box<dyn Fn(&Payload) -> String + Send + Sync>;

/// One task dispatched by the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRecord {
    pub timestamp: DateTime<Utc>,
    pub task: Payload,
    pub assigned_to: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CentralizedMetrics {
    pub total_agents: usize,
    pub total_executions: usize,
    /// Registered agent names, in registration order
    pub agents: Vec<String>,
}

/// Single coordinator that routes every task to one registered agent.
///
/// Without a matching routing rule, tasks go to the first agent registered.
pub struct CentralizedOrchestrator {
    name: String,
    order: Vec<String>,
    agents: HashMap<String, AgentHandle>,
    routing_rules: HashMap<String, RoutingRule>,
    execution_log: Vec<RoutingRecord>,
}

impl Default for CentralizedOrchestrator {
    fn default() -> Self {
        Self::new("CentralOrchestrator")
    }
}

impl CentralizedOrchestrator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: Vec::new(),
            agents: HashMap::new(),
            routing_rules: HashMap::new(),
            execution_log: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register an agent under `name`, which routing rules refer to and
    /// which need not match the agent's own name. Registering a name again
    /// replaces the agent but keeps its original position.
    pub fn register_agent(&mut self, name: impl Into<String>, agent: AgentHandle) {
        let name = name.into();
        if self.agents.insert(name.clone(), agent).is_none() {
            self.order.push(name);
        }
    }

    pub fn register_routing_rule<F>(&mut self, rule_name: impl Into<String>, rule: F)
    where
        F: Fn(&Payload) -> String + Send + Sync + 'static,
    {
        self.routing_rules.insert(rule_name.into(), Box::new(rule));
    }

    /// Name of the agent that should handle `task`.
    ///
    /// An unknown or absent rule name falls back to the first registered
    /// agent. Returns `None` only when no rule applies and nothing is
    /// registered. The returned name is not checked against the registry.
    pub fn route(&self, task: &Payload, rule_name: Option<&str>) -> Option<String> {
        match rule_name.and_then(|rule| self.routing_rules.get(rule)) {
            Some(rule) => Some(rule(task)),
            None => self.order.first().cloned(),
        }
    }

    /// Route `task` and run the chosen agent on it.
    ///
    /// # Errors
    /// - `NoAgentAvailable` when nothing is registered
    /// - `AgentNotFound` when a rule names an unregistered agent
    ///
    /// Both are raised before any agent runs. Agent failures are logged and
    /// returned as is.
    pub async fn execute(&mut self, task: Payload, rule_name: Option<&str>) -> AgentResult<Payload> {
        let agent_name = self
            .route(&task, rule_name)
            .ok_or_else(|| AgentError::NoAgentAvailable(task.to_string()))?;
        let agent = self
            .agents
            .get(&agent_name)
            .cloned()
            .ok_or_else(|| AgentError::AgentNotFound(agent_name.clone()))?;

        tracing::info!(orchestrator = %self.name, rule = ?rule_name, assigned_to = %agent_name, "routing task");
        let timestamp = Utc::now();
        let result = agent.run(task.clone()).await;

        self.execution_log.push(RoutingRecord {
            timestamp,
            task,
            assigned_to: agent_name,
            outcome: outcome_of(&result),
        });

        result
    }

    pub fn agent_names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Snapshot of every dispatched task
    pub fn get_execution_log(&self) -> Vec<RoutingRecord> {
        self.execution_log.clone()
    }

    pub fn get_metrics(&self) -> CentralizedMetrics {
        CentralizedMetrics {
            total_agents: self.agents.len(),
            total_executions: self.execution_log.len(),
            agents: self.order.clone(),
        }
    }
}

impl std::fmt::Debug for CentralizedOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CentralizedOrchestrator")
            .field("name", &self.name)
            .field("agents", &self.order)
            .field("routing_rules", &self.routing_rules.keys().collect::<Vec<_>>())
            .field("executions", &self.execution_log.len())
            .finish()
    }
}
