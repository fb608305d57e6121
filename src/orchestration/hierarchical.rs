use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::agents::runner::outcome_of;
use crate::agents::{AgentHandle, AgentResult, Outcome, Payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyLevel {
    Root,
    Subordinate,
}

/// One agent call in a hierarchical execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationRecord {
    pub level: HierarchyLevel,
    pub agent: String,
    pub task: Payload,
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
}

/// Result of a hierarchical execution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HierarchicalOutput {
    /// The root had no subordinates
    Direct(Payload),
    Delegated {
        root_result: Payload,
        subordinate_results: Vec<Payload>,
    },
}

impl HierarchicalOutput {
    pub fn into_payload(self) -> Payload {
        match self {
            HierarchicalOutput::Direct(result) => result,
            HierarchicalOutput::Delegated {
                root_result,
                subordinate_results,
            } => json!({
                "root_result": root_result,
                "subordinate_results": subordinate_results,
            }),
        }
    }
}

/// Root agent with subordinates that work on its output.
///
/// Delegation is one level deep: only subordinates registered under the
/// root's own name are invoked. Subordinates registered under any other
/// supervisor are kept but never run.
#[derive(Debug)]
pub struct HierarchicalOrchestrator {
    root: AgentHandle,
    hierarchy: HashMap<String, Vec<AgentHandle>>,
    execution_trace: Vec<DelegationRecord>,
}

impl HierarchicalOrchestrator {
    pub fn new(root: AgentHandle) -> Self {
        Self {
            root,
            hierarchy: HashMap::new(),
            execution_trace: Vec::new(),
        }
    }

    pub fn root(&self) -> &AgentHandle {
        &self.root
    }

    pub fn add_subordinate(&mut self, supervisor: impl Into<String>, subordinate: AgentHandle) {
        self.hierarchy
            .entry(supervisor.into())
            .or_default()
            .push(subordinate);
    }

    pub fn subordinates(&self, supervisor: &str) -> &[AgentHandle] {
        self.hierarchy
            .get(supervisor)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Run the root on `task`, then each of its subordinates in order on the
    /// root's output.
    ///
    /// The first failure, root or subordinate, is traced and returned.
    pub async fn execute(&mut self, task: Payload) -> AgentResult<HierarchicalOutput> {
        let root = self.root.clone();
        tracing::info!(root = root.name(), "executing hierarchy");

        let root_result = self.run_traced(HierarchyLevel::Root, &root, task).await?;

        let subordinates = self.subordinates(root.name()).to_vec();
        if subordinates.is_empty() {
            return Ok(HierarchicalOutput::Direct(root_result));
        }

        let mut subordinate_results = Vec::with_capacity(subordinates.len());
        for subordinate in &subordinates {
            tracing::debug!(supervisor = root.name(), subordinate = subordinate.name(), "delegating");
            let result = self
                .run_traced(HierarchyLevel::Subordinate, subordinate, root_result.clone())
                .await?;
            subordinate_results.push(result);
        }

        Ok(HierarchicalOutput::Delegated {
            root_result,
            subordinate_results,
        })
    }

    /// Snapshot of the execution trace
    pub fn get_trace(&self) -> Vec<DelegationRecord> {
        self.execution_trace.clone()
    }

    async fn run_traced(&mut self, level: HierarchyLevel, agent: &AgentHandle, task: Payload) -> AgentResult<Payload> {
        let result = agent.run(task.clone()).await;

        self.execution_trace.push(DelegationRecord {
            level,
            agent: agent.name().to_string(),
            task,
            outcome: outcome_of(&result),
            timestamp: Utc::now(),
        });

        result
    }
}
