use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

use crate::agents::runner::run_concurrently;
use crate::agents::{AgentHandle, Payload};
use crate::config::{Settings, DEFAULT_SWARM_ROUNDS};

/// Predicate over one round's results; true ends the swarm
pub type Convergence = dyn Fn(&[Option<Payload>]) -> bool + Send + Sync;

/// One completed swarm round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmRound {
    /// 1-based
    pub round: usize,
    pub results: Vec<Option<Payload>>,
    /// Shared state as the agents saw it
    pub shared_state: Map<String, Payload>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwarmMetrics {
    pub swarm_size: usize,
    pub rounds_executed: usize,
    pub shared_state_size: usize,
}

/// Agents that all work on the same input plus a shared key/value state.
///
/// Within a round every agent runs on its own task against the same state
/// snapshot; a failed agent leaves `None` in its slot and never affects
/// the others.
#[derive(Debug)]
pub struct SwarmOrchestrator {
    name: String,
    agents: Vec<AgentHandle>,
    shared_state: Map<String, Payload>,
    execution_rounds: Vec<SwarmRound>,
    default_rounds: usize,
}

impl Default for SwarmOrchestrator {
    fn default() -> Self {
        Self::new("SwarmOrchestrator")
    }
}

impl SwarmOrchestrator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agents: Vec::new(),
            shared_state: Map::new(),
            execution_rounds: Vec::new(),
            default_rounds: DEFAULT_SWARM_ROUNDS,
        }
    }

    /// Create a swarm whose default round cap comes from settings
    pub fn from_settings(name: impl Into<String>, settings: &Settings) -> Self {
        Self {
            default_rounds: settings.swarm_rounds,
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_agent(&mut self, agent: AgentHandle) {
        self.agents.push(agent);
    }

    pub fn update_shared_state(&mut self, key: impl Into<String>, value: Payload) {
        self.shared_state.insert(key.into(), value);
    }

    /// Snapshot of the shared state
    pub fn get_shared_state(&self) -> Map<String, Payload> {
        self.shared_state.clone()
    }

    /// Run every agent once on `{"input", "shared_state"}`.
    ///
    /// Results follow the order agents were added.
    pub async fn execute_round(&mut self, input: Payload) -> Vec<Option<Payload>> {
        let snapshot = self.shared_state.clone();
        let round = self.execution_rounds.len() + 1;
        tracing::info!(swarm = %self.name, round, agents = self.agents.len(), "executing swarm round");

        let envelope = json!({
            "input": input,
            "shared_state": Payload::Object(snapshot.clone()),
        });

        let results: Vec<Option<Payload>> = run_concurrently(&self.agents, &envelope)
            .await
            .into_iter()
            .map(Result::ok)
            .collect();

        let failed = results.iter().filter(|r| r.is_none()).count();
        if failed > 0 {
            tracing::warn!(swarm = %self.name, round, failed, "swarm agents failed");
        }

        self.execution_rounds.push(SwarmRound {
            round,
            results: results.clone(),
            shared_state: snapshot,
            timestamp: Utc::now(),
        });

        results
    }

    /// Run rounds on the same input until `rounds` (or the default cap) is
    /// reached, or until `convergence` holds for a round's results. The
    /// converging round is included.
    pub async fn execute_swarm(
        &mut self,
        input: Payload,
        rounds: Option<usize>,
        convergence: Option<&Convergence>,
    ) -> Vec<Vec<Option<Payload>>> {
        let rounds = rounds.unwrap_or(self.default_rounds);
        let mut all_results = Vec::with_capacity(rounds);

        for _ in 0..rounds {
            let results = self.execute_round(input.clone()).await;
            let converged = convergence.is_some_and(|converged| converged(&results));
            all_results.push(results);

            if converged {
                tracing::info!(swarm = %self.name, rounds = all_results.len(), "swarm converged");
                break;
            }
        }

        all_results
    }

    /// Snapshot of the rounds log
    pub fn get_rounds(&self) -> Vec<SwarmRound> {
        self.execution_rounds.clone()
    }

    pub fn get_swarm_metrics(&self) -> SwarmMetrics {
        SwarmMetrics {
            swarm_size: self.agents.len(),
            rounds_executed: self.execution_rounds.len(),
            shared_state_size: self.shared_state.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentError, FnAgent};

    fn reader(name: &str) -> AgentHandle {
        FnAgent::new(name)
            .on_act(|envelope| Ok(envelope["shared_state"]["target"].clone()))
            .into_handle()
    }

    fn broken(name: &str) -> AgentHandle {
        FnAgent::new(name)
            .on_act(|_| Err(AgentError::TaskExecutionFailed("lost".to_string())))
            .into_handle()
    }

    #[tokio::test]
    async fn round_sees_input_and_shared_state() {
        let echo = FnAgent::new("echo").into_handle();
        let mut swarm = SwarmOrchestrator::default();
        swarm.add_agent(echo);
        swarm.update_shared_state("target", json!(42));

        let results = swarm.execute_round(json!("go")).await;

        assert_eq!(
            results,
            vec![Some(json!({"input": "go", "shared_state": {"target": 42}}))]
        );
        let rounds = swarm.get_rounds();
        assert_eq!(rounds[0].round, 1);
        assert_eq!(rounds[0].shared_state["target"], json!(42));
    }

    #[tokio::test]
    async fn failed_agent_leaves_empty_slot() {
        let mut swarm = SwarmOrchestrator::default();
        swarm.add_agent(reader("a"));
        swarm.add_agent(broken("b"));
        swarm.add_agent(reader("c"));
        swarm.update_shared_state("target", json!("t"));

        let results = swarm.execute_round(json!(null)).await;

        assert_eq!(results, vec![Some(json!("t")), None, Some(json!("t"))]);
    }

    #[tokio::test]
    async fn rounds_log_keeps_state_per_round() {
        let mut swarm = SwarmOrchestrator::default();
        swarm.add_agent(reader("a"));

        swarm.update_shared_state("target", json!(1));
        swarm.execute_round(json!(null)).await;
        swarm.update_shared_state("target", json!(2));
        swarm.execute_round(json!(null)).await;

        let rounds = swarm.get_rounds();
        assert_eq!(rounds[0].shared_state["target"], json!(1));
        assert_eq!(rounds[1].shared_state["target"], json!(2));
        assert_eq!(rounds[1].results, vec![Some(json!(2))]);
    }

    #[tokio::test]
    async fn swarm_runs_to_round_cap() {
        let mut swarm = SwarmOrchestrator::default();
        swarm.add_agent(reader("a"));

        let all = swarm.execute_swarm(json!("x"), Some(3), None).await;

        assert_eq!(all.len(), 3);
        assert_eq!(swarm.get_swarm_metrics().rounds_executed, 3);
    }

    #[tokio::test]
    async fn convergence_is_inclusive() {
        let counter = FnAgent::new("counter")
            .on_act({
                let mut calls = 0;
                move |_| {
                    calls += 1;
                    Ok(json!(calls))
                }
            })
            .into_handle();
        let mut swarm = SwarmOrchestrator::default();
        swarm.add_agent(counter);

        let converged = |results: &[Option<Payload>]| results[0] == Some(json!(2));
        let all = swarm.execute_swarm(json!("x"), Some(10), Some(&converged)).await;

        assert_eq!(all, vec![vec![Some(json!(1))], vec![Some(json!(2))]]);
    }

    #[tokio::test]
    async fn default_rounds_come_from_settings() {
        let settings = Settings {
            swarm_rounds: 2,
            ..Settings::default()
        };
        let mut swarm = SwarmOrchestrator::from_settings("configured", &settings);
        swarm.add_agent(reader("a"));
        swarm.add_agent(reader("b"));
        swarm.update_shared_state("k", json!(true));

        swarm.execute_swarm(json!("x"), None, None).await;

        assert_eq!(
            swarm.get_swarm_metrics(),
            SwarmMetrics {
                swarm_size: 2,
                rounds_executed: 2,
                shared_state_size: 1,
            }
        );
    }
}
