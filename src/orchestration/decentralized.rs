use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::runner::outcome_of;
use crate::agents::{AgentError, AgentHandle, AgentResult, Outcome, Payload};

/// Message delivered between two peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub from: String,
    pub to: String,
    pub payload: Payload,
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkMetrics {
    pub total_agents: usize,
    /// Undirected edges
    pub total_connections: usize,
    pub total_messages: usize,
    pub network_topology: BTreeMap<String, Vec<String>>,
}

/// Peer-to-peer network of agents.
///
/// # Invariants
/// - Connections are symmetric: `b` is in `a`'s adjacency list exactly when
///   `a` is in `b`'s
/// - Adjacency lists hold no duplicates and no self-loops
#[derive(Debug, Default)]
pub struct DecentralizedOrchestrator {
    agents: HashMap<String, AgentHandle>,
    connections: HashMap<String, Vec<String>>,
    message_log: Vec<AgentMessage>,
}

impl DecentralizedOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent under `name`, keeping any existing connections.
    /// Peers address it by this name, not by the agent's own.
    pub fn register_agent(&mut self, name: impl Into<String>, agent: AgentHandle) {
        let name = name.into();
        self.connections.entry(name.clone()).or_default();
        self.agents.insert(name, agent);
    }

    /// Connect two peers in both directions. Connecting an existing pair
    /// changes nothing; names need not be registered yet.
    pub fn connect(&mut self, a: &str, b: &str) {
        if a == b {
            tracing::debug!(agent = a, "ignoring self connection");
            return;
        }

        for (from, to) in [(a, b), (b, a)] {
            let peers = self.connections.entry(from.to_string()).or_default();
            if !peers.iter().any(|p| p == to) {
                peers.push(to.to_string());
            }
        }
        tracing::debug!(a, b, "agents connected");
    }

    pub fn is_connected(&self, a: &str, b: &str) -> bool {
        self.connections
            .get(a)
            .is_some_and(|peers| peers.iter().any(|p| p == b))
    }

    /// Direct peers of `agent`, in connection order
    pub fn peers(&self, agent: &str) -> Vec<String> {
        self.connections.get(agent).cloned().unwrap_or_default()
    }

    /// Deliver `message` to `to` and return its result.
    ///
    /// # Errors
    /// - `NotConnected` when the pair has no connection
    /// - `AgentNotFound` when `to` is not registered
    ///
    /// Both are raised before the target runs. Agent failures are logged and
    /// returned as is.
    pub async fn send_message(&mut self, from: &str, to: &str, message: Payload) -> AgentResult<Payload> {
        if !self.is_connected(from, to) {
            return Err(AgentError::NotConnected {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        let agent = self
            .agents
            .get(to)
            .cloned()
            .ok_or_else(|| AgentError::AgentNotFound(to.to_string()))?;

        tracing::info!(from, to, "sending message");
        let timestamp = Utc::now();
        let result = agent.run(message.clone()).await;

        self.message_log.push(AgentMessage {
            from: from.to_string(),
            to: to.to_string(),
            payload: message,
            outcome: outcome_of(&result),
            timestamp,
        });

        result
    }

    /// Send `message` to every direct peer of `from`, one after another.
    ///
    /// Results follow adjacency order. The first failure stops the
    /// broadcast; messages already delivered stay in the log.
    pub async fn broadcast(&mut self, from: &str, message: Payload) -> AgentResult<Vec<Payload>> {
        let peers = self.peers(from);
        let mut results = Vec::with_capacity(peers.len());

        for peer in &peers {
            results.push(self.send_message(from, peer, message.clone()).await?);
        }

        Ok(results)
    }

    /// Snapshot of every delivered message
    pub fn get_message_log(&self) -> Vec<AgentMessage> {
        self.message_log.clone()
    }

    pub fn get_network_metrics(&self) -> NetworkMetrics {
        NetworkMetrics {
            total_agents: self.agents.len(),
            total_connections: self.connections.values().map(Vec::len).sum::<usize>() / 2,
            total_messages: self.message_log.len(),
            network_topology: self
                .connections
                .iter()
                .map(|(name, peers)| (name.clone(), peers.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::FnAgent;
    use serde_json::json;

    fn replier(name: &str) -> AgentHandle {
        let me = name.to_string();
        FnAgent::new(name)
            .on_act(move |v| Ok(json!({"by": me, "got": v})))
            .into_handle()
    }

    fn network() -> DecentralizedOrchestrator {
        let mut net = DecentralizedOrchestrator::new();
        for name in ["A", "B", "C"] {
            net.register_agent(name, replier(name));
        }
        net
    }

    #[tokio::test]
    async fn connection_is_symmetric() {
        let mut net = network();
        net.connect("A", "B");

        let out = net.send_message("B", "A", json!("ping")).await.unwrap();

        assert_eq!(out, json!({"by": "A", "got": "ping"}));
        let log = net.get_message_log();
        assert_eq!(log[0].from, "B");
        assert_eq!(log[0].to, "A");
        assert_eq!(log[0].payload, json!("ping"));
    }

    #[tokio::test]
    async fn unconnected_pair_is_topology_error() {
        let mut net = network();
        net.connect("A", "B");

        let err = net.send_message("A", "C", json!("x")).await.unwrap_err();

        assert!(matches!(err, AgentError::NotConnected { ref from, ref to } if from == "A" && to == "C"));
        assert!(err.is_topology_error());
        assert!(net.get_message_log().is_empty());
    }

    #[tokio::test]
    async fn unregistered_target_is_topology_error() {
        let mut net = network();
        net.connect("A", "ghost");

        let err = net.send_message("A", "ghost", json!("x")).await.unwrap_err();

        assert!(matches!(err, AgentError::AgentNotFound(_)));
    }

    #[tokio::test]
    async fn peers_are_addressed_by_registered_name() {
        let mut net = DecentralizedOrchestrator::new();
        net.register_agent("north", replier("RelayAgent"));
        net.register_agent("south", replier("RelayAgent"));
        net.connect("north", "south");

        let out = net.send_message("north", "south", json!("ping")).await.unwrap();

        assert_eq!(out, json!({"by": "RelayAgent", "got": "ping"}));
        assert_eq!(net.get_network_metrics().total_agents, 2);
        assert_eq!(net.get_message_log()[0].to, "south");
    }

    #[test]
    fn connect_is_idempotent() {
        let mut net = network();
        net.connect("A", "B");
        net.connect("B", "A");
        net.connect("A", "A");

        assert_eq!(net.peers("A"), vec!["B"]);
        assert_eq!(net.peers("B"), vec!["A"]);
        assert_eq!(net.get_network_metrics().total_connections, 1);
    }

    #[tokio::test]
    async fn broadcast_follows_adjacency_order() {
        let mut net = network();
        net.connect("A", "C");
        net.connect("A", "B");

        let results = net.broadcast("A", json!("hi")).await.unwrap();

        assert_eq!(
            results,
            vec![json!({"by": "C", "got": "hi"}), json!({"by": "B", "got": "hi"})]
        );
        let metrics = net.get_network_metrics();
        assert_eq!(metrics.total_agents, 3);
        assert_eq!(metrics.total_connections, 2);
        assert_eq!(metrics.total_messages, 2);
        assert_eq!(metrics.network_topology["A"], vec!["C", "B"]);
    }

    #[tokio::test]
    async fn broadcast_without_peers_is_empty() {
        let mut net = network();

        assert!(net.broadcast("A", json!("hi")).await.unwrap().is_empty());
    }
}
