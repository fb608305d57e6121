// Orchestration topologies
//
// Every orchestrator drives agents through `AgentHandle::run`, the same entry
// point the runner uses.

pub mod centralized;
pub mod decentralized;
pub mod hierarchical;
pub mod swarm;

pub use centralized::{CentralizedMetrics, CentralizedOrchestrator, RoutingRecord, RoutingRule};
pub use decentralized::{AgentMessage, DecentralizedOrchestrator, NetworkMetrics};
pub use hierarchical::{DelegationRecord, HierarchicalOrchestrator, HierarchicalOutput, HierarchyLevel};
pub use swarm::{Convergence, SwarmMetrics, SwarmOrchestrator, SwarmRound};
