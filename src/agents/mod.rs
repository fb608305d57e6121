// Agent contract and execution engine
//
// Agents implement perceive/decide/act; everything else in the crate invokes
// them through AgentHandle::run, which owns the request accounting.

pub mod agent;
pub mod errors;
pub mod guarded;
pub mod runner;
pub mod types;

// Re-export main types
pub use agent::{Agent, AgentHandle, FnAgent};
pub use errors::{AgentError, AgentResult};
pub use guarded::GuardedAgent;
pub use runner::{Runner, StopCondition, DEFAULT_MAX_ITERATIONS};
pub use types::{AgentMetrics, ExecutionMode, ExecutionRecord, Outcome, Payload, RunOutput, RunnerMetrics};
