use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value flowing between agents: inputs, perceptions, decisions and results
pub type Payload = serde_json::Value;

/// Request counters kept by every agent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
}

impl AgentMetrics {
    /// Fraction of requests that succeeded, 0.0 when nothing ran yet
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.successful_requests as f64 / self.total_requests as f64
    }
}

/// Execution modes for the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Execute once
    Single,
    /// Execute in an iterative feedback loop
    Loop,
    /// Execute several agents against the same input
    Parallel,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Single => write!(f, "single"),
            ExecutionMode::Loop => write!(f, "loop"),
            ExecutionMode::Parallel => write!(f, "parallel"),
        }
    }
}

/// How a single agent call ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { output: Payload },
    Failure { error: String },
    Stopped,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Returns the output for successful calls
    pub fn output(&self) -> Option<&Payload> {
        match self {
            Outcome::Success { output } => Some(output),
            _ => None,
        }
    }
}

/// One agent call made by the runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub mode: ExecutionMode,
    pub agent: String,
    pub input: Payload,
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
    /// 1-based iteration number, loop mode only
    pub iteration: Option<usize>,
}

/// Cumulative runner counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerMetrics {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub total_iterations: u64,
}

/// Result of `Runner::execute`, shaped by the configured mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunOutput {
    Single(Payload),
    Loop(Vec<Payload>),
    Parallel(Vec<Option<Payload>>),
}
