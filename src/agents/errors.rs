use thiserror::Error;

/// Errors that can occur in the agent system
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM API error: {0}")]
    LlmError(String),

    #[error("Task execution failed: {0}")]
    TaskExecutionFailed(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("No connection between {from} and {to}")]
    NotConnected { from: String, to: String },

    #[error("No agent available for task: {0}")]
    NoAgentAvailable(String),

    #[error("Handoff not found: {0}")]
    HandoffNotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Agent set is empty")]
    EmptyAgentSet,

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Guardrail '{guardrail}' ({kind}) violated: {message}")]
    GuardrailViolation {
        guardrail: String,
        kind: String,
        message: String,
    },

    #[error("Rejected by guardrails: {0}")]
    Rejected(String),

    #[error("Stop requested")]
    StopRequested,

    #[error("Agent task panicked: {0}")]
    Panicked(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AgentError {
    /// Configuration errors raised before any agent is invoked
    pub fn is_topology_error(&self) -> bool {
        matches!(
            self,
            AgentError::AgentNotFound(_)
                | AgentError::NotConnected { .. }
                | AgentError::NoAgentAvailable(_)
                | AgentError::HandoffNotFound(_)
                | AgentError::ToolNotFound(_)
                | AgentError::EmptyAgentSet
        )
    }

    /// Returns true for the intentional termination signal
    pub fn is_stop(&self) -> bool {
        matches!(self, AgentError::StopRequested)
    }
}

pub type AgentResult<T> = Result<T, AgentError>;
