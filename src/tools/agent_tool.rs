use async_trait::async_trait;

use super::tool::{Tool, ToolCall, ToolHandler, ToolType};
use crate::agents::{AgentHandle, AgentResult, Payload};

#[async_trait]
impl ToolHandler for AgentHandle {
    /// Run the agent on `args["input"]`, or on `args` when there is no
    /// `input` field
    async fn call(&mut self, args: Payload) -> AgentResult<Payload> {
        let input = match args {
            Payload::Object(mut fields) => match fields.remove("input") {
                Some(input) => input,
                None => Payload::Object(fields),
            },
            other => other,
        };
        self.run(input).await
    }
}

/// An agent exposed as a tool, so that another agent can delegate subtasks
/// to it.
///
/// Calls go through `AgentHandle::run`, so the wrapped agent's own metrics
/// count them as well.
#[derive(Debug)]
pub struct AgentTool {
    agent: AgentHandle,
    tool: Tool,
}

impl AgentTool {
    pub fn new(agent: AgentHandle, description: impl Into<String>, parameters: Payload) -> Self {
        let name = agent.name().to_lowercase().replace(' ', "_");
        let tool = Tool::new(name, ToolType::Agent, description, parameters, agent.clone());
        Self { agent, tool }
    }

    pub fn name(&self) -> &str {
        self.tool.name()
    }

    pub fn agent(&self) -> &AgentHandle {
        &self.agent
    }

    pub async fn execute(&mut self, args: Payload) -> AgentResult<Payload> {
        tracing::debug!(tool = %self.tool.name(), agent = %self.agent.name(), "delegating to agent");
        self.tool.execute(args).await
    }

    /// Snapshot of every delegation made through this tool
    pub fn get_call_history(&self) -> Vec<ToolCall> {
        self.tool.get_call_history()
    }

    pub fn to_openai_schema(&self) -> Payload {
        self.tool.to_openai_schema()
    }

    /// Plain tool for a [`ToolRegistry`](super::ToolRegistry); the history
    /// recorded so far moves with it
    pub fn into_tool(self) -> Tool {
        self.tool
    }
}
