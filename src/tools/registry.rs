use std::collections::BTreeMap;

use serde::Serialize;

use super::tool::{Tool, ToolMetrics, ToolType};
use crate::agents::{AgentError, AgentResult, Payload};
use crate::trace::{SpanKind, Tracer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryMetrics {
    pub total_tools: usize,
    /// Tool count per type; every type is listed, including empty ones
    pub by_type: BTreeMap<String, usize>,
    pub tool_metrics: Vec<ToolMetrics>,
}

/// Registry of callable tools, looked up by name.
///
/// Every `call_tool` is recorded as a `tool_call` span on the registry's
/// tracer.
#[derive(Debug)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    tracer: Tracer,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            tracer: Tracer::new("tool_registry"),
        }
    }

    pub fn with_tracer(mut self, tracer: Tracer) -> Self {
        self.tracer = tracer;
        self
    }

    /// Register a tool. A tool registered under an existing name replaces
    /// the old one in place.
    pub fn register_tool(&mut self, tool: Tool) {
        match self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            Some(existing) => {
                tracing::warn!(tool = tool.name(), "replacing registered tool");
                *existing = tool;
            }
            None => {
                tracing::debug!(tool = tool.name(), tool_type = %tool.tool_type(), "tool registered");
                self.tools.push(tool);
            }
        }
    }

    pub fn get_tool(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Registered tools in registration order, optionally of one type
    pub fn list_tools(&self, tool_type: Option<ToolType>) -> Vec<&Tool> {
        self.tools
            .iter()
            .filter(|t| tool_type.map_or(true, |wanted| t.tool_type() == wanted))
            .collect()
    }

    /// Call a registered tool by name.
    ///
    /// # Errors
    /// - `ToolNotFound` before any handler runs
    /// - any error from the tool itself
    pub async fn call_tool(&mut self, name: &str, args: Payload) -> AgentResult<Payload> {
        let tool = self
            .tools
            .iter_mut()
            .find(|t| t.name() == name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;

        tracing::info!(tool = name, tool_type = %tool.tool_type(), "calling tool");
        self.tracer
            .in_span_async(&format!("tool.{name}"), SpanKind::ToolCall, None, tool.execute(args))
            .await
    }

    /// OpenAI function declarations for every tool
    pub fn get_schemas(&self) -> Vec<Payload> {
        self.tools.iter().map(Tool::to_openai_schema).collect()
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn get_registry_metrics(&self) -> RegistryMetrics {
        let by_type = ToolType::ALL
            .iter()
            .map(|kind| {
                let count = self.tools.iter().filter(|t| t.tool_type() == *kind).count();
                (kind.to_string(), count)
            })
            .collect();

        RegistryMetrics {
            total_tools: self.tools.len(),
            by_type,
            tool_metrics: self.tools.iter().map(Tool::get_metrics).collect(),
        }
    }
}
