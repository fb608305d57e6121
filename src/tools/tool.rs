use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::agents::{AgentResult, Payload};

/// Where a tool's work actually happens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolType {
    /// Local function
    Function,
    /// Remote service called over its own API
    HostedApi,
    /// Model Context Protocol server
    Mcp,
    /// Another agent
    Agent,
}

impl ToolType {
    pub const ALL: [ToolType; 4] = [
        ToolType::Function,
        ToolType::HostedApi,
        ToolType::Mcp,
        ToolType::Agent,
    ];
}

impl std::fmt::Display for ToolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolType::Function => write!(f, "function"),
            ToolType::HostedApi => write!(f, "hosted_api"),
            ToolType::Mcp => write!(f, "mcp"),
            ToolType::Agent => write!(f, "agent"),
        }
    }
}

/// The callable behind a tool
#[async_trait]
pub trait ToolHandler: Send {
    async fn call(&mut self, args: Payload) -> AgentResult<Payload>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: FnMut(Payload) -> AgentResult<Payload> + Send,
{
    async fn call(&mut self, args: Payload) -> AgentResult<Payload> {
        (self.0)(args)
    }
}

/// One invocation of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub timestamp: DateTime<Utc>,
    pub arguments: Payload,
    pub result: Option<Payload>,
    pub error: Option<String>,
    pub success: bool,
    /// Only recorded for successful calls
    pub duration_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolMetrics {
    pub name: String,
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub total_calls: usize,
    pub successful_calls: usize,
    pub failed_calls: usize,
    pub avg_duration_ms: f64,
}

/// Named callable with a JSON parameter schema and its own call history.
///
/// # Invariants
/// - Every `execute` appends exactly one `ToolCall`, successful or not
/// - `successful_calls + failed_calls == total_calls`
pub struct Tool {
    name: String,
    tool_type: ToolType,
    description: String,
    schema: Payload,
    handler: Box<dyn ToolHandler>,
    call_history: Vec<ToolCall>,
}

impl Tool {
    pub fn new<H>(
        name: impl Into<String>,
        tool_type: ToolType,
        description: impl Into<String>,
        schema: Payload,
        handler: H,
    ) -> Self
    where
        H: ToolHandler + 'static,
    {
        Self {
            name: name.into(),
            tool_type,
            description: description.into(),
            schema,
            handler: Box::new(handler),
            call_history: Vec::new(),
        }
    }

    /// Tool backed by a plain closure
    pub fn from_fn<F>(
        name: impl Into<String>,
        tool_type: ToolType,
        description: impl Into<String>,
        schema: Payload,
        handler: F,
    ) -> Self
    where
        F: FnMut(Payload) -> AgentResult<Payload> + Send + 'static,
    {
        Self::new(name, tool_type, description, schema, FnHandler(handler))
    }

    /// Call the handler and record the call.
    ///
    /// Errors from the handler are recorded and returned unchanged.
    pub async fn execute(&mut self, args: Payload) -> AgentResult<Payload> {
        let timestamp = Utc::now();
        let result = self.handler.call(args.clone()).await;

        let record = match &result {
            Ok(output) => {
                let elapsed = Utc::now() - timestamp;
                ToolCall {
                    timestamp,
                    arguments: args,
                    result: Some(output.clone()),
                    error: None,
                    success: true,
                    duration_ms: Some(
                        elapsed
                            .num_microseconds()
                            .map(|us| us as f64 / 1000.0)
                            .unwrap_or(elapsed.num_milliseconds() as f64),
                    ),
                }
            }
            Err(e) => {
                tracing::warn!(tool = %self.name, error = %e, "tool call failed");
                ToolCall {
                    timestamp,
                    arguments: args,
                    result: None,
                    error: Some(e.to_string()),
                    success: false,
                    duration_ms: None,
                }
            }
        };
        self.call_history.push(record);

        result
    }

    // ========================================================================
    // Getters
    // ========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tool_type(&self) -> ToolType {
        self.tool_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> &Payload {
        &self.schema
    }

    /// Snapshot of every call made so far
    pub fn get_call_history(&self) -> Vec<ToolCall> {
        self.call_history.clone()
    }

    /// Function-calling declaration in the OpenAI `tools` format
    pub fn to_openai_schema(&self) -> Payload {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.schema,
            }
        })
    }

    pub fn get_metrics(&self) -> ToolMetrics {
        let total_calls = self.call_history.len();
        let successful_calls = self.call_history.iter().filter(|c| c.success).count();
        let durations: Vec<f64> = self.call_history.iter().filter_map(|c| c.duration_ms).collect();

        ToolMetrics {
            name: self.name.clone(),
            tool_type: self.tool_type,
            total_calls,
            successful_calls,
            failed_calls: total_calls - successful_calls,
            avg_duration_ms: if durations.is_empty() {
                0.0
            } else {
                durations.iter().sum::<f64>() / durations.len() as f64
            },
        }
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("tool_type", &self.tool_type)
            .field("description", &self.description)
            .field("calls", &self.call_history.len())
            .finish()
    }
}

/// Local function tool
pub fn function_tool<F>(name: &str, description: &str, parameters: Payload, handler: F) -> Tool
where
    F: FnMut(Payload) -> AgentResult<Payload> + Send + 'static,
{
    Tool::from_fn(name, ToolType::Function, description, parameters, handler)
}

/// Tool fronting a hosted API
pub fn hosted_api_tool<F>(name: &str, description: &str, parameters: Payload, handler: F) -> Tool
where
    F: FnMut(Payload) -> AgentResult<Payload> + Send + 'static,
{
    Tool::from_fn(name, ToolType::HostedApi, description, parameters, handler)
}

/// Tool served over MCP
pub fn mcp_tool<F>(name: &str, description: &str, parameters: Payload, handler: F) -> Tool
where
    F: FnMut(Payload) -> AgentResult<Payload> + Send + 'static,
{
    Tool::from_fn(name, ToolType::Mcp, description, parameters, handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentError;

    fn greet() -> Tool {
        function_tool(
            "greet",
            "Greet a person",
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            }),
            |args| match args["name"].as_str() {
                Some(name) => Ok(json!(format!("Hello, {name}!"))),
                None => Err(AgentError::TaskExecutionFailed("missing name".to_string())),
            },
        )
    }

    #[tokio::test]
    async fn execute_records_success_and_failure() {
        let mut tool = greet();

        assert_eq!(tool.execute(json!({"name": "Ada"})).await.unwrap(), json!("Hello, Ada!"));
        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::TaskExecutionFailed(_)));

        let history = tool.get_call_history();
        assert_eq!(history.len(), 2);
        assert!(history[0].success);
        assert_eq!(history[0].result, Some(json!("Hello, Ada!")));
        assert!(history[0].duration_ms.is_some());
        assert!(!history[1].success);
        assert_eq!(history[1].error.as_deref(), Some("Task execution failed: missing name"));
        assert_eq!(history[1].arguments, json!({}));
    }

    #[tokio::test]
    async fn metrics_split_by_outcome() {
        let mut tool = greet();
        tool.execute(json!({"name": "a"})).await.unwrap();
        tool.execute(json!({"name": "b"})).await.unwrap();
        let _ = tool.execute(json!(null)).await;

        let metrics = tool.get_metrics();
        assert_eq!(metrics.total_calls, 3);
        assert_eq!(metrics.successful_calls, 2);
        assert_eq!(metrics.failed_calls, 1);
        assert!(metrics.avg_duration_ms >= 0.0);
        assert_eq!(serde_json::to_value(&metrics).unwrap()["type"], "function");
    }

    #[test]
    fn openai_schema_wraps_parameters() {
        let schema = greet().to_openai_schema();

        assert_eq!(schema["type"], "function");
        assert_eq!(schema["function"]["name"], "greet");
        assert_eq!(schema["function"]["parameters"]["required"], json!(["name"]));
    }

    #[test]
    fn factories_set_tool_type() {
        let noop = |v: Payload| -> AgentResult<Payload> { Ok(v) };

        assert_eq!(hosted_api_tool("search", "", json!({}), noop).tool_type(), ToolType::HostedApi);
        assert_eq!(mcp_tool("fetch", "", json!({}), noop).tool_type(), ToolType::Mcp);
        assert_eq!(ToolType::HostedApi.to_string(), "hosted_api");
    }
}
