// Tools callable by agents
//
// A tool wraps a local function, a hosted API, an MCP server or another agent
// behind one call signature, and keeps its own call history.

pub mod agent_tool;
pub mod registry;
pub mod tool;

pub use agent_tool::AgentTool;
pub use registry::{RegistryMetrics, ToolRegistry};
pub use tool::{function_tool, hosted_api_tool, mcp_tool, Tool, ToolCall, ToolHandler, ToolMetrics, ToolType};
