//! ArduPilot MCP Shared Protocol Types
//!
//! This crate provides the tool-invocation boundary used by the ArduPilot
//! tool server: JSON-RPC 2.0 message types, MCP tool definitions/results and
//! a newline-delimited stdio server loop.
//!
//! It has no knowledge of vehicles. A binary implements [`ToolHandler`] and
//! hands it to [`McpServer`].

pub mod protocol;
pub mod server;
pub mod tools;

pub use protocol::{ErrorObject, Request, RequestId, Response, RpcError, JSONRPC_VERSION};
pub use server::{McpServer, ServerInfo, ToolHandler};
pub use tools::{ToolContent, ToolDefinition, ToolResult};

/// MCP protocol revision advertised during `initialize`
pub const PROTOCOL_VERSION: &str = "2024-11-05";
