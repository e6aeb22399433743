//! Tool-provider sessions: launch specs, the MCP session, and the registry.

pub mod launch;
pub mod mcp;
pub mod registry;

pub use launch::LaunchSpec;
pub use mcp::{McpSession, ToolDescriptor, ToolSession};
pub use registry::SessionRegistry;
