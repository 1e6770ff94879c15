/// MCP surface over the activity service
///
/// JSON-RPC 2.0 framing, one message per line on stdin/stdout, with tool
/// calls routed to `crate::tools`.

pub mod protocol;
pub mod server;

pub use server::McpServer;
