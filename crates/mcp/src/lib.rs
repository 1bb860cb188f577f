// MCP (Model Context Protocol) server exposing Storybook to agent clients

pub mod composition;
pub mod context;
pub mod error;
pub mod index;
pub mod protocol;
pub mod server;
pub mod session;
pub mod telemetry;
pub mod tools;
pub mod toolsets;
pub mod transport;

pub use context::{AddonContext, HostConfig};
pub use error::{McpError, McpResult};
pub use server::McpServer;
pub use transport::{McpHttpRequest, McpHttpResponse};
