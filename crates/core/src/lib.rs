// Core types and algorithms for the Storybook MCP server

pub mod args;
pub mod channel;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod resolve;
pub mod test_run;
pub mod types;
pub mod urls;

pub use error::{CoreError, Result};
pub use types::*;
