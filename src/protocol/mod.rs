//! JSON-RPC 2.0 wire types for the tool gateway

mod messages;
mod types;

pub use messages::*;
pub use types::*;

/// JSON-RPC version string carried by every envelope
pub const JSONRPC_VERSION: &str = "2.0";

/// Method listing the tool catalog
pub const METHOD_TOOLS_LIST: &str = "tools/list";

/// Method invoking one tool
pub const METHOD_TOOLS_CALL: &str = "tools/call";
