//! Error types for the dice gateway

use std::io;

use thiserror::Error;

/// Result type alias for the dice gateway
pub type Result<T> = std::result::Result<T, Error>;

/// Gateway errors surfaced outside the dispatcher (startup, config, transports)
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON-RPC error codes used by the gateway
pub mod rpc_codes {
    /// Parse error - Invalid JSON
    pub const PARSE_ERROR: i32 = -32700;
    /// Method not found (also used for unknown tool names)
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Caller exhausted its request budget.
    ///
    /// Lives outside the reserved `-32768..=-32000` band so clients can tell it
    /// apart from protocol failures.
    pub const RATE_LIMITED: i32 = -31029;

    /// Lower bound of the range reserved by JSON-RPC 2.0
    pub const RESERVED_START: i32 = -32768;
    /// Upper bound of the range reserved by JSON-RPC 2.0
    pub const RESERVED_END: i32 = -32000;

    /// Whether `code` falls in the range reserved by JSON-RPC 2.0
    #[must_use]
    pub const fn is_reserved(code: i32) -> bool {
        code >= RESERVED_START && code <= RESERVED_END
    }
}
