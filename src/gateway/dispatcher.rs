//! JSON-RPC dispatcher: one raw message in, exactly one envelope out.
//!
//! Stages run in a fixed order: parse, classify the method, then for
//! `tools/call` extract params, charge admission, validate, invoke. Admission
//! always precedes validation, so an exhausted caller learns nothing about
//! its arguments.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, error};

use crate::admission::AdmissionControl;
use crate::config::Config;
use crate::dice::{RandomSource, ThreadRandom};
use crate::error::rpc_codes;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse, Method, ToolsCallParams, ToolsCallResult};
use crate::registry::{ToolRegistry, ValidationError};
use crate::{Error, Result};

/// Message shown to callers when a handler panics
const INTERNAL_ERROR_MESSAGE: &str = "Internal error";

/// Stateless request handler shared by every transport
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    admission: Arc<AdmissionControl>,
    rng: Arc<dyn RandomSource>,
    tool_call_cost: u32,
}

impl Dispatcher {
    /// Dispatcher over `registry`, charging `tool_call_cost` per `tools/call`
    #[must_use]
    pub fn new(
        registry: Arc<ToolRegistry>,
        admission: Arc<AdmissionControl>,
        tool_call_cost: u32,
    ) -> Self {
        Self {
            registry,
            admission,
            rng: Arc::new(ThreadRandom),
            tool_call_cost,
        }
    }

    /// Dispatcher for the dice catalog with the configured budget
    pub fn from_config(config: &Config) -> Result<Self> {
        let admission = AdmissionControl::from_config(&config.rate_limit)
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self::new(
            Arc::new(ToolRegistry::dice()),
            Arc::new(admission),
            config.rate_limit.tool_call_cost,
        ))
    }

    /// Replace the random source handed to handlers
    #[must_use]
    pub fn with_random(mut self, rng: Arc<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    /// Tool catalog
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Shared admission gate
    #[must_use]
    pub fn admission(&self) -> &Arc<AdmissionControl> {
        &self.admission
    }

    /// Upper bound on how long a denied caller must wait before one more
    /// tool call fits, starting from an empty bucket.
    #[must_use]
    pub fn retry_after(&self) -> Duration {
        let policy = self.admission.policy();
        policy
            .interval()
            .mul_f64(f64::from(self.tool_call_cost) / f64::from(policy.refill_rate()))
    }

    /// Handle one raw message on behalf of `caller_key`
    pub fn handle(&self, raw: &[u8], caller_key: &str) -> JsonRpcResponse {
        let request = match JsonRpcRequest::parse(raw) {
            Ok(r) => r,
            Err(e) => {
                debug!(caller = %caller_key, error = %e, "Unparseable message");
                return JsonRpcResponse::error(
                    Value::Null,
                    rpc_codes::PARSE_ERROR,
                    format!("Parse error: {e}"),
                );
            }
        };

        let id = request.id.clone();
        match request.method() {
            Method::ToolsList => {
                debug!(caller = %caller_key, "tools/list");
                self.tools_list(id)
            }
            Method::ToolsCall => self.tools_call(id, request.params.as_ref(), caller_key),
            Method::Unknown(method) => {
                debug!(caller = %caller_key, method = %method, "Unknown method");
                JsonRpcResponse::error(
                    id,
                    rpc_codes::METHOD_NOT_FOUND,
                    format!("Method not found: {method}"),
                )
            }
            Method::Missing => {
                debug!(caller = %caller_key, "Missing or non-string method");
                JsonRpcResponse::error(id, rpc_codes::METHOD_NOT_FOUND, "Method not found: <missing>")
            }
        }
    }

    fn tools_list(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "tools": self.registry.list_tools() }))
    }

    fn tools_call(&self, id: Value, params: Option<&Value>, caller_key: &str) -> JsonRpcResponse {
        // Params
        let params: ToolsCallParams = match params
            .cloned()
            .map(serde_json::from_value::<ToolsCallParams>)
            .transpose()
        {
            Ok(Some(p)) => p,
            Ok(None) => {
                return JsonRpcResponse::error(
                    id,
                    rpc_codes::INVALID_PARAMS,
                    "Invalid params: missing tool name",
                );
            }
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    rpc_codes::INVALID_PARAMS,
                    format!("Invalid params: {e}"),
                );
            }
        };

        // Admission
        let admission = self.admission.admit(caller_key, self.tool_call_cost);
        if !admission.allowed {
            return JsonRpcResponse::error(
                id,
                rpc_codes::RATE_LIMITED,
                "Rate limit exceeded. Try again later.",
            );
        }

        // Validation
        let call = match self.registry.validate(&params.name, &params.arguments) {
            Ok(call) => call,
            Err(e) => {
                debug!(caller = %caller_key, tool = %params.name, error = %e, "Rejected tool call");
                let code = match e {
                    ValidationError::ToolNotFound(_) => rpc_codes::METHOD_NOT_FOUND,
                    ValidationError::InvalidArguments { .. }
                    | ValidationError::ArgumentsNotObject(_) => rpc_codes::INVALID_PARAMS,
                };
                return JsonRpcResponse::error(id, code, e.to_string());
            }
        };

        // Invocation
        match catch_unwind(AssertUnwindSafe(|| call.invoke(self.rng.as_ref()))) {
            Ok(Ok(text)) => {
                debug!(caller = %caller_key, tool = %params.name, "Tool call succeeded");
                match serde_json::to_value(ToolsCallResult::text(text)) {
                    Ok(result) => JsonRpcResponse::success(id, result),
                    Err(e) => {
                        error!(tool = %params.name, error = %e, "Failed to encode tool result");
                        JsonRpcResponse::error(id, rpc_codes::INTERNAL_ERROR, INTERNAL_ERROR_MESSAGE)
                    }
                }
            }
            Ok(Err(e)) => {
                error!(caller = %caller_key, tool = %params.name, error = %e, "Tool handler failed");
                JsonRpcResponse::error(
                    id,
                    rpc_codes::INTERNAL_ERROR,
                    format!("Tool execution failed: {e}"),
                )
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(caller = %caller_key, tool = %params.name, panic = %detail, "Tool handler panicked");
                JsonRpcResponse::error(id, rpc_codes::INTERNAL_ERROR, INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}
