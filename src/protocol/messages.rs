//! JSON-RPC message types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Content, JSONRPC_VERSION, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, Tool};

/// Inbound JSON-RPC request.
///
/// Parsing is lenient: a missing `jsonrpc` field is tolerated, a missing `id`
/// becomes `null`, and `method` is kept as raw JSON so a non-string method is
/// classified as unknown rather than rejected as unparseable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JsonRpcRequest {
    /// Correlation token, echoed verbatim
    #[serde(default)]
    pub id: Value,
    /// Method name
    #[serde(default)]
    pub method: Value,
    /// Parameters
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Decode a raw buffer. Only a JSON object is a message.
    pub fn parse(raw: &[u8]) -> Result<Self, String> {
        let value: Value = serde_json::from_slice(raw).map_err(|e| e.to_string())?;
        if !value.is_object() {
            return Err(format!(
                "expected a JSON object, got {}",
                json_type_name(&value)
            ));
        }
        serde_json::from_value(value).map_err(|e| e.to_string())
    }

    /// Classify the requested method
    #[must_use]
    pub fn method(&self) -> Method<'_> {
        match self.method.as_str() {
            Some(METHOD_TOOLS_LIST) => Method::ToolsList,
            Some(METHOD_TOOLS_CALL) => Method::ToolsCall,
            Some("") | None => Method::Missing,
            Some(other) => Method::Unknown(other),
        }
    }
}

/// Supported operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method<'a> {
    /// `tools/list`
    ToolsList,
    /// `tools/call`
    ToolsCall,
    /// Any other method name
    Unknown(&'a str),
    /// `method` is absent, empty, or not a string
    Missing,
}

/// JSON-RPC response envelope. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Echoed request id, `null` when absent or unparseable
    pub id: Value,
    /// Result (on success)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error (on failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a success response
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Error code, if this is an error envelope
    #[must_use]
    pub fn error_code(&self) -> Option<i32> {
        self.error.as_ref().map(|e| e.code)
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
}

// ============================================================================
// Tools
// ============================================================================

/// Tools list result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsListResult {
    /// List of tools
    pub tools: Vec<Tool>,
}

/// Tools call request params
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsCallParams {
    /// Tool name
    pub name: String,
    /// Tool arguments (`null` when omitted)
    #[serde(default)]
    pub arguments: Value,
}

/// Tools call result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsCallResult {
    /// Content items
    pub content: Vec<Content>,
    /// Whether result is an error
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolsCallResult {
    /// Successful result carrying one rendered text item
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: false,
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parse_tolerates_missing_jsonrpc_and_id() {
        let req = JsonRpcRequest::parse(br#"{"method":"tools/list"}"#).unwrap();
        assert_eq!(req.id, Value::Null);
        assert_eq!(req.method(), Method::ToolsList);
        assert!(req.params.is_none());
    }

    #[test]
    fn parse_keeps_any_id_shape() {
        for id in [json!(7), json!("abc"), json!(1.5), json!({"k": [1]}), json!(null)] {
            let raw = serde_json::to_vec(&json!({"jsonrpc": "2.0", "id": id, "method": "x"})).unwrap();
            let req = JsonRpcRequest::parse(&raw).unwrap();
            assert_eq!(req.id, id);
        }
    }

    #[test]
    fn parse_rejects_non_objects() {
        assert!(JsonRpcRequest::parse(b"not json").is_err());
        assert!(JsonRpcRequest::parse(b"").is_err());
        let err = JsonRpcRequest::parse(br#"[{"method":"tools/list"}]"#).unwrap_err();
        assert!(err.contains("array"));
        assert!(JsonRpcRequest::parse(b"42").is_err());
    }

    #[test]
    fn method_classification() {
        let call = JsonRpcRequest::parse(br#"{"method":"tools/call"}"#).unwrap();
        assert_eq!(call.method(), Method::ToolsCall);
        let other = JsonRpcRequest::parse(br#"{"method":"resources/list"}"#).unwrap();
        assert_eq!(other.method(), Method::Unknown("resources/list"));
        let numeric = JsonRpcRequest::parse(br#"{"id":1,"method":5}"#).unwrap();
        assert_eq!(numeric.method(), Method::Missing);
        let missing = JsonRpcRequest::parse(br#"{"id":1}"#).unwrap();
        assert_eq!(missing.method(), Method::Missing);
        let empty = JsonRpcRequest::parse(br#"{"id":1,"method":""}"#).unwrap();
        assert_eq!(empty.method(), Method::Missing);
    }

    #[test]
    fn success_envelope_shape() {
        let resp = JsonRpcResponse::success(json!(1), json!({"tools": []}));
        let wire = serde_json::to_value(&resp).unwrap();
        assert_eq!(wire, json!({"jsonrpc": "2.0", "id": 1, "result": {"tools": []}}));
    }

    #[test]
    fn error_envelope_keeps_null_id() {
        let resp = JsonRpcResponse::error(Value::Null, -32700, "Parse error");
        let wire = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            wire,
            json!({"jsonrpc": "2.0", "id": null, "error": {"code": -32700, "message": "Parse error"}})
        );
        assert_eq!(resp.error_code(), Some(-32700));
    }

    #[test]
    fn tools_call_params_arguments_default_to_null() {
        let params: ToolsCallParams = serde_json::from_value(json!({"name": "roll_d6"})).unwrap();
        assert_eq!(params.name, "roll_d6");
        assert!(params.arguments.is_null());
        assert!(serde_json::from_value::<ToolsCallParams>(json!({"arguments": {}})).is_err());
    }

    #[test]
    fn tools_call_result_shape() {
        let wire = serde_json::to_value(ToolsCallResult::text("🎲 d6 roll: **4**")).unwrap();
        assert_eq!(
            wire,
            json!({"content": [{"type": "text", "text": "🎲 d6 roll: **4**"}], "isError": false})
        );
    }
}
