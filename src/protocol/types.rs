//! Tool-facing protocol type definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition as advertised by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// Input JSON Schema
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Content item in a tool call response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Content {
    /// Text content
    #[serde(rename = "text")]
    Text {
        /// Text value
        text: String,
    },
}

impl Content {
    /// Text content item
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}
