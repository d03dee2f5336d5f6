//! Tool registry: the immutable catalog plus argument validation.
//!
//! Built once at startup and shared read-only, so it needs no locking.

mod catalog;
mod schema;

pub use catalog::{ToolCall, ToolDescriptor, ToolKind, dice_tools};
pub use schema::{ParamSpec, ValidatedArgs, ValidationError, object_schema, validate};

use serde_json::Value;

use crate::protocol::Tool;

impl ToolDescriptor {
    /// Protocol view advertised by `tools/list`
    #[must_use]
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: object_schema(self.params),
        }
    }
}

/// Immutable tool catalog
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
    tools: Vec<Tool>,
}

impl ToolRegistry {
    /// Registry holding the dice catalog
    #[must_use]
    pub fn dice() -> Self {
        let descriptors = dice_tools();
        debug_assert!(
            descriptors
                .iter()
                .enumerate()
                .all(|(i, d)| descriptors[..i].iter().all(|o| o.name != d.name)),
            "tool names must be unique"
        );
        let tools = descriptors.iter().map(ToolDescriptor::to_tool).collect();
        Self { descriptors, tools }
    }

    /// Catalog entries in advertised order
    #[must_use]
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Protocol view of the catalog, same order as [`Self::descriptors`]
    #[must_use]
    pub fn list_tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Number of registered tools
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Look up `name` and check `arguments` against its schema.
    ///
    /// Pure: consults nothing but the catalog.
    pub fn validate(&self, name: &str, arguments: &Value) -> Result<ToolCall, ValidationError> {
        let descriptor = self
            .descriptors
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| ValidationError::ToolNotFound(name.to_string()))?;
        let args = validate(descriptor.params, arguments)?;
        ToolCall::bind(descriptor.kind, &args)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::dice()
    }
}
