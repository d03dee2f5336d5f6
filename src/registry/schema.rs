//! Declarative argument schemas and the validator that enforces them.
//!
//! Each tool declares its parameters once. The same declaration renders the
//! advertised JSON Schema and drives validation, so the two cannot drift.
//!
//! # Validation rules (per declared parameter)
//!
//! 1. **Presence** – a required parameter that is absent (or `null`) fails.
//! 2. **Type** – integers must be JSON numbers with no fractional part;
//!    `6.0` is accepted, `"6"`, `true` and `6.5` are not.
//! 3. **Bounds** – the value must lie in the declared `[minimum, maximum]`.
//! 4. **Defaults** – an unset optional parameter takes its declared default.
//!
//! Keys that no parameter declares are ignored.

use serde_json::{Map, Value, json};
use thiserror::Error;

/// Why a `tools/call` was rejected before reaching a handler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No tool with this name is registered
    #[error("Tool not found: {0}")]
    ToolNotFound(String),
    /// A declared parameter is missing, mistyped, or out of bounds
    #[error("Invalid argument '{param}': {reason}")]
    InvalidArguments {
        /// Offending parameter
        param: String,
        /// Constraint that was violated
        reason: String,
    },
    /// `arguments` was present but not a JSON object
    #[error("Invalid arguments: expected a JSON object, got {0}")]
    ArgumentsNotObject(&'static str),
}

impl ValidationError {
    fn invalid(param: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            param: param.to_string(),
            reason: reason.into(),
        }
    }
}

/// One integer parameter of a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// Argument key
    pub name: &'static str,
    /// Human text shown in the schema
    pub description: &'static str,
    /// Inclusive lower bound
    pub minimum: u32,
    /// Inclusive upper bound
    pub maximum: u32,
    /// Value used when the caller omits the parameter; `None` makes it required
    pub default: Option<u32>,
}

impl ParamSpec {
    /// A parameter the caller must supply
    #[must_use]
    pub const fn required(
        name: &'static str,
        description: &'static str,
        minimum: u32,
        maximum: u32,
    ) -> Self {
        Self {
            name,
            description,
            minimum,
            maximum,
            default: None,
        }
    }

    /// A parameter that falls back to `default`
    #[must_use]
    pub const fn optional(
        name: &'static str,
        description: &'static str,
        minimum: u32,
        maximum: u32,
        default: u32,
    ) -> Self {
        Self {
            name,
            description,
            minimum,
            maximum,
            default: Some(default),
        }
    }

    /// Whether the caller must supply this parameter
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// JSON Schema fragment for this parameter
    #[must_use]
    pub fn to_schema(&self) -> Value {
        let mut schema = json!({
            "type": "integer",
            "description": self.description,
            "minimum": self.minimum,
            "maximum": self.maximum,
        });
        if let (Some(default), Some(obj)) = (self.default, schema.as_object_mut()) {
            obj.insert("default".to_string(), json!(default));
        }
        schema
    }

    /// Resolve this parameter from the caller's argument object
    pub fn resolve(&self, args: &Map<String, Value>) -> Result<u32, ValidationError> {
        let raw = match args.get(self.name) {
            None | Some(Value::Null) => {
                return self
                    .default
                    .ok_or_else(|| ValidationError::invalid(self.name, "is required"));
            }
            Some(v) => v,
        };

        let value = as_integer(raw).ok_or_else(|| {
            ValidationError::invalid(self.name, format!("must be an integer, got {}", describe(raw)))
        })?;

        if value < i128::from(self.minimum) {
            return Err(ValidationError::invalid(
                self.name,
                format!("must be >= {}, got {value}", self.minimum),
            ));
        }
        if value > i128::from(self.maximum) {
            return Err(ValidationError::invalid(
                self.name,
                format!("must be <= {}, got {value}", self.maximum),
            ));
        }

        u32::try_from(value).map_err(|_| {
            ValidationError::invalid(self.name, format!("{value} does not fit the parameter"))
        })
    }
}

/// Render an object schema from a parameter list
#[must_use]
pub fn object_schema(params: &[ParamSpec]) -> Value {
    let properties: Map<String, Value> = params
        .iter()
        .map(|p| (p.name.to_string(), p.to_schema()))
        .collect();
    let required: Vec<&str> = params
        .iter()
        .filter(|p| p.is_required())
        .map(|p| p.name)
        .collect();

    let mut schema = json!({
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty() {
        if let Some(obj) = schema.as_object_mut() {
            obj.insert("required".to_string(), json!(required));
        }
    }
    schema
}

/// Validated arguments, one resolved value per declared parameter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedArgs {
    values: Vec<(&'static str, u32)>,
}

impl ValidatedArgs {
    /// Value of a declared parameter
    #[must_use]
    pub fn get(&self, name: &str) -> Option<u32> {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    /// Value of a declared parameter, or an error naming it
    pub fn require(&self, name: &str) -> Result<u32, ValidationError> {
        self.get(name)
            .ok_or_else(|| ValidationError::invalid(name, "is required"))
    }
}

/// Check `arguments` against `params`. `null` means no arguments.
pub fn validate(params: &[ParamSpec], arguments: &Value) -> Result<ValidatedArgs, ValidationError> {
    let empty = Map::new();
    let args = match arguments {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => return Err(ValidationError::ArgumentsNotObject(type_name(other))),
    };

    let values = params
        .iter()
        .map(|p| p.resolve(args).map(|v| (p.name, v)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ValidatedArgs { values })
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Integral value of a JSON number, accepting floats with no fractional part
fn as_integer(value: &Value) -> Option<i128> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        return Some(i128::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(i128::from(u));
    }
    let f = n.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e18 {
        #[allow(clippy::cast_possible_truncation)]
        return Some(f as i128);
    }
    None
}

fn describe(value: &Value) -> String {
    match value {
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string \"{s}\""),
        other => type_name(other).to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
