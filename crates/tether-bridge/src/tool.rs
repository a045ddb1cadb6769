//! Tool interface for the agent side of the bridge.
//!
//! This module defines the [`Tool`] trait bridged tools are exposed through,
//! the fixed parameter-type vocabulary, and the [`ToolRegistry`] the agent's
//! execution engine calls into.
//!
//! The engine binds arguments by introspecting a tool's declared inputs: the
//! ordered [`ParamSpec`] list returned by [`Tool::inputs`] IS the tool's
//! formal parameter list, and [`Tool::dispatch`] receives one positional
//! argument per entry, in that order.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Parameter vocabulary
// ─────────────────────────────────────────────────────────────────────────────

/// The fixed parameter-type vocabulary tools declare their inputs in.
///
/// Remote servers describe parameters in an open vocabulary; everything is
/// funneled into these six values before a tool is exposed to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Free text.
    String,
    /// Whole number.
    Integer,
    /// Floating-point number.
    Number,
    /// True/false.
    Boolean,
    /// Ordered list.
    Array,
    /// Key/value mapping.
    Object,
}

impl ParamType {
    /// Map a declared type name onto the fixed vocabulary.
    ///
    /// Accepts the JSON Schema spellings plus the aliases commonly emitted by
    /// servers describing native types (`str`, `int`, `float`, `bool`,
    /// `list`, `dict`).
    pub fn from_alias(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "string" | "str" => Some(Self::String),
            "integer" | "int" => Some(Self::Integer),
            "number" | "float" | "double" => Some(Self::Number),
            "boolean" | "bool" => Some(Self::Boolean),
            "array" | "list" => Some(Self::Array),
            "object" | "dict" | "map" | "mapping" => Some(Self::Object),
            _ => None,
        }
    }

    /// Map an optional declared type, defaulting unknown or absent types to
    /// [`ParamType::String`].
    pub fn from_declared(declared: Option<&str>) -> Self {
        declared.and_then(Self::from_alias).unwrap_or(Self::String)
    }

    /// Canonical name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared tool input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Input name.
    pub name: String,
    /// Input type from the fixed vocabulary.
    #[serde(rename = "type")]
    pub ty: ParamType,
    /// Human-readable description.
    pub description: String,
}

impl ParamSpec {
    /// Create an input spec.
    pub fn new(name: impl Into<String>, ty: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            description: description.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for agent tools.
///
/// Implementations are stateless between calls; whether a tool may be
/// dispatched concurrently depends on whatever it forwards to.
pub trait Tool: Send + Sync {
    /// Unique name of this tool.
    fn name(&self) -> &str;

    /// Human-readable description of what this tool does.
    fn description(&self) -> &str;

    /// Declared inputs, in formal-parameter order.
    fn inputs(&self) -> &[ParamSpec];

    /// Type of the value dispatch produces.
    fn output_type(&self) -> &'static str {
        "string"
    }

    /// Execute the tool with one positional argument per declared input.
    fn dispatch(&self, args: &[Value]) -> Result<Value>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool registry
// ─────────────────────────────────────────────────────────────────────────────

/// Registry for managing available tools.
///
/// The registry is the engine-facing surface: it resolves tools by name,
/// binds named arguments against a tool's declared inputs, and dispatches.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. A tool with the same name is replaced.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Register a tool from an Arc.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Render every tool as a JSON definition for the model-facing side.
    pub fn definitions(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|tool| {
                let mut inputs = serde_json::Map::new();
                for spec in tool.inputs() {
                    inputs.insert(
                        spec.name.clone(),
                        serde_json::json!({
                            "type": spec.ty.as_str(),
                            "description": spec.description,
                        }),
                    );
                }
                serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputs": inputs,
                    "output_type": tool.output_type(),
                })
            })
            .collect()
    }

    /// Invoke a tool with a JSON object of named arguments.
    ///
    /// Arguments are bound against the tool's declared inputs in order;
    /// every declared input must be present.
    pub fn invoke(&self, name: &str, args: &Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| BridgeError::ToolNotFound(name.to_string()))?;
        let bound = bind_arguments(tool.as_ref(), args)?;
        tool.dispatch(&bound)
    }
}

/// Bind a JSON object of named arguments to a tool's formal parameter list.
fn bind_arguments(tool: &dyn Tool, args: &Value) -> Result<Vec<Value>> {
    let object = args.as_object().ok_or_else(|| {
        BridgeError::invalid_arguments(format!(
            "tool '{}' expects a JSON object of named arguments",
            tool.name()
        ))
    })?;

    tool.inputs()
        .iter()
        .map(|spec| {
            object.get(&spec.name).cloned().ok_or_else(|| {
                BridgeError::invalid_arguments(format!(
                    "missing argument '{}' for tool '{}'",
                    spec.name,
                    tool.name()
                ))
            })
        })
        .collect()
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
