//! Data-only descriptions of remotely callable tools.
//!
//! A [`ToolDescriptor`] is what discovery hands back for each tool: its name,
//! description, declared parameters, and the handle that performs the remote
//! round-trip. Descriptors are immutable once built.

use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::rpc::ToolSpec;

/// Handle that invokes a tool on the server.
///
/// Takes a JSON object of named arguments and returns the tool's result
/// value. Calling it performs a remote round-trip.
pub type InvokeFn = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Declared metadata for one tool parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamMeta {
    /// Parameter name.
    pub name: String,
    /// Declared type, as the server spelled it. Open vocabulary.
    pub ty: Option<String>,
    /// Declared description.
    pub description: Option<String>,
}

impl ParamMeta {
    /// Create a parameter with no declared type or description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            description: None,
        }
    }

    /// Set the declared type.
    pub fn with_type(mut self, ty: impl Into<String>) -> Self {
        self.ty = Some(ty.into());
        self
    }

    /// Set the declared description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A remote tool as described by its server.
#[derive(Clone)]
pub struct ToolDescriptor {
    /// Tool name, unique within one discovery batch.
    pub name: String,
    /// Human-readable description, possibly empty.
    pub description: String,
    /// Declared parameters, in discovery order.
    pub parameters: Vec<ParamMeta>,
    /// Invocation handle. `None` marks a descriptor whose tool could not be
    /// bound; such descriptors are rejected at conversion time, not here.
    pub invoke: Option<InvokeFn>,
}

impl ToolDescriptor {
    /// Create a descriptor with no parameters and no invocation handle.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            invoke: None,
        }
    }

    /// Append a declared parameter.
    pub fn with_param(mut self, param: ParamMeta) -> Self {
        self.parameters.push(param);
        self
    }

    /// Attach the invocation handle.
    pub fn with_invoke(mut self, invoke: InvokeFn) -> Self {
        self.invoke = Some(invoke);
        self
    }

    /// Build a descriptor from a wire-level tool spec and an invocation
    /// handle, flattening `inputSchema.properties` into [`ParamMeta`] entries.
    pub fn from_spec(spec: &ToolSpec, invoke: InvokeFn) -> Self {
        let mut parameters = Vec::new();
        if let Some(properties) = spec
            .input_schema
            .as_ref()
            .and_then(|schema| schema.get("properties"))
            .and_then(Value::as_object)
        {
            for (name, property) in properties {
                parameters.push(ParamMeta {
                    name: name.clone(),
                    ty: property
                        .get("type")
                        .and_then(Value::as_str)
                        .map(String::from),
                    description: property
                        .get("description")
                        .and_then(Value::as_str)
                        .map(String::from),
                });
            }
        }

        Self {
            name: spec.name.clone(),
            description: spec.description.clone().unwrap_or_default(),
            parameters,
            invoke: Some(invoke),
        }
    }

    /// Look up a declared parameter by name.
    pub fn param(&self, name: &str) -> Option<&ParamMeta> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("invoke", &self.invoke.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let invoke: InvokeFn = Arc::new(|_| Ok(Value::Null));
        let descriptor = ToolDescriptor::new("search", "Search the index")
            .with_param(ParamMeta::new("query").with_type("string"))
            .with_invoke(invoke);

        assert_eq!(descriptor.name, "search");
        assert_eq!(descriptor.parameters.len(), 1);
        assert!(descriptor.invoke.is_some());
        assert_eq!(descriptor.param("query").unwrap().ty.as_deref(), Some("string"));
        assert!(descriptor.param("missing").is_none());
    }

    #[test]
    fn test_from_spec_flattens_properties() {
        let spec = ToolSpec {
            name: "read_file".to_string(),
            description: Some("Read a file from disk".to_string()),
            input_schema: Some(json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "File path"}
                },
                "required": ["path"]
            })),
        };
        let invoke: InvokeFn = Arc::new(|_| Ok(Value::Null));
        let descriptor = ToolDescriptor::from_spec(&spec, invoke);

        assert_eq!(descriptor.name, "read_file");
        assert_eq!(descriptor.description, "Read a file from disk");
        assert_eq!(descriptor.parameters.len(), 1);
        let param = &descriptor.parameters[0];
        assert_eq!(param.name, "path");
        assert_eq!(param.ty.as_deref(), Some("string"));
        assert_eq!(param.description.as_deref(), Some("File path"));
    }

    #[test]
    fn test_from_spec_without_schema() {
        let spec = ToolSpec {
            name: "ping".to_string(),
            description: None,
            input_schema: None,
        };
        let invoke: InvokeFn = Arc::new(|_| Ok(Value::Null));
        let descriptor = ToolDescriptor::from_spec(&spec, invoke);

        assert_eq!(descriptor.description, "");
        assert!(descriptor.parameters.is_empty());
    }

    #[test]
    fn test_debug_hides_invoke() {
        let invoke: InvokeFn = Arc::new(|_| Ok(Value::Null));
        let descriptor = ToolDescriptor::new("t", "").with_invoke(invoke);
        let debug = format!("{:?}", descriptor);
        assert!(debug.contains("ToolDescriptor"));
        assert!(debug.contains("<fn>"));
    }
}
