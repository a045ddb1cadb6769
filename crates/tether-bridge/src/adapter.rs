//! Runtime-synthesized tools wrapping remote tool descriptors.
//!
//! A [`BridgedTool`] is built from one [`ToolDescriptor`] at conversion time.
//! Its declared inputs become the formal parameter list the agent engine
//! introspects, and its dispatch forwards every argument to the descriptor's
//! invocation handle under the parameter's ORIGINAL name.
//!
//! Two quirks of the translation matter:
//!
//! - `kwargs` is reserved by the agent's calling convention. A descriptor
//!   declaring a parameter with that exact name gets a single adapter-facing
//!   input named `query` instead, and dispatch forwards the value back under
//!   `kwargs`.
//! - Every tool must expose at least one input. A descriptor with no
//!   parameters gets a synthetic string input named `query`.

use serde_json::Value;

use tether_mcp::{InvokeFn, ToolDescriptor};

use crate::error::{BridgeError, Result};
use crate::tool::{ParamSpec, ParamType, Tool};

/// Parameter name reserved by the agent's calling convention.
pub const RESERVED_PARAM: &str = "kwargs";

/// Adapter-facing name substituted for the reserved parameter, and injected
/// for parameterless tools.
pub const SUBSTITUTE_PARAM: &str = "query";

/// Description given to the injected parameter of a parameterless tool.
const INJECTED_PARAM_DESCRIPTION: &str = "Input query for the tool";

/// A remote tool exposed through the [`Tool`] interface.
pub struct BridgedTool {
    name: String,
    description: String,
    /// Adapter-facing inputs, in declaration order.
    schema: Vec<ParamSpec>,
    /// Original parameter name for each schema entry, in the same order.
    originals: Vec<String>,
    /// Whether a reserved `kwargs` parameter was renamed to `query`.
    renamed_reserved: bool,
    invoke: InvokeFn,
    /// Diagnostic label, `Adapter_<name>`. No behavioral effect.
    type_label: String,
}

impl BridgedTool {
    /// Synthesize a tool from a descriptor.
    ///
    /// # Errors
    /// Fails with a conversion error when the descriptor has an empty name
    /// or no invocation handle.
    pub fn from_descriptor(descriptor: &ToolDescriptor) -> Result<Self> {
        if descriptor.name.is_empty() {
            return Err(BridgeError::conversion("descriptor is missing a tool name"));
        }
        let invoke = descriptor.invoke.clone().ok_or_else(|| {
            BridgeError::conversion(format!(
                "tool '{}' has no invocation handle",
                descriptor.name
            ))
        })?;

        let mut schema = Vec::new();
        let mut originals = Vec::new();
        let mut renamed_reserved = false;

        if let Some(reserved) = descriptor.param(RESERVED_PARAM) {
            // The reserved parameter collapses the schema to a single input;
            // the agent engine cannot bind a formal parameter named kwargs.
            renamed_reserved = true;
            if descriptor.parameters.len() > 1 {
                tracing::warn!(
                    tool = %descriptor.name,
                    "dropping parameters declared alongside '{}'",
                    RESERVED_PARAM
                );
            }
            schema.push(ParamSpec::new(
                SUBSTITUTE_PARAM,
                ParamType::from_declared(reserved.ty.as_deref()),
                reserved
                    .description
                    .clone()
                    .unwrap_or_else(|| format!("Parameter: {}", RESERVED_PARAM)),
            ));
            originals.push(RESERVED_PARAM.to_string());
        } else {
            for param in &descriptor.parameters {
                schema.push(ParamSpec::new(
                    param.name.as_str(),
                    ParamType::from_declared(param.ty.as_deref()),
                    param
                        .description
                        .clone()
                        .unwrap_or_else(|| format!("Parameter: {}", param.name)),
                ));
                originals.push(param.name.clone());
            }
        }

        if schema.is_empty() {
            schema.push(ParamSpec::new(
                SUBSTITUTE_PARAM,
                ParamType::String,
                INJECTED_PARAM_DESCRIPTION,
            ));
            originals.push(SUBSTITUTE_PARAM.to_string());
        }

        let tool = Self {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            schema,
            originals,
            renamed_reserved,
            invoke,
            type_label: format!("Adapter_{}", descriptor.name),
        };

        tracing::debug!(
            adapter = %tool.type_label,
            inputs = ?tool.param_names(),
            "synthesized bridged tool"
        );
        Ok(tool)
    }

    /// Whether a reserved `kwargs` parameter was renamed.
    pub fn renamed_reserved_param(&self) -> bool {
        self.renamed_reserved
    }

    /// Adapter-facing input names, in formal-parameter order.
    pub fn param_names(&self) -> Vec<&str> {
        self.schema.iter().map(|spec| spec.name.as_str()).collect()
    }

    /// Diagnostic type label.
    pub fn type_label(&self) -> &str {
        &self.type_label
    }
}

impl Tool for BridgedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn inputs(&self) -> &[ParamSpec] {
        &self.schema
    }

    fn dispatch(&self, args: &[Value]) -> Result<Value> {
        if args.len() != self.schema.len() {
            return Err(BridgeError::invalid_arguments(format!(
                "tool '{}' takes {} argument(s), got {}",
                self.name,
                self.schema.len(),
                args.len()
            )));
        }

        let mut forwarded = serde_json::Map::new();
        for (original, value) in self.originals.iter().zip(args) {
            forwarded.insert(original.clone(), value.clone());
        }

        tracing::debug!(tool = %self.name, "dispatching bridged tool");
        (self.invoke)(Value::Object(forwarded)).map_err(BridgeError::from)
    }
}

impl std::fmt::Debug for BridgedTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(&self.type_label)
            .field("name", &self.name)
            .field("inputs", &self.param_names())
            .field("renamed_reserved", &self.renamed_reserved)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tether_mcp::ParamMeta;

    /// An invoke handle that records every argument object it receives.
    fn recording_invoke() -> (InvokeFn, Arc<Mutex<Vec<Value>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        let invoke: InvokeFn = Arc::new(move |args| {
            seen.lock().unwrap().push(args);
            Ok(Value::String("ok".to_string()))
        });
        (invoke, calls)
    }

    #[test]
    fn test_plain_descriptor_schema_and_forwarding() {
        let (invoke, calls) = recording_invoke();
        let descriptor = ToolDescriptor::new("search", "Search the index")
            .with_param(ParamMeta::new("query").with_type("string"))
            .with_invoke(invoke);

        let tool = BridgedTool::from_descriptor(&descriptor).unwrap();
        assert_eq!(tool.name(), "search");
        assert_eq!(tool.output_type(), "string");
        assert!(!tool.renamed_reserved_param());

        let inputs = tool.inputs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].name, "query");
        assert_eq!(inputs[0].ty, ParamType::String);
        assert_eq!(inputs[0].description, "Parameter: query");

        tool.dispatch(&[json!("x")]).unwrap();
        assert_eq!(calls.lock().unwrap()[0], json!({"query": "x"}));
    }

    #[test]
    fn test_schema_preserves_declaration_order() {
        let (invoke, _) = recording_invoke();
        let descriptor = ToolDescriptor::new("multi", "")
            .with_param(ParamMeta::new("zeta").with_type("string"))
            .with_param(ParamMeta::new("alpha").with_type("integer"))
            .with_param(ParamMeta::new("mid").with_type("boolean"))
            .with_invoke(invoke);

        let tool = BridgedTool::from_descriptor(&descriptor).unwrap();
        assert_eq!(tool.param_names(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_dispatch_forwards_under_original_names_in_order() {
        let (invoke, calls) = recording_invoke();
        let descriptor = ToolDescriptor::new("pair", "")
            .with_param(ParamMeta::new("left").with_type("integer"))
            .with_param(ParamMeta::new("right").with_type("integer"))
            .with_invoke(invoke);

        let tool = BridgedTool::from_descriptor(&descriptor).unwrap();
        tool.dispatch(&[json!(1), json!(2)]).unwrap();
        assert_eq!(calls.lock().unwrap()[0], json!({"left": 1, "right": 2}));
    }

    #[test]
    fn test_reserved_param_renamed_to_query() {
        let (invoke, calls) = recording_invoke();
        let descriptor = ToolDescriptor::new("run", "Run a command")
            .with_param(ParamMeta::new("kwargs").with_type("object"))
            .with_invoke(invoke);

        let tool = BridgedTool::from_descriptor(&descriptor).unwrap();
        assert!(tool.renamed_reserved_param());
        assert_eq!(tool.param_names(), vec!["query"]);
        assert_eq!(tool.inputs()[0].ty, ParamType::Object);
        // Description defaults from the ORIGINAL name, not the substitute.
        assert_eq!(tool.inputs()[0].description, "Parameter: kwargs");

        tool.dispatch(&[json!({"a": 1})]).unwrap();
        assert_eq!(calls.lock().unwrap()[0], json!({"kwargs": {"a": 1}}));
    }

    #[test]
    fn test_reserved_param_keeps_declared_description() {
        let (invoke, _) = recording_invoke();
        let descriptor = ToolDescriptor::new("run", "")
            .with_param(
                ParamMeta::new("kwargs")
                    .with_type("object")
                    .with_description("Raw keyword arguments"),
            )
            .with_invoke(invoke);

        let tool = BridgedTool::from_descriptor(&descriptor).unwrap();
        assert_eq!(tool.inputs()[0].description, "Raw keyword arguments");
    }

    #[test]
    fn test_reserved_param_collapses_schema_to_one_input() {
        let (invoke, calls) = recording_invoke();
        let descriptor = ToolDescriptor::new("mixed", "")
            .with_param(ParamMeta::new("kwargs").with_type("object"))
            .with_param(ParamMeta::new("other").with_type("string"))
            .with_invoke(invoke);

        let tool = BridgedTool::from_descriptor(&descriptor).unwrap();
        assert_eq!(tool.param_names(), vec!["query"]);

        tool.dispatch(&[json!({"k": "v"})]).unwrap();
        assert_eq!(calls.lock().unwrap()[0], json!({"kwargs": {"k": "v"}}));
    }

    #[test]
    fn test_parameterless_descriptor_gets_injected_query() {
        let (invoke, calls) = recording_invoke();
        let descriptor = ToolDescriptor::new("ping", "Liveness probe").with_invoke(invoke);

        let tool = BridgedTool::from_descriptor(&descriptor).unwrap();
        assert!(!tool.renamed_reserved_param());
        let inputs = tool.inputs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].name, "query");
        assert_eq!(inputs[0].ty, ParamType::String);
        assert_eq!(inputs[0].description, "Input query for the tool");

        tool.dispatch(&[json!("anything")]).unwrap();
        assert_eq!(calls.lock().unwrap()[0], json!({"query": "anything"}));
    }

    #[test]
    fn test_unrecognized_type_falls_back_to_string() {
        let (invoke, _) = recording_invoke();
        let descriptor = ToolDescriptor::new("odd", "")
            .with_param(ParamMeta::new("payload").with_type("tuple"))
            .with_param(ParamMeta::new("bare"))
            .with_invoke(invoke);

        let tool = BridgedTool::from_descriptor(&descriptor).unwrap();
        // The lenient fallback can mask a bad descriptor; assert the exact
        // substitution so the behavior stays deliberate.
        assert_eq!(tool.inputs()[0].ty, ParamType::String);
        assert_eq!(tool.inputs()[1].ty, ParamType::String);
    }

    #[test]
    fn test_type_aliases_map_into_fixed_vocabulary() {
        let (invoke, _) = recording_invoke();
        let descriptor = ToolDescriptor::new("typed", "")
            .with_param(ParamMeta::new("s").with_type("str"))
            .with_param(ParamMeta::new("i").with_type("int"))
            .with_param(ParamMeta::new("f").with_type("float"))
            .with_param(ParamMeta::new("b").with_type("bool"))
            .with_param(ParamMeta::new("l").with_type("list"))
            .with_param(ParamMeta::new("d").with_type("dict"))
            .with_invoke(invoke);

        let tool = BridgedTool::from_descriptor(&descriptor).unwrap();
        let types: Vec<ParamType> = tool.inputs().iter().map(|spec| spec.ty).collect();
        assert_eq!(
            types,
            vec![
                ParamType::String,
                ParamType::Integer,
                ParamType::Number,
                ParamType::Boolean,
                ParamType::Array,
                ParamType::Object,
            ]
        );
    }

    #[test]
    fn test_empty_name_rejected() {
        let (invoke, _) = recording_invoke();
        let descriptor = ToolDescriptor::new("", "nameless").with_invoke(invoke);
        let err = BridgedTool::from_descriptor(&descriptor).unwrap_err();
        assert!(matches!(err, BridgeError::Conversion(_)));
    }

    #[test]
    fn test_missing_invoke_rejected() {
        let descriptor =
            ToolDescriptor::new("handleless", "").with_param(ParamMeta::new("x"));
        let err = BridgedTool::from_descriptor(&descriptor).unwrap_err();
        match err {
            BridgeError::Conversion(msg) => assert!(msg.contains("handleless")),
            other => panic!("expected conversion error, got {}", other),
        }
    }

    #[test]
    fn test_dispatch_arity_checked() {
        let (invoke, calls) = recording_invoke();
        let descriptor = ToolDescriptor::new("one", "")
            .with_param(ParamMeta::new("only"))
            .with_invoke(invoke);

        let tool = BridgedTool::from_descriptor(&descriptor).unwrap();
        let err = tool.dispatch(&[]).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArguments(_)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_invoke_failure_surfaces_as_service_error() {
        let invoke: InvokeFn =
            Arc::new(|_| Err(tether_mcp::ServiceError::tool("backend exploded")));
        let descriptor = ToolDescriptor::new("flaky", "")
            .with_param(ParamMeta::new("x"))
            .with_invoke(invoke);

        let tool = BridgedTool::from_descriptor(&descriptor).unwrap();
        let err = tool.dispatch(&[json!(1)]).unwrap_err();
        match err {
            BridgeError::Service(service_err) => {
                assert!(service_err.to_string().contains("backend exploded"))
            }
            other => panic!("expected service error, got {}", other),
        }
    }

    #[test]
    fn test_debug_label() {
        let (invoke, _) = recording_invoke();
        let descriptor = ToolDescriptor::new("search", "").with_invoke(invoke);
        let tool = BridgedTool::from_descriptor(&descriptor).unwrap();
        assert_eq!(tool.type_label(), "Adapter_search");
        assert!(format!("{:?}", tool).contains("Adapter_search"));
    }
}
