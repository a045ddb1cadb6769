//! Bridges MCP tool servers into the Tether agent tool registry.
//!
//! Remote servers describe their tools as data; the agent engine wants
//! strongly-typed callables with introspectable parameter lists. This crate
//! sits between the two: [`ToolFactory`] manages the lifecycle of one
//! connection service and turns every discovered [`ToolDescriptor`] into a
//! [`BridgedTool`] ready for registration.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   descriptors   ┌──────────────────┐
//! │  ToolService     │ ──────────────▶ │  ToolFactory     │
//! │  (tether-mcp)    │                 │  - ownership     │
//! └──────────────────┘                 │  - conversion    │
//!                                      └────────┬─────────┘
//!                                               │ BridgedTool
//!                                               ▼
//!                                      ┌──────────────────┐
//!                                      │  ToolRegistry    │
//!                                      │  (agent engine)  │
//!                                      └──────────────────┘
//! ```
//!
//! Conversion is pure and in-memory; the only blocking operations are the
//! service's connection establishment, discovery, and each tool's remote
//! round-trip at dispatch time.

pub mod adapter;
pub mod error;
pub mod factory;
pub mod tool;

// Re-export core types
pub use adapter::{BridgedTool, RESERVED_PARAM, SUBSTITUTE_PARAM};
pub use error::{BridgeError, Result};
pub use factory::ToolFactory;
pub use tool::{ParamSpec, ParamType, Tool, ToolRegistry};

// Re-export the service contract consumers wire factories up with
pub use tether_mcp::{
    Endpoint, InvokeFn, McpToolService, ParamMeta, ServiceConfig, ServiceError, ToolDescriptor,
    ToolService,
};
