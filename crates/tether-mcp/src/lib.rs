//! MCP (Model Context Protocol) connection service for Tether.
//!
//! This crate owns the connection to a tool server: it spawns or dials the
//! server, completes the MCP handshake, discovers tools, and invokes them.
//! Consumers see it through the [`ToolService`] contract and the
//! [`ToolDescriptor`] values discovery hands back.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  McpToolService                                             │
//! │  - start/stop lifecycle with bounded retries                │
//! │  - tool discovery -> Vec<ToolDescriptor>                    │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  McpClient                                                  │
//! │  - initialize, tools/list, tools/call                       │
//! │  - answers server-initiated sampling requests               │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Transport                                                  │
//! │  - JSON-RPC 2.0 with Content-Length framing (stdio)         │
//! │  - HTTP POST with retry (remote)                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use tether_mcp::{McpToolService, ServiceConfig, ToolService};
//!
//! let service = McpToolService::new(
//!     ServiceConfig::command("mcp-server-sqlite")
//!         .with_arg("--db")
//!         .with_arg("/path/to/database.db"),
//! );
//!
//! if service.start() {
//!     for descriptor in service.descriptors()? {
//!         println!("tool: {}", descriptor.name);
//!     }
//! }
//! service.stop();
//! ```

pub mod client;
pub mod descriptor;
pub mod error;
pub mod rpc;
pub mod service;
pub mod transport;

// Re-export main types
pub use client::{McpClient, SamplingHandler};
pub use descriptor::{InvokeFn, ParamMeta, ToolDescriptor};
pub use error::{Result, ServiceError};
pub use rpc::{
    CallToolParams, ContentItem, InitializeParams, InitializeResult, ListToolsResult, PeerInfo,
    RpcErrorBody, RpcNotification, RpcRequest, RpcResponse, ToolCallOutcome, ToolSpec,
};
pub use service::{Endpoint, McpToolService, ServiceConfig, ToolService};
pub use transport::{HttpConfig, Transport};
