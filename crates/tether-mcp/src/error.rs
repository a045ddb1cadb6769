//! Error types for the connection service.

use thiserror::Error;

/// Result type for service-level operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Error type for transport, protocol, and service faults.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Failed to spawn the tool server process.
    #[error("failed to spawn tool server: {0}")]
    Spawn(String),

    /// Failed to exchange bytes with the tool server.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server sent something that is not valid MCP.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error on the underlying pipe.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered a request with a JSON-RPC error.
    #[error("server error {code}: {message}")]
    Rpc {
        /// Error code from the server.
        code: i64,
        /// Error message from the server.
        message: String,
        /// Optional additional data.
        data: Option<serde_json::Value>,
    },

    /// A tool invocation reported failure.
    #[error("tool error: {0}")]
    Tool(String),

    /// The MCP handshake has not completed.
    #[error("session not initialized - call handshake() first")]
    NotInitialized,

    /// The service has not been started or has lost its connection.
    #[error("service not connected")]
    NotConnected,

    /// The peer closed the connection.
    #[error("connection closed")]
    Closed,

    /// Timed out waiting for the server.
    #[error("timed out waiting for server response")]
    Timeout,
}

impl ServiceError {
    /// Create a spawn error.
    pub fn spawn(msg: impl Into<String>) -> Self {
        Self::Spawn(msg.into())
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a server error from a JSON-RPC error body.
    pub fn rpc(code: i64, message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
            data,
        }
    }

    /// Create a tool error.
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }
}
