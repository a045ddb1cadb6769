//! Error types for the bridge crate.

use thiserror::Error;

use tether_mcp::ServiceError;

/// Result type alias using the bridge error type.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Error type for bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The underlying connection service failed.
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// A descriptor could not be turned into a tool.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Lookup by name found nothing.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Dispatch arguments did not match the declared inputs.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Create a conversion error.
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    /// Create an invalid-arguments error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BridgeError::conversion("descriptor is missing a tool name");
        assert!(err.to_string().contains("conversion error"));
        assert!(err.to_string().contains("missing a tool name"));
    }

    #[test]
    fn test_tool_not_found() {
        let err = BridgeError::ToolNotFound("search".to_string());
        assert!(err.to_string().contains("tool not found"));
        assert!(err.to_string().contains("search"));
    }

    #[test]
    fn test_service_error_conversion() {
        let err: BridgeError = ServiceError::NotConnected.into();
        assert!(matches!(err, BridgeError::Service(_)));
    }
}
