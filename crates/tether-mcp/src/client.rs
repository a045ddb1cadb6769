//! Blocking MCP client over a single transport.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::{Result, ServiceError};
use crate::rpc::{
    CallToolParams, ClientCapabilities, InitializeParams, InitializeResult, ListToolsResult,
    PeerInfo, RpcErrorBody, RpcNotification, RpcRequest, RpcResponse, ToolCallOutcome, ToolSpec,
};
use crate::transport::{HttpConfig, Transport};

/// Handler invoked when the server sends a `sampling/createMessage` request.
///
/// The handler receives the raw request params and returns the raw result
/// value; neither side is interpreted by this crate.
pub type SamplingHandler = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// An MCP client bound to one server.
///
/// The client is blocking: every request holds the transport until its
/// response arrives. On stdio, server-initiated traffic that arrives while
/// waiting (notifications, sampling requests) is handled inline.
pub struct McpClient {
    /// Label for log lines, derived from the endpoint.
    label: String,
    transport: Mutex<Transport>,
    peer: Option<PeerInfo>,
    next_id: AtomicU64,
    ready: bool,
    sampling: Option<SamplingHandler>,
}

impl McpClient {
    /// Spawn a stdio server and wrap it. Does NOT perform the handshake.
    pub fn over_stdio(program: &str, args: &[String], env: &[(String, String)]) -> Result<Self> {
        let transport = Transport::spawn_stdio(program, args, env)?;
        tracing::info!(server = %program, "connected to MCP server via stdio");
        Ok(Self::from_transport(program.to_string(), transport))
    }

    /// Build a client for a remote HTTP server. Does NOT perform the handshake.
    pub fn over_http(config: HttpConfig) -> Result<Self> {
        let label = config.url.clone();
        let transport = Transport::connect_http(config)?;
        tracing::info!(server = %label, "connected to MCP server via HTTP");
        Ok(Self::from_transport(label, transport))
    }

    fn from_transport(label: String, transport: Transport) -> Self {
        Self {
            label,
            transport: Mutex::new(transport),
            peer: None,
            next_id: AtomicU64::new(1),
            ready: false,
            sampling: None,
        }
    }

    /// Attach a sampling handler. Must be done before [`handshake`](Self::handshake)
    /// so the capability is advertised.
    pub fn with_sampling(mut self, handler: SamplingHandler) -> Self {
        self.sampling = Some(handler);
        self
    }

    /// Label used in diagnostics (program name or URL).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Server identity, available after the handshake.
    pub fn peer(&self) -> Option<&PeerInfo> {
        self.peer.as_ref()
    }

    /// Check if the handshake has completed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Perform the MCP handshake. Idempotent.
    pub fn handshake(&mut self) -> Result<&PeerInfo> {
        if self.ready {
            return self.peer.as_ref().ok_or(ServiceError::NotInitialized);
        }

        let capabilities = if self.sampling.is_some() {
            ClientCapabilities::with_sampling()
        } else {
            ClientCapabilities::default()
        };
        let params = InitializeParams::new(capabilities);
        let raw = self.request("initialize", Some(serde_json::to_value(&params)?))?;
        let init: InitializeResult = serde_json::from_value(raw)?;

        self.notify("notifications/initialized", None)?;

        tracing::info!(
            server = %init.server_info.name,
            version = %init.server_info.version,
            protocol = %init.protocol_version,
            "MCP server initialized"
        );

        self.ready = true;
        Ok(self.peer.insert(init.server_info))
    }

    /// List the tools the server exposes.
    pub fn list_tools(&self) -> Result<Vec<ToolSpec>> {
        if !self.ready {
            return Err(ServiceError::NotInitialized);
        }
        let raw = self.request("tools/list", None)?;
        let listed: ListToolsResult = serde_json::from_value(raw)?;
        tracing::debug!(server = %self.label, tool_count = listed.tools.len(), "listed tools");
        Ok(listed.tools)
    }

    /// Call a tool with named arguments.
    pub fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<ToolCallOutcome> {
        if !self.ready {
            return Err(ServiceError::NotInitialized);
        }
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let raw = self.request("tools/call", Some(serde_json::to_value(&params)?))?;
        let outcome: ToolCallOutcome = serde_json::from_value(raw)?;
        if outcome.failed() {
            tracing::warn!(server = %self.label, tool = %name, "tool call returned error");
        } else {
            tracing::debug!(server = %self.label, tool = %name, "tool call succeeded");
        }
        Ok(outcome)
    }

    /// Close the underlying transport. Calls made afterwards fail.
    pub fn shutdown(&self) {
        tracing::info!(server = %self.label, "shutting down MCP client");
        if let Ok(mut transport) = self.transport.lock() {
            transport.close();
        }
    }

    /// Check whether the transport can still carry messages.
    pub fn is_alive(&self) -> bool {
        match self.transport.lock() {
            Ok(mut transport) => transport.alive(),
            Err(_) => false,
        }
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Send a request and wait for its response, servicing interleaved
    /// server-to-client traffic on the way.
    fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_request_id();
        let request = RpcRequest::new(id, method, params);

        let mut transport = self
            .transport
            .lock()
            .map_err(|_| ServiceError::transport("failed to acquire transport lock"))?;

        if let Some(raw) = transport.post(&serde_json::to_value(&request)?)? {
            // HTTP transports answer in the same round-trip.
            let response: RpcResponse = serde_json::from_value(raw)?;
            return response
                .into_result()
                .map_err(|e| ServiceError::rpc(e.code, e.message, e.data));
        }

        loop {
            let message = transport.next_message()?;
            if Self::answers(&message, id) {
                let response: RpcResponse = serde_json::from_value(message)?;
                return response
                    .into_result()
                    .map_err(|e| ServiceError::rpc(e.code, e.message, e.data));
            }
            if let Some(reply) = self.peer_reply(&message) {
                transport.post(&serde_json::to_value(&reply)?)?;
            }
        }
    }

    /// Send a notification; no response is expected.
    fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = RpcNotification::new(method, params);
        let mut transport = self
            .transport
            .lock()
            .map_err(|_| ServiceError::transport("failed to acquire transport lock"))?;
        transport.post_oneway(&serde_json::to_value(&notification)?)
    }

    /// Check whether a raw message is the response to request `id`.
    fn answers(message: &Value, id: u64) -> bool {
        message.get("method").is_none() && message.get("id").and_then(Value::as_u64) == Some(id)
    }

    /// Build the reply for a server-initiated message, if one is owed.
    ///
    /// Requests for `sampling/createMessage` go to the attached handler;
    /// other requests get a method-not-found error. Notifications are logged
    /// and dropped.
    fn peer_reply(&self, message: &Value) -> Option<RpcResponse> {
        let method = message.get("method").and_then(Value::as_str)?;
        let Some(id) = message.get("id").and_then(Value::as_u64) else {
            tracing::debug!(server = %self.label, method = %method, "ignoring server notification");
            return None;
        };

        if method == "sampling/createMessage" {
            if let Some(handler) = &self.sampling {
                tracing::debug!(server = %self.label, "handling sampling request");
                let params = message.get("params").cloned().unwrap_or(Value::Null);
                return Some(RpcResponse::ok(id, handler(params)));
            }
        }

        tracing::warn!(server = %self.label, method = %method, "rejecting unsupported server request");
        Some(RpcResponse::fail(id, RpcErrorBody::method_not_found(method)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn http_client() -> McpClient {
        McpClient::over_http(HttpConfig::new("http://localhost:9090/mcp")).unwrap()
    }

    #[test]
    fn test_over_stdio_nonexistent_program() {
        let result = McpClient::over_stdio("tether-no-such-server-417", &[], &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_calls_require_handshake() {
        let client = http_client();
        assert!(!client.is_ready());
        assert!(matches!(
            client.list_tools(),
            Err(ServiceError::NotInitialized)
        ));
        assert!(matches!(
            client.call_tool("echo", None),
            Err(ServiceError::NotInitialized)
        ));
    }

    #[test]
    fn test_label_from_endpoint() {
        let client = http_client();
        assert_eq!(client.label(), "http://localhost:9090/mcp");
        assert!(client.peer().is_none());
    }

    #[test]
    fn test_answers_matches_id_only_for_responses() {
        let response = json!({"jsonrpc": "2.0", "id": 4, "result": {}});
        assert!(McpClient::answers(&response, 4));
        assert!(!McpClient::answers(&response, 5));

        // A server request carries both id and method; it is not a response.
        let request = json!({"jsonrpc": "2.0", "id": 4, "method": "sampling/createMessage"});
        assert!(!McpClient::answers(&request, 4));
    }

    #[test]
    fn test_peer_reply_notification_ignored() {
        let client = http_client();
        let note = json!({"jsonrpc": "2.0", "method": "notifications/progress"});
        assert!(client.peer_reply(&note).is_none());
    }

    #[test]
    fn test_peer_reply_unsupported_request_rejected() {
        let client = http_client();
        let request = json!({"jsonrpc": "2.0", "id": 9, "method": "roots/list"});
        let reply = client.peer_reply(&request).unwrap();
        assert_eq!(reply.id, 9);
        assert_eq!(reply.error.unwrap().code, RpcErrorBody::METHOD_NOT_FOUND);
    }

    #[test]
    fn test_peer_reply_sampling_dispatched_to_handler() {
        let handler: SamplingHandler = Arc::new(|params| json!({"echoed": params}));
        let client = http_client().with_sampling(handler);

        let request = json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "sampling/createMessage",
            "params": {"messages": []}
        });
        let reply = client.peer_reply(&request).unwrap();
        assert_eq!(reply.id, 2);
        assert_eq!(reply.result.unwrap()["echoed"]["messages"], json!([]));
    }

    #[test]
    fn test_peer_reply_sampling_without_handler_rejected() {
        let client = http_client();
        let request = json!({"jsonrpc": "2.0", "id": 3, "method": "sampling/createMessage"});
        let reply = client.peer_reply(&request).unwrap();
        assert!(reply.is_error());
    }

    #[test]
    fn test_request_ids_increment() {
        let client = http_client();
        assert_eq!(client.next_request_id(), 1);
        assert_eq!(client.next_request_id(), 2);
        assert_eq!(client.next_request_id(), 3);
    }
}
