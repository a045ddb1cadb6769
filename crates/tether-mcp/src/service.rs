//! The connection service: one logical connection to a tool server.
//!
//! [`ToolService`] is the contract consumers depend on; [`McpToolService`] is
//! the MCP-backed implementation. The service owns connection establishment
//! (with retries), tool discovery, and shutdown. Concurrent use of the
//! descriptors it hands out is only as safe as the underlying server session,
//! which serializes requests on one transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::client::{McpClient, SamplingHandler};
use crate::descriptor::{InvokeFn, ToolDescriptor};
use crate::error::{Result, ServiceError};
use crate::transport::HttpConfig;

/// Pause between connection attempts.
const RETRY_PAUSE: Duration = Duration::from_millis(100);

/// Where the tool server lives. The two transports are mutually exclusive.
#[derive(Debug, Clone)]
pub enum Endpoint {
    /// Remote server reached over HTTP.
    Url(String),
    /// Local server spawned as a child process.
    Command {
        /// Program to spawn.
        program: String,
        /// Arguments passed to the program.
        args: Vec<String>,
        /// Environment variables set for the process.
        env: Vec<(String, String)>,
    },
}

impl Endpoint {
    /// Label used in diagnostics.
    pub fn label(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Command { program, .. } => program,
        }
    }
}

/// Configuration for a [`McpToolService`].
#[derive(Clone)]
pub struct ServiceConfig {
    /// Transport endpoint.
    pub endpoint: Endpoint,
    /// Handler for server-initiated sampling requests, forwarded opaquely.
    pub sampling: Option<SamplingHandler>,
    /// Timeout for connection attempts and HTTP requests.
    pub connection_timeout: Duration,
    /// Connection retry attempts beyond the first.
    pub max_retries: u32,
}

impl ServiceConfig {
    /// Configure a service for a remote HTTP server.
    pub fn url(url: impl Into<String>) -> Self {
        Self::for_endpoint(Endpoint::Url(url.into()))
    }

    /// Configure a service for a local stdio server.
    pub fn command(program: impl Into<String>) -> Self {
        Self::for_endpoint(Endpoint::Command {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        })
    }

    fn for_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            sampling: None,
            connection_timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    /// Add an argument (stdio endpoints only; ignored otherwise).
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        if let Endpoint::Command { args, .. } = &mut self.endpoint {
            args.push(arg.into());
        }
        self
    }

    /// Replace the argument list (stdio endpoints only; ignored otherwise).
    pub fn with_args(mut self, new_args: Vec<String>) -> Self {
        if let Endpoint::Command { args, .. } = &mut self.endpoint {
            *args = new_args;
        }
        self
    }

    /// Add an environment variable (stdio endpoints only; ignored otherwise).
    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Endpoint::Command { env, .. } = &mut self.endpoint {
            env.push((key.into(), value.into()));
        }
        self
    }

    /// Attach a sampling handler.
    pub fn with_sampling(mut self, handler: SamplingHandler) -> Self {
        self.sampling = Some(handler);
        self
    }

    /// Set the connection timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the number of connection retries.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("sampling", &self.sampling.as_ref().map(|_| "<fn>"))
            .field("connection_timeout", &self.connection_timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Contract for a connection to one tool server.
///
/// `start` reports failure through its return value so callers can keep a
/// not-yet-connected service around and retry later; `stop` is idempotent.
pub trait ToolService: Send + Sync {
    /// Establish the connection. Returns whether the service is now connected;
    /// ordinary connection failure is not an error.
    fn start(&self) -> bool;

    /// Current liveness.
    fn connected(&self) -> bool;

    /// Discover the server's tools.
    fn descriptors(&self) -> Result<Vec<ToolDescriptor>>;

    /// Shut the connection down. Safe to call repeatedly.
    fn stop(&self);
}

/// MCP-backed [`ToolService`].
pub struct McpToolService {
    config: ServiceConfig,
    client: Mutex<Option<Arc<McpClient>>>,
    up: AtomicBool,
}

impl McpToolService {
    /// Create a service for the given configuration. Does not connect;
    /// call [`start`](ToolService::start).
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            client: Mutex::new(None),
            up: AtomicBool::new(false),
        }
    }

    /// Endpoint label for diagnostics.
    pub fn label(&self) -> &str {
        self.config.endpoint.label()
    }

    /// One connection attempt: open the transport and complete the handshake.
    fn open_client(&self) -> Result<McpClient> {
        let mut client = match &self.config.endpoint {
            Endpoint::Url(url) => McpClient::over_http(
                HttpConfig::new(url.clone())
                    .with_timeout(self.config.connection_timeout)
                    .with_retries(0),
            )?,
            Endpoint::Command { program, args, env } => McpClient::over_stdio(program, args, env)?,
        };
        if let Some(handler) = &self.config.sampling {
            client = client.with_sampling(Arc::clone(handler));
        }
        client.handshake()?;
        Ok(client)
    }

    fn current_client(&self) -> Option<Arc<McpClient>> {
        self.client.lock().ok().and_then(|guard| guard.clone())
    }
}

impl ToolService for McpToolService {
    fn start(&self) -> bool {
        if self.connected() {
            return true;
        }

        let attempts = self.config.max_retries.saturating_add(1);
        for attempt in 1..=attempts {
            match self.open_client() {
                Ok(client) => {
                    if let Ok(mut guard) = self.client.lock() {
                        *guard = Some(Arc::new(client));
                    }
                    self.up.store(true, Ordering::SeqCst);
                    tracing::info!(server = %self.label(), "tool service started");
                    return true;
                }
                Err(e) => {
                    tracing::warn!(
                        server = %self.label(),
                        attempt,
                        error = %e,
                        "tool server connection attempt failed"
                    );
                    if attempt < attempts {
                        std::thread::sleep(RETRY_PAUSE);
                    }
                }
            }
        }

        tracing::error!(server = %self.label(), "giving up connecting to tool server");
        false
    }

    fn connected(&self) -> bool {
        if !self.up.load(Ordering::SeqCst) {
            return false;
        }
        match self.current_client() {
            Some(client) => client.is_alive(),
            None => false,
        }
    }

    fn descriptors(&self) -> Result<Vec<ToolDescriptor>> {
        let client = self.current_client().ok_or(ServiceError::NotConnected)?;
        let specs = client.list_tools()?;

        let descriptors = specs
            .iter()
            .map(|spec| {
                let client = Arc::clone(&client);
                let tool_name = spec.name.clone();
                let invoke: InvokeFn = Arc::new(move |arguments: Value| {
                    let outcome = client.call_tool(&tool_name, Some(arguments))?;
                    let text = outcome.text().unwrap_or_default();
                    if outcome.failed() {
                        return Err(ServiceError::tool(text));
                    }
                    Ok(Value::String(text))
                });
                ToolDescriptor::from_spec(spec, invoke)
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            server = %self.label(),
            count = descriptors.len(),
            "discovered tool descriptors"
        );
        Ok(descriptors)
    }

    fn stop(&self) {
        let taken = self.client.lock().ok().and_then(|mut guard| guard.take());
        self.up.store(false, Ordering::SeqCst);
        if let Some(client) = taken {
            client.shutdown();
            tracing::info!(server = %self.label(), "tool service stopped");
        }
    }
}

impl Drop for McpToolService {
    // Safety net only; call sites should stop() deterministically.
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for McpToolService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpToolService")
            .field("endpoint", &self.config.endpoint)
            .field("connected", &self.up.load(Ordering::SeqCst))
            .finish()
    }
}
