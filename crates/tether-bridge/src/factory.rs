//! Factory tying a connection service to the agent tool registry.
//!
//! [`ToolFactory`] wraps one [`ToolService`], tracks whether it owns that
//! service, and converts discovered descriptors into [`BridgedTool`]s. One
//! broken descriptor never blocks the rest of a batch; an error is raised
//! only when a non-empty batch yields nothing.
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_bridge::{ToolFactory, ToolRegistry};
//! use tether_mcp::ServiceConfig;
//!
//! let mut factory = ToolFactory::connect(
//!     ServiceConfig::command("mcp-server-sqlite").with_arg("--db").with_arg("app.db"),
//! );
//!
//! let mut registry = ToolRegistry::new();
//! factory.register_all(&mut registry)?;
//!
//! // ... run the agent ...
//!
//! factory.close();
//! ```

use std::sync::Arc;

use tether_mcp::{McpToolService, ServiceConfig, ToolDescriptor, ToolService};

use crate::adapter::BridgedTool;
use crate::error::{BridgeError, Result};
use crate::tool::ToolRegistry;

/// The factory's hold on its connection service.
///
/// Ownership decides who may stop the service. It is fixed at construction;
/// close() branches on this tag and nothing else.
enum ServiceHandle {
    /// The factory created (or was handed) the service and must stop it.
    Owned(Arc<dyn ToolService>),
    /// The service belongs to someone else; the factory never stops it.
    Borrowed(Arc<dyn ToolService>),
}

impl ServiceHandle {
    fn service(&self) -> &Arc<dyn ToolService> {
        match self {
            Self::Owned(service) | Self::Borrowed(service) => service,
        }
    }

    fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }
}

/// Converts a tool service's descriptors into registry-ready tools.
pub struct ToolFactory {
    /// Taken by close(); a closed factory yields no tools.
    service: Option<ServiceHandle>,
    ready: bool,
}

impl ToolFactory {
    /// Wrap an externally managed service without taking ownership.
    ///
    /// The factory stays usable when the service is not connected; it yields
    /// an empty tool list until the owner connects it.
    pub fn wrap(service: Arc<dyn ToolService>) -> Self {
        Self::from_service(service, false)
    }

    /// Wrap an existing service with an explicit ownership choice.
    pub fn from_service(service: Arc<dyn ToolService>, own: bool) -> Self {
        let ready = service.connected();
        if !ready {
            tracing::warn!("provided tool service is not connected");
        }
        let handle = if own {
            ServiceHandle::Owned(service)
        } else {
            ServiceHandle::Borrowed(service)
        };
        Self {
            service: Some(handle),
            ready,
        }
    }

    /// Create and start a new MCP service. The factory owns it.
    ///
    /// Start failure is not fatal here: the factory is returned not-ready and
    /// the failure surfaces when tools are requested.
    pub fn connect(config: ServiceConfig) -> Self {
        let service: Arc<dyn ToolService> = Arc::new(McpToolService::new(config));
        let ready = service.start();
        if !ready {
            tracing::error!("failed to start tool service");
        }
        Self {
            service: Some(ServiceHandle::Owned(service)),
            ready,
        }
    }

    /// Whether the wrapped service was connected when last checked.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether the factory owns (and will stop) its service.
    pub fn owns_service(&self) -> bool {
        self.service.as_ref().is_some_and(ServiceHandle::is_owned)
    }

    /// Fetch the current tool descriptors.
    ///
    /// Returns an empty batch with a warning when the service is not ready;
    /// callers may retry after connecting. Discovery faults propagate.
    pub fn descriptors(&self) -> Result<Vec<ToolDescriptor>> {
        let Some(handle) = &self.service else {
            tracing::warn!("tool factory is closed");
            return Ok(Vec::new());
        };
        if !self.ready {
            tracing::warn!("tool service is not started or not connected");
            return Ok(Vec::new());
        }

        let descriptors = handle.service().descriptors().map_err(|e| {
            tracing::error!(error = %e, "failed to retrieve tool descriptors");
            e
        })?;
        tracing::info!(count = descriptors.len(), "retrieved tool descriptors");
        Ok(descriptors)
    }

    /// Convert a single descriptor. Pure; no service interaction.
    pub fn convert_one(descriptor: &ToolDescriptor) -> Result<BridgedTool> {
        BridgedTool::from_descriptor(descriptor)
    }

    /// Convert every discovered descriptor.
    ///
    /// Per-descriptor failures are logged and collected rather than
    /// propagated. When the batch is non-empty and EVERY conversion failed,
    /// a single aggregated conversion error is returned instead.
    pub fn adapters(&self) -> Result<Vec<BridgedTool>> {
        let descriptors = self.descriptors()?;

        let mut adapters = Vec::with_capacity(descriptors.len());
        let mut failures = Vec::new();
        for descriptor in &descriptors {
            match Self::convert_one(descriptor) {
                Ok(tool) => adapters.push(tool),
                Err(e) => {
                    tracing::error!(
                        tool = %descriptor.name,
                        error = %e,
                        "failed to convert tool descriptor"
                    );
                    failures.push(format!("{}: {}", descriptor.name, e));
                }
            }
        }

        tracing::info!(
            converted = adapters.len(),
            failed = failures.len(),
            "converted tool descriptors"
        );

        if adapters.is_empty() && !failures.is_empty() {
            return Err(BridgeError::conversion(format!(
                "no descriptor could be converted: {}",
                failures.join("; ")
            )));
        }
        Ok(adapters)
    }

    /// Convert every descriptor and register the results.
    ///
    /// Returns the number of tools registered.
    pub fn register_all(&self, registry: &mut ToolRegistry) -> Result<usize> {
        let adapters = self.adapters()?;
        let count = adapters.len();
        for adapter in adapters {
            registry.register(adapter);
        }
        Ok(count)
    }

    /// Release the service, stopping it only when owned.
    ///
    /// Idempotent; safe after partial construction. Prefer calling this
    /// explicitly over relying on drop, whose timing is not guaranteed.
    pub fn close(&mut self) {
        if let Some(handle) = self.service.take() {
            self.ready = false;
            match handle {
                ServiceHandle::Owned(service) => {
                    service.stop();
                    tracing::info!("closed tool service owned by factory");
                }
                ServiceHandle::Borrowed(_) => {
                    tracing::debug!("released borrowed tool service without stopping it");
                }
            }
        }
    }
}

impl Drop for ToolFactory {
    // Safety net; call sites should close() deterministically.
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ToolFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolFactory")
            .field("ready", &self.ready)
            .field("owns_service", &self.owns_service())
            .field("closed", &self.service.is_none())
            .finish()
    }
}
