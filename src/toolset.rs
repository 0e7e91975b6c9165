//! The [`Toolset`] facade: register functions, then serve them.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{info, warn};

use crate::AppState;
use crate::config::AppConfig;
use crate::dispatch;
use crate::error::{DispatchError, RegistrationError, RouteNotFound};
use crate::exposition::{self, SchemaDocument};
use crate::openapi::{self, ApiInfo};
use crate::registry::{EndpointRegistry, RouteEntry};
use crate::server;
use crate::signature::inspect;
use crate::synth::synthesize;
use crate::tool::Tool;

/// A set of tools being assembled before the server starts.
///
/// Registration needs `&mut self`; [`Toolset::serve`] consumes the set, so no
/// tool can be added once calls are being accepted.
#[derive(Debug)]
pub struct Toolset {
    info: ApiInfo,
    registry: EndpointRegistry,
}

impl Default for Toolset {
    fn default() -> Self {
        Self::new("Toolset API", "1.0.0")
    }
}

impl Toolset {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: ApiInfo {
                title: title.into(),
                version: version.into(),
                description: None,
            },
            registry: EndpointRegistry::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.info.description = Some(description.into());
        self
    }

    /// Register `tool` under `path`, or under the function's own name.
    ///
    /// On error nothing is registered.
    pub fn add(&mut self, path: Option<&str>, tool: Tool) -> Result<Arc<RouteEntry>, RegistrationError> {
        let route = match path.map(str::to_string).or_else(|| tool.declared_name.clone()) {
            Some(route) => route,
            None => {
                let err = RegistrationError::AnonymousFunction(tool.handler_type.to_string());
                warn!(name: "tool.registration_failed", error = %err, "Tool registration failed");
                return Err(err);
            }
        };

        let registered = inspect(tool, &route)
            .and_then(|descriptor| {
                let schemas = synthesize(&route, &descriptor)?;
                Ok((descriptor, schemas))
            })
            .and_then(|(descriptor, schemas)| self.registry.register(&route, descriptor, schemas));

        match registered {
            Ok(entry) => {
                info!(
                    name: "tool.registered",
                    tool = %route,
                    params = entry.descriptor.params.len(),
                    output = ?entry.output.origin,
                    "Tool '{route}' added successfully"
                );
                Ok(entry)
            }
            Err(err) => {
                warn!(name: "tool.registration_failed", tool = %route, error = %err, "Tool registration failed");
                Err(err)
            }
        }
    }

    /// Call a registered tool in-process.
    pub async fn handle(&self, name: &str, payload: Value) -> Result<Value, DispatchError> {
        dispatch::handle(&self.registry, name, payload).await
    }

    pub fn schema_for(&self, name: &str) -> Result<SchemaDocument, RouteNotFound> {
        exposition::schema_for(&self.registry, name)
    }

    pub fn schema_all(&self) -> IndexMap<String, SchemaDocument> {
        exposition::schema_all(&self.registry)
    }

    /// Aggregate OpenAPI document, without a `servers` entry.
    pub fn openapi(&self) -> Value {
        openapi::document(&self.info, &self.registry, None)
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    pub fn info(&self) -> &ApiInfo {
        &self.info
    }

    /// Freeze the registry into shared application state.
    pub fn into_state(self, config: AppConfig) -> AppState {
        AppState {
            registry: Arc::new(self.registry),
            info: Arc::new(self.info),
            config: Arc::new(config),
        }
    }

    /// Freeze the registry and build the HTTP router.
    pub fn into_router(self, config: AppConfig) -> axum::Router {
        server::router(self.into_state(config))
    }

    /// Serve on `host:port` with default limits.
    pub async fn serve(self, host: &str, port: u16) -> anyhow::Result<()> {
        let mut config = AppConfig::default();
        config.server.host = host.to_string();
        config.server.port = port;
        self.serve_with_config(config).await
    }

    pub async fn serve_with_config(self, config: AppConfig) -> anyhow::Result<()> {
        server::start_server(self.into_state(config)).await
    }
}
