//! Typed Toolset
//!
//! Expose ordinary typed Rust functions as JSON endpoints. Request and
//! response schemas are synthesized from the function signature, payloads
//! are validated strictly, and every tool is documented through per-tool
//! schema documents and a generated OpenAPI description.
//!
//! # Architecture
//!
//! - **Registration**: [`Tool`] → [`signature`] → [`synth`] → [`registry`]
//! - **Calls**: `POST /tool/{name}` → [`dispatch`] (validate → invoke → encode)
//! - **Introspection**: [`exposition`] and [`openapi`] read the registry
//! - **Server**: Axum router over a registry frozen at startup
//!
//! ```rust,no_run
//! use typed_toolset::{Tool, Toolset};
//!
//! fn add_numbers(a: i64, b: i64) -> i64 {
//!     a + b
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut toolset = Toolset::new("Calculator", "1.0.0");
//!     toolset.add(Some("calculate"), Tool::new(add_numbers).params(["a", "b"]))?;
//!     toolset.serve("127.0.0.1", 8000).await
//! }
//! ```

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod exposition;
pub mod handler;
pub mod openapi;
pub mod registry;
pub mod server;
pub mod signature;
pub mod synth;
pub mod tool;
pub mod toolset;
pub mod types;
pub mod validate;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::openapi::ApiInfo;
use crate::registry::EndpointRegistry;

pub use crate::error::{DispatchError, RegistrationError, RouteNotFound, Violation};
pub use crate::tool::Tool;
pub use crate::toolset::Toolset;
pub use crate::types::TypeDescriptor;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Registered tools; read-only once the server is running.
    pub registry: Arc<EndpointRegistry>,
    /// Title and version of the generated API.
    pub info: Arc<ApiInfo>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}
