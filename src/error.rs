//! Error taxonomy for registration and dispatch.
//!
//! Registration errors abort `Toolset::add` before a route exists. Dispatch
//! errors are scoped to a single call and never touch registry state.

use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;

/// Boxed error carried as the cause of a failed handler call.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A single schema violation found in a payload or a returned value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Violation {
    /// Dotted path to the offending value (`""` for the body itself).
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Lookup of a route name that was never registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("tool '{0}' not found")]
pub struct RouteNotFound(pub String);

/// Errors raised while turning a function into an endpoint.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A parameter name was supplied without a matching declared type.
    #[error("parameter '{param}' of tool '{tool}' has no declared type")]
    MissingParameterType { tool: String, param: String },

    /// The function declares no return type.
    #[error("tool '{tool}' has no declared return type")]
    MissingReturnType { tool: String },

    /// A typed parameter was never given a name.
    #[error("parameter #{index} of tool '{tool}' has no name")]
    UnnamedParameter { tool: String, index: usize },

    #[error("parameter '{param}' of tool '{tool}' is declared more than once")]
    DuplicateParameter { tool: String, param: String },

    /// Declared parameters do not line up with the handler's arguments.
    #[error("tool '{tool}' declares {found} parameters but its handler takes {expected}")]
    ArityMismatch {
        tool: String,
        expected: usize,
        found: usize,
    },

    /// A default, description or example names a parameter that does not exist.
    #[error("tool '{tool}' has metadata for unknown parameter '{param}'")]
    UnknownParameter { tool: String, param: String },

    #[error("default for parameter '{param}' of tool '{tool}' does not match its type: {}", join(.violations))]
    InvalidDefault {
        tool: String,
        param: String,
        violations: Vec<Violation>,
    },

    /// The declared type has no representation in the schema type system.
    #[error("type `{type_name}` of {location} in tool '{tool}' is not supported: {reason}")]
    UnsupportedType {
        tool: String,
        location: String,
        type_name: String,
        reason: String,
    },

    #[error("tool '{0}' already exists. Please use a different name.")]
    DuplicateRoute(String),

    #[error("route name must not be empty")]
    EmptyRouteName,

    /// The handler has no declared name to fall back on.
    #[error("cannot derive a route name from `{0}`; pass an explicit path")]
    AnonymousFunction(String),
}

/// Errors produced by a single call through the dispatch adapter.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    RouteNotFound(#[from] RouteNotFound),

    /// The payload does not satisfy the route's input schema.
    #[error("invalid payload for tool '{route}': {}", join(.violations))]
    Validation {
        route: String,
        violations: Vec<Violation>,
    },

    /// The wrapped function failed; the original failure is the source.
    #[error("tool '{route}' failed: {source}")]
    Handler {
        route: String,
        #[source]
        source: BoxError,
    },

    /// The returned value does not match the declared return type.
    #[error("tool '{route}' returned a value that does not match its declared return type: {}", join(.violations))]
    Encoding {
        route: String,
        violations: Vec<Violation>,
    },
}

impl DispatchError {
    /// Stable machine-readable kind, used in error response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RouteNotFound(_) => "route_not_found",
            Self::Validation { .. } => "validation_error",
            Self::Handler { .. } => "handler_error",
            Self::Encoding { .. } => "encoding_error",
        }
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Validation { violations, .. } | Self::Encoding { violations, .. } => violations,
            Self::RouteNotFound(_) | Self::Handler { .. } => &[],
        }
    }
}

/// JSON body of every failed call: `{"error": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ErrorDetail {
    /// One of `route_not_found`, `validation_error`, `handler_error`,
    /// `encoding_error` or `timeout`.
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

impl ErrorResponse {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                kind: kind.into(),
                message: message.into(),
                violations: Vec::new(),
            },
        }
    }
}

impl From<&DispatchError> for ErrorResponse {
    fn from(err: &DispatchError) -> Self {
        Self {
            error: ErrorDetail {
                kind: err.kind().to_string(),
                message: err.to_string(),
                violations: err.violations().to_vec(),
            },
        }
    }
}

impl From<&RouteNotFound> for ErrorResponse {
    fn from(err: &RouteNotFound) -> Self {
        Self::new("route_not_found", err.to_string())
    }
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
