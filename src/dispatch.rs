//! Dispatch adapter: validate → invoke → encode for a single call.
//!
//! Every call walks `Received → Validated → Invoked → Encoded → Responded`,
//! dropping into `Failed` from any step. No state survives between calls;
//! the only shared data is the read-only [`RouteEntry`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::{Map as JsonMap, Value};
use tracing::{debug, warn};

use crate::error::{DispatchError, Violation};
use crate::handler::InvokeError;
use crate::registry::{EndpointRegistry, RouteEntry};
use crate::synth::RESULT_FIELD;
use crate::validate::Validator;

/// Position of a call in the dispatch state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Received,
    Validated,
    Invoked,
    Encoded,
    Responded,
    Failed,
}

impl CallPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Invoked => "invoked",
            Self::Encoded => "encoded",
            Self::Responded => "responded",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CallPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call bookkeeping; lives on the stack of one `handle` invocation.
struct Call<'a> {
    route: &'a str,
    phase: CallPhase,
}

impl<'a> Call<'a> {
    fn new(route: &'a str) -> Self {
        debug!(name: "dispatch.phase", route, phase = %CallPhase::Received, "Call received");
        Self {
            route,
            phase: CallPhase::Received,
        }
    }

    fn advance(&mut self, next: CallPhase) {
        debug!(name: "dispatch.phase", route = self.route, from = %self.phase, phase = %next, "Call advanced");
        self.phase = next;
    }

    fn fail(&mut self, err: DispatchError) -> DispatchError {
        warn!(
            name: "dispatch.failed",
            route = self.route,
            phase = %self.phase,
            kind = err.kind(),
            error = %err,
            "Tool call failed"
        );
        self.phase = CallPhase::Failed;
        err
    }
}

/// Call the route `name` with a decoded JSON payload.
pub async fn handle(
    registry: &EndpointRegistry,
    name: &str,
    payload: Value,
) -> Result<Value, DispatchError> {
    let entry = match registry.lookup(name) {
        Ok(entry) => entry,
        Err(err) => {
            warn!(name: "dispatch.failed", route = name, kind = "route_not_found", "Tool call failed");
            return Err(err.into());
        }
    };
    call_entry(entry, payload).await
}

/// Call the route `name` with a raw request body.
///
/// An empty body is treated as `{}`; bytes that are not JSON fail validation.
pub async fn handle_raw(
    registry: &EndpointRegistry,
    name: &str,
    body: &[u8],
) -> Result<Value, DispatchError> {
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(JsonMap::new())
    } else {
        match serde_json::from_slice(body) {
            Ok(payload) => payload,
            Err(err) => {
                // Unknown routes win over malformed bodies.
                registry.lookup(name)?;
                return Err(DispatchError::Validation {
                    route: name.to_string(),
                    violations: vec![Violation::new("", format!("invalid JSON: {err}"))],
                });
            }
        }
    };
    handle(registry, name, payload).await
}

/// Run one call against an already resolved route.
pub async fn call_entry(entry: Arc<RouteEntry>, payload: Value) -> Result<Value, DispatchError> {
    let mut call = Call::new(&entry.name);
    let validator = Validator::strict(&entry.definitions);

    let violations = validator.validate(&entry.input.schema, &payload);
    if !violations.is_empty() {
        return Err(call.fail(DispatchError::Validation {
            route: entry.name.clone(),
            violations,
        }));
    }
    let args = positional_args(&entry, payload);
    call.advance(CallPhase::Validated);

    let invoker = Arc::clone(&entry.descriptor.invoker);
    // The invoker runs inside the guarded future so synchronous panics are caught too.
    let outcome = AssertUnwindSafe(async move { invoker(args).await })
        .catch_unwind()
        .await;
    let value = match outcome {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => return Err(call.fail(invoke_error(&entry, err))),
        Err(panic) => {
            return Err(call.fail(DispatchError::Handler {
                route: entry.name.clone(),
                source: format!("handler panicked: {}", panic_message(panic.as_ref())).into(),
            }));
        }
    };
    call.advance(CallPhase::Invoked);

    let body = if entry.output.is_wrapped() {
        let mut wrapper = JsonMap::new();
        wrapper.insert(RESULT_FIELD.to_string(), value);
        Value::Object(wrapper)
    } else {
        value
    };
    let violations = validator.validate(&entry.output.schema, &body);
    if !violations.is_empty() {
        return Err(call.fail(DispatchError::Encoding {
            route: entry.name.clone(),
            violations,
        }));
    }
    call.advance(CallPhase::Encoded);

    call.advance(CallPhase::Responded);
    Ok(body)
}

/// Arguments in declaration order, with defaults filled in for absent fields.
///
/// The payload has already been validated, so it is an object holding every
/// required field.
fn positional_args(entry: &RouteEntry, payload: Value) -> Vec<Value> {
    let mut fields = match payload {
        Value::Object(fields) => fields,
        _ => JsonMap::new(),
    };
    entry
        .descriptor
        .params
        .iter()
        .map(|param| {
            fields
                .remove(&param.name)
                .or_else(|| param.default.clone())
                .unwrap_or(Value::Null)
        })
        .collect()
}

fn invoke_error(entry: &RouteEntry, err: InvokeError) -> DispatchError {
    match err {
        InvokeError::Argument { index, source } => {
            let field = entry
                .descriptor
                .params
                .get(index)
                .map(|param| param.name.clone())
                .unwrap_or_default();
            DispatchError::Validation {
                route: entry.name.clone(),
                violations: vec![Violation::new(field, source.to_string())],
            }
        }
        InvokeError::Handler(source) => DispatchError::Handler {
            route: entry.name.clone(),
            source,
        },
        InvokeError::Encoding(source) => DispatchError::Encoding {
            route: entry.name.clone(),
            violations: vec![Violation::new("", source.to_string())],
        },
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
