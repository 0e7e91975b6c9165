//! The registration descriptor for a single function.
//!
//! A [`Tool`] records everything the signature inspector needs: the handler,
//! its declared types, the parameter names Rust cannot recover on its own,
//! and optional documentation (descriptions, defaults, examples).
//!
//! ```rust
//! use typed_toolset::Tool;
//!
//! fn add_numbers(a: i64, b: i64) -> i64 {
//!     a + b
//! }
//!
//! let tool = Tool::new(add_numbers)
//!     .params(["a", "b"])
//!     .doc("Add two integers.\n:param a: the first integer\n:param b: the second integer");
//! assert_eq!(tool.declared_name(), Some("add_numbers"));
//! ```

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::BoxError;
use crate::handler::{Async, Fallible, Invoker, Plain, ToolFn, dynamic_invoker};
use crate::types::TypeDescriptor;

/// One declared parameter slot; either half may still be missing.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParamSlot {
    pub(crate) name: Option<String>,
    pub(crate) ty: Option<TypeDescriptor>,
}

/// A function prepared for registration.
pub struct Tool {
    pub(crate) declared_name: Option<String>,
    pub(crate) handler_type: &'static str,
    pub(crate) slots: Vec<ParamSlot>,
    /// Number of arguments the typed handler consumes; `None` for dynamic tools.
    pub(crate) arity: Option<usize>,
    pub(crate) returns: Option<TypeDescriptor>,
    pub(crate) description: Option<String>,
    pub(crate) return_description: Option<String>,
    pub(crate) param_descriptions: BTreeMap<String, String>,
    pub(crate) defaults: BTreeMap<String, Value>,
    pub(crate) examples: BTreeMap<String, Vec<Value>>,
    pub(crate) invoker: Invoker,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("declared_name", &self.declared_name)
            .field("handler_type", &self.handler_type)
            .field("slots", &self.slots)
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}

impl Tool {
    /// Wrap a function returning a plain value.
    pub fn new<F, Args>(handler: F) -> Self
    where
        F: ToolFn<Plain<Args>>,
    {
        Self::typed::<F, Plain<Args>>(handler)
    }

    /// Wrap a function returning `Result<T, E>`; `Err` becomes a handler error.
    pub fn fallible<F, Args>(handler: F) -> Self
    where
        F: ToolFn<Fallible<Args>>,
    {
        Self::typed::<F, Fallible<Args>>(handler)
    }

    /// Wrap an async function returning `Result<T, E>`.
    pub fn from_async<F, Args>(handler: F) -> Self
    where
        F: ToolFn<Async<Args>>,
    {
        Self::typed::<F, Async<Args>>(handler)
    }

    fn typed<F: ToolFn<M>, M>(handler: F) -> Self {
        let types = F::param_types();
        let handler_type = std::any::type_name::<F>();
        Self {
            declared_name: declared_fn_name(handler_type),
            handler_type,
            arity: Some(types.len()),
            slots: types
                .into_iter()
                .map(|ty| ParamSlot {
                    name: None,
                    ty: Some(ty),
                })
                .collect(),
            returns: Some(F::return_type()),
            description: None,
            return_description: None,
            param_descriptions: BTreeMap::new(),
            defaults: BTreeMap::new(),
            examples: BTreeMap::new(),
            invoker: handler.into_invoker(),
        }
    }

    /// A JSON-in/JSON-out handler whose parameter and return types are
    /// declared explicitly with [`Tool::declare`] and [`Tool::declare_return`].
    ///
    /// The handler receives validated arguments in declaration order.
    pub fn dynamic<F, E>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            declared_name: Some(name.into()),
            handler_type: std::any::type_name::<F>(),
            slots: Vec::new(),
            arity: None,
            returns: None,
            description: None,
            return_description: None,
            param_descriptions: BTreeMap::new(),
            defaults: BTreeMap::new(),
            examples: BTreeMap::new(),
            invoker: dynamic_invoker(handler),
        }
    }

    /// Name the handler's parameters, in order.
    ///
    /// Names beyond the handler's typed arguments are recorded without a type.
    #[must_use]
    pub fn params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names = names.into_iter();
        for slot in &mut self.slots {
            match names.next() {
                Some(name) => slot.name = Some(name.into()),
                None => return self,
            }
        }
        self.slots.extend(names.map(|name| ParamSlot {
            name: Some(name.into()),
            ty: None,
        }));
        self
    }

    /// Append a parameter with an explicit (possibly absent) type descriptor.
    #[must_use]
    pub fn declare(mut self, name: impl Into<String>, ty: Option<TypeDescriptor>) -> Self {
        self.slots.push(ParamSlot {
            name: Some(name.into()),
            ty,
        });
        self
    }

    /// Set the declared return type, or clear it.
    #[must_use]
    pub fn declare_return(mut self, ty: Option<TypeDescriptor>) -> Self {
        self.returns = ty;
        self
    }

    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    #[must_use]
    pub fn returns_description(mut self, text: impl Into<String>) -> Self {
        self.return_description = Some(text.into());
        self
    }

    #[must_use]
    pub fn param_description(mut self, param: impl Into<String>, text: impl Into<String>) -> Self {
        self.param_descriptions.insert(param.into(), text.into());
        self
    }

    /// Declare a default for a parameter, making it optional in the payload.
    #[must_use]
    pub fn default_value(mut self, param: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(param.into(), value);
        self
    }

    /// Attach an example value shown in the generated documentation.
    #[must_use]
    pub fn example(mut self, param: impl Into<String>, value: Value) -> Self {
        self.examples.entry(param.into()).or_default().push(value);
        self
    }

    /// Read descriptions from an RST-style doc string.
    ///
    /// Text before the first `:param` or `:return:` tag describes the tool;
    /// `:param name: text` and `:return: text` describe the parts.
    #[must_use]
    pub fn doc(mut self, text: &str) -> Self {
        let parsed = DocString::parse(text);
        if let Some(summary) = parsed.summary {
            self.description = Some(summary);
        }
        if let Some(returns) = parsed.returns {
            self.return_description = Some(returns);
        }
        self.param_descriptions.extend(parsed.params);
        self
    }

    /// The function's own name, used as the route name when no path is given.
    pub fn declared_name(&self) -> Option<&str> {
        self.declared_name.as_deref()
    }
}

/// Last path segment of a function item's type name, if it has one.
///
/// Closures and other anonymous callables yield `None`.
fn declared_fn_name(type_name: &str) -> Option<String> {
    let last = type_name.rsplit("::").next()?;
    let named = !last.is_empty()
        && last
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_');
    named.then(|| last.to_string())
}

#[derive(Debug, Default, PartialEq)]
struct DocString {
    summary: Option<String>,
    params: BTreeMap<String, String>,
    returns: Option<String>,
}

impl DocString {
    fn parse(text: &str) -> Self {
        let mut doc = Self::default();
        let mut summary = Vec::new();
        let mut tagged = false;

        for line in text.lines().map(str::trim) {
            if let Some(rest) = line.strip_prefix(":param ") {
                tagged = true;
                if let Some((name, description)) = rest.split_once(':') {
                    doc.params
                        .insert(name.trim().to_string(), description.trim().to_string());
                }
            } else if let Some(rest) = line.strip_prefix(":return:") {
                tagged = true;
                doc.returns = Some(rest.trim().to_string()).filter(|s| !s.is_empty());
            } else if !tagged {
                summary.push(line);
            }
        }

        let summary = summary.join("\n").trim().to_string();
        doc.summary = (!summary.is_empty()).then_some(summary);
        doc
    }
}
