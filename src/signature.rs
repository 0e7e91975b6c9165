//! Signature inspection: turns a [`Tool`] into a checked [`FunctionDescriptor`].

use std::collections::HashSet;

use serde_json::Value;

use crate::error::RegistrationError;
use crate::handler::Invoker;
use crate::tool::Tool;
use crate::types::TypeDescriptor;

/// A named, typed parameter in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeDescriptor,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub examples: Vec<Value>,
}

/// The inspected signature of a registered function, plus the function itself.
#[derive(Clone)]
pub struct FunctionDescriptor {
    /// The function's own name, if it has one.
    pub name: Option<String>,
    pub params: Vec<Parameter>,
    pub returns: TypeDescriptor,
    pub description: Option<String>,
    pub return_description: Option<String>,
    pub(crate) invoker: Invoker,
}

impl std::fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}

impl FunctionDescriptor {
    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Inspect a tool's declared signature.
///
/// `label` identifies the tool in error messages (the route name when known).
/// Every parameter needs a name and a type, the return type must be declared,
/// and parameter metadata may only refer to declared parameters.
pub fn inspect(tool: Tool, label: &str) -> Result<FunctionDescriptor, RegistrationError> {
    let Tool {
        declared_name,
        slots,
        arity,
        returns,
        description,
        return_description,
        mut param_descriptions,
        mut defaults,
        mut examples,
        invoker,
        ..
    } = tool;

    let mut seen = HashSet::new();
    let mut params = Vec::with_capacity(slots.len());
    for (index, slot) in slots.into_iter().enumerate() {
        let name = slot.name.ok_or_else(|| RegistrationError::UnnamedParameter {
            tool: label.to_string(),
            index,
        })?;
        let ty = slot.ty.ok_or_else(|| RegistrationError::MissingParameterType {
            tool: label.to_string(),
            param: name.clone(),
        })?;
        if !seen.insert(name.clone()) {
            return Err(RegistrationError::DuplicateParameter {
                tool: label.to_string(),
                param: name,
            });
        }
        params.push(Parameter {
            default: defaults.remove(&name),
            description: param_descriptions.remove(&name),
            examples: examples.remove(&name).unwrap_or_default(),
            name,
            ty,
        });
    }

    if let Some(expected) = arity.filter(|expected| *expected != params.len()) {
        return Err(RegistrationError::ArityMismatch {
            tool: label.to_string(),
            expected,
            found: params.len(),
        });
    }

    let returns = returns.ok_or_else(|| RegistrationError::MissingReturnType {
        tool: label.to_string(),
    })?;

    let leftover = defaults
        .into_keys()
        .chain(param_descriptions.into_keys())
        .chain(examples.into_keys())
        .next();
    if let Some(param) = leftover {
        return Err(RegistrationError::UnknownParameter {
            tool: label.to_string(),
            param,
        });
    }

    Ok(FunctionDescriptor {
        name: declared_name,
        params,
        returns,
        description,
        return_description,
        invoker,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn add_numbers(a: i64, b: i64) -> i64 {
        a + b
    }

    fn echo(args: Vec<Value>) -> Result<Value, String> {
        Ok(Value::Array(args))
    }

    #[test]
    fn test_inspect_typed_function() {
        let tool = Tool::new(add_numbers)
            .params(["a", "b"])
            .param_description("a", "the first integer")
            .default_value("b", json!(1));
        let descriptor = inspect(tool, "add_numbers").unwrap();

        assert_eq!(descriptor.name.as_deref(), Some("add_numbers"));
        let names: Vec<_> = descriptor.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(descriptor.params[0].ty, TypeDescriptor::of::<i64>());
        assert_eq!(
            descriptor.param("a").unwrap().description.as_deref(),
            Some("the first integer")
        );
        assert_eq!(descriptor.param("b").unwrap().default, Some(json!(1)));
        assert_eq!(descriptor.returns, TypeDescriptor::of::<i64>());
    }

    #[test]
    fn test_missing_parameter_type() {
        let tool = Tool::dynamic("echo", echo)
            .declare("a", Some(TypeDescriptor::of::<i64>()))
            .declare("b", None)
            .declare_return(Some(TypeDescriptor::of::<Vec<i64>>()));
        match inspect(tool, "echo") {
            Err(RegistrationError::MissingParameterType { param, .. }) => assert_eq!(param, "b"),
            other => panic!("expected MissingParameterType, got {other:?}"),
        }
    }

    #[test]
    fn test_extra_names_have_no_type() {
        let tool = Tool::new(add_numbers).params(["a", "b", "c"]);
        assert!(matches!(
            inspect(tool, "add_numbers"),
            Err(RegistrationError::MissingParameterType { param, .. }) if param == "c"
        ));
    }

    #[test]
    fn test_missing_return_type() {
        let tool = Tool::dynamic("echo", echo).declare("a", Some(TypeDescriptor::of::<i64>()));
        assert!(matches!(
            inspect(tool, "echo"),
            Err(RegistrationError::MissingReturnType { .. })
        ));
    }

    #[test]
    fn test_unnamed_parameter() {
        let tool = Tool::new(add_numbers).params(["a"]);
        assert!(matches!(
            inspect(tool, "add_numbers"),
            Err(RegistrationError::UnnamedParameter { index: 1, .. })
        ));
    }

    #[test]
    fn test_duplicate_parameter() {
        let tool = Tool::new(add_numbers).params(["a", "a"]);
        assert!(matches!(
            inspect(tool, "add_numbers"),
            Err(RegistrationError::DuplicateParameter { .. })
        ));
    }

    #[test]
    fn test_arity_mismatch() {
        let tool = Tool::new(add_numbers)
            .params(["a", "b"])
            .declare("c", Some(TypeDescriptor::of::<i64>()));
        assert!(matches!(
            inspect(tool, "add_numbers"),
            Err(RegistrationError::ArityMismatch {
                expected: 2,
                found: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_metadata_for_unknown_parameter() {
        let tool = Tool::new(add_numbers)
            .params(["a", "b"])
            .example("z", json!(3));
        assert!(matches!(
            inspect(tool, "add_numbers"),
            Err(RegistrationError::UnknownParameter { param, .. }) if param == "z"
        ));
    }
}
