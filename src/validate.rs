//! Strict JSON validation against synthesized schemas.
//!
//! Covers the subset of JSON Schema that `schemars` emits for Rust types:
//! types, `nullable`, `enum`/`const`, composition keywords, array items,
//! object properties, numeric bounds and string lengths. All violations are
//! collected rather than stopping at the first one.

use schemars::{
    Map,
    schema::{InstanceType, Schema, SchemaObject, SingleOrVec},
};
use serde_json::Value;

use crate::error::Violation;
use crate::types::{instance_types, is_nullable, reference_name};

/// Validates values against schemas that may reference shared definitions.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    definitions: &'a Map<String, Schema>,
    strict: bool,
}

impl<'a> Validator<'a> {
    /// Plain JSON Schema semantics: an object schema without
    /// `additionalProperties` accepts any extra key.
    pub fn new(definitions: &'a Map<String, Schema>) -> Self {
        Self {
            definitions,
            strict: false,
        }
    }

    /// Like [`Validator::new`], but an object schema that leaves
    /// `additionalProperties` unset only accepts its declared properties.
    /// Maps carry their own `additionalProperties` and are unaffected.
    pub fn strict(definitions: &'a Map<String, Schema>) -> Self {
        Self {
            definitions,
            strict: true,
        }
    }

    /// Validate `value` and return every violation found (empty when valid).
    pub fn validate(&self, schema: &Schema, value: &Value) -> Vec<Violation> {
        let mut violations = Vec::new();
        self.check(schema, value, "", &mut violations);
        violations
    }

    fn check(&self, schema: &Schema, value: &Value, path: &str, out: &mut Vec<Violation>) {
        match schema {
            Schema::Bool(true) => {}
            Schema::Bool(false) => out.push(Violation::new(path, "no value is allowed here")),
            Schema::Object(object) => self.check_object(object, value, path, out),
        }
    }

    fn check_object(
        &self,
        object: &SchemaObject,
        value: &Value,
        path: &str,
        out: &mut Vec<Violation>,
    ) {
        if value.is_null() && is_nullable(object) {
            return;
        }

        if let Some(reference) = &object.reference {
            let name = reference_name(reference);
            match self.definitions.get(name) {
                Some(target) => self.check(target, value, path, out),
                None => out.push(Violation::new(
                    path,
                    format!("schema references unknown type `{name}`"),
                )),
            }
        }

        let types = instance_types(object);
        if !types.is_empty() && !types.iter().any(|ty| matches_type(*ty, value)) {
            out.push(Violation::new(
                path,
                format!("expected {}, found {}", describe_types(types), kind_of(value)),
            ));
            return;
        }

        if let Some(allowed) = &object.enum_values {
            if !allowed.contains(value) {
                out.push(Violation::new(
                    path,
                    format!("value must be one of {}", Value::Array(allowed.clone())),
                ));
            }
        }
        if let Some(expected) = &object.const_value {
            if expected != value {
                out.push(Violation::new(path, format!("value must be {expected}")));
            }
        }

        if let Some(subschemas) = &object.subschemas {
            for branch in subschemas.all_of.iter().flatten() {
                self.check(branch, value, path, out);
            }
            if let Some(any_of) = &subschemas.any_of {
                if !any_of.iter().any(|branch| self.accepts(branch, value)) {
                    out.push(Violation::new(path, "value matches none of the allowed shapes"));
                }
            }
            if let Some(one_of) = &subschemas.one_of {
                let matched = one_of
                    .iter()
                    .filter(|branch| self.accepts(branch, value))
                    .count();
                if matched != 1 {
                    out.push(Violation::new(
                        path,
                        format!("value must match exactly one allowed shape, matched {matched}"),
                    ));
                }
            }
            if let Some(not) = &subschemas.not {
                if self.accepts(not, value) {
                    out.push(Violation::new(path, "value matches a forbidden shape"));
                }
            }
        }

        if let (Some(number), Some(n)) = (&object.number, value.as_f64()) {
            if let Some(min) = number.minimum.filter(|min| n < *min) {
                out.push(Violation::new(path, format!("must be >= {min}")));
            }
            if let Some(max) = number.maximum.filter(|max| n > *max) {
                out.push(Violation::new(path, format!("must be <= {max}")));
            }
            if let Some(min) = number.exclusive_minimum.filter(|min| n <= *min) {
                out.push(Violation::new(path, format!("must be > {min}")));
            }
            if let Some(max) = number.exclusive_maximum.filter(|max| n >= *max) {
                out.push(Violation::new(path, format!("must be < {max}")));
            }
        }

        if let (Some(string), Some(s)) = (&object.string, value.as_str()) {
            let length = s.chars().count();
            if let Some(min) = string.min_length.filter(|min| length < *min as usize) {
                out.push(Violation::new(path, format!("must be at least {min} characters")));
            }
            if let Some(max) = string.max_length.filter(|max| length > *max as usize) {
                out.push(Violation::new(path, format!("must be at most {max} characters")));
            }
        }

        if let (Some(array), Some(items)) = (&object.array, value.as_array()) {
            if let Some(min) = array.min_items.filter(|min| items.len() < *min as usize) {
                out.push(Violation::new(path, format!("must contain at least {min} items")));
            }
            if let Some(max) = array.max_items.filter(|max| items.len() > *max as usize) {
                out.push(Violation::new(path, format!("must contain at most {max} items")));
            }
            match &array.items {
                Some(SingleOrVec::Single(item)) => {
                    for (index, element) in items.iter().enumerate() {
                        self.check(item, element, &index_path(path, index), out);
                    }
                }
                Some(SingleOrVec::Vec(positional)) => {
                    for (index, (item, element)) in positional.iter().zip(items).enumerate() {
                        self.check(item, element, &index_path(path, index), out);
                    }
                }
                None => {}
            }
        }

        if let (Some(validation), Some(fields)) = (&object.object, value.as_object()) {
            for required in &validation.required {
                if !fields.contains_key(required) {
                    out.push(Violation::new(field_path(path, required), "field required"));
                }
            }
            for (key, field_value) in fields {
                let child = field_path(path, key);
                if let Some(property) = validation.properties.get(key) {
                    self.check(property, field_value, &child, out);
                    continue;
                }
                match validation.additional_properties.as_deref() {
                    Some(Schema::Bool(false)) => out.push(Violation::new(child, "unknown field")),
                    Some(additional) => self.check(additional, field_value, &child, out),
                    None if self.strict && validation.pattern_properties.is_empty() => {
                        out.push(Violation::new(child, "unknown field"))
                    }
                    None => {}
                }
            }
        }
    }

    fn accepts(&self, schema: &Schema, value: &Value) -> bool {
        let mut scratch = Vec::new();
        self.check(schema, value, "", &mut scratch);
        scratch.is_empty()
    }
}

fn matches_type(ty: InstanceType, value: &Value) -> bool {
    match ty {
        InstanceType::Null => value.is_null(),
        InstanceType::Boolean => value.is_boolean(),
        InstanceType::Object => value.is_object(),
        InstanceType::Array => value.is_array(),
        InstanceType::Number => value.is_number(),
        InstanceType::String => value.is_string(),
        InstanceType::Integer => value.is_i64() || value.is_u64(),
    }
}

fn type_label(ty: InstanceType) -> &'static str {
    match ty {
        InstanceType::Null => "null",
        InstanceType::Boolean => "boolean",
        InstanceType::Object => "object",
        InstanceType::Array => "array",
        InstanceType::Number => "number",
        InstanceType::String => "string",
        InstanceType::Integer => "integer",
    }
}

fn describe_types(types: &[InstanceType]) -> String {
    types
        .iter()
        .map(|ty| type_label(*ty))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// JSON kind of a value, as used in violation messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn field_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}
