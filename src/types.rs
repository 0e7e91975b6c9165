//! Registration-time type descriptors.
//!
//! Rust erases parameter types at runtime, so every handler hands the
//! inspector one [`TypeDescriptor`] per argument and one for its return value.
//! A descriptor knows the Rust type name and how to describe the type as a
//! JSON Schema through `schemars`.

use std::collections::HashSet;

use schemars::{
    JsonSchema, Map,
    r#gen::{SchemaGenerator, SchemaSettings},
    schema::{InstanceType, Schema, SchemaObject, SingleOrVec},
};

/// Prefix of every `$ref` produced by [`schema_generator`].
pub const DEFINITIONS_PATH: &str = "#/components/schemas/";

/// Describes one declared type of a registered function.
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    type_name: &'static str,
    schema: fn(&mut SchemaGenerator) -> Schema,
}

impl TypeDescriptor {
    /// Descriptor for any type with a JSON Schema representation.
    pub fn of<T: JsonSchema>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            schema: subschema::<T>,
        }
    }

    /// Fully qualified Rust type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Describe the type, registering any named definitions in `generator`.
    pub fn schema(&self, generator: &mut SchemaGenerator) -> Schema {
        (self.schema)(generator)
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

impl Eq for TypeDescriptor {}

impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TypeDescriptor").field(&self.type_name).finish()
    }
}

fn subschema<T: JsonSchema>(generator: &mut SchemaGenerator) -> Schema {
    generator.subschema_for::<T>()
}

/// Generator used for every synthesized schema: OpenAPI 3.0 flavored, named
/// types collected under `#/components/schemas/`.
pub fn schema_generator() -> SchemaGenerator {
    SchemaGenerator::new(SchemaSettings::openapi3())
}

/// Name of the definition a `$ref` points at.
pub fn reference_name(reference: &str) -> &str {
    reference.strip_prefix(DEFINITIONS_PATH).unwrap_or(reference)
}

/// Follow `$ref` chains until a concrete schema is reached.
///
/// Returns `None` for a dangling reference or a reference cycle.
pub fn resolve<'a>(schema: &'a Schema, definitions: &'a Map<String, Schema>) -> Option<&'a Schema> {
    let mut current = schema;
    let mut seen = HashSet::new();
    while let Schema::Object(SchemaObject {
        reference: Some(reference),
        ..
    }) = current
    {
        let name = reference_name(reference);
        if !seen.insert(name) {
            return None;
        }
        current = definitions.get(name)?;
    }
    Some(current)
}

/// Whether the schema is nullable in the OpenAPI 3.0 sense.
pub fn is_nullable(object: &SchemaObject) -> bool {
    object.extensions.get("nullable") == Some(&serde_json::Value::Bool(true))
        || instance_types(object).contains(&InstanceType::Null)
}

/// Instance types declared by a schema object, empty when unconstrained.
pub fn instance_types(object: &SchemaObject) -> &[InstanceType] {
    match &object.instance_type {
        Some(SingleOrVec::Single(single)) => std::slice::from_ref(single.as_ref()),
        Some(SingleOrVec::Vec(types)) => types.as_slice(),
        None => &[],
    }
}

/// A schema that accepts any value and therefore describes nothing.
fn is_unconstrained(schema: &Schema) -> bool {
    match schema {
        Schema::Bool(accepts) => *accepts,
        Schema::Object(object) => {
            object.instance_type.is_none()
                && object.reference.is_none()
                && object.subschemas.is_none()
                && object.enum_values.is_none()
                && object.const_value.is_none()
                && object.object.is_none()
                && object.array.is_none()
                && object.number.is_none()
                && object.string.is_none()
        }
    }
}

/// Check that a schema, and everything reachable from it, is representable.
///
/// Unconstrained ("any") values and references to unknown definitions are
/// rejected. The error is a short reason suitable for `UnsupportedType`.
pub fn check_representable(
    schema: &Schema,
    definitions: &Map<String, Schema>,
) -> Result<(), String> {
    let mut visited = HashSet::new();
    check_node(schema, definitions, &mut visited)
}

fn check_node<'a>(
    schema: &'a Schema,
    definitions: &'a Map<String, Schema>,
    visited: &mut HashSet<&'a str>,
) -> Result<(), String> {
    if is_unconstrained(schema) {
        return Err("unconstrained values cannot be described".to_string());
    }
    let Schema::Object(object) = schema else {
        return Ok(());
    };

    if let Some(reference) = &object.reference {
        let name = reference_name(reference);
        let target = definitions
            .get(name)
            .ok_or_else(|| format!("unresolvable reference `{name}`"))?;
        if visited.insert(name) {
            check_node(target, definitions, visited)?;
        }
    }

    if let Some(subschemas) = &object.subschemas {
        let branches = [&subschemas.all_of, &subschemas.any_of, &subschemas.one_of];
        for branch in branches.into_iter().flatten().flatten() {
            check_node(branch, definitions, visited)?;
        }
    }

    if let Some(array) = &object.array {
        match &array.items {
            Some(SingleOrVec::Single(item)) => check_node(item, definitions, visited)?,
            Some(SingleOrVec::Vec(items)) => {
                for item in items {
                    check_node(item, definitions, visited)?;
                }
            }
            None => return Err("arrays must declare an item type".to_string()),
        }
    }

    if let Some(validation) = &object.object {
        for property in validation.properties.values() {
            check_node(property, definitions, visited)?;
        }
        if let Some(additional) = &validation.additional_properties {
            if !matches!(additional.as_ref(), Schema::Bool(false)) {
                check_node(additional, definitions, visited)?;
            }
        }
    }

    Ok(())
}

/// The resolved schema object when `schema` describes a structured record:
/// a non-nullable `object` with named fields that is not a map.
pub fn as_record<'a>(
    schema: &'a Schema,
    definitions: &'a Map<String, Schema>,
) -> Option<&'a SchemaObject> {
    // `Option<Record>` is rendered as a nullable `$ref`.
    if matches!(schema, Schema::Object(outer) if is_nullable(outer)) {
        return None;
    }
    let Schema::Object(object) = resolve(schema, definitions)? else {
        return None;
    };
    if is_nullable(object) || instance_types(object) != [InstanceType::Object] {
        return None;
    }
    let validation = object.object.as_ref()?;
    match validation.additional_properties.as_deref() {
        None | Some(Schema::Bool(false)) => Some(object),
        Some(_) => None,
    }
}
