//! Schema synthesis: input and output schemas for a registered function.
//!
//! The input schema has one field per parameter, in declaration order, and
//! rejects unknown fields. The output schema is the declared return type when
//! that type is already a structured record; any other return type is wrapped
//! in a single `result` field so every response body is an object.

use schemars::{
    Map,
    schema::{InstanceType, Metadata, ObjectValidation, Schema, SchemaObject, SubschemaValidation},
};
use serde::Serialize;
use serde_json::Value;

use crate::error::RegistrationError;
use crate::signature::FunctionDescriptor;
use crate::types::{TypeDescriptor, as_record, check_representable, reference_name, schema_generator};
use crate::validate::Validator;

/// Field name used when a non-record return value is wrapped.
pub const RESULT_FIELD: &str = "result";

/// Where a schema definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaOrigin {
    /// Synthesized from the function's parameters.
    Parameters,
    /// The declared return type, reused as is.
    Record,
    /// Synthesized wrapper holding a non-record return value in `result`.
    ResultWrapper,
}

/// One field of a schema definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDefinition {
    pub name: String,
    pub schema: Schema,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// A named structured type: ordered fields plus its JSON Schema form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDefinition {
    pub title: String,
    pub origin: SchemaOrigin,
    pub fields: Vec<FieldDefinition>,
    /// JSON Schema for the whole definition. For [`SchemaOrigin::Record`]
    /// this is a `$ref` into the accompanying definitions.
    pub schema: Schema,
}

impl SchemaDefinition {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_wrapped(&self) -> bool {
        self.origin == SchemaOrigin::ResultWrapper
    }
}

/// Everything synthesized for one function.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedSchemas {
    pub input: SchemaDefinition,
    pub output: SchemaDefinition,
    /// Named types referenced from either schema.
    pub definitions: Map<String, Schema>,
}

/// Build the input and output schemas for `descriptor` registered as `route`.
///
/// Deterministic: the same descriptor always produces equal schemas.
pub fn synthesize(
    route: &str,
    descriptor: &FunctionDescriptor,
) -> Result<SynthesizedSchemas, RegistrationError> {
    let mut generator = schema_generator();
    let param_schemas: Vec<Schema> = descriptor
        .params
        .iter()
        .map(|param| param.ty.schema(&mut generator))
        .collect();
    let return_schema = descriptor.returns.schema(&mut generator);
    let definitions = generator.take_definitions();

    let unsupported = |location: String, ty: &TypeDescriptor, reason: String| {
        RegistrationError::UnsupportedType {
            tool: route.to_string(),
            location,
            type_name: ty.type_name().to_string(),
            reason,
        }
    };

    let validator = Validator::strict(&definitions);
    let mut fields = Vec::with_capacity(descriptor.params.len());
    for (param, schema) in descriptor.params.iter().zip(param_schemas) {
        check_representable(&schema, &definitions)
            .map_err(|reason| unsupported(format!("parameter '{}'", param.name), &param.ty, reason))?;

        if let Some(default) = &param.default {
            let violations = validator.validate(&schema, default);
            if !violations.is_empty() {
                return Err(RegistrationError::InvalidDefault {
                    tool: route.to_string(),
                    param: param.name.clone(),
                    violations,
                });
            }
        }

        fields.push(FieldDefinition {
            name: param.name.clone(),
            schema: annotate(
                schema,
                param.description.as_deref(),
                param.default.as_ref(),
                &param.examples,
            ),
            required: param.default.is_none(),
            default: param.default.clone(),
        });
    }

    check_representable(&return_schema, &definitions)
        .map_err(|reason| unsupported("the return value".to_string(), &descriptor.returns, reason))?;

    let input = SchemaDefinition {
        schema: object_schema(&format!("{route}Input"), descriptor.description.as_deref(), &fields),
        title: format!("{route}Input"),
        origin: SchemaOrigin::Parameters,
        fields,
    };

    let output = match as_record(&return_schema, &definitions) {
        Some(record) => SchemaDefinition {
            title: record_title(&return_schema, record),
            origin: SchemaOrigin::Record,
            fields: record_fields(record),
            schema: return_schema,
        },
        None => {
            let fields = vec![FieldDefinition {
                name: RESULT_FIELD.to_string(),
                schema: annotate(return_schema, descriptor.return_description.as_deref(), None, &[]),
                required: true,
                default: None,
            }];
            SchemaDefinition {
                schema: object_schema(&format!("{route}Output"), None, &fields),
                title: format!("{route}Output"),
                origin: SchemaOrigin::ResultWrapper,
                fields,
            }
        }
    };

    Ok(SynthesizedSchemas {
        input,
        output,
        definitions,
    })
}

/// A closed object schema with the given fields in order.
fn object_schema(title: &str, description: Option<&str>, fields: &[FieldDefinition]) -> Schema {
    let mut object = ObjectValidation {
        additional_properties: Some(Box::new(Schema::Bool(false))),
        ..ObjectValidation::default()
    };
    for field in fields {
        object
            .properties
            .insert(field.name.clone(), field.schema.clone());
        if field.required {
            object.required.insert(field.name.clone());
        }
    }

    Schema::Object(SchemaObject {
        metadata: Some(Box::new(Metadata {
            title: Some(title.to_string()),
            description: description.map(str::to_string),
            ..Metadata::default()
        })),
        instance_type: Some(InstanceType::Object.into()),
        object: Some(Box::new(object)),
        ..SchemaObject::default()
    })
}

/// Attach documentation to a field schema.
///
/// `$ref` siblings are ignored by OpenAPI 3.0 readers, so referenced types
/// are wrapped in a single-branch `allOf` first.
fn annotate(
    schema: Schema,
    description: Option<&str>,
    default: Option<&Value>,
    examples: &[Value],
) -> Schema {
    if description.is_none() && default.is_none() && examples.is_empty() {
        return schema;
    }

    let mut object = match schema {
        Schema::Object(object) if object.reference.is_some() => SchemaObject {
            subschemas: Some(Box::new(SubschemaValidation {
                all_of: Some(vec![Schema::Object(object)]),
                ..SubschemaValidation::default()
            })),
            ..SchemaObject::default()
        },
        other => other.into_object(),
    };

    let metadata = object.metadata();
    if let Some(description) = description {
        metadata.description = Some(description.to_string());
    }
    if let Some(default) = default {
        metadata.default = Some(default.clone());
    }
    metadata.examples.extend(examples.iter().cloned());
    Schema::Object(object)
}

fn record_title(reference: &Schema, record: &SchemaObject) -> String {
    record
        .metadata
        .as_ref()
        .and_then(|m| m.title.clone())
        .or_else(|| match reference {
            Schema::Object(SchemaObject {
                reference: Some(reference),
                ..
            }) => Some(reference_name(reference).to_string()),
            Schema::Object(_) | Schema::Bool(_) => None,
        })
        .unwrap_or_else(|| "Output".to_string())
}

fn record_fields(record: &SchemaObject) -> Vec<FieldDefinition> {
    let Some(validation) = &record.object else {
        return Vec::new();
    };
    validation
        .properties
        .iter()
        .map(|(name, schema)| FieldDefinition {
            name: name.clone(),
            schema: schema.clone(),
            required: validation.required.contains(name),
            default: match schema {
                Schema::Object(object) => object.metadata.as_ref().and_then(|m| m.default.clone()),
                Schema::Bool(_) => None,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::inspect;
    use crate::tool::Tool;
    use pretty_assertions::assert_eq;
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, JsonSchema)]
    struct TestInput {
        name: String,
        value: i64,
    }

    #[derive(Debug, Serialize, Deserialize, JsonSchema)]
    struct TestOutput {
        result: String,
        success: bool,
    }

    fn add_numbers(a: i64, b: i64) -> i64 {
        a + b
    }

    fn test_process(data: TestInput) -> TestOutput {
        TestOutput {
            result: format!("Processed {}", data.name),
            success: true,
        }
    }

    fn list_outputs(count: usize) -> Vec<TestOutput> {
        (0..count)
            .map(|i| TestOutput {
                result: i.to_string(),
                success: true,
            })
            .collect()
    }

    fn passthrough(value: serde_json::Value) -> bool {
        value.is_null()
    }

    fn descriptor(tool: Tool) -> FunctionDescriptor {
        inspect(tool, "test").unwrap()
    }

    fn schema_json(schema: &Schema) -> Value {
        serde_json::to_value(schema).unwrap()
    }

    #[test]
    fn test_scalar_return_is_wrapped() {
        let schemas = synthesize("calculate", &descriptor(Tool::new(add_numbers).params(["a", "b"]))).unwrap();

        assert_eq!(schemas.input.title, "calculateInput");
        assert_eq!(schemas.input.origin, SchemaOrigin::Parameters);
        let names: Vec<_> = schemas.input.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(schemas.input.fields.iter().all(|f| f.required));

        assert!(schemas.output.is_wrapped());
        assert_eq!(schemas.output.fields.len(), 1);
        assert_eq!(schemas.output.fields[0].name, RESULT_FIELD);

        assert_eq!(
            schema_json(&schemas.input.schema),
            json!({
                "title": "calculateInput",
                "type": "object",
                "required": ["a", "b"],
                "properties": {
                    "a": {"type": "integer", "format": "int64"},
                    "b": {"type": "integer", "format": "int64"}
                },
                "additionalProperties": false
            })
        );
        assert_eq!(
            schema_json(&schemas.output.schema)["properties"]["result"],
            json!({"type": "integer", "format": "int64"})
        );
    }

    #[test]
    fn test_record_return_is_reused() {
        let schemas = synthesize("test_process", &descriptor(Tool::new(test_process).params(["data"]))).unwrap();

        assert_eq!(schemas.output.origin, SchemaOrigin::Record);
        assert_eq!(schemas.output.title, "TestOutput");
        let names: Vec<_> = schemas.output.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["result", "success"]);
        assert!(schemas.definitions.contains_key("TestInput"));
        assert!(schemas.definitions.contains_key("TestOutput"));
        assert_eq!(
            schema_json(&schemas.output.schema),
            json!({"$ref": "#/components/schemas/TestOutput"})
        );
    }

    #[test]
    fn test_container_of_records_is_wrapped() {
        let schemas = synthesize("list", &descriptor(Tool::new(list_outputs).params(["count"]))).unwrap();
        assert!(schemas.output.is_wrapped());
        assert!(schemas.definitions.contains_key("TestOutput"));
    }

    #[test]
    fn test_defaults_make_fields_optional() {
        let tool = Tool::new(add_numbers)
            .params(["a", "b"])
            .default_value("b", json!(10))
            .param_description("b", "the second integer")
            .example("a", json!(2));
        let schemas = synthesize("calculate", &descriptor(tool)).unwrap();

        let b = schemas.input.field("b").unwrap();
        assert!(!b.required);
        assert_eq!(b.default, Some(json!(10)));
        assert_eq!(
            schema_json(&b.schema),
            json!({
                "type": "integer",
                "format": "int64",
                "description": "the second integer",
                "default": 10
            })
        );
        assert_eq!(schema_json(&schemas.input.field("a").unwrap().schema)["examples"], json!([2]));
        assert_eq!(schema_json(&schemas.input.schema)["required"], json!(["a"]));
    }

    #[test]
    fn test_invalid_default_is_rejected() {
        let tool = Tool::new(add_numbers)
            .params(["a", "b"])
            .default_value("b", json!("ten"));
        assert!(matches!(
            synthesize("calculate", &descriptor(tool)),
            Err(RegistrationError::InvalidDefault { param, .. }) if param == "b"
        ));
    }

    #[test]
    fn test_any_typed_parameter_is_unsupported() {
        match synthesize("passthrough", &descriptor(Tool::new(passthrough).params(["value"]))) {
            Err(RegistrationError::UnsupportedType { location, .. }) => {
                assert_eq!(location, "parameter 'value'");
            }
            other => panic!("expected UnsupportedType, got {other:?}"),
        }
    }

    #[test]
    fn test_any_typed_return_is_unsupported() {
        let tool = Tool::new(|x: i64| json!({ "x": x })).params(["x"]);
        assert!(matches!(
            synthesize("loose", &descriptor(tool)),
            Err(RegistrationError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let first = descriptor(Tool::new(test_process).params(["data"]));
        let second = descriptor(Tool::new(test_process).params(["data"]));
        assert_eq!(
            synthesize("test_process", &first).unwrap(),
            synthesize("test_process", &second).unwrap()
        );
        assert_eq!(
            synthesize("test_process", &first).unwrap(),
            synthesize("test_process", &first).unwrap()
        );
    }
}
