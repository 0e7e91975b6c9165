//! Read-only schema documents for registered routes.

use indexmap::IndexMap;
use schemars::{Map, schema::Schema};
use serde::Serialize;

use crate::error::RouteNotFound;
use crate::registry::{EndpointRegistry, RouteEntry};
use crate::synth::SchemaDefinition;

/// Named types referenced by a document, laid out like OpenAPI components so
/// `$ref`s inside the document resolve against it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Components {
    pub schemas: Map<String, Schema>,
}

/// Input and output schema of one route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDocument {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input: SchemaDefinition,
    pub output: SchemaDefinition,
    #[serde(skip_serializing_if = "components_empty")]
    pub components: Components,
}

fn components_empty(components: &Components) -> bool {
    components.schemas.is_empty()
}

impl From<&RouteEntry> for SchemaDocument {
    fn from(entry: &RouteEntry) -> Self {
        Self {
            name: entry.name.clone(),
            description: entry.descriptor.description.clone(),
            input: entry.input.clone(),
            output: entry.output.clone(),
            components: Components {
                schemas: entry.definitions.clone(),
            },
        }
    }
}

pub fn schema_for(registry: &EndpointRegistry, name: &str) -> Result<SchemaDocument, RouteNotFound> {
    registry
        .lookup(name)
        .map(|entry| SchemaDocument::from(entry.as_ref()))
}

/// Documents for every route, in registration order.
pub fn schema_all(registry: &EndpointRegistry) -> IndexMap<String, SchemaDocument> {
    registry
        .all_entries()
        .map(|entry| (entry.name.clone(), SchemaDocument::from(entry.as_ref())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::inspect;
    use crate::synth::synthesize;
    use crate::tool::Tool;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn add_numbers(a: i64, b: i64) -> i64 {
        a + b
    }

    fn hello(name: String) -> String {
        format!("Hello, {name}!")
    }

    fn registry() -> EndpointRegistry {
        let mut registry = EndpointRegistry::new();
        for (name, tool) in [
            ("calculate", Tool::new(add_numbers).params(["a", "b"]).description("Add two integers.")),
            ("hello", Tool::new(hello).params(["name"])),
        ] {
            let descriptor = inspect(tool, name).unwrap();
            let schemas = synthesize(name, &descriptor).unwrap();
            registry.register(name, descriptor, schemas).unwrap();
        }
        registry
    }

    #[test]
    fn test_schema_for_lists_fields() {
        let doc = serde_json::to_value(schema_for(&registry(), "calculate").unwrap()).unwrap();

        assert_eq!(doc["name"], json!("calculate"));
        assert_eq!(doc["description"], json!("Add two integers."));
        assert_eq!(doc["input"]["origin"], json!("parameters"));
        assert_eq!(
            doc["input"]["fields"],
            json!([
                {"name": "a", "schema": {"type": "integer", "format": "int64"}, "required": true},
                {"name": "b", "schema": {"type": "integer", "format": "int64"}, "required": true}
            ])
        );
        assert_eq!(doc["output"]["origin"], json!("result_wrapper"));
        assert_eq!(
            doc["output"]["fields"],
            json!([{"name": "result", "schema": {"type": "integer", "format": "int64"}, "required": true}])
        );
        assert!(doc.get("components").is_none());
    }

    #[test]
    fn test_schema_for_missing_route() {
        assert_eq!(
            schema_for(&registry(), "missing_route").unwrap_err(),
            RouteNotFound("missing_route".to_string())
        );
    }

    #[test]
    fn test_schema_all_in_registration_order() {
        let all = schema_all(&registry());
        let names: Vec<_> = all.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["calculate", "hello"]);
        assert!(schema_all(&EndpointRegistry::new()).is_empty());
    }
}
