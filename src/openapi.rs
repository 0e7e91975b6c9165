//! OpenAPI 3.0 documents and the Swagger UI page, built from the registry.

use schemars::{Map, schema::Schema};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::ErrorResponse;
use crate::registry::{EndpointRegistry, RouteEntry};
use crate::synth::SchemaDefinition;
use crate::types::{DEFINITIONS_PATH, schema_generator};

const OPENAPI_VERSION: &str = "3.0.3";
const ERROR_COMPONENT: &str = "ErrorResponse";

/// Title, version and description of the generated API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for ApiInfo {
    fn default() -> Self {
        Self {
            title: "Toolset API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
        }
    }
}

/// Component names must match `^[a-zA-Z0-9._-]+$`; route names may not.
pub fn sanitize_component_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Aggregate document: one `POST /tool/{name}` and one `GET /schema/{name}`
/// operation per route, in registration order.
pub fn document(info: &ApiInfo, registry: &EndpointRegistry, server_url: Option<&str>) -> Value {
    let mut builder = DocumentBuilder::new();
    for entry in registry.all_entries() {
        builder.add_tool(entry);
        builder.add_schema_route(entry);
    }
    builder.finish(info, server_url)
}

/// Stand-alone document for a single route, pointing at `server_url`.
pub fn tool_document(info: &ApiInfo, entry: &RouteEntry, server_url: &str) -> Value {
    let info = ApiInfo {
        title: format!("Schema for {}", entry.name),
        version: info.version.clone(),
        description: entry.descriptor.description.clone(),
    };
    let mut builder = DocumentBuilder::new();
    builder.add_tool(entry);
    builder.finish(&info, Some(server_url))
}

struct DocumentBuilder {
    paths: Map<String, Value>,
    schemas: Map<String, Schema>,
}

impl DocumentBuilder {
    fn new() -> Self {
        let mut generator = schema_generator();
        generator.subschema_for::<ErrorResponse>();
        Self {
            paths: Map::new(),
            schemas: generator.take_definitions(),
        }
    }

    fn add_tool(&mut self, entry: &RouteEntry) {
        for (name, schema) in &entry.definitions {
            self.schemas
                .entry(name.clone())
                .or_insert_with(|| schema.clone());
        }
        let request = self.component(&entry.input);
        let response = self.component(&entry.output);

        let mut operation = json!({
            "tags": ["Tools"],
            "summary": format!("Tool: {}", entry.name),
            "operationId": sanitize_component_name(&entry.name),
            "requestBody": {
                "required": true,
                "content": {"application/json": {"schema": request}}
            },
            "responses": {
                "200": {
                    "description": entry.descriptor.return_description.as_deref().unwrap_or("Successful Response"),
                    "content": {"application/json": {"schema": response}}
                },
                "404": error_response("Tool not found"),
                "422": error_response("Validation Error"),
                "500": error_response("Tool failed or returned an invalid value")
            }
        });
        if let Some(description) = &entry.descriptor.description {
            operation["description"] = Value::String(description.clone());
        }
        self.paths
            .insert(format!("/tool/{}", entry.name), json!({ "post": operation }));
    }

    fn add_schema_route(&mut self, entry: &RouteEntry) {
        self.paths.insert(
            format!("/schema/{}", entry.name),
            json!({
                "get": {
                    "tags": ["Schemas"],
                    "summary": format!("Schema for tool: {}", entry.name),
                    "operationId": format!("schema_{}", sanitize_component_name(&entry.name)),
                    "responses": {
                        "200": {
                            "description": "Input and output schema of the tool",
                            "content": {"application/json": {"schema": {"type": "object"}}}
                        },
                        "404": error_response("Tool not found")
                    }
                }
            }),
        );
    }

    /// Register a synthesized definition and return a `$ref` to it. Reused
    /// records already live in the definitions and are referenced as is.
    fn component(&mut self, definition: &SchemaDefinition) -> Value {
        if let Schema::Object(object) = &definition.schema {
            if object.reference.is_some() {
                return to_json(&definition.schema);
            }
        }
        let name = self.unused_name(sanitize_component_name(&definition.title));
        self.schemas.insert(name.clone(), definition.schema.clone());
        json!({ "$ref": format!("{DEFINITIONS_PATH}{name}") })
    }

    /// Distinct routes can sanitize to the same name (`a/b` and `a_b`);
    /// later ones get a numeric suffix.
    fn unused_name(&self, base: String) -> String {
        if !self.schemas.contains_key(&base) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if !self.schemas.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn finish(self, info: &ApiInfo, server_url: Option<&str>) -> Value {
        let mut document = json!({
            "openapi": OPENAPI_VERSION,
            "info": info,
            "paths": self.paths,
            "components": {"schemas": self.schemas}
        });
        if let Some(url) = server_url {
            document["servers"] = json!([{"url": url, "description": "Current server address"}]);
        }
        document
    }
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": {"$ref": format!("{DEFINITIONS_PATH}{ERROR_COMPONENT}")}
            }
        }
    })
}

fn to_json(schema: &Schema) -> Value {
    serde_json::to_value(schema).unwrap_or(Value::Bool(true))
}

/// Swagger UI page loading the aggregate document from `spec_url`.
pub fn swagger_ui(title: &str, spec_url: &str) -> String {
    let title = html_escape(title);
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{title} - Swagger UI</title>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {{
      window.ui = SwaggerUIBundle({{ url: "{spec_url}", dom_id: "#swagger-ui" }});
    }};
  </script>
</body>
</html>
"##
    )
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
