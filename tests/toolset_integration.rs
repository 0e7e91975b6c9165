use pretty_assertions::assert_eq;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use typed_toolset::{DispatchError, RegistrationError, Tool, Toolset, TypeDescriptor};

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct TestInput {
    name: String,
    value: i64,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
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
        success: data.value >= 0,
    }
}

fn test_optional(name: String, age: Option<u32>) -> String {
    match age {
        Some(age) => format!("Hello {name}, you are {age} years old"),
        None => format!("Hello {name}"),
    }
}

fn list_outputs(count: usize) -> Vec<TestOutput> {
    (0..count)
        .map(|i| TestOutput {
            result: format!("item {i}"),
            success: true,
        })
        .collect()
}

async fn slow_echo(text: String) -> Result<String, std::io::Error> {
    tokio::task::yield_now().await;
    Ok(text)
}

fn echo_all(args: Vec<Value>) -> Result<Value, String> {
    Ok(Value::Array(args))
}

fn calculator() -> Toolset {
    let mut toolset = Toolset::new("Test API", "1.0.0");
    toolset
        .add(Some("calculate"), Tool::new(add_numbers).params(["a", "b"]))
        .unwrap();
    toolset
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_annotated_functions_round_trip() {
    let mut toolset = Toolset::new("Test API", "1.0.0");
    toolset.add(None, Tool::new(add_numbers).params(["a", "b"])).unwrap();
    toolset.add(None, Tool::new(test_process).params(["data"])).unwrap();
    toolset
        .add(
            None,
            Tool::new(test_optional)
                .params(["name", "age"])
                .default_value("age", Value::Null),
        )
        .unwrap();
    toolset.add(None, Tool::from_async(slow_echo).params(["text"])).unwrap();

    let names: Vec<_> = toolset.schema_all().into_keys().collect();
    assert_eq!(names, vec!["add_numbers", "test_process", "test_optional", "slow_echo"]);

    let sum = toolset.handle("add_numbers", json!({"a": 40, "b": 2})).await.unwrap();
    assert_eq!(sum, json!({"result": 42}));

    let processed = toolset
        .handle("test_process", json!({"data": {"name": "widget", "value": 3}}))
        .await
        .unwrap();
    let processed: TestOutput = serde_json::from_value(processed).unwrap();
    assert_eq!(
        processed,
        TestOutput {
            result: "Processed widget".to_string(),
            success: true,
        }
    );

    assert_eq!(
        toolset.handle("test_optional", json!({"name": "Ada"})).await.unwrap(),
        json!({"result": "Hello Ada"})
    );
    assert_eq!(
        toolset
            .handle("test_optional", json!({"name": "Ada", "age": 36}))
            .await
            .unwrap(),
        json!({"result": "Hello Ada, you are 36 years old"})
    );
    assert_eq!(
        toolset.handle("slow_echo", json!({"text": "hi"})).await.unwrap(),
        json!({"result": "hi"})
    );
}

#[test]
fn test_missing_annotations_abort_registration() {
    let mut toolset = Toolset::default();

    let err = toolset
        .add(
            None,
            Tool::dynamic("echo_all", echo_all)
                .declare("a", None)
                .declare_return(Some(TypeDescriptor::of::<Vec<i64>>())),
        )
        .unwrap_err();
    assert!(matches!(err, RegistrationError::MissingParameterType { .. }));

    let err = toolset
        .add(
            None,
            Tool::dynamic("echo_all", echo_all).declare("a", Some(TypeDescriptor::of::<i64>())),
        )
        .unwrap_err();
    assert!(matches!(err, RegistrationError::MissingReturnType { .. }));

    assert!(toolset.registry().is_empty());
    assert!(toolset.schema_for("echo_all").is_err());
}

#[tokio::test]
async fn test_dynamic_tools_with_full_declarations() {
    let mut toolset = Toolset::default();
    toolset
        .add(
            None,
            Tool::dynamic("echo_all", echo_all)
                .declare("a", Some(TypeDescriptor::of::<i64>()))
                .declare("b", Some(TypeDescriptor::of::<String>()))
                .declare_return(Some(TypeDescriptor::of::<(i64, String)>())),
        )
        .unwrap();

    assert_eq!(
        toolset.handle("echo_all", json!({"b": "x", "a": 1})).await.unwrap(),
        json!({"result": [1, "x"]})
    );
}

#[test]
fn test_duplicate_route_keeps_first() {
    let mut toolset = calculator();

    let err = toolset
        .add(Some("calculate"), Tool::new(test_process).params(["data"]))
        .unwrap_err();
    assert!(matches!(err, RegistrationError::DuplicateRoute(ref name) if name == "calculate"));
    assert_eq!(
        err.to_string(),
        "tool 'calculate' already exists. Please use a different name."
    );

    // Default names collide the same way.
    toolset.add(None, Tool::new(add_numbers).params(["a", "b"])).unwrap();
    let err = toolset
        .add(None, Tool::new(add_numbers).params(["x", "y"]))
        .unwrap_err();
    assert!(matches!(err, RegistrationError::DuplicateRoute(_)));

    let doc = toolset.schema_for("calculate").unwrap();
    let fields: Vec<_> = doc.input.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(fields, vec!["a", "b"]);
}

#[test]
fn test_unsupported_types_are_rejected() {
    let mut toolset = Toolset::default();
    let err = toolset
        .add(Some("raw"), Tool::new(|v: Value| v.is_null()).params(["v"]))
        .unwrap_err();
    assert!(matches!(err, RegistrationError::UnsupportedType { .. }));
    assert!(toolset.registry().is_empty());
}

#[test]
fn test_schemas_are_deterministic() {
    let first = calculator().schema_for("calculate").unwrap();
    let second = calculator().schema_for("calculate").unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_container_of_records_is_wrapped() {
    let mut toolset = Toolset::default();
    toolset.add(None, Tool::new(list_outputs).params(["count"])).unwrap();
    toolset.add(None, Tool::new(test_process).params(["data"])).unwrap();

    let wrapped = toolset.schema_for("list_outputs").unwrap();
    assert!(wrapped.output.is_wrapped());

    let record = toolset.schema_for("test_process").unwrap();
    assert!(!record.output.is_wrapped());
    assert_eq!(record.output.title, "TestOutput");
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_calculate_scenario() {
    let toolset = calculator();

    assert_eq!(
        toolset.handle("calculate", json!({"a": 2, "b": 3})).await.unwrap(),
        json!({"result": 5})
    );

    let err = toolset.handle("calculate", json!({"a": "x", "b": 3})).await.unwrap_err();
    assert!(matches!(err, DispatchError::Validation { .. }));

    let err = toolset.handle("missing_route", json!({})).await.unwrap_err();
    assert!(matches!(err, DispatchError::RouteNotFound(_)));

    let doc = serde_json::to_value(toolset.schema_for("calculate").unwrap()).unwrap();
    let int = json!({"type": "integer", "format": "int64"});
    assert_eq!(doc["input"]["fields"][0]["name"], "a");
    assert_eq!(doc["input"]["fields"][0]["schema"], int);
    assert_eq!(doc["input"]["fields"][1]["name"], "b");
    assert_eq!(doc["input"]["fields"][1]["schema"], int);
    assert_eq!(doc["output"]["fields"][0]["name"], "result");
    assert_eq!(doc["output"]["fields"][0]["schema"], int);
}

#[tokio::test]
async fn test_strict_payload_validation() {
    let toolset = calculator();

    for payload in [
        json!({"a": 1, "b": 2, "c": 3}),
        json!({"a": 1}),
        json!({"a": 1, "b": true}),
        json!({"a": 1.5, "b": 2}),
        json!("a=1&b=2"),
    ] {
        let err = toolset.handle("calculate", payload.clone()).await.unwrap_err();
        assert!(
            matches!(err, DispatchError::Validation { .. }),
            "{payload} should be rejected, got {err:?}"
        );
        assert!(!err.violations().is_empty());
    }
}
