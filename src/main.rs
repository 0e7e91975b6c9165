//! Typed Toolset demo server
//!
//! Registers a handful of example tools and serves them.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::time::Duration;

use anyhow::Context;
use dotenvy::dotenv;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use typed_toolset::Tool;
use typed_toolset::Toolset;
use typed_toolset::config::{AppConfig, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let config = AppConfig::load().context("failed to load configuration")?;

    // Initialize tracing (M-LOG-STRUCTURED)
    let filter = EnvFilter::from_default_env().add_directive("info".parse()?);
    match config.log.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .init(),
    }

    let toolset = demo_toolset()?;
    toolset.serve_with_config(config).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Demo tools
// ─────────────────────────────────────────────────────────────────────────────

fn demo_toolset() -> anyhow::Result<Toolset> {
    let mut toolset = Toolset::new("Demo API", "1.0.0");

    toolset.add(
        None,
        Tool::new(hello).params(["name"]).example("name", json!("World")).doc(
            "A simple function that greets the user.
            :param name: the name of the user
            :return: the greeting message",
        ),
    )?;

    toolset.add(
        None,
        Tool::new(add).params(["a", "b"]).doc(
            "Add two integers together.
            :param a: the first integer
            :param b: the second integer
            :return: the sum of a and b",
        ),
    )?;

    toolset.add(
        Some("multiply"),
        Tool::new(multiply_numbers).params(["x", "y"]).doc(
            "Multiply two floating-point numbers.
            :param x: the first number
            :param y: the second number
            :return: the product of x and y",
        ),
    )?;

    toolset.add(
        None,
        Tool::fallible(summarize)
            .params(["readings", "unit"])
            .default_value("unit", json!("celsius"))
            .doc(
                "Summarize a series of temperature readings.
                :param readings: the readings to summarize
                :param unit: unit the readings are reported in",
            ),
    )?;

    toolset.add(
        None,
        Tool::from_async(countdown).params(["from", "delay_ms"]).doc(
            "Count down to zero, pausing between steps.
            :param from: the starting number
            :param delay_ms: pause between steps in milliseconds",
        ),
    )?;

    Ok(toolset)
}

fn hello(name: String) -> String {
    format!("Hello, {name}!")
}

fn add(a: i64, b: i64) -> i64 {
    a + b
}

fn multiply_numbers(x: f64, y: f64) -> f64 {
    x * y
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
enum Unit {
    Celsius,
    Fahrenheit,
}

/// Aggregate statistics over a series of readings.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct Summary {
    count: usize,
    min: f64,
    max: f64,
    mean: f64,
    unit: Unit,
}

fn summarize(readings: Vec<f64>, unit: Unit) -> Result<Summary, String> {
    if readings.is_empty() {
        return Err("at least one reading is required".to_string());
    }
    let min = readings.iter().copied().fold(f64::INFINITY, f64::min);
    let max = readings.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = readings.iter().sum::<f64>() / readings.len() as f64;
    Ok(Summary {
        count: readings.len(),
        min,
        max,
        mean,
        unit,
    })
}

async fn countdown(from: u8, delay_ms: u16) -> Result<Vec<u8>, std::convert::Infallible> {
    let mut steps = Vec::with_capacity(usize::from(from) + 1);
    for n in (0..=from).rev() {
        steps.push(n);
        tokio::time::sleep(Duration::from_millis(u64::from(delay_ms))).await;
    }
    Ok(steps)
}
