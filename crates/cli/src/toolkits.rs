//! Toolkits built into the binary.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use toolkit::{Feature, FnFeature, ToolError, ToolkitServer};

/// Every built-in toolkit.
pub fn builtin() -> Result<Vec<ToolkitServer>, ToolError> {
    Ok(vec![clock()?, calc()?, text()?])
}

fn clock() -> Result<ToolkitServer, ToolError> {
    let now: Arc<dyn Feature> = Arc::new(FnFeature::new(
        "now",
        "Current date and time in UTC (RFC 3339).",
        json!({"type": "object", "properties": {}, "additionalProperties": false}),
        |_| Ok(json!(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))),
    ));
    ToolkitServer::new("clock", [now])
}

fn calc() -> Result<ToolkitServer, ToolError> {
    let operands = json!({
        "type": "object",
        "properties": {
            "a": {"type": "number"},
            "b": {"type": "number"}
        },
        "required": ["a", "b"],
        "additionalProperties": false
    });

    let add: Arc<dyn Feature> = Arc::new(FnFeature::new(
        "add",
        "Add two numbers.",
        operands.clone(),
        |input| binary(&input, |a, b| Some(a + b)),
    ));
    let multiply: Arc<dyn Feature> = Arc::new(FnFeature::new(
        "multiply",
        "Multiply two numbers.",
        operands.clone(),
        |input| binary(&input, |a, b| Some(a * b)),
    ));
    let divide: Arc<dyn Feature> = Arc::new(FnFeature::new(
        "divide",
        "Divide a by b.",
        operands,
        |input| binary(&input, |a, b| (b != 0.0).then(|| a / b)),
    ));

    ToolkitServer::new("calc", [add, multiply, divide])
}

fn binary(input: &Value, op: impl Fn(f64, f64) -> Option<f64>) -> Result<Value, ToolError> {
    let a = input["a"].as_f64().unwrap_or_default();
    let b = input["b"].as_f64().unwrap_or_default();
    let result = op(a, b).ok_or_else(|| ToolError::execution("division by zero"))?;
    Ok(json!(result))
}

fn text() -> Result<ToolkitServer, ToolError> {
    let schema = json!({
        "type": "object",
        "properties": {"text": {"type": "string"}},
        "required": ["text"]
    });

    let word_count: Arc<dyn Feature> = Arc::new(FnFeature::new(
        "word_count",
        "Count the words in a text.",
        schema.clone(),
        |input| Ok(json!(input["text"].as_str().unwrap_or_default().split_whitespace().count())),
    ));
    let reverse: Arc<dyn Feature> = Arc::new(FnFeature::new(
        "reverse",
        "Reverse a text character by character.",
        schema,
        |input| {
            let text = input["text"].as_str().unwrap_or_default();
            Ok(json!(text.chars().rev().collect::<String>()))
        },
    ));

    ToolkitServer::new("text", [word_count, reverse])
}
