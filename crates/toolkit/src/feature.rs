//! Feature trait.

use crate::{ToolError, ToolSpec};
use async_trait::async_trait;
use serde_json::Value;

/// A single invocable capability with a declared input schema.
///
/// This is the boundary between dispatch and side effects. Implementations
/// may assume `input` already satisfies [`Feature::input_schema`]: the owning
/// [`ToolkitServer`](crate::ToolkitServer) validates before calling `run`.
#[async_trait]
pub trait Feature: Send + Sync {
    /// Name the model uses to call this feature.
    fn name(&self) -> &str;

    /// Description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema for the input object.
    fn input_schema(&self) -> Value;

    /// Perform the capability.
    async fn run(&self, input: Value) -> Result<Value, ToolError>;

    /// Spec advertised to the model.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

type Handler = dyn Fn(Value) -> Result<Value, ToolError> + Send + Sync;

/// A feature backed by a plain function.
///
/// ```
/// use serde_json::json;
/// use toolkit::FnFeature;
///
/// let echo = FnFeature::new(
///     "echo",
///     "Echo the input back",
///     json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]}),
///     |input| Ok(input["text"].clone()),
/// );
/// ```
pub struct FnFeature {
    name: String,
    description: String,
    schema: Value,
    handler: Box<Handler>,
}

impl FnFeature {
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            handler: Box::new(handler),
        }
    }
}

impl std::fmt::Debug for FnFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFeature")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Feature for FnFeature {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn run(&self, input: Value) -> Result<Value, ToolError> {
        (self.handler)(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fn_feature_runs_handler() {
        let upper = FnFeature::new("upper", "Uppercase", json!({"type": "string"}), |input| {
            let text = input.as_str().unwrap_or_default();
            Ok(Value::String(text.to_uppercase()))
        });

        assert_eq!(upper.run(json!("abc")).await.unwrap(), json!("ABC"));
    }

    #[test]
    fn spec_carries_name_and_schema() {
        let schema = json!({"type": "object"});
        let noop = FnFeature::new("noop", "Does nothing", schema.clone(), |_| Ok(Value::Null));

        let spec = noop.spec();
        assert_eq!(spec.name, "noop");
        assert_eq!(spec.description, "Does nothing");
        assert_eq!(spec.input_schema, schema);
    }
}
