//! Language-model pipeline: prompt, model call with bound tools, output parsing.

use std::future::Future;

use serde_json::{Map, Value};
use toolkit::ToolSpec;
use tracing::debug;

use crate::model::{Backend, Message, ModelError, ModelRequest, ModelResponse, StopReason, ToolCall};
use crate::prompt::{ChatInput, PromptTemplate};
use crate::Result;

/// Parsed output of one model turn.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentStep {
    /// The model answered; `return_values` carries at least `output`.
    Finish { return_values: Map<String, Value> },
    /// The model asked for one or more tool invocations.
    Actions(Vec<ToolCall>),
}

impl AgentStep {
    /// A final answer carrying `{"output": text}`.
    pub fn finish(output: impl Into<String>) -> Self {
        let mut return_values = Map::new();
        return_values.insert("output".into(), Value::String(output.into()));
        Self::Finish { return_values }
    }
}

/// Produces one [`AgentStep`] per chat turn.
///
/// `tools` is the set of tools the model may call this turn.
pub trait Pipeline: Send + Sync {
    fn invoke(
        &self,
        input: &ChatInput,
        tools: &[ToolSpec],
    ) -> impl Future<Output = Result<AgentStep>> + Send;
}

/// Turn a raw model response into a step.
///
/// Any tool call makes the turn an action turn; otherwise the message text
/// becomes the `output` return value.
pub fn parse_step(response: ModelResponse) -> std::result::Result<AgentStep, ModelError> {
    let calls = response.message.tool_calls();
    if !calls.is_empty() {
        return Ok(AgentStep::Actions(calls));
    }
    if response.stop_reason == StopReason::ToolUse {
        return Err(ModelError::InvalidResponse(
            "stopped for tool use without requesting a tool".into(),
        ));
    }
    Ok(AgentStep::finish(response.message.text()))
}

/// The standard pipeline: render the prompt, call the backend, parse.
pub struct LlmPipeline<B> {
    prompt: PromptTemplate,
    backend: B,
}

impl<B: Backend> LlmPipeline<B> {
    pub fn new(prompt: PromptTemplate, backend: B) -> Self {
        Self { prompt, backend }
    }

    /// Parse `template` and build the pipeline.
    pub fn from_template(template: &str, backend: B) -> Result<Self> {
        Ok(Self::new(PromptTemplate::from_template(template)?, backend))
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: Backend> Pipeline for LlmPipeline<B> {
    async fn invoke(&self, input: &ChatInput, tools: &[ToolSpec]) -> Result<AgentStep> {
        let messages = [Message::user(self.prompt.render(input)?)];
        let response = self
            .backend
            .call(ModelRequest {
                messages: &messages,
                tools,
            })
            .await?;

        debug!(
            stop_reason = ?response.stop_reason,
            output_tokens = response.usage.output_tokens,
            "model turn complete"
        );
        Ok(parse_step(response)?)
    }
}
