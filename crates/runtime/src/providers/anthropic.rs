//! Anthropic Messages API backend.

use crate::model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Part, Role, StopReason, ToolCall,
    Usage,
};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolkit::ToolSpec;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

const API_VERSION: &str = "2023-06-01";
const OAUTH_BETA_HEADER: &str = "oauth-2025-04-20";

/// Authentication mode for the Anthropic API.
#[derive(Debug, Clone)]
pub enum AnthropicAuth {
    /// Standard API key (`sk-ant-api01-...`).
    ApiKey(String),
    /// OAuth access token, sent as a bearer token.
    OAuth(String),
}

impl std::fmt::Display for AnthropicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => write!(f, "api_key"),
            Self::OAuth(_) => write!(f, "oauth"),
        }
    }
}

impl AnthropicAuth {
    fn apply_headers(&self, req: RequestBuilder) -> RequestBuilder {
        match self {
            Self::ApiKey(key) => req.header("x-api-key", key),
            Self::OAuth(token) => req
                .header("Authorization", format!("Bearer {token}"))
                .header("anthropic-beta", OAUTH_BETA_HEADER),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Vec<ApiContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
}

#[derive(Debug, Serialize)]
struct ApiTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for an [`AnthropicBackend`].
#[derive(Debug, Clone)]
pub struct AnthropicBackendBuilder {
    auth: AnthropicAuth,
    model: String,
    max_tokens: u32,
    system: Option<String>,
    base_url: String,
}

impl AnthropicBackendBuilder {
    pub fn new(auth: AnthropicAuth, model: impl Into<String>) -> Self {
        Self {
            auth,
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// System prompt sent alongside every request.
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Point at a proxy or compatible endpoint instead of the public API.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn build(self) -> AnthropicBackend {
        AnthropicBackend {
            client: reqwest::Client::new(),
            url: format!("{}/v1/messages", self.base_url.trim_end_matches('/')),
            auth: self.auth,
            model: self.model,
            max_tokens: self.max_tokens,
            system: self.system,
        }
    }
}

/// Anthropic API backend.
pub struct AnthropicBackend {
    client: reqwest::Client,
    url: String,
    auth: AnthropicAuth,
    model: String,
    max_tokens: u32,
    system: Option<String>,
}

impl AnthropicBackend {
    pub fn builder(auth: AnthropicAuth, model: impl Into<String>) -> AnthropicBackendBuilder {
        AnthropicBackendBuilder::new(auth, model)
    }

    /// Model name requests are sent with.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn message_to_api(msg: &Message) -> ApiMessage {
        let role = match msg.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        let content = msg
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => ApiContentBlock::Text { text: text.clone() },
                Part::ToolCall(call) => ApiContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.input.clone(),
                },
            })
            .collect();
        ApiMessage { role, content }
    }

    fn tool_to_api(spec: &ToolSpec) -> ApiTool<'_> {
        ApiTool {
            name: &spec.name,
            description: &spec.description,
            input_schema: &spec.input_schema,
        }
    }

    fn response_to_message(blocks: Vec<ApiResponseBlock>) -> Message {
        let parts = blocks
            .into_iter()
            .filter_map(|block| match block {
                ApiResponseBlock::Text { text } => Some(Part::Text(text)),
                ApiResponseBlock::ToolUse { id, name, input } => {
                    Some(Part::ToolCall(ToolCall { id, name, input }))
                }
                ApiResponseBlock::Unknown => None,
            })
            .collect();
        Message::assistant(parts)
    }

    fn parse_stop_reason(raw: Option<String>) -> StopReason {
        match raw.as_deref() {
            None | Some("end_turn") | Some("stop_sequence") => StopReason::EndTurn,
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            Some(other) => StopReason::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "anthropic({}, auth={})", self.model, self.auth)
    }
}

impl Backend for AnthropicBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let api_request = ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: request.messages.iter().map(Self::message_to_api).collect(),
            system: self.system.as_deref(),
            tools: request.tools.iter().map(Self::tool_to_api).collect(),
        };

        debug!(
            model = %self.model,
            tools = api_request.tools.len(),
            "sending messages request"
        );

        let req = self
            .client
            .post(&self.url)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .header("accept", "application/json");

        let response = self
            .auth
            .apply_headers(req)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let usage = Usage {
            input_tokens: api_response.usage.input_tokens,
            output_tokens: api_response.usage.output_tokens,
        };
        debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "received response"
        );

        Ok(ModelResponse {
            message: Self::response_to_message(api_response.content),
            stop_reason: Self::parse_stop_reason(api_response.stop_reason),
            usage,
        })
    }
}
