//! Configuration loading from armory.toml.

use runtime::{AnthropicAuth, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PROMPT: &str = "You are Armory, a helpful assistant. Use a tool when one fits \
the request; otherwise answer concisely.\n\n{{input}}";

/// Top-level configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Prompt template; a chat line is bound to its single `{{variable}}`.
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Upper bound on a single tool run, in seconds.
    #[serde(default)]
    pub tool_timeout_secs: Option<u64>,
}

/// Backend provider configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Provider name (only "anthropic" is supported).
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Anthropic API key. Mutually exclusive with `oauth_token`.
    pub api_key: Option<String>,

    /// OAuth access token. Mutually exclusive with `api_key`.
    pub oauth_token: Option<String>,

    /// System prompt sent with every request.
    pub system: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            base_url: default_base_url(),
            api_key: None,
            oauth_token: None,
            system: None,
        }
    }
}

fn default_provider() -> String {
    "anthropic".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            prompt: default_prompt(),
            tool_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, or defaults if it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if config.backend.provider != "anthropic" {
            return Err(ConfigError::UnsupportedProvider(config.backend.provider));
        }
        Ok(config)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }

    /// Build the authentication from config, falling back to `env_key`
    /// (normally `ANTHROPIC_API_KEY`) when neither field is set.
    pub fn auth(&self, env_key: Option<String>) -> Result<AnthropicAuth, ConfigError> {
        match (&self.backend.api_key, &self.backend.oauth_token) {
            (Some(key), None) => Ok(AnthropicAuth::ApiKey(key.clone())),
            (None, Some(token)) => Ok(AnthropicAuth::OAuth(token.clone())),
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousAuth),
            (None, None) => env_key.map(AnthropicAuth::ApiKey).ok_or(ConfigError::MissingAuth),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("unsupported provider '{0}' (expected \"anthropic\")")]
    UnsupportedProvider(String),

    #[error(
        "authentication not configured: set backend.api_key, backend.oauth_token or ANTHROPIC_API_KEY"
    )]
    MissingAuth,

    #[error(
        "ambiguous authentication: set either backend.api_key OR backend.oauth_token, not both"
    )]
    AmbiguousAuth,
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::PromptTemplate;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.backend.model, "claude-sonnet-4-20250514");
        assert_eq!(config.prompt, DEFAULT_PROMPT);
        assert!(config.tool_timeout().is_none());
        assert!(config.backend.system.is_none());
    }

    #[test]
    fn default_prompt_binds_a_single_variable() {
        let template = PromptTemplate::from_template(DEFAULT_PROMPT).unwrap();
        assert_eq!(template.variables(), ["input"]);
    }

    #[test]
    fn parses_full_file() {
        let config = Config::parse(
            r#"
prompt = "Q: {{question}}"
tool_timeout_secs = 5

[backend]
model = "claude-haiku"
max_tokens = 512
api_key = "sk-ant-api01-test"
system = "Be brief."
"#,
        )
        .unwrap();

        assert_eq!(config.prompt, "Q: {{question}}");
        assert_eq!(config.tool_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.backend.max_tokens, 512);
        assert_eq!(config.backend.system.as_deref(), Some("Be brief."));
        assert!(matches!(config.auth(None), Ok(AnthropicAuth::ApiKey(_))));
    }

    #[test]
    fn auth_falls_back_to_env() {
        let config = Config::default();
        assert!(matches!(
            config.auth(Some("from-env".into())),
            Ok(AnthropicAuth::ApiKey(ref k)) if k == "from-env"
        ));
        assert!(matches!(config.auth(None), Err(ConfigError::MissingAuth)));
    }

    #[test]
    fn both_credentials_are_ambiguous() {
        let config = Config::parse(
            r#"
[backend]
api_key = "a"
oauth_token = "b"
"#,
        )
        .unwrap();
        assert!(matches!(config.auth(None), Err(ConfigError::AmbiguousAuth)));
    }

    #[test]
    fn rejects_other_providers() {
        let err = Config::parse("[backend]\nprovider = \"openai\"").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedProvider(ref p) if p == "openai"));
    }
}
