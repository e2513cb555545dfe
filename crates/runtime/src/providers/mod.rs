//! LLM provider adapters.
//!
//! Each provider implements [`Backend`](crate::model::Backend) for its API.

mod anthropic;

pub use anthropic::{
    AnthropicAuth, AnthropicBackend, AnthropicBackendBuilder, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS,
};
