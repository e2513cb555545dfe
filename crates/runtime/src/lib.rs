//! Armory runtime: drive a language model and dispatch its tool calls.
//!
//! # Overview
//!
//! - **Client**: runs one chat turn at a time. The model either answers, or
//!   asks for a tool; the client finds the toolkit owning that tool and runs
//!   it once.
//! - **Registry**: connected toolkits, with globally unique tool names.
//! - **Pipeline**: prompt template, model call with bound tools, output
//!   parsing. [`LlmPipeline`] composes these over any [`Backend`].
//! - **Backend**: LLM provider abstraction; [`AnthropicBackend`] ships here.
//!
//! # Example
//!
//! ```ignore
//! use runtime::{AnthropicAuth, AnthropicBackend, Client, Reply};
//!
//! # async fn example(web: toolkit::ToolkitServer) -> runtime::Result<()> {
//! let auth = AnthropicAuth::ApiKey("sk-ant-api01-...".into());
//! let backend = AnthropicBackend::builder(auth, "claude-sonnet-4-20250514").build();
//!
//! let mut client = Client::from_backend("Help the user: {{input}}", backend)?;
//! client.connect(web)?;
//!
//! match client.chat("search for rust async traits").await? {
//!     Reply::Chat { return_values } => println!("{}", return_values["output"]),
//!     Reply::Tool { tool_name, tool_output, .. } => println!("{tool_name}: {tool_output}"),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod model;
mod pipeline;
mod prompt;
mod providers;
mod registry;

pub use client::{Client, Reply};
pub use error::{Error, Result};
pub use model::{Backend, Message, ModelError, ModelRequest, ModelResponse, ToolCall};
pub use pipeline::{AgentStep, LlmPipeline, Pipeline, parse_step};
pub use prompt::{ChatInput, PromptTemplate};
pub use providers::{
    AnthropicAuth, AnthropicBackend, AnthropicBackendBuilder, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS,
};
pub use registry::Registry;
