use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a toolkit while describing or running its features.
///
/// Serializable so a failure can be journaled or handed back to a model
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ToolError {
    /// The toolkit has no feature with this name.
    #[error("unknown tool '{tool}' in toolkit '{toolkit}'")]
    UnknownTool { toolkit: String, tool: String },

    /// The input did not match the feature's schema.
    #[error("invalid input for '{tool}': {reason}")]
    InvalidInput { tool: String, reason: String },

    /// Two features of one toolkit share a name.
    #[error("toolkit '{toolkit}' declares feature '{feature}' more than once")]
    DuplicateFeature { toolkit: String, feature: String },

    /// The feature did not finish in time.
    #[error("tool '{tool}' timed out after {millis}ms")]
    Timeout { tool: String, millis: u64 },

    /// The feature ran and failed.
    #[error("execution failed: {0}")]
    Execution(String),
}

impl ToolError {
    /// Shorthand for an execution failure.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}
