//! Tool-related types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool definition exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name, unique across everything a client has connected.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool input.
    pub input_schema: Value,
}
