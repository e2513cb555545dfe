//! Journal event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identifies one client session in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// A chat message entered or left the client.
    Message { role: Role, content: String },
    /// A tool call was dispatched to a toolkit.
    ToolCall {
        toolkit: String,
        name: String,
        input: Value,
    },
    /// A dispatched tool returned.
    ToolResult { name: String, output: Value },
    SessionStart,
    SessionEnd,
}

impl EventKind {
    /// Stable name stored alongside the payload, used for filtering.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::SessionStart => "session_start",
            Self::SessionEnd => "session_end",
        }
    }
}

/// One journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

impl Event {
    pub fn new(session_id: SessionId, kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn message(session_id: SessionId, role: Role, content: impl Into<String>) -> Self {
        Self::new(
            session_id,
            EventKind::Message {
                role,
                content: content.into(),
            },
        )
    }

    pub fn tool_call(
        session_id: SessionId,
        toolkit: impl Into<String>,
        name: impl Into<String>,
        input: Value,
    ) -> Self {
        Self::new(
            session_id,
            EventKind::ToolCall {
                toolkit: toolkit.into(),
                name: name.into(),
                input,
            },
        )
    }

    pub fn tool_result(session_id: SessionId, name: impl Into<String>, output: Value) -> Self {
        Self::new(
            session_id,
            EventKind::ToolResult {
                name: name.into(),
                output,
            },
        )
    }
}
