//! CLI error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The journal database does not exist yet.
    #[error("journal not found at {path}. Run 'armory chat' first")]
    JournalNotFound { path: PathBuf },

    #[error("no session found matching '{prefix}'")]
    SessionNotFound { prefix: String },

    /// The user should provide a longer prefix to disambiguate.
    #[error("multiple sessions match '{prefix}': {matches:?}")]
    AmbiguousSession {
        prefix: String,
        matches: Vec<String>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    #[error(transparent)]
    Toolkit(#[from] toolkit::ToolError),

    #[error(transparent)]
    Storage(#[from] storage::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
