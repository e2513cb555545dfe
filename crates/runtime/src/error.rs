use thiserror::Error;
use toolkit::ToolError;

use crate::model::ModelError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A toolkit with this name is already connected.
    #[error("toolkit already connected: {toolkit}")]
    DuplicateToolkit { toolkit: String },

    /// A tool of the incoming toolkit is already owned by another one.
    #[error("tool '{tool}' of toolkit '{toolkit}' is already provided by '{existing}'")]
    DuplicateToolName {
        tool: String,
        toolkit: String,
        existing: String,
    },

    /// No connected toolkit owns the requested tool.
    #[error("no connected toolkit provides tool '{tool}'")]
    ToolkitNotFound { tool: String },

    #[error("prompt error: {0}")]
    Prompt(String),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Storage(#[from] storage::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
