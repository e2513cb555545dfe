use thiserror::Error;

/// Errors from LLM provider calls.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// A network error occurred during the API call.
    #[error("network: {0}")]
    Network(String),

    /// The LLM provider returned an error response.
    #[error("provider api: {0}")]
    Api(String),

    /// The provider response could not be parsed or made no sense.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}
