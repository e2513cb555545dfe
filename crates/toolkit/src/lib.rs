//! Toolkits: named groups of schema-described features.
//!
//! A [`Feature`] is one capability the model can invoke. A [`ToolkitServer`]
//! owns a fixed set of features, advertises their [`ToolSpec`]s, and runs one
//! by name after validating the input against its schema.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use toolkit::{Feature, FnFeature, ToolkitServer};
//!
//! # async fn example() -> Result<(), toolkit::ToolError> {
//! let search: Arc<dyn Feature> = Arc::new(FnFeature::new(
//!     "search",
//!     "Search the web",
//!     json!({"type": "object", "properties": {"q": {"type": "string"}}, "required": ["q"]}),
//!     |input| Ok(json!(format!("results for {}", input["q"]))),
//! ));
//!
//! let web = ToolkitServer::new("web", [search])?;
//! let output = web.use_tool("search", json!({"q": "rust"})).await?;
//! # Ok(())
//! # }
//! ```

pub mod errors;
mod feature;
mod schema;
mod server;
mod types;

pub use errors::ToolError;
pub use feature::{Feature, FnFeature};
pub use schema::validate_input;
pub use server::ToolkitServer;
pub use types::ToolSpec;
