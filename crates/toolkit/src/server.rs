//! Toolkit server: a named, fixed collection of features.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::{Feature, ToolError, ToolSpec, validate_input};

/// A named group of features exposed together.
///
/// The feature set is fixed at construction. Cloning is cheap and shares the
/// underlying features.
#[derive(Clone)]
pub struct ToolkitServer {
    name: String,
    features: BTreeMap<String, Arc<dyn Feature>>,
}

impl ToolkitServer {
    /// Create a toolkit from its features.
    ///
    /// Fails with [`ToolError::DuplicateFeature`] if two features share a name.
    pub fn new(
        name: impl Into<String>,
        features: impl IntoIterator<Item = Arc<dyn Feature>>,
    ) -> Result<Self, ToolError> {
        let name = name.into();
        let mut map = BTreeMap::new();

        for feature in features {
            let feature_name = feature.name().to_string();
            if map.contains_key(&feature_name) {
                return Err(ToolError::DuplicateFeature {
                    toolkit: name,
                    feature: feature_name,
                });
            }
            map.insert(feature_name, feature);
        }

        Ok(Self {
            name,
            features: map,
        })
    }

    /// Toolkit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this toolkit owns a feature named `tool_name`.
    pub fn contains(&self, tool_name: &str) -> bool {
        self.features.contains_key(tool_name)
    }

    /// Feature names, sorted.
    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    /// Every owned feature's name paired with its spec.
    pub fn tool_map(&self) -> BTreeMap<String, ToolSpec> {
        self.features
            .iter()
            .map(|(name, feature)| (name.clone(), feature.spec()))
            .collect()
    }

    /// Specs of every owned feature, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.features.values().map(|f| f.spec()).collect()
    }

    /// Validate `tool_input` and run the named feature once.
    pub async fn use_tool(&self, tool_name: &str, tool_input: Value) -> Result<Value, ToolError> {
        let feature = self
            .features
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool {
                toolkit: self.name.clone(),
                tool: tool_name.to_string(),
            })?;

        validate_input(&feature.input_schema(), &tool_input).map_err(|reason| {
            ToolError::InvalidInput {
                tool: tool_name.to_string(),
                reason,
            }
        })?;

        debug!(toolkit = %self.name, tool = tool_name, "running feature");
        feature.run(tool_input).await
    }
}

impl std::fmt::Debug for ToolkitServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolkitServer")
            .field("name", &self.name)
            .field("features", &self.features.keys().collect::<Vec<_>>())
            .finish()
    }
}
