//! Registry of connected toolkits and the tools they own.

use std::collections::{BTreeMap, HashMap};

use toolkit::{ToolSpec, ToolkitServer};
use tracing::info;

use crate::{Error, Result};

/// Toolkits connected to one client.
///
/// Toolkit names are unique, and every tool name is owned by exactly one
/// toolkit, so a tool call resolves with a single lookup.
#[derive(Debug, Default)]
pub struct Registry {
    toolkits: BTreeMap<String, ToolkitServer>,
    tools: BTreeMap<String, ToolSpec>,
    owners: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a toolkit and index its tools.
    ///
    /// Nothing is registered if any check fails.
    pub fn connect(&mut self, toolkit: ToolkitServer) -> Result<()> {
        let name = toolkit.name().to_string();
        if self.toolkits.contains_key(&name) {
            return Err(Error::DuplicateToolkit { toolkit: name });
        }

        let tool_map = toolkit.tool_map();
        if let Some((tool, owner)) = tool_map
            .keys()
            .find_map(|tool| self.owners.get(tool).map(|owner| (tool, owner)))
        {
            return Err(Error::DuplicateToolName {
                tool: tool.clone(),
                toolkit: name,
                existing: owner.clone(),
            });
        }

        info!(toolkit = %name, tools = tool_map.len(), "toolkit connected");

        for (tool, spec) in tool_map {
            self.owners.insert(tool.clone(), name.clone());
            self.tools.insert(tool, spec);
        }
        self.toolkits.insert(name, toolkit);
        Ok(())
    }

    /// The toolkit owning `tool_name`.
    pub fn resolve(&self, tool_name: &str) -> Result<&ToolkitServer> {
        self.owners
            .get(tool_name)
            .and_then(|owner| self.toolkits.get(owner))
            .ok_or_else(|| Error::ToolkitNotFound {
                tool: tool_name.to_string(),
            })
    }

    /// A toolkit by name.
    pub fn toolkit(&self, name: &str) -> Option<&ToolkitServer> {
        self.toolkits.get(name)
    }

    /// Connected toolkits, sorted by name.
    pub fn toolkits(&self) -> impl Iterator<Item = &ToolkitServer> {
        self.toolkits.values()
    }

    /// Aggregate tool map across all toolkits.
    pub fn tool_map(&self) -> &BTreeMap<String, ToolSpec> {
        &self.tools
    }

    /// Every connected tool's spec, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.toolkits.is_empty()
    }
}
