//! Unified, namespaced tool catalog built from the session registry.

use std::collections::HashSet;

use serde_json::json;

use crate::error::{Result, SwitchboardError};
use crate::schema::{self, ChatTool};
use crate::session::SessionRegistry;

/// Separator between the server name and the local tool name in a
/// namespaced tool identity. Server names may not contain it (enforced at
/// connect time), so splitting on the first occurrence is unambiguous.
pub const NAMESPACE_SEPARATOR: char = '_';

/// Compose the globally-unique tool identity for a (server, tool) pair.
pub fn namespaced_name(server: &str, tool: &str) -> String {
    format!("{server}{NAMESPACE_SEPARATOR}{tool}")
}

/// Split a namespaced tool name back into `(server, local)` on the first
/// separator occurrence.
pub fn split_namespaced(name: &str) -> Result<(&str, &str)> {
    name.split_once(NAMESPACE_SEPARATOR)
        .ok_or_else(|| SwitchboardError::InvalidToolName(name.to_string()))
}

/// The dialect-B tool list presented to the model on every turn.
///
/// Built once per connect cycle from an immutable registry snapshot and
/// read-only thereafter; order is servers in connection order, then each
/// server's tools in advertised order.
#[derive(Debug, Clone, Default)]
pub struct UnifiedToolCatalog {
    tools: Vec<ChatTool>,
}

impl UnifiedToolCatalog {
    /// Merge and translate every connected server's tool list.
    ///
    /// Fails with [`SwitchboardError::Configuration`] if two servers produce
    /// the same namespaced name.
    pub fn build(registry: &SessionRegistry) -> Result<Self> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for server in registry.server_names() {
            let descriptors = registry.tools(server).unwrap_or_default();
            for descriptor in descriptors {
                let name = namespaced_name(server, &descriptor.name);
                if !seen.insert(name.clone()) {
                    return Err(SwitchboardError::Configuration(format!(
                        "Duplicate namespaced tool name '{name}'"
                    )));
                }
                entries.push(json!({
                    "type": "function",
                    "function": {
                        "name": name,
                        "description": descriptor.description.clone().unwrap_or_default(),
                        "input_schema": descriptor.input_schema,
                    },
                }));
            }
        }

        Ok(Self {
            tools: schema::translate(&entries),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_tools(tools: Vec<ChatTool>) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &[ChatTool] {
        &self.tools
    }

    /// Namespaced tool names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.function.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
