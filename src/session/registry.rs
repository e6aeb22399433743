//! Registry of connected tool-provider sessions.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::catalog::NAMESPACE_SEPARATOR;
use crate::error::{Result, SwitchboardError};

use super::launch::LaunchSpec;
use super::mcp::{McpSession, ToolDescriptor, ToolSession};

struct ServerEntry {
    name: String,
    descriptors: Vec<ToolDescriptor>,
    // One in-flight call per session: the transport framing is not safe to
    // interleave.
    session: Mutex<Option<Box<dyn ToolSession>>>,
}

/// Owns every active tool-provider session for its lifetime.
///
/// Sessions are acquired in connection order and released in reverse order
/// by [`close_all`](Self::close_all); a session is never reachable after it
/// has been released.
#[derive(Default)]
pub struct SessionRegistry {
    entries: Vec<ServerEntry>,
    index: HashMap<String, usize>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launch a tool-provider script, complete the handshake, and list its
    /// tools. On any failure nothing is retained for this server.
    pub async fn connect(&mut self, name: &str, script: &str) -> Result<()> {
        self.validate_name(name)?;
        let spec = LaunchSpec::from_script(script)?;
        let session = McpSession::connect(name, &spec).await?;
        self.attach(name, Box::new(session)).await
    }

    /// Register an already-connected session under a server name.
    ///
    /// Lists the session's tools as part of registration; a session whose
    /// listing fails is shut down and never retained.
    pub async fn attach(&mut self, name: &str, mut session: Box<dyn ToolSession>) -> Result<()> {
        self.validate_name(name)?;

        let descriptors = match session.list_tools().await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                if let Err(close_err) = session.shutdown().await {
                    warn!(server = name, error = %close_err, "shutdown after failed listing");
                }
                return Err(e);
            }
        };

        info!(server = name, tools = descriptors.len(), "server connected");

        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push(ServerEntry {
            name: name.to_string(),
            descriptors,
            session: Mutex::new(Some(session)),
        });
        Ok(())
    }

    fn validate_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(SwitchboardError::Configuration(
                "Server name must not be empty".into(),
            ));
        }
        if name.contains(NAMESPACE_SEPARATOR) {
            // The namespaced tool name is split on the first separator, so a
            // separator inside a server name would make routing ambiguous.
            return Err(SwitchboardError::Configuration(format!(
                "Server name '{name}' contains the reserved separator '{NAMESPACE_SEPARATOR}'"
            )));
        }
        if self.index.contains_key(name) {
            return Err(SwitchboardError::Configuration(format!(
                "Duplicate server name '{name}'"
            )));
        }
        Ok(())
    }

    /// Server names in connection order.
    pub fn server_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Whether a server name is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// The tool descriptors a server advertised at connect time.
    pub fn tools(&self, name: &str) -> Option<&[ToolDescriptor]> {
        self.index
            .get(name)
            .map(|&i| self.entries[i].descriptors.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forward a call to one server's session.
    ///
    /// The session lock is held for the duration of the call, so two calls
    /// to the same server never interleave; calls to different servers may.
    pub async fn call(
        &self,
        server: &str,
        tool: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let entry = self
            .index
            .get(server)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| SwitchboardError::UnknownServer(server.to_string()))?;

        let mut guard = entry.session.lock().await;
        let session = guard
            .as_mut()
            .ok_or_else(|| SwitchboardError::session(server, "session has been closed"))?;
        session.call_tool(tool, arguments).await
    }

    /// Release every session in reverse-acquisition order. Idempotent; safe
    /// to call from any shutdown path.
    pub async fn close_all(&self) {
        for entry in self.entries.iter().rev() {
            let mut guard = entry.session.lock().await;
            if let Some(mut session) = guard.take() {
                if let Err(e) = session.shutdown().await {
                    warn!(server = %entry.name, error = %e, "session shutdown failed");
                }
            }
        }
    }
}
