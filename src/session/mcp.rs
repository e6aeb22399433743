//! MCP session over a child-process stdio transport.

use async_trait::async_trait;
use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, ClientInfo, Content, JsonObject, ProtocolVersion,
        ResourceContents,
    },
    service::{ClientInitializeError, DynService, RoleClient, RunningService, ServiceError, ServiceExt},
    transport::TokioChildProcess,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SwitchboardError};

use super::launch::LaunchSpec;

type DynClientService = Box<dyn DynService<RoleClient>>;
pub type RunningMcpService = RunningService<RoleClient, DynClientService>;

/// One capability advertised by a tool-provider session.
///
/// Immutable once fetched; the `input_schema` is the raw dialect-A JSON
/// Schema object the server declared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: serde_json::Value,
}

/// A connected, initialized tool-provider session.
///
/// The seam the registry and dispatcher work against; `McpSession` is the
/// production implementation, tests substitute mocks.
#[async_trait]
pub trait ToolSession: Send {
    /// List the tools this session advertises.
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>>;

    /// Execute one tool by its local name.
    async fn call_tool(&mut self, name: &str, arguments: serde_json::Value)
        -> Result<serde_json::Value>;

    /// Release the session's resources. Idempotent.
    async fn shutdown(&mut self) -> Result<()>;
}

/// Session backed by an rmcp child-process transport.
pub struct McpSession {
    server: String,
    session: Option<RunningMcpService>,
}

impl McpSession {
    /// Spawn the tool-provider process and complete the initialize handshake.
    pub async fn connect(server: &str, spec: &LaunchSpec) -> Result<Self> {
        debug!(server, script = spec.script(), "connecting MCP server");

        let transport = TokioChildProcess::new(spec.command())
            .map_err(|e| SwitchboardError::session(server, format!("spawn failed: {e}")))?;

        let client_info = ClientInfo {
            protocol_version: ProtocolVersion::LATEST,
            ..Default::default()
        };
        let session = client_info
            .into_dyn()
            .serve(transport)
            .await
            .map_err(|e| map_initialize_error(server, e))?;

        Ok(Self {
            server: server.to_string(),
            session: Some(session),
        })
    }

    fn session_mut(&mut self) -> Result<&mut RunningMcpService> {
        self.session
            .as_mut()
            .ok_or_else(|| SwitchboardError::session(&self.server, "session is closed"))
    }
}

#[async_trait]
impl ToolSession for McpSession {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>> {
        let server = self.server.clone();
        let session = self.session_mut()?;

        let tools = match session.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => {
                // Some servers reject paginated listing; fall back to a
                // single unpaginated page.
                session
                    .list_tools(None)
                    .await
                    .map(|page| page.tools)
                    .map_err(|e| map_service_error(&server, "list_tools", e))?
            }
            Err(e) => return Err(map_service_error(&server, "list_tools", e)),
        };

        Ok(tools
            .into_iter()
            .map(|tool| ToolDescriptor {
                name: tool.name.to_string(),
                description: tool.description.map(|d| d.to_string()),
                input_schema: serde_json::Value::Object((*tool.input_schema).clone()),
            })
            .collect())
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let server = self.server.clone();
        let arguments = coerce_tool_arguments(arguments)?;
        let session = self.session_mut()?;

        let result = session
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments,
                task: None,
            })
            .await
            .map_err(|e| map_service_error(&server, "call_tool", e))?;

        map_call_result(name, result)
    }

    async fn shutdown(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            debug!(server = %self.server, "closing MCP session");
            if let Err(e) = session.cancel().await {
                warn!(server = %self.server, error = %e, "MCP session cancel failed");
            }
        }
        Ok(())
    }
}

fn coerce_tool_arguments(value: serde_json::Value) -> Result<Option<JsonObject>> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) => Ok(Some(map)),
        serde_json::Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let parsed: serde_json::Value = serde_json::from_str(trimmed)?;
            coerce_tool_arguments(parsed)
        }
        other => Err(SwitchboardError::Configuration(format!(
            "Tool arguments must be a JSON object; got {other}"
        ))),
    }
}

fn extract_text_content(content: &[Content]) -> Option<String> {
    let mut lines = Vec::new();
    for item in content {
        if let Some(text) = item.as_text() {
            lines.push(text.text.clone());
            continue;
        }
        if let Some(resource) = item.as_resource() {
            if let ResourceContents::TextResourceContents { text, .. } = &resource.resource {
                lines.push(text.clone());
            }
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Flatten a call result into the raw payload passed back to the model:
/// structured content when present, else joined text, else the content array.
fn map_call_result(name: &str, result: CallToolResult) -> Result<serde_json::Value> {
    let text_content = extract_text_content(&result.content);

    if result.is_error.unwrap_or(false) {
        let message = result
            .structured_content
            .as_ref()
            .map(|v| v.to_string())
            .or_else(|| text_content.clone())
            .unwrap_or_else(|| "tool returned an error result".into());

        return Err(SwitchboardError::ToolExecution {
            tool_name: name.to_string(),
            message,
        });
    }

    if let Some(structured) = result.structured_content {
        return Ok(structured);
    }
    if let Some(text) = text_content {
        return Ok(serde_json::Value::String(text));
    }
    Ok(serde_json::Value::Array(
        result
            .content
            .iter()
            .filter_map(|item| serde_json::to_value(item).ok())
            .collect(),
    ))
}

fn map_initialize_error(server: &str, error: ClientInitializeError) -> SwitchboardError {
    match error {
        ClientInitializeError::ConnectionClosed(context) => {
            SwitchboardError::session(server, format!("initialize connection closed: {context}"))
        }
        ClientInitializeError::TransportError { error, context } => SwitchboardError::session(
            server,
            format!("initialize transport error ({context}): {error}"),
        ),
        ClientInitializeError::JsonRpcError(error) => SwitchboardError::session(
            server,
            format!("initialize JSON-RPC error {}: {}", error.code.0, error.message),
        ),
        ClientInitializeError::Cancelled => {
            SwitchboardError::session(server, "initialize cancelled")
        }
        other => SwitchboardError::session(server, format!("initialize error: {other}")),
    }
}

fn map_service_error(server: &str, context: &str, error: ServiceError) -> SwitchboardError {
    match error {
        ServiceError::McpError(error) => SwitchboardError::session(
            server,
            format!("{context}: MCP error {}: {}", error.code.0, error.message),
        ),
        ServiceError::TransportSend(error) => {
            SwitchboardError::session(server, format!("{context}: transport send failed: {error}"))
        }
        ServiceError::TransportClosed => {
            SwitchboardError::session(server, format!("{context}: transport closed"))
        }
        ServiceError::UnexpectedResponse => {
            SwitchboardError::session(server, format!("{context}: unexpected MCP response"))
        }
        ServiceError::Cancelled { reason } => {
            let suffix = reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            SwitchboardError::session(server, format!("{context}: request cancelled{suffix}"))
        }
        ServiceError::Timeout { timeout } => SwitchboardError::session(
            server,
            format!("{context}: timed out after {}ms", timeout.as_millis()),
        ),
        other => SwitchboardError::session(server, format!("{context}: MCP service error: {other}")),
    }
}
