//! Error types for switchboard.

use thiserror::Error;

/// Primary error type for all switchboard operations.
#[derive(Error, Debug)]
pub enum SwitchboardError {
    /// Malformed operator configuration. Fatal at startup, before any
    /// conversation begins.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A server failed its handshake or catalog listing. Startup aborts
    /// rather than running with a partial catalog.
    #[error("Session error ({server}): {message}")]
    Session { server: String, message: String },

    /// A namespaced tool name carried no separator.
    #[error("Invalid tool name: {0}")]
    InvalidToolName(String),

    /// The server prefix of a namespaced tool name is not registered.
    #[error("Unknown server: {0}")]
    UnknownServer(String),

    /// The model kept requesting tool calls past the configured bound.
    #[error("Resolution limit exceeded after {rounds} rounds")]
    ResolutionLimitExceeded { rounds: usize },

    /// A tool ran and reported failure.
    #[error("Tool execution error: {tool_name} - {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SwitchboardError {
    /// Create a session error for a named server.
    pub fn session(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Session {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Whether the dispatcher may report this error back into the
    /// conversation as a failed tool result instead of aborting the turn.
    pub fn is_tool_reportable(&self) -> bool {
        matches!(
            self,
            Self::InvalidToolName(_) | Self::UnknownServer(_) | Self::ToolExecution { .. }
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SwitchboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatcher_level_errors_are_tool_reportable() {
        assert!(SwitchboardError::InvalidToolName("noseparator".into()).is_tool_reportable());
        assert!(SwitchboardError::UnknownServer("Ghost".into()).is_tool_reportable());
        assert!(SwitchboardError::ToolExecution {
            tool_name: "WeatherServer_query_weather".into(),
            message: "upstream failure".into(),
        }
        .is_tool_reportable());
    }

    #[test]
    fn fatal_errors_are_not_tool_reportable() {
        assert!(!SwitchboardError::Configuration("bad spec".into()).is_tool_reportable());
        assert!(!SwitchboardError::session("SQLServer", "handshake failed").is_tool_reportable());
        assert!(!SwitchboardError::ResolutionLimitExceeded { rounds: 8 }.is_tool_reportable());
    }

    #[test]
    fn display_includes_server_name() {
        let err = SwitchboardError::session("WeatherServer", "listTools failed");
        let text = err.to_string();
        assert!(text.contains("WeatherServer"));
        assert!(text.contains("listTools failed"));
    }
}
