//! Configuration (layered: TOML file for servers and limits, env for
//! model credentials).

use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SwitchboardError};
use crate::orchestrator::OrchestratorSettings;
use crate::provider::OpenAiBackend;

/// One tool server to launch, in connection order.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Server name; becomes the tool namespace prefix.
    pub name: String,
    /// Path to the provider script (`.py` or `.js`).
    pub script: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Limits {
    pub history_window: usize,
    pub max_rounds: usize,
}

impl Default for Limits {
    fn default() -> Self {
        let defaults = OrchestratorSettings::default();
        Self {
            history_window: defaults.history_window,
            max_rounds: defaults.max_rounds,
        }
    }
}

/// Top-level switchboard configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SwitchboardConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
    #[serde(default)]
    pub limits: Limits,
}

fn default_system_prompt() -> String {
    "You are a helpful assistant. Use the available tools when they help answer the question."
        .to_string()
}

impl SwitchboardConfig {
    /// Parse and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SwitchboardError::Configuration(format!(
                "Cannot read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::parse(&text)
    }

    /// Parse and validate TOML config text.
    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| SwitchboardError::Configuration(format!("Invalid config file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(SwitchboardError::Configuration(
                "Config declares no servers".into(),
            ));
        }
        if self.limits.max_rounds == 0 {
            return Err(SwitchboardError::Configuration(
                "limits.max_rounds must be at least 1".into(),
            ));
        }
        if self.limits.history_window < 2 {
            return Err(SwitchboardError::Configuration(
                "limits.history_window must be at least 2".into(),
            ));
        }
        Ok(())
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            history_window: self.limits.history_window,
            max_rounds: self.limits.max_rounds,
        }
    }
}

/// Build a completion backend from environment variables.
///
/// Loads `.env` if present, then tries Azure OpenAI first
/// (`AZURE_OPENAI_API_KEY`, `AZURE_OPENAI_ENDPOINT`,
/// `AZURE_OPENAI_API_VERSION`, `AZURE_OPENAI_DEPLOYMENT_NAME`), falling
/// back to a plain OpenAI-compatible endpoint (`OPENAI_API_KEY`, optional
/// `OPENAI_BASE_URL` and `OPENAI_MODEL`).
pub fn backend_from_env() -> Result<OpenAiBackend> {
    let _ = dotenvy::dotenv();

    if let Ok(api_key) = std::env::var("AZURE_OPENAI_API_KEY") {
        let endpoint = require_env("AZURE_OPENAI_ENDPOINT")?;
        let api_version = require_env("AZURE_OPENAI_API_VERSION")?;
        let deployment = require_env("AZURE_OPENAI_DEPLOYMENT_NAME")?;
        return Ok(OpenAiBackend::azure(
            &endpoint,
            deployment,
            api_key,
            &api_version,
        ));
    }

    let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
        SwitchboardError::Configuration(
            "No model credentials: set AZURE_OPENAI_API_KEY or OPENAI_API_KEY".into(),
        )
    })?;
    let base_url =
        std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".into());
    Ok(OpenAiBackend::new(model, api_key, &base_url))
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| SwitchboardError::Configuration(format!("Missing environment variable {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_servers_in_declaration_order() {
        let config = SwitchboardConfig::parse(
            r#"
            system_prompt = "be terse"

            [[servers]]
            name = "WeatherServer"
            script = "servers/weather.py"

            [[servers]]
            name = "SQLServer"
            script = "servers/sql.js"
            "#,
        )
        .unwrap();

        assert_eq!(config.system_prompt, "be terse");
        let names: Vec<_> = config.servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["WeatherServer", "SQLServer"]);
        assert_eq!(config.servers[1].script, "servers/sql.js");
    }

    #[test]
    fn limits_default_when_absent() {
        let config = SwitchboardConfig::parse(
            r#"
            [[servers]]
            name = "A"
            script = "a.py"
            "#,
        )
        .unwrap();
        assert_eq!(config.limits, Limits::default());
        assert_eq!(config.limits.history_window, 20);
        assert_eq!(config.limits.max_rounds, 8);
    }

    #[test]
    fn empty_server_list_is_rejected() {
        let err = SwitchboardConfig::parse("system_prompt = \"hi\"").unwrap_err();
        assert!(matches!(err, SwitchboardError::Configuration(_)));
    }

    #[test]
    fn zero_max_rounds_is_rejected() {
        let err = SwitchboardConfig::parse(
            r#"
            [[servers]]
            name = "A"
            script = "a.py"

            [limits]
            max_rounds = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SwitchboardError::Configuration(m) if m.contains("max_rounds")));
    }

    #[test]
    fn malformed_toml_is_a_configuration_error() {
        let err = SwitchboardConfig::parse("[[servers").unwrap_err();
        assert!(matches!(err, SwitchboardError::Configuration(_)));
    }
}
