//! Launch specifications for tool-provider processes.

use crate::error::{Result, SwitchboardError};

/// Runtime that launches a tool-provider script.
///
/// The script's file extension is the source of truth: exactly two kinds
/// are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Python,
    Node,
}

impl ScriptKind {
    /// The interpreter executable for this kind.
    pub fn program(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Node => "node",
        }
    }
}

/// How to launch one tool-provider process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    script: String,
    kind: ScriptKind,
}

impl LaunchSpec {
    /// Build a launch spec from a script path.
    ///
    /// Fails with [`SwitchboardError::Configuration`] unless the path ends
    /// in `.py` or `.js`.
    pub fn from_script(script: impl Into<String>) -> Result<Self> {
        let script = script.into();
        let kind = if script.ends_with(".py") {
            ScriptKind::Python
        } else if script.ends_with(".js") {
            ScriptKind::Node
        } else {
            return Err(SwitchboardError::Configuration(format!(
                "Unsupported server script '{script}': expected a .py or .js file"
            )));
        };
        Ok(Self { script, kind })
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn kind(&self) -> ScriptKind {
        self.kind
    }

    /// Build the child-process command for this spec.
    pub fn command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(self.kind.program());
        command.arg(&self.script);
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_scripts_launch_under_python() {
        let spec = LaunchSpec::from_script("weather_server.py").unwrap();
        assert_eq!(spec.kind(), ScriptKind::Python);
        assert_eq!(spec.kind().program(), "python");
        assert_eq!(spec.script(), "weather_server.py");
    }

    #[test]
    fn js_scripts_launch_under_node() {
        let spec = LaunchSpec::from_script("server.js").unwrap();
        assert_eq!(spec.kind(), ScriptKind::Node);
        assert_eq!(spec.kind().program(), "node");
    }

    #[test]
    fn other_extensions_are_configuration_errors() {
        for script in ["server.sh", "server.rb", "server", "server.py.bak"] {
            let err = LaunchSpec::from_script(script).unwrap_err();
            assert!(
                matches!(err, SwitchboardError::Configuration(message) if message.contains(script))
            );
        }
    }
}
