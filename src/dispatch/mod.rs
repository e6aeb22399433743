//! Namespaced tool dispatch and the invocation audit log.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::debug;

use crate::catalog::split_namespaced;
use crate::error::{Result, SwitchboardError};
use crate::session::SessionRegistry;

/// Outcome captured in an audit record.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum InvocationOutcome {
    Output(serde_json::Value),
    Failed(String),
}

/// One audit entry. Never mutated after creation; sequence numbers increase
/// monotonically for the lifetime of the process.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolInvocationRecord {
    pub seq: u64,
    pub tool: String,
    pub args: serde_json::Value,
    pub outcome: InvocationOutcome,
}

/// Append-only record of every dispatched tool call.
///
/// Consumed observationally (per-turn reports); never influences control
/// flow. Failed turns are not rolled back here: calls that fired are facts.
#[derive(Debug, Default, Clone)]
pub struct InvocationLog {
    records: Arc<Mutex<Vec<ToolInvocationRecord>>>,
}

impl InvocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records appended after the given mark, in append order.
    pub fn since(&self, mark: usize) -> Vec<ToolInvocationRecord> {
        self.records().iter().skip(mark).cloned().collect()
    }

    fn record(&self, tool: &str, args: &serde_json::Value, outcome: InvocationOutcome) {
        let mut records = self.records();
        let seq = records.len() as u64 + 1;
        records.push(ToolInvocationRecord {
            seq,
            tool: tool.to_string(),
            args: args.clone(),
            outcome,
        });
    }

    fn records(&self) -> std::sync::MutexGuard<'_, Vec<ToolInvocationRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Routes namespaced tool invocations to the owning session.
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    log: InvocationLog,
}

impl Dispatcher {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            log: InvocationLog::new(),
        }
    }

    pub fn log(&self) -> &InvocationLog {
        &self.log
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Resolve a namespaced name to `(server, local)`, execute the call, and
    /// append exactly one audit record whether or not it succeeded.
    ///
    /// Returns the raw result payload untranslated; tool output is passed
    /// through to the model unchanged.
    pub async fn invoke(
        &self,
        namespaced: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let result = self.route(namespaced, args.clone()).await;

        match &result {
            Ok(output) => {
                debug!(tool = namespaced, "tool call succeeded");
                self.log
                    .record(namespaced, &args, InvocationOutcome::Output(output.clone()));
            }
            Err(e) => {
                debug!(tool = namespaced, error = %e, "tool call failed");
                self.log
                    .record(namespaced, &args, InvocationOutcome::Failed(e.to_string()));
            }
        }

        result
    }

    async fn route(&self, namespaced: &str, args: serde_json::Value) -> Result<serde_json::Value> {
        let (server, local) = split_namespaced(namespaced)?;
        if !self.registry.is_registered(server) {
            return Err(SwitchboardError::UnknownServer(server.to_string()));
        }
        self.registry.call(server, local, args).await
    }
}
