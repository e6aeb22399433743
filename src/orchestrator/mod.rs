//! Conversation orchestrator: drives the model-call / tool-call loop.

pub mod message;

pub use message::{ChatMessage, Role, ToolCallRequest};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::catalog::UnifiedToolCatalog;
use crate::dispatch::{Dispatcher, ToolInvocationRecord};
use crate::error::{Result, SwitchboardError};

/// What the model produced for one completion call: either a final answer
/// (`tool_calls` empty) or a set of requested tool calls.
#[derive(Debug, Clone, Default)]
pub struct ModelTurn {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ModelTurn {
    pub fn requests_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// The model-completion collaborator.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        catalog: &UnifiedToolCatalog,
    ) -> Result<ModelTurn>;
}

/// Orchestrator phase within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// No conversation has started yet.
    Idle,
    /// Ready for the next user message.
    AwaitingUserInput,
    /// A completion call is in flight.
    ModelRequested,
    /// Dispatching the model's requested tool calls.
    ResolvingTools,
}

/// Limits applied to every turn.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    /// Trailing-window size for history retention. The system message at
    /// position zero is always preserved regardless of the window.
    pub history_window: usize,
    /// Maximum tool-resolution rounds per turn before the turn fails with
    /// [`SwitchboardError::ResolutionLimitExceeded`].
    pub max_rounds: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            history_window: 20,
            max_rounds: 8,
        }
    }
}

/// What happened during one user turn.
#[derive(Debug, Clone)]
pub struct TurnReport {
    /// The model's final textual answer.
    pub text: String,
    /// Audit records appended during this turn, in dispatch order.
    pub invocations: Vec<ToolInvocationRecord>,
}

/// Drives one conversation over the unified catalog and dispatcher.
///
/// Each user turn is transactional: messages are staged in a scratch buffer
/// and committed to the shared history only when the turn completes; a
/// failed turn leaves the history exactly as it was.
pub struct Orchestrator {
    backend: Box<dyn CompletionBackend>,
    dispatcher: Dispatcher,
    catalog: UnifiedToolCatalog,
    settings: OrchestratorSettings,
    messages: Vec<ChatMessage>,
    phase: TurnPhase,
}

impl Orchestrator {
    pub fn new(
        backend: Box<dyn CompletionBackend>,
        dispatcher: Dispatcher,
        catalog: UnifiedToolCatalog,
        system_prompt: Option<String>,
    ) -> Self {
        let mut messages = Vec::new();
        if let Some(prompt) = system_prompt {
            messages.push(ChatMessage::system(prompt));
        }
        Self {
            backend,
            dispatcher,
            catalog,
            settings: OrchestratorSettings::default(),
            messages,
            phase: TurnPhase::Idle,
        }
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The committed conversation history.
    pub fn history(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn catalog(&self) -> &UnifiedToolCatalog {
        &self.catalog
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run one user turn to completion.
    ///
    /// Dispatcher-level failures (invalid name, unknown server, a tool
    /// reporting an error) are fed back to the model as failed tool results;
    /// anything else aborts and rolls back the turn.
    pub async fn user_turn(&mut self, text: impl Into<String>) -> Result<TurnReport> {
        let mut staged = self.messages.clone();
        truncate_history(&mut staged, self.settings.history_window);
        staged.push(ChatMessage::user(text));

        let mark = self.dispatcher.log().len();
        match self.resolve(&mut staged).await {
            Ok(text) => {
                self.messages = staged;
                self.phase = TurnPhase::AwaitingUserInput;
                Ok(TurnReport {
                    text,
                    invocations: self.dispatcher.log().since(mark),
                })
            }
            Err(e) => {
                // Staged messages are discarded; the committed history is
                // untouched and the conversation survives for the next turn.
                self.phase = TurnPhase::AwaitingUserInput;
                Err(e)
            }
        }
    }

    async fn resolve(&mut self, staged: &mut Vec<ChatMessage>) -> Result<String> {
        let mut round = 0;
        loop {
            self.phase = TurnPhase::ModelRequested;
            let turn = self.backend.complete(staged, &self.catalog).await?;

            if !turn.requests_tools() {
                staged.push(ChatMessage::assistant(turn.content.clone()));
                return Ok(turn.content);
            }

            if round >= self.settings.max_rounds {
                info!(rounds = round, "resolution limit exceeded");
                return Err(SwitchboardError::ResolutionLimitExceeded { rounds: round });
            }
            round += 1;

            self.phase = TurnPhase::ResolvingTools;
            debug!(round, calls = turn.tool_calls.len(), "resolving tool calls");
            let content = (!turn.content.is_empty()).then(|| turn.content.clone());
            staged.push(ChatMessage::assistant_tool_calls(
                content,
                turn.tool_calls.clone(),
            ));

            // Model-emitted order: each result is correlated by call id and
            // appended in the same sequence the calls were requested.
            for call in &turn.tool_calls {
                let content = match self.dispatcher.invoke(&call.name, call.arguments.clone()).await
                {
                    Ok(output) => payload_to_content(output),
                    Err(e) if e.is_tool_reportable() => format!("Tool call failed: {e}"),
                    Err(e) => return Err(e),
                };
                staged.push(ChatMessage::tool_result(&call.id, content));
            }
        }
    }
}

/// Truncate to the trailing window, always keeping a leading system message
/// at position zero.
fn truncate_history(messages: &mut Vec<ChatMessage>, window: usize) {
    if messages.len() <= window || window == 0 {
        return;
    }
    let leading_system = messages
        .first()
        .map(|m| m.role == Role::System)
        .unwrap_or(false);
    if leading_system {
        let keep_tail = window.saturating_sub(1);
        let drain_end = messages.len() - keep_tail;
        messages.drain(1..drain_end);
    } else {
        let drain_end = messages.len() - window;
        messages.drain(0..drain_end);
    }
}

/// Tool output is passed through unchanged; string payloads become the tool
/// message body directly, anything else is serialized compactly.
fn payload_to_content(output: serde_json::Value) -> String {
    match output {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}
