//! Switchboard — a multi-server MCP tool orchestration engine.
//!
//! Launches MCP tool-provider subprocesses, merges their tool lists into a
//! single namespaced catalog in the Chat Completions dialect, and drives a
//! bounded model/tool resolution loop over any OpenAI-compatible endpoint.
//! Every tool invocation is recorded in an append-only audit log.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use switchboard::catalog::UnifiedToolCatalog;
//! use switchboard::dispatch::Dispatcher;
//! use switchboard::orchestrator::Orchestrator;
//! use switchboard::provider::OpenAiBackend;
//! use switchboard::session::SessionRegistry;
//!
//! # async fn run() -> switchboard::Result<()> {
//! let mut registry = SessionRegistry::new();
//! registry.connect("WeatherServer", "servers/weather.py").await?;
//! let registry = Arc::new(registry);
//!
//! let catalog = UnifiedToolCatalog::build(&registry)?;
//! let backend = OpenAiBackend::new("gpt-4o", "sk-...", "https://api.openai.com/v1");
//! let mut orchestrator = Orchestrator::new(
//!     Box::new(backend),
//!     Dispatcher::new(Arc::clone(&registry)),
//!     catalog,
//!     Some("You are a helpful assistant.".into()),
//! );
//!
//! let report = orchestrator.user_turn("What's the weather in Beijing?").await?;
//! println!("{}", report.text);
//! registry.close_all().await;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod schema;
pub mod session;

pub use error::{Result, SwitchboardError};
