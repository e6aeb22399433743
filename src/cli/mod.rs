//! Interactive chat front-end over a set of configured tool servers.

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use crate::catalog::UnifiedToolCatalog;
use crate::config::{self, SwitchboardConfig};
use crate::dispatch::{Dispatcher, InvocationOutcome, ToolInvocationRecord};
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use crate::session::SessionRegistry;

/// Multi-server MCP tool switchboard
#[derive(Parser, Debug)]
#[command(name = "switchboard", version, about)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "switchboard.toml")]
    pub config: String,

    /// Show per-turn tool invocations
    #[arg(long)]
    pub show_invocations: bool,
}

/// Connect every configured server, run the REPL, then shut everything down.
///
/// Startup is fail-fast: if any server refuses to connect or list its
/// tools, nothing runs and already-open sessions are closed.
pub async fn run(cli: Cli) -> Result<()> {
    let config = SwitchboardConfig::load(&cli.config)?;
    let backend = config::backend_from_env()?;

    let mut registry = SessionRegistry::new();
    for server in &config.servers {
        if let Err(e) = registry.connect(&server.name, &server.script).await {
            registry.close_all().await;
            return Err(e);
        }
    }
    let registry = Arc::new(registry);

    let catalog = match UnifiedToolCatalog::build(&registry) {
        Ok(catalog) => catalog,
        Err(e) => {
            registry.close_all().await;
            return Err(e);
        }
    };

    info!(servers = registry.len(), tools = catalog.len(), "switchboard ready");
    print_banner(&registry, &catalog);

    let dispatcher = Dispatcher::new(Arc::clone(&registry));
    let mut orchestrator = Orchestrator::new(
        Box::new(backend),
        dispatcher,
        catalog,
        Some(config.system_prompt.clone()),
    )
    .with_settings(config.orchestrator_settings());

    let result = repl(&mut orchestrator, cli.show_invocations).await;
    registry.close_all().await;
    result
}

async fn repl(orchestrator: &mut Orchestrator, show_invocations: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
        };

        let Some(line) = line else {
            return Ok(());
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            return Ok(());
        }

        match orchestrator.user_turn(line).await {
            Ok(report) => {
                println!("\nAssistant: {}", report.text);
                if show_invocations {
                    print_invocations(&report.invocations);
                }
            }
            Err(e) => eprintln!("\nError: {e}"),
        }
    }
}

fn print_banner(registry: &SessionRegistry, catalog: &UnifiedToolCatalog) {
    println!("Connected servers:");
    for server in registry.server_names() {
        let tools = registry
            .tools(server)
            .map(|t| {
                t.iter()
                    .map(|d| d.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        println!("  {server}: {tools}");
    }
    println!("{} tools available. Type 'quit' to exit.", catalog.len());
}

fn print_invocations(records: &[ToolInvocationRecord]) {
    for record in records {
        match &record.outcome {
            InvocationOutcome::Output(value) => {
                println!("  [{}] {} {} -> {}", record.seq, record.tool, record.args, value)
            }
            InvocationOutcome::Failed(message) => {
                println!("  [{}] {} {} !! {}", record.seq, record.tool, record.args, message)
            }
        }
    }
}
