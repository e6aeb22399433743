//! Switchboard CLI binary entry point.

use clap::Parser;
use switchboard::cli::Cli;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("switchboard=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = switchboard::cli::run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
