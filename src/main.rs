use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use shadow::cli::Cli;
use shadow::dispatcher;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    dispatcher::dispatch(cli).await
}
