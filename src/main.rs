use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{cmd_run, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Diagnostics go to stderr; stdout carries the heartbeat lines.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = cmd_run(cli).await?;

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
