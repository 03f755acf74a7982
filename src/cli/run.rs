//! The `heartbeat` run command.

use anyhow::{Context, Result};
use tracing::info;

use heartbeat::output::Console;
use heartbeat::signals;
use heartbeat::utils::PidFileGuard;
use heartbeat::HeartbeatService;

use super::Cli;

/// Run the heartbeat until it stops and return the process exit status.
pub(crate) async fn cmd_run(cli: Cli) -> Result<i32> {
    let config = cli.resolve(std::process::id())?;

    let pid_file = match &cli.pid_file {
        Some(path) => Some(
            PidFileGuard::acquire_at(path.clone())
                .with_context(|| format!("Failed to acquire PID file {}", path.display()))?,
        ),
        None => None,
    };

    // Listeners go in before the banner so anyone who saw it can signal us.
    let signal_rx = signals::listen(&config.signal_policy)
        .with_context(|| "Failed to install signal listeners")?;

    let mut service = HeartbeatService::new(config, Console);
    if let Some(seed) = cli.seed {
        service = service.with_seed(seed);
    }

    let outcome = service.run(signal_rx).await;
    drop(pid_file);

    let outcome = outcome.with_context(|| "Heartbeat stopped on error")?;
    info!(?outcome, "Heartbeat finished");
    Ok(outcome.exit_code())
}
