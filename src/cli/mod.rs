//! Command-line surface.

mod run;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use heartbeat::config::{FileConfig, HeartbeatConfig, Variant};
use heartbeat::entropy::EntropyEcho;
use heartbeat::heartbeat::ErrorFormula;
use heartbeat::signals::SignalPolicy;
use heartbeat::utils::parse_interval;

pub(crate) use run::cmd_run;

#[derive(Parser, Debug)]
#[command(name = "heartbeat", version)]
#[command(about = "Emit jittered log and error lines until signalled", long_about = None)]
pub(crate) struct Cli {
    /// Payload written by every log tick ("undefined" when absent)
    #[arg(env = "HEARTBEAT_MESSAGE")]
    pub message: Option<String>,

    /// Preset: quiet, listen or full
    #[arg(long, env = "HEARTBEAT_VARIANT")]
    pub variant: Option<Variant>,

    /// Error tick formula: offset (10000 + U*5) or scaled ((1000 + U)*5)
    #[arg(long, value_name = "FORMULA")]
    pub error_formula: Option<ErrorFormula>,

    /// Signal rule such as SIGTERM=exit:4 or SIGUSR1=ack (repeatable)
    #[arg(long = "signal", value_name = "NAME=ACTION")]
    pub signals: Vec<String>,

    /// Install no signal listeners at all
    #[arg(long, conflicts_with = "signals")]
    pub no_signals: bool,

    /// Run the one-shot entropy echo
    #[arg(long, conflicts_with = "no_entropy_echo")]
    pub entropy_echo: bool,

    /// Skip the one-shot entropy echo
    #[arg(long)]
    pub no_entropy_echo: bool,

    /// Shell command supplying the entropy bytes
    #[arg(long, value_name = "CMD")]
    pub entropy_command: Option<String>,

    /// Fire ticks without writing their lines
    #[arg(long)]
    pub silent: bool,

    /// JSON config file layered over the preset
    #[arg(long, env = "HEARTBEAT_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the process id here while running
    #[arg(long, env = "HEARTBEAT_PID_FILE", value_name = "FILE")]
    pub pid_file: Option<PathBuf>,

    /// Stop cleanly after this long (e.g. 1500ms, 30s, 2m)
    #[arg(long, value_name = "INTERVAL", value_parser = parse_run_for)]
    pub run_for: Option<Duration>,

    /// Seed for the jitter generator
    #[arg(long)]
    pub seed: Option<u64>,
}

fn parse_run_for(s: &str) -> std::result::Result<Duration, String> {
    parse_interval(s).map_err(|e| e.to_string())
}

impl Cli {
    /// Layer preset, config file and flags into the final configuration.
    pub(crate) fn resolve(&self, process_id: u32) -> Result<HeartbeatConfig> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => FileConfig::default(),
        };

        let variant = self.variant.or(file.variant).unwrap_or_default();
        let mut config = HeartbeatConfig::for_variant(variant, process_id);
        file.apply(&mut config)
            .with_context(|| "Invalid config file contents")?;

        if let Some(message) = &self.message {
            config.message = message.clone();
        }
        if let Some(formula) = self.error_formula {
            config.error_tick = formula.schedule();
        }
        if self.no_signals {
            config.signal_policy = SignalPolicy::new();
        }
        for rule in &self.signals {
            config
                .signal_policy
                .apply_rule(rule)
                .with_context(|| format!("Invalid --signal rule '{}'", rule))?;
        }
        if let Some(command) = &self.entropy_command {
            config
                .entropy_echo
                .get_or_insert_with(EntropyEcho::default)
                .command = command.clone();
        }
        if self.entropy_echo && config.entropy_echo.is_none() {
            config.entropy_echo = Some(EntropyEcho::default());
        }
        if self.no_entropy_echo {
            config.entropy_echo = None;
        }
        if self.silent {
            config.emit_ticks = false;
        }
        if self.run_for.is_some() {
            config.run_for = self.run_for;
        }

        Ok(config)
    }
}
