//! Heartbeat configuration
//!
//! [`HeartbeatConfig`] is assembled once at startup and handed to the service
//! by value; nothing reads the process id or arguments ambiently after that.
//! Layering, lowest to highest precedence:
//!
//! 1. a [`Variant`] preset,
//! 2. an optional JSON [`FileConfig`],
//! 3. CLI flags (applied by the binary).

mod variant;

pub use variant::Variant;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::entropy::EntropyEcho;
use crate::error::{HeartbeatError, Result};
use crate::heartbeat::{ErrorFormula, TickKind, TickSchedule};
use crate::signals::{SignalAction, SignalName, SignalPolicy};
use crate::utils::parse_interval;

/// Placeholder log payload when no message argument is given.
pub const UNDEFINED_MESSAGE: &str = "undefined";

/// Fixed payload of the error tick.
pub const ERROR_MESSAGE: &str = "error message";

// ============================================================================
// HeartbeatConfig
// ============================================================================

/// Everything the heartbeat loop needs, captured at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Process id stamped on every line.
    pub process_id: u32,
    /// Log tick payload.
    pub message: String,
    pub log_tick: TickSchedule,
    pub error_tick: TickSchedule,
    pub signal_policy: SignalPolicy,
    /// One-shot echo; `None` disables it.
    pub entropy_echo: Option<EntropyEcho>,
    /// When false, ticks still fire and re-arm but write nothing.
    pub emit_ticks: bool,
    /// Stop cleanly after this long. `None` runs until killed.
    pub run_for: Option<Duration>,
}

impl HeartbeatConfig {
    /// Build the preset for `variant`.
    pub fn for_variant(variant: Variant, process_id: u32) -> Self {
        Self {
            process_id,
            message: UNDEFINED_MESSAGE.to_string(),
            log_tick: TickSchedule::LOG,
            error_tick: ErrorFormula::default().schedule(),
            signal_policy: variant.signal_policy(),
            entropy_echo: variant.entropy_echo(),
            emit_ticks: variant.emits_ticks(),
            run_for: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Startup banner, printed before any tick output.
    pub fn banner(&self) -> String {
        format!("Started heartbeat with pid {}\n", self.process_id)
    }

    /// Line written when a tick of `kind` fires.
    pub fn line_for(&self, kind: TickKind) -> String {
        match kind {
            TickKind::Log => format!("{} {}\n", self.process_id, self.message),
            TickKind::Error => format!("{} {}\n", self.process_id, ERROR_MESSAGE),
        }
    }
}

// ============================================================================
// FileConfig
// ============================================================================

/// JSON config file. Every field is optional and overrides the preset.
///
/// ```json
/// {
///   "variant": "listen",
///   "message": "hello",
///   "error_formula": "scaled",
///   "signals": { "SIGTERM": "exit:4", "SIGUSR1": "ack" },
///   "run_for": "30s"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub variant: Option<Variant>,
    pub message: Option<String>,
    pub error_formula: Option<ErrorFormula>,
    /// Per-field overrides merged onto the preset; they win over `error_formula`.
    pub log_tick: Option<TickOverride>,
    pub error_tick: Option<TickOverride>,
    /// Replaces the preset's signal table entirely.
    pub signals: Option<BTreeMap<String, String>>,
    pub emit_ticks: Option<bool>,
    pub entropy_echo: Option<bool>,
    pub entropy_command: Option<String>,
    pub run_for: Option<String>,
}

/// Partial tick schedule from a config file.
///
/// Only the fields present are copied onto the schedule already chosen by the
/// preset and `error_formula`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TickOverride {
    pub base_ms: Option<u64>,
    pub jitter_max_ms: Option<u64>,
    pub jitter_scale: Option<u64>,
}

impl TickOverride {
    pub fn merge_onto(&self, schedule: &mut TickSchedule) {
        if let Some(base_ms) = self.base_ms {
            schedule.base_ms = base_ms;
        }
        if let Some(jitter_max_ms) = self.jitter_max_ms {
            schedule.jitter_max_ms = jitter_max_ms;
        }
        if let Some(jitter_scale) = self.jitter_scale {
            schedule.jitter_scale = jitter_scale;
        }
    }
}

impl FileConfig {
    /// Load a config file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Overlay this file onto `config`.
    pub fn apply(&self, config: &mut HeartbeatConfig) -> Result<()> {
        if let Some(message) = &self.message {
            config.message = message.clone();
        }
        if let Some(formula) = self.error_formula {
            config.error_tick = formula.schedule();
        }
        if let Some(tick) = &self.log_tick {
            tick.merge_onto(&mut config.log_tick);
        }
        if let Some(tick) = &self.error_tick {
            tick.merge_onto(&mut config.error_tick);
        }
        for (kind, schedule) in [
            (TickKind::Log, config.log_tick),
            (TickKind::Error, config.error_tick),
        ] {
            if schedule.base_ms == 0 {
                return Err(HeartbeatError::Config(format!(
                    "{} tick base_ms must be greater than zero",
                    kind
                )));
            }
        }
        if let Some(signals) = &self.signals {
            let mut policy = SignalPolicy::new();
            for (name, action) in signals {
                policy.insert(name.parse::<SignalName>()?, action.parse::<SignalAction>()?);
            }
            config.signal_policy = policy;
        }
        if let Some(emit) = self.emit_ticks {
            config.emit_ticks = emit;
        }
        if let Some(command) = &self.entropy_command {
            config
                .entropy_echo
                .get_or_insert_with(EntropyEcho::default)
                .command = command.clone();
        }
        if let Some(enabled) = self.entropy_echo {
            if !enabled {
                config.entropy_echo = None;
            } else if config.entropy_echo.is_none() {
                config.entropy_echo = Some(EntropyEcho::default());
            }
        }
        if let Some(run_for) = &self.run_for {
            config.run_for = Some(parse_interval(run_for)?);
        }
        Ok(())
    }
}
