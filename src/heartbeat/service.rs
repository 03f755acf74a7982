//! Heartbeat service implementation.
//!
//! One task owns both ticks, the entropy echo and signal handling, and
//! multiplexes them with a `select!` loop. A branch always runs to completion
//! before the next one is considered.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::tick::{ScheduledTick, TickKind};
use crate::config::HeartbeatConfig;
use crate::error::Result;
use crate::output::{Sink, Stream};
use crate::signals::{acknowledgement, SignalAction, SignalName};

/// Why the service stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A signal action asked for this exit status.
    Exited(i32),
    /// The configured run bound elapsed.
    Elapsed,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Exited(code) => *code,
            Outcome::Elapsed => 0,
        }
    }
}

/// Emits jittered log and error ticks until a signal or the run bound stops it.
pub struct HeartbeatService<S: Sink> {
    config: HeartbeatConfig,
    sink: S,
    rng: StdRng,
}

impl<S: Sink> HeartbeatService<S> {
    /// Create a new heartbeat service seeded from OS entropy.
    pub fn new(config: HeartbeatConfig, sink: S) -> Self {
        Self {
            config,
            sink,
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a fixed seed so jitter is reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Run until a signal action exits, the run bound elapses, or the entropy
    /// echo fails.
    ///
    /// `signals` carries arrivals from [`crate::signals::listen`]; a closed
    /// channel just means no more signals will be handled.
    pub async fn run(
        mut self,
        mut signals: mpsc::UnboundedReceiver<SignalName>,
    ) -> Result<Outcome> {
        let start = Instant::now();
        self.emit(Stream::Stdout, self.config.banner().as_bytes());

        let mut log_tick =
            ScheduledTick::arm(TickKind::Log, self.config.log_tick, &mut self.rng);
        let mut error_tick =
            ScheduledTick::arm(TickKind::Error, self.config.error_tick, &mut self.rng);
        let mut entropy_at = self.config.entropy_echo.as_ref().map(|e| start + e.delay);
        let stop_at = self.config.run_for.map(|d| start + d);

        info!(
            pid = self.config.process_id,
            signals = self.config.signal_policy.len(),
            entropy_echo = entropy_at.is_some(),
            "Heartbeat service started"
        );

        loop {
            tokio::select! {
                biased;

                Some(name) = signals.recv() => {
                    if let Some(code) = self.handle_signal(name) {
                        info!(signal = %name, code, "Exiting on signal");
                        return Ok(Outcome::Exited(code));
                    }
                }

                _ = sleep_until(stop_at.unwrap_or(start)), if stop_at.is_some() => {
                    info!(
                        log_firings = log_tick.firings(),
                        error_firings = error_tick.firings(),
                        "Run bound elapsed, stopping heartbeat"
                    );
                    return Ok(Outcome::Elapsed);
                }

                _ = sleep_until(entropy_at.unwrap_or(start)), if entropy_at.is_some() => {
                    entropy_at = None;
                    if let Some(echo) = self.config.entropy_echo.clone() {
                        let bytes = echo.read().await?;
                        self.emit(Stream::Stdout, &bytes);
                    }
                }

                _ = sleep_until(log_tick.deadline()) => self.fire(&mut log_tick),

                _ = sleep_until(error_tick.deadline()) => self.fire(&mut error_tick),
            }
        }
    }

    /// Write the tick's line, then re-arm it exactly once.
    fn fire(&mut self, tick: &mut ScheduledTick) {
        let kind = tick.kind();
        if self.config.emit_ticks {
            let stream = match kind {
                TickKind::Log => Stream::Stdout,
                TickKind::Error => Stream::Stderr,
            };
            let line = self.config.line_for(kind);
            self.emit(stream, line.as_bytes());
        }
        let delay = tick.rearm(&mut self.rng);
        debug!(
            kind = %kind,
            firings = tick.firings(),
            delay_ms = delay.as_millis() as u64,
            "Tick fired"
        );
    }

    /// Acknowledge a signal. Returns the exit status if the policy says to stop.
    fn handle_signal(&mut self, name: SignalName) -> Option<i32> {
        let action = match self.config.signal_policy.action_for(name) {
            Some(action) => action,
            None => {
                debug!(signal = %name, "No policy entry for signal, ignoring");
                return None;
            }
        };

        let line = acknowledgement(self.config.process_id, name);
        self.emit(Stream::Stdout, line.as_bytes());

        match action {
            SignalAction::Acknowledge => None,
            SignalAction::Exit(code) => Some(code),
        }
    }

    // Writes are fire-and-forget.
    fn emit(&self, stream: Stream, bytes: &[u8]) {
        if let Err(e) = self.sink.write(stream, bytes) {
            warn!(?stream, "Failed to write heartbeat output: {}", e);
        }
    }
}
