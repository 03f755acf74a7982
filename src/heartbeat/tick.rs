//! Jittered, self-rescheduling tick timers.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{HeartbeatError, Result};

/// Which periodic signal a tick represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickKind {
    /// Writes `<pid> <message>` to stdout.
    Log,
    /// Writes `<pid> error message` to stderr.
    Error,
}

impl fmt::Display for TickKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickKind::Log => write!(f, "log"),
            TickKind::Error => write!(f, "error"),
        }
    }
}

/// Delay distribution for a tick: `base_ms + U(0, jitter_max_ms) * jitter_scale`.
///
/// `U` is sampled uniformly from the half-open range `[0, jitter_max_ms)`,
/// so every delay falls in `[base_ms, base_ms + jitter_max_ms * jitter_scale)`.
/// A zero `jitter_max_ms` yields a fixed `base_ms` delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSchedule {
    pub base_ms: u64,
    pub jitter_max_ms: u64,
    pub jitter_scale: u64,
}

impl TickSchedule {
    /// `1000 + U(0,1000)`, the log tick.
    pub const LOG: Self = Self::new(1_000, 1_000, 1);

    pub const fn new(base_ms: u64, jitter_max_ms: u64, jitter_scale: u64) -> Self {
        Self {
            base_ms,
            jitter_max_ms,
            jitter_scale,
        }
    }

    /// Sample the raw jitter term `U(0, jitter_max_ms)`.
    pub fn sample_jitter<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.jitter_max_ms == 0 {
            return 0;
        }
        rng.gen_range(0..self.jitter_max_ms)
    }

    /// Sample the next delay before a firing.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let jitter = self.sample_jitter(rng).saturating_mul(self.jitter_scale);
        Duration::from_millis(self.base_ms.saturating_add(jitter))
    }

    /// Shortest possible delay.
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.base_ms)
    }

    /// Exclusive upper bound on delays. Equal to `min_delay` when there is no jitter.
    pub fn max_delay(&self) -> Duration {
        let span = self.jitter_max_ms.saturating_mul(self.jitter_scale);
        Duration::from_millis(self.base_ms.saturating_add(span))
    }

    /// Whether `delay` is a value this schedule can produce.
    pub fn contains(&self, delay: Duration) -> bool {
        if self.jitter_max_ms == 0 || self.jitter_scale == 0 {
            return delay == self.min_delay();
        }
        delay >= self.min_delay() && delay < self.max_delay()
    }
}

/// The two error-tick formulas found in the wild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorFormula {
    /// `10000 + U(0,1000) * 5`, delays in `[10000, 15000)` ms.
    #[default]
    Offset,
    /// `(1000 + U(0,1000)) * 5`, delays in `[5000, 10000)` ms.
    Scaled,
}

impl ErrorFormula {
    pub fn schedule(&self) -> TickSchedule {
        match self {
            ErrorFormula::Offset => TickSchedule::new(10_000, 1_000, 5),
            ErrorFormula::Scaled => TickSchedule::new(5_000, 1_000, 5),
        }
    }
}

impl fmt::Display for ErrorFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorFormula::Offset => write!(f, "offset"),
            ErrorFormula::Scaled => write!(f, "scaled"),
        }
    }
}

impl FromStr for ErrorFormula {
    type Err = HeartbeatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "offset" => Ok(ErrorFormula::Offset),
            "scaled" => Ok(ErrorFormula::Scaled),
            other => Err(HeartbeatError::Config(format!(
                "unknown error formula '{}' (expected offset or scaled)",
                other
            ))),
        }
    }
}

/// A recurring timer that re-arms itself with a fresh sample after each firing.
#[derive(Debug, Clone)]
pub struct ScheduledTick {
    kind: TickKind,
    schedule: TickSchedule,
    deadline: Instant,
    firings: u64,
}

impl ScheduledTick {
    /// Arm a tick for its first firing, measured from now.
    pub fn arm<R: Rng + ?Sized>(kind: TickKind, schedule: TickSchedule, rng: &mut R) -> Self {
        Self {
            kind,
            schedule,
            deadline: Instant::now() + schedule.sample(rng),
            firings: 0,
        }
    }

    pub fn kind(&self) -> TickKind {
        self.kind
    }

    /// When the tick next fires.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// How many times the tick has fired.
    pub fn firings(&self) -> u64 {
        self.firings
    }

    /// Record a firing and schedule the next one relative to now.
    ///
    /// Returns the sampled delay.
    pub fn rearm<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Duration {
        let delay = self.schedule.sample(rng);
        self.firings += 1;
        self.deadline = Instant::now() + delay;
        delay
    }
}
