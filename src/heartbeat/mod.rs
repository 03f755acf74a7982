//! Heartbeat service - jittered log and error ticks with signal handling.

mod service;
mod tick;

pub use service::{HeartbeatService, Outcome};
pub use tick::{ErrorFormula, ScheduledTick, TickKind, TickSchedule};
