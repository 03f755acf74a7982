//! Heartbeat - a long-running process that emits jittered log and error
//! lines and reacts to SIGINT, SIGTERM and SIGUSR1 per an explicit policy.

pub mod config;
pub mod entropy;
pub mod error;
pub mod heartbeat;
pub mod output;
pub mod signals;
pub mod utils;

pub use config::{FileConfig, HeartbeatConfig, Variant};
pub use error::{HeartbeatError, Result};
pub use heartbeat::{HeartbeatService, Outcome};
