//! Small process utilities.

pub mod duration;
pub mod pidfile;

pub use duration::parse_interval;
pub use pidfile::PidFileGuard;
