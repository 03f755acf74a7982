//! Human-friendly interval parsing.

use std::time::Duration;

use crate::error::{HeartbeatError, Result};

/// Parse interval strings like "1500ms", "30s", "2m", "1h" or a bare number
/// of milliseconds.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    let invalid = || {
        HeartbeatError::Config(format!(
            "invalid interval '{}'. Use formats like 1500ms, 30s, 2m or 1h",
            s
        ))
    };

    let (digits, unit_ms) = if let Some(ms) = s.strip_suffix("ms") {
        (ms, 1)
    } else if let Some(hours) = s.strip_suffix('h') {
        (hours, 3_600_000)
    } else if let Some(mins) = s.strip_suffix('m') {
        (mins, 60_000)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1_000)
    } else {
        (s.as_str(), 1)
    };

    let n: u64 = digits.trim().parse().map_err(|_| invalid())?;
    n.checked_mul(unit_ms)
        .map(Duration::from_millis)
        .ok_or_else(invalid)
}
