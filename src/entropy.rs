//! One-shot entropy echo.
//!
//! Shortly after start the full variant shells out to read raw bytes from the
//! system random source and writes them, unmodified, to stdout. It happens
//! once; a failure is not retried.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{HeartbeatError, Result};

/// Command used to read the bytes.
pub const DEFAULT_ENTROPY_COMMAND: &str = "head -c 100 /dev/urandom";

/// Number of bytes echoed.
pub const DEFAULT_ENTROPY_BYTES: usize = 100;

/// Delay after start before the echo runs.
pub const DEFAULT_ENTROPY_DELAY: Duration = Duration::from_millis(1_000);

/// Upper bound on how long the command may run.
pub const DEFAULT_ENTROPY_TIMEOUT: Duration = Duration::from_secs(10);

/// Shell used to run the command.
const SHELL: &str = "/bin/sh";

/// Configuration for the one-shot echo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntropyEcho {
    /// Shell command whose stdout supplies the bytes.
    pub command: String,
    /// Exact number of bytes to echo.
    pub byte_count: usize,
    /// Delay after start.
    pub delay: Duration,
    /// The command is killed and the echo fails once this elapses.
    pub timeout: Duration,
}

impl Default for EntropyEcho {
    fn default() -> Self {
        Self {
            command: DEFAULT_ENTROPY_COMMAND.to_string(),
            byte_count: DEFAULT_ENTROPY_BYTES,
            delay: DEFAULT_ENTROPY_DELAY,
            timeout: DEFAULT_ENTROPY_TIMEOUT,
        }
    }
}

impl EntropyEcho {
    /// Run the command and return exactly `byte_count` bytes of its stdout.
    ///
    /// Errors if the command cannot be spawned, exits unsuccessfully, or
    /// produces fewer bytes than requested. Extra bytes are dropped.
    ///
    /// The heartbeat loop awaits this inline, so ticks and signals queue up
    /// until it returns. `timeout` bounds that stall; on expiry the child is
    /// killed and reaped.
    pub async fn read(&self) -> Result<Vec<u8>> {
        debug!(command = %self.command, bytes = self.byte_count, "Running entropy command");

        let output = Command::new(SHELL)
            .arg("-c")
            .arg(format!("exec {}", self.command))
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .output();

        let output = timeout(self.timeout, output)
            .await
            .map_err(|_| {
                HeartbeatError::Entropy(format!(
                    "`{}` timed out after {:?}",
                    self.command, self.timeout
                ))
            })?
            .map_err(|e| {
                HeartbeatError::Entropy(format!("failed to spawn `{}`: {}", self.command, e))
            })?;

        if !output.status.success() {
            return Err(HeartbeatError::Entropy(format!(
                "`{}` exited with {}",
                self.command, output.status
            )));
        }

        let mut bytes = output.stdout;
        if bytes.len() < self.byte_count {
            return Err(HeartbeatError::Entropy(format!(
                "expected {} bytes from `{}`, got {}",
                self.byte_count,
                self.command,
                bytes.len()
            )));
        }
        bytes.truncate(self.byte_count);
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_echo() {
        let echo = EntropyEcho::default();
        assert_eq!(echo.command, "head -c 100 /dev/urandom");
        assert_eq!(echo.byte_count, 100);
        assert_eq!(echo.delay, Duration::from_millis(1000));
        assert_eq!(echo.timeout, Duration::from_secs(10));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_reads_exactly_requested_bytes() {
        let bytes = EntropyEcho::default().read().await.unwrap();
        assert_eq!(bytes.len(), 100);
    }

    #[tokio::test]
    async fn test_truncates_extra_output() {
        let echo = EntropyEcho {
            command: "printf abcdef".to_string(),
            byte_count: 4,
            ..Default::default()
        };
        assert_eq!(echo.read().await.unwrap(), b"abcd".to_vec());
    }

    #[tokio::test]
    async fn test_short_read_is_an_error() {
        let echo = EntropyEcho {
            command: "printf ab".to_string(),
            byte_count: 4,
            ..Default::default()
        };
        let err = echo.read().await.unwrap_err();
        assert!(matches!(err, HeartbeatError::Entropy(_)));
        assert!(err.to_string().contains("got 2"));
    }

    #[tokio::test]
    async fn test_failing_command_is_an_error() {
        let echo = EntropyEcho {
            command: "false".to_string(),
            ..Default::default()
        };
        let err = echo.read().await.unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[tokio::test]
    async fn test_slow_command_times_out() {
        let echo = EntropyEcho {
            command: "sleep 5".to_string(),
            timeout: Duration::from_millis(100),
            ..Default::default()
        };
        let started = std::time::Instant::now();
        let err = echo.read().await.unwrap_err();
        assert!(matches!(err, HeartbeatError::Entropy(_)));
        assert!(err.to_string().contains("timed out"), "{}", err);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
