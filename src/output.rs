//! Output sinks for heartbeat lines.
//!
//! The service never touches stdout/stderr directly. [`Console`] is the real
//! process streams; [`Capture`] records every write with its (tokio) timestamp
//! so tests can check ordering and intervals under a paused clock.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tokio::time::Instant;

/// Destination stream of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Somewhere heartbeat output can be written.
pub trait Sink: Send + Sync {
    fn write(&self, stream: Stream, bytes: &[u8]) -> io::Result<()>;
}

/// The process's own stdout and stderr. Every write is flushed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Console;

impl Sink for Console {
    fn write(&self, stream: Stream, bytes: &[u8]) -> io::Result<()> {
        match stream {
            Stream::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(bytes)?;
                out.flush()
            }
            Stream::Stderr => {
                let mut err = io::stderr().lock();
                err.write_all(bytes)?;
                err.flush()
            }
        }
    }
}

/// A single recorded write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub stream: Stream,
    pub at: Instant,
    pub bytes: Vec<u8>,
}

impl Captured {
    /// The write as text, trailing newline removed.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes)
            .trim_end_matches('\n')
            .to_string()
    }
}

/// In-memory sink. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    events: Arc<Mutex<Vec<Captured>>>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write so far, in order.
    pub fn events(&self) -> Vec<Captured> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Writes to one stream, in order.
    pub fn on(&self, stream: Stream) -> Vec<Captured> {
        self.events()
            .into_iter()
            .filter(|event| event.stream == stream)
            .collect()
    }

    /// Text of every stdout write.
    pub fn stdout_lines(&self) -> Vec<String> {
        self.on(Stream::Stdout).iter().map(Captured::text).collect()
    }

    /// Text of every stderr write.
    pub fn stderr_lines(&self) -> Vec<String> {
        self.on(Stream::Stderr).iter().map(Captured::text).collect()
    }
}

impl Sink for Capture {
    fn write(&self, stream: Stream, bytes: &[u8]) -> io::Result<()> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Captured {
                stream,
                at: Instant::now(),
                bytes: bytes.to_vec(),
            });
        Ok(())
    }
}
