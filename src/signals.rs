//! OS signal subscription table.
//!
//! A [`SignalPolicy`] maps each handled signal to a [`SignalAction`]. Only
//! signals present in the table get a listener; everything else keeps the
//! default OS disposition. Received signals are forwarded into a channel so
//! the heartbeat loop handles them one at a time, between ticks.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{HeartbeatError, Result};

/// Exit status used when SIGTERM terminates the full variant.
pub const SIGTERM_EXIT_CODE: i32 = 4;

/// Signals the heartbeat process knows how to subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignalName {
    Interrupt,
    Terminate,
    User1,
}

impl SignalName {
    pub const ALL: [SignalName; 3] = [
        SignalName::Interrupt,
        SignalName::Terminate,
        SignalName::User1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalName::Interrupt => "SIGINT",
            SignalName::Terminate => "SIGTERM",
            SignalName::User1 => "SIGUSR1",
        }
    }

    pub fn kind(&self) -> SignalKind {
        match self {
            SignalName::Interrupt => SignalKind::interrupt(),
            SignalName::Terminate => SignalKind::terminate(),
            SignalName::User1 => SignalKind::user_defined1(),
        }
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalName {
    type Err = HeartbeatError;

    /// Accepts `SIGTERM`, `TERM`, `sigterm` and `term` alike.
    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
        match bare {
            "INT" => Ok(SignalName::Interrupt),
            "TERM" => Ok(SignalName::Terminate),
            "USR1" => Ok(SignalName::User1),
            _ => Err(HeartbeatError::Signal(format!(
                "unsupported signal '{}' (expected SIGINT, SIGTERM or SIGUSR1)",
                s.trim()
            ))),
        }
    }
}

/// What to do when a subscribed signal arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Print the acknowledgement and keep running.
    Acknowledge,
    /// Print the acknowledgement, then exit with this status.
    Exit(i32),
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalAction::Acknowledge => write!(f, "ack"),
            SignalAction::Exit(code) => write!(f, "exit:{}", code),
        }
    }
}

impl FromStr for SignalAction {
    type Err = HeartbeatError;

    /// Parses `ack` or `exit:<code>`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        if s == "ack" || s == "acknowledge" {
            return Ok(SignalAction::Acknowledge);
        }
        if let Some(code) = s.strip_prefix("exit:") {
            let code: i32 = code.trim().parse().map_err(|_| {
                HeartbeatError::Signal(format!("invalid exit code in action '{}'", s))
            })?;
            return Ok(SignalAction::Exit(code));
        }
        Err(HeartbeatError::Signal(format!(
            "unknown signal action '{}' (expected ack or exit:<code>)",
            s
        )))
    }
}

/// Ordered table of signal subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalPolicy {
    table: BTreeMap<SignalName, SignalAction>,
}

impl SignalPolicy {
    /// An empty policy: no listeners, default OS semantics for every signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: SignalName, action: SignalAction) -> Self {
        self.table.insert(name, action);
        self
    }

    pub fn insert(&mut self, name: SignalName, action: SignalAction) -> Option<SignalAction> {
        self.table.insert(name, action)
    }

    pub fn remove(&mut self, name: SignalName) -> Option<SignalAction> {
        self.table.remove(&name)
    }

    pub fn action_for(&self, name: SignalName) -> Option<SignalAction> {
        self.table.get(&name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SignalName, SignalAction)> + '_ {
        self.table.iter().map(|(name, action)| (*name, *action))
    }

    /// Apply a `NAME=ACTION` rule such as `SIGTERM=exit:4`.
    pub fn apply_rule(&mut self, rule: &str) -> Result<()> {
        let (name, action) = parse_rule(rule)?;
        self.insert(name, action);
        Ok(())
    }
}

/// Parse a `NAME=ACTION` rule.
pub fn parse_rule(rule: &str) -> Result<(SignalName, SignalAction)> {
    let (name, action) = rule.split_once('=').ok_or_else(|| {
        HeartbeatError::Signal(format!("expected NAME=ACTION, got '{}'", rule))
    })?;
    Ok((name.parse()?, action.parse()?))
}

/// Acknowledgement line printed when `name` is received.
pub fn acknowledgement(process_id: u32, name: SignalName) -> String {
    format!("{} received {}\n", process_id, name)
}

/// Install OS listeners for every signal in `policy`.
///
/// Each listener is a small task that forwards arrivals into the returned
/// channel. Must be called from within a tokio runtime.
pub fn listen(policy: &SignalPolicy) -> Result<mpsc::UnboundedReceiver<SignalName>> {
    let (tx, rx) = mpsc::unbounded_channel();

    for (name, action) in policy.iter() {
        let mut stream = signal(name.kind()).map_err(|e| {
            HeartbeatError::Signal(format!("failed to install {} handler: {}", name, e))
        })?;
        debug!(signal = %name, action = %action, "Installed signal listener");

        let tx = tx.clone();
        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                if tx.send(name).is_err() {
                    break;
                }
            }
        });
    }

    if policy.is_empty() {
        info!("No signal listeners installed; default OS handling applies");
    }

    Ok(rx)
}
