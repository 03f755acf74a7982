//! Variant presets.
//!
//! The process ships in three flavours that differ only in which signals are
//! wired, whether ticks write anything, and whether the entropy echo runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::entropy::EntropyEcho;
use crate::error::{HeartbeatError, Result};
use crate::signals::{SignalAction, SignalName, SignalPolicy, SIGTERM_EXIT_CODE};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Ticks fire but write nothing; no signal listeners.
    Quiet,
    /// Ticks write; SIGINT and SIGUSR1 are acknowledged.
    Listen,
    /// As `Listen`, plus SIGTERM exits with status 4 and the entropy echo runs.
    #[default]
    Full,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Quiet, Variant::Listen, Variant::Full];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Quiet => "quiet",
            Variant::Listen => "listen",
            Variant::Full => "full",
        }
    }

    pub fn emits_ticks(&self) -> bool {
        !matches!(self, Variant::Quiet)
    }

    pub fn signal_policy(&self) -> SignalPolicy {
        match self {
            Variant::Quiet => SignalPolicy::new(),
            Variant::Listen => SignalPolicy::new()
                .with(SignalName::Interrupt, SignalAction::Acknowledge)
                .with(SignalName::User1, SignalAction::Acknowledge),
            Variant::Full => Variant::Listen
                .signal_policy()
                .with(SignalName::Terminate, SignalAction::Exit(SIGTERM_EXIT_CODE)),
        }
    }

    pub fn entropy_echo(&self) -> Option<EntropyEcho> {
        match self {
            Variant::Full => Some(EntropyEcho::default()),
            Variant::Quiet | Variant::Listen => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = HeartbeatError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        Variant::ALL
            .into_iter()
            .find(|v| v.as_str() == needle)
            .ok_or_else(|| {
                HeartbeatError::Config(format!(
                    "unknown variant '{}' (expected quiet, listen or full)",
                    s.trim()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_preset() {
        let v = Variant::Quiet;
        assert!(!v.emits_ticks());
        assert!(v.signal_policy().is_empty());
        assert!(v.entropy_echo().is_none());
    }

    #[test]
    fn test_listen_preset() {
        let policy = Variant::Listen.signal_policy();
        assert_eq!(
            policy.action_for(SignalName::Interrupt),
            Some(SignalAction::Acknowledge)
        );
        assert_eq!(
            policy.action_for(SignalName::User1),
            Some(SignalAction::Acknowledge)
        );
        assert_eq!(policy.action_for(SignalName::Terminate), None);
        assert!(Variant::Listen.entropy_echo().is_none());
    }

    #[test]
    fn test_full_preset() {
        let policy = Variant::Full.signal_policy();
        assert_eq!(policy.len(), 3);
        assert_eq!(
            policy.action_for(SignalName::Terminate),
            Some(SignalAction::Exit(4))
        );
        assert!(Variant::Full.emits_ticks());
        assert!(Variant::Full.entropy_echo().is_some());
    }

    #[test]
    fn test_default_is_full() {
        assert_eq!(Variant::default(), Variant::Full);
    }

    #[test]
    fn test_parse() {
        assert_eq!("LISTEN".parse::<Variant>().unwrap(), Variant::Listen);
        let err = "loud".parse::<Variant>().unwrap_err();
        assert!(err.to_string().contains("unknown variant 'loud'"));
    }
}
