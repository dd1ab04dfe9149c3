//! Session state machine

use serde::{Deserialize, Serialize};

/// Current phase of a chat session.
///
/// There is no terminal phase: a session returns to `Idle` after every
/// dispatch or refresh, whether it succeeded or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Waiting for the next message
    #[default]
    Idle,

    /// A user turn has been appended and the provider reply is pending
    AwaitingReply,

    /// History is being summarized and replaced
    Refreshing,
}

impl SessionPhase {
    /// Check if the session is in the middle of a history transaction
    pub fn is_busy(&self) -> bool {
        !matches!(self, SessionPhase::Idle)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "Idle"),
            SessionPhase::AwaitingReply => write!(f, "Awaiting reply"),
            SessionPhase::Refreshing => write!(f, "Refreshing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_checks() {
        assert!(!SessionPhase::Idle.is_busy());
        assert!(SessionPhase::AwaitingReply.is_busy());
        assert!(SessionPhase::Refreshing.is_busy());
        assert_eq!(SessionPhase::default(), SessionPhase::Idle);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(SessionPhase::Idle.to_string(), "Idle");
        assert_eq!(SessionPhase::AwaitingReply.to_string(), "Awaiting reply");
    }
}
