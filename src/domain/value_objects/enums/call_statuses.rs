use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Lifecycle of a single call ledger entry. `Completed` and `Failed` are
/// terminal; once a record reaches one of them it is never mutated again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Initiated,
    Connected,
    Completed,
    Failed,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Initiated => "initiated",
            CallStatus::Connected => "connected",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "initiated" => Some(CallStatus::Initiated),
            "connected" => Some(CallStatus::Connected),
            "completed" => Some(CallStatus::Completed),
            "failed" => Some(CallStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CallStatus::Completed | CallStatus::Failed)
    }

    /// Permitted transitions: initiated -> connected -> completed, and
    /// either non-terminal status may fail.
    pub fn can_transition_to(&self, next: CallStatus) -> bool {
        matches!(
            (self, next),
            (CallStatus::Initiated, CallStatus::Connected)
                | (CallStatus::Initiated, CallStatus::Failed)
                | (CallStatus::Connected, CallStatus::Completed)
                | (CallStatus::Connected, CallStatus::Failed)
        )
    }
}

impl Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_admit_no_transition() {
        for terminal in [CallStatus::Completed, CallStatus::Failed] {
            for next in [
                CallStatus::Initiated,
                CallStatus::Connected,
                CallStatus::Completed,
                CallStatus::Failed,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn happy_path_transitions() {
        assert!(CallStatus::Initiated.can_transition_to(CallStatus::Connected));
        assert!(CallStatus::Connected.can_transition_to(CallStatus::Completed));
        assert!(CallStatus::Initiated.can_transition_to(CallStatus::Failed));
        assert!(CallStatus::Connected.can_transition_to(CallStatus::Failed));
    }

    #[test]
    fn skipping_connected_is_rejected() {
        assert!(!CallStatus::Initiated.can_transition_to(CallStatus::Completed));
        assert!(!CallStatus::Connected.can_transition_to(CallStatus::Initiated));
    }
}
