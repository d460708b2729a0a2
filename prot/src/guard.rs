use std::fmt::Display;

use tracing::{debug, info};

use crate::{INTERRUPTED_ERROR, NORMAL_CLOSURE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    InFlight,
    Finished,
}

/// What ended an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Event,
    TransportError,
    Closed(u16),
    Cancelled,
}

impl Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::Event => f.write_str("terminal event"),
            Termination::TransportError => f.write_str("transport error"),
            Termination::Closed(code) => write!(f, "channel closed ({})", code),
            Termination::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Tracks whether an operation is in flight. Several termination sources
/// may fire for one operation; only the first one finishes it.
#[derive(Debug)]
pub struct Lifecycle {
    phase: Phase,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self { phase: Phase::Idle }
    }

    pub fn begin(&mut self) {
        self.phase = Phase::InFlight;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn in_flight(&self) -> bool {
        self.phase == Phase::InFlight
    }

    /// Returns true only for the call that actually ends the operation.
    pub fn finish(&mut self, by: Termination) -> bool {
        if self.phase != Phase::InFlight {
            debug!(%by, phase = ?self.phase, "Operation already settled");
            return false;
        }

        info!(%by, "Operation finished");
        self.phase = Phase::Finished;
        true
    }

    /// The failure to report for a close, if it is the only sign that the
    /// operation went wrong.
    pub fn abnormal_close(&self, code: u16) -> Option<&'static str> {
        (self.in_flight() && code != NORMAL_CLOSURE).then_some(INTERRUPTED_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_once() {
        let sources = [
            Termination::Event,
            Termination::TransportError,
            Termination::Closed(1006),
            Termination::Closed(NORMAL_CLOSURE),
        ];

        for first in sources {
            for second in sources {
                let mut guard = Lifecycle::new();
                guard.begin();
                assert!(guard.in_flight());
                assert!(guard.finish(first));
                assert!(!guard.finish(second));
                assert!(!guard.finish(first));
                assert_eq!(guard.phase(), Phase::Finished);
            }
        }
    }

    #[test]
    fn test_idle_is_not_finished() {
        let mut guard = Lifecycle::new();
        assert!(!guard.finish(Termination::Event));
        assert_eq!(guard.phase(), Phase::Idle);
    }

    #[test]
    fn test_abnormal_close() {
        let mut guard = Lifecycle::new();
        guard.begin();
        assert_eq!(guard.abnormal_close(NORMAL_CLOSURE), None);
        assert_eq!(guard.abnormal_close(1006), Some(INTERRUPTED_ERROR));

        guard.finish(Termination::Event);
        assert_eq!(guard.abnormal_close(1006), None);
    }
}
