// Refresh lifecycle state
use std::fmt;

/// Where a dashboard's background refresh currently stands.
///
/// Never `InFlight` and `Paused` at once: a page hidden mid-fetch reports
/// `InFlight` until the response lands, then `Paused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Scheduled,
    InFlight,
    Paused,
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RefreshState::Idle => "idle",
            RefreshState::Scheduled => "scheduled",
            RefreshState::InFlight => "in-flight",
            RefreshState::Paused => "paused",
        };
        f.write_str(s)
    }
}
