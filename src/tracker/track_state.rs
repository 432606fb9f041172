use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-frame status reported by the hybrid engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// Matched and (recently) validated with high confidence
    Lock,
    /// Matched and validated with moderate confidence
    Track,
    /// Re-acquired this frame after a loss
    Recov,
    /// No accepted observation; the box is a prediction
    Search,
}

impl Status {
    /// Whether this frame carried an accepted observation.
    #[inline]
    pub fn is_accepted(self) -> bool {
        !matches!(self, Self::Search)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lock => "LOCK",
            Self::Track => "TRACK",
            Self::Recov => "RECOV",
            Self::Search => "SEARCH",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a [`TrackerHandle`](crate::tracker::TrackerHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HandleState {
    /// No target selected
    #[default]
    Idle,
    /// Tracking; covers LOCK, TRACK, RECOV and short SEARCH stretches
    Active,
    /// Gave up; only a new `init` leaves this state
    Lost,
}

impl HandleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Active => "ACTIVE",
            Self::Lost => "LOST",
        }
    }
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
