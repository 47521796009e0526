/*!
 * Timeout Policies
 *
 * Deadlines for blocking lifecycle work. Teardown is the only operation that
 * takes one: a bounded destroy still leaves the manager destroyed when the
 * deadline passes.
 */

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Timeout policy for blocking operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "duration", rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// No timeout, run inline to completion
    #[default]
    None,

    /// Give up waiting once the duration has passed
    Deadline(Duration),
}

impl TimeoutPolicy {
    /// Policy from a millisecond count where zero means no timeout
    pub const fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self::None
        } else {
            Self::Deadline(Duration::from_millis(ms))
        }
    }

    /// Get the duration for this policy
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Deadline(d) => Some(*d),
        }
    }

    /// Get remaining time before timeout
    pub fn remaining(&self, start: Instant) -> Option<Duration> {
        self.duration().map(|d| d.saturating_sub(start.elapsed()))
    }
}
