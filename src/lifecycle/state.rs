/*!
 * Lifecycle States
 *
 * Uninitialized -> Ready -> Destroyed, never backwards.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a managed resource is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Uninitialized,
    Ready,
    Destroyed,
}

impl LifecycleState {
    /// Position along the lifecycle; transitions never decrease it
    #[inline]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::Ready => 1,
            Self::Destroyed => 2,
        }
    }

    /// Check if moving to `next` keeps the lifecycle monotonic
    ///
    /// Staying put is allowed everywhere: a failed initialize leaves the
    /// state `Uninitialized` and repeated destroys leave it `Destroyed`.
    #[inline]
    pub const fn can_transition_to(self, next: Self) -> bool {
        next.rank() >= self.rank()
    }

    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Destroyed)
    }

    /// Whether `operation` may be forwarded to the subsystem in this state
    ///
    /// Destroy is accepted everywhere because it degrades to a no-op.
    #[inline]
    pub const fn accepts(self, operation: Operation) -> bool {
        match operation {
            Operation::Initialize => matches!(self, Self::Uninitialized),
            Operation::HealthCheck | Operation::Access => matches!(self, Self::Ready),
            Operation::Destroy => true,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calls a host can make against a managed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Initialize,
    HealthCheck,
    /// Subsystem-specific call through the handle
    Access,
    Destroy,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::HealthCheck => "health_check",
            Self::Access => "access",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What `destroy` actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Teardown {
    /// A held handle was released
    Released,
    /// Destroyed before any handle was acquired
    NothingHeld,
    /// Already destroyed; nothing to do
    AlreadyDestroyed,
}

impl Teardown {
    /// Whether this call performed the real release
    #[inline]
    pub fn released(&self) -> bool {
        matches!(self, Self::Released)
    }
}
