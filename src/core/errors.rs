/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::guard::GuardError;
use crate::lifecycle::{LifecycleState, Operation};
use miette::Diagnostic;
use nix::errno::Errno;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle errors with serialization support
///
/// Every variant leaves the manager in a well-defined state: initialization
/// failures keep it `Uninitialized`, destruction failures and timeouts still
/// leave it `Destroyed`, and invalid calls change nothing.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum LifecycleError {
    #[error("Initialization failed: {0}")]
    #[diagnostic(
        code(lifecycle::initialization_failure),
        help("The resource was not acquired. Initialization may be retried.")
    )]
    InitializationFailure(String),

    #[error("{operation} is not valid while {state}")]
    #[diagnostic(
        code(lifecycle::invalid_state_call),
        help("Call initialize before use and do not use the manager after destroy.")
    )]
    InvalidStateCall {
        operation: Operation,
        state: LifecycleState,
    },

    #[error("Destruction failed: {0}")]
    #[diagnostic(
        code(lifecycle::destruction_failure),
        help("The handle is considered released and will not be released again.")
    )]
    DestructionFailure(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(lifecycle::timeout),
        help("The manager is destroyed; teardown finishes in the background.")
    )]
    Timeout { operation: Operation, timeout_ms: u64 },
}

impl LifecycleError {
    /// Whether the host may call `initialize` again after this error
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InitializationFailure(_))
    }

    #[inline]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::InvalidStateCall { .. })
    }
}

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Errors raised by the tense device
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum DeviceError {
    #[error("Failed to open {path}: {errno}")]
    #[diagnostic(
        code(device::open_failed),
        help("Is the tense module loaded and debugfs mounted at /sys/kernel/debug?")
    )]
    Open { path: String, errno: Errno },

    #[error("Device {operation} failed: {errno}")]
    #[diagnostic(code(device::io_failed))]
    Io {
        operation: &'static str,
        errno: Errno,
    },

    #[error("Device returned a malformed time: {seconds}s {nanos}ns")]
    #[diagnostic(code(device::malformed_time))]
    MalformedTime { seconds: i64, nanos: i64 },

    #[error("Invalid time dilation {faster}/{slower}")]
    #[diagnostic(
        code(device::invalid_dilation),
        help("Both components must be non-zero and fit in a u32 after reduction.")
    )]
    InvalidDilation { faster: u32, slower: u32 },

    #[error("Duration does not fit in a file offset")]
    #[diagnostic(code(device::duration_overflow))]
    DurationOverflow,

    #[error("Descriptor guard error: {0}")]
    Guard(#[from] GuardError),
}

impl DeviceError {
    /// Underlying errno, if the failure came from a syscall
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Self::Open { errno, .. } | Self::Io { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    #[diagnostic(code(config::invalid_value))]
    InvalidValue { var: &'static str, reason: String },
}
