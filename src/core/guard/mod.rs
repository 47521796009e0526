/*!
 * RAII Resource Guards
 *
 * Owned wrappers around native resources with explicit release and
 * guaranteed cleanup on drop.
 *
 * ## Guard Types
 *
 * - **FdGuard**: File descriptor with a fallible explicit close
 *
 * ## Example
 *
 * ```ignore
 * let mut guard = FdGuard::new(owned_fd, Some(path));
 * // Use guard.raw()?
 * guard.release()?; // Or closed on drop
 * ```
 */

mod fd;
mod timeout;

pub use fd::FdGuard;
pub use timeout::TimeoutPolicy;

use nix::errno::Errno;

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur during guard operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("Resource already released")]
    AlreadyReleased,

    #[error("Release of {resource_type} failed: {errno}")]
    ReleaseFailed {
        resource_type: &'static str,
        errno: Errno,
    },
}

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub resource_type: &'static str,
    pub creation_time: std::time::Instant,
}

impl GuardMetadata {
    #[inline]
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            resource_type,
            creation_time: std::time::Instant::now(),
        }
    }

    #[inline]
    pub fn lifetime_micros(&self) -> u64 {
        self.creation_time.elapsed().as_micros() as u64
    }
}
