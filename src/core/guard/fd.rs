/*!
 * File Descriptor Guards
 *
 * RAII guards for file descriptors with automatic cleanup
 */

use super::{GuardError, GuardMetadata, GuardResult};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, OwnedFd, RawFd};
use tracing::{debug, error};

/// File descriptor guard with a fallible explicit close
///
/// `OwnedFd` closes on drop but swallows the result. Teardown needs to report
/// a failed `close(2)`, so the guard closes through nix and surfaces the
/// errno. Whatever `close` returns, the descriptor is gone afterwards.
///
/// # Example
///
/// ```ignore
/// let mut guard = FdGuard::new(owned_fd, Some("/sys/kernel/debug/tense".into()));
/// let fd = guard.raw()?;
/// // Use file descriptor
/// guard.release()?; // Or closed on drop
/// ```
#[derive(Debug)]
pub struct FdGuard {
    fd: Option<OwnedFd>,
    path: Option<String>,
    metadata: GuardMetadata,
}

impl FdGuard {
    /// Create a new file descriptor guard
    pub fn new(fd: OwnedFd, path: Option<String>) -> Self {
        let guard = Self {
            fd: Some(fd),
            path,
            metadata: GuardMetadata::new("fd"),
        };

        debug!(fd = guard.fd.as_ref().map(|fd| fd.as_raw_fd()), path = ?guard.path, "fd opened");
        guard
    }

    /// Borrow the descriptor while the guard is active
    #[inline]
    pub fn borrow(&self) -> GuardResult<BorrowedFd<'_>> {
        self.fd
            .as_ref()
            .map(|fd| fd.as_fd())
            .ok_or(GuardError::AlreadyReleased)
    }

    /// Raw descriptor number while the guard is active
    #[inline]
    pub fn raw(&self) -> GuardResult<RawFd> {
        self.borrow().map(|fd| fd.as_raw_fd())
    }

    /// Get the file path if known
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Whether the descriptor is still open
    #[inline]
    pub fn is_active(&self) -> bool {
        self.fd.is_some()
    }

    /// Close the descriptor
    ///
    /// Returns `Err(AlreadyReleased)` if already closed. A failed close still
    /// deactivates the guard.
    pub fn release(&mut self) -> GuardResult<()> {
        let fd = self.fd.take().ok_or(GuardError::AlreadyReleased)?;
        let raw = fd.into_raw_fd();

        nix::unistd::close(raw).map_err(|errno| GuardError::ReleaseFailed {
            resource_type: self.metadata.resource_type,
            errno,
        })?;

        debug!(
            fd = raw,
            path = ?self.path,
            lifetime_micros = self.metadata.lifetime_micros(),
            "fd closed"
        );
        Ok(())
    }

    /// Close the descriptor, consuming the guard
    pub fn close(mut self) -> GuardResult<()> {
        self.release()
    }
}

impl Drop for FdGuard {
    fn drop(&mut self) {
        if self.is_active() {
            if let Err(e) = self.release() {
                error!(path = ?self.path, error = %e, "fd guard drop failed");
            }
        }
    }
}
