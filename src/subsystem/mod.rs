/*!
 * Native Subsystems
 *
 * The opaque collaborator behind the lifecycle manager. A subsystem hands out
 * a handle on `acquire`, answers probes against it, and takes it back by
 * value on `release` so a released handle can never be touched again.
 */

mod device;
mod health;

pub use device::{TenseDevice, TenseHandle};
pub use health::{HealthReport, HealthStatus, Probe};

/// A native resource with explicit setup and teardown
///
/// Implementations must not assume anything about call order; the lifecycle
/// manager only forwards calls that are valid for the current state.
#[cfg_attr(
    test,
    mockall::automock(type Handle = u64; type Error = crate::core::errors::DeviceError;)
)]
pub trait Subsystem: Send + Sync + 'static {
    /// Owned handle to subsystem state
    type Handle: Send + 'static;

    /// Failure reported by acquire or release
    type Error: std::error::Error + Send + 'static;

    /// Name used in logs and health reports
    fn name(&self) -> &'static str;

    /// Acquire a fresh handle
    fn acquire(&self) -> Result<Self::Handle, Self::Error>;

    /// Query liveness through the handle
    fn probe(&self, handle: &mut Self::Handle) -> Probe;

    /// Release the handle; it is gone whatever the result
    fn release(&self, handle: Self::Handle) -> Result<(), Self::Error>;
}
