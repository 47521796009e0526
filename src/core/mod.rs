/*!
 * Core Module
 * Fundamental types, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod guard;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use config::{DeviceConfig, LifecycleConfig, TenseConfig};
pub use errors::*;
pub use guard::{FdGuard, GuardError, GuardMetadata, GuardResult, TimeoutPolicy};
pub use types::TimeDilation;
