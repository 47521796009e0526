/*!
 * Tense Lifecycle Library
 * Explicit initialize / health-check / destroy management of the tense
 * virtual-time device
 */

pub mod core;
pub mod host;
pub mod lifecycle;
pub mod monitoring;
pub mod runtime;
pub mod subsystem;

// Re-exports
pub use crate::core::errors::*;
pub use crate::core::{DeviceConfig, LifecycleConfig, TenseConfig, TimeDilation, TimeoutPolicy};
pub use host::TenseHost;
pub use lifecycle::{
    LifecycleManager, LifecycleState, LifecycleStats, Operation, Teardown, TypedLifecycle,
};
pub use monitoring::init_tracing;
pub use subsystem::{HealthReport, HealthStatus, Probe, Subsystem, TenseDevice, TenseHandle};
