/*!
 * Host Boundary
 *
 * The calling convention the host process expects: initialise and destroy
 * answer with a bool, health_check answers with a status. Everything richer
 * stays available through `manager()`.
 */

use crate::core::config::TenseConfig;
use crate::lifecycle::LifecycleManager;
use crate::subsystem::{HealthStatus, Subsystem, TenseDevice};

/// Boolean facade over a lifecycle manager
pub struct TenseHost<S: Subsystem = TenseDevice> {
    manager: LifecycleManager<S>,
}

impl TenseHost<TenseDevice> {
    /// Host over the tense device described by `config`
    pub fn from_config(config: &TenseConfig) -> Self {
        let device = TenseDevice::new(config.device.clone());
        Self::new(LifecycleManager::with_config(device, config.lifecycle.clone()))
    }
}

impl<S: Subsystem> TenseHost<S> {
    pub fn new(manager: LifecycleManager<S>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &LifecycleManager<S> {
        &self.manager
    }

    /// `true` once the resource is acquired
    pub fn initialise(&self) -> bool {
        self.manager.initialize().is_ok()
    }

    /// Health of the resource
    ///
    /// A call outside `Ready` is rejected before reaching the subsystem and
    /// reported as `HealthStatus::Error`.
    pub fn health_check(&self) -> HealthStatus {
        match self.manager.health_check() {
            Ok(report) => report.status,
            Err(e) => HealthStatus::Error {
                reason: e.to_string(),
            },
        }
    }

    /// `true` unless the subsystem reported a failed or late release
    ///
    /// Repeated calls and calls before initialise are no-ops that answer
    /// `true`.
    pub fn destroy(&self) -> bool {
        self.manager.destroy().is_ok()
    }
}
