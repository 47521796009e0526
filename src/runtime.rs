/*!
 * Process Runtime
 *
 * One-time, process-wide setup: tracing and the configuration every host in
 * the process shares. Initialization is explicit; the first call wins and
 * later calls are no-ops that hand back the existing runtime.
 */

use crate::core::config::TenseConfig;
use crate::core::errors::ConfigError;
use crate::host::TenseHost;
use crate::monitoring::init_tracing;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Process-wide state established once at startup
#[derive(Debug)]
pub struct Runtime {
    config: TenseConfig,
    started_at: Instant,
    device_present: bool,
}

impl Runtime {
    pub fn config(&self) -> &TenseConfig {
        &self.config
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Whether the device file existed when the runtime started
    pub fn device_present(&self) -> bool {
        self.device_present
    }

    /// New host over the configured device
    pub fn host(&self) -> TenseHost {
        TenseHost::from_config(&self.config)
    }
}

/// Initialize the runtime
///
/// Only the first call installs tracing and stores `config`; every later call
/// ignores its argument and returns the runtime from the first.
pub fn init(config: TenseConfig) -> &'static Runtime {
    let mut fresh = false;

    let runtime = RUNTIME.get_or_init(|| {
        fresh = true;
        init_tracing(config.trace_json);

        let device_present = config.device.path.exists();
        if device_present {
            info!(path = %config.device.path.display(), "tense device found");
        } else {
            warn!(
                path = %config.device.path.display(),
                "tense device not found; is the module loaded?"
            );
        }

        Runtime {
            config,
            started_at: Instant::now(),
            device_present,
        }
    });

    if !fresh {
        debug!("runtime already initialized; keeping existing configuration");
    }
    runtime
}

/// Initialize the runtime from the process environment
pub fn init_from_env() -> Result<&'static Runtime, ConfigError> {
    if let Some(runtime) = RUNTIME.get() {
        debug!("runtime already initialized; environment not re-read");
        return Ok(runtime);
    }
    Ok(init(TenseConfig::from_env()?))
}

/// The runtime, if it has been initialized
#[inline]
pub fn runtime() -> Option<&'static Runtime> {
    RUNTIME.get()
}
