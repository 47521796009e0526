/*!
 * Configuration
 *
 * Environment-driven settings for the device and the lifecycle manager.
 *
 * Environment variables:
 * - TENSE_DEVICE: Path of the debugfs file (default: /sys/kernel/debug/tense)
 * - TENSE_DILATION: Initial time dilation as FASTER/SLOWER (default: 1/1)
 * - TENSE_DESTROY_TIMEOUT_MS: Bounded teardown deadline, 0 disables (default: 0)
 * - TENSE_HEALTH_THRESHOLD_MS: Probe latency above which health degrades (default: 100)
 * - TENSE_TRACE_JSON: Enable JSON log output (default: false)
 */

use crate::core::errors::ConfigError;
use crate::core::guard::TimeoutPolicy;
use crate::core::limits::{DEFAULT_DEVICE_PATH, DEFAULT_HEALTH_LATENCY_THRESHOLD};
use crate::core::types::TimeDilation;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DEVICE: &str = "TENSE_DEVICE";
pub const ENV_DILATION: &str = "TENSE_DILATION";
pub const ENV_DESTROY_TIMEOUT_MS: &str = "TENSE_DESTROY_TIMEOUT_MS";
pub const ENV_HEALTH_THRESHOLD_MS: &str = "TENSE_HEALTH_THRESHOLD_MS";
pub const ENV_TRACE_JSON: &str = "TENSE_TRACE_JSON";

/// Settings for opening the tense device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Path of the debugfs file
    pub path: PathBuf,

    /// Dilation written right after open
    pub dilation: TimeDilation,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DEVICE_PATH),
            dilation: TimeDilation::IDENTITY,
        }
    }
}

impl DeviceConfig {
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_dilation(mut self, dilation: TimeDilation) -> Self {
        self.dilation = dilation;
        self
    }
}

/// Settings for the lifecycle manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Deadline for `destroy`; `None` releases inline
    pub destroy_timeout: TimeoutPolicy,

    /// Healthy probes slower than this are reported as degraded
    pub health_latency_threshold: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            destroy_timeout: TimeoutPolicy::None,
            health_latency_threshold: DEFAULT_HEALTH_LATENCY_THRESHOLD,
        }
    }
}

impl LifecycleConfig {
    #[inline]
    #[must_use]
    pub fn with_destroy_timeout(mut self, policy: TimeoutPolicy) -> Self {
        self.destroy_timeout = policy;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_health_latency_threshold(mut self, threshold: Duration) -> Self {
        self.health_latency_threshold = threshold;
        self
    }
}

/// Complete configuration for the host process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenseConfig {
    pub device: DeviceConfig,
    pub lifecycle: LifecycleConfig,
    pub trace_json: bool,
}

impl TenseConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DEVICE).filter(|p| !p.trim().is_empty()) {
            config.device.path = PathBuf::from(path);
        }

        if let Some(raw) = lookup(ENV_DILATION) {
            config.device.dilation = raw
                .parse()
                .map_err(|reason| ConfigError::InvalidValue {
                    var: ENV_DILATION,
                    reason,
                })?;
        }

        if let Some(raw) = lookup(ENV_DESTROY_TIMEOUT_MS) {
            let ms = parse_millis(ENV_DESTROY_TIMEOUT_MS, &raw)?;
            config.lifecycle.destroy_timeout = TimeoutPolicy::from_millis(ms);
        }

        if let Some(raw) = lookup(ENV_HEALTH_THRESHOLD_MS) {
            let ms = parse_millis(ENV_HEALTH_THRESHOLD_MS, &raw)?;
            config.lifecycle.health_latency_threshold = Duration::from_millis(ms);
        }

        config.trace_json = lookup(ENV_TRACE_JSON)
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false);

        Ok(config)
    }

    #[inline]
    #[must_use]
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_lifecycle(mut self, lifecycle: LifecycleConfig) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_trace_json(mut self, enabled: bool) -> Self {
        self.trace_json = enabled;
        self
    }
}

fn parse_millis(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidValue {
            var,
            reason: format!("'{}' is not a millisecond count: {}", raw, e),
        })
}
