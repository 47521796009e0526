/*!
 * Health Reporting
 *
 * Structured results of a health check. The subsystem reports what it saw
 * through a `Probe`; the caller adds timing and turns it into a report.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Outcome of a health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HealthStatus {
    /// Subsystem answered and looks consistent
    Healthy,

    /// Subsystem answered but something is off
    Degraded { reason: String },

    /// Subsystem could not be reached through the handle
    Unreachable { reason: String },

    /// Check failed for another reason
    Error { reason: String },
}

impl HealthStatus {
    #[inline]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Short machine-friendly label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded { .. } => "degraded",
            Self::Unreachable { .. } => "unreachable",
            Self::Error { .. } => "error",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Healthy => None,
            Self::Degraded { reason } | Self::Unreachable { reason } | Self::Error { reason } => {
                Some(reason)
            }
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{}: {}", self.label(), reason),
            None => f.write_str(self.label()),
        }
    }
}

/// What a subsystem observed while probing its handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub status: HealthStatus,
    pub virtual_time: Option<Duration>,
}

impl Probe {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            virtual_time: None,
        }
    }

    pub fn with_status(status: HealthStatus) -> Self {
        Self {
            status,
            virtual_time: None,
        }
    }

    #[must_use]
    pub fn at(mut self, virtual_time: Duration) -> Self {
        self.virtual_time = Some(virtual_time);
        self
    }
}

/// Health check result returned to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub subsystem: String,
    pub status: HealthStatus,
    pub virtual_time_ns: Option<u64>,
    pub latency_us: u64,
}

impl HealthReport {
    /// Build a report from a probe, downgrading healthy probes that exceeded
    /// the latency threshold
    pub fn from_probe(
        subsystem: &str,
        probe: Probe,
        latency: Duration,
        threshold: Duration,
    ) -> Self {
        let status = match probe.status {
            HealthStatus::Healthy if latency > threshold => HealthStatus::Degraded {
                reason: format!(
                    "probe took {}us, threshold is {}us",
                    latency.as_micros(),
                    threshold.as_micros()
                ),
            },
            other => other,
        };

        Self {
            subsystem: subsystem.to_string(),
            status,
            virtual_time_ns: probe
                .virtual_time
                .map(|t| u64::try_from(t.as_nanos()).unwrap_or(u64::MAX)),
            latency_us: latency.as_micros() as u64,
        }
    }

    #[inline]
    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }
}
