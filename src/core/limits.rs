/*!
 * System Limits and Constants
 *
 * Centralized location for device paths, wire sizes and default thresholds.
 * Organized by domain:
 * - Linux-compatible values are marked with [LINUX-COMPAT]
 * - Values the kernel module depends on are marked with [ABI]
 */

use std::time::Duration;

// =============================================================================
// DEVICE
// =============================================================================

/// Debugfs file exported by the tense kernel module
/// [LINUX-COMPAT] Requires debugfs mounted at /sys/kernel/debug
pub const DEFAULT_DEVICE_PATH: &str = "/sys/kernel/debug/tense";

/// Size of a time-dilation write: two native-endian u32 (faster, slower)
/// [ABI]
pub const DILATION_WIRE_LEN: usize = 2 * std::mem::size_of::<u32>();

/// Size of the timespec filled by a read: i64 seconds, i64 nanoseconds
/// [ABI] 64-bit layout only
pub const TIMESPEC_WIRE_LEN: usize = 2 * std::mem::size_of::<i64>();

/// Divisor applied by percentage scaling
pub const PERCENT_BASE: u32 = 100;

pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Probes slower than this are reported as degraded even if the subsystem
/// considers itself healthy
pub const DEFAULT_HEALTH_LATENCY_THRESHOLD: Duration = Duration::from_millis(100);

/// Name of the worker thread used by bounded teardown
pub const TEARDOWN_THREAD_NAME: &str = "tense-teardown";

// =============================================================================
// OBSERVABILITY
// =============================================================================

/// Lifecycle operations slower than this are logged at warn level
pub const SLOW_OPERATION_THRESHOLD: Duration = Duration::from_millis(10);
