/*!
 * Lifecycle Tracing
 * Structured tracing for lifecycle operations using the tracing crate
 *
 * Features:
 * - Trace ID per operation for log correlation
 * - JSON-formatted logs for structured parsing
 * - Slow operation warnings
 */

use crate::core::limits::SLOW_OPERATION_THRESHOLD;
use crate::lifecycle::{LifecycleState, Operation};
use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init_tracing(json: bool) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json {
        // JSON output for production/parsing
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        // Human-readable output for development
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json, "Structured tracing initialized");
    }
    installed
}

/// Generate a unique trace ID for log correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span around one lifecycle operation
pub struct LifecycleSpan {
    span: tracing::Span,
    start: Instant,
    operation: Operation,
    trace_id: String,
}

impl LifecycleSpan {
    pub fn new(subsystem: &str, operation: Operation, manager_id: &Uuid) -> Self {
        let trace_id = generate_trace_id();

        let span = span!(
            Level::DEBUG,
            "lifecycle",
            trace_id = %trace_id,
            manager = %manager_id,
            subsystem = subsystem,
            operation = operation.as_str(),
            state = tracing::field::Empty,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
            duration_us = tracing::field::Empty,
        );

        let _entered = span.enter();
        debug!(operation = operation.as_str(), "lifecycle operation started");
        drop(_entered);

        Self {
            span,
            start: Instant::now(),
            operation,
            trace_id,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Record the state the operation left behind
    pub fn record_state(&self, state: LifecycleState) {
        self.span.record("state", state.as_str());
        self.span.record("result", "success");
    }

    /// Record a failure and the state it left behind
    pub fn record_error(&self, state: LifecycleState, error: &dyn std::fmt::Display) {
        self.span.record("state", state.as_str());
        self.span.record("error", tracing::field::display(error));
        self.span.record("result", "error");
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for LifecycleSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_us", duration.as_micros() as u64);

        if duration > SLOW_OPERATION_THRESHOLD {
            warn!(
                trace_id = %self.trace_id,
                operation = self.operation.as_str(),
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow lifecycle operation detected"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                operation = self.operation.as_str(),
                duration_us = duration.as_micros() as u64,
                "lifecycle operation completed"
            );
        }
    }
}
