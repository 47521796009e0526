/*!
 * Lifecycle Manager
 *
 * Mediates every access to a subsystem handle and enforces
 * Uninitialized -> Ready -> Destroyed.
 *
 * # Architecture
 *
 * - **Slot**: state and handle live in one enum, so a handle exists exactly
 *   when the manager is `Ready`
 * - **Serialized transitions**: one mutex guards the slot; initialize holds it
 *   across acquire and inline destroy holds it across release
 * - **Local rejection**: calls that are invalid for the current state never
 *   reach the subsystem
 * - **Terminal destroy**: whatever release reports, the manager ends up
 *   `Destroyed` and the handle is gone
 * - **Deferred destroy**: a bounded destroy that cannot take the slot in time
 *   marks the manager destroyed and returns; whoever next finds the slot free
 *   hands the handle to the teardown worker
 *
 * # Example
 *
 * ```ignore
 * let manager = LifecycleManager::new(TenseDevice::default());
 * manager.initialize()?;
 * let report = manager.health_check()?;
 * manager.destroy()?;
 * ```
 */

use super::state::{LifecycleState, Operation, Teardown};
use crate::core::config::LifecycleConfig;
use crate::core::errors::{LifecycleError, LifecycleResult};
use crate::core::guard::TimeoutPolicy;
use crate::core::limits::TEARDOWN_THREAD_NAME;
use crate::monitoring::LifecycleSpan;
use crate::subsystem::{HealthReport, Subsystem};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

enum Slot<H> {
    Uninitialized,
    Ready(H),
    Destroyed,
}

impl<H> Slot<H> {
    #[inline]
    fn state(&self) -> LifecycleState {
        match self {
            Self::Uninitialized => LifecycleState::Uninitialized,
            Self::Ready(_) => LifecycleState::Ready,
            Self::Destroyed => LifecycleState::Destroyed,
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    initialize_attempts: AtomicU64,
    initialize_failures: AtomicU64,
    health_checks: AtomicU64,
    rejected_calls: AtomicU64,
    destroy_failures: AtomicU64,
}

/// Counters describing how a manager has been used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleStats {
    pub initialize_attempts: u64,
    pub initialize_failures: u64,
    pub health_checks: u64,
    pub rejected_calls: u64,
    pub destroy_failures: u64,
}

/// Owner of at most one subsystem handle
pub struct LifecycleManager<S: Subsystem> {
    id: Uuid,
    subsystem: Arc<S>,
    slot: Mutex<Slot<S::Handle>>,
    /// Set by a bounded destroy that gave up waiting for the slot; the
    /// manager reads as `Destroyed` from then on
    destroy_requested: AtomicBool,
    config: LifecycleConfig,
    stats: AtomicStats,
}

impl<S: Subsystem> LifecycleManager<S> {
    pub fn new(subsystem: S) -> Self {
        Self::with_config(subsystem, LifecycleConfig::default())
    }

    pub fn with_config(subsystem: S, config: LifecycleConfig) -> Self {
        let id = Uuid::new_v4();
        debug!(manager = %id, subsystem = subsystem.name(), "lifecycle manager created");
        Self {
            id,
            subsystem: Arc::new(subsystem),
            slot: Mutex::new(Slot::Uninitialized),
            destroy_requested: AtomicBool::new(false),
            config,
            stats: AtomicStats::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn subsystem(&self) -> &S {
        &self.subsystem
    }

    #[inline]
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        if self.is_destroy_requested() {
            return LifecycleState::Destroyed;
        }
        let state = self.slot.lock().state();
        self.settle_pending_destroy();
        self.observed(state)
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state() == LifecycleState::Ready
    }

    pub fn stats(&self) -> LifecycleStats {
        LifecycleStats {
            initialize_attempts: self.stats.initialize_attempts.load(Ordering::Relaxed),
            initialize_failures: self.stats.initialize_failures.load(Ordering::Relaxed),
            health_checks: self.stats.health_checks.load(Ordering::Relaxed),
            rejected_calls: self.stats.rejected_calls.load(Ordering::Relaxed),
            destroy_failures: self.stats.destroy_failures.load(Ordering::Relaxed),
        }
    }

    /// Acquire the handle
    ///
    /// Only valid while `Uninitialized`. A failure leaves the manager
    /// `Uninitialized` with nothing held, so the host may try again.
    pub fn initialize(&self) -> LifecycleResult<()> {
        let span = self.span(Operation::Initialize);
        let _entered = span.enter();

        let result = self.initialize_locked(&span);
        self.settle_pending_destroy();
        result
    }

    fn initialize_locked(&self, span: &LifecycleSpan) -> LifecycleResult<()> {
        if self.is_destroy_requested() {
            return Err(self.reject(span, Operation::Initialize, LifecycleState::Destroyed));
        }

        let mut slot = self.slot.lock();
        let state = self.observed(slot.state());
        if !state.accepts(Operation::Initialize) {
            return Err(self.reject(span, Operation::Initialize, state));
        }

        self.stats.initialize_attempts.fetch_add(1, Ordering::Relaxed);

        match self.subsystem.acquire() {
            Ok(handle) => {
                *slot = Slot::Ready(handle);

                // A bounded destroy gave up while we were acquiring; the
                // handle is released as soon as the slot unlocks
                if self.is_destroy_requested() {
                    let destroyed = LifecycleState::Destroyed;
                    return Err(self.reject(span, Operation::Initialize, destroyed));
                }

                span.record_state(LifecycleState::Ready);
                info!(
                    manager = %self.id,
                    subsystem = self.subsystem.name(),
                    "resource initialized"
                );
                Ok(())
            }
            Err(e) => {
                self.stats.initialize_failures.fetch_add(1, Ordering::Relaxed);
                span.record_error(LifecycleState::Uninitialized, &e);
                warn!(
                    manager = %self.id,
                    subsystem = self.subsystem.name(),
                    error = %e,
                    "resource initialization failed"
                );
                Err(LifecycleError::InitializationFailure(e.to_string()))
            }
        }
    }

    /// Probe the subsystem through the handle
    ///
    /// Rejected without forwarding unless `Ready`.
    pub fn health_check(&self) -> LifecycleResult<HealthReport> {
        let span = self.span(Operation::HealthCheck);
        let _entered = span.enter();

        let result = self.health_check_locked(&span);
        self.settle_pending_destroy();
        result
    }

    fn health_check_locked(&self, span: &LifecycleSpan) -> LifecycleResult<HealthReport> {
        if self.is_destroy_requested() {
            return Err(self.reject(span, Operation::HealthCheck, LifecycleState::Destroyed));
        }

        let mut slot = self.slot.lock();
        let state = self.observed(slot.state());
        let handle = match &mut *slot {
            Slot::Ready(handle) if state == LifecycleState::Ready => handle,
            _ => return Err(self.reject(span, Operation::HealthCheck, state)),
        };

        self.stats.health_checks.fetch_add(1, Ordering::Relaxed);

        let started = Instant::now();
        let probe = self.subsystem.probe(handle);
        let report = HealthReport::from_probe(
            self.subsystem.name(),
            probe,
            started.elapsed(),
            self.config.health_latency_threshold,
        );

        span.record_state(LifecycleState::Ready);
        if report.is_healthy() {
            debug!(manager = %self.id, latency_us = report.latency_us, "health check passed");
        } else {
            warn!(manager = %self.id, status = %report.status, "health check reported a problem");
        }
        Ok(report)
    }

    /// Run `f` against the handle while `Ready`
    pub fn with_handle<R, F>(&self, f: F) -> LifecycleResult<R>
    where
        F: FnOnce(&mut S::Handle) -> R,
    {
        let span = self.span(Operation::Access);
        let _entered = span.enter();

        let result = self.with_handle_locked(&span, f);
        self.settle_pending_destroy();
        result
    }

    fn with_handle_locked<R, F>(&self, span: &LifecycleSpan, f: F) -> LifecycleResult<R>
    where
        F: FnOnce(&mut S::Handle) -> R,
    {
        if self.is_destroy_requested() {
            return Err(self.reject(span, Operation::Access, LifecycleState::Destroyed));
        }

        let mut slot = self.slot.lock();
        let state = self.observed(slot.state());
        match &mut *slot {
            Slot::Ready(handle) if state == LifecycleState::Ready => {
                let result = f(handle);
                span.record_state(LifecycleState::Ready);
                Ok(result)
            }
            _ => Err(self.reject(span, Operation::Access, state)),
        }
    }

    /// Tear down, honoring the configured destroy timeout
    ///
    /// Never fails because of state: destroying an uninitialized or already
    /// destroyed manager is a no-op that reports what it skipped.
    pub fn destroy(&self) -> LifecycleResult<Teardown> {
        self.destroy_within(self.config.destroy_timeout)
    }

    /// Tear down with an explicit deadline
    ///
    /// With `TimeoutPolicy::None` the release runs inline. Otherwise the
    /// deadline covers both waiting for in-flight calls and the release
    /// itself:
    /// - if the slot stays busy past the deadline, the manager is marked
    ///   destroyed and whichever call holds the slot releases the handle
    ///   when it finishes
    /// - once the slot is won, the manager becomes `Destroyed` and the
    ///   release runs on a worker thread that finishes in the background if
    ///   it misses the deadline
    ///
    /// Either way a late teardown returns `Timeout`.
    pub fn destroy_within(&self, policy: TimeoutPolicy) -> LifecycleResult<Teardown> {
        let span = self.span(Operation::Destroy);
        let _entered = span.enter();
        let started = Instant::now();

        let result = self.destroy_locked(policy, started);
        self.record_teardown(&span, &result);
        result
    }

    fn destroy_locked(&self, policy: TimeoutPolicy, started: Instant) -> LifecycleResult<Teardown> {
        if self.is_destroy_requested() {
            self.settle_pending_destroy();
            return Ok(self.skip_teardown(LifecycleState::Destroyed));
        }

        let Some(limit) = policy.duration() else {
            let mut slot = self.slot.lock();
            return match std::mem::replace(&mut *slot, Slot::Destroyed) {
                Slot::Ready(handle) => self.finish_release(self.subsystem.release(handle)),
                other => Ok(self.skip_teardown(other.state())),
            };
        };

        let Some(mut slot) = self.slot.try_lock_for(limit) else {
            self.destroy_requested.store(true, Ordering::SeqCst);
            self.settle_pending_destroy();
            self.stats.destroy_failures.fetch_add(1, Ordering::Relaxed);
            warn!(manager = %self.id, "slot busy past the destroy deadline; teardown deferred");
            return Err(timeout(limit));
        };

        let previous = std::mem::replace(&mut *slot, Slot::Destroyed);
        drop(slot);

        match previous {
            Slot::Ready(handle) => {
                let wait = policy.remaining(started).unwrap_or(Duration::ZERO);
                self.release_bounded(handle, limit, wait)
            }
            other => Ok(self.skip_teardown(other.state())),
        }
    }

    fn release_bounded(
        &self,
        handle: S::Handle,
        limit: Duration,
        wait: Duration,
    ) -> LifecycleResult<Teardown> {
        let rx = match self.spawn_teardown(handle) {
            Ok(rx) => rx,
            Err(e) => {
                // The closure, and the handle with it, was dropped with the failed spawn
                self.stats.destroy_failures.fetch_add(1, Ordering::Relaxed);
                return Err(LifecycleError::DestructionFailure(format!(
                    "could not start teardown worker: {}",
                    e
                )));
            }
        };

        match rx.recv_timeout(wait) {
            Ok(Ok(())) => Ok(Teardown::Released),
            Ok(Err(reason)) => {
                self.stats.destroy_failures.fetch_add(1, Ordering::Relaxed);
                Err(LifecycleError::DestructionFailure(reason))
            }
            Err(flume::RecvTimeoutError::Timeout) => {
                self.stats.destroy_failures.fetch_add(1, Ordering::Relaxed);
                Err(timeout(limit))
            }
            Err(flume::RecvTimeoutError::Disconnected) => {
                self.stats.destroy_failures.fetch_add(1, Ordering::Relaxed);
                Err(LifecycleError::DestructionFailure(
                    "teardown worker exited without reporting".to_string(),
                ))
            }
        }
    }

    /// Release `handle` on a named worker thread
    ///
    /// The outcome is sent back once; if nobody is listening any more the
    /// worker logs it instead.
    fn spawn_teardown(
        &self,
        handle: S::Handle,
    ) -> std::io::Result<flume::Receiver<Result<(), String>>> {
        let (tx, rx) = flume::bounded(1);
        let subsystem = Arc::clone(&self.subsystem);
        let manager = self.id;

        std::thread::Builder::new()
            .name(TEARDOWN_THREAD_NAME.to_string())
            .spawn(move || {
                let result = subsystem.release(handle).map_err(|e| e.to_string());
                if let Err(flume::SendError(result)) = tx.send(result) {
                    match result {
                        Ok(()) => {
                            debug!(%manager, "teardown finished after the caller stopped waiting")
                        }
                        Err(reason) => {
                            error!(%manager, error = %reason, "background teardown failed")
                        }
                    }
                }
            })?;

        Ok(rx)
    }

    /// Finish a destroy that timed out waiting for the slot
    ///
    /// Runs after every unlock. Whoever finds the slot free once the request
    /// is set moves the handle out and hands it to a teardown worker.
    fn settle_pending_destroy(&self) {
        if !self.is_destroy_requested() {
            return;
        }
        let Some(mut slot) = self.slot.try_lock() else {
            return;
        };
        let previous = std::mem::replace(&mut *slot, Slot::Destroyed);
        drop(slot);

        if let Slot::Ready(handle) = previous {
            debug!(manager = %self.id, "releasing handle for a deferred destroy");
            if let Err(e) = self.spawn_teardown(handle) {
                error!(manager = %self.id, error = %e, "could not start deferred teardown");
            }
        }
    }

    #[inline]
    fn is_destroy_requested(&self) -> bool {
        self.destroy_requested.load(Ordering::SeqCst)
    }

    #[inline]
    fn observed(&self, state: LifecycleState) -> LifecycleState {
        if self.is_destroy_requested() {
            LifecycleState::Destroyed
        } else {
            state
        }
    }

    fn finish_release(&self, result: Result<(), S::Error>) -> LifecycleResult<Teardown> {
        result.map(|()| Teardown::Released).map_err(|e| {
            self.stats.destroy_failures.fetch_add(1, Ordering::Relaxed);
            LifecycleError::DestructionFailure(e.to_string())
        })
    }

    fn skip_teardown(&self, previous: LifecycleState) -> Teardown {
        match previous {
            LifecycleState::Destroyed => {
                debug!(manager = %self.id, "destroy called again; already destroyed");
                Teardown::AlreadyDestroyed
            }
            _ => {
                debug!(manager = %self.id, "destroy before initialize; nothing held");
                Teardown::NothingHeld
            }
        }
    }

    fn record_teardown(&self, span: &LifecycleSpan, result: &LifecycleResult<Teardown>) {
        match result {
            Ok(teardown) => {
                span.record_state(LifecycleState::Destroyed);
                if teardown.released() {
                    info!(
                        manager = %self.id,
                        subsystem = self.subsystem.name(),
                        "resource destroyed"
                    );
                }
            }
            Err(e) => {
                span.record_error(LifecycleState::Destroyed, e);
                error!(manager = %self.id, error = %e, "resource destruction failed");
            }
        }
    }

    fn reject(
        &self,
        span: &LifecycleSpan,
        operation: Operation,
        state: LifecycleState,
    ) -> LifecycleError {
        self.stats.rejected_calls.fetch_add(1, Ordering::Relaxed);
        let err = LifecycleError::InvalidStateCall { operation, state };
        span.record_error(state, &err);
        warn!(manager = %self.id, %operation, %state, "rejected call in invalid state");
        err
    }

    #[inline]
    fn span(&self, operation: Operation) -> LifecycleSpan {
        LifecycleSpan::new(self.subsystem.name(), operation, &self.id)
    }
}

fn timeout(limit: Duration) -> LifecycleError {
    LifecycleError::Timeout {
        operation: Operation::Destroy,
        timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
    }
}

impl<S: Subsystem> Drop for LifecycleManager<S> {
    fn drop(&mut self) {
        if let Slot::Ready(handle) = std::mem::replace(self.slot.get_mut(), Slot::Destroyed) {
            warn!(manager = %self.id, "manager dropped while ready; releasing handle");
            if let Err(e) = self.subsystem.release(handle) {
                error!(manager = %self.id, error = %e, "release on drop failed");
            }
        }
    }
}
