/*!
 * Shared test fixtures
 *
 * A counting in-memory subsystem that panics on double release.
 */

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tense_lifecycle::{HealthStatus, Probe, Subsystem};

#[derive(Debug, thiserror::Error)]
#[error("fake subsystem failure: {0}")]
pub struct FakeError(pub &'static str);

#[derive(Debug)]
pub struct FakeHandle {
    pub id: usize,
}

struct FakeInner {
    next_id: AtomicUsize,
    acquired: AtomicUsize,
    released: AtomicUsize,
    probes: AtomicUsize,
    failing_acquires: AtomicUsize,
    fail_release: AtomicBool,
    release_delay: Mutex<Duration>,
    probe_delay: Mutex<Duration>,
    status: Mutex<HealthStatus>,
    live: Mutex<HashSet<usize>>,
}

#[derive(Clone)]
pub struct FakeSubsystem {
    inner: Arc<FakeInner>,
}

impl FakeSubsystem {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FakeInner {
                next_id: AtomicUsize::new(1),
                acquired: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
                probes: AtomicUsize::new(0),
                failing_acquires: AtomicUsize::new(0),
                fail_release: AtomicBool::new(false),
                release_delay: Mutex::new(Duration::ZERO),
                probe_delay: Mutex::new(Duration::ZERO),
                status: Mutex::new(HealthStatus::Healthy),
                live: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// The next `count` acquires fail
    pub fn failing_acquires(self, count: usize) -> Self {
        self.inner.failing_acquires.store(count, Ordering::SeqCst);
        self
    }

    pub fn failing_releases(self) -> Self {
        self.inner.fail_release.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_release_delay(self, delay: Duration) -> Self {
        *self.inner.release_delay.lock() = delay;
        self
    }

    pub fn with_probe_delay(self, delay: Duration) -> Self {
        *self.inner.probe_delay.lock() = delay;
        self
    }

    pub fn with_status(self, status: HealthStatus) -> Self {
        *self.inner.status.lock() = status;
        self
    }

    pub fn acquired(&self) -> usize {
        self.inner.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.inner.released.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.inner.probes.load(Ordering::SeqCst)
    }

    /// Handles acquired and not yet released
    pub fn live(&self) -> usize {
        self.inner.live.lock().len()
    }

    /// Poll until `released() >= count` or the deadline passes
    pub fn wait_for_releases(&self, count: usize, deadline: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if self.released() >= count {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        self.released() >= count
    }
}

impl Subsystem for FakeSubsystem {
    type Handle = FakeHandle;
    type Error = FakeError;

    fn name(&self) -> &'static str {
        "fake"
    }

    fn acquire(&self) -> Result<FakeHandle, FakeError> {
        let failing = self
            .inner
            .failing_acquires
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(FakeError("acquire refused"));
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.acquired.fetch_add(1, Ordering::SeqCst);
        self.inner.live.lock().insert(id);
        Ok(FakeHandle { id })
    }

    fn probe(&self, handle: &mut FakeHandle) -> Probe {
        assert!(
            self.inner.live.lock().contains(&handle.id),
            "probe through released handle {}",
            handle.id
        );
        self.inner.probes.fetch_add(1, Ordering::SeqCst);

        let delay = *self.inner.probe_delay.lock();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        Probe::with_status(self.inner.status.lock().clone())
    }

    fn release(&self, handle: FakeHandle) -> Result<(), FakeError> {
        let delay = *self.inner.release_delay.lock();
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        assert!(
            self.inner.live.lock().remove(&handle.id),
            "double release of handle {}",
            handle.id
        );
        self.inner.released.fetch_add(1, Ordering::SeqCst);

        if self.inner.fail_release.load(Ordering::SeqCst) {
            return Err(FakeError("release refused"));
        }
        Ok(())
    }
}
