/*!
 * Bounded Teardown Tests
 */

use crate::common::FakeSubsystem;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tense_lifecycle::{
    LifecycleConfig, LifecycleError, LifecycleManager, LifecycleState, Operation, Teardown,
    TimeoutPolicy,
};

#[test]
fn test_slow_release_times_out() {
    let fake = FakeSubsystem::new().with_release_delay(Duration::from_millis(200));
    let manager = LifecycleManager::new(fake.clone());
    manager.initialize().unwrap();

    let started = Instant::now();
    let err = manager
        .destroy_within(TimeoutPolicy::Deadline(Duration::from_millis(20)))
        .unwrap_err();

    assert_eq!(
        err,
        LifecycleError::Timeout {
            operation: Operation::Destroy,
            timeout_ms: 20,
        }
    );
    assert!(started.elapsed() < Duration::from_millis(200));

    // Destroyed right away even though the release is still running
    assert_eq!(manager.state(), LifecycleState::Destroyed);
    assert!(manager.health_check().unwrap_err().is_rejection());

    assert!(fake.wait_for_releases(1, Duration::from_secs(2)));
    assert_eq!(fake.live(), 0);
    assert_eq!(manager.stats().destroy_failures, 1);
}

#[test]
fn test_configured_destroy_timeout() {
    let fake = FakeSubsystem::new().with_release_delay(Duration::from_millis(150));
    let deadline = TimeoutPolicy::Deadline(Duration::from_millis(10));
    let config = LifecycleConfig::default().with_destroy_timeout(deadline);
    let manager = LifecycleManager::with_config(fake.clone(), config);
    manager.initialize().unwrap();

    let err = manager.destroy().unwrap_err();
    assert!(matches!(err, LifecycleError::Timeout { .. }));
    assert!(err.to_string().contains("10"));

    assert_eq!(manager.destroy().unwrap(), Teardown::AlreadyDestroyed);
    assert!(fake.wait_for_releases(1, Duration::from_secs(2)));
}

#[test]
fn test_fast_release_within_deadline() {
    let fake = FakeSubsystem::new();
    let manager = LifecycleManager::new(fake.clone());
    manager.initialize().unwrap();

    let teardown = manager
        .destroy_within(TimeoutPolicy::Deadline(Duration::from_secs(2)))
        .unwrap();
    assert_eq!(teardown, Teardown::Released);
    assert_eq!(fake.released(), 1);
}

#[test]
fn test_bounded_release_failure_is_reported() {
    let fake = FakeSubsystem::new().failing_releases();
    let manager = LifecycleManager::new(fake.clone());
    manager.initialize().unwrap();

    let err = manager
        .destroy_within(TimeoutPolicy::Deadline(Duration::from_secs(2)))
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::DestructionFailure(ref reason) if reason.contains("release refused")
    ));
    assert_eq!(manager.state(), LifecycleState::Destroyed);
}

#[test]
fn test_bounded_destroy_without_handle_skips_worker() {
    let fake = FakeSubsystem::new();
    let manager = LifecycleManager::new(fake.clone());

    let teardown = manager
        .destroy_within(TimeoutPolicy::Deadline(Duration::from_millis(1)))
        .unwrap();
    assert_eq!(teardown, Teardown::NothingHeld);
    assert_eq!(fake.released(), 0);
}

#[test]
fn test_bounded_destroy_does_not_wait_for_slow_health_check() {
    let fake = FakeSubsystem::new().with_probe_delay(Duration::from_millis(600));
    let manager = Arc::new(LifecycleManager::new(fake.clone()));
    manager.initialize().unwrap();

    let checker = {
        let manager = manager.clone();
        thread::spawn(move || manager.health_check())
    };

    // Give the probe time to start and take the slot
    thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    let err = manager
        .destroy_within(TimeoutPolicy::Deadline(Duration::from_millis(20)))
        .unwrap_err();
    assert!(started.elapsed() < Duration::from_millis(300));
    assert_eq!(
        err,
        LifecycleError::Timeout {
            operation: Operation::Destroy,
            timeout_ms: 20,
        }
    );

    // Destroyed for every caller from here on, without waiting for the probe
    let started = Instant::now();
    assert_eq!(manager.state(), LifecycleState::Destroyed);
    assert!(manager.health_check().unwrap_err().is_rejection());
    assert!(manager.with_handle(|h| h.id).unwrap_err().is_rejection());
    assert!(started.elapsed() < Duration::from_millis(300));

    // The probe already in flight completes, then its caller hands off the handle
    assert!(checker.join().unwrap().is_ok());
    assert!(fake.wait_for_releases(1, Duration::from_secs(2)));
    assert_eq!(fake.live(), 0);
    assert_eq!(fake.probes(), 1);

    assert_eq!(manager.destroy().unwrap(), Teardown::AlreadyDestroyed);
    assert_eq!(fake.released(), 1);
}

#[test]
fn test_bounded_destroy_does_not_wait_for_slow_access() {
    let fake = FakeSubsystem::new();
    let manager = Arc::new(LifecycleManager::new(fake.clone()));
    manager.initialize().unwrap();

    let user = {
        let manager = manager.clone();
        thread::spawn(move || {
            manager.with_handle(|h| {
                thread::sleep(Duration::from_millis(400));
                h.id
            })
        })
    };

    thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    let err = manager
        .destroy_within(TimeoutPolicy::Deadline(Duration::from_millis(20)))
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Timeout { .. }));
    assert!(started.elapsed() < Duration::from_millis(300));
    assert!(manager.initialize().unwrap_err().is_rejection());

    assert!(user.join().unwrap().is_ok());
    assert!(fake.wait_for_releases(1, Duration::from_secs(2)));
    assert_eq!(fake.live(), 0);
}

#[test]
fn test_dropping_manager_after_deferred_destroy_releases_once() {
    let fake = FakeSubsystem::new().with_probe_delay(Duration::from_millis(300));
    let manager = Arc::new(LifecycleManager::new(fake.clone()));
    manager.initialize().unwrap();

    let checker = {
        let manager = manager.clone();
        thread::spawn(move || manager.health_check().is_ok())
    };
    thread::sleep(Duration::from_millis(50));

    assert!(manager
        .destroy_within(TimeoutPolicy::Deadline(Duration::from_millis(10)))
        .is_err());
    assert!(checker.join().unwrap());
    drop(manager);

    // Either the deferred teardown or the drop releases; the fake panics on a second release
    assert!(fake.wait_for_releases(1, Duration::from_secs(2)));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(fake.released(), 1);
    assert_eq!(fake.live(), 0);
}
