/*!
 * Lifecycle Scenario Tests
 * Host-visible call sequences against a counting subsystem
 */

use crate::common::FakeSubsystem;
use pretty_assertions::assert_eq;
use std::time::Duration;
use tense_lifecycle::{
    HealthStatus, LifecycleConfig, LifecycleError, LifecycleManager, LifecycleState, Operation,
    Teardown,
};

#[test]
fn test_scenario_initialize_check_destroy() {
    let fake = FakeSubsystem::new();
    let manager = LifecycleManager::new(fake.clone());

    assert!(manager.initialize().is_ok());

    let report = manager.health_check().unwrap();
    assert_eq!(report.status, HealthStatus::Healthy);
    assert_eq!(report.subsystem, "fake");

    assert_eq!(manager.destroy().unwrap(), Teardown::Released);
    assert_eq!(manager.state(), LifecycleState::Destroyed);

    assert_eq!(fake.acquired(), 1);
    assert_eq!(fake.probes(), 1);
    assert_eq!(fake.released(), 1);
}

#[test]
fn test_scenario_failed_initialize() {
    let fake = FakeSubsystem::new().failing_acquires(1);
    let manager = LifecycleManager::new(fake.clone());

    let err = manager.initialize().unwrap_err();
    assert!(matches!(err, LifecycleError::InitializationFailure(_)));
    assert_eq!(manager.state(), LifecycleState::Uninitialized);

    let err = manager.health_check().unwrap_err();
    assert_eq!(
        err,
        LifecycleError::InvalidStateCall {
            operation: Operation::HealthCheck,
            state: LifecycleState::Uninitialized,
        }
    );
    assert_eq!(fake.probes(), 0);

    assert_eq!(manager.destroy().unwrap(), Teardown::NothingHeld);
    assert_eq!(manager.state(), LifecycleState::Destroyed);
    assert_eq!(fake.released(), 0);
}

#[test]
fn test_scenario_use_after_destroy() {
    let fake = FakeSubsystem::new();
    let manager = LifecycleManager::new(fake.clone());

    manager.initialize().unwrap();
    assert_eq!(manager.destroy().unwrap(), Teardown::Released);

    let err = manager.health_check().unwrap_err();
    assert_eq!(
        err,
        LifecycleError::InvalidStateCall {
            operation: Operation::HealthCheck,
            state: LifecycleState::Destroyed,
        }
    );

    assert_eq!(manager.destroy().unwrap(), Teardown::AlreadyDestroyed);
    assert_eq!(manager.state(), LifecycleState::Destroyed);
    assert_eq!(fake.released(), 1);
    assert_eq!(fake.probes(), 0);
}

#[test]
fn test_initialize_retry_is_independent() {
    let fake = FakeSubsystem::new().failing_acquires(2);
    let manager = LifecycleManager::new(fake.clone());

    assert!(manager.initialize().is_err());
    assert!(manager.initialize().is_err());
    assert_eq!(fake.live(), 0);

    manager.initialize().unwrap();
    assert_eq!(fake.acquired(), 1);
    assert_eq!(fake.live(), 1);

    let stats = manager.stats();
    assert_eq!(stats.initialize_attempts, 3);
    assert_eq!(stats.initialize_failures, 2);
}

#[test]
fn test_initialize_after_destroy_is_rejected() {
    let fake = FakeSubsystem::new();
    let manager = LifecycleManager::new(fake.clone());

    manager.destroy().unwrap();

    let err = manager.initialize().unwrap_err();
    assert!(err.is_rejection());
    assert_eq!(fake.acquired(), 0);
    assert_eq!(manager.state(), LifecycleState::Destroyed);
}

#[test]
fn test_failed_destroy_is_terminal() {
    let fake = FakeSubsystem::new().failing_releases();
    let manager = LifecycleManager::new(fake.clone());

    manager.initialize().unwrap();
    let err = manager.destroy().unwrap_err();
    assert!(matches!(err, LifecycleError::DestructionFailure(_)));
    assert_eq!(manager.state(), LifecycleState::Destroyed);

    // The fake panics on a second release of the same handle
    assert_eq!(manager.destroy().unwrap(), Teardown::AlreadyDestroyed);
    assert_eq!(fake.released(), 1);
}

#[test]
fn test_unhealthy_status_passes_through() {
    let status = HealthStatus::Unreachable {
        reason: "device went away".into(),
    };
    let fake = FakeSubsystem::new().with_status(status.clone());
    let manager = LifecycleManager::new(fake);

    manager.initialize().unwrap();
    let report = manager.health_check().unwrap();
    assert_eq!(report.status, status);

    // Still ready; deciding what to do is up to the host
    assert_eq!(manager.state(), LifecycleState::Ready);
}

#[test]
fn test_slow_probe_is_degraded() {
    let fake = FakeSubsystem::new().with_probe_delay(Duration::from_millis(20));
    let config =
        LifecycleConfig::default().with_health_latency_threshold(Duration::from_millis(1));
    let manager = LifecycleManager::with_config(fake, config);

    manager.initialize().unwrap();
    let report = manager.health_check().unwrap();
    assert_eq!(report.status.label(), "degraded");
    assert!(report.latency_us >= 20_000);
}

#[test]
fn test_drop_while_ready_releases() {
    let fake = FakeSubsystem::new();
    {
        let manager = LifecycleManager::new(fake.clone());
        manager.initialize().unwrap();
        assert_eq!(fake.live(), 1);
    }

    assert_eq!(fake.released(), 1);
    assert_eq!(fake.live(), 0);
}

#[test]
fn test_with_handle_forwards_only_when_ready() {
    let fake = FakeSubsystem::new();
    let manager = LifecycleManager::new(fake);

    assert!(manager.with_handle(|h| h.id).unwrap_err().is_rejection());

    manager.initialize().unwrap();
    let id = manager.with_handle(|h| h.id).unwrap();
    assert!(id > 0);

    manager.destroy().unwrap();
    assert!(manager.with_handle(|h| h.id).unwrap_err().is_rejection());
    assert_eq!(manager.stats().rejected_calls, 2);
}
