/*!
 * Typed Lifecycle Tests
 */

use crate::common::FakeSubsystem;
use pretty_assertions::assert_eq;
use tense_lifecycle::{HealthStatus, LifecycleError, LifecycleState, Teardown, TypedLifecycle};

#[test]
fn test_typed_flow_releases_once() {
    let fake = FakeSubsystem::new();
    let lifecycle = TypedLifecycle::new(fake.clone());

    let mut ready = match lifecycle.initialize() {
        Ok(ready) => ready,
        Err((_, e)) => panic!("initialize failed: {}", e),
    };
    assert_eq!(ready.state(), LifecycleState::Ready);
    assert_eq!(ready.health_check().status, HealthStatus::Healthy);
    assert_eq!(fake.live(), 1);

    let (destroyed, result) = ready.destroy();
    assert_eq!(result, Ok(Teardown::Released));
    assert_eq!(destroyed.state(), LifecycleState::Destroyed);
    assert_eq!(fake.live(), 0);
    assert_eq!(fake.probes(), 1);
}

#[test]
fn test_typed_failed_initialize_returns_lifecycle() {
    let fake = FakeSubsystem::new().failing_acquires(1);
    let lifecycle = TypedLifecycle::new(fake.clone());

    let (lifecycle, err) = match lifecycle.initialize() {
        Ok(_) => panic!("acquire should have been refused"),
        Err(pair) => pair,
    };
    assert!(matches!(err, LifecycleError::InitializationFailure(_)));
    assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);

    let destroyed = lifecycle.destroy();
    assert_eq!(destroyed.state(), LifecycleState::Destroyed);
    assert_eq!(fake.acquired(), 0);
    assert_eq!(fake.released(), 0);
}

#[test]
fn test_typed_handle_access() {
    let fake = FakeSubsystem::new();
    let lifecycle = TypedLifecycle::new(fake.clone());

    let mut ready = match lifecycle.initialize() {
        Ok(ready) => ready,
        Err((_, e)) => panic!("initialize failed: {}", e),
    };
    let id = ready.handle().id;
    assert_eq!(ready.handle_mut().id, id);

    let (destroyed, result) = ready.destroy();
    assert!(result.is_ok());
    assert_eq!(destroyed.into_subsystem().released(), 1);
}

#[test]
fn test_typed_release_only_through_destroy() {
    let fake = FakeSubsystem::new();

    let ready = match TypedLifecycle::new(fake.clone()).initialize() {
        Ok(ready) => ready,
        Err((_, e)) => panic!("initialize failed: {}", e),
    };
    assert_eq!(fake.acquired(), 1);
    drop(ready);

    // Dropping skips Subsystem::release entirely
    assert_eq!(fake.released(), 0);
    assert_eq!(fake.live(), 1);

    let ready = match TypedLifecycle::new(fake.clone()).initialize() {
        Ok(ready) => ready,
        Err((_, e)) => panic!("initialize failed: {}", e),
    };
    let (_destroyed, result) = ready.destroy();
    assert_eq!(result, Ok(Teardown::Released));
    assert_eq!(fake.released(), 1);
}
