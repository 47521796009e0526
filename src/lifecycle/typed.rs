/*!
 * Typed Lifecycle
 *
 * Compile-time variant of the lifecycle for hosts that own the resource from
 * a single place. The state is a type parameter, so health checks before
 * initialize or after destroy do not compile.
 */

use super::state::{LifecycleState, Teardown};
use crate::core::config::LifecycleConfig;
use crate::core::errors::{LifecycleError, LifecycleResult};
use crate::subsystem::{HealthReport, Subsystem};
use std::time::Instant;

/// Marker trait for lifecycle type states
pub trait TypedState: Send {
    /// Runtime equivalent of this state
    fn state() -> LifecycleState;
}

/// Type states
pub mod states {
    /// No handle yet
    pub struct Uninitialized;

    /// Handle acquired and owned by the state itself
    pub struct Ready<H>(pub(super) H);

    /// Terminal; nothing can be done
    pub struct Destroyed;
}

impl TypedState for states::Uninitialized {
    fn state() -> LifecycleState {
        LifecycleState::Uninitialized
    }
}

impl<H: Send> TypedState for states::Ready<H> {
    fn state() -> LifecycleState {
        LifecycleState::Ready
    }
}

impl TypedState for states::Destroyed {
    fn state() -> LifecycleState {
        LifecycleState::Destroyed
    }
}

/// Lifecycle whose state is tracked by the type system
///
/// # Example
///
/// ```ignore
/// let lifecycle = TypedLifecycle::new(TenseDevice::default());
/// let mut ready = lifecycle.initialize().map_err(|(_, e)| e)?;
/// let report = ready.health_check();
/// let (_destroyed, result) = ready.destroy();
/// ```
///
/// `Subsystem::release` only runs through `destroy`. A `Ready` lifecycle that
/// is dropped instead just drops its handle, so a release error is never seen.
#[must_use = "a ready lifecycle dropped without destroy never calls Subsystem::release"]
pub struct TypedLifecycle<S: Subsystem, St: TypedState> {
    subsystem: S,
    config: LifecycleConfig,
    state: St,
}

impl<S: Subsystem, St: TypedState> TypedLifecycle<S, St> {
    /// Runtime view of the current state
    pub fn state(&self) -> LifecycleState {
        St::state()
    }

    pub fn subsystem(&self) -> &S {
        &self.subsystem
    }

    fn into_state<Next: TypedState>(self, next: Next) -> TypedLifecycle<S, Next> {
        debug_assert!(St::state().can_transition_to(Next::state()));
        TypedLifecycle {
            subsystem: self.subsystem,
            config: self.config,
            state: next,
        }
    }
}

impl<S: Subsystem> TypedLifecycle<S, states::Uninitialized> {
    pub fn new(subsystem: S) -> Self {
        Self::with_config(subsystem, LifecycleConfig::default())
    }

    pub fn with_config(subsystem: S, config: LifecycleConfig) -> Self {
        Self {
            subsystem,
            config,
            state: states::Uninitialized,
        }
    }

    /// Acquire the handle
    ///
    /// On failure the uninitialized lifecycle comes back with the error so
    /// the caller can retry.
    #[allow(clippy::type_complexity)]
    pub fn initialize(
        self,
    ) -> Result<TypedLifecycle<S, states::Ready<S::Handle>>, (Self, LifecycleError)> {
        match self.subsystem.acquire() {
            Ok(handle) => Ok(self.into_state(states::Ready(handle))),
            Err(e) => {
                let err = LifecycleError::InitializationFailure(e.to_string());
                Err((self, err))
            }
        }
    }

    /// Give up without ever acquiring
    pub fn destroy(self) -> TypedLifecycle<S, states::Destroyed> {
        self.into_state(states::Destroyed)
    }
}

impl<S: Subsystem> TypedLifecycle<S, states::Ready<S::Handle>> {
    pub fn handle(&self) -> &S::Handle {
        &self.state.0
    }

    pub fn handle_mut(&mut self) -> &mut S::Handle {
        &mut self.state.0
    }

    pub fn health_check(&mut self) -> HealthReport {
        let started = Instant::now();
        let probe = self.subsystem.probe(&mut self.state.0);
        HealthReport::from_probe(
            self.subsystem.name(),
            probe,
            started.elapsed(),
            self.config.health_latency_threshold,
        )
    }

    /// Release the handle; the result is `Destroyed` either way
    pub fn destroy(
        self,
    ) -> (
        TypedLifecycle<S, states::Destroyed>,
        LifecycleResult<Teardown>,
    ) {
        let TypedLifecycle {
            subsystem,
            config,
            state: states::Ready(handle),
        } = self;

        let result = subsystem
            .release(handle)
            .map(|()| Teardown::Released)
            .map_err(|e| LifecycleError::DestructionFailure(e.to_string()));

        let destroyed = TypedLifecycle {
            subsystem,
            config,
            state: states::Destroyed,
        };
        (destroyed, result)
    }
}

impl<S: Subsystem> TypedLifecycle<S, states::Destroyed> {
    pub fn into_subsystem(self) -> S {
        self.subsystem
    }
}
