/*!
 * Lifecycle Management
 *
 * Initialize, health-check and destroy a native resource under an explicit
 * state machine:
 *
 * ```text
 * Uninitialized --initialize() ok-----> Ready
 * Uninitialized --initialize() err----> Uninitialized
 * Ready         --health_check()------> Ready
 * Ready         --destroy()-----------> Destroyed
 * Uninitialized --destroy()-----------> Destroyed   (nothing held)
 * Destroyed     --anything------------> rejected / no-op
 * ```
 *
 * `LifecycleManager` enforces this at runtime and is safe to share across
 * threads. `TypedLifecycle` enforces it at compile time for single owners.
 */

mod manager;
mod state;
pub mod typed;

pub use manager::{LifecycleManager, LifecycleStats};
pub use state::{LifecycleState, Operation, Teardown};
pub use typed::TypedLifecycle;
