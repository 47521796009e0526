/*!
 * Monitoring
 * Structured logging and per-operation tracing
 */

mod tracer;

pub use tracer::{generate_trace_id, init_tracing, LifecycleSpan};
