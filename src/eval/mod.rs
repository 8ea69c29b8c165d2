//! Auto-evaluation in front of the tool dispatcher.
//!
//! Every mutating call that names a project first reconciles that project's
//! task states and scans it for attention items. Results are memoized per
//! project for a TTL and admission is bounded by a semaphore.

mod middleware;
mod summary;

pub use middleware::{EvalError, Evaluation, EvaluatedTools, EvaluationMiddleware, READ_ONLY_OPERATIONS};
pub use summary::enhance_output;
