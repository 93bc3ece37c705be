//! Failure taxonomy of the deduction engine.
//!
//! None of these surface to providers: every failure mode degrades to the
//! `any` type or a null lookup result at the engine boundary. The enum
//! exists so that internal plumbing and logging agree on the wording.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DeduceError {
    /// Name not found in scope or module; propagates as `any`/`None`.
    #[error("unresolvable reference '{0}'")]
    UnresolvableReference(String),

    /// Re-entrant evaluation of a node; the branch terminates silently.
    #[error("cycle detected while deducing '{0}'")]
    CycleDetected(String),

    /// Unmodeled operator or node kind. Not a bug.
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(&'static str),

    /// Unexpected internal failure; coerced to `any` at the boundary.
    #[error("internal deduction failure: {0}")]
    Internal(String),
}
