//! Error types for the mid-end.
//!
//! Per the error handling design, two domains exist:
//!
//! - [`FrontendError`] — recoverable, user-visible diagnostics raised while
//!   lowering source to IR. Lowering keeps going after one is raised (the
//!   caller taints the session and suppresses code emission later); the
//!   message format is `<lineno>: <msg>`.
//! - [`Fatal`] — irrecoverable: an IR well-formedness violation, a pass
//!   invariant violation, or resource exhaustion during register
//!   allocation. These indicate a bug in the compiler itself, not the
//!   input program, and abort the pipeline.

use thiserror::Error;

/// A recoverable, user-visible diagnostic produced while lowering source
/// to IR.
///
/// **Triggered by:** undefined symbols, type mismatches, non-constant
/// expressions in constant context, non-integer array sizes, redefinitions,
/// and `break`/`continue` outside a loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{line}: {message}")]
pub struct FrontendError {
    /// Source line the diagnostic refers to.
    pub line: u32,
    /// Human-readable description.
    pub message: String,
}

impl FrontendError {
    /// Build a diagnostic at the given source line.
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// An irrecoverable internal error: the compiler violated one of its own
/// invariants. There is no sensible way to continue compilation after one
/// of these; the driver should print the detail and abort.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fatal {
    /// The IR failed a well-formedness check (§3 invariants): an unknown
    /// jump type, an allocation outside the entry block, a phi in the
    /// entry block, or a temporary with more than one definition.
    ///
    /// **Triggered by:** a builder or pass producing IR that does not
    /// satisfy the data-model invariants.
    #[error("IR is not well-formed: {0}")]
    NotWellFormed(String),

    /// A pass observed IR that violates a precondition it documented
    /// (e.g. block merging found a predecessor with phis, or copy
    /// propagation found a temporary with more than one definition).
    ///
    /// **Triggered by:** running a pass on IR for which its prerequisite
    /// analyses were not (re)computed, or whose invariants were violated
    /// by an earlier pass.
    #[error("pass invariant violated: {0}")]
    PassInvariantViolated(String),

    /// Register allocation could not place a required temporary in
    /// either register bank and spilling does not apply (the temporary is
    /// pinned, e.g. a pre-allocated argument register).
    ///
    /// **Triggered by:** a function whose register pressure exceeds what
    /// the target register banks and the spill mechanism can express.
    #[error("register allocation exhausted: {0}")]
    RegisterAllocationExhausted(String),
}

/// Result alias for fallible mid-end operations.
pub type Result<T> = std::result::Result<T, Fatal>;
