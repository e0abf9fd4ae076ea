use thiserror::Error;

use quill_emit::{EmitError, Tag};

/// Errors surfaced while finalizing a definition into a callable.
///
/// This is the deferred-error boundary: everything the fluent recorder
/// accepted on faith — unbound labels, branch patterns that cannot nest,
/// type-invalid instruction streams — reports from here.
#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error("host import `{name}` could not be registered: {reason}")]
    ImportRegistration { name: String, reason: String },

    #[error("engine rejected the module: {0}")]
    Engine(#[from] wasmi::Error),
}

/// Errors surfaced when calling a finalized function.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("integer division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("uncaught raise with {0:?}")]
    Raised(Tag),

    #[error("execution trapped: {0}")]
    Trap(wasmi::Error),
}

pub type FinalizeResult<T> = Result<T, FinalizeError>;
pub type InvokeResult<T> = Result<T, InvokeError>;
