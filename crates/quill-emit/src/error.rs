use thiserror::Error;

use crate::ops::Label;

/// Errors surfaced while sealing a body or finishing a module.
///
/// Label and region problems are deliberately deferred: the fluent recorder
/// accepts them silently and the seal reports them, so a body can reference
/// a label long before it is marked.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("{0:?} is referenced but never marked")]
    UnboundLabel(Label),

    #[error("{0:?} is marked more than once")]
    RemarkedLabel(Label),

    #[error("branches through {0:?} cannot be arranged into nested blocks")]
    IrreducibleFlow(Label),

    #[error("argument index {index} out of range for {arity} parameter(s)")]
    ArgOutOfRange { index: u32, arity: u32 },

    #[error("catch clause outside an exception region")]
    CatchOutsideRegion,

    #[error("try_end without a matching try_start")]
    UnmatchedTryEnd,

    #[error("exception region opened but never closed")]
    UnclosedRegion,

    #[error("exception region has no catch clause")]
    RegionWithoutCatch,

    #[error("WASM validation failed: {0}")]
    ValidationFailed(String),
}

pub type EmitResult<T> = Result<T, EmitError>;
