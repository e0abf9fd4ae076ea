//! Typed dynamic WebAssembly functions.
//!
//! A [`DynFn`] pairs a fluent instruction body with a signature inferred
//! from its type parameters: `DynFn<(i32, i32), i32>` is a two-argument
//! i32 function. `finalize` encodes a complete module, validates it,
//! instantiates it under `wasmi`, and returns a reusable [`CompiledFn`].
//!
//! # Architecture
//!
//! The definition owns a module shell from `quill-emit`; finalize exports
//! the body as `__invoke`, embeds a JSON build manifest, and resolves both
//! the entry point and the fault probe as typed functions. A failed call
//! classifies by reading the probe first — raises and checked overflows
//! reach the engine as plain traps, and only the fault register can tell
//! them apart — then falls back to the engine's trap code for native
//! faults such as integer division by zero.
//!
//! ## Exports
//!
//! - `__invoke` — the finalized entry point
//! - `__fault_code` — read-and-clear fault probe
//! - `memory` — linear memory, when the body interns text literals

pub mod dynfn;
pub mod error;
pub mod host;
pub mod manifest;
pub mod sig;

pub use dynfn::{CompiledFn, DynFn, INVOKE_EXPORT};
pub use error::{FinalizeError, FinalizeResult, InvokeError, InvokeResult};
pub use host::HostHeap;
pub use manifest::{Manifest, MANIFEST_SECTION};
pub use sig::{ParamList, RetValue, WasmAbi};

pub use quill_emit::{
    Body, BodyExt, ConstVal, EmitError, FuncRef, GlobalRef, Label, Local, ModuleBuilder, Tag,
    TypeRef, ValType,
};
