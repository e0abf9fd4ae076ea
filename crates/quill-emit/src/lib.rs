//! Fluent emission of WebAssembly functions.
//!
//! A [`Body`] records instructions one fluent call at a time, with opaque
//! tokens standing in for jump targets, locals, functions, and types. A
//! [`ModuleBuilder`] collects bodies alongside imports, globals, memory,
//! tables, and custom sections, and `finish` produces validated module
//! bytes.
//!
//! # Architecture
//!
//! Recording is flat and unchecked: labels may be referenced before they
//! are marked, exception regions are plain start/catch/end calls, and an
//! overflow-checked add is a single recorded instruction. Sealing a body
//! lowers all of that to structured wasm — label scopes become
//! `block`/`loop` nests, regions route raises through the fault register,
//! checked arithmetic expands to test-and-raise — and reports the deferred
//! errors: unbound or re-marked labels, branch patterns that cannot nest,
//! malformed regions.
//!
//! ## Module layout
//!
//! Every finished module reserves global 0 as a mutable i32 fault register
//! and exports `"__fault_code"`, a probe that returns the pending fault
//! code and clears it. Text literals are packed into linear memory from
//! offset 8, and memory is exported as `"memory"` when present.

pub mod body;
pub mod composite;
pub mod error;
mod lower;
pub mod module;
pub mod ops;

pub use body::Body;
pub use composite::BodyExt;
pub use error::{EmitError, EmitResult};
pub use module::ModuleBuilder;
pub use ops::{
    ConstVal, FuncRef, GlobalRef, Label, Local, Tag, TypeRef, FAULT_NONE, FAULT_OVERFLOW,
    FAULT_PROBE_EXPORT, FAULT_USER_BASE,
};

pub use wasm_encoder::ValType;
