//! Shared tokens, constants, and the recorded instruction form.
//!
//! Every module emitted by this crate reserves a small fixed layout:
//!
//! ```text
//! global 0                  mutable i32 fault register, initially 0
//! export "__fault_code"     () -> i32 probe: returns the register, clears it
//! data at offset 8          interned text literals, tightly packed
//! ```
//!
//! User globals are numbered from 1, user data follows the literal pool, and
//! the fault register is written only by `raise` and the checked arithmetic
//! expansions.

use wasm_encoder::{ConstExpr, Instruction, ValType};

// ── Fault register ──

/// Register value meaning "no pending fault".
pub const FAULT_NONE: i32 = 0;
/// Register value stored by the built-in overflow tag.
pub const FAULT_OVERFLOW: i32 = 1;
/// First register value available to user tags.
pub const FAULT_USER_BASE: i32 = 16;

/// Index of the fault register in every emitted module.
pub const FAULT_GLOBAL: u32 = 0;

/// Export name of the read-and-clear fault probe.
pub const FAULT_PROBE_EXPORT: &str = "__fault_code";

/// Byte offset of the first interned text literal in linear memory.
pub const LITERAL_BASE: u32 = 8;

/// Default memory limits, in 64 KiB pages, when a body interns a literal
/// and no explicit memory was declared.
pub const DEFAULT_MEMORY_MIN: u64 = 1;
pub const DEFAULT_MEMORY_MAX: u64 = 256;

// ── Tokens ──

/// Opaque jump target.
///
/// Minted by [`Body::new_label`](crate::Body::new_label) before any use,
/// referenced forward or backward, and bound exactly once by
/// [`Body::mark`](crate::Body::mark). A label is meaningful only for the
/// body that minted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub(crate) u32);

/// Opaque local-variable token minted by
/// [`Body::new_local`](crate::Body::new_local).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Local(pub(crate) u32);

/// Raise tag routed by exception regions.
///
/// User tags derived with [`Tag::new`] occupy a reserved range above the
/// built-in tags, so the two can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(i32);

impl Tag {
    /// Tag raised by the overflow-checked arithmetic instructions.
    pub const OVERFLOW: Tag = Tag(FAULT_OVERFLOW);

    /// Derives a user tag. Distinct `n` produce distinct tags.
    pub const fn new(n: u16) -> Tag {
        Tag(FAULT_USER_BASE + n as i32)
    }

    /// The fault-register code this tag stores when raised.
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Reconstructs a tag from a fault-register code, as reported by the
    /// probe export after an uncaught raise.
    pub const fn from_code(code: i32) -> Tag {
        Tag(code)
    }
}

/// Reference to an imported or module-local function, minted by
/// [`ModuleBuilder`](crate::ModuleBuilder). Final indices are assigned at
/// `finish`, imports first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncRef(pub(crate) FuncSlot);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FuncSlot {
    Import(u32),
    Local(u32),
}

/// Reference to an interned function type, used by indirect calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRef(pub(crate) u32);

/// Reference to a user global. The fault register occupies index 0, so
/// user globals are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalRef(pub(crate) u32);

/// Initial value of a declared global.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstVal {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl ConstVal {
    pub(crate) fn val_type(self) -> ValType {
        match self {
            ConstVal::I32(_) => ValType::I32,
            ConstVal::I64(_) => ValType::I64,
            ConstVal::F32(_) => ValType::F32,
            ConstVal::F64(_) => ValType::F64,
        }
    }

    pub(crate) fn const_expr(self) -> ConstExpr {
        match self {
            ConstVal::I32(v) => ConstExpr::i32_const(v),
            ConstVal::I64(v) => ConstExpr::i64_const(v),
            ConstVal::F32(v) => ConstExpr::f32_const(v),
            ConstVal::F64(v) => ConstExpr::f64_const(v),
        }
    }
}

// ── Recorded instructions ──

/// One recorded instruction.
///
/// `Plain` carries its final encoding; every other variant references a
/// token or a region and resolves when the body is sealed.
#[derive(Debug, Clone)]
pub(crate) enum Op {
    Plain(Instruction<'static>),
    ArgGet(u32),
    ArgSet(u32),
    ArgTee(u32),
    LocalGet(Local),
    LocalSet(Local),
    LocalTee(Local),
    Br(Label),
    BrIf(Label),
    BrTable(Vec<Label>, Label),
    Mark(Label),
    StrConst(String),
    Call(FuncRef),
    Checked(CheckedOp),
    TryStart,
    Catch(Option<Tag>),
    TryEnd,
    Raise(Tag),
    Raw(Vec<u8>),
}

/// Selector for the overflow-checked arithmetic expansions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CheckedOp {
    AddI32 { signed: bool },
    SubI32 { signed: bool },
    AddI64 { signed: bool },
    SubI64 { signed: bool },
}
