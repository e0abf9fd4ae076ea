//! The fluent instruction recorder.
//!
//! A [`Body`] is an append-only stream: every method records exactly one
//! logical instruction and returns `&mut Self`, so emission chains:
//!
//! ```
//! use quill_emit::Body;
//!
//! let mut b = Body::new();
//! b.arg_get(0).arg_get(1).i32_add().ret();
//! ```
//!
//! Jump targets and locals are opaque tokens minted before use. Nothing is
//! resolved while recording; labels, exception regions, checked arithmetic,
//! and text literals are lowered when the owning module is finished, and
//! report their errors there.

use wasm_encoder::{Instruction, MemArg, ValType};

use crate::ops::{CheckedOp, FuncRef, GlobalRef, Label, Local, Op, Tag, TypeRef};

/// Append-only instruction stream for one function body.
#[derive(Debug, Clone, Default)]
pub struct Body {
    pub(crate) ops: Vec<Op>,
    pub(crate) locals: Vec<ValType>,
    pub(crate) labels: u32,
}

impl Body {
    pub fn new() -> Body {
        Body::default()
    }

    fn push(&mut self, instr: Instruction<'static>) -> &mut Self {
        self.ops.push(Op::Plain(instr));
        self
    }

    fn op(&mut self, op: Op) -> &mut Self {
        self.ops.push(op);
        self
    }

    // ── Minting ──

    /// Mints a fresh jump target. The label may be referenced forward or
    /// backward and must be bound exactly once with [`mark`](Body::mark);
    /// violations surface when the module is finished.
    pub fn new_label(&mut self) -> Label {
        let l = Label(self.labels);
        self.labels += 1;
        l
    }

    /// Declares a local variable of the given type and returns its token.
    pub fn new_local(&mut self, ty: ValType) -> Local {
        let l = Local(self.locals.len() as u32);
        self.locals.push(ty);
        l
    }

    // ── Introspection ──

    /// Number of recorded instructions.
    pub fn instruction_count(&self) -> u32 {
        self.ops.len() as u32
    }

    /// Number of declared locals (excluding arguments).
    pub fn local_count(&self) -> u32 {
        self.locals.len() as u32
    }

    /// Number of minted labels.
    pub fn label_count(&self) -> u32 {
        self.labels
    }

    /// Total UTF-8 bytes of the text literals recorded so far.
    pub fn literal_bytes(&self) -> u32 {
        self.ops
            .iter()
            .map(|op| match op {
                Op::StrConst(s) => s.len() as u32,
                _ => 0,
            })
            .sum()
    }

    // ── Constants ──

    /// Pushes a 32-bit integer literal.
    pub fn i32_const(&mut self, v: i32) -> &mut Self {
        self.push(Instruction::I32Const(v))
    }

    /// Pushes a 64-bit integer literal.
    pub fn i64_const(&mut self, v: i64) -> &mut Self {
        self.push(Instruction::I64Const(v))
    }

    /// Pushes a 32-bit float literal.
    pub fn f32_const(&mut self, v: f32) -> &mut Self {
        self.push(Instruction::F32Const(v))
    }

    /// Pushes a 64-bit float literal.
    pub fn f64_const(&mut self, v: f64) -> &mut Self {
        self.push(Instruction::F64Const(v))
    }

    /// Interns a text literal in the module literal pool and pushes its
    /// (pointer, length) pair as two i32 values.
    pub fn str_const(&mut self, s: &str) -> &mut Self {
        self.op(Op::StrConst(s.to_string()))
    }

    // ── i32 arithmetic ──

    pub fn i32_add(&mut self) -> &mut Self {
        self.push(Instruction::I32Add)
    }

    pub fn i32_sub(&mut self) -> &mut Self {
        self.push(Instruction::I32Sub)
    }

    pub fn i32_mul(&mut self) -> &mut Self {
        self.push(Instruction::I32Mul)
    }

    pub fn i32_div_s(&mut self) -> &mut Self {
        self.push(Instruction::I32DivS)
    }

    pub fn i32_div_u(&mut self) -> &mut Self {
        self.push(Instruction::I32DivU)
    }

    pub fn i32_rem_s(&mut self) -> &mut Self {
        self.push(Instruction::I32RemS)
    }

    pub fn i32_rem_u(&mut self) -> &mut Self {
        self.push(Instruction::I32RemU)
    }

    pub fn i32_and(&mut self) -> &mut Self {
        self.push(Instruction::I32And)
    }

    pub fn i32_or(&mut self) -> &mut Self {
        self.push(Instruction::I32Or)
    }

    pub fn i32_xor(&mut self) -> &mut Self {
        self.push(Instruction::I32Xor)
    }

    pub fn i32_shl(&mut self) -> &mut Self {
        self.push(Instruction::I32Shl)
    }

    pub fn i32_shr_s(&mut self) -> &mut Self {
        self.push(Instruction::I32ShrS)
    }

    pub fn i32_shr_u(&mut self) -> &mut Self {
        self.push(Instruction::I32ShrU)
    }

    pub fn i32_rotl(&mut self) -> &mut Self {
        self.push(Instruction::I32Rotl)
    }

    pub fn i32_rotr(&mut self) -> &mut Self {
        self.push(Instruction::I32Rotr)
    }

    pub fn i32_clz(&mut self) -> &mut Self {
        self.push(Instruction::I32Clz)
    }

    pub fn i32_ctz(&mut self) -> &mut Self {
        self.push(Instruction::I32Ctz)
    }

    pub fn i32_popcnt(&mut self) -> &mut Self {
        self.push(Instruction::I32Popcnt)
    }

    pub fn i32_eqz(&mut self) -> &mut Self {
        self.push(Instruction::I32Eqz)
    }

    // ── i32 comparison ──

    pub fn i32_eq(&mut self) -> &mut Self {
        self.push(Instruction::I32Eq)
    }

    pub fn i32_ne(&mut self) -> &mut Self {
        self.push(Instruction::I32Ne)
    }

    pub fn i32_lt_s(&mut self) -> &mut Self {
        self.push(Instruction::I32LtS)
    }

    pub fn i32_lt_u(&mut self) -> &mut Self {
        self.push(Instruction::I32LtU)
    }

    pub fn i32_gt_s(&mut self) -> &mut Self {
        self.push(Instruction::I32GtS)
    }

    pub fn i32_gt_u(&mut self) -> &mut Self {
        self.push(Instruction::I32GtU)
    }

    pub fn i32_le_s(&mut self) -> &mut Self {
        self.push(Instruction::I32LeS)
    }

    pub fn i32_le_u(&mut self) -> &mut Self {
        self.push(Instruction::I32LeU)
    }

    pub fn i32_ge_s(&mut self) -> &mut Self {
        self.push(Instruction::I32GeS)
    }

    pub fn i32_ge_u(&mut self) -> &mut Self {
        self.push(Instruction::I32GeU)
    }

    // ── i64 arithmetic ──

    pub fn i64_add(&mut self) -> &mut Self {
        self.push(Instruction::I64Add)
    }

    pub fn i64_sub(&mut self) -> &mut Self {
        self.push(Instruction::I64Sub)
    }

    pub fn i64_mul(&mut self) -> &mut Self {
        self.push(Instruction::I64Mul)
    }

    pub fn i64_div_s(&mut self) -> &mut Self {
        self.push(Instruction::I64DivS)
    }

    pub fn i64_div_u(&mut self) -> &mut Self {
        self.push(Instruction::I64DivU)
    }

    pub fn i64_rem_s(&mut self) -> &mut Self {
        self.push(Instruction::I64RemS)
    }

    pub fn i64_rem_u(&mut self) -> &mut Self {
        self.push(Instruction::I64RemU)
    }

    pub fn i64_and(&mut self) -> &mut Self {
        self.push(Instruction::I64And)
    }

    pub fn i64_or(&mut self) -> &mut Self {
        self.push(Instruction::I64Or)
    }

    pub fn i64_xor(&mut self) -> &mut Self {
        self.push(Instruction::I64Xor)
    }

    pub fn i64_shl(&mut self) -> &mut Self {
        self.push(Instruction::I64Shl)
    }

    pub fn i64_shr_s(&mut self) -> &mut Self {
        self.push(Instruction::I64ShrS)
    }

    pub fn i64_shr_u(&mut self) -> &mut Self {
        self.push(Instruction::I64ShrU)
    }

    pub fn i64_rotl(&mut self) -> &mut Self {
        self.push(Instruction::I64Rotl)
    }

    pub fn i64_rotr(&mut self) -> &mut Self {
        self.push(Instruction::I64Rotr)
    }

    pub fn i64_clz(&mut self) -> &mut Self {
        self.push(Instruction::I64Clz)
    }

    pub fn i64_ctz(&mut self) -> &mut Self {
        self.push(Instruction::I64Ctz)
    }

    pub fn i64_popcnt(&mut self) -> &mut Self {
        self.push(Instruction::I64Popcnt)
    }

    pub fn i64_eqz(&mut self) -> &mut Self {
        self.push(Instruction::I64Eqz)
    }

    // ── i64 comparison ──

    pub fn i64_eq(&mut self) -> &mut Self {
        self.push(Instruction::I64Eq)
    }

    pub fn i64_ne(&mut self) -> &mut Self {
        self.push(Instruction::I64Ne)
    }

    pub fn i64_lt_s(&mut self) -> &mut Self {
        self.push(Instruction::I64LtS)
    }

    pub fn i64_lt_u(&mut self) -> &mut Self {
        self.push(Instruction::I64LtU)
    }

    pub fn i64_gt_s(&mut self) -> &mut Self {
        self.push(Instruction::I64GtS)
    }

    pub fn i64_gt_u(&mut self) -> &mut Self {
        self.push(Instruction::I64GtU)
    }

    pub fn i64_le_s(&mut self) -> &mut Self {
        self.push(Instruction::I64LeS)
    }

    pub fn i64_le_u(&mut self) -> &mut Self {
        self.push(Instruction::I64LeU)
    }

    pub fn i64_ge_s(&mut self) -> &mut Self {
        self.push(Instruction::I64GeS)
    }

    pub fn i64_ge_u(&mut self) -> &mut Self {
        self.push(Instruction::I64GeU)
    }

    // ── Checked arithmetic ──
    //
    // Each checked form expands at seal time to the plain operation plus an
    // overflow test that raises [`Tag::OVERFLOW`]. The raise routes through
    // enclosing exception regions like any user raise.

    /// Signed add that raises the overflow tag instead of wrapping.
    pub fn i32_add_checked(&mut self) -> &mut Self {
        self.op(Op::Checked(CheckedOp::AddI32 { signed: true }))
    }

    /// Unsigned add that raises the overflow tag on carry-out.
    pub fn i32_add_checked_u(&mut self) -> &mut Self {
        self.op(Op::Checked(CheckedOp::AddI32 { signed: false }))
    }

    /// Signed subtract that raises the overflow tag instead of wrapping.
    pub fn i32_sub_checked(&mut self) -> &mut Self {
        self.op(Op::Checked(CheckedOp::SubI32 { signed: true }))
    }

    /// Unsigned subtract that raises the overflow tag on borrow.
    pub fn i32_sub_checked_u(&mut self) -> &mut Self {
        self.op(Op::Checked(CheckedOp::SubI32 { signed: false }))
    }

    pub fn i64_add_checked(&mut self) -> &mut Self {
        self.op(Op::Checked(CheckedOp::AddI64 { signed: true }))
    }

    pub fn i64_add_checked_u(&mut self) -> &mut Self {
        self.op(Op::Checked(CheckedOp::AddI64 { signed: false }))
    }

    pub fn i64_sub_checked(&mut self) -> &mut Self {
        self.op(Op::Checked(CheckedOp::SubI64 { signed: true }))
    }

    pub fn i64_sub_checked_u(&mut self) -> &mut Self {
        self.op(Op::Checked(CheckedOp::SubI64 { signed: false }))
    }

    // ── f32 arithmetic ──

    pub fn f32_add(&mut self) -> &mut Self {
        self.push(Instruction::F32Add)
    }

    pub fn f32_sub(&mut self) -> &mut Self {
        self.push(Instruction::F32Sub)
    }

    pub fn f32_mul(&mut self) -> &mut Self {
        self.push(Instruction::F32Mul)
    }

    pub fn f32_div(&mut self) -> &mut Self {
        self.push(Instruction::F32Div)
    }

    pub fn f32_min(&mut self) -> &mut Self {
        self.push(Instruction::F32Min)
    }

    pub fn f32_max(&mut self) -> &mut Self {
        self.push(Instruction::F32Max)
    }

    pub fn f32_copysign(&mut self) -> &mut Self {
        self.push(Instruction::F32Copysign)
    }

    pub fn f32_abs(&mut self) -> &mut Self {
        self.push(Instruction::F32Abs)
    }

    pub fn f32_neg(&mut self) -> &mut Self {
        self.push(Instruction::F32Neg)
    }

    pub fn f32_sqrt(&mut self) -> &mut Self {
        self.push(Instruction::F32Sqrt)
    }

    pub fn f32_ceil(&mut self) -> &mut Self {
        self.push(Instruction::F32Ceil)
    }

    pub fn f32_floor(&mut self) -> &mut Self {
        self.push(Instruction::F32Floor)
    }

    pub fn f32_trunc(&mut self) -> &mut Self {
        self.push(Instruction::F32Trunc)
    }

    pub fn f32_nearest(&mut self) -> &mut Self {
        self.push(Instruction::F32Nearest)
    }

    // ── f32 comparison ──

    pub fn f32_eq(&mut self) -> &mut Self {
        self.push(Instruction::F32Eq)
    }

    pub fn f32_ne(&mut self) -> &mut Self {
        self.push(Instruction::F32Ne)
    }

    pub fn f32_lt(&mut self) -> &mut Self {
        self.push(Instruction::F32Lt)
    }

    pub fn f32_gt(&mut self) -> &mut Self {
        self.push(Instruction::F32Gt)
    }

    pub fn f32_le(&mut self) -> &mut Self {
        self.push(Instruction::F32Le)
    }

    pub fn f32_ge(&mut self) -> &mut Self {
        self.push(Instruction::F32Ge)
    }

    // ── f64 arithmetic ──

    pub fn f64_add(&mut self) -> &mut Self {
        self.push(Instruction::F64Add)
    }

    pub fn f64_sub(&mut self) -> &mut Self {
        self.push(Instruction::F64Sub)
    }

    pub fn f64_mul(&mut self) -> &mut Self {
        self.push(Instruction::F64Mul)
    }

    pub fn f64_div(&mut self) -> &mut Self {
        self.push(Instruction::F64Div)
    }

    pub fn f64_min(&mut self) -> &mut Self {
        self.push(Instruction::F64Min)
    }

    pub fn f64_max(&mut self) -> &mut Self {
        self.push(Instruction::F64Max)
    }

    pub fn f64_copysign(&mut self) -> &mut Self {
        self.push(Instruction::F64Copysign)
    }

    pub fn f64_abs(&mut self) -> &mut Self {
        self.push(Instruction::F64Abs)
    }

    pub fn f64_neg(&mut self) -> &mut Self {
        self.push(Instruction::F64Neg)
    }

    pub fn f64_sqrt(&mut self) -> &mut Self {
        self.push(Instruction::F64Sqrt)
    }

    pub fn f64_ceil(&mut self) -> &mut Self {
        self.push(Instruction::F64Ceil)
    }

    pub fn f64_floor(&mut self) -> &mut Self {
        self.push(Instruction::F64Floor)
    }

    pub fn f64_trunc(&mut self) -> &mut Self {
        self.push(Instruction::F64Trunc)
    }

    pub fn f64_nearest(&mut self) -> &mut Self {
        self.push(Instruction::F64Nearest)
    }

    // ── f64 comparison ──

    pub fn f64_eq(&mut self) -> &mut Self {
        self.push(Instruction::F64Eq)
    }

    pub fn f64_ne(&mut self) -> &mut Self {
        self.push(Instruction::F64Ne)
    }

    pub fn f64_lt(&mut self) -> &mut Self {
        self.push(Instruction::F64Lt)
    }

    pub fn f64_gt(&mut self) -> &mut Self {
        self.push(Instruction::F64Gt)
    }

    pub fn f64_le(&mut self) -> &mut Self {
        self.push(Instruction::F64Le)
    }

    pub fn f64_ge(&mut self) -> &mut Self {
        self.push(Instruction::F64Ge)
    }

    // ── Conversions ──

    pub fn i32_wrap_i64(&mut self) -> &mut Self {
        self.push(Instruction::I32WrapI64)
    }

    pub fn i64_extend_i32_s(&mut self) -> &mut Self {
        self.push(Instruction::I64ExtendI32S)
    }

    pub fn i64_extend_i32_u(&mut self) -> &mut Self {
        self.push(Instruction::I64ExtendI32U)
    }

    pub fn i32_trunc_f32_s(&mut self) -> &mut Self {
        self.push(Instruction::I32TruncF32S)
    }

    pub fn i32_trunc_f32_u(&mut self) -> &mut Self {
        self.push(Instruction::I32TruncF32U)
    }

    pub fn i32_trunc_f64_s(&mut self) -> &mut Self {
        self.push(Instruction::I32TruncF64S)
    }

    pub fn i32_trunc_f64_u(&mut self) -> &mut Self {
        self.push(Instruction::I32TruncF64U)
    }

    pub fn i64_trunc_f32_s(&mut self) -> &mut Self {
        self.push(Instruction::I64TruncF32S)
    }

    pub fn i64_trunc_f32_u(&mut self) -> &mut Self {
        self.push(Instruction::I64TruncF32U)
    }

    pub fn i64_trunc_f64_s(&mut self) -> &mut Self {
        self.push(Instruction::I64TruncF64S)
    }

    pub fn i64_trunc_f64_u(&mut self) -> &mut Self {
        self.push(Instruction::I64TruncF64U)
    }

    pub fn i32_trunc_sat_f32_s(&mut self) -> &mut Self {
        self.push(Instruction::I32TruncSatF32S)
    }

    pub fn i32_trunc_sat_f32_u(&mut self) -> &mut Self {
        self.push(Instruction::I32TruncSatF32U)
    }

    pub fn i32_trunc_sat_f64_s(&mut self) -> &mut Self {
        self.push(Instruction::I32TruncSatF64S)
    }

    pub fn i32_trunc_sat_f64_u(&mut self) -> &mut Self {
        self.push(Instruction::I32TruncSatF64U)
    }

    pub fn i64_trunc_sat_f32_s(&mut self) -> &mut Self {
        self.push(Instruction::I64TruncSatF32S)
    }

    pub fn i64_trunc_sat_f32_u(&mut self) -> &mut Self {
        self.push(Instruction::I64TruncSatF32U)
    }

    pub fn i64_trunc_sat_f64_s(&mut self) -> &mut Self {
        self.push(Instruction::I64TruncSatF64S)
    }

    pub fn i64_trunc_sat_f64_u(&mut self) -> &mut Self {
        self.push(Instruction::I64TruncSatF64U)
    }

    pub fn f32_convert_i32_s(&mut self) -> &mut Self {
        self.push(Instruction::F32ConvertI32S)
    }

    pub fn f32_convert_i32_u(&mut self) -> &mut Self {
        self.push(Instruction::F32ConvertI32U)
    }

    pub fn f32_convert_i64_s(&mut self) -> &mut Self {
        self.push(Instruction::F32ConvertI64S)
    }

    pub fn f32_convert_i64_u(&mut self) -> &mut Self {
        self.push(Instruction::F32ConvertI64U)
    }

    pub fn f64_convert_i32_s(&mut self) -> &mut Self {
        self.push(Instruction::F64ConvertI32S)
    }

    pub fn f64_convert_i32_u(&mut self) -> &mut Self {
        self.push(Instruction::F64ConvertI32U)
    }

    pub fn f64_convert_i64_s(&mut self) -> &mut Self {
        self.push(Instruction::F64ConvertI64S)
    }

    pub fn f64_convert_i64_u(&mut self) -> &mut Self {
        self.push(Instruction::F64ConvertI64U)
    }

    pub fn f32_demote_f64(&mut self) -> &mut Self {
        self.push(Instruction::F32DemoteF64)
    }

    pub fn f64_promote_f32(&mut self) -> &mut Self {
        self.push(Instruction::F64PromoteF32)
    }

    pub fn i32_reinterpret_f32(&mut self) -> &mut Self {
        self.push(Instruction::I32ReinterpretF32)
    }

    pub fn i64_reinterpret_f64(&mut self) -> &mut Self {
        self.push(Instruction::I64ReinterpretF64)
    }

    pub fn f32_reinterpret_i32(&mut self) -> &mut Self {
        self.push(Instruction::F32ReinterpretI32)
    }

    pub fn f64_reinterpret_i64(&mut self) -> &mut Self {
        self.push(Instruction::F64ReinterpretI64)
    }

    pub fn i32_extend8_s(&mut self) -> &mut Self {
        self.push(Instruction::I32Extend8S)
    }

    pub fn i32_extend16_s(&mut self) -> &mut Self {
        self.push(Instruction::I32Extend16S)
    }

    pub fn i64_extend8_s(&mut self) -> &mut Self {
        self.push(Instruction::I64Extend8S)
    }

    pub fn i64_extend16_s(&mut self) -> &mut Self {
        self.push(Instruction::I64Extend16S)
    }

    pub fn i64_extend32_s(&mut self) -> &mut Self {
        self.push(Instruction::I64Extend32S)
    }

    // ── Arguments ──
    //
    // Arguments are the leading locals of the frame. Indices are validated
    // against the declared parameter list when the body is sealed.

    /// Pushes argument `index`.
    pub fn arg_get(&mut self, index: u32) -> &mut Self {
        self.op(Op::ArgGet(index))
    }

    /// Pops into argument `index`.
    pub fn arg_set(&mut self, index: u32) -> &mut Self {
        self.op(Op::ArgSet(index))
    }

    /// Stores the top of stack into argument `index`, keeping the value.
    pub fn arg_tee(&mut self, index: u32) -> &mut Self {
        self.op(Op::ArgTee(index))
    }

    // ── Locals and globals ──

    pub fn local_get(&mut self, local: Local) -> &mut Self {
        self.op(Op::LocalGet(local))
    }

    pub fn local_set(&mut self, local: Local) -> &mut Self {
        self.op(Op::LocalSet(local))
    }

    pub fn local_tee(&mut self, local: Local) -> &mut Self {
        self.op(Op::LocalTee(local))
    }

    pub fn global_get(&mut self, global: GlobalRef) -> &mut Self {
        self.push(Instruction::GlobalGet(global.0))
    }

    pub fn global_set(&mut self, global: GlobalRef) -> &mut Self {
        self.push(Instruction::GlobalSet(global.0))
    }

    // ── Memory ──
    //
    // Loads and stores take a static byte offset and use natural alignment.

    pub fn i32_load(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I32Load(memarg(offset, 2)))
    }

    pub fn i64_load(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I64Load(memarg(offset, 3)))
    }

    pub fn f32_load(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::F32Load(memarg(offset, 2)))
    }

    pub fn f64_load(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::F64Load(memarg(offset, 3)))
    }

    pub fn i32_load8_s(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I32Load8S(memarg(offset, 0)))
    }

    pub fn i32_load8_u(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I32Load8U(memarg(offset, 0)))
    }

    pub fn i32_load16_s(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I32Load16S(memarg(offset, 1)))
    }

    pub fn i32_load16_u(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I32Load16U(memarg(offset, 1)))
    }

    pub fn i64_load8_s(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I64Load8S(memarg(offset, 0)))
    }

    pub fn i64_load8_u(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I64Load8U(memarg(offset, 0)))
    }

    pub fn i64_load16_s(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I64Load16S(memarg(offset, 1)))
    }

    pub fn i64_load16_u(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I64Load16U(memarg(offset, 1)))
    }

    pub fn i64_load32_s(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I64Load32S(memarg(offset, 2)))
    }

    pub fn i64_load32_u(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I64Load32U(memarg(offset, 2)))
    }

    pub fn i32_store(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I32Store(memarg(offset, 2)))
    }

    pub fn i64_store(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I64Store(memarg(offset, 3)))
    }

    pub fn f32_store(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::F32Store(memarg(offset, 2)))
    }

    pub fn f64_store(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::F64Store(memarg(offset, 3)))
    }

    pub fn i32_store8(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I32Store8(memarg(offset, 0)))
    }

    pub fn i32_store16(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I32Store16(memarg(offset, 1)))
    }

    pub fn i64_store8(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I64Store8(memarg(offset, 0)))
    }

    pub fn i64_store16(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I64Store16(memarg(offset, 1)))
    }

    pub fn i64_store32(&mut self, offset: u64) -> &mut Self {
        self.push(Instruction::I64Store32(memarg(offset, 2)))
    }

    pub fn memory_size(&mut self) -> &mut Self {
        self.push(Instruction::MemorySize(0))
    }

    pub fn memory_grow(&mut self) -> &mut Self {
        self.push(Instruction::MemoryGrow(0))
    }

    pub fn memory_copy(&mut self) -> &mut Self {
        self.push(Instruction::MemoryCopy {
            src_mem: 0,
            dst_mem: 0,
        })
    }

    pub fn memory_fill(&mut self) -> &mut Self {
        self.push(Instruction::MemoryFill(0))
    }

    // ── Control flow ──

    /// Unconditional jump to `label`.
    pub fn br(&mut self, label: Label) -> &mut Self {
        self.op(Op::Br(label))
    }

    /// Pops an i32 condition; jumps to `label` when it is non-zero.
    pub fn br_if(&mut self, label: Label) -> &mut Self {
        self.op(Op::BrIf(label))
    }

    /// Pops an i32 selector and jumps to `targets[selector]`, or to
    /// `default` when the selector is out of range.
    pub fn br_table(&mut self, targets: &[Label], default: Label) -> &mut Self {
        self.op(Op::BrTable(targets.to_vec(), default))
    }

    /// Binds `label` to the current position. Each label is bound exactly
    /// once; a second mark is reported when the module is finished.
    pub fn mark(&mut self, label: Label) -> &mut Self {
        self.op(Op::Mark(label))
    }

    /// Returns from the function with whatever the frame's result types
    /// require on the stack.
    pub fn ret(&mut self) -> &mut Self {
        self.push(Instruction::Return)
    }

    /// Direct call through a minted function reference.
    pub fn call(&mut self, func: FuncRef) -> &mut Self {
        self.op(Op::Call(func))
    }

    /// Indirect call through the function table; pops the table index.
    pub fn call_indirect(&mut self, ty: TypeRef) -> &mut Self {
        self.push(Instruction::CallIndirect {
            type_index: ty.0,
            table_index: 0,
        })
    }

    pub fn nop(&mut self) -> &mut Self {
        self.push(Instruction::Nop)
    }

    pub fn drop_value(&mut self) -> &mut Self {
        self.push(Instruction::Drop)
    }

    pub fn select(&mut self) -> &mut Self {
        self.push(Instruction::Select)
    }

    pub fn unreachable(&mut self) -> &mut Self {
        self.push(Instruction::Unreachable)
    }

    // ── Exception regions ──
    //
    // Regions are recorded flat: try_start, protected instructions, one or
    // more catch clauses each followed by its handler, then try_end. On
    // entry to a handler the raised tag code is on the stack as an i32.

    /// Opens an exception region.
    pub fn try_start(&mut self) -> &mut Self {
        self.op(Op::TryStart)
    }

    /// Begins a handler for raises carrying exactly `tag`.
    pub fn catch(&mut self, tag: Tag) -> &mut Self {
        self.op(Op::Catch(Some(tag)))
    }

    /// Begins a handler for any raise not claimed by an earlier clause.
    pub fn catch_all(&mut self) -> &mut Self {
        self.op(Op::Catch(None))
    }

    /// Closes the innermost open exception region.
    pub fn try_end(&mut self) -> &mut Self {
        self.op(Op::TryEnd)
    }

    /// Raises `tag`: control transfers to the innermost enclosing region
    /// with a matching clause. A raise inside a handler propagates outward
    /// past its own region; with no handler in scope the instance traps and
    /// the tag stays readable through the fault probe.
    pub fn raise(&mut self, tag: Tag) -> &mut Self {
        self.op(Op::Raise(tag))
    }

    // ── Raw passthrough ──

    /// Appends caller-encoded instruction bytes verbatim. The bytes must
    /// form complete instructions and leave every enclosing frame balanced;
    /// nothing here is checked before module validation.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.op(Op::Raw(bytes.to_vec()))
    }
}

fn memarg(offset: u64, align: u32) -> MemArg {
    MemArg {
        offset,
        align,
        memory_index: 0,
    }
}
