//! Seal-time lowering from the flat recorded stream to structured wasm.
//!
//! Lowering runs in two stages:
//!
//! 1. Desugar. Exception regions become synthetic labels plus fault-register
//!    writes, checked arithmetic expands to test-and-raise sequences, text
//!    literals intern into the module pool, and argument, local, and
//!    function tokens resolve to final indices. The result is a stream of
//!    plain instructions, label marks, and label-keyed branches.
//! 2. Structure. Every referenced label contributes a scope: a `block`
//!    closing at its mark for forward references, a `loop` opening at its
//!    mark for backward references. Block starts are hoisted earlier and
//!    loop ends extended later until all scopes nest, then the stream is
//!    emitted with branch depths counted off the open-scope stack.
//!
//! A pattern that cannot be made to nest, which is exactly a branch into
//! the interior of a loop, is rejected with
//! [`EmitError::IrreducibleFlow`].

use std::collections::HashMap;

use wasm_encoder::{BlockType, Function, Instruction, ValType};

use crate::body::Body;
use crate::error::{EmitError, EmitResult};
use crate::module::LiteralPool;
use crate::ops::{CheckedOp, FuncSlot, Label, Op, Tag, FAULT_GLOBAL, FAULT_NONE};

/// Lowers one recorded body into an encoded function.
pub(crate) fn seal(
    body: &Body,
    params: &[ValType],
    import_count: u32,
    pool: &mut LiteralPool,
) -> EmitResult<Function> {
    let mut scratch = Scratch {
        base: (params.len() + body.locals.len()) as u32,
        extra: Vec::new(),
        i32_trio: None,
        i64_trio: None,
    };
    let low = desugar(body, params, import_count, pool, &mut scratch)?;
    let scopes = solve_scopes(&low)?;

    let mut groups: Vec<(u32, ValType)> = Vec::new();
    for ty in body.locals.iter().chain(scratch.extra.iter()) {
        groups.push((1, *ty));
    }
    encode(&low, &scopes, groups)
}

// ── Desugared form ──

#[derive(Debug, Clone)]
enum LowOp {
    Instr(Instruction<'static>),
    Br(u32),
    BrIf(u32),
    BrTable(Vec<u32>, u32),
    Mark(u32),
    Raw(Vec<u8>),
}

/// Scratch locals appended after the user's declared locals, shared by all
/// checked-arithmetic expansions of one width.
struct Scratch {
    base: u32,
    extra: Vec<ValType>,
    i32_trio: Option<u32>,
    i64_trio: Option<u32>,
}

impl Scratch {
    fn trio(&mut self, ty: ValType) -> (u32, u32, u32) {
        let slot = match ty {
            ValType::I64 => &mut self.i64_trio,
            _ => &mut self.i32_trio,
        };
        if let Some(first) = *slot {
            return (first, first + 1, first + 2);
        }
        let first = self.base + self.extra.len() as u32;
        self.extra.extend([ty, ty, ty]);
        *slot = Some(first);
        (first, first + 1, first + 2)
    }
}

// ── Exception regions ──

struct Region {
    start: usize,
    clauses: Vec<(Option<Tag>, usize)>,
    end: usize,
}

fn analyze_regions(ops: &[Op]) -> EmitResult<Vec<Region>> {
    let mut open: Vec<Region> = Vec::new();
    let mut closed: Vec<Region> = Vec::new();
    for (i, op) in ops.iter().enumerate() {
        match op {
            Op::TryStart => open.push(Region {
                start: i,
                clauses: Vec::new(),
                end: 0,
            }),
            Op::Catch(tag) => match open.last_mut() {
                Some(r) => r.clauses.push((*tag, i)),
                None => return Err(EmitError::CatchOutsideRegion),
            },
            Op::TryEnd => {
                let mut r = open.pop().ok_or(EmitError::UnmatchedTryEnd)?;
                if r.clauses.is_empty() {
                    return Err(EmitError::RegionWithoutCatch);
                }
                r.end = i;
                closed.push(r);
            }
            _ => {}
        }
    }
    if open.is_empty() {
        Ok(closed)
    } else {
        Err(EmitError::UnclosedRegion)
    }
}

/// Picks the handler for a raise at op index `pos`: innermost region whose
/// protected range covers `pos` and whose clause list claims `tag`. A raise
/// inside a handler is outside every protected range of its own region, so
/// it propagates outward naturally.
fn route_raise(regions: &[Region], pos: usize, tag: Tag) -> Option<(usize, usize)> {
    let mut candidates: Vec<usize> = regions
        .iter()
        .enumerate()
        .filter(|(_, r)| pos > r.start && pos < r.clauses[0].1)
        .map(|(i, _)| i)
        .collect();
    candidates.sort_by(|a, b| regions[*b].start.cmp(&regions[*a].start));
    for ri in candidates {
        for (ci, (clause_tag, _)) in regions[ri].clauses.iter().enumerate() {
            match clause_tag {
                None => return Some((ri, ci)),
                Some(t) if *t == tag => return Some((ri, ci)),
                Some(_) => {}
            }
        }
    }
    None
}

// ── Stage 1: desugar ──

fn desugar(
    body: &Body,
    params: &[ValType],
    import_count: u32,
    pool: &mut LiteralPool,
    scratch: &mut Scratch,
) -> EmitResult<Vec<LowOp>> {
    let regions = analyze_regions(&body.ops)?;
    let arity = params.len() as u32;
    let local_base = arity;

    // Synthetic labels continue the user id space: one "after" label per
    // region, one entry label per clause.
    let mut next_key = body.labels;
    let mut after_keys: Vec<u32> = Vec::with_capacity(regions.len());
    let mut entry_keys: Vec<Vec<u32>> = Vec::with_capacity(regions.len());
    for r in &regions {
        after_keys.push(next_key);
        next_key += 1;
        let mut keys = Vec::with_capacity(r.clauses.len());
        for _ in &r.clauses {
            keys.push(next_key);
            next_key += 1;
        }
        entry_keys.push(keys);
    }
    let mut catch_at: HashMap<usize, (usize, usize)> = HashMap::new();
    let mut end_at: HashMap<usize, usize> = HashMap::new();
    for (ri, r) in regions.iter().enumerate() {
        end_at.insert(r.end, ri);
        for (ci, (_, pos)) in r.clauses.iter().enumerate() {
            catch_at.insert(*pos, (ri, ci));
        }
    }

    // Tokens from another body read as never-minted labels here.
    let minted = body.labels;
    let check_label = move |l: Label| -> EmitResult<u32> {
        if l.0 < minted {
            Ok(l.0)
        } else {
            Err(EmitError::UnboundLabel(l))
        }
    };

    let mut low: Vec<LowOp> = Vec::with_capacity(body.ops.len());
    for (i, op) in body.ops.iter().enumerate() {
        match op {
            Op::Plain(instr) => low.push(LowOp::Instr(instr.clone())),
            Op::ArgGet(k) => {
                check_arg(*k, arity)?;
                low.push(LowOp::Instr(Instruction::LocalGet(*k)));
            }
            Op::ArgSet(k) => {
                check_arg(*k, arity)?;
                low.push(LowOp::Instr(Instruction::LocalSet(*k)));
            }
            Op::ArgTee(k) => {
                check_arg(*k, arity)?;
                low.push(LowOp::Instr(Instruction::LocalTee(*k)));
            }
            Op::LocalGet(l) => low.push(LowOp::Instr(Instruction::LocalGet(local_base + l.0))),
            Op::LocalSet(l) => low.push(LowOp::Instr(Instruction::LocalSet(local_base + l.0))),
            Op::LocalTee(l) => low.push(LowOp::Instr(Instruction::LocalTee(local_base + l.0))),
            Op::Br(l) => {
                let key = check_label(*l)?;
                low.push(LowOp::Br(key));
            }
            Op::BrIf(l) => {
                let key = check_label(*l)?;
                low.push(LowOp::BrIf(key));
            }
            Op::BrTable(targets, default) => {
                let keys = targets
                    .iter()
                    .map(|l| check_label(*l))
                    .collect::<EmitResult<Vec<u32>>>()?;
                let default = check_label(*default)?;
                low.push(LowOp::BrTable(keys, default));
            }
            Op::Mark(l) => {
                let key = check_label(*l)?;
                low.push(LowOp::Mark(key));
            }
            Op::StrConst(s) => {
                let (ptr, len) = pool.intern(s);
                low.push(LowOp::Instr(Instruction::I32Const(ptr as i32)));
                low.push(LowOp::Instr(Instruction::I32Const(len as i32)));
            }
            Op::Call(f) => {
                let idx = match f.0 {
                    FuncSlot::Import(k) => k,
                    FuncSlot::Local(k) => import_count + k,
                };
                low.push(LowOp::Instr(Instruction::Call(idx)));
            }
            Op::Checked(c) => {
                expand_checked(*c, i, &regions, &entry_keys, scratch, &mut low);
            }
            Op::TryStart => {}
            Op::Catch(_) => {
                // Normal completion of the preceding range skips to the
                // after-label; a routed raise lands on the entry mark, reads
                // the pending tag, and clears the register.
                let (ri, ci) = catch_at[&i];
                low.push(LowOp::Br(after_keys[ri]));
                low.push(LowOp::Mark(entry_keys[ri][ci]));
                low.push(LowOp::Instr(Instruction::GlobalGet(FAULT_GLOBAL)));
                low.push(LowOp::Instr(Instruction::I32Const(FAULT_NONE)));
                low.push(LowOp::Instr(Instruction::GlobalSet(FAULT_GLOBAL)));
            }
            Op::TryEnd => {
                let ri = end_at[&i];
                low.push(LowOp::Mark(after_keys[ri]));
            }
            Op::Raise(tag) => emit_raise(*tag, i, &regions, &entry_keys, &mut low),
            Op::Raw(bytes) => low.push(LowOp::Raw(bytes.clone())),
        }
    }
    Ok(low)
}

fn check_arg(index: u32, arity: u32) -> EmitResult<()> {
    if index < arity {
        Ok(())
    } else {
        Err(EmitError::ArgOutOfRange { index, arity })
    }
}

fn emit_raise(
    tag: Tag,
    pos: usize,
    regions: &[Region],
    entry_keys: &[Vec<u32>],
    low: &mut Vec<LowOp>,
) {
    low.push(LowOp::Instr(Instruction::I32Const(tag.code())));
    low.push(LowOp::Instr(Instruction::GlobalSet(FAULT_GLOBAL)));
    match route_raise(regions, pos, tag) {
        Some((ri, ci)) => low.push(LowOp::Br(entry_keys[ri][ci])),
        None => low.push(LowOp::Instr(Instruction::Unreachable)),
    }
}

/// Expands a checked operation into: stash operands, compute, test the
/// overflow condition, raise [`Tag::OVERFLOW`] when it holds, reload the
/// result.
fn expand_checked(
    op: CheckedOp,
    pos: usize,
    regions: &[Region],
    entry_keys: &[Vec<u32>],
    scratch: &mut Scratch,
    low: &mut Vec<LowOp>,
) {
    use Instruction as I;

    let wide = matches!(op, CheckedOp::AddI64 { .. } | CheckedOp::SubI64 { .. });
    let (a, b, r) = scratch.trio(if wide { ValType::I64 } else { ValType::I32 });
    let (is_add, signed) = match op {
        CheckedOp::AddI32 { signed } | CheckedOp::AddI64 { signed } => (true, signed),
        CheckedOp::SubI32 { signed } | CheckedOp::SubI64 { signed } => (false, signed),
    };
    let (xor, and, lt_u, lt_s, zero) = if wide {
        (I::I64Xor, I::I64And, I::I64LtU, I::I64LtS, I::I64Const(0))
    } else {
        (I::I32Xor, I::I32And, I::I32LtU, I::I32LtS, I::I32Const(0))
    };
    let compute = match op {
        CheckedOp::AddI32 { .. } => I::I32Add,
        CheckedOp::SubI32 { .. } => I::I32Sub,
        CheckedOp::AddI64 { .. } => I::I64Add,
        CheckedOp::SubI64 { .. } => I::I64Sub,
    };

    low.push(LowOp::Instr(I::LocalSet(b)));
    low.push(LowOp::Instr(I::LocalSet(a)));
    low.push(LowOp::Instr(I::LocalGet(a)));
    low.push(LowOp::Instr(I::LocalGet(b)));
    low.push(LowOp::Instr(compute));
    low.push(LowOp::Instr(I::LocalSet(r)));

    if is_add && signed {
        // overflow iff (r ^ a) & (r ^ b) has the sign bit set
        low.push(LowOp::Instr(I::LocalGet(r)));
        low.push(LowOp::Instr(I::LocalGet(a)));
        low.push(LowOp::Instr(xor.clone()));
        low.push(LowOp::Instr(I::LocalGet(r)));
        low.push(LowOp::Instr(I::LocalGet(b)));
        low.push(LowOp::Instr(xor));
        low.push(LowOp::Instr(and));
        low.push(LowOp::Instr(zero));
        low.push(LowOp::Instr(lt_s));
    } else if is_add {
        // carry-out iff r < a (unsigned)
        low.push(LowOp::Instr(I::LocalGet(r)));
        low.push(LowOp::Instr(I::LocalGet(a)));
        low.push(LowOp::Instr(lt_u));
    } else if signed {
        // overflow iff (a ^ b) & (a ^ r) has the sign bit set
        low.push(LowOp::Instr(I::LocalGet(a)));
        low.push(LowOp::Instr(I::LocalGet(b)));
        low.push(LowOp::Instr(xor.clone()));
        low.push(LowOp::Instr(I::LocalGet(a)));
        low.push(LowOp::Instr(I::LocalGet(r)));
        low.push(LowOp::Instr(xor));
        low.push(LowOp::Instr(and));
        low.push(LowOp::Instr(zero));
        low.push(LowOp::Instr(lt_s));
    } else {
        // borrow iff a < b (unsigned)
        low.push(LowOp::Instr(I::LocalGet(a)));
        low.push(LowOp::Instr(I::LocalGet(b)));
        low.push(LowOp::Instr(lt_u));
    }

    low.push(LowOp::Instr(I::If(BlockType::Empty)));
    emit_raise(Tag::OVERFLOW, pos, regions, entry_keys, low);
    low.push(LowOp::Instr(I::End));
    low.push(LowOp::Instr(I::LocalGet(r)));
}

// ── Stage 2: structure ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Block,
    Loop,
}

#[derive(Debug, Clone, Copy)]
struct Scope {
    key: u32,
    kind: ScopeKind,
    open: usize,
    close: usize,
}

/// Builds the scope set for every referenced label and widens scopes until
/// the whole family nests. Scopes are half-open position ranges: a block
/// occupies `[open, mark)` with its `end` replacing the mark, a loop
/// occupies `[mark, last_backward_ref + 1)` with its header replacing the
/// mark.
fn solve_scopes(low: &[LowOp]) -> EmitResult<Vec<Scope>> {
    let mut marks: HashMap<u32, usize> = HashMap::new();
    let mut refs: Vec<(usize, u32)> = Vec::new();
    for (p, op) in low.iter().enumerate() {
        match op {
            LowOp::Mark(k) => {
                if marks.insert(*k, p).is_some() {
                    return Err(EmitError::RemarkedLabel(Label(*k)));
                }
            }
            LowOp::Br(k) | LowOp::BrIf(k) => refs.push((p, *k)),
            LowOp::BrTable(keys, default) => {
                for k in keys {
                    refs.push((p, *k));
                }
                refs.push((p, *default));
            }
            _ => {}
        }
    }

    let mut by_key: HashMap<u32, Vec<usize>> = HashMap::new();
    for (p, k) in refs {
        by_key.entry(k).or_default().push(p);
    }
    let mut keys: Vec<u32> = by_key.keys().copied().collect();
    keys.sort_unstable();

    let mut scopes: Vec<Scope> = Vec::new();
    for key in keys {
        let mark = *marks
            .get(&key)
            .ok_or(EmitError::UnboundLabel(Label(key)))?;
        let positions = &by_key[&key];
        if let Some(first) = positions.iter().copied().filter(|p| *p < mark).min() {
            scopes.push(Scope {
                key,
                kind: ScopeKind::Block,
                open: first,
                close: mark,
            });
        }
        if let Some(last) = positions.iter().copied().filter(|p| *p > mark).max() {
            scopes.push(Scope {
                key,
                kind: ScopeKind::Loop,
                open: mark,
                close: last + 1,
            });
        }
    }

    // Widen until laminar: block opens may move earlier (the branch target
    // is the close, which stays put) and loop closes may move later (the
    // branch target is the open). A block forced to close inside a loop it
    // does not contain is a jump into the loop body, which structured
    // control flow cannot express.
    loop {
        let mut changed = false;
        for i in 0..scopes.len() {
            for j in 0..scopes.len() {
                if i == j {
                    continue;
                }
                let (a, b) = (scopes[i], scopes[j]);
                if a.open < b.open && b.open < a.close && a.close < b.close {
                    match (a.kind, b.kind) {
                        (_, ScopeKind::Block) => {
                            scopes[j].open = a.open;
                            changed = true;
                        }
                        (ScopeKind::Loop, ScopeKind::Loop) => {
                            scopes[i].close = b.close;
                            changed = true;
                        }
                        (ScopeKind::Block, ScopeKind::Loop) => {
                            return Err(EmitError::IrreducibleFlow(Label(b.key)));
                        }
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }

    // Hoist every block to the start of its innermost container, or to the
    // function start. A branch pops its condition from the frame it sits
    // in, so the instructions computing that condition must fall inside
    // the block; opening at the first reference would strand them outside.
    // Containers hoist too, so run to a fixpoint.
    loop {
        let mut changed = false;
        for i in 0..scopes.len() {
            if scopes[i].kind == ScopeKind::Loop {
                continue;
            }
            let cur = scopes[i];
            let mut target = 0;
            for (j, c) in scopes.iter().enumerate() {
                if j != i
                    && c.open <= cur.open
                    && cur.close <= c.close
                    && (c.open, c.close) != (cur.open, cur.close)
                {
                    target = target.max(c.open);
                }
            }
            if target < cur.open {
                scopes[i].open = target;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    Ok(scopes)
}

fn scope_rank(kind: ScopeKind) -> u8 {
    match kind {
        ScopeKind::Block => 0,
        ScopeKind::Loop => 1,
    }
}

/// Emits the lowered stream, opening and closing scopes at their assigned
/// positions and translating label keys into relative depths.
fn encode(
    low: &[LowOp],
    scopes: &[Scope],
    locals: Vec<(u32, ValType)>,
) -> EmitResult<Function> {
    let mut opens_at: HashMap<usize, Vec<usize>> = HashMap::new();
    for (idx, s) in scopes.iter().enumerate() {
        opens_at.entry(s.open).or_default().push(idx);
    }
    for list in opens_at.values_mut() {
        list.sort_by(|x, y| {
            let (a, b) = (scopes[*x], scopes[*y]);
            b.close
                .cmp(&a.close)
                .then_with(|| scope_rank(a.kind).cmp(&scope_rank(b.kind)))
                .then_with(|| a.key.cmp(&b.key))
        });
    }

    let mut func = Function::new(locals);
    let mut stack: Vec<usize> = Vec::new();
    // Checked expansions contain `if` frames; branches recorded inside them
    // need the extra depth.
    let mut if_depth: u32 = 0;

    for (p, op) in low.iter().enumerate() {
        while let Some(&top) = stack.last() {
            if scopes[top].close == p {
                func.instruction(&Instruction::End);
                stack.pop();
            } else {
                break;
            }
        }
        if let Some(list) = opens_at.get(&p) {
            for &si in list {
                match scopes[si].kind {
                    ScopeKind::Block => func.instruction(&Instruction::Block(BlockType::Empty)),
                    ScopeKind::Loop => func.instruction(&Instruction::Loop(BlockType::Empty)),
                };
                stack.push(si);
            }
        }
        match op {
            LowOp::Instr(instr) => {
                match instr {
                    Instruction::If(_) => if_depth += 1,
                    Instruction::End => if_depth = if_depth.saturating_sub(1),
                    _ => {}
                }
                func.instruction(instr);
            }
            LowOp::Br(k) => {
                let d = depth_of(*k, &stack, scopes, if_depth)?;
                func.instruction(&Instruction::Br(d));
            }
            LowOp::BrIf(k) => {
                let d = depth_of(*k, &stack, scopes, if_depth)?;
                func.instruction(&Instruction::BrIf(d));
            }
            LowOp::BrTable(keys, default) => {
                let depths = keys
                    .iter()
                    .map(|k| depth_of(*k, &stack, scopes, if_depth))
                    .collect::<EmitResult<Vec<u32>>>()?;
                let default = depth_of(*default, &stack, scopes, if_depth)?;
                func.instruction(&Instruction::BrTable(depths.into(), default));
            }
            LowOp::Mark(_) => {}
            LowOp::Raw(bytes) => {
                func.raw(bytes.iter().copied());
            }
        }
    }
    while stack.pop().is_some() {
        func.instruction(&Instruction::End);
    }
    func.instruction(&Instruction::End);
    Ok(func)
}

fn depth_of(key: u32, stack: &[usize], scopes: &[Scope], if_depth: u32) -> EmitResult<u32> {
    for (d, &si) in stack.iter().rev().enumerate() {
        if scopes[si].key == key {
            return Ok(d as u32 + if_depth);
        }
    }
    Err(EmitError::IrreducibleFlow(Label(key)))
}
