//! Integration tests for definition and finalization.
//!
//! Covers the signature family (arity 0 through 6, unit and scalar
//! returns), access to the underlying module shell, host constructor
//! imports, the embedded build manifest, and the deferred errors that
//! surface when a definition is finalized.

use quill_dynfn::{
    Body, BodyExt, ConstVal, DynFn, EmitError, FinalizeError, Manifest, ValType, INVOKE_EXPORT,
    MANIFEST_SECTION,
};
use wasmparser::{ExternalKind, Payload};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, PartialEq)]
struct Widget {
    label: &'static str,
}

fn get_exports(wasm: &[u8]) -> Vec<(String, ExternalKind)> {
    let parser = wasmparser::Parser::new(0);
    let mut exports = Vec::new();
    for payload in parser.parse_all(wasm) {
        if let Ok(Payload::ExportSection(reader)) = payload {
            for export in reader {
                let exp = export.unwrap();
                exports.push((exp.name.to_string(), exp.kind));
            }
        }
    }
    exports
}

fn get_manifest(wasm: &[u8]) -> Manifest {
    for payload in wasmparser::Parser::new(0).parse_all(wasm) {
        if let Ok(Payload::CustomSection(reader)) = payload {
            if reader.name() == MANIFEST_SECTION {
                return Manifest::from_json(reader.data()).expect("invalid manifest JSON");
            }
        }
    }
    panic!("{MANIFEST_SECTION} custom section not found");
}

// ══════════════════════════════════════════════════════════════════════════════
// Tests — Signatures
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn arity_zero_builds_and_calls() {
    let mut def = DynFn::<(), i64>::new();
    def.body().ret_i64(99);
    let mut f = def.finalize().expect("finalize failed");
    assert_eq!(f.call(()).unwrap(), 99);
}

#[test]
fn arity_six_builds_and_calls() {
    let mut def = DynFn::<(i32, i32, i32, i32, i32, i32), i32>::new();
    let body = def.body();
    for i in 0..6 {
        body.arg_get(i);
    }
    body.i32_add()
        .i32_add()
        .i32_add()
        .i32_add()
        .i32_add()
        .ret();
    let mut sum = def.finalize().expect("finalize failed");
    assert_eq!(sum.call((1, 2, 3, 4, 5, 6)).unwrap(), 21);
}

#[test]
fn unit_return_runs_for_its_side_effects() {
    let mut def = DynFn::<(i32,), ()>::new();
    let make = def.host_ctor("make_widget", || Widget { label: "spawned" });
    let body = def.body();
    let skip = body.new_label();
    body.arg_get(0)
        .i32_eqz()
        .br_if(skip)
        .call(make)
        .drop_value()
        .mark(skip);
    let mut run = def.finalize().expect("finalize failed");

    run.call((0,)).expect("call failed");
    assert!(run.heap().is_empty(), "no widget expected for argument 0");
    run.call((1,)).expect("call failed");
    assert_eq!(run.heap().len(), 1);
}

#[test]
fn mixed_scalar_signature_converts() {
    let mut def = DynFn::<(i64, f64), f64>::new();
    def.body()
        .arg_get(0)
        .f64_convert_i64_s()
        .arg_get(1)
        .f64_add()
        .ret();
    let mut f = def.finalize().expect("finalize failed");
    assert_eq!(f.call((2, 0.5)).unwrap(), 2.5);
}

#[test]
fn unsigned_parameters_use_the_same_slots() {
    let mut def = DynFn::<(u32, u32), u32>::new();
    def.body().arg_get(0).arg_get(1).i32_add().ret();
    let mut add = def.finalize().expect("finalize failed");
    assert_eq!(add.call((u32::MAX, 1)).unwrap(), 0);
}

// ══════════════════════════════════════════════════════════════════════════════
// Tests — Module shell
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn helper_functions_are_callable_from_the_body() {
    let mut def = DynFn::<(i32,), i32>::new();
    let mut triple = Body::new();
    triple.arg_get(0).i32_const(3).i32_mul().ret();
    let triple = def
        .module()
        .push_func(&[ValType::I32], &[ValType::I32], triple, None);
    def.body().arg_get(0).call(triple).ret();
    let mut f = def.finalize().expect("finalize failed");
    assert_eq!(f.call((7,)).unwrap(), 21);
}

#[test]
fn shell_globals_persist_across_calls() {
    let mut def = DynFn::<(), i32>::new();
    let counter = def.module().global(ConstVal::I32(0), true);
    def.body()
        .global_get(counter)
        .i32_const(1)
        .i32_add()
        .global_set(counter)
        .global_get(counter)
        .ret();
    let mut bump = def.finalize().expect("finalize failed");
    assert_eq!(bump.call(()).unwrap(), 1);
    assert_eq!(bump.call(()).unwrap(), 2);
}

#[test]
fn compiled_fn_reports_its_shape_in_debug_output() {
    // `Debug` on the callable keeps `unwrap_err` usable on finalize results
    // and summarizes the instance without dumping module bytes.
    let mut def = DynFn::<(), i32>::new();
    def.body().ret_i32(1);
    let f = def.finalize().expect("finalize failed");

    let rendered = format!("{f:?}");
    assert!(rendered.contains("CompiledFn"), "unexpected rendering `{rendered}`");
    assert!(rendered.contains("wasm_bytes"));
    assert!(rendered.contains("heap_objects"));
}

#[test]
fn entry_point_is_exported_under_the_invoke_name() {
    let mut def = DynFn::<(), i32>::new();
    def.body().ret_i32(0);
    let f = def.finalize().expect("finalize failed");
    let names: Vec<String> = get_exports(f.wasm_bytes())
        .into_iter()
        .map(|(n, _)| n)
        .collect();
    assert!(names.contains(&INVOKE_EXPORT.to_string()));
}

// ══════════════════════════════════════════════════════════════════════════════
// Tests — Host constructors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn host_ctor_returns_a_live_handle() {
    let mut def = DynFn::<(), i32>::new();
    let make = def.host_ctor("make_widget", || Widget { label: "fresh" });
    def.body().call(make).ret();
    let mut new_widget = def.finalize().expect("finalize failed");

    let handle = new_widget.call(()).expect("call failed");
    assert_ne!(handle, 0, "handles are non-zero");
    let widget = new_widget
        .heap()
        .get::<Widget>(handle)
        .expect("heap slot missing");
    assert_eq!(widget.label, "fresh");
}

#[test]
fn each_ctor_call_allocates_a_fresh_object() {
    let mut def = DynFn::<(), i32>::new();
    let make = def.host_ctor("make_widget", || Widget { label: "again" });
    def.body().call(make).drop_value().call(make).ret();
    let mut f = def.finalize().expect("finalize failed");

    assert_eq!(f.call(()).unwrap(), 2);
    assert_eq!(f.heap().len(), 2);
}

#[test]
fn heap_downcast_to_the_wrong_type_is_none() {
    let mut def = DynFn::<(), i32>::new();
    let make = def.host_ctor("make_widget", || Widget { label: "typed" });
    def.body().call(make).ret();
    let mut f = def.finalize().expect("finalize failed");

    let handle = f.call(()).unwrap();
    assert!(f.heap().get::<String>(handle).is_none());
    assert!(f.heap().get::<Widget>(handle).is_some());
}

#[test]
fn heap_objects_are_mutable_from_the_host_side() {
    let mut def = DynFn::<(), i32>::new();
    let make = def.host_ctor("make_counter", || 0u64);
    def.body().call(make).ret();
    let mut f = def.finalize().expect("finalize failed");

    let handle = f.call(()).unwrap();
    *f.heap_mut().get_mut::<u64>(handle).expect("slot missing") += 5;
    assert_eq!(*f.heap().get::<u64>(handle).unwrap(), 5);
}

// ══════════════════════════════════════════════════════════════════════════════
// Tests — Manifest
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn manifest_reflects_the_build() {
    let mut def = DynFn::<(i32, i32), i32>::new();
    def.host_ctor("make_widget", || Widget { label: "listed" });
    let body = def.body();
    let end = body.new_label();
    let acc = body.new_local(ValType::I32);
    body.arg_get(0)
        .arg_get(1)
        .i32_add()
        .local_set(acc)
        .br(end)
        .mark(end)
        .local_get(acc)
        .ret();
    let f = def.finalize().expect("finalize failed");

    let manifest = get_manifest(f.wasm_bytes());
    assert_eq!(manifest.params, ["i32", "i32"]);
    assert_eq!(manifest.results, ["i32"]);
    assert_eq!(manifest.locals, 1);
    assert_eq!(manifest.labels, 1);
    assert_eq!(manifest.instructions, 8);
    assert_eq!(manifest.literal_bytes, 0);
    assert_eq!(manifest.imports, ["env.make_widget"]);
}

#[test]
fn manifest_counts_literal_bytes() {
    // A text literal pushes (pointer, length); the body returns the length,
    // which doubles as a sanity check on the interned string.
    let mut def = DynFn::<(), i32>::new();
    let body = def.body();
    let len = body.new_local(ValType::I32);
    body.str_const("greetings")
        .local_set(len)
        .drop_value()
        .local_get(len)
        .ret();
    let mut f = def.finalize().expect("finalize failed");

    assert_eq!(f.call(()).unwrap(), 9);
    let manifest = get_manifest(f.wasm_bytes());
    assert_eq!(manifest.literal_bytes, 9);
}

#[test]
fn manifest_of_a_unit_function_has_no_results() {
    let mut def = DynFn::<(), ()>::new();
    def.body().nop();
    let f = def.finalize().expect("finalize failed");

    let manifest = get_manifest(f.wasm_bytes());
    assert!(manifest.params.is_empty());
    assert!(manifest.results.is_empty());
    assert!(manifest.imports.is_empty());
}

// ══════════════════════════════════════════════════════════════════════════════
// Tests — Finalize-time errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn unbound_label_fails_at_finalize() {
    let mut def = DynFn::<(), i32>::new();
    let never = def.body().new_label();
    def.body().br(never).i32_const(0).ret();
    let err = def.finalize().unwrap_err();
    assert!(matches!(
        err,
        FinalizeError::Emit(EmitError::UnboundLabel(_))
    ));
}

#[test]
fn argument_out_of_range_fails_at_finalize() {
    let mut def = DynFn::<(i32,), i32>::new();
    def.body().arg_get(3).ret();
    let err = def.finalize().unwrap_err();
    assert!(matches!(
        err,
        FinalizeError::Emit(EmitError::ArgOutOfRange { index: 3, arity: 1 })
    ));
}

#[test]
fn type_invalid_body_fails_validation() {
    // Declared to return i32, body leaves an f64.
    let mut def = DynFn::<(), i32>::new();
    def.body().f64_const(1.0).ret();
    let err = def.finalize().unwrap_err();
    assert!(matches!(
        err,
        FinalizeError::Emit(EmitError::ValidationFailed(_))
    ));
}

#[test]
fn malformed_region_fails_at_finalize() {
    let mut def = DynFn::<(), i32>::new();
    def.body().try_start().i32_const(0).ret();
    let err = def.finalize().unwrap_err();
    assert!(matches!(
        err,
        FinalizeError::Emit(EmitError::UnclosedRegion)
    ));
}
