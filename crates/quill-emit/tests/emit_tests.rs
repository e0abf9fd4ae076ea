//! Integration tests for module assembly.
//!
//! Builds modules through [`ModuleBuilder`] and checks the emitted bytes
//! with wasmparser and their behavior under wasmi: export layout, literal
//! placement, import resolution, table dispatch, and the determinism
//! guarantee that identical builder programs produce identical bytes.

use quill_emit::ops::LITERAL_BASE;
use quill_emit::{
    Body, BodyExt, ConstVal, EmitError, ModuleBuilder, ValType, FAULT_NONE, FAULT_PROBE_EXPORT,
};
use wasmi::{Engine, Linker, Module, Store};
use wasmparser::{ExternalKind, Payload};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

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

/// Instantiate a module with no imports via wasmi.
fn instantiate(wasm: &[u8]) -> (Store<()>, wasmi::Instance) {
    let engine = Engine::default();
    let module = Module::new(&engine, wasm).expect("failed to parse wasm module");
    let mut store = Store::new(&engine, ());
    let linker = Linker::<()>::new(&engine);
    let instance = linker
        .instantiate(&mut store, &module)
        .expect("failed to instantiate")
        .start(&mut store)
        .expect("failed to start instance");
    (store, instance)
}

/// A module whose shape exercises labels, locals, a global, and a custom
/// section; used by the determinism tests.
fn sample_module() -> Vec<u8> {
    let mut body = Body::new();
    let skip = body.new_label();
    let acc = body.new_local(ValType::I32);
    body.arg_get(0)
        .local_set(acc)
        .local_get(acc)
        .i32_eqz()
        .br_if(skip)
        .local_get(acc)
        .i32_const(2)
        .i32_mul()
        .local_set(acc)
        .mark(skip)
        .local_get(acc)
        .ret();

    let mut module = ModuleBuilder::new();
    module.global(ConstVal::I64(5), false);
    module.custom_section("note", b"reproducible");
    module.push_func(&[ValType::I32], &[ValType::I32], body, Some("double_nonzero"));
    module.finish().expect("finish failed")
}

// ══════════════════════════════════════════════════════════════════════════════
// Tests — Module shape
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn finished_module_starts_with_the_wasm_magic() {
    let wasm = sample_module();
    assert_eq!(&wasm[..4], b"\0asm");
    assert_eq!(&wasm[4..8], &[1, 0, 0, 0], "expected binary version 1");
}

#[test]
fn identical_builds_produce_identical_bytes() {
    assert_eq!(sample_module(), sample_module());
}

#[test]
fn fault_probe_is_always_exported() {
    let wasm = ModuleBuilder::new().finish().expect("finish failed");
    let exports = get_exports(&wasm);
    assert_eq!(exports.len(), 1, "empty module should export only the probe");
    assert_eq!(exports[0].0, FAULT_PROBE_EXPORT);
    assert_eq!(exports[0].1, ExternalKind::Func);

    let (mut store, instance) = instantiate(&wasm);
    let probe = instance
        .get_typed_func::<(), i32>(&store, FAULT_PROBE_EXPORT)
        .expect("probe export missing");
    assert_eq!(probe.call(&mut store, ()).unwrap(), FAULT_NONE);
}

#[test]
fn memory_is_exported_when_declared() {
    let mut module = ModuleBuilder::new();
    module.memory(2, 16);
    let wasm = module.finish().expect("finish failed");
    let names: Vec<String> = get_exports(&wasm).into_iter().map(|(n, _)| n).collect();
    assert!(names.contains(&"memory".to_string()), "missing memory export");
}

#[test]
fn undeclared_memory_is_absent() {
    let wasm = ModuleBuilder::new().finish().expect("finish failed");
    let names: Vec<String> = get_exports(&wasm).into_iter().map(|(n, _)| n).collect();
    assert!(!names.contains(&"memory".to_string()));
}

#[test]
fn custom_sections_are_preserved() {
    let mut module = ModuleBuilder::new();
    module.custom_section("acme", b"payload");
    let wasm = module.finish().expect("finish failed");

    let mut found = false;
    for payload in wasmparser::Parser::new(0).parse_all(&wasm) {
        if let Ok(Payload::CustomSection(reader)) = payload {
            if reader.name() == "acme" {
                assert_eq!(reader.data(), b"payload");
                found = true;
            }
        }
    }
    assert!(found, "custom section not emitted");
}

#[test]
fn argument_indices_are_validated() {
    let mut body = Body::new();
    body.arg_get(2).ret();
    let mut module = ModuleBuilder::new();
    module.push_func(&[ValType::I32], &[ValType::I32], body, Some("main"));
    let err = module.finish().unwrap_err();
    assert!(matches!(err, EmitError::ArgOutOfRange { index: 2, arity: 1 }));
}

// ══════════════════════════════════════════════════════════════════════════════
// Tests — Execution
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn simple_function_executes() {
    let mut body = Body::new();
    body.arg_get(0).arg_get(1).i32_add().ret();
    let mut module = ModuleBuilder::new();
    module.push_func(
        &[ValType::I32, ValType::I32],
        &[ValType::I32],
        body,
        Some("add"),
    );
    let wasm = module.finish().expect("finish failed");

    let (mut store, instance) = instantiate(&wasm);
    let add = instance
        .get_typed_func::<(i32, i32), i32>(&store, "add")
        .expect("add export missing");
    assert_eq!(add.call(&mut store, (2, 3)).unwrap(), 5);
    assert_eq!(add.call(&mut store, (-7, 7)).unwrap(), 0);
}

#[test]
fn globals_hold_state_across_calls() {
    let mut module = ModuleBuilder::new();
    let counter = module.global(ConstVal::I32(0), true);
    let mut body = Body::new();
    body.global_get(counter)
        .i32_const(1)
        .i32_add()
        .global_set(counter)
        .global_get(counter)
        .ret();
    module.push_func(&[], &[ValType::I32], body, Some("bump"));
    let wasm = module.finish().expect("finish failed");

    let (mut store, instance) = instantiate(&wasm);
    let bump = instance
        .get_typed_func::<(), i32>(&store, "bump")
        .expect("bump export missing");
    assert_eq!(bump.call(&mut store, ()).unwrap(), 1);
    assert_eq!(bump.call(&mut store, ()).unwrap(), 2);
    assert_eq!(bump.call(&mut store, ()).unwrap(), 3);
}

#[test]
fn direct_calls_resolve_across_functions() {
    let mut module = ModuleBuilder::new();
    let mut double = Body::new();
    double.arg_get(0).i32_const(2).i32_mul().ret();
    let double = module.push_func(&[ValType::I32], &[ValType::I32], double, None);

    let mut main = Body::new();
    main.arg_get(0).call(double).ret();
    module.push_func(&[ValType::I32], &[ValType::I32], main, Some("main"));
    let wasm = module.finish().expect("finish failed");

    let (mut store, instance) = instantiate(&wasm);
    let main = instance
        .get_typed_func::<i32, i32>(&store, "main")
        .expect("main export missing");
    assert_eq!(main.call(&mut store, 21).unwrap(), 42);
}

#[test]
fn imports_precede_local_functions() {
    let mut module = ModuleBuilder::new();
    let base = module.import_func("env", "base", &[], &[ValType::I32]);
    let mut body = Body::new();
    body.call(base).arg_get(0).i32_add().ret();
    module.push_func(&[ValType::I32], &[ValType::I32], body, Some("add_base"));
    let wasm = module.finish().expect("finish failed");

    let engine = Engine::default();
    let parsed = Module::new(&engine, &wasm).expect("failed to parse wasm module");
    let mut store = Store::new(&engine, ());
    let mut linker = Linker::<()>::new(&engine);
    linker
        .func_wrap("env", "base", || -> i32 { 7 })
        .expect("failed to register import");
    let instance = linker
        .instantiate(&mut store, &parsed)
        .expect("failed to instantiate")
        .start(&mut store)
        .expect("failed to start instance");

    let add_base = instance
        .get_typed_func::<i32, i32>(&store, "add_base")
        .expect("add_base export missing");
    assert_eq!(add_base.call(&mut store, 35).unwrap(), 42);
}

#[test]
fn indirect_calls_dispatch_through_the_table() {
    let mut module = ModuleBuilder::new();
    let thunk_ty = module.func_type(&[], &[ValType::I32]);

    let mut ten = Body::new();
    ten.ret_i32(10);
    let ten = module.push_func(&[], &[ValType::I32], ten, None);
    let mut twenty = Body::new();
    twenty.ret_i32(20);
    let twenty = module.push_func(&[], &[ValType::I32], twenty, None);
    module.func_table(&[ten, twenty]);

    let mut main = Body::new();
    main.arg_get(0).call_indirect(thunk_ty).ret();
    module.push_func(&[ValType::I32], &[ValType::I32], main, Some("dispatch"));
    let wasm = module.finish().expect("finish failed");

    let (mut store, instance) = instantiate(&wasm);
    let dispatch = instance
        .get_typed_func::<i32, i32>(&store, "dispatch")
        .expect("dispatch export missing");
    assert_eq!(dispatch.call(&mut store, 0).unwrap(), 10);
    assert_eq!(dispatch.call(&mut store, 1).unwrap(), 20);
}

#[test]
fn text_literals_land_in_linear_memory() {
    let mut body = Body::new();
    body.ret_str("hello");
    let mut module = ModuleBuilder::new();
    module.push_func(
        &[],
        &[ValType::I32, ValType::I32],
        body,
        Some("greeting"),
    );
    let wasm = module.finish().expect("finish failed");

    let (mut store, instance) = instantiate(&wasm);
    let greeting = instance
        .get_typed_func::<(), (i32, i32)>(&store, "greeting")
        .expect("greeting export missing");
    let (ptr, len) = greeting.call(&mut store, ()).unwrap();
    assert_eq!(ptr as u32, LITERAL_BASE);
    assert_eq!(len, 5);

    let memory = instance
        .get_memory(&store, "memory")
        .expect("literal should imply an exported memory");
    let bytes = &memory.data(&store)[ptr as usize..(ptr + len) as usize];
    assert_eq!(bytes, b"hello");
}

#[test]
fn repeated_literals_share_one_pool_entry() {
    let mut first = Body::new();
    first.ret_str("shared");
    let mut second = Body::new();
    second.ret_str("shared");

    let mut module = ModuleBuilder::new();
    let results = [ValType::I32, ValType::I32];
    module.push_func(&[], &results, first, Some("a"));
    module.push_func(&[], &results, second, Some("b"));
    let wasm = module.finish().expect("finish failed");

    let (mut store, instance) = instantiate(&wasm);
    let a = instance
        .get_typed_func::<(), (i32, i32)>(&store, "a")
        .expect("a export missing");
    let b = instance
        .get_typed_func::<(), (i32, i32)>(&store, "b")
        .expect("b export missing");
    assert_eq!(
        a.call(&mut store, ()).unwrap(),
        b.call(&mut store, ()).unwrap(),
    );
}

#[test]
fn raw_bytes_pass_through_unchecked() {
    // 0x41 0x07 is `i32.const 7` in the binary format.
    let mut body = Body::new();
    body.raw(&[0x41, 0x07]).ret();
    let mut module = ModuleBuilder::new();
    module.push_func(&[], &[ValType::I32], body, Some("seven"));
    let wasm = module.finish().expect("finish failed");

    let (mut store, instance) = instantiate(&wasm);
    let seven = instance
        .get_typed_func::<(), i32>(&store, "seven")
        .expect("seven export missing");
    assert_eq!(seven.call(&mut store, ()).unwrap(), 7);
}

#[test]
fn composite_emission_matches_spelled_out_calls() {
    let mut composed = Body::new();
    composed.add_i32(2, 3).ret();
    let mut spelled = Body::new();
    spelled.i32_const(2).i32_const(3).i32_add().ret();

    let mut left = ModuleBuilder::new();
    left.push_func(&[], &[ValType::I32], composed, Some("sum"));
    let mut right = ModuleBuilder::new();
    right.push_func(&[], &[ValType::I32], spelled, Some("sum"));
    assert_eq!(
        left.finish().expect("finish failed"),
        right.finish().expect("finish failed"),
    );
}
