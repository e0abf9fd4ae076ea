//! Module assembly.
//!
//! A [`ModuleBuilder`] collects imports, types, globals, memory, a function
//! table, function bodies, and custom sections in any order, then `finish`
//! seals every body, lays the sections out canonically, and validates the
//! bytes. Identical builder programs produce identical bytes.

use std::borrow::Cow;
use std::collections::HashMap;

use wasm_encoder::{
    CodeSection, ConstExpr, CustomSection, DataSection, ElementSection, Elements, EntityType,
    ExportKind, ExportSection, Function, FunctionSection, GlobalSection, GlobalType,
    ImportSection, Instruction, MemorySection, MemoryType, Module, RefType, TableSection,
    TableType, TypeSection, ValType,
};

use crate::body::Body;
use crate::error::{EmitError, EmitResult};
use crate::lower;
use crate::ops::{
    ConstVal, FuncRef, FuncSlot, GlobalRef, TypeRef, DEFAULT_MEMORY_MAX, DEFAULT_MEMORY_MIN,
    FAULT_GLOBAL, FAULT_NONE, FAULT_PROBE_EXPORT, LITERAL_BASE,
};

/// Text literals interned by sealed bodies, packed from [`LITERAL_BASE`].
/// Interning the same string twice yields the same (pointer, length) pair.
#[derive(Debug, Default)]
pub(crate) struct LiteralPool {
    bytes: Vec<u8>,
    seen: HashMap<String, (u32, u32)>,
}

impl LiteralPool {
    pub(crate) fn intern(&mut self, s: &str) -> (u32, u32) {
        if let Some(&at) = self.seen.get(s) {
            return at;
        }
        let at = (LITERAL_BASE + self.bytes.len() as u32, s.len() as u32);
        self.bytes.extend_from_slice(s.as_bytes());
        self.seen.insert(s.to_string(), at);
        at
    }

    fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug)]
struct ImportEntry {
    module: String,
    name: String,
    ty: u32,
}

#[derive(Debug)]
struct FuncEntry {
    ty: u32,
    params: Vec<ValType>,
    body: Body,
    export: Option<String>,
}

/// Collects the parts of one wasm module and assembles them on `finish`.
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    types: Vec<(Vec<ValType>, Vec<ValType>)>,
    imports: Vec<ImportEntry>,
    globals: Vec<(ConstVal, bool)>,
    memory_limits: Option<(u64, u64)>,
    table: Vec<FuncRef>,
    funcs: Vec<FuncEntry>,
    customs: Vec<(String, Vec<u8>)>,
    pool: LiteralPool,
}

impl ModuleBuilder {
    pub fn new() -> ModuleBuilder {
        ModuleBuilder::default()
    }

    /// Interns a function type for use with `call_indirect`.
    pub fn func_type(&mut self, params: &[ValType], results: &[ValType]) -> TypeRef {
        TypeRef(self.intern_type(params, results))
    }

    fn intern_type(&mut self, params: &[ValType], results: &[ValType]) -> u32 {
        for (i, (p, r)) in self.types.iter().enumerate() {
            if p == params && r == results {
                return i as u32;
            }
        }
        self.types.push((params.to_vec(), results.to_vec()));
        (self.types.len() - 1) as u32
    }

    /// Declares a function import. Imports occupy the low function indices,
    /// in declaration order.
    pub fn import_func(
        &mut self,
        module: &str,
        name: &str,
        params: &[ValType],
        results: &[ValType],
    ) -> FuncRef {
        let ty = self.intern_type(params, results);
        self.imports.push(ImportEntry {
            module: module.to_string(),
            name: name.to_string(),
            ty,
        });
        FuncRef(FuncSlot::Import((self.imports.len() - 1) as u32))
    }

    /// Declares a user global. The fault register owns index 0, so user
    /// globals are numbered from 1.
    pub fn global(&mut self, init: ConstVal, mutable: bool) -> GlobalRef {
        self.globals.push((init, mutable));
        GlobalRef(self.globals.len() as u32)
    }

    /// Declares linear memory, in 64 KiB pages. Implied with default limits
    /// when a body interns a text literal; exported as `"memory"`.
    pub fn memory(&mut self, min_pages: u64, max_pages: u64) {
        self.memory_limits = Some((min_pages, max_pages));
    }

    /// Declares the function table used by `call_indirect`, populated with
    /// `funcs` from slot 0.
    pub fn func_table(&mut self, funcs: &[FuncRef]) {
        self.table = funcs.to_vec();
    }

    /// Appends a function; `export` names it in the export section.
    pub fn push_func(
        &mut self,
        params: &[ValType],
        results: &[ValType],
        body: Body,
        export: Option<&str>,
    ) -> FuncRef {
        let ty = self.intern_type(params, results);
        self.funcs.push(FuncEntry {
            ty,
            params: params.to_vec(),
            body,
            export: export.map(str::to_string),
        });
        FuncRef(FuncSlot::Local((self.funcs.len() - 1) as u32))
    }

    /// Appends a custom section, emitted after the data section in
    /// declaration order.
    pub fn custom_section(&mut self, name: &str, data: &[u8]) {
        self.customs.push((name.to_string(), data.to_vec()));
    }

    /// Declared imports in index order, as (module, name) pairs.
    pub fn imports(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.imports
            .iter()
            .map(|i| (i.module.as_str(), i.name.as_str()))
    }

    /// Seals every body, assembles the sections, and validates the result.
    ///
    /// All deferred emitter errors report here: unbound or doubly marked
    /// labels, branch patterns that do not nest, malformed exception
    /// regions, and type-invalid instruction streams (the latter through
    /// validation).
    pub fn finish(mut self) -> EmitResult<Vec<u8>> {
        let import_count = self.imports.len() as u32;

        // 1. Seal user bodies, interning their literals.
        let mut sealed: Vec<Function> = Vec::with_capacity(self.funcs.len() + 1);
        for entry in &self.funcs {
            sealed.push(lower::seal(
                &entry.body,
                &entry.params,
                import_count,
                &mut self.pool,
            )?);
        }

        // 2. Fault probe: () -> i32, returns the register and clears it.
        let probe_ty = self.intern_type(&[], &[ValType::I32]);
        let mut probe = Function::new(vec![]);
        probe.instruction(&Instruction::GlobalGet(FAULT_GLOBAL));
        probe.instruction(&Instruction::I32Const(FAULT_NONE));
        probe.instruction(&Instruction::GlobalSet(FAULT_GLOBAL));
        probe.instruction(&Instruction::End);

        let memory_limits = match self.memory_limits {
            Some(limits) => Some(limits),
            None if !self.pool.is_empty() => Some((DEFAULT_MEMORY_MIN, DEFAULT_MEMORY_MAX)),
            None => None,
        };

        let mut module = Module::new();

        // 3. Types.
        let mut types = TypeSection::new();
        for (params, results) in &self.types {
            types
                .ty()
                .function(params.iter().copied(), results.iter().copied());
        }
        module.section(&types);

        // 4. Imports.
        if !self.imports.is_empty() {
            let mut imports = ImportSection::new();
            for entry in &self.imports {
                imports.import(&entry.module, &entry.name, EntityType::Function(entry.ty));
            }
            module.section(&imports);
        }

        // 5. Function declarations: user bodies, then the probe.
        let mut functions = FunctionSection::new();
        for entry in &self.funcs {
            functions.function(entry.ty);
        }
        functions.function(probe_ty);
        module.section(&functions);

        // 6. Table.
        if !self.table.is_empty() {
            let mut tables = TableSection::new();
            tables.table(TableType {
                element_type: RefType::FUNCREF,
                table64: false,
                minimum: self.table.len() as u64,
                maximum: Some(self.table.len() as u64),
                shared: false,
            });
            module.section(&tables);
        }

        // 7. Memory.
        if let Some((min, max)) = memory_limits {
            let mut memories = MemorySection::new();
            memories.memory(MemoryType {
                minimum: min,
                maximum: Some(max),
                memory64: false,
                shared: false,
                page_size_log2: None,
            });
            module.section(&memories);
        }

        // 8. Globals: the fault register, then user globals from index 1.
        let mut globals = GlobalSection::new();
        globals.global(
            GlobalType {
                val_type: ValType::I32,
                mutable: true,
                shared: false,
            },
            &ConstExpr::i32_const(FAULT_NONE),
        );
        for (init, mutable) in &self.globals {
            globals.global(
                GlobalType {
                    val_type: init.val_type(),
                    mutable: *mutable,
                    shared: false,
                },
                &init.const_expr(),
            );
        }
        module.section(&globals);

        // 9. Exports: user functions, memory, fault probe.
        let mut exports = ExportSection::new();
        for (i, entry) in self.funcs.iter().enumerate() {
            if let Some(name) = &entry.export {
                exports.export(name, ExportKind::Func, import_count + i as u32);
            }
        }
        if memory_limits.is_some() {
            exports.export("memory", ExportKind::Memory, 0);
        }
        let probe_index = import_count + self.funcs.len() as u32;
        exports.export(FAULT_PROBE_EXPORT, ExportKind::Func, probe_index);
        module.section(&exports);

        // 10. Elements.
        if !self.table.is_empty() {
            let resolved: Vec<u32> = self
                .table
                .iter()
                .map(|f| match f.0 {
                    FuncSlot::Import(i) => i,
                    FuncSlot::Local(i) => import_count + i,
                })
                .collect();
            let mut elements = ElementSection::new();
            elements.active(
                None,
                &ConstExpr::i32_const(0),
                Elements::Functions(resolved.as_slice().into()),
            );
            module.section(&elements);
        }

        // 11. Code.
        let mut code = CodeSection::new();
        for f in &sealed {
            code.function(f);
        }
        code.function(&probe);
        module.section(&code);

        // 12. Data: the literal pool.
        if memory_limits.is_some() && !self.pool.is_empty() {
            let mut data = DataSection::new();
            data.active(
                0,
                &ConstExpr::i32_const(LITERAL_BASE as i32),
                self.pool.bytes.iter().copied(),
            );
            module.section(&data);
        }

        // 13. Custom sections.
        for (name, bytes) in &self.customs {
            module.section(&CustomSection {
                name: Cow::Borrowed(name),
                data: Cow::Borrowed(bytes),
            });
        }

        let wasm = module.finish();
        wasmparser::validate(&wasm).map_err(|e| EmitError::ValidationFailed(format!("{e}")))?;
        Ok(wasm)
    }
}
