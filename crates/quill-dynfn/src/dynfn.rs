//! Dynamic function definition, finalization, and invocation.
//!
//! Build order:
//!
//! 1. `DynFn::<P, R>::new()` creates the shell; the signature is carried
//!    by the type parameters.
//! 2. The body builder and the module shell record whatever the function
//!    needs: instructions, globals, helper functions, host constructors.
//! 3. `finalize` consumes the definition, encodes and validates a module,
//!    instantiates it, and resolves the typed entry points. Calling
//!    `finalize` twice is unrepresentable: the definition is gone.
//! 4. `CompiledFn::call` runs the function; failures classify through the
//!    fault probe before falling back to the engine's trap code.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use wasmi::core::TrapCode;
use wasmi::{Caller, Engine, Linker, Module, Store, TypedFunc};

use quill_emit::{
    Body, FuncRef, ModuleBuilder, Tag, ValType, FAULT_NONE, FAULT_OVERFLOW, FAULT_PROBE_EXPORT,
    FAULT_USER_BASE,
};

use crate::error::{FinalizeError, FinalizeResult, InvokeError, InvokeResult};
use crate::host::HostHeap;
use crate::manifest::{type_name, Manifest, MANIFEST_SECTION};
use crate::sig::{ParamList, RetValue};

/// Export name of the finalized entry point.
pub const INVOKE_EXPORT: &str = "__invoke";

type Registrar = Box<dyn FnOnce(&mut Linker<HostHeap>) -> Result<(), String>>;

/// A dynamic function under construction.
pub struct DynFn<P, R> {
    module: ModuleBuilder,
    body: Body,
    ctors: Vec<(String, Registrar)>,
    _signature: PhantomData<fn(P) -> R>,
}

impl<P: ParamList, R: RetValue> DynFn<P, R> {
    /// Creates an empty definition with the signature carried by `P` and
    /// `R`.
    pub fn new() -> DynFn<P, R> {
        DynFn {
            module: ModuleBuilder::new(),
            body: Body::new(),
            ctors: Vec::new(),
            _signature: PhantomData,
        }
    }

    /// The body under construction.
    pub fn body(&mut self) -> &mut Body {
        &mut self.body
    }

    /// The underlying module shell, for globals, helper functions, tables,
    /// extra imports, and custom sections.
    pub fn module(&mut self) -> &mut ModuleBuilder {
        &mut self.module
    }

    /// Registers a host constructor import `env.{name}`: each call runs
    /// `factory`, stores the object in the instance heap, and leaves its
    /// non-zero handle on the stack.
    pub fn host_ctor<T, F>(&mut self, name: &str, factory: F) -> FuncRef
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let func = self.module.import_func("env", name, &[], &[ValType::I32]);
        let import = name.to_string();
        self.ctors.push((
            import.clone(),
            Box::new(move |linker: &mut Linker<HostHeap>| {
                linker
                    .func_wrap(
                        "env",
                        &import,
                        move |mut caller: Caller<'_, HostHeap>| -> i32 {
                            caller.data_mut().insert(factory())
                        },
                    )
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            }),
        ));
        func
    }

    /// Consumes the definition: exports the body as [`INVOKE_EXPORT`],
    /// embeds the build manifest, encodes and validates the module,
    /// instantiates it, and resolves the typed entry points.
    ///
    /// Every deferred emitter error surfaces here, wrapped in
    /// [`FinalizeError`].
    pub fn finalize(mut self) -> FinalizeResult<CompiledFn<P, R>> {
        let params = P::val_types();
        let results = R::val_types();

        let manifest = Manifest {
            params: params.iter().map(|t| type_name(*t).to_string()).collect(),
            results: results.iter().map(|t| type_name(*t).to_string()).collect(),
            locals: self.body.local_count(),
            labels: self.body.label_count(),
            instructions: self.body.instruction_count(),
            literal_bytes: self.body.literal_bytes(),
            imports: self
                .module
                .imports()
                .map(|(module, name)| format!("{module}.{name}"))
                .collect(),
        };
        self.module
            .custom_section(MANIFEST_SECTION, &manifest.to_json());
        self.module
            .push_func(&params, &results, self.body, Some(INVOKE_EXPORT));
        let wasm = self.module.finish()?;

        let engine = Engine::default();
        let module = Module::new(&engine, &wasm)?;
        let mut store = Store::new(&engine, HostHeap::default());
        let mut linker = Linker::<HostHeap>::new(&engine);
        for (name, register) in self.ctors {
            register(&mut linker)
                .map_err(|reason| FinalizeError::ImportRegistration { name, reason })?;
        }
        let instance = linker.instantiate(&mut store, &module)?.start(&mut store)?;
        let entry = instance.get_typed_func::<P, R>(&store, INVOKE_EXPORT)?;
        let fault = instance.get_typed_func::<(), i32>(&store, FAULT_PROBE_EXPORT)?;
        Ok(CompiledFn {
            wasm,
            store,
            entry,
            fault,
        })
    }
}

impl<P: ParamList, R: RetValue> Default for DynFn<P, R> {
    fn default() -> Self {
        DynFn::new()
    }
}

/// A finalized, reusable callable with its own instance state.
pub struct CompiledFn<P, R> {
    wasm: Vec<u8>,
    store: Store<HostHeap>,
    entry: TypedFunc<P, R>,
    fault: TypedFunc<(), i32>,
}

impl<P: ParamList, R: RetValue> CompiledFn<P, R> {
    /// Invokes the function.
    pub fn call(&mut self, params: P) -> InvokeResult<R> {
        match self.entry.call(&mut self.store, params) {
            Ok(value) => Ok(value),
            Err(err) => Err(self.classify(err)),
        }
    }

    /// Maps a failed call: a pending fault code wins over the engine's
    /// trap code, because raises and checked overflows reach the engine as
    /// plain unreachable traps.
    fn classify(&mut self, err: wasmi::Error) -> InvokeError {
        let code = self.fault.call(&mut self.store, ()).unwrap_or(FAULT_NONE);
        if code == FAULT_OVERFLOW {
            return InvokeError::Overflow;
        }
        if code >= FAULT_USER_BASE {
            return InvokeError::Raised(Tag::from_code(code));
        }
        match err.as_trap_code() {
            Some(TrapCode::IntegerDivisionByZero) => InvokeError::DivisionByZero,
            Some(TrapCode::IntegerOverflow) => InvokeError::Overflow,
            _ => InvokeError::Trap(err),
        }
    }

    /// Host objects created by constructor imports.
    pub fn heap(&self) -> &HostHeap {
        self.store.data()
    }

    /// Mutable access to the host objects.
    pub fn heap_mut(&mut self) -> &mut HostHeap {
        self.store.data_mut()
    }

    /// The validated module bytes this callable was instantiated from,
    /// manifest section included.
    pub fn wasm_bytes(&self) -> &[u8] {
        &self.wasm
    }
}

impl<P, R> fmt::Debug for CompiledFn<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFn")
            .field("wasm_bytes", &self.wasm.len())
            .field("heap_objects", &self.store.data().len())
            .finish_non_exhaustive()
    }
}
