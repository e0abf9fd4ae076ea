//! Signature inference from Rust types.
//!
//! The signature of a [`DynFn`](crate::DynFn) is carried entirely by its
//! type parameters: a parameter tuple of arity 0 through 6 and a scalar or
//! unit return. A definition whose body disagrees with the declared
//! signature fails wasm validation at finalize; a call site that disagrees
//! with it does not compile at all.

use wasm_encoder::ValType;

/// Scalar value types a dynamic function can accept or return.
pub trait WasmAbi: wasmi::WasmTy + Copy + Send + Sync + 'static {
    const VAL_TYPE: ValType;
}

macro_rules! impl_abi {
    ($($ty:ty => $val:expr),* $(,)?) => {
        $(impl WasmAbi for $ty {
            const VAL_TYPE: ValType = $val;
        })*
    };
}

impl_abi! {
    i32 => ValType::I32,
    u32 => ValType::I32,
    i64 => ValType::I64,
    u64 => ValType::I64,
    f32 => ValType::F32,
    f64 => ValType::F64,
}

/// Parameter tuples of arity 0 through 6.
pub trait ParamList: wasmi::WasmParams {
    /// Wasm value types of the parameters, in order.
    fn val_types() -> Vec<ValType>;
}

macro_rules! impl_params {
    ($($name:ident)*) => {
        impl<$($name: WasmAbi),*> ParamList for ($($name,)*) {
            fn val_types() -> Vec<ValType> {
                vec![$($name::VAL_TYPE),*]
            }
        }
    };
}

impl_params!();
impl_params!(A);
impl_params!(A B);
impl_params!(A B C);
impl_params!(A B C D);
impl_params!(A B C D E);
impl_params!(A B C D E F);

/// Return shape: one scalar, or `()` for no return value.
pub trait RetValue: wasmi::WasmResults {
    /// Wasm value types of the results: empty or a single entry.
    fn val_types() -> Vec<ValType>;
}

impl RetValue for () {
    fn val_types() -> Vec<ValType> {
        Vec::new()
    }
}

macro_rules! impl_ret {
    ($($ty:ty),* $(,)?) => {
        $(impl RetValue for $ty {
            fn val_types() -> Vec<ValType> {
                vec![<$ty as WasmAbi>::VAL_TYPE]
            }
        })*
    };
}

impl_ret!(i32, u32, i64, u64, f32, f64);
