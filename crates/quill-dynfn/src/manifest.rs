//! Build manifests embedded in finalized modules.
//!
//! Finalize writes a `"quill_manifest"` custom section describing the
//! build: the inferred signature, body statistics, and host imports.
//! External tooling can read the description back without decoding any
//! code.

use serde::{Deserialize, Serialize};
use wasm_encoder::ValType;

/// Name of the custom section carrying the manifest JSON.
pub const MANIFEST_SECTION: &str = "quill_manifest";

/// Description of one finalized dynamic function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Parameter value types, in order, as manifest spellings.
    pub params: Vec<String>,
    /// Result value types: empty or a single entry.
    pub results: Vec<String>,
    /// Locals declared by the body, excluding arguments and scratch.
    pub locals: u32,
    /// Labels minted by the body.
    pub labels: u32,
    /// Instructions recorded by the body, before lowering.
    pub instructions: u32,
    /// Bytes of text literals the body contributes to the module pool.
    pub literal_bytes: u32,
    /// Host imports as `module.name`, in index order.
    pub imports: Vec<String>,
}

impl Manifest {
    pub fn to_json(&self) -> Vec<u8> {
        // Strings and integers only; there is no failing serialization.
        serde_json::to_vec(self).expect("manifest serialization failed")
    }

    pub fn from_json(data: &[u8]) -> Option<Manifest> {
        serde_json::from_slice(data).ok()
    }
}

/// Manifest spelling of a wasm value type.
pub fn type_name(ty: ValType) -> &'static str {
    match ty {
        ValType::I32 => "i32",
        ValType::I64 => "i64",
        ValType::F32 => "f32",
        ValType::F64 => "f64",
        ValType::V128 => "v128",
        ValType::Ref(_) => "ref",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_json() {
        let m = Manifest {
            params: vec!["i32".to_string(), "i32".to_string()],
            results: vec!["i32".to_string()],
            locals: 2,
            labels: 1,
            instructions: 7,
            literal_bytes: 5,
            imports: vec!["env.make_point".to_string()],
        };
        let parsed = Manifest::from_json(&m.to_json()).unwrap();
        assert_eq!(parsed, m);
    }

    #[test]
    fn malformed_json_reads_as_none() {
        assert!(Manifest::from_json(b"not json").is_none());
    }

    #[test]
    fn empty_manifest_still_serializes() {
        let m = Manifest {
            params: Vec::new(),
            results: Vec::new(),
            locals: 0,
            labels: 0,
            instructions: 0,
            literal_bytes: 0,
            imports: Vec::new(),
        };
        let json = m.to_json();
        assert!(!json.is_empty());
        assert_eq!(Manifest::from_json(&json).unwrap(), m);
    }

    #[test]
    fn value_type_spellings() {
        assert_eq!(type_name(ValType::I32), "i32");
        assert_eq!(type_name(ValType::F64), "f64");
    }
}
