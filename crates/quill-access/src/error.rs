use thiserror::Error;

use crate::member::MemberKind;

/// Rejections reported by descriptor lookups.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("type `{ty}` has no member named `{name}`")]
    UnknownMember { ty: &'static str, name: String },

    #[error("member name must not be empty")]
    EmptyName,

    #[error("field `{name}` is read-only")]
    ReadOnly { name: String },

    #[error("property `{name}` has no setter")]
    NoSetter { name: String },

    #[error("member `{name}` is a {actual}, not a {expected}")]
    KindMismatch {
        name: String,
        expected: MemberKind,
        actual: MemberKind,
    },

    #[error("member `{name}` holds `{actual}`, not `{requested}`")]
    TypeMismatch {
        name: String,
        requested: &'static str,
        actual: &'static str,
    },
}

pub type AccessResult<T> = Result<T, AccessError>;
