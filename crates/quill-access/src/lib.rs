//! Typed member descriptors with derived getter and setter accessors.
//!
//! A [`MemberMap`] registers the fields and properties of one owning type
//! as explicit descriptors, then derives plain-`fn` accessors and
//! kind-checked metadata from them:
//!
//! ```
//! use quill_access::MemberMap;
//!
//! struct Point {
//!     x: i32,
//! }
//!
//! let map = MemberMap::<Point>::new().field("x", |p| p.x, |p, v| p.x = v);
//!
//! let get = map.getter::<i32>("x").unwrap();
//! let set = map.setter::<i32>("x").unwrap();
//!
//! let mut p = Point { x: 3 };
//! set(&mut p, 9);
//! assert_eq!(get(&p), 9);
//! ```
//!
//! Accessors are function pointers over the instance, never closures: an
//! accessor that captures environment does not coerce to `fn`, so captured
//! state is rejected at compile time rather than by a lookup error.

pub mod error;
pub mod member;

pub use error::{AccessError, AccessResult};
pub use member::{MemberInfo, MemberKind, MemberMap};
