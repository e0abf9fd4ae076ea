//! Member descriptors and the accessors derived from them.

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;

use crate::error::{AccessError, AccessResult};

/// Which flavor of member a descriptor names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Property,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MemberKind::Field => "field",
            MemberKind::Property => "property",
        })
    }
}

/// Metadata recorded for one registered member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    /// Member name as registered.
    pub name: &'static str,
    /// Name of the owning type.
    pub declaring_type: &'static str,
    /// Name of the value type the accessors move.
    pub value_type: &'static str,
    pub kind: MemberKind,
    /// Whether a setter can be derived.
    pub writable: bool,
}

/// The accessor pair behind a descriptor. Stored type-erased; lookups
/// recover it by downcasting on the requested value type.
struct Member<T, V> {
    get: fn(&T) -> V,
    set: Option<fn(&mut T, V)>,
}

struct Entry {
    info: MemberInfo,
    accessor: Box<dyn Any + Send + Sync>,
}

/// Registry of member descriptors for one owning type.
///
/// Accessors are plain function pointers over the instance. A closure that
/// captures environment does not coerce to `fn`, so registration rejects
/// captured state at compile time rather than at lookup.
pub struct MemberMap<T: 'static> {
    entries: Vec<Entry>,
    _owner: PhantomData<fn(&T)>,
}

impl<T: 'static> MemberMap<T> {
    pub fn new() -> MemberMap<T> {
        MemberMap {
            entries: Vec::new(),
            _owner: PhantomData,
        }
    }

    // ── Registration ──

    /// Registers a read-write field.
    pub fn field<V: 'static>(
        mut self,
        name: &'static str,
        get: fn(&T) -> V,
        set: fn(&mut T, V),
    ) -> Self {
        self.insert(name, MemberKind::Field, get, Some(set));
        self
    }

    /// Registers a field with no setter. Requesting one reports
    /// [`AccessError::ReadOnly`].
    pub fn field_read_only<V: 'static>(mut self, name: &'static str, get: fn(&T) -> V) -> Self {
        self.insert(name, MemberKind::Field, get, None);
        self
    }

    /// Registers a property. A `None` setter makes it getter-only, and
    /// requesting a setter reports [`AccessError::NoSetter`].
    pub fn property<V: 'static>(
        mut self,
        name: &'static str,
        get: fn(&T) -> V,
        set: Option<fn(&mut T, V)>,
    ) -> Self {
        self.insert(name, MemberKind::Property, get, set);
        self
    }

    fn insert<V: 'static>(
        &mut self,
        name: &'static str,
        kind: MemberKind,
        get: fn(&T) -> V,
        set: Option<fn(&mut T, V)>,
    ) {
        // Registering a name again replaces the earlier descriptor.
        self.entries.retain(|e| e.info.name != name);
        self.entries.push(Entry {
            info: MemberInfo {
                name,
                declaring_type: type_name::<T>(),
                value_type: type_name::<V>(),
                kind,
                writable: set.is_some(),
            },
            accessor: Box::new(Member { get, set }),
        });
    }

    // ── Accessor derivation ──

    /// Derives the getter for `name`.
    pub fn getter<V: 'static>(&self, name: &str) -> AccessResult<fn(&T) -> V> {
        let entry = self.entry(name)?;
        Ok(member::<T, V>(entry)?.get)
    }

    /// Derives the setter for `name`. Writability is checked before the
    /// value type, so a read-only member reports its own variant even when
    /// the requested type is also wrong.
    pub fn setter<V: 'static>(&self, name: &str) -> AccessResult<fn(&mut T, V)> {
        let entry = self.entry(name)?;
        if !entry.info.writable {
            return Err(match entry.info.kind {
                MemberKind::Field => AccessError::ReadOnly {
                    name: entry.info.name.to_string(),
                },
                MemberKind::Property => AccessError::NoSetter {
                    name: entry.info.name.to_string(),
                },
            });
        }
        match member::<T, V>(entry)?.set {
            Some(set) => Ok(set),
            None => Err(AccessError::NoSetter {
                name: entry.info.name.to_string(),
            }),
        }
    }

    // ── Metadata lookups ──

    /// Metadata for `name`, whatever its kind.
    pub fn member_info(&self, name: &str) -> AccessResult<&MemberInfo> {
        Ok(&self.entry(name)?.info)
    }

    /// Metadata for `name`, required to be a field.
    pub fn field_info(&self, name: &str) -> AccessResult<&MemberInfo> {
        self.kind_info(name, MemberKind::Field)
    }

    /// Metadata for `name`, required to be a property.
    pub fn property_info(&self, name: &str) -> AccessResult<&MemberInfo> {
        self.kind_info(name, MemberKind::Property)
    }

    /// All registered descriptors. Replacement moves a name to the end,
    /// otherwise registration order is kept.
    pub fn members(&self) -> impl Iterator<Item = &MemberInfo> + '_ {
        self.entries.iter().map(|e| &e.info)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn kind_info(&self, name: &str, expected: MemberKind) -> AccessResult<&MemberInfo> {
        let info = &self.entry(name)?.info;
        if info.kind == expected {
            Ok(info)
        } else {
            Err(AccessError::KindMismatch {
                name: info.name.to_string(),
                expected,
                actual: info.kind,
            })
        }
    }

    fn entry(&self, name: &str) -> AccessResult<&Entry> {
        if name.is_empty() {
            return Err(AccessError::EmptyName);
        }
        self.entries
            .iter()
            .find(|e| e.info.name == name)
            .ok_or_else(|| AccessError::UnknownMember {
                ty: type_name::<T>(),
                name: name.to_string(),
            })
    }
}

impl<T: 'static> Default for MemberMap<T> {
    fn default() -> Self {
        MemberMap::new()
    }
}

fn member<T: 'static, V: 'static>(entry: &Entry) -> AccessResult<&Member<T, V>> {
    entry
        .accessor
        .downcast_ref::<Member<T, V>>()
        .ok_or_else(|| AccessError::TypeMismatch {
            name: entry.info.name.to_string(),
            requested: type_name::<V>(),
            actual: entry.info.value_type,
        })
}
