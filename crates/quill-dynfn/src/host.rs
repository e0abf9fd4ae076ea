//! Host-side object storage for constructor imports.

use std::any::Any;

/// Slab of host objects created by constructor imports.
///
/// Handles are non-zero i32 values (slot index plus one); 0 is the null
/// handle and is never produced, so a body can test a freshly constructed
/// handle against zero.
#[derive(Default)]
pub struct HostHeap {
    objects: Vec<Box<dyn Any + Send + Sync>>,
}

impl HostHeap {
    /// Stores `object` and returns its handle.
    ///
    /// Handles must stay positive i32 values; a heap that outgrows that
    /// range cannot hand out valid handles, so `insert` panics instead of
    /// wrapping into the null or negative range.
    pub fn insert<T: Any + Send + Sync>(&mut self, object: T) -> i32 {
        self.objects.push(Box::new(object));
        i32::try_from(self.objects.len()).expect("host heap exceeded the i32 handle range")
    }

    /// Resolves a handle and downcasts the object to `T`.
    pub fn get<T: Any>(&self, handle: i32) -> Option<&T> {
        if handle <= 0 {
            return None;
        }
        self.objects.get(handle as usize - 1)?.downcast_ref()
    }

    /// Mutable variant of [`get`](HostHeap::get).
    pub fn get_mut<T: Any>(&mut self, handle: i32) -> Option<&mut T> {
        if handle <= 0 {
            return None;
        }
        self.objects.get_mut(handle as usize - 1)?.downcast_mut()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
