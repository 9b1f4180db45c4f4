//! Cycle guard
//!
//! Tracks which reference values and which types are being converted on the
//! active context chain. A value is present exactly while its conversion is
//! in progress; entering returns a scope that removes it again on drop.
//!
//! Each in-progress value is stored with its partner, the duplicate being
//! filled in, so a back-edge `A -> B -> A` resolves to `A' -> B' -> A'`.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::host::{TypeHandle, Value};

/// Values and types currently being converted
#[derive(Debug, Default)]
pub struct CycleGuard {
    partners: FxHashMap<usize, Value>,
    types: FxHashMap<TypeHandle, usize>,
}

impl CycleGuard {
    /// Create an empty guard
    pub fn new() -> Self {
        Self::default()
    }

    /// Duplicate of `value` if its conversion is in progress
    pub fn partner(&self, value: &Value) -> Option<Value> {
        value.ref_id().and_then(|id| self.partners.get(&id).cloned())
    }

    /// Whether `value` is being converted
    pub fn contains(&self, value: &Value) -> bool {
        value
            .ref_id()
            .map(|id| self.partners.contains_key(&id))
            .unwrap_or(false)
    }

    /// Whether a value of type `ty` is being converted
    pub fn is_type_active(&self, ty: TypeHandle) -> bool {
        self.types.contains_key(&ty)
    }

    /// Number of values in progress
    pub fn len(&self) -> usize {
        self.partners.len()
    }

    /// Whether nothing is in progress
    pub fn is_empty(&self) -> bool {
        self.partners.is_empty() && self.types.is_empty()
    }

    fn enter(&mut self, id: Option<usize>, ty: TypeHandle, partner: Value) {
        if let Some(id) = id {
            self.partners.insert(id, partner);
        }
        *self.types.entry(ty).or_insert(0) += 1;
    }

    fn exit(&mut self, id: Option<usize>, ty: TypeHandle) {
        if let Some(id) = id {
            self.partners.remove(&id);
        }
        if let Some(count) = self.types.get_mut(&ty) {
            *count -= 1;
            if *count == 0 {
                self.types.remove(&ty);
            }
        }
    }
}

/// Marks a value as in progress until dropped
#[must_use = "the value leaves the guard when the scope is dropped"]
pub struct GuardScope<'g> {
    guard: &'g Mutex<CycleGuard>,
    id: Option<usize>,
    ty: TypeHandle,
}

impl<'g> GuardScope<'g> {
    /// Record `value` of type `ty` as being converted into `partner`
    pub fn enter(guard: &'g Mutex<CycleGuard>, value: &Value, ty: TypeHandle, partner: Value) -> Self {
        let id = value.ref_id();
        guard.lock().enter(id, ty, partner);
        Self { guard, id, ty }
    }
}

impl Drop for GuardScope<'_> {
    fn drop(&mut self) {
        self.guard.lock().exit(self.id, self.ty);
    }
}
