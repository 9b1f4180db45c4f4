//! Lifecycle coordinator
//!
//! While a clone is in flight, every component type touched by the capture is
//! suppressed: the host's lifecycle entry points for that type return without
//! running. Suppression is counted per type so overlapping clones can share a
//! type. Once state is restored, the restorer fires the deferred callbacks
//! itself through [`LifecycleCoordinator::invoke`], which bypasses
//! suppression.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use crate::cache::BoundedCache;
use crate::error::HostError;
use crate::host::{resolve_callback, Callback, CallbackKind, ComponentRef, LifecycleGate, TypeHandle, TypeRegistry};

/// Per-type suppression counts and cached callback invokers
pub struct LifecycleCoordinator {
    types: Arc<TypeRegistry>,
    counts: DashMap<TypeHandle, usize>,
    invokers: BoundedCache<(TypeHandle, CallbackKind), Option<Callback>>,
}

impl LifecycleCoordinator {
    /// Create a coordinator with nothing suppressed
    pub fn new(types: Arc<TypeRegistry>, capacity: u64) -> Self {
        Self {
            types,
            counts: DashMap::new(),
            invokers: BoundedCache::new(capacity),
        }
    }

    /// Suppress lifecycle entry points for `ty`
    pub fn suppress(&self, ty: TypeHandle) {
        *self.counts.entry(ty).or_insert(0) += 1;
    }

    /// Undo one [`LifecycleCoordinator::suppress`] for `ty`
    pub fn release(&self, ty: TypeHandle) {
        let drained = match self.counts.get_mut(&ty) {
            Some(mut count) => {
                *count = count.saturating_sub(1);
                *count == 0
            }
            None => {
                warn!(ty = %self.types.name_of(ty), "release without matching suppress");
                false
            }
        };
        if drained {
            self.counts.remove_if(&ty, |_, count| *count == 0);
        }
    }

    /// Whether entry points for `ty` are currently suppressed
    pub fn is_suppressed(&self, ty: TypeHandle) -> bool {
        self.suppression_count(ty) > 0
    }

    /// Outstanding suppressions for `ty`
    pub fn suppression_count(&self, ty: TypeHandle) -> usize {
        self.counts.get(&ty).map(|count| *count).unwrap_or(0)
    }

    /// Callback of `kind` for components of `ty`, resolved once and cached
    ///
    /// Types without such a callback are cached as `None` too.
    pub fn invoker(&self, ty: TypeHandle, kind: CallbackKind) -> Result<Option<Callback>, HostError> {
        self.invokers
            .try_get_or_insert_with((ty, kind), || resolve_callback(&self.types, ty, kind))
    }

    /// Run the `kind` callback on `component`, ignoring suppression
    ///
    /// Returns whether a callback ran.
    pub fn invoke(&self, component: &ComponentRef, kind: CallbackKind) -> Result<bool, HostError> {
        match self.invoker(component.ty(), kind)? {
            Some(callback) => {
                callback(component)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop cached invokers and every outstanding suppression
    pub fn clear(&self) {
        self.counts.clear();
        self.invokers.clear();
    }
}

impl LifecycleGate for LifecycleCoordinator {
    fn suppresses(&self, ty: TypeHandle, _kind: CallbackKind) -> bool {
        self.is_suppressed(ty)
    }
}
