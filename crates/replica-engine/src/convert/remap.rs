//! Reference remap
//!
//! Pairs clone-side graph objects with their source-side counterparts for the
//! duration of one restore. Converters use the reverse direction to point a
//! captured source reference at the matching clone.

use rustc_hash::FxHashMap;

use crate::host::Value;

/// Clone/source pairs for nodes and components
#[derive(Debug, Default)]
pub struct ReferenceRemap {
    clone_to_source: FxHashMap<usize, Value>,
    source_to_clone: FxHashMap<usize, Value>,
}

impl ReferenceRemap {
    /// Create an empty remap
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `clone` was produced from `source`
    ///
    /// Values without identity are ignored.
    pub fn register(&mut self, clone: &Value, source: &Value) {
        if let (Some(clone_id), Some(source_id)) = (clone.ref_id(), source.ref_id()) {
            self.clone_to_source.insert(clone_id, source.clone());
            self.source_to_clone.insert(source_id, clone.clone());
        }
    }

    /// Source counterpart of `clone`
    pub fn source_of(&self, clone: &Value) -> Option<Value> {
        clone.ref_id().and_then(|id| self.clone_to_source.get(&id).cloned())
    }

    /// Clone counterpart of `source`
    pub fn clone_of(&self, source: &Value) -> Option<Value> {
        source.ref_id().and_then(|id| self.source_to_clone.get(&id).cloned())
    }

    /// Number of pairs
    pub fn len(&self) -> usize {
        self.clone_to_source.len()
    }

    /// Whether no pair is registered
    pub fn is_empty(&self) -> bool {
        self.clone_to_source.is_empty()
    }

    /// Forget every pair, keeping allocations
    pub fn clear(&mut self) {
        self.clone_to_source.clear();
        self.source_to_clone.clear();
    }
}
