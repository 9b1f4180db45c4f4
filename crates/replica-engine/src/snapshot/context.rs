//! Capture contexts and their pool

use crossbeam::queue::SegQueue;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::convert::ReferenceRemap;
use crate::host::{ComponentRef, NodeRef, TypeHandle};
use crate::snapshot::path::StructuralPath;
use crate::snapshot::state::ComponentState;

/// Contexts kept for reuse beyond this count are dropped
const MAX_POOLED: usize = 32;

/// A clone component and the index of its captured state, if any
#[derive(Debug, Clone)]
pub(crate) struct Pairing {
    pub component: ComponentRef,
    pub path: StructuralPath,
    pub state: Option<usize>,
}

/// State carried from capture to restore for one clone operation
///
/// Every buffer is cleared when the context goes back to the pool, so a
/// reused context never sees data from an earlier clone.
#[derive(Debug, Default)]
pub struct CaptureContext {
    pub(crate) source_root: Option<NodeRef>,
    pub(crate) snapshots: FxHashMap<StructuralPath, Vec<ComponentState>>,
    pub(crate) source_nodes: FxHashMap<StructuralPath, NodeRef>,
    pub(crate) suppressed: FxHashSet<TypeHandle>,
    pub(crate) walk: Vec<(NodeRef, StructuralPath)>,
    pub(crate) occurrences: FxHashMap<TypeHandle, usize>,
    pub(crate) pairings: Vec<Pairing>,
    pub(crate) remap: ReferenceRemap,
}

impl CaptureContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Root of the captured graph
    pub fn source_root(&self) -> Option<&NodeRef> {
        self.source_root.as_ref()
    }

    /// Captured states at `path`, in capture order
    pub fn states_at(&self, path: &StructuralPath) -> &[ComponentState] {
        self.snapshots.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of captured component states
    pub fn state_count(&self) -> usize {
        self.snapshots.values().map(Vec::len).sum()
    }

    /// Component types suppressed on behalf of this context
    pub fn suppressed_types(&self) -> impl Iterator<Item = TypeHandle> + '_ {
        self.suppressed.iter().copied()
    }

    /// Whether nothing has been captured
    pub fn is_empty(&self) -> bool {
        self.source_root.is_none() && self.snapshots.is_empty()
    }

    /// Reset every buffer, keeping allocations
    pub fn clear(&mut self) {
        self.source_root = None;
        self.snapshots.clear();
        self.source_nodes.clear();
        self.suppressed.clear();
        self.walk.clear();
        self.occurrences.clear();
        self.pairings.clear();
        self.remap.clear();
    }
}

/// Pool of cleared capture contexts
#[derive(Debug, Default)]
pub struct ContextPool {
    free: SegQueue<Box<CaptureContext>>,
}

impl ContextPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a context, allocating one when the pool is empty
    pub fn acquire(&self) -> Box<CaptureContext> {
        self.free.pop().unwrap_or_default()
    }

    /// Clear `context` and keep it for reuse
    pub fn release(&self, mut context: Box<CaptureContext>) {
        context.clear();
        if self.free.len() < MAX_POOLED {
            self.free.push(context);
        }
    }

    /// Contexts ready for reuse
    pub fn len(&self) -> usize {
        self.free.len()
    }

    /// Whether no context is pooled
    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }
}
