//! Node snapshots
//!
//! Capture walks the source graph before the native clone and records one
//! [`ComponentState`] per user component, grouped by the node's
//! [`StructuralPath`]. Restore walks the clone in the same order, pairs each
//! clone component with the state captured for the same path, type and
//! occurrence, and writes the captured fields back through the converter
//! chain.
//!
//! Per-clone buffers live in a [`CaptureContext`] drawn from a
//! [`ContextPool`].

pub mod capture;
pub mod context;
pub mod path;
pub mod restore;
pub mod state;

pub use capture::begin_capture;
pub use context::{CaptureContext, ContextPool};
pub use path::StructuralPath;
pub use restore::{restore, RestoreSummary};
pub use state::{ComponentState, FieldSnapshot};

use crate::error::{EngineError, EngineResult};
use crate::host::{NodeRef, Value};

/// Node owning `value`: the node itself, or a component's owner
pub fn graph_root(value: &Value) -> EngineResult<NodeRef> {
    match value {
        Value::Node(node) => Ok(node.clone()),
        Value::Component(component) => component
            .node()
            .ok_or(EngineError::NotAGraphNode("detached component")),
        other => Err(EngineError::NotAGraphNode(other.kind_name())),
    }
}
