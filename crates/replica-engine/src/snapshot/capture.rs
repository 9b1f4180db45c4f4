//! Snapshot capture

use tracing::{debug, warn};

use crate::classify;
use crate::convert::{ConversionContext, ConversionSession};
use crate::engine::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::host::{CallbackKind, ComponentRef, NodeRef, Value};
use crate::snapshot::context::CaptureContext;
use crate::snapshot::path::StructuralPath;
use crate::snapshot::state::{ComponentState, FieldSnapshot};

/// Capture the state of every user component below `root`
///
/// Nodes are visited depth-first in sibling order. Each user component gets
/// its `before_serialize` callback, is registered with the field registry
/// and has its eligible non-null fields converted into a
/// [`ComponentState`]. Host components are skipped. Once the walk is done,
/// lifecycle callbacks are suppressed for every captured type until the
/// context is restored or discarded.
pub fn begin_capture(engine: &EngineContext, root: &NodeRef) -> EngineResult<Box<CaptureContext>> {
    if !engine.is_owner_thread() {
        return Err(EngineError::WrongThread);
    }
    let verbose = engine.options().verbose_logging;
    let types = engine.types();
    let session = engine.session();

    let mut context = engine.pool().acquire();
    context.source_root = Some(root.clone());
    let mut walk = std::mem::take(&mut context.walk);
    StructuralPath::walk(root, &mut walk);

    for (node, path) in &walk {
        context.source_nodes.insert(path.clone(), node.clone());
        for component in node.components() {
            let ty = component.ty();
            if classify::is_host_type(types, ty) {
                continue;
            }
            if let Err(err) = engine.lifecycle().invoke(&component, CallbackKind::BeforeSerialize) {
                warn!(ty = %types.name_of(ty), error = %err, "before_serialize failed");
            }
            engine.registry().register_component(&component);
            let state = capture_state(&session, &component);
            if verbose {
                debug!(
                    ty = %types.name_of(ty),
                    node = %node.name(),
                    path = %path,
                    fields = state.fields.len(),
                    "captured component"
                );
            }
            context.snapshots.entry(path.clone()).or_default().push(state);
            context.suppressed.insert(ty);
        }
    }
    walk.clear();
    context.walk = walk;

    for &ty in &context.suppressed {
        engine.lifecycle().suppress(ty);
    }
    Ok(context)
}

/// Converted values of the eligible fields of `component`
///
/// Null fields are left out so the clone keeps its own defaults.
pub(crate) fn capture_state(session: &ConversionSession<'_>, component: &ComponentRef) -> ComponentState {
    let mut state = ComponentState::new(component);
    let Some(fields) = session.registry().fields_for_type(component.ty()) else {
        return state;
    };
    let holder = Value::Component(component.clone());
    for field in fields.iter() {
        let value = match session.cache().accessor(field).get(&holder) {
            Ok(value) => value,
            Err(err) => {
                warn!(field = %field.name, error = %err, "failed to read field for capture");
                continue;
            }
        };
        if value.is_null() {
            continue;
        }
        let ctx = ConversionContext::root(session, field, value);
        let converted = session.engine().convert_if_needed(&ctx);
        if converted.is_null() {
            continue;
        }
        state.fields.push(FieldSnapshot {
            name: field.name.to_string(),
            value: converted,
        });
    }
    state
}
