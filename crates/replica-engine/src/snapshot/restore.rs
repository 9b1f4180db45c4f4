//! Snapshot restore

use tracing::{debug, warn};

use crate::classify;
use crate::convert::{ConversionContext, ConversionSession};
use crate::engine::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::host::{CallbackKind, ComponentRef, NodeRef, Value};
use crate::lifecycle::LifecycleCoordinator;
use crate::snapshot::context::{CaptureContext, Pairing};
use crate::snapshot::path::StructuralPath;
use crate::snapshot::state::ComponentState;

/// What one restore did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Clone components matched with a captured state
    pub paired: usize,
    /// User components of the clone without a matching state
    pub unpaired: usize,
    /// Fields written on the clone
    pub fields: usize,
    /// Components whose deferred callbacks were fired
    pub woken: usize,
}

/// Apply the states in `context` to the clone rooted at `clone_root`
///
/// Runs in three passes over the clone, depth-first in sibling order:
/// 1. pair clone nodes and components with their sources and record each
///    pair in the context's reference remap
/// 2. write captured fields through the converter chain, resolving graph
///    references with the remap; a null result leaves the field alone
/// 3. release suppression and fire `after_deserialize`, then `awake` and
///    `on_enable` as the clone's activity allows
///
/// Clone nodes without a structural counterpart are skipped. The context is
/// left populated; the caller hands it back to the pool.
pub fn restore(
    engine: &EngineContext,
    context: &mut CaptureContext,
    clone_root: &NodeRef,
) -> EngineResult<RestoreSummary> {
    if !engine.is_owner_thread() {
        return Err(EngineError::WrongThread);
    }
    let mut summary = RestoreSummary::default();
    if context.source_root.is_none() {
        return Ok(summary);
    }
    let verbose = engine.options().verbose_logging;

    pair(engine, context, clone_root, &mut summary);

    {
        let session = engine.session().with_remap(&context.remap);
        for pairing in &context.pairings {
            let Some(index) = pairing.state else {
                continue;
            };
            let Some(state) = context.snapshots.get(&pairing.path).and_then(|states| states.get(index)) else {
                continue;
            };
            let written = restore_state(&session, &pairing.component, state);
            if verbose {
                debug!(
                    ty = %engine.types().name_of(state.ty),
                    path = %pairing.path,
                    written,
                    "restored component"
                );
            }
            summary.fields += written;
        }
    }

    let mut suppressed = std::mem::take(&mut context.suppressed);
    for &ty in &suppressed {
        engine.lifecycle().release(ty);
    }
    // Only suppressed types missed their callbacks during the native clone.
    for pairing in &context.pairings {
        if suppressed.contains(&pairing.component.ty()) {
            wake(engine.lifecycle(), &pairing.component);
            summary.woken += 1;
        }
    }
    suppressed.clear();
    context.suppressed = suppressed;
    Ok(summary)
}

/// Pair clone components with captured states by type and occurrence
fn pair(engine: &EngineContext, context: &mut CaptureContext, clone_root: &NodeRef, summary: &mut RestoreSummary) {
    let types = engine.types();
    let mut walk = std::mem::take(&mut context.walk);
    walk.clear();
    StructuralPath::walk(clone_root, &mut walk);

    for (node, path) in &walk {
        if let Some(source) = context.source_nodes.get(path) {
            context.remap.register(&Value::Node(node.clone()), &Value::Node(source.clone()));
        }
        context.occurrences.clear();
        let states = context.snapshots.get(path).map(Vec::as_slice).unwrap_or(&[]);

        for component in node.components() {
            let ty = component.ty();
            if classify::is_host_type(types, ty) {
                continue;
            }
            let occurrence = context.occurrences.get(&ty).copied().unwrap_or(0);
            let matched = states
                .iter()
                .enumerate()
                .filter(|(_, state)| state.ty == ty)
                .nth(occurrence)
                .map(|(index, _)| index);

            match matched {
                Some(index) => {
                    context.occurrences.insert(ty, occurrence + 1);
                    context.remap.register(
                        &Value::Component(component.clone()),
                        &Value::Component(states[index].component.clone()),
                    );
                    summary.paired += 1;
                }
                None => summary.unpaired += 1,
            }
            context.pairings.push(Pairing {
                component,
                path: path.clone(),
                state: matched,
            });
        }
    }
    walk.clear();
    context.walk = walk;
}

/// Write the fields of `state` onto `component`; returns how many were set
fn restore_state(session: &ConversionSession<'_>, component: &ComponentRef, state: &ComponentState) -> usize {
    let cache = session.cache();
    let mut holder = Value::Component(component.clone());
    let mut written = 0;
    for snapshot in &state.fields {
        let Some(field) = cache.find_field(component.ty(), &snapshot.name) else {
            continue;
        };
        let ctx = ConversionContext::root(session, &field, snapshot.value.clone());
        let converted = session.engine().convert_if_needed(&ctx);
        if converted.is_null() {
            continue;
        }
        match cache.accessor(&field).set(&mut holder, converted) {
            Ok(()) => written += 1,
            Err(err) => warn!(field = %snapshot.name, error = %err, "failed to restore field"),
        }
    }
    written
}

/// Fire the callbacks the native clone skipped while the type was suppressed
fn wake(lifecycle: &LifecycleCoordinator, component: &ComponentRef) {
    let fire = |kind: CallbackKind| {
        if let Err(err) = lifecycle.invoke(component, kind) {
            warn!(?kind, error = %err, "deferred lifecycle callback failed");
        }
    };
    fire(CallbackKind::AfterDeserialize);
    let active = component.node().map(|node| node.active_in_hierarchy()).unwrap_or(false);
    if active {
        fire(CallbackKind::Awake);
        if component.enabled() {
            fire(CallbackKind::OnEnable);
        }
    }
}
