//! Host object-graph runtime
//!
//! An in-process model of the scene-graph engine the clone engine extends:
//! - [`types`]: the type table with per-field attributes and callbacks
//! - [`value`]: scalar, struct and shared reference values
//! - [`graph`]: nodes and components
//! - [`native`]: the native clone primitive
//!
//! [`Host::instantiate`] wraps the native clone with every installed
//! [`CloneHook`], and all lifecycle dispatch goes through an optional
//! [`LifecycleGate`].

pub mod graph;
pub mod native;
pub mod types;
pub mod value;

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::error::HostError;

pub use graph::{ComponentRef, NodeRef};
pub use native::{instantiate_native, natively_serializable_type, natively_serialized_field};
pub use types::{
    Callback, CallbackKind, FieldAttributes, FieldDef, FieldInfo, FieldKey, FieldModifiers,
    FieldSet, PrimitiveKind, TypeDef, TypeHandle, TypeInfo, TypeKind, TypeOrigin, TypeRegistry,
    Visibility,
};
pub use value::{ArrayRef, DictRef, ListRef, ObjectRef, StructValue, Value};

/// Extension point around the native clone
pub trait CloneHook: Send + Sync {
    /// Called before the native clone; the returned state is handed back to
    /// [`CloneHook::on_after_clone`]
    fn on_before_clone(&self, source: &Value) -> Option<Box<dyn Any + Send>>;

    /// Called after the native clone with `None` when it failed
    fn on_after_clone(&self, state: Box<dyn Any + Send>, result: Option<&Value>);
}

/// Decides whether a lifecycle entry point runs its body
pub trait LifecycleGate: Send + Sync {
    /// Whether `kind` is currently suppressed for components of type `ty`
    fn suppresses(&self, ty: TypeHandle, kind: CallbackKind) -> bool;
}

/// Most derived callback of `kind` declared along the type chain of `ty`
pub fn resolve_callback(
    types: &TypeRegistry,
    ty: TypeHandle,
    kind: CallbackKind,
) -> Result<Option<Callback>, HostError> {
    Ok(types
        .chain(ty)?
        .iter()
        .find_map(|info| info.callbacks.get(kind).cloned()))
}

/// The host runtime
pub struct Host {
    types: Arc<TypeRegistry>,
    hooks: RwLock<Vec<Arc<dyn CloneHook>>>,
    gate: RwLock<Option<Arc<dyn LifecycleGate>>>,
}

impl Host {
    /// Create a host with a fresh type table
    pub fn new() -> Self {
        Self::with_types(Arc::new(TypeRegistry::new()))
    }

    /// Create a host over an existing type table
    pub fn with_types(types: Arc<TypeRegistry>) -> Self {
        Self {
            types,
            hooks: RwLock::new(Vec::new()),
            gate: RwLock::new(None),
        }
    }

    /// Type table
    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    /// Install a clone hook
    pub fn install_hook(&self, hook: Arc<dyn CloneHook>) {
        self.hooks.write().push(hook);
    }

    /// Remove every clone hook
    pub fn clear_hooks(&self) {
        self.hooks.write().clear();
    }

    /// Install the lifecycle gate
    pub fn set_gate(&self, gate: Arc<dyn LifecycleGate>) {
        *self.gate.write() = Some(gate);
    }

    /// Attach a component and run its activation callbacks
    pub fn add_component(&self, node: &NodeRef, ty: TypeHandle) -> Result<ComponentRef, HostError> {
        let component = node.add_component(&self.types, ty)?;
        if node.active_in_hierarchy() {
            self.dispatch(&component, CallbackKind::Awake);
            if component.enabled() {
                self.dispatch(&component, CallbackKind::OnEnable);
            }
        }
        Ok(component)
    }

    /// Run a lifecycle entry point unless the gate suppresses it
    ///
    /// Returns whether a callback body ran. Callback failures are logged.
    pub fn dispatch(&self, component: &ComponentRef, kind: CallbackKind) -> bool {
        let gate = self.gate.read().clone();
        if let Some(gate) = gate {
            if gate.suppresses(component.ty(), kind) {
                return false;
            }
        }
        match resolve_callback(&self.types, component.ty(), kind) {
            Ok(Some(callback)) => {
                if let Err(err) = callback(component) {
                    warn!(?kind, error = %err, "lifecycle callback failed");
                }
                true
            }
            Ok(None) => false,
            Err(err) => {
                warn!(?kind, error = %err, "lifecycle callback lookup failed");
                false
            }
        }
    }

    /// Clone `source` through every installed hook
    pub fn instantiate(&self, source: &Value) -> Result<Value, HostError> {
        let hooks = self.hooks.read().clone();
        let states: Vec<_> = hooks.iter().map(|hook| hook.on_before_clone(source)).collect();
        let result = instantiate_native(self, source);
        for (hook, state) in hooks.iter().zip(states) {
            if let Some(state) = state {
                hook.on_after_clone(state, result.as_ref().ok());
            }
        }
        result
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}
