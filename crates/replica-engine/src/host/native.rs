//! Native clone primitive
//!
//! Duplicates a node tree the way the host serializer does: topology, active
//! flags and components are reproduced, but only natively serializable fields
//! are copied. Everything else on the clone keeps the value its initializer
//! produced.

use rustc_hash::FxHashMap;

use crate::error::HostError;
use crate::host::graph::{ComponentRef, NodeRef};
use crate::host::types::{CallbackKind, FieldInfo, TypeHandle, TypeKind, TypeOrigin, TypeRegistry};
use crate::host::value::{ArrayRef, ListRef, ObjectRef, StructValue, Value};
use crate::host::Host;

/// Whether the host serializer handles values of `ty` on its own
pub fn natively_serializable_type(types: &TypeRegistry, ty: TypeHandle) -> bool {
    let Ok(info) = types.get(ty) else {
        return false;
    };
    match info.kind {
        TypeKind::Primitive(_) | TypeKind::Enum | TypeKind::String => true,
        TypeKind::Node | TypeKind::Component => true,
        TypeKind::Struct | TypeKind::Class => info.origin == TypeOrigin::Host,
        TypeKind::Interface | TypeKind::Dictionary { .. } => false,
        TypeKind::Array { element, rank } => rank == 1 && natively_serializable_element(types, element),
        TypeKind::List { element } => natively_serializable_element(types, element),
    }
}

fn natively_serializable_element(types: &TypeRegistry, element: TypeHandle) -> bool {
    let nested = types
        .get(element)
        .map(|info| matches!(info.kind, TypeKind::Array { .. } | TypeKind::List { .. }))
        .unwrap_or(true);
    !nested && natively_serializable_type(types, element)
}

/// Whether the host serializer copies this field on its own
pub fn natively_serialized_field(types: &TypeRegistry, field: &FieldInfo) -> bool {
    field.slot.is_some()
        && !field.modifiers.is_readonly
        && !field.attributes.non_serialized
        && (field.is_public() || field.attributes.serialize_field)
        && natively_serializable_type(types, field.ty)
}

#[derive(Default)]
struct NativeRemap {
    nodes: FxHashMap<usize, NodeRef>,
    components: FxHashMap<usize, ComponentRef>,
}

impl NativeRemap {
    fn copy(&self, value: &Value) -> Value {
        match value {
            Value::Node(node) => self
                .nodes
                .get(&node.id())
                .cloned()
                .map(Value::Node)
                .unwrap_or_else(|| value.clone()),
            Value::Component(component) => self
                .components
                .get(&component.id())
                .cloned()
                .map(Value::Component)
                .unwrap_or_else(|| value.clone()),
            Value::Struct(s) => Value::Struct(StructValue::new(
                s.ty,
                s.fields.iter().map(|v| self.copy(v)).collect(),
            )),
            Value::Object(o) => Value::Object(ObjectRef::new(
                o.ty(),
                o.fields().iter().map(|v| self.copy(v)).collect(),
            )),
            Value::Array(a) => Value::Array(ArrayRef::new(
                a.ty(),
                a.element(),
                a.lengths(),
                a.items().iter().map(|v| self.copy(v)).collect(),
            )),
            Value::List(l) => Value::List(ListRef::from_items(
                l.ty(),
                l.element(),
                l.items().iter().map(|v| self.copy(v)).collect(),
            )),
            other => other.clone(),
        }
    }
}

/// Clone the tree that owns `source`
///
/// A node source yields the cloned node; a component source yields the
/// corresponding component of the cloned owning node.
pub fn instantiate_native(host: &Host, source: &Value) -> Result<Value, HostError> {
    let types = host.types();
    let root = match source {
        Value::Node(node) => node.clone(),
        Value::Component(component) => component
            .node()
            .ok_or(HostError::NotInstantiable("detached component"))?,
        other => return Err(HostError::NotInstantiable(other.kind_name())),
    };

    let source_nodes = root.descendants();
    for node in &source_nodes {
        for component in node.components() {
            host.dispatch(&component, CallbackKind::BeforeSerialize);
        }
    }

    let mut remap = NativeRemap::default();
    let mut pairs = Vec::new();
    let mut clone_root = None;
    for node in &source_nodes {
        let copy = NodeRef::new(&node.name());
        copy.set_active(node.active_self());
        match node.parent().and_then(|parent| remap.nodes.get(&parent.id()).cloned()) {
            Some(parent) if !node.ptr_eq(&root) => parent.add_child(&copy),
            _ => {
                copy.set_name(&format!("{}(Clone)", node.name()));
                clone_root = Some(copy.clone());
            }
        }
        for component in node.components() {
            let duplicate = ComponentRef::new(component.ty(), types.instance_fields(component.ty())?);
            duplicate.set_enabled(component.enabled());
            copy.attach(&duplicate);
            remap.components.insert(component.id(), duplicate.clone());
            pairs.push((component, duplicate));
        }
        remap.nodes.insert(node.id(), copy);
    }
    let clone_root = clone_root.ok_or(HostError::NotInstantiable("empty tree"))?;

    for (original, duplicate) in &pairs {
        for field in types.layout(original.ty())? {
            if !natively_serialized_field(types, &field) {
                continue;
            }
            if let Some(slot) = field.slot {
                duplicate.set(slot, remap.copy(&original.get(slot)?))?;
            }
        }
    }

    let clones: Vec<_> = pairs.iter().map(|(_, duplicate)| duplicate.clone()).collect();
    for component in &clones {
        host.dispatch(component, CallbackKind::AfterDeserialize);
    }
    for component in &clones {
        let active = component.node().map(|n| n.active_in_hierarchy()).unwrap_or(false);
        if active {
            host.dispatch(component, CallbackKind::Awake);
            if component.enabled() {
                host.dispatch(component, CallbackKind::OnEnable);
            }
        }
    }

    Ok(match source {
        Value::Component(component) => remap
            .components
            .get(&component.id())
            .cloned()
            .map(Value::Component)
            .ok_or(HostError::NotInstantiable("component"))?,
        _ => Value::Node(clone_root),
    })
}
