//! Graph nodes and components
//!
//! Nodes own their children and components. Back-references (child to parent,
//! component to owning node) are weak, so dropping a root releases the tree.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::error::HostError;
use crate::host::types::{TypeHandle, TypeKind, TypeRegistry};
use crate::host::value::Value;

struct NodeInner {
    name: RwLock<String>,
    active_self: AtomicBool,
    parent: RwLock<Weak<NodeInner>>,
    children: RwLock<Vec<NodeRef>>,
    components: RwLock<Vec<ComponentRef>>,
}

/// Shared handle to a graph node
#[derive(Clone)]
pub struct NodeRef(Arc<NodeInner>);

impl NodeRef {
    /// Create a detached, active node
    pub fn new(name: &str) -> Self {
        Self(Arc::new(NodeInner {
            name: RwLock::new(name.to_string()),
            active_self: AtomicBool::new(true),
            parent: RwLock::new(Weak::new()),
            children: RwLock::new(Vec::new()),
            components: RwLock::new(Vec::new()),
        }))
    }

    /// Node name
    pub fn name(&self) -> String {
        self.0.name.read().clone()
    }

    /// Rename the node
    pub fn set_name(&self, name: &str) {
        *self.0.name.write() = name.to_string();
    }

    /// Local active flag
    pub fn active_self(&self) -> bool {
        self.0.active_self.load(Ordering::Acquire)
    }

    /// Set the local active flag
    pub fn set_active(&self, active: bool) {
        self.0.active_self.store(active, Ordering::Release);
    }

    /// Whether this node and all of its ancestors are active
    pub fn active_in_hierarchy(&self) -> bool {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if !node.active_self() {
                return false;
            }
            current = node.parent();
        }
        true
    }

    /// Parent node
    pub fn parent(&self) -> Option<NodeRef> {
        self.0.parent.read().upgrade().map(NodeRef)
    }

    /// Children in sibling order
    pub fn children(&self) -> Vec<NodeRef> {
        self.0.children.read().clone()
    }

    /// Child at `index`
    pub fn child(&self, index: usize) -> Option<NodeRef> {
        self.0.children.read().get(index).cloned()
    }

    /// Number of children
    pub fn child_count(&self) -> usize {
        self.0.children.read().len()
    }

    /// Append `child`, detaching it from its previous parent
    pub fn add_child(&self, child: &NodeRef) {
        child.detach();
        *child.0.parent.write() = Arc::downgrade(&self.0);
        self.0.children.write().push(child.clone());
    }

    /// Create and append a new child node
    pub fn create_child(&self, name: &str) -> NodeRef {
        let child = NodeRef::new(name);
        self.add_child(&child);
        child
    }

    /// Remove the child at `index`
    pub fn remove_child(&self, index: usize) -> Option<NodeRef> {
        let mut children = self.0.children.write();
        if index >= children.len() {
            return None;
        }
        let child = children.remove(index);
        *child.0.parent.write() = Weak::new();
        Some(child)
    }

    /// Detach from the parent, if any
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.0.children.write().retain(|c| !c.ptr_eq(self));
        }
        *self.0.parent.write() = Weak::new();
    }

    /// Position among the parent's children (0 for roots)
    pub fn sibling_index(&self) -> usize {
        self.parent()
            .and_then(|parent| parent.0.children.read().iter().position(|c| c.ptr_eq(self)))
            .unwrap_or(0)
    }

    /// Components in attachment order
    pub fn components(&self) -> Vec<ComponentRef> {
        self.0.components.read().clone()
    }

    /// First component whose runtime type is exactly `ty`
    pub fn get_component(&self, ty: TypeHandle) -> Option<ComponentRef> {
        self.0.components.read().iter().find(|c| c.ty() == ty).cloned()
    }

    /// Attach a new default-initialized component of type `ty`
    ///
    /// Lifecycle callbacks are not dispatched; see `Host::add_component`.
    pub fn add_component(&self, types: &TypeRegistry, ty: TypeHandle) -> Result<ComponentRef, HostError> {
        let info = types.get(ty)?;
        if info.kind != TypeKind::Component {
            return Err(HostError::NotConstructible(info.name.to_string()));
        }
        let component = ComponentRef::new(ty, types.instance_fields(ty)?);
        self.attach(&component);
        Ok(component)
    }

    pub(crate) fn attach(&self, component: &ComponentRef) {
        *component.0.owner.write() = Arc::downgrade(&self.0);
        self.0.components.write().push(component.clone());
    }

    /// Remove a component; returns false if it is not attached here
    pub fn remove_component(&self, component: &ComponentRef) -> bool {
        let mut components = self.0.components.write();
        let before = components.len();
        components.retain(|c| !c.ptr_eq(component));
        let removed = components.len() != before;
        if removed {
            *component.0.owner.write() = Weak::new();
        }
        removed
    }

    /// This node followed by its descendants, depth-first in sibling order
    pub fn descendants(&self) -> Vec<NodeRef> {
        let mut out = Vec::new();
        self.walk_into(&mut out);
        out
    }

    /// Append this subtree to `out`, depth-first in sibling order
    pub fn walk_into(&self, out: &mut Vec<NodeRef>) {
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            out.push(node);
        }
    }

    /// Pointer identity
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Whether both handles refer to the same node
    pub fn ptr_eq(&self, other: &NodeRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("name", &self.name())
            .field("children", &self.child_count())
            .finish()
    }
}

struct ComponentInner {
    ty: TypeHandle,
    fields: RwLock<Vec<Value>>,
    enabled: AtomicBool,
    owner: RwLock<Weak<NodeInner>>,
}

/// Shared handle to a component
#[derive(Clone)]
pub struct ComponentRef(Arc<ComponentInner>);

impl ComponentRef {
    pub(crate) fn new(ty: TypeHandle, fields: Vec<Value>) -> Self {
        Self(Arc::new(ComponentInner {
            ty,
            fields: RwLock::new(fields),
            enabled: AtomicBool::new(true),
            owner: RwLock::new(Weak::new()),
        }))
    }

    /// Runtime type
    pub fn ty(&self) -> TypeHandle {
        self.0.ty
    }

    /// Owning node
    pub fn node(&self) -> Option<NodeRef> {
        self.0.owner.read().upgrade().map(NodeRef)
    }

    /// Enabled flag
    pub fn enabled(&self) -> bool {
        self.0.enabled.load(Ordering::Acquire)
    }

    /// Set the enabled flag
    pub fn set_enabled(&self, enabled: bool) {
        self.0.enabled.store(enabled, Ordering::Release);
    }

    /// Read a slot
    pub fn get(&self, slot: usize) -> Result<Value, HostError> {
        let fields = self.0.fields.read();
        fields.get(slot).cloned().ok_or_else(|| HostError::SlotOutOfRange {
            type_name: format!("#{}", self.0.ty.index()),
            slot,
            len: fields.len(),
        })
    }

    /// Write a slot
    pub fn set(&self, slot: usize, value: Value) -> Result<(), HostError> {
        let mut fields = self.0.fields.write();
        let len = fields.len();
        let target = fields.get_mut(slot).ok_or_else(|| HostError::SlotOutOfRange {
            type_name: format!("#{}", self.0.ty.index()),
            slot,
            len,
        })?;
        *target = value;
        Ok(())
    }

    /// Copy of every slot
    pub fn fields(&self) -> Vec<Value> {
        self.0.fields.read().clone()
    }

    /// Pointer identity
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Whether both handles refer to the same component
    pub fn ptr_eq(&self, other: &ComponentRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentRef(#{}@{:x})", self.0.ty.index(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::types::{FieldDef, TypeDef};

    #[test]
    fn test_sibling_index_and_detach() {
        let root = NodeRef::new("root");
        let a = root.create_child("a");
        let b = root.create_child("b");
        assert_eq!(a.sibling_index(), 0);
        assert_eq!(b.sibling_index(), 1);

        a.detach();
        assert_eq!(b.sibling_index(), 0);
        assert!(a.parent().is_none());
        assert_eq!(root.child_count(), 1);
    }

    #[test]
    fn test_active_in_hierarchy_follows_ancestors() {
        let root = NodeRef::new("root");
        let child = root.create_child("child");
        assert!(child.active_in_hierarchy());
        root.set_active(false);
        assert!(child.active_self());
        assert!(!child.active_in_hierarchy());
    }

    #[test]
    fn test_descendants_are_depth_first() {
        let root = NodeRef::new("root");
        let a = root.create_child("a");
        a.create_child("a1");
        root.create_child("b");
        let names: Vec<_> = root.descendants().iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn test_add_component_uses_defaults() {
        let types = TypeRegistry::new();
        let health = types.define(
            TypeDef::component("Health")
                .field(FieldDef::public("hp", types.int()))
                .initializer(|set| set.set("hp", Value::Int(100))),
        );
        let node = NodeRef::new("player");
        let component = node.add_component(&types, health).unwrap();
        assert_eq!(component.get(0).unwrap().as_int(), Some(100));
        assert!(component.node().unwrap().ptr_eq(&node));
        assert!(node.get_component(health).is_some());

        assert!(node.remove_component(&component));
        assert!(component.node().is_none());
    }

    #[test]
    fn test_add_component_rejects_non_components() {
        let types = TypeRegistry::new();
        let plain = types.define(TypeDef::class("Plain"));
        assert!(NodeRef::new("n").add_component(&types, plain).is_err());
    }
}
