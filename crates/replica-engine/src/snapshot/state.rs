//! Captured component state

use crate::host::{ComponentRef, TypeHandle, Value};

/// One captured field
#[derive(Debug, Clone)]
pub struct FieldSnapshot {
    /// Field name, resolved again on the clone
    pub name: String,
    /// Converted value
    pub value: Value,
}

/// Captured fields of one source component
///
/// Created for every user component seen during capture, even one without
/// capturable fields, so that every clone component can still be paired
/// with its source.
#[derive(Debug, Clone)]
pub struct ComponentState {
    /// Source component
    pub component: ComponentRef,
    /// Runtime type of the source component
    pub ty: TypeHandle,
    /// Captured fields in registry order
    pub fields: Vec<FieldSnapshot>,
}

impl ComponentState {
    /// Empty state for `component`
    pub fn new(component: &ComponentRef) -> Self {
        Self {
            component: component.clone(),
            ty: component.ty(),
            fields: Vec::new(),
        }
    }

    /// Captured value of `name`
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }
}
