//! Conversion contexts
//!
//! A [`ConversionSession`] holds the per-operation state of one capture or
//! restore pass: the shared engine pieces, the optional reference remap and
//! the cycle guard. A [`ConversionContext`] describes one value being
//! converted and links to its parent, so contexts form a chain shaped like
//! the call stack.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::MetadataCache;
use crate::convert::guard::{CycleGuard, GuardScope};
use crate::convert::remap::ReferenceRemap;
use crate::convert::ConversionEngine;
use crate::error::HostError;
use crate::host::{FieldInfo, TypeHandle, TypeRegistry, Value};
use crate::registry::FieldRegistry;

/// State shared by every context of one conversion pass
pub struct ConversionSession<'a> {
    engine: &'a ConversionEngine,
    cache: &'a MetadataCache,
    registry: &'a FieldRegistry,
    remap: Option<&'a ReferenceRemap>,
    max_depth: usize,
    verbose: bool,
    guard: Mutex<CycleGuard>,
}

impl<'a> ConversionSession<'a> {
    /// Create a session
    pub fn new(
        engine: &'a ConversionEngine,
        cache: &'a MetadataCache,
        registry: &'a FieldRegistry,
        max_depth: usize,
    ) -> Self {
        Self {
            engine,
            cache,
            registry,
            remap: None,
            max_depth,
            verbose: false,
            guard: Mutex::new(CycleGuard::new()),
        }
    }

    /// Resolve graph references through `remap`
    pub fn with_remap(mut self, remap: &'a ReferenceRemap) -> Self {
        self.remap = Some(remap);
        self
    }

    /// Emit per-value diagnostics
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Converter chain
    pub fn engine(&self) -> &'a ConversionEngine {
        self.engine
    }

    /// Metadata caches
    pub fn cache(&self) -> &'a MetadataCache {
        self.cache
    }

    /// Host type table
    pub fn types(&self) -> &'a Arc<TypeRegistry> {
        self.cache.types()
    }

    /// Field registry
    pub fn registry(&self) -> &'a FieldRegistry {
        self.registry
    }

    /// Reference remap, present while restoring
    pub fn remap(&self) -> Option<&'a ReferenceRemap> {
        self.remap
    }

    /// Deepest allowed context chain
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Whether verbose diagnostics are on
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Default-construct `ty`
    pub fn construct(&self, ty: TypeHandle) -> Result<Value, HostError> {
        self.cache.construct(ty)
    }

    /// Duplicate of `value` if it is being converted on this chain
    pub fn partner_of(&self, value: &Value) -> Option<Value> {
        self.guard.lock().partner(value)
    }

    /// Whether a value of `ty` is being converted on this chain
    pub fn is_type_active(&self, ty: TypeHandle) -> bool {
        self.guard.lock().is_type_active(ty)
    }

    /// Mark `value` as being converted into `partner` until the scope drops
    pub fn enter(&self, value: &Value, ty: TypeHandle, partner: Value) -> GuardScope<'_> {
        GuardScope::enter(&self.guard, value, ty, partner)
    }

    /// Whether no conversion is in progress
    pub fn is_idle(&self) -> bool {
        self.guard.lock().is_empty()
    }
}

/// One value being converted
pub struct ConversionContext<'a> {
    session: &'a ConversionSession<'a>,
    parent: Option<&'a ConversionContext<'a>>,
    value: Value,
    declared: TypeHandle,
    field: Option<&'a FieldInfo>,
    depth: usize,
}

impl<'a> ConversionContext<'a> {
    /// Context for the value of a top-level field
    pub fn root(session: &'a ConversionSession<'a>, field: &'a FieldInfo, value: Value) -> Self {
        Self {
            session,
            parent: None,
            value,
            declared: field.ty,
            field: Some(field),
            depth: 0,
        }
    }

    /// Context for a value with no owning field
    pub fn detached(session: &'a ConversionSession<'a>, value: Value, declared: TypeHandle) -> Self {
        Self {
            session,
            parent: None,
            value,
            declared,
            field: None,
            depth: 0,
        }
    }

    /// Context for the value of `field` on the current value
    pub fn member<'b>(&'b self, field: &'b FieldInfo, value: Value) -> ConversionContext<'b> {
        ConversionContext {
            session: self.session,
            parent: Some(self),
            value,
            declared: field.ty,
            field: Some(field),
            depth: self.depth + 1,
        }
    }

    /// Context for an element of the current collection
    ///
    /// Elements keep the collection's field, and with it its attributes.
    pub fn element<'b>(&'b self, value: Value, declared: TypeHandle) -> ConversionContext<'b> {
        ConversionContext {
            session: self.session,
            parent: Some(self),
            value,
            declared,
            field: self.field,
            depth: self.depth + 1,
        }
    }

    /// Session this context belongs to
    pub fn session(&self) -> &'a ConversionSession<'a> {
        self.session
    }

    /// Parent context
    pub fn parent(&self) -> Option<&'a ConversionContext<'a>> {
        self.parent
    }

    /// Original value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Declared type of the slot the value came from
    pub fn declared_type(&self) -> TypeHandle {
        self.declared
    }

    /// Runtime type of the value, or the declared type for null
    pub fn value_type(&self) -> TypeHandle {
        self.value
            .runtime_type(self.session.types())
            .unwrap_or(self.declared)
    }

    /// Field that owns the value
    pub fn field(&self) -> Option<&'a FieldInfo> {
        self.field
    }

    /// Distance from the root context
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether the value must be copied by reference
    pub fn is_shared_reference(&self) -> bool {
        self.field
            .map(|f| f.attributes.shared_reference)
            .unwrap_or(false)
    }

    /// Whether collections of collections may be converted
    pub fn allows_collection_nesting(&self) -> bool {
        self.field
            .map(|f| f.attributes.allow_collection_nesting)
            .unwrap_or(false)
    }

    /// Converter names forced by the owning field
    pub fn forced_converters(&self) -> &'a [Arc<str>] {
        match self.field {
            Some(field) => &field.attributes.converters,
            None => &[],
        }
    }

    /// Contexts from the parent up to the root
    pub fn ancestors(&self) -> impl Iterator<Item = &'a ConversionContext<'a>> {
        std::iter::successors(self.parent, |ctx| ctx.parent)
    }

    /// Convert the value of `field` through the engine
    pub fn convert_member(&self, field: &FieldInfo, value: Value) -> Value {
        let child = self.member(field, value);
        self.session.engine().convert_if_needed(&child)
    }

    /// Convert a collection element through the engine
    pub fn convert_element(&self, value: Value, declared: TypeHandle) -> Value {
        let child = self.element(value, declared);
        self.session.engine().convert_if_needed(&child)
    }
}

impl std::fmt::Debug for ConversionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionContext")
            .field("value", &self.value)
            .field("declared", &self.declared)
            .field("field", &self.field.map(|f| f.name.clone()))
            .field("depth", &self.depth)
            .finish()
    }
}
