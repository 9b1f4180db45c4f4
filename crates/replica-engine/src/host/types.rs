//! Host type table
//!
//! Every value in the host carries (or is declared with) a [`TypeHandle`]
//! into this table. Types describe their kind, where they come from, their
//! base type, declared fields with per-field attributes, how to default
//! construct them, and which lifecycle callbacks they expose.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::HostError;
use crate::host::graph::ComponentRef;
use crate::host::value::{ArrayRef, DictRef, ListRef, ObjectRef, StructValue, Value};

/// Handle into the host type table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeHandle(u32);

impl TypeHandle {
    /// Raw table index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a type is defined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeOrigin {
    /// Language core types: scalars, strings and generic collections
    Builtin,
    /// Types that ship with the host engine
    Host,
    /// Types contributed by user code
    User,
}

/// Scalar primitive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Boolean
    Bool,
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
}

/// Shape of a type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Scalar value type
    Primitive(PrimitiveKind),
    /// Immutable string
    String,
    /// Enumeration stored as an integer
    Enum,
    /// Value type with fields
    Struct,
    /// Reference type with fields
    Class,
    /// Abstract reference type; values carry a concrete class
    Interface,
    /// Array with a fixed rank
    Array {
        /// Element type
        element: TypeHandle,
        /// Number of dimensions
        rank: usize,
    },
    /// Growable list
    List {
        /// Element type
        element: TypeHandle,
    },
    /// Key/value map
    Dictionary {
        /// Key type
        key: TypeHandle,
        /// Value type
        value: TypeHandle,
    },
    /// Graph node reference
    Node,
    /// Component attached to a node
    Component,
}

/// Field visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Public field
    Public,
    /// Private or otherwise non-public field
    Private,
}

/// Storage modifiers of a field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldModifiers {
    /// Class-level storage
    pub is_static: bool,
    /// Compile-time constant
    pub is_const: bool,
    /// Assignable only during construction
    pub is_readonly: bool,
}

/// Declarative per-field metadata
#[derive(Debug, Clone, Default)]
pub struct FieldAttributes {
    /// Private field opted into serialization
    pub serialize_field: bool,
    /// Field opted out of serialization
    pub non_serialized: bool,
    /// Copy the value by reference instead of duplicating it
    pub shared_reference: bool,
    /// Allow collections of collections
    pub allow_collection_nesting: bool,
    /// Converter names tried before the global chain, in order
    pub converters: Vec<Arc<str>>,
}

/// Identity of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldKey {
    /// Declaring type
    pub owner: TypeHandle,
    /// Position in the declaring type's field list
    pub index: u32,
}

/// A declared field
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Field name
    pub name: Arc<str>,
    /// Declared type
    pub ty: TypeHandle,
    /// Declaring type
    pub owner: TypeHandle,
    /// Position in the declaring type's field list
    pub index: u32,
    /// Slot in the flattened instance layout (None for static/const fields)
    pub slot: Option<usize>,
    /// Visibility
    pub visibility: Visibility,
    /// Storage modifiers
    pub modifiers: FieldModifiers,
    /// Declarative attributes
    pub attributes: FieldAttributes,
}

impl FieldInfo {
    /// Identity key of this field
    pub fn key(&self) -> FieldKey {
        FieldKey {
            owner: self.owner,
            index: self.index,
        }
    }

    /// Whether the field is public
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

/// Lifecycle entry points a component type may expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// First activation
    Awake,
    /// Every enable
    OnEnable,
    /// Before the host serializes the component
    BeforeSerialize,
    /// After the host deserialized the component
    AfterDeserialize,
}

impl CallbackKind {
    /// All callback kinds
    pub const ALL: [CallbackKind; 4] = [
        CallbackKind::Awake,
        CallbackKind::OnEnable,
        CallbackKind::BeforeSerialize,
        CallbackKind::AfterDeserialize,
    ];

    fn slot(self) -> usize {
        match self {
            CallbackKind::Awake => 0,
            CallbackKind::OnEnable => 1,
            CallbackKind::BeforeSerialize => 2,
            CallbackKind::AfterDeserialize => 3,
        }
    }
}

/// Lifecycle callback body
pub type Callback = Arc<dyn Fn(&ComponentRef) -> Result<(), HostError> + Send + Sync>;

/// Field initializer run after default construction
pub type Initializer = Arc<dyn Fn(&mut FieldSet<'_>) + Send + Sync>;

/// Callback table of a type
#[derive(Clone, Default)]
pub struct Callbacks {
    table: [Option<Callback>; 4],
}

impl Callbacks {
    /// Callback declared for `kind`
    pub fn get(&self, kind: CallbackKind) -> Option<&Callback> {
        self.table[kind.slot()].as_ref()
    }

    /// Declare a callback
    pub fn set(&mut self, kind: CallbackKind, callback: Callback) {
        self.table[kind.slot()] = Some(callback);
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let declared: Vec<_> = CallbackKind::ALL
            .iter()
            .filter(|kind| self.get(**kind).is_some())
            .collect();
        f.debug_tuple("Callbacks").field(&declared).finish()
    }
}

/// Runtime type information
#[derive(Clone)]
pub struct TypeInfo {
    /// Own handle
    pub handle: TypeHandle,
    /// Display name
    pub name: Arc<str>,
    /// Shape
    pub kind: TypeKind,
    /// Origin
    pub origin: TypeOrigin,
    /// Base type
    pub base: Option<TypeHandle>,
    /// Declared fields (not including inherited ones)
    pub fields: Vec<FieldInfo>,
    /// Whether a default constructor exists
    pub constructible: bool,
    /// Field initializer run after defaults
    pub initializer: Option<Initializer>,
    /// Lifecycle callbacks
    pub callbacks: Callbacks,
    layout_len: usize,
    sealed: bool,
}

impl TypeInfo {
    /// Number of instance slots including inherited ones
    pub fn layout_len(&self) -> usize {
        self.layout_len
    }

    /// Whether this is a value type
    pub fn is_value_type(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Primitive(_) | TypeKind::Enum | TypeKind::Struct
        )
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("handle", &self.handle)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("origin", &self.origin)
            .field("base", &self.base)
            .field("fields", &self.fields.len())
            .finish()
    }
}

// ============================================================================
// Definitions
// ============================================================================

/// Field declaration
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: Arc<str>,
    ty: TypeHandle,
    visibility: Visibility,
    modifiers: FieldModifiers,
    attributes: FieldAttributes,
}

impl FieldDef {
    /// Public field
    pub fn public(name: &str, ty: TypeHandle) -> Self {
        Self::with_visibility(name, ty, Visibility::Public)
    }

    /// Private field
    pub fn private(name: &str, ty: TypeHandle) -> Self {
        Self::with_visibility(name, ty, Visibility::Private)
    }

    fn with_visibility(name: &str, ty: TypeHandle, visibility: Visibility) -> Self {
        Self {
            name: Arc::from(name),
            ty,
            visibility,
            modifiers: FieldModifiers::default(),
            attributes: FieldAttributes::default(),
        }
    }

    /// Opt a private field into serialization
    pub fn serialize_field(mut self) -> Self {
        self.attributes.serialize_field = true;
        self
    }

    /// Opt the field out of serialization
    pub fn non_serialized(mut self) -> Self {
        self.attributes.non_serialized = true;
        self
    }

    /// Copy by reference
    pub fn shared_reference(mut self) -> Self {
        self.attributes.shared_reference = true;
        self
    }

    /// Allow collections of collections
    pub fn allow_collection_nesting(mut self) -> Self {
        self.attributes.allow_collection_nesting = true;
        self
    }

    /// Force a named converter ahead of the global chain
    pub fn use_converter(mut self, name: &str) -> Self {
        self.attributes.converters.push(Arc::from(name));
        self
    }

    /// Class-level field
    pub fn static_field(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }

    /// Constant field
    pub fn constant(mut self) -> Self {
        self.modifiers.is_const = true;
        self
    }

    /// Read-only field
    pub fn readonly(mut self) -> Self {
        self.modifiers.is_readonly = true;
        self
    }

    fn has_instance_storage(&self) -> bool {
        !self.modifiers.is_static && !self.modifiers.is_const
    }
}

/// Type declaration
pub struct TypeDef {
    name: Arc<str>,
    kind: TypeKind,
    origin: TypeOrigin,
    base: Option<TypeHandle>,
    fields: Vec<FieldDef>,
    constructible: bool,
    initializer: Option<Initializer>,
    callbacks: Callbacks,
}

impl TypeDef {
    fn new(name: &str, kind: TypeKind) -> Self {
        let constructible = !matches!(kind, TypeKind::Interface | TypeKind::Component);
        Self {
            name: Arc::from(name),
            kind,
            origin: TypeOrigin::User,
            base: None,
            fields: Vec::new(),
            constructible,
            initializer: None,
            callbacks: Callbacks::default(),
        }
    }

    /// Reference type
    pub fn class(name: &str) -> Self {
        Self::new(name, TypeKind::Class)
    }

    /// Value type
    pub fn structure(name: &str) -> Self {
        Self::new(name, TypeKind::Struct)
    }

    /// Interface
    pub fn interface(name: &str) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    /// Enumeration
    pub fn enumeration(name: &str) -> Self {
        Self::new(name, TypeKind::Enum)
    }

    /// Component type; derives from the host behaviour unless a base is given
    pub fn component(name: &str) -> Self {
        Self::new(name, TypeKind::Component)
    }

    /// Mark the type as shipped by the host engine
    pub fn host(mut self) -> Self {
        self.origin = TypeOrigin::Host;
        self
    }

    /// Set the base type
    pub fn base(mut self, base: TypeHandle) -> Self {
        self.base = Some(base);
        self
    }

    /// Declare a field
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Remove the default constructor
    pub fn no_default_constructor(mut self) -> Self {
        self.constructible = false;
        self
    }

    /// Run `init` after default construction
    pub fn initializer<F>(mut self, init: F) -> Self
    where
        F: Fn(&mut FieldSet<'_>) + Send + Sync + 'static,
    {
        self.initializer = Some(Arc::new(init));
        self
    }

    /// Declare a lifecycle callback
    pub fn on<F>(mut self, kind: CallbackKind, callback: F) -> Self
    where
        F: Fn(&ComponentRef) -> Result<(), HostError> + Send + Sync + 'static,
    {
        self.callbacks.set(kind, Arc::new(callback));
        self
    }
}

// ============================================================================
// Registry
// ============================================================================

const BOOL: TypeHandle = TypeHandle(0);
const INT: TypeHandle = TypeHandle(1);
const FLOAT: TypeHandle = TypeHandle(2);
const STRING: TypeHandle = TypeHandle(3);
const NODE: TypeHandle = TypeHandle(4);
const COMPONENT: TypeHandle = TypeHandle(5);
const BEHAVIOUR: TypeHandle = TypeHandle(6);

#[derive(Default)]
struct RegistryInner {
    types: Vec<Arc<TypeInfo>>,
    composites: FxHashMap<TypeKind, TypeHandle>,
    by_name: FxHashMap<Arc<str>, TypeHandle>,
}

/// Host type table
///
/// Thread-safe: reads hand out `Arc<TypeInfo>` snapshots and never hold the
/// lock while running user initializers.
pub struct TypeRegistry {
    inner: RwLock<RegistryInner>,
}

impl TypeRegistry {
    /// Create a registry with the built-in and host base types
    pub fn new() -> Self {
        let registry = Self {
            inner: RwLock::new(RegistryInner::default()),
        };
        let builtin = |name: &str, kind: TypeKind| {
            let mut def = TypeDef::new(name, kind);
            def.origin = TypeOrigin::Builtin;
            def
        };
        registry.define(builtin("bool", TypeKind::Primitive(PrimitiveKind::Bool)));
        registry.define(builtin("int", TypeKind::Primitive(PrimitiveKind::Int)));
        registry.define(builtin("float", TypeKind::Primitive(PrimitiveKind::Float)));
        registry.define(builtin("string", TypeKind::String));
        registry.define(TypeDef::new("Node", TypeKind::Node).host().no_default_constructor());
        registry.define(TypeDef::component("Component").host());
        registry.define(TypeDef::component("Behaviour").host().base(COMPONENT));
        registry
    }

    /// `bool`
    pub fn bool(&self) -> TypeHandle {
        BOOL
    }

    /// `int`
    pub fn int(&self) -> TypeHandle {
        INT
    }

    /// `float`
    pub fn float(&self) -> TypeHandle {
        FLOAT
    }

    /// `string`
    pub fn string(&self) -> TypeHandle {
        STRING
    }

    /// Graph node reference type
    pub fn node(&self) -> TypeHandle {
        NODE
    }

    /// Root component type
    pub fn component(&self) -> TypeHandle {
        COMPONENT
    }

    /// Host behaviour base type for user components
    pub fn behaviour(&self) -> TypeHandle {
        BEHAVIOUR
    }

    /// Look up a type
    pub fn get(&self, handle: TypeHandle) -> Result<Arc<TypeInfo>, HostError> {
        self.inner
            .read()
            .types
            .get(handle.index())
            .cloned()
            .ok_or(HostError::UnknownType(handle))
    }

    /// Look up a type by name
    pub fn by_name(&self, name: &str) -> Option<TypeHandle> {
        self.inner.read().by_name.get(name).copied()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.inner.read().types.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read().types.is_empty()
    }

    /// Register a type
    pub fn define(&self, def: TypeDef) -> TypeHandle {
        self.define_with(|_| def)
    }

    /// Register a type whose definition needs its own handle
    ///
    /// `build` runs under the registry's write lock and must not call back
    /// into the registry except for the built-in handle getters.
    pub fn define_with<F>(&self, build: F) -> TypeHandle
    where
        F: FnOnce(TypeHandle) -> TypeDef,
    {
        let mut inner = self.inner.write();
        let handle = TypeHandle(inner.types.len() as u32);
        let def = build(handle);
        Self::insert(&mut inner, handle, def)
    }

    fn insert(inner: &mut RegistryInner, handle: TypeHandle, mut def: TypeDef) -> TypeHandle {
        if def.kind == TypeKind::Component && def.base.is_none() && handle != COMPONENT {
            def.base = Some(if handle == BEHAVIOUR { COMPONENT } else { BEHAVIOUR });
        }

        let base_len = match def.base.and_then(|b| inner.types.get(b.index()).cloned()) {
            Some(base) => {
                if !base.sealed {
                    let mut sealed = (*base).clone();
                    sealed.sealed = true;
                    inner.types[base.handle.index()] = Arc::new(sealed);
                }
                base.layout_len
            }
            None => 0,
        };

        let mut layout_len = base_len;
        let fields = def
            .fields
            .into_iter()
            .enumerate()
            .map(|(index, field)| {
                let slot = field.has_instance_storage().then(|| {
                    layout_len += 1;
                    layout_len - 1
                });
                FieldInfo {
                    name: field.name,
                    ty: field.ty,
                    owner: handle,
                    index: index as u32,
                    slot,
                    visibility: field.visibility,
                    modifiers: field.modifiers,
                    attributes: field.attributes,
                }
            })
            .collect();

        let info = TypeInfo {
            handle,
            name: def.name.clone(),
            kind: def.kind,
            origin: def.origin,
            base: def.base,
            fields,
            constructible: def.constructible,
            initializer: def.initializer,
            callbacks: def.callbacks,
            layout_len,
            sealed: false,
        };
        inner.by_name.insert(def.name, handle);
        inner.types.push(Arc::new(info));
        handle
    }

    /// Add a field to a type that has no derived types yet
    pub fn add_field(&self, ty: TypeHandle, field: FieldDef) -> Result<(), HostError> {
        let mut inner = self.inner.write();
        let current = inner
            .types
            .get(ty.index())
            .cloned()
            .ok_or(HostError::UnknownType(ty))?;
        if current.sealed {
            return Err(HostError::TypeSealed(current.name.to_string()));
        }
        let mut updated = (*current).clone();
        let slot = field.has_instance_storage().then(|| {
            updated.layout_len += 1;
            updated.layout_len - 1
        });
        updated.fields.push(FieldInfo {
            index: updated.fields.len() as u32,
            name: field.name,
            ty: field.ty,
            owner: ty,
            slot,
            visibility: field.visibility,
            modifiers: field.modifiers,
            attributes: field.attributes,
        });
        inner.types[ty.index()] = Arc::new(updated);
        Ok(())
    }

    /// `element[]` with the given rank
    pub fn array_of(&self, element: TypeHandle, rank: usize) -> TypeHandle {
        let rank = rank.max(1);
        let name = format!("{}[{}]", self.name_of(element), ",".repeat(rank - 1));
        self.composite(TypeKind::Array { element, rank }, name)
    }

    /// `List<element>`
    pub fn list_of(&self, element: TypeHandle) -> TypeHandle {
        let name = format!("List<{}>", self.name_of(element));
        self.composite(TypeKind::List { element }, name)
    }

    /// `Dictionary<key, value>`
    pub fn dictionary_of(&self, key: TypeHandle, value: TypeHandle) -> TypeHandle {
        let name = format!(
            "Dictionary<{}, {}>",
            self.name_of(key),
            self.name_of(value)
        );
        self.composite(TypeKind::Dictionary { key, value }, name)
    }

    fn composite(&self, kind: TypeKind, name: String) -> TypeHandle {
        if let Some(handle) = self.inner.read().composites.get(&kind) {
            return *handle;
        }
        let mut inner = self.inner.write();
        if let Some(handle) = inner.composites.get(&kind) {
            return *handle;
        }
        let mut def = TypeDef::new(&name, kind.clone());
        def.origin = TypeOrigin::Builtin;
        let handle = TypeHandle(inner.types.len() as u32);
        Self::insert(&mut inner, handle, def);
        inner.composites.insert(kind, handle);
        handle
    }

    /// Display name of a type
    pub fn name_of(&self, handle: TypeHandle) -> Arc<str> {
        self.get(handle)
            .map(|info| info.name.clone())
            .unwrap_or_else(|_| Arc::from("<unknown>"))
    }

    /// Type followed by its base types, most derived first
    pub fn chain(&self, ty: TypeHandle) -> Result<Vec<Arc<TypeInfo>>, HostError> {
        let mut chain = Vec::new();
        let mut current = Some(ty);
        while let Some(handle) = current {
            let info = self.get(handle)?;
            current = info.base;
            chain.push(info);
        }
        Ok(chain)
    }

    /// Instance fields of `ty` including inherited ones, base fields first
    pub fn layout(&self, ty: TypeHandle) -> Result<Vec<FieldInfo>, HostError> {
        let chain = self.chain(ty)?;
        Ok(chain
            .iter()
            .rev()
            .flat_map(|info| info.fields.iter())
            .filter(|field| field.slot.is_some())
            .cloned()
            .collect())
    }

    /// Find a field by name, searching the most derived type first
    pub fn find_field(&self, ty: TypeHandle, name: &str) -> Result<Option<FieldInfo>, HostError> {
        Ok(self
            .chain(ty)?
            .iter()
            .find_map(|info| info.fields.iter().find(|f| &*f.name == name).cloned()))
    }

    /// Whether `ty` is `ancestor` or derives from it
    pub fn is_subtype_of(&self, ty: TypeHandle, ancestor: TypeHandle) -> bool {
        self.chain(ty)
            .map(|chain| chain.iter().any(|info| info.handle == ancestor))
            .unwrap_or(false)
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Zero value of a declared type
    pub fn default_value(&self, ty: TypeHandle) -> Value {
        let Ok(info) = self.get(ty) else {
            return Value::Null;
        };
        match info.kind {
            TypeKind::Primitive(PrimitiveKind::Bool) => Value::Bool(false),
            TypeKind::Primitive(PrimitiveKind::Int) | TypeKind::Enum => Value::Int(0),
            TypeKind::Primitive(PrimitiveKind::Float) => Value::Float(0.0),
            TypeKind::Struct => self
                .instance_fields(ty)
                .map(|fields| Value::Struct(StructValue::new(ty, fields)))
                .unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    /// Default-initialized storage for every instance slot of `ty`
    pub fn instance_fields(&self, ty: TypeHandle) -> Result<Vec<Value>, HostError> {
        let layout = self.layout(ty)?;
        let mut slots = vec![Value::Null; layout.len()];
        for field in &layout {
            if let Some(slot) = field.slot {
                if slot < slots.len() {
                    slots[slot] = self.default_value(field.ty);
                }
            }
        }
        // Initializers run base first, mirroring constructor chaining.
        for info in self.chain(ty)?.iter().rev() {
            if let Some(init) = &info.initializer {
                let mut set = FieldSet {
                    registry: self,
                    ty,
                    slots: &mut slots,
                };
                init(&mut set);
            }
        }
        Ok(slots)
    }

    /// Default-construct a value of `ty`
    pub fn construct(&self, ty: TypeHandle) -> Result<Value, HostError> {
        let info = self.get(ty)?;
        if !info.constructible {
            return Err(HostError::NotConstructible(info.name.to_string()));
        }
        Ok(match &info.kind {
            TypeKind::Primitive(_) | TypeKind::Enum => self.default_value(ty),
            TypeKind::String => Value::str(""),
            TypeKind::Struct => Value::Struct(StructValue::new(ty, self.instance_fields(ty)?)),
            TypeKind::Class => Value::Object(ObjectRef::new(ty, self.instance_fields(ty)?)),
            TypeKind::List { element } => Value::List(ListRef::new(ty, *element)),
            TypeKind::Dictionary { key, value } => Value::Dict(DictRef::new(ty, *key, *value)),
            TypeKind::Array { .. } => self.construct_array(ty, &[0])?,
            TypeKind::Interface | TypeKind::Node | TypeKind::Component => {
                return Err(HostError::NotConstructible(info.name.to_string()))
            }
        })
    }

    /// Construct an array of `ty` with the given per-dimension lengths
    pub fn construct_array(&self, ty: TypeHandle, lengths: &[usize]) -> Result<Value, HostError> {
        let info = self.get(ty)?;
        let TypeKind::Array { element, rank } = info.kind else {
            return Err(HostError::NotConstructible(info.name.to_string()));
        };
        let mut dims = lengths.to_vec();
        dims.resize(rank, 0);
        let len = dims.iter().product();
        let fill = self.default_value(element);
        Ok(Value::Array(ArrayRef::new(ty, element, dims, vec![fill; len])))
    }

    // ========================================================================
    // Name-based field access (slow path)
    // ========================================================================

    /// Read a field by name
    pub fn get_field(&self, holder: &Value, name: &str) -> Result<Value, HostError> {
        let ty = holder.field_holder_type().ok_or(HostError::NotAFieldHolder(holder.kind_name()))?;
        let field = self
            .find_field(ty, name)?
            .ok_or_else(|| HostError::NotAnInstanceField(name.to_string()))?;
        let slot = field
            .slot
            .ok_or_else(|| HostError::NotAnInstanceField(name.to_string()))?;
        holder.get_slot(slot)
    }

    /// Write a field by name
    pub fn set_field(&self, holder: &mut Value, name: &str, value: Value) -> Result<(), HostError> {
        let ty = holder.field_holder_type().ok_or(HostError::NotAFieldHolder(holder.kind_name()))?;
        let field = self
            .find_field(ty, name)?
            .ok_or_else(|| HostError::NotAnInstanceField(name.to_string()))?;
        let slot = field
            .slot
            .ok_or_else(|| HostError::NotAnInstanceField(name.to_string()))?;
        holder.set_slot(slot, value)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry").field("types", &self.len()).finish()
    }
}

/// Field storage handed to initializers
pub struct FieldSet<'a> {
    registry: &'a TypeRegistry,
    ty: TypeHandle,
    slots: &'a mut Vec<Value>,
}

impl FieldSet<'_> {
    /// Type being initialized
    pub fn type_handle(&self) -> TypeHandle {
        self.ty
    }

    /// Registry, for constructing nested values
    pub fn registry(&self) -> &TypeRegistry {
        self.registry
    }

    /// Assign a field by name; unknown names are ignored
    pub fn set(&mut self, name: &str, value: Value) {
        if let Ok(Some(FieldInfo { slot: Some(slot), .. })) = self.registry.find_field(self.ty, name) {
            if let Some(target) = self.slots.get_mut(slot) {
                *target = value;
            }
        }
    }

    /// Read a field by name
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.registry.find_field(self.ty, name) {
            Ok(Some(FieldInfo { slot: Some(slot), .. })) => self.slots.get(slot).cloned(),
            _ => None,
        }
    }
}
