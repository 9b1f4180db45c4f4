//! Host values
//!
//! Scalars and strings are held by value. Structs are held by value and
//! copied on assignment. Objects, arrays, lists and dictionaries are shared
//! references guarded by `parking_lot` locks and compared by pointer identity.
//!
//! Accessors clone values out of their locks before returning, so no lock is
//! ever held while the caller recurses into a nested value.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashSet;

use crate::error::HostError;
use crate::host::graph::{ComponentRef, NodeRef};
use crate::host::types::{TypeHandle, TypeRegistry};

/// A host value
#[derive(Clone, Default)]
pub enum Value {
    /// Absent reference
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer or enum
    Int(i64),
    /// Float
    Float(f64),
    /// Immutable string
    Str(Arc<str>),
    /// Struct held by value
    Struct(StructValue),
    /// Class instance
    Object(ObjectRef),
    /// Array
    Array(ArrayRef),
    /// List
    List(ListRef),
    /// Dictionary
    Dict(DictRef),
    /// Graph node reference
    Node(NodeRef),
    /// Component reference
    Component(ComponentRef),
}

impl Value {
    /// String value
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    /// Whether this is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Kind name for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Struct(_) => "struct",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::List(_) => "list",
            Value::Dict(_) => "dictionary",
            Value::Node(_) => "node",
            Value::Component(_) => "component",
        }
    }

    /// Integer payload
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float payload
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Object payload
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// List payload
    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Array payload
    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Dictionary payload
    pub fn as_dict(&self) -> Option<&DictRef> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Node payload
    pub fn as_node(&self) -> Option<&NodeRef> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    /// Component payload
    pub fn as_component(&self) -> Option<&ComponentRef> {
        match self {
            Value::Component(c) => Some(c),
            _ => None,
        }
    }

    /// Runtime type of the value
    pub fn runtime_type(&self, types: &TypeRegistry) -> Option<TypeHandle> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(types.bool()),
            Value::Int(_) => Some(types.int()),
            Value::Float(_) => Some(types.float()),
            Value::Str(_) => Some(types.string()),
            Value::Struct(s) => Some(s.ty),
            Value::Object(o) => Some(o.ty()),
            Value::Array(a) => Some(a.ty()),
            Value::List(l) => Some(l.ty()),
            Value::Dict(d) => Some(d.ty()),
            Value::Node(_) => Some(types.node()),
            Value::Component(c) => Some(c.ty()),
        }
    }

    /// Type whose layout describes this value's field slots
    pub fn field_holder_type(&self) -> Option<TypeHandle> {
        match self {
            Value::Struct(s) => Some(s.ty),
            Value::Object(o) => Some(o.ty()),
            Value::Component(c) => Some(c.ty()),
            _ => None,
        }
    }

    /// Read a field slot
    pub fn get_slot(&self, slot: usize) -> Result<Value, HostError> {
        match self {
            Value::Struct(s) => s.get(slot),
            Value::Object(o) => o.get(slot),
            Value::Component(c) => c.get(slot),
            other => Err(HostError::NotAFieldHolder(other.kind_name())),
        }
    }

    /// Write a field slot
    pub fn set_slot(&mut self, slot: usize, value: Value) -> Result<(), HostError> {
        match self {
            Value::Struct(s) => s.set(slot, value),
            Value::Object(o) => o.set(slot, value),
            Value::Component(c) => c.set(slot, value),
            other => Err(HostError::NotAFieldHolder(other.kind_name())),
        }
    }

    /// Pointer identity of reference values
    pub fn ref_id(&self) -> Option<usize> {
        match self {
            Value::Object(o) => Some(o.id()),
            Value::Array(a) => Some(a.id()),
            Value::List(l) => Some(l.id()),
            Value::Dict(d) => Some(d.id()),
            Value::Node(n) => Some(n.id()),
            Value::Component(c) => Some(c.id()),
            _ => None,
        }
    }

    /// Whether both values are the same reference
    pub fn same_ref(&self, other: &Value) -> bool {
        match (self.ref_id(), other.ref_id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Dictionary key equality: by value for scalars, strings and structs,
    /// by identity for references
    pub fn key_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => {
                a.ty == b.ty
                    && a.fields.len() == b.fields.len()
                    && a.fields.iter().zip(&b.fields).all(|(x, y)| x.key_eq(y))
            }
            (a, b) => a.same_ref(b),
        }
    }

    /// Deep equality that follows references and tolerates cycles.
    ///
    /// Nodes and components compare by identity.
    pub fn structurally_eq(&self, other: &Value) -> bool {
        let mut visited = FxHashSet::default();
        structurally_eq_inner(self, other, &mut visited)
    }
}

fn structurally_eq_inner(a: &Value, b: &Value, visited: &mut FxHashSet<(usize, usize)>) -> bool {
    if let (Some(x), Some(y)) = (a.ref_id(), b.ref_id()) {
        if !visited.insert((x, y)) {
            return true;
        }
    }
    let all = |xs: &[Value], ys: &[Value], visited: &mut FxHashSet<(usize, usize)>| {
        xs.len() == ys.len()
            && xs
                .iter()
                .zip(ys)
                .all(|(x, y)| structurally_eq_inner(x, y, visited))
    };
    match (a, b) {
        (Value::Struct(x), Value::Struct(y)) => x.ty == y.ty && all(&x.fields, &y.fields, visited),
        (Value::Object(x), Value::Object(y)) => {
            x.ty() == y.ty() && all(&x.fields(), &y.fields(), visited)
        }
        (Value::Array(x), Value::Array(y)) => {
            x.ty() == y.ty() && x.lengths() == y.lengths() && all(&x.items(), &y.items(), visited)
        }
        (Value::List(x), Value::List(y)) => x.ty() == y.ty() && all(&x.items(), &y.items(), visited),
        (Value::Dict(x), Value::Dict(y)) => {
            let (xs, ys) = (x.entries(), y.entries());
            x.ty() == y.ty()
                && xs.len() == ys.len()
                && xs.iter().zip(&ys).all(|((xk, xv), (yk, yv))| {
                    structurally_eq_inner(xk, yk, visited) && structurally_eq_inner(xv, yv, visited)
                })
        }
        (Value::Node(x), Value::Node(y)) => x.ptr_eq(y),
        (Value::Component(x), Value::Component(y)) => x.ptr_eq(y),
        (x, y) => x.key_eq(y),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Struct(s) => write!(f, "struct#{}({} fields)", s.ty.index(), s.fields.len()),
            Value::Object(o) => write!(f, "object#{}@{:x}", o.ty().index(), o.id()),
            Value::Array(a) => write!(f, "array{:?}@{:x}", a.lengths(), a.id()),
            Value::List(l) => write!(f, "list[{}]@{:x}", l.len(), l.id()),
            Value::Dict(d) => write!(f, "dict[{}]@{:x}", d.len(), d.id()),
            Value::Node(n) => write!(f, "node({:?})", n.name()),
            Value::Component(c) => write!(f, "component#{}@{:x}", c.ty().index(), c.id()),
        }
    }
}

fn slot_error(ty: TypeHandle, slot: usize, len: usize) -> HostError {
    HostError::SlotOutOfRange {
        type_name: format!("#{}", ty.index()),
        slot,
        len,
    }
}

// ============================================================================
// Struct
// ============================================================================

/// Struct instance held by value
#[derive(Debug, Clone)]
pub struct StructValue {
    /// Struct type
    pub ty: TypeHandle,
    /// Field slots in layout order
    pub fields: Vec<Value>,
}

impl StructValue {
    /// Create a struct from its field slots
    pub fn new(ty: TypeHandle, fields: Vec<Value>) -> Self {
        Self { ty, fields }
    }

    /// Read a slot
    pub fn get(&self, slot: usize) -> Result<Value, HostError> {
        self.fields
            .get(slot)
            .cloned()
            .ok_or_else(|| slot_error(self.ty, slot, self.fields.len()))
    }

    /// Write a slot
    pub fn set(&mut self, slot: usize, value: Value) -> Result<(), HostError> {
        let len = self.fields.len();
        let target = self
            .fields
            .get_mut(slot)
            .ok_or_else(|| slot_error(self.ty, slot, len))?;
        *target = value;
        Ok(())
    }
}

// ============================================================================
// Object
// ============================================================================

#[derive(Debug)]
struct ObjectData {
    ty: TypeHandle,
    fields: Vec<Value>,
}

/// Shared class instance
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<ObjectData>>);

impl ObjectRef {
    /// Create an instance from its field slots
    pub fn new(ty: TypeHandle, fields: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(ObjectData { ty, fields })))
    }

    /// Runtime type
    pub fn ty(&self) -> TypeHandle {
        self.0.read().ty
    }

    /// Read a slot
    pub fn get(&self, slot: usize) -> Result<Value, HostError> {
        let data = self.0.read();
        data.fields
            .get(slot)
            .cloned()
            .ok_or_else(|| slot_error(data.ty, slot, data.fields.len()))
    }

    /// Write a slot
    pub fn set(&self, slot: usize, value: Value) -> Result<(), HostError> {
        let mut data = self.0.write();
        let (ty, len) = (data.ty, data.fields.len());
        let target = data
            .fields
            .get_mut(slot)
            .ok_or_else(|| slot_error(ty, slot, len))?;
        *target = value;
        Ok(())
    }

    /// Copy of every slot
    pub fn fields(&self) -> Vec<Value> {
        self.0.read().fields.clone()
    }

    /// Pointer identity
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Whether both refer to the same instance
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef(#{}@{:x})", self.ty().index(), self.id())
    }
}

// ============================================================================
// Array
// ============================================================================

#[derive(Debug)]
struct ArrayData {
    ty: TypeHandle,
    element: TypeHandle,
    lengths: Vec<usize>,
    items: Vec<Value>,
}

/// Shared array with one or more dimensions, stored row-major
#[derive(Clone)]
pub struct ArrayRef(Arc<RwLock<ArrayData>>);

impl ArrayRef {
    /// Create an array; `items.len()` must equal the product of `lengths`
    pub fn new(ty: TypeHandle, element: TypeHandle, lengths: Vec<usize>, items: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(ArrayData {
            ty,
            element,
            lengths,
            items,
        })))
    }

    /// Array type
    pub fn ty(&self) -> TypeHandle {
        self.0.read().ty
    }

    /// Element type
    pub fn element(&self) -> TypeHandle {
        self.0.read().element
    }

    /// Per-dimension lengths
    pub fn lengths(&self) -> Vec<usize> {
        self.0.read().lengths.clone()
    }

    /// Number of dimensions
    pub fn rank(&self) -> usize {
        self.0.read().lengths.len()
    }

    /// Total element count
    pub fn len(&self) -> usize {
        self.0.read().items.len()
    }

    /// Whether the array has no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every element in row-major order
    pub fn items(&self) -> Vec<Value> {
        self.0.read().items.clone()
    }

    /// Element at a flat index
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().items.get(index).cloned()
    }

    /// Replace the element at a flat index
    pub fn set(&self, index: usize, value: Value) -> Result<(), HostError> {
        let mut data = self.0.write();
        let (ty, len) = (data.ty, data.items.len());
        let target = data
            .items
            .get_mut(index)
            .ok_or_else(|| slot_error(ty, index, len))?;
        *target = value;
        Ok(())
    }

    /// Pointer identity
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArrayRef({:?}@{:x})", self.lengths(), self.id())
    }
}

// ============================================================================
// List
// ============================================================================

#[derive(Debug)]
struct ListData {
    ty: TypeHandle,
    element: TypeHandle,
    items: Vec<Value>,
}

/// Shared growable list
#[derive(Clone)]
pub struct ListRef(Arc<RwLock<ListData>>);

impl ListRef {
    /// Create an empty list
    pub fn new(ty: TypeHandle, element: TypeHandle) -> Self {
        Self::from_items(ty, element, Vec::new())
    }

    /// Create a list holding `items`
    pub fn from_items(ty: TypeHandle, element: TypeHandle, items: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(ListData { ty, element, items })))
    }

    /// List type
    pub fn ty(&self) -> TypeHandle {
        self.0.read().ty
    }

    /// Element type
    pub fn element(&self) -> TypeHandle {
        self.0.read().element
    }

    /// Append an element
    pub fn push(&self, value: Value) {
        self.0.write().items.push(value);
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().items.get(index).cloned()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.read().items.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every element
    pub fn items(&self) -> Vec<Value> {
        self.0.read().items.clone()
    }

    /// Pointer identity
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for ListRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListRef(len={}@{:x})", self.len(), self.id())
    }
}

// ============================================================================
// Dictionary
// ============================================================================

#[derive(Debug)]
struct DictData {
    ty: TypeHandle,
    key: TypeHandle,
    value: TypeHandle,
    entries: Vec<(Value, Value)>,
}

/// Shared insertion-ordered dictionary
#[derive(Clone)]
pub struct DictRef(Arc<RwLock<DictData>>);

impl DictRef {
    /// Create an empty dictionary
    pub fn new(ty: TypeHandle, key: TypeHandle, value: TypeHandle) -> Self {
        Self(Arc::new(RwLock::new(DictData {
            ty,
            key,
            value,
            entries: Vec::new(),
        })))
    }

    /// Dictionary type
    pub fn ty(&self) -> TypeHandle {
        self.0.read().ty
    }

    /// Key type
    pub fn key_type(&self) -> TypeHandle {
        self.0.read().key
    }

    /// Value type
    pub fn value_type(&self) -> TypeHandle {
        self.0.read().value
    }

    /// Add an entry; null and duplicate keys are rejected
    pub fn insert(&self, key: Value, value: Value) -> Result<(), HostError> {
        if key.is_null() {
            return Err(HostError::NullKey);
        }
        let mut data = self.0.write();
        if data.entries.iter().any(|(k, _)| k.key_eq(&key)) {
            return Err(HostError::DuplicateKey(format!("{:?}", key)));
        }
        data.entries.push((key, value));
        Ok(())
    }

    /// Value stored under `key`
    pub fn get(&self, key: &Value) -> Option<Value> {
        self.0
            .read()
            .entries
            .iter()
            .find(|(k, _)| k.key_eq(key))
            .map(|(_, v)| v.clone())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.read().entries.len()
    }

    /// Whether the dictionary is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every entry in insertion order
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0.read().entries.clone()
    }

    /// Pointer identity
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for DictRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DictRef(len={}@{:x})", self.len(), self.id())
    }
}
