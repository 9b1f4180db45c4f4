//! Type classification
//!
//! Pure predicates over the host type table used by the registry and the
//! converters. None of these allocate or cache; callers that need the answers
//! repeatedly go through the field registry.

use crate::host::{
    natively_serializable_type, FieldInfo, TypeHandle, TypeKind, TypeOrigin, TypeRegistry,
};

fn kind_of(types: &TypeRegistry, ty: TypeHandle) -> Option<TypeKind> {
    types.get(ty).ok().map(|info| info.kind.clone())
}

/// Arrays, lists and dictionaries
pub fn is_collection(types: &TypeRegistry, ty: TypeHandle) -> bool {
    matches!(
        kind_of(types, ty),
        Some(TypeKind::Array { .. } | TypeKind::List { .. } | TypeKind::Dictionary { .. })
    )
}

/// Dictionaries
pub fn is_dictionary(types: &TypeRegistry, ty: TypeHandle) -> bool {
    matches!(kind_of(types, ty), Some(TypeKind::Dictionary { .. }))
}

/// Strings
pub fn is_string(types: &TypeRegistry, ty: TypeHandle) -> bool {
    matches!(kind_of(types, ty), Some(TypeKind::String))
}

/// Scalars and enums, which are copied by value
pub fn is_primitive(types: &TypeRegistry, ty: TypeHandle) -> bool {
    matches!(kind_of(types, ty), Some(TypeKind::Primitive(_) | TypeKind::Enum))
}

/// User or host structs
pub fn is_struct(types: &TypeRegistry, ty: TypeHandle) -> bool {
    matches!(kind_of(types, ty), Some(TypeKind::Struct))
}

/// Classes and interfaces that are not graph objects
pub fn is_plain_class(types: &TypeRegistry, ty: TypeHandle) -> bool {
    matches!(kind_of(types, ty), Some(TypeKind::Class | TypeKind::Interface))
}

/// Nodes and components, which live in the graph and are referenced, not copied
pub fn is_host_object(types: &TypeRegistry, ty: TypeHandle) -> bool {
    matches!(kind_of(types, ty), Some(TypeKind::Node | TypeKind::Component))
}

/// Types shipped with the host engine or the language core
pub fn is_host_type(types: &TypeRegistry, ty: TypeHandle) -> bool {
    types
        .get(ty)
        .map(|info| info.origin != TypeOrigin::User)
        .unwrap_or(true)
}

/// Component types declared by user code
pub fn is_user_component(types: &TypeRegistry, ty: TypeHandle) -> bool {
    types
        .get(ty)
        .map(|info| info.kind == TypeKind::Component && info.origin == TypeOrigin::User)
        .unwrap_or(false)
}

/// Whether the host serializer copies values of `ty` without help
pub fn is_natively_serializable(types: &TypeRegistry, ty: TypeHandle) -> bool {
    natively_serializable_type(types, ty)
}

/// Element types of a collection type: one for arrays and lists, key and
/// value for dictionaries
pub fn element_types(types: &TypeRegistry, ty: TypeHandle) -> Vec<TypeHandle> {
    match kind_of(types, ty) {
        Some(TypeKind::Array { element, .. } | TypeKind::List { element }) => vec![element],
        Some(TypeKind::Dictionary { key, value }) => vec![key, value],
        _ => Vec::new(),
    }
}

/// Whether any element type of collection `ty` is itself a collection
///
/// Strings are not collections here.
pub fn has_nested_collection(types: &TypeRegistry, ty: TypeHandle) -> bool {
    element_types(types, ty)
        .into_iter()
        .any(|element| is_collection(types, element))
}

/// Whether `field` should be captured by the engine
///
/// `declared_on_component` is true when the field is being listed for a
/// component type; the host already copies natively serializable fields of
/// components, so those are left to it. Plain classes get every valid field.
pub fn is_field_eligible(types: &TypeRegistry, field: &FieldInfo, declared_on_component: bool) -> bool {
    if field.slot.is_none() || field.modifiers.is_readonly {
        return false;
    }
    if field.attributes.non_serialized {
        return false;
    }
    if !field.is_public() && !field.attributes.serialize_field {
        return false;
    }
    !(declared_on_component && is_natively_serializable(types, field.ty))
}
