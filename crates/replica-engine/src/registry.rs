//! Field registry
//!
//! Lists, per type, the fields the engine captures and restores. Each user
//! type along an inheritance chain is scanned once; the walk stops at the
//! first host or built-in base. Per-type scans, refused host roots and merged
//! lists for concrete types are all kept in bounded caches. An evicted scan is
//! redone on the next lookup, so eviction costs time but never drops fields.

use std::sync::Arc;

use tracing::debug;

use crate::cache::BoundedCache;
use crate::classify;
use crate::host::{ComponentRef, FieldInfo, TypeHandle, TypeKind, TypeRegistry};

/// Eligible-field lists per type
pub struct FieldRegistry {
    types: Arc<TypeRegistry>,
    declared: BoundedCache<TypeHandle, Arc<[FieldInfo]>>,
    refused: BoundedCache<TypeHandle, ()>,
    merged: BoundedCache<TypeHandle, Option<Arc<[FieldInfo]>>>,
    verbose: bool,
}

impl FieldRegistry {
    /// Create an empty registry; each cache holds at most `capacity` types
    pub fn new(types: Arc<TypeRegistry>, capacity: u64, verbose: bool) -> Self {
        Self {
            types,
            declared: BoundedCache::new(capacity),
            refused: BoundedCache::new(capacity),
            merged: BoundedCache::new(capacity),
            verbose,
        }
    }

    /// Register the runtime type of `component`
    pub fn register_component(&self, component: &ComponentRef) -> bool {
        self.register(component.ty())
    }

    /// Scan `ty` and its user-defined bases
    ///
    /// Idempotent. Returns false when `ty` is a host or built-in type, which
    /// is remembered so later calls return immediately.
    pub fn register(&self, ty: TypeHandle) -> bool {
        if self.declared.get(&ty).is_some() {
            return true;
        }
        if self.refused.get(&ty).is_some() {
            return false;
        }
        if classify::is_host_type(&self.types, ty) {
            if self.verbose {
                debug!(ty = %self.types.name_of(ty), "refused host root");
            }
            self.refused.insert(ty, ());
            return false;
        }

        let mut current = Some(ty);
        while let Some(handle) = current {
            if self.declared_fields(handle).is_none() {
                break;
            }
            current = self.types.get(handle).ok().and_then(|info| info.base);
        }
        true
    }

    /// Eligible fields declared by `handle` itself, scanning on a miss
    ///
    /// `None` for host and unknown types.
    fn declared_fields(&self, handle: TypeHandle) -> Option<Arc<[FieldInfo]>> {
        if let Some(own) = self.declared.get(&handle) {
            return Some(own);
        }
        if classify::is_host_type(&self.types, handle) {
            return None;
        }
        let info = self.types.get(handle).ok()?;
        let own = self.declared.get_or_insert_with(handle, || {
            let on_component = info.kind == TypeKind::Component;
            let fields: Vec<FieldInfo> = info
                .fields
                .iter()
                .filter(|field| classify::is_field_eligible(&self.types, field, on_component))
                .cloned()
                .collect();
            if self.verbose {
                for field in &fields {
                    debug!(
                        owner = %info.name,
                        field = %field.name,
                        ty = %self.types.name_of(field.ty),
                        "registered field"
                    );
                }
            }
            Arc::from(fields)
        });
        Some(own)
    }

    /// Whether `ty` is currently scanned
    pub fn is_registered(&self, ty: TypeHandle) -> bool {
        self.declared.get(&ty).is_some()
    }

    /// Merged eligible fields of `ty` and its user bases, most derived first
    ///
    /// Returns `None` for host types and for types without eligible fields.
    pub fn fields_for_type(&self, ty: TypeHandle) -> Option<Arc<[FieldInfo]>> {
        if !self.register(ty) {
            return None;
        }
        self.merged.get_or_insert_with(ty, || {
            let mut fields = Vec::new();
            let mut current = Some(ty);
            while let Some(handle) = current {
                match self.declared_fields(handle) {
                    Some(own) => fields.extend(own.iter().cloned()),
                    None => break,
                }
                current = self.types.get(handle).ok().and_then(|info| info.base);
            }
            (!fields.is_empty()).then(|| Arc::from(fields))
        })
    }

    /// Capacity of each of the registry's caches
    pub fn capacity(&self) -> u64 {
        self.declared.capacity()
    }

    /// Number of scanned types currently cached
    pub fn len(&self) -> usize {
        self.declared.entry_count() as usize
    }

    /// Whether no scanned type is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of refused host types currently cached
    pub fn refused_len(&self) -> usize {
        self.refused.entry_count() as usize
    }

    /// Forget every scanned and refused type
    pub fn clear(&self) {
        self.declared.clear();
        self.refused.clear();
        self.merged.clear();
    }
}

impl std::fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRegistry")
            .field("declared", &self.declared)
            .field("refused", &self.refused)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FieldDef, TypeDef};

    fn registry(types: &Arc<TypeRegistry>) -> FieldRegistry {
        FieldRegistry::new(types.clone(), 100, false)
    }

    #[test]
    fn test_merges_inherited_fields() {
        let types = Arc::new(TypeRegistry::new());
        let dict = types.dictionary_of(types.string(), types.int());
        let base = types.define(TypeDef::component("Base").field(FieldDef::public("a", dict)));
        let derived = types.define(
            TypeDef::component("Derived")
                .base(base)
                .field(FieldDef::public("b", dict))
                .field(FieldDef::public("plain", types.int())),
        );
        let registry = registry(&types);

        let fields = registry.fields_for_type(derived).unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.name.to_string()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(registry.is_registered(base));
    }

    #[test]
    fn test_host_types_are_refused() {
        let types = Arc::new(TypeRegistry::new());
        let renderer = types.define(TypeDef::component("Renderer").host());
        let registry = registry(&types);
        assert!(!registry.register(renderer));
        assert!(!registry.register(renderer));
        assert!(registry.fields_for_type(renderer).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_plain_classes_keep_native_fields() {
        let types = Arc::new(TypeRegistry::new());
        let data = types.define(
            TypeDef::class("Data")
                .field(FieldDef::public("count", types.int()))
                .field(FieldDef::private("secret", types.int())),
        );
        let registry = registry(&types);
        let fields = registry.fields_for_type(data).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(&*fields[0].name, "count");
    }

    #[test]
    fn test_component_without_eligible_fields() {
        let types = Arc::new(TypeRegistry::new());
        let simple = types.define(TypeDef::component("Simple").field(FieldDef::public("hp", types.int())));
        let registry = registry(&types);
        assert!(registry.register(simple));
        assert!(registry.fields_for_type(simple).is_none());
    }

    #[test]
    fn test_scans_stay_within_capacity() {
        let types = Arc::new(TypeRegistry::new());
        let dict = types.dictionary_of(types.string(), types.int());
        let registry = registry(&types);
        let capacity = registry.capacity();

        let base = types.define(TypeDef::component("Base").field(FieldDef::public("shared", dict)));
        let mut derived = Vec::new();
        for index in 0..capacity * 3 {
            let ty = types.define(
                TypeDef::component(&format!("Derived{index}"))
                    .base(base)
                    .field(FieldDef::public("own", dict)),
            );
            assert!(registry.register(ty));
            derived.push(ty);
        }
        for index in 0..capacity * 3 {
            let host = types.define(TypeDef::component(&format!("Host{index}")).host());
            assert!(!registry.register(host));
        }
        assert!(registry.len() as u64 <= capacity);
        assert!(registry.refused_len() as u64 <= capacity);

        for ty in derived {
            let fields = registry.fields_for_type(ty).unwrap();
            let names: Vec<_> = fields.iter().map(|f| f.name.to_string()).collect();
            assert_eq!(names, vec!["own", "shared"]);
        }
    }

    #[test]
    fn test_clear_forgets_scans() {
        let types = Arc::new(TypeRegistry::new());
        let dict = types.dictionary_of(types.string(), types.int());
        let ty = types.define(TypeDef::component("Tracked").field(FieldDef::public("map", dict)));
        let registry = registry(&types);

        assert!(registry.register(ty));
        assert!(registry.is_registered(ty));
        registry.clear();
        assert!(!registry.is_registered(ty));
        assert_eq!(registry.fields_for_type(ty).map(|fields| fields.len()), Some(1));
    }
}
