//! Metadata cache
//!
//! Bounded, concurrent caches over host metadata: field accessors, default
//! constructors, flattened field layouts and name lookups. All caches are
//! `moka::sync::Cache`s, so concurrent first use is safe; when two callers
//! race to fill the same key the first insert wins and the other result is
//! dropped.

pub mod accessor;

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use moka::sync::Cache;

use crate::config::{EngineOptions, MIN_CACHE_CAPACITY};
use crate::error::HostError;
use crate::host::{FieldInfo, FieldKey, TypeHandle, TypeRegistry, Value};

pub use accessor::{FieldAccessor, Getter, Setter};

/// Default constructor thunk
pub type Constructor = Arc<dyn Fn() -> Result<Value, HostError> + Send + Sync>;

/// Capacity-bounded key/value cache
#[derive(Clone)]
pub struct BoundedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<K, V>,
    capacity: u64,
}

impl<K, V> BoundedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache holding at most `capacity` entries (never below the floor)
    pub fn new(capacity: u64) -> Self {
        let capacity = capacity.max(MIN_CACHE_CAPACITY);
        Self {
            inner: Cache::new(capacity),
            capacity,
        }
    }

    /// Configured capacity
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Cached value for `key`
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    /// Store a value, replacing any previous one
    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    /// Cached value for `key`, computing and storing it on a miss
    pub fn get_or_insert_with<F>(&self, key: K, f: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(cached) = self.inner.get(&key) {
            return cached;
        }
        let computed = f();
        self.inner.entry(key).or_insert(computed).into_value()
    }

    /// Fallible variant of [`BoundedCache::get_or_insert_with`]; errors are not cached
    pub fn try_get_or_insert_with<F, E>(&self, key: K, f: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(cached) = self.inner.get(&key) {
            return Ok(cached);
        }
        let computed = f()?;
        Ok(self.inner.entry(key).or_insert(computed).into_value())
    }

    /// Drop one entry
    pub fn invalidate(&self, key: &K) {
        self.inner.invalidate(key);
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Approximate number of entries
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

impl<K, V> fmt::Debug for BoundedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("capacity", &self.capacity)
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

/// Metadata caches shared by every clone operation
pub struct MetadataCache {
    types: Arc<TypeRegistry>,
    accessors: BoundedCache<FieldKey, Arc<FieldAccessor>>,
    constructors: BoundedCache<TypeHandle, Option<Constructor>>,
    layouts: BoundedCache<TypeHandle, Arc<[FieldInfo]>>,
    lookups: BoundedCache<(TypeHandle, Arc<str>), Option<FieldInfo>>,
}

impl MetadataCache {
    /// Create caches sized from `options`
    pub fn new(types: Arc<TypeRegistry>, options: &EngineOptions) -> Self {
        let derived = options.derived_capacity();
        Self {
            types,
            accessors: BoundedCache::new(options.member_cache_capacity),
            constructors: BoundedCache::new(derived),
            layouts: BoundedCache::new(derived),
            lookups: BoundedCache::new(options.type_cache_capacity),
        }
    }

    /// Type table the caches describe
    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    /// Bound accessor for `field`
    pub fn accessor(&self, field: &FieldInfo) -> Arc<FieldAccessor> {
        self.accessors
            .get_or_insert_with(field.key(), || Arc::new(FieldAccessor::bind(field)))
    }

    /// Default constructor of `ty`, if it has one
    pub fn constructor(&self, ty: TypeHandle) -> Option<Constructor> {
        self.constructors.get_or_insert_with(ty, || {
            let constructible = self.types.get(ty).map(|info| info.constructible).unwrap_or(false);
            constructible.then(|| {
                let types = self.types.clone();
                Arc::new(move || types.construct(ty)) as Constructor
            })
        })
    }

    /// Default-construct `ty` through the cached constructor
    pub fn construct(&self, ty: TypeHandle) -> Result<Value, HostError> {
        match self.constructor(ty) {
            Some(constructor) => constructor(),
            None => Err(HostError::NotConstructible(self.types.name_of(ty).to_string())),
        }
    }

    /// Flattened instance layout of `ty`
    pub fn layout(&self, ty: TypeHandle) -> Result<Arc<[FieldInfo]>, HostError> {
        self.layouts
            .try_get_or_insert_with(ty, || self.types.layout(ty).map(Arc::from))
    }

    /// Field named `name` on `ty` or its bases
    pub fn find_field(&self, ty: TypeHandle, name: &str) -> Option<FieldInfo> {
        self.lookups.get_or_insert_with((ty, Arc::from(name)), || {
            self.types.find_field(ty, name).ok().flatten()
        })
    }

    /// Forget everything cached about `ty`
    pub fn invalidate_type(&self, ty: TypeHandle) {
        self.constructors.invalidate(&ty);
        self.layouts.invalidate(&ty);
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        self.accessors.clear();
        self.constructors.clear();
        self.layouts.clear();
        self.lookups.clear();
    }
}

impl fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataCache")
            .field("accessors", &self.accessors)
            .field("constructors", &self.constructors.capacity())
            .field("layouts", &self.layouts.capacity())
            .field("lookups", &self.lookups.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FieldDef, TypeDef};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_capacity_floor() {
        let cache: BoundedCache<u32, u32> = BoundedCache::new(3);
        assert_eq!(cache.capacity(), MIN_CACHE_CAPACITY);
    }

    #[test]
    fn test_first_writer_wins() {
        let cache: BoundedCache<u32, u32> = BoundedCache::new(100);
        let calls = AtomicUsize::new(0);
        let a = cache.get_or_insert_with(1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            10
        });
        let b = cache.get_or_insert_with(1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            20
        });
        assert_eq!((a, b), (10, 10));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache: BoundedCache<u32, u32> = BoundedCache::new(100);
        assert!(cache.try_get_or_insert_with(1, || Err::<u32, _>("boom")).is_err());
        assert_eq!(cache.try_get_or_insert_with(1, || Ok::<_, &str>(5)), Ok(5));
    }

    #[test]
    fn test_constructor_cache_remembers_missing_constructors() {
        let types = Arc::new(TypeRegistry::new());
        let plain = types.define(TypeDef::class("Plain").field(FieldDef::public("x", types.int())));
        let sealed = types.define(TypeDef::class("NoCtor").no_default_constructor());
        let cache = MetadataCache::new(types.clone(), &EngineOptions::default());

        assert!(matches!(cache.construct(plain).unwrap(), Value::Object(_)));
        assert!(cache.constructor(sealed).is_none());
        assert!(matches!(cache.construct(sealed), Err(HostError::NotConstructible(_))));
    }

    #[test]
    fn test_find_field_and_layout() {
        let types = Arc::new(TypeRegistry::new());
        let base = types.define(TypeDef::class("Base").field(FieldDef::public("a", types.int())));
        let derived = types.define(TypeDef::class("Derived").base(base).field(FieldDef::private("b", types.int())));
        let cache = MetadataCache::new(types, &EngineOptions::default());

        assert_eq!(cache.layout(derived).unwrap().len(), 2);
        assert_eq!(cache.find_field(derived, "a").unwrap().owner, base);
        assert!(cache.find_field(derived, "missing").is_none());
    }
}
