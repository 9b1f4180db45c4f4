//! Built-in converters
//!
//! | Name          | Handles                                          |
//! |---------------|--------------------------------------------------|
//! | `class`       | user classes and interface-typed values          |
//! | `string`      | strings                                          |
//! | `struct`      | scalars, enums and structs                       |
//! | `host_class`  | host-defined classes copied like values          |
//! | `host_object` | node and component references                    |
//! | `array`       | arrays of any rank                               |
//! | `list`        | lists                                            |
//! | `dictionary`  | dictionaries                                     |

mod array;
mod class;
mod dictionary;
mod host_object;
mod list;
mod string;
mod structure;

pub use array::ArrayConverter;
pub use class::{ClassConverter, HostClassConverter};
pub use dictionary::DictionaryConverter;
pub use host_object::HostObjectConverter;
pub use list::ListConverter;
pub use string::StringConverter;
pub use structure::StructConverter;

use tracing::{debug, warn};

use crate::classify;
use crate::convert::ConversionContext;
use crate::host::{FieldInfo, TypeHandle, Value};

/// Convert each of `fields` from `source` into `target`
///
/// A field that cannot be read, or whose conversion yields `Null`, keeps the
/// value `target` was constructed with.
pub(crate) fn copy_fields(ctx: &ConversionContext<'_>, source: &Value, target: &mut Value, fields: &[FieldInfo]) {
    let cache = ctx.session().cache();
    for field in fields {
        let accessor = cache.accessor(field);
        let original = match accessor.get(source) {
            Ok(value) => value,
            Err(err) => {
                warn!(field = %field.name, error = %err, "failed to read field");
                continue;
            }
        };
        let converted = ctx.convert_member(field, original);
        if converted.is_null() {
            continue;
        }
        if let Err(err) = accessor.set(target, converted) {
            warn!(field = %field.name, error = %err, "failed to write field");
        }
    }
}

/// Whether a collection with these element types must be left unconverted
pub(crate) fn rejects_nesting(ctx: &ConversionContext<'_>, elements: &[TypeHandle]) -> bool {
    if ctx.allows_collection_nesting() {
        return false;
    }
    let types = ctx.session().types();
    let nested = elements.iter().any(|&element| classify::is_collection(types, element));
    if nested && ctx.session().is_verbose() {
        debug!(
            ty = %types.name_of(ctx.value_type()),
            "nested collection without opt-in; skipping"
        );
    }
    nested
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use crate::cache::MetadataCache;
    use crate::config::EngineOptions;
    use crate::convert::{ConversionContext, ConversionEngine, ConversionSession, ReferenceRemap};
    use crate::host::{FieldInfo, TypeHandle, TypeRegistry, Value};
    use crate::registry::FieldRegistry;

    /// Engine pieces for converter tests
    pub struct Harness {
        pub types: Arc<TypeRegistry>,
        pub cache: MetadataCache,
        pub registry: FieldRegistry,
        pub engine: ConversionEngine,
    }

    impl Harness {
        pub fn new(types: Arc<TypeRegistry>) -> Self {
            let options = EngineOptions::default();
            Self {
                cache: MetadataCache::new(types.clone(), &options),
                registry: FieldRegistry::new(types.clone(), 100, false),
                engine: ConversionEngine::with_builtins(),
                types,
            }
        }

        pub fn session(&self) -> ConversionSession<'_> {
            ConversionSession::new(&self.engine, &self.cache, &self.registry, 64)
        }

        pub fn field(&self, ty: TypeHandle, name: &str) -> FieldInfo {
            self.types.find_field(ty, name).unwrap().unwrap()
        }

        pub fn convert(&self, field: &FieldInfo, value: Value) -> Value {
            let session = self.session();
            let ctx = ConversionContext::root(&session, field, value);
            let result = self.engine.convert_if_needed(&ctx);
            assert!(session.is_idle());
            result
        }

        pub fn convert_with_depth(&self, field: &FieldInfo, value: Value, max_depth: usize) -> Value {
            let session = ConversionSession::new(&self.engine, &self.cache, &self.registry, max_depth);
            let ctx = ConversionContext::root(&session, field, value);
            let result = self.engine.convert_if_needed(&ctx);
            assert!(session.is_idle());
            result
        }

        pub fn convert_with_remap(&self, field: &FieldInfo, value: Value, remap: &ReferenceRemap) -> Value {
            let session = self.session().with_remap(remap);
            let ctx = ConversionContext::root(&session, field, value);
            self.engine.convert_if_needed(&ctx)
        }
    }
}
