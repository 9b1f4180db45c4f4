//! Dictionary converter

use tracing::warn;

use crate::convert::converters::rejects_nesting;
use crate::convert::{ConversionContext, FieldConverter};
use crate::error::EngineResult;
use crate::host::{TypeKind, Value};

/// Copies dictionaries entry by entry
///
/// Keys and values are converted separately. An entry whose key converts to
/// `Null` is dropped with a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct DictionaryConverter;

impl FieldConverter for DictionaryConverter {
    fn name(&self) -> &str {
        "dictionary"
    }

    fn can_convert(&self, ctx: &ConversionContext<'_>) -> bool {
        ctx.session()
            .types()
            .get(ctx.value_type())
            .map(|info| matches!(info.kind, TypeKind::Dictionary { .. }))
            .unwrap_or(false)
    }

    fn convert(&self, ctx: &ConversionContext<'_>) -> EngineResult<Value> {
        if ctx.is_shared_reference() {
            return Ok(ctx.value().clone());
        }
        let Some(source) = ctx.value().as_dict() else {
            return Ok(Value::Null);
        };
        let (key_type, value_type) = (source.key_type(), source.value_type());
        if rejects_nesting(ctx, &[key_type, value_type]) {
            return Ok(Value::Null);
        }
        let session = ctx.session();
        if let Some(partner) = session.partner_of(ctx.value()) {
            return Ok(partner);
        }

        let ty = source.ty();
        let Ok(copy) = session.construct(ty) else {
            return Ok(Value::Null);
        };
        let Some(target) = copy.as_dict() else {
            return Ok(Value::Null);
        };
        let _scope = session.enter(ctx.value(), ty, copy.clone());
        for (key, value) in source.entries() {
            let new_key = ctx.convert_element(key, key_type);
            if new_key.is_null() {
                warn!(ty = %session.types().name_of(ty), "dictionary key converted to null; dropping entry");
                continue;
            }
            let new_value = ctx.convert_element(value, value_type);
            if let Err(err) = target.insert(new_key, new_value) {
                warn!(ty = %session.types().name_of(ty), error = %err, "failed to insert dictionary entry");
            }
        }
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::convert::converters::testing::Harness;
    use crate::host::{FieldDef, TypeDef, TypeRegistry, Value};

    #[test]
    fn test_entries_are_converted() {
        let types = Arc::new(TypeRegistry::new());
        let item = types.define(TypeDef::class("Item").field(FieldDef::public("weight", types.float())));
        let inventory = types.dictionary_of(types.string(), item);
        let holder = types.define(TypeDef::component("Holder").field(FieldDef::public("inventory", inventory)));
        let harness = Harness::new(types.clone());

        let source = types.construct(inventory).unwrap();
        let sword = types.construct(item).unwrap();
        sword.as_object().unwrap().set(0, Value::Float(3.5)).unwrap();
        source.as_dict().unwrap().insert(Value::str("sword"), sword.clone()).unwrap();

        let copy = harness.convert(&harness.field(holder, "inventory"), source.clone());
        let copied = copy.as_dict().unwrap();
        assert_eq!(copied.len(), 1);
        let copied_sword = copied.get(&Value::str("sword")).unwrap();
        assert!(!copied_sword.same_ref(&sword));
        assert!(copied_sword.structurally_eq(&sword));
    }

    #[test]
    fn test_entries_with_null_keys_are_dropped() {
        let types = Arc::new(TypeRegistry::new());
        let key = types.define(TypeDef::class("Key"));
        let map = types.dictionary_of(key, types.int());
        let holder = types.define(TypeDef::class("Holder").field(FieldDef::public("map", map)));
        let harness = Harness::new(types.clone());
        harness.engine.register_converter(Arc::new(NullKeys));

        let source = types.construct(map).unwrap();
        let dict = source.as_dict().unwrap();
        dict.insert(types.construct(key).unwrap(), Value::Int(1)).unwrap();
        dict.insert(types.construct(key).unwrap(), Value::Int(2)).unwrap();

        let copy = harness.convert(&harness.field(holder, "map"), source);
        assert!(copy.as_dict().unwrap().is_empty());
    }

    #[test]
    fn test_dictionary_of_lists_needs_opt_in() {
        let types = Arc::new(TypeRegistry::new());
        let map = types.dictionary_of(types.int(), types.list_of(types.int()));
        let holder = types.define(TypeDef::class("Holder").field(FieldDef::public("map", map)));
        let harness = Harness::new(types.clone());
        let source = types.construct(map).unwrap();
        assert!(harness.convert(&harness.field(holder, "map"), source).is_null());
    }

    /// Converts every `Key` instance to null
    struct NullKeys;

    impl crate::convert::FieldConverter for NullKeys {
        fn name(&self) -> &str {
            "null_keys"
        }

        fn can_convert(&self, ctx: &crate::convert::ConversionContext<'_>) -> bool {
            ctx.session().types().name_of(ctx.value_type()).as_ref() == "Key"
        }

        fn convert(&self, _ctx: &crate::convert::ConversionContext<'_>) -> crate::error::EngineResult<Value> {
            Ok(Value::Null)
        }
    }
}
