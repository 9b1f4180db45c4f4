//! String converter

use std::sync::Arc;

use crate::classify;
use crate::convert::{ConversionContext, FieldConverter};
use crate::error::EngineResult;
use crate::host::Value;

/// Returns a fresh copy of a string
#[derive(Debug, Default, Clone, Copy)]
pub struct StringConverter;

impl FieldConverter for StringConverter {
    fn name(&self) -> &str {
        "string"
    }

    fn can_convert(&self, ctx: &ConversionContext<'_>) -> bool {
        classify::is_string(ctx.session().types(), ctx.value_type())
    }

    fn convert(&self, ctx: &ConversionContext<'_>) -> EngineResult<Value> {
        Ok(match ctx.value() {
            Value::Str(s) => Value::Str(Arc::from(&**s)),
            _ => Value::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::convert::converters::testing::Harness;
    use crate::host::{FieldDef, TypeDef, TypeRegistry, Value};

    #[test]
    fn test_string_is_copied() {
        let types = Arc::new(TypeRegistry::new());
        let holder = types.define(TypeDef::class("Holder").field(FieldDef::public("s", types.string())));
        let harness = Harness::new(types);
        let source = Value::str("hello");
        let copy = harness.convert(&harness.field(holder, "s"), source.clone());
        assert_eq!(copy.as_str(), Some("hello"));
        let (Value::Str(a), Value::Str(b)) = (&source, &copy) else {
            panic!("expected strings");
        };
        assert!(!Arc::ptr_eq(a, b));
    }

    #[test]
    fn test_null_string_stays_null() {
        let types = Arc::new(TypeRegistry::new());
        let holder = types.define(TypeDef::class("Holder").field(FieldDef::public("s", types.string())));
        let harness = Harness::new(types);
        assert!(harness.convert(&harness.field(holder, "s"), Value::Null).is_null());
    }
}
