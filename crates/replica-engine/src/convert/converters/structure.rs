//! Value-type converter

use crate::classify;
use crate::convert::converters::copy_fields;
use crate::convert::{ConversionContext, FieldConverter};
use crate::error::EngineResult;
use crate::host::Value;

/// Copies scalars, enums and structs
///
/// Scalars pass through. Host structs are copied as a whole. User structs
/// are rebuilt from a default instance with each eligible field converted.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructConverter;

impl FieldConverter for StructConverter {
    fn name(&self) -> &str {
        "struct"
    }

    fn can_convert(&self, ctx: &ConversionContext<'_>) -> bool {
        let types = ctx.session().types();
        let ty = ctx.value_type();
        classify::is_primitive(types, ty) || classify::is_struct(types, ty)
    }

    fn convert(&self, ctx: &ConversionContext<'_>) -> EngineResult<Value> {
        let session = ctx.session();
        let types = session.types();
        let ty = ctx.value_type();
        if classify::is_primitive(types, ty) || ctx.is_shared_reference() {
            return Ok(ctx.value().clone());
        }
        if ctx.value().is_null() {
            return Ok(Value::Null);
        }
        if classify::is_host_type(types, ty) {
            return Ok(ctx.value().clone());
        }

        let Ok(mut duplicate) = session.construct(ty) else {
            return Ok(ctx.value().clone());
        };
        if let Some(fields) = session.registry().fields_for_type(ty) {
            copy_fields(ctx, ctx.value(), &mut duplicate, &fields);
        }
        Ok(duplicate)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::convert::converters::testing::Harness;
    use crate::host::{FieldDef, TypeDef, TypeRegistry, Value};

    #[test]
    fn test_struct_with_list_is_deep_copied() {
        let types = Arc::new(TypeRegistry::new());
        let list = types.list_of(types.int());
        let stats = types.define(
            TypeDef::structure("Stats")
                .field(FieldDef::public("level", types.int()))
                .field(FieldDef::public("history", list)),
        );
        let holder = types.define(TypeDef::component("Holder").field(FieldDef::public("stats", stats)));
        let harness = Harness::new(types.clone());

        let mut source = types.construct(stats).unwrap();
        let history = types.construct(list).unwrap();
        history.as_list().unwrap().push(Value::Int(1));
        types.set_field(&mut source, "level", Value::Int(3)).unwrap();
        types.set_field(&mut source, "history", history.clone()).unwrap();

        let copy = harness.convert(&harness.field(holder, "stats"), source.clone());
        assert!(copy.structurally_eq(&source));
        assert!(!types.get_field(&copy, "history").unwrap().same_ref(&history));
    }

    #[test]
    fn test_primitives_pass_through() {
        let types = Arc::new(TypeRegistry::new());
        let holder = types.define(TypeDef::class("Holder").field(FieldDef::public("f", types.float())));
        let harness = Harness::new(types);
        let copy = harness.convert(&harness.field(holder, "f"), Value::Float(1.5));
        assert_eq!(copy.as_float(), Some(1.5));
    }

    #[test]
    fn test_host_struct_is_copied_whole() {
        let types = Arc::new(TypeRegistry::new());
        let vector = types.define(
            TypeDef::structure("Vector3")
                .host()
                .field(FieldDef::public("x", types.float()))
                .field(FieldDef::public("y", types.float())),
        );
        let holder = types.define(TypeDef::class("Holder").field(FieldDef::public("v", vector)));
        let harness = Harness::new(types.clone());
        let mut source = types.construct(vector).unwrap();
        types.set_field(&mut source, "y", Value::Float(2.0)).unwrap();
        let copy = harness.convert(&harness.field(holder, "v"), source.clone());
        assert!(copy.structurally_eq(&source));
    }
}
