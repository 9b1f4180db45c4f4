//! Array converter

use crate::convert::converters::rejects_nesting;
use crate::convert::{ConversionContext, FieldConverter};
use crate::error::EngineResult;
use crate::host::{TypeKind, Value};

/// Copies arrays of any rank element by element
///
/// The copy keeps the source's per-dimension lengths. Elements whose
/// conversion yields `Null` keep the element type's default.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArrayConverter;

impl FieldConverter for ArrayConverter {
    fn name(&self) -> &str {
        "array"
    }

    fn can_convert(&self, ctx: &ConversionContext<'_>) -> bool {
        ctx.session()
            .types()
            .get(ctx.value_type())
            .map(|info| matches!(info.kind, TypeKind::Array { .. }))
            .unwrap_or(false)
    }

    fn convert(&self, ctx: &ConversionContext<'_>) -> EngineResult<Value> {
        if ctx.is_shared_reference() {
            return Ok(ctx.value().clone());
        }
        let Some(source) = ctx.value().as_array() else {
            return Ok(Value::Null);
        };
        let element = source.element();
        if rejects_nesting(ctx, &[element]) {
            return Ok(Value::Null);
        }
        let session = ctx.session();
        if let Some(partner) = session.partner_of(ctx.value()) {
            return Ok(partner);
        }

        let ty = source.ty();
        let Ok(copy) = session.types().construct_array(ty, &source.lengths()) else {
            return Ok(Value::Null);
        };
        let Some(target) = copy.as_array() else {
            return Ok(Value::Null);
        };
        let _scope = session.enter(ctx.value(), ty, copy.clone());
        for (index, item) in source.items().into_iter().enumerate() {
            let converted = ctx.convert_element(item, element);
            if converted.is_null() {
                continue;
            }
            target.set(index, converted)?;
        }
        Ok(copy)
    }
}
