//! List converter

use crate::convert::converters::rejects_nesting;
use crate::convert::{ConversionContext, FieldConverter};
use crate::error::EngineResult;
use crate::host::{TypeKind, Value};

/// Copies lists element by element, keeping length and order
#[derive(Debug, Default, Clone, Copy)]
pub struct ListConverter;

impl FieldConverter for ListConverter {
    fn name(&self) -> &str {
        "list"
    }

    fn can_convert(&self, ctx: &ConversionContext<'_>) -> bool {
        ctx.session()
            .types()
            .get(ctx.value_type())
            .map(|info| matches!(info.kind, TypeKind::List { .. }))
            .unwrap_or(false)
    }

    fn convert(&self, ctx: &ConversionContext<'_>) -> EngineResult<Value> {
        if ctx.is_shared_reference() {
            return Ok(ctx.value().clone());
        }
        let Some(source) = ctx.value().as_list() else {
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
        let Ok(copy) = session.construct(ty) else {
            return Ok(Value::Null);
        };
        let Some(target) = copy.as_list() else {
            return Ok(Value::Null);
        };
        let _scope = session.enter(ctx.value(), ty, copy.clone());
        for item in source.items() {
            target.push(ctx.convert_element(item, element));
        }
        Ok(copy)
    }
}
