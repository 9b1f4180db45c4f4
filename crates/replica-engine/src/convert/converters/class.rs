//! Class converters

use crate::classify;
use crate::convert::converters::copy_fields;
use crate::convert::{ConversionContext, FieldConverter};
use crate::error::EngineResult;
use crate::host::{TypeKind, TypeOrigin, Value};

/// Deep-copies user classes
///
/// Values reached through a shared-reference field are returned as-is. A
/// null value becomes a default instance unless its type is already being
/// converted on the chain. A value already in progress resolves to its
/// duplicate. Types without a default constructor are returned as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassConverter;

impl FieldConverter for ClassConverter {
    fn name(&self) -> &str {
        "class"
    }

    fn can_convert(&self, ctx: &ConversionContext<'_>) -> bool {
        let types = ctx.session().types();
        let ty = ctx.value_type();
        classify::is_plain_class(types, ty) && !classify::is_host_type(types, ty)
    }

    fn convert(&self, ctx: &ConversionContext<'_>) -> EngineResult<Value> {
        if ctx.is_shared_reference() {
            return Ok(ctx.value().clone());
        }
        let session = ctx.session();
        let ty = ctx.value_type();

        if ctx.value().is_null() {
            if session.is_type_active(ty) {
                return Ok(Value::Null);
            }
            return Ok(session.construct(ty).unwrap_or(Value::Null));
        }
        if let Some(partner) = session.partner_of(ctx.value()) {
            return Ok(partner);
        }

        let Ok(mut duplicate) = session.construct(ty) else {
            return Ok(ctx.value().clone());
        };
        let _scope = session.enter(ctx.value(), ty, duplicate.clone());
        if let Some(fields) = session.registry().fields_for_type(ty) {
            copy_fields(ctx, ctx.value(), &mut duplicate, &fields);
        }
        Ok(duplicate)
    }
}

/// Copies host-defined classes field by field, like values
#[derive(Debug, Default, Clone, Copy)]
pub struct HostClassConverter;

impl FieldConverter for HostClassConverter {
    fn name(&self) -> &str {
        "host_class"
    }

    fn can_convert(&self, ctx: &ConversionContext<'_>) -> bool {
        ctx.session()
            .types()
            .get(ctx.value_type())
            .map(|info| info.kind == TypeKind::Class && info.origin == TypeOrigin::Host)
            .unwrap_or(false)
    }

    fn convert(&self, ctx: &ConversionContext<'_>) -> EngineResult<Value> {
        if ctx.is_shared_reference() || ctx.value().is_null() {
            return Ok(ctx.value().clone());
        }
        let session = ctx.session();
        if let Some(partner) = session.partner_of(ctx.value()) {
            return Ok(partner);
        }
        let ty = ctx.value_type();
        let Ok(mut duplicate) = session.construct(ty) else {
            return Ok(ctx.value().clone());
        };
        let layout = session.cache().layout(ty)?;
        let _scope = session.enter(ctx.value(), ty, duplicate.clone());
        copy_fields(ctx, ctx.value(), &mut duplicate, &layout);
        Ok(duplicate)
    }
}
