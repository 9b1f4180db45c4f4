//! Graph reference converter

use crate::classify;
use crate::convert::{ConversionContext, FieldConverter};
use crate::error::EngineResult;
use crate::host::Value;

/// Redirects node and component references into the clone
///
/// Graph objects are never duplicated. While restoring, a reference to a
/// source-side object that has a clone counterpart is replaced by that
/// counterpart; every other reference is kept.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostObjectConverter;

impl FieldConverter for HostObjectConverter {
    fn name(&self) -> &str {
        "host_object"
    }

    fn can_convert(&self, ctx: &ConversionContext<'_>) -> bool {
        classify::is_host_object(ctx.session().types(), ctx.value_type())
    }

    fn convert(&self, ctx: &ConversionContext<'_>) -> EngineResult<Value> {
        let value = ctx.value();
        if value.is_null() {
            return Ok(Value::Null);
        }
        Ok(ctx
            .session()
            .remap()
            .and_then(|remap| remap.clone_of(value))
            .unwrap_or_else(|| value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::convert::converters::testing::Harness;
    use crate::convert::ReferenceRemap;
    use crate::host::{FieldDef, NodeRef, TypeDef, TypeRegistry, Value};

    #[test]
    fn test_reference_is_redirected_to_clone() {
        let types = Arc::new(TypeRegistry::new());
        let data = types.define(TypeDef::class("Data").field(FieldDef::public("target", types.node())));
        let harness = Harness::new(types);
        let field = harness.field(data, "target");

        let source = Value::Node(NodeRef::new("source"));
        let clone = Value::Node(NodeRef::new("clone"));
        let outside = Value::Node(NodeRef::new("outside"));
        let mut remap = ReferenceRemap::new();
        remap.register(&clone, &source);

        assert!(harness.convert_with_remap(&field, source.clone(), &remap).same_ref(&clone));
        assert!(harness.convert_with_remap(&field, outside.clone(), &remap).same_ref(&outside));
        assert!(harness.convert(&field, source.clone()).same_ref(&source));
    }

    #[test]
    fn test_interface_field_holding_component() {
        let types = Arc::new(TypeRegistry::new());
        let target = types.define(TypeDef::interface("ITarget"));
        let marker = types.define(TypeDef::component("Marker"));
        let data = types.define(TypeDef::class("Data").field(FieldDef::public("target", target)));
        let harness = Harness::new(types.clone());

        let node = NodeRef::new("n");
        let component = Value::Component(node.add_component(&types, marker).unwrap());
        let copy = harness.convert(&harness.field(data, "target"), component.clone());
        assert!(copy.same_ref(&component));
    }
}
