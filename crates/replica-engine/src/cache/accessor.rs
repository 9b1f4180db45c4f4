//! Field accessor thunks
//!
//! Each instance field is resolved once into a getter/setter pair bound to its
//! layout slot, so hot paths never search a type's field list by name.

use std::fmt;
use std::sync::Arc;

use crate::error::HostError;
use crate::host::{FieldInfo, Value};

/// Reads a field from its holder
pub type Getter = Arc<dyn Fn(&Value) -> Result<Value, HostError> + Send + Sync>;

/// Writes a field into its holder
pub type Setter = Arc<dyn Fn(&mut Value, Value) -> Result<(), HostError> + Send + Sync>;

/// Getter/setter pair for one field
#[derive(Clone)]
pub struct FieldAccessor {
    field: FieldInfo,
    getter: Getter,
    setter: Setter,
}

impl FieldAccessor {
    /// Bind accessors for `field`
    pub fn bind(field: &FieldInfo) -> Self {
        let getter: Getter;
        let setter: Setter;
        match field.slot {
            Some(slot) => {
                getter = Arc::new(move |holder: &Value| holder.get_slot(slot));
                setter = Arc::new(move |holder: &mut Value, value: Value| holder.set_slot(slot, value));
            }
            None => {
                let name = field.name.to_string();
                let name2 = name.clone();
                getter = Arc::new(move |_: &Value| -> Result<Value, HostError> {
                    Err(HostError::NotAnInstanceField(name.clone()))
                });
                setter = Arc::new(move |_: &mut Value, _: Value| -> Result<(), HostError> {
                    Err(HostError::NotAnInstanceField(name2.clone()))
                });
            }
        }
        Self {
            field: field.clone(),
            getter,
            setter,
        }
    }

    /// The bound field
    pub fn field(&self) -> &FieldInfo {
        &self.field
    }

    /// Read the field from `holder`
    pub fn get(&self, holder: &Value) -> Result<Value, HostError> {
        (self.getter)(holder)
    }

    /// Write the field into `holder`
    pub fn set(&self, holder: &mut Value, value: Value) -> Result<(), HostError> {
        (self.setter)(holder, value)
    }
}

impl fmt::Debug for FieldAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("field", &self.field.name)
            .field("slot", &self.field.slot)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FieldDef, TypeDef, TypeRegistry};

    #[test]
    fn test_accessor_reads_and_writes_slot() {
        let types = TypeRegistry::new();
        let ty = types.define(
            TypeDef::structure("Pair")
                .field(FieldDef::public("a", types.int()))
                .field(FieldDef::public("b", types.int())),
        );
        let field = types.find_field(ty, "b").unwrap().unwrap();
        let accessor = FieldAccessor::bind(&field);

        let mut value = types.construct(ty).unwrap();
        accessor.set(&mut value, Value::Int(11)).unwrap();
        assert_eq!(accessor.get(&value).unwrap().as_int(), Some(11));
        assert_eq!(value.get_slot(0).unwrap().as_int(), Some(0));
    }

    #[test]
    fn test_static_field_has_no_storage() {
        let types = TypeRegistry::new();
        let ty = types.define(TypeDef::class("Config").field(FieldDef::public("shared", types.int()).static_field()));
        let field = types.find_field(ty, "shared").unwrap().unwrap();
        let accessor = FieldAccessor::bind(&field);
        let value = types.construct(ty).unwrap();
        assert!(matches!(accessor.get(&value), Err(HostError::NotAnInstanceField(_))));
    }
}
