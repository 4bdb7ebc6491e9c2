//! Enum types

use crate::context::Name;

use super::TypeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumField {
    pub name: Name,
    pub value: i64,
}

#[derive(Debug, Clone)]
pub struct EnumType {
    /// Namespace components followed by the enum name.
    pub components: Vec<Name>,
    pub base: TypeId,
    pub fields: Vec<EnumField>,
}

impl EnumType {
    pub fn field(&self, name: Name) -> Option<&EnumField> {
        self.fields.iter().find(|field| field.name == name)
    }
}
