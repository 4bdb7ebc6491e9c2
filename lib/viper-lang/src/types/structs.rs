//! Struct, incomplete and pending struct types

use crate::context::Name;
use crate::lexer::Token;

use super::TypeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    pub private: bool,
    pub name: Name,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructMethod {
    pub private: bool,
    pub name: Name,
    pub ty: TypeId,
}

/// A class lowered to its layout. Identity is the mangled registry key;
/// field offsets are the declaration order.
#[derive(Debug, Clone)]
pub struct StructType {
    /// Namespace components followed by the class name.
    pub components: Vec<Name>,
    pub fields: Vec<StructField>,
    pub methods: Vec<StructMethod>,
}

impl StructType {
    pub fn field(&self, name: Name) -> Option<(usize, &StructField)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, field)| field.name == name)
    }

    pub fn method(&self, name: Name) -> Option<&StructMethod> {
        self.methods.iter().find(|method| method.name == name)
    }
}

/// What a pending placeholder has been resolved into.
///
/// `Absent` is the initial state; the transitions to `Struct`, `Incomplete`
/// and `Enum` are monotone and remove the type from the pending work list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingResolution {
    Absent,
    Struct,
    Incomplete { size: u64 },
    Enum,
}

/// A placeholder registered for a type reference whose concrete identity is
/// determined later in the pipeline. Capability queries delegate to the
/// resolved variant and never observe the absent state.
#[derive(Debug, Clone)]
pub struct PendingType {
    /// The use-site token quoted by the unknown-type sweep.
    pub token: Token,
    /// The struct payload the placeholder is completed with.
    pub strukt: StructType,
    /// Base type, for placeholders resolved into enums.
    pub base: Option<TypeId>,
    pub resolution: PendingResolution,
}
