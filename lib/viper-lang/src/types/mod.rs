//! The type registry
//!
//! All types live in a process-wide registry keyed by mangled name. Entries
//! are append-only: a `TypeId` handed out once stays valid for the whole
//! compilation, and pending placeholders are completed in place so every
//! holder of the id observes the transition. The only supported
//! reclassification is turning a speculative struct back into a pending
//! placeholder during the symbol pass.

mod enums;
mod structs;

pub use enums::{EnumField, EnumType};
pub use structs::{PendingResolution, PendingType, StructField, StructMethod, StructType};

use std::collections::HashMap;

use crate::context::{Arena, Interner, Name, NodeId};
use crate::ir::IrType;
use crate::lexer::Token;
use crate::mangle;

pub type TypeId = NodeId<Type>;

/// How a source type may be converted into another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastLevel {
    Disallowed,
    Explicit,
    ImplicitWarning,
    Implicit,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Integer { bits: u32, signed: bool },
    Bool,
    Void,
    /// The builtin string type, lowered as a pointer to bytes.
    Str,
    /// Sentinel type given to expressions that already produced an error.
    Error,
    Pointer { pointee: TypeId },
    Array { base: TypeId, count: u64 },
    Function { ret: TypeId, params: Vec<TypeId> },
    Struct(StructType),
    Enum(EnumType),
    /// Size known, layout opaque; for types crossing a compilation boundary
    /// without being re-exported to the root.
    Incomplete { size: u64 },
    Pending(PendingType),
    /// Erased stand-in for a template parameter.
    Template { name: Name },
}

#[derive(Debug)]
pub struct Type {
    pub kind: TypeKind,
}

pub struct TypeRegistry {
    types: Arena<Type>,
    by_key: HashMap<Name, TypeId>,
    pending: Vec<TypeId>,
    pointer_cache: HashMap<TypeId, TypeId>,
    array_cache: HashMap<(TypeId, u64), TypeId>,
    function_cache: HashMap<(TypeId, Vec<TypeId>), TypeId>,
    template_cache: HashMap<Name, TypeId>,

    pub void: TypeId,
    pub bool_: TypeId,
    pub string: TypeId,
    pub error: TypeId,
    pub i32_: TypeId,
}

impl TypeRegistry {
    /// Populate the registry with the builtin types known to the lexer.
    pub fn with_builtins(interner: &mut Interner) -> Self {
        let mut types = Arena::default();
        let mut by_key = HashMap::new();

        let mut add = |key: &str, kind: TypeKind| -> TypeId {
            let id = types.alloc(Type { kind });
            by_key.insert(interner.intern(key), id);
            id
        };

        for bits in [8u32, 16, 32, 64] {
            add(&format!("i{bits}"), TypeKind::Integer { bits, signed: true });
            add(
                &format!("u{bits}"),
                TypeKind::Integer {
                    bits,
                    signed: false,
                },
            );
        }
        let bool_ = add("bool", TypeKind::Bool);
        let void = add("void", TypeKind::Void);
        let string = add("string", TypeKind::Str);
        let error = add("error-type", TypeKind::Error);

        let i32_ = by_key[&interner.try_lookup("i32").expect("builtin i32 is interned")];

        Self {
            types,
            by_key,
            pending: Vec::new(),
            pointer_cache: HashMap::new(),
            array_cache: HashMap::new(),
            function_cache: HashMap::new(),
            template_cache: HashMap::new(),
            void,
            bool_,
            string,
            error,
            i32_,
        }
    }

    pub fn get(&self, key: Name) -> Option<TypeId> {
        self.by_key.get(&key).copied()
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.types.get(id).kind
    }

    // -------------------------------------------------------------------
    // Interned derived types
    // -------------------------------------------------------------------

    pub fn pointer_to(&mut self, pointee: TypeId) -> TypeId {
        if let Some(&id) = self.pointer_cache.get(&pointee) {
            return id;
        }
        let id = self.types.alloc(Type {
            kind: TypeKind::Pointer { pointee },
        });
        self.pointer_cache.insert(pointee, id);
        id
    }

    pub fn array_of(&mut self, base: TypeId, count: u64) -> TypeId {
        if let Some(&id) = self.array_cache.get(&(base, count)) {
            return id;
        }
        let id = self.types.alloc(Type {
            kind: TypeKind::Array { base, count },
        });
        self.array_cache.insert((base, count), id);
        id
    }

    /// Function types are interned by structural equality.
    pub fn function_of(&mut self, ret: TypeId, params: Vec<TypeId>) -> TypeId {
        if let Some(&id) = self.function_cache.get(&(ret, params.clone())) {
            return id;
        }
        let id = self.types.alloc(Type {
            kind: TypeKind::Function {
                ret,
                params: params.clone(),
            },
        });
        self.function_cache.insert((ret, params), id);
        id
    }

    /// Template parameter stand-ins are interned by name, so both passes
    /// observe the same id for the same spelled parameter.
    pub fn template_param(&mut self, name: Name) -> TypeId {
        if let Some(&id) = self.template_cache.get(&name) {
            return id;
        }
        let id = self.types.alloc(Type {
            kind: TypeKind::Template { name },
        });
        self.template_cache.insert(name, id);
        id
    }

    // -------------------------------------------------------------------
    // Named types
    // -------------------------------------------------------------------

    /// Create a complete struct type, or return the existing entry under the
    /// same key.
    pub fn create_struct(
        &mut self,
        key: Name,
        components: Vec<Name>,
        fields: Vec<StructField>,
        methods: Vec<StructMethod>,
    ) -> TypeId {
        if let Some(&id) = self.by_key.get(&key) {
            return id;
        }
        let id = self.types.alloc(Type {
            kind: TypeKind::Struct(StructType {
                components,
                fields,
                methods,
            }),
        });
        self.by_key.insert(key, id);
        id
    }

    pub fn create_enum(
        &mut self,
        key: Name,
        components: Vec<Name>,
        base: TypeId,
        fields: Vec<EnumField>,
    ) -> TypeId {
        if let Some(&id) = self.by_key.get(&key) {
            return id;
        }
        let id = self.types.alloc(Type {
            kind: TypeKind::Enum(EnumType {
                components,
                base,
                fields,
            }),
        });
        self.by_key.insert(key, id);
        id
    }

    /// Register a pending placeholder for `key` and add it to the work list.
    pub fn create_pending(&mut self, key: Name, token: Token, components: Vec<Name>) -> TypeId {
        if let Some(&id) = self.by_key.get(&key) {
            return id;
        }
        let id = self.types.alloc(Type {
            kind: TypeKind::Pending(PendingType {
                token,
                strukt: StructType {
                    components,
                    fields: Vec::new(),
                    methods: Vec::new(),
                },
                base: None,
                resolution: PendingResolution::Absent,
            }),
        });
        self.by_key.insert(key, id);
        self.pending.push(id);
        id
    }

    /// Re-classify a speculative struct entry into a pending placeholder,
    /// keeping its id. The narrow deletion case of the registry.
    pub fn reclassify_to_pending(&mut self, id: TypeId, token: Token) {
        let entry = self.types.get_mut(id);
        if let TypeKind::Struct(st) = &entry.kind {
            entry.kind = TypeKind::Pending(PendingType {
                token,
                strukt: st.clone(),
                base: None,
                resolution: PendingResolution::Absent,
            });
            self.pending.push(id);
        }
    }

    // -------------------------------------------------------------------
    // Pending transitions
    // -------------------------------------------------------------------

    pub fn set_fields_and_methods(
        &mut self,
        id: TypeId,
        fields: Vec<StructField>,
        methods: Vec<StructMethod>,
    ) {
        if let TypeKind::Pending(pending) = &mut self.types.get_mut(id).kind {
            pending.strukt.fields = fields;
            pending.strukt.methods = methods;
            pending.resolution = PendingResolution::Absent;
            if !self.pending.contains(&id) {
                self.pending.push(id);
            }
        }
    }

    pub fn init_complete(&mut self, id: TypeId) {
        if let TypeKind::Pending(pending) = &mut self.types.get_mut(id).kind {
            pending.resolution = PendingResolution::Struct;
            self.pending.retain(|&p| p != id);
        }
    }

    pub fn init_incomplete(&mut self, id: TypeId) {
        let field_types: Vec<TypeId> = match self.kind(id) {
            TypeKind::Pending(p) => p.strukt.fields.iter().map(|f| f.ty).collect(),
            _ => return,
        };
        let size = field_types
            .iter()
            .map(|&ty| self_size(&self.types, ty))
            .sum();
        if let TypeKind::Pending(pending) = &mut self.types.get_mut(id).kind {
            pending.resolution = PendingResolution::Incomplete { size };
        }
        self.pending.retain(|&p| p != id);
    }

    /// Resolve a placeholder that turned out to name an enum.
    pub fn init_enum(&mut self, id: TypeId, base: TypeId) {
        if let TypeKind::Pending(pending) = &mut self.types.get_mut(id).kind {
            pending.base = Some(base);
            pending.resolution = PendingResolution::Enum;
            pending.strukt.fields.clear();
            pending.strukt.methods.clear();
        }
        self.pending.retain(|&p| p != id);
    }

    /// The work list of as-yet-unresolved type references.
    pub fn pending_list(&self) -> Vec<TypeId> {
        self.pending.clone()
    }

    /// The recorded use-site token of a pending placeholder.
    pub fn pending_token(&self, id: TypeId) -> Option<&Token> {
        match self.kind(id) {
            TypeKind::Pending(p) => Some(&p.token),
            _ => None,
        }
    }

    // -------------------------------------------------------------------
    // Capability queries
    // -------------------------------------------------------------------

    pub fn size(&self, id: TypeId) -> u64 {
        self_size(&self.types, id)
    }

    pub fn is_struct(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::Struct(_) => true,
            TypeKind::Pending(p) => p.resolution == PendingResolution::Struct,
            _ => false,
        }
    }

    pub fn is_enum(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::Enum(_) => true,
            TypeKind::Pending(p) => p.resolution == PendingResolution::Enum,
            _ => false,
        }
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Pointer { .. })
    }

    pub fn is_function(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Function { .. })
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Void)
    }

    pub fn is_array(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Array { .. })
    }

    pub fn is_template(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Template { .. })
    }

    pub fn is_integer(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Integer { .. })
    }

    pub fn is_error(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Error)
    }

    /// Whether variables of this type may be declared.
    pub fn is_object(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::Integer { .. }
            | TypeKind::Bool
            | TypeKind::Str
            | TypeKind::Pointer { .. }
            | TypeKind::Array { .. }
            | TypeKind::Struct(_)
            | TypeKind::Enum(_) => true,
            TypeKind::Pending(p) => matches!(
                p.resolution,
                PendingResolution::Struct | PendingResolution::Enum
            ),
            _ => false,
        }
    }

    pub fn pointee(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Pointer { pointee } => Some(*pointee),
            _ => None,
        }
    }

    pub fn function_parts(&self, id: TypeId) -> Option<(TypeId, &[TypeId])> {
        match self.kind(id) {
            TypeKind::Function { ret, params } => Some((*ret, params.as_slice())),
            _ => None,
        }
    }

    /// Struct view of a type, looking through completed placeholders.
    pub fn as_struct(&self, id: TypeId) -> Option<&StructType> {
        match self.kind(id) {
            TypeKind::Struct(st) => Some(st),
            TypeKind::Pending(p) if p.resolution == PendingResolution::Struct => Some(&p.strukt),
            _ => None,
        }
    }

    /// The namespace-qualified components of a struct or enum type.
    pub fn components(&self, id: TypeId) -> Option<&[Name]> {
        match self.kind(id) {
            TypeKind::Struct(st) => Some(&st.components),
            TypeKind::Enum(en) => Some(&en.components),
            TypeKind::Pending(p) => Some(&p.strukt.components),
            _ => None,
        }
    }

    // -------------------------------------------------------------------
    // Cast ranking
    // -------------------------------------------------------------------

    /// Rank the conversion `from` -> `to`.
    pub fn cast_to(&self, from: TypeId, to: TypeId) -> CastLevel {
        if from == to {
            return CastLevel::Implicit;
        }

        match (self.kind(from), self.kind(to)) {
            (
                TypeKind::Integer {
                    bits: fb,
                    signed: fs,
                },
                TypeKind::Integer {
                    bits: tb,
                    signed: ts,
                },
            ) => {
                if fs != ts {
                    CastLevel::ImplicitWarning
                } else if tb >= fb {
                    CastLevel::Implicit
                } else {
                    CastLevel::ImplicitWarning
                }
            }
            (TypeKind::Integer { .. }, TypeKind::Bool) => CastLevel::Explicit,
            (TypeKind::Bool, TypeKind::Integer { .. }) => CastLevel::Explicit,
            (TypeKind::Pointer { .. }, TypeKind::Pointer { .. }) => CastLevel::Explicit,
            (TypeKind::Pointer { .. }, TypeKind::Integer { bits: 64, .. }) => CastLevel::Explicit,
            (TypeKind::Str, TypeKind::Pointer { pointee }) => match self.kind(*pointee) {
                TypeKind::Integer { bits: 8, .. } => CastLevel::Implicit,
                _ => CastLevel::Disallowed,
            },
            (TypeKind::Enum(en), _) => {
                if en.base == to || self.cast_to(en.base, to) != CastLevel::Disallowed {
                    CastLevel::Explicit
                } else {
                    CastLevel::Disallowed
                }
            }
            (TypeKind::Pending(p), _) if p.resolution == PendingResolution::Enum => {
                let base = p.base.expect("enum placeholder has a base");
                if base == to || self.cast_to(base, to) != CastLevel::Disallowed {
                    CastLevel::Explicit
                } else {
                    CastLevel::Disallowed
                }
            }
            _ => CastLevel::Disallowed,
        }
    }

    // -------------------------------------------------------------------
    // Mangling and display
    // -------------------------------------------------------------------

    pub fn mangle_id(&self, interner: &Interner, id: TypeId) -> String {
        match self.kind(id) {
            TypeKind::Integer { bits, signed } => {
                if *signed {
                    format!("I{bits}")
                } else {
                    format!("U{bits}")
                }
            }
            TypeKind::Bool => "B".to_string(),
            TypeKind::Void => "V".to_string(),
            TypeKind::Str => "Str".to_string(),
            TypeKind::Error | TypeKind::Incomplete { .. } => {
                "Stray error-type in program".to_string()
            }
            TypeKind::Pointer { pointee } => format!("P{}", self.mangle_id(interner, *pointee)),
            TypeKind::Array { base, count } => {
                format!("A{count}{}", self.mangle_id(interner, *base))
            }
            TypeKind::Function { ret, params } => {
                let mut out = format!("F{}", self.mangle_id(interner, *ret));
                for &param in params {
                    out.push_str(&self.mangle_id(interner, param));
                }
                out
            }
            TypeKind::Struct(st) => mangle::struct_id(interner, &st.components),
            TypeKind::Enum(en) => mangle::enum_id(interner, &en.components),
            TypeKind::Pending(p) => match p.resolution {
                PendingResolution::Struct => mangle::struct_id(interner, &p.strukt.components),
                PendingResolution::Enum => mangle::enum_id(interner, &p.strukt.components),
                _ => "Stray error-type in program".to_string(),
            },
            TypeKind::Template { .. } => "STRAY TEMPLATETYPE IN PROGRAM".to_string(),
        }
    }

    /// The human-readable spelling used in diagnostics.
    pub fn display_name(&self, interner: &Interner, id: TypeId) -> String {
        match self.kind(id) {
            TypeKind::Integer { bits, signed } => {
                if *signed {
                    format!("i{bits}")
                } else {
                    format!("u{bits}")
                }
            }
            TypeKind::Bool => "bool".to_string(),
            TypeKind::Void => "void".to_string(),
            TypeKind::Str => "string".to_string(),
            TypeKind::Error => "error-type".to_string(),
            TypeKind::Pointer { pointee } => {
                format!("{}*", self.display_name(interner, *pointee))
            }
            TypeKind::Array { base, count } => {
                format!("{}[{count}]", self.display_name(interner, *base))
            }
            TypeKind::Function { ret, params } => {
                let params = params
                    .iter()
                    .map(|&p| self.display_name(interner, p))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({params}) -> {}", self.display_name(interner, *ret))
            }
            TypeKind::Struct(st) => format_components(interner, &st.components),
            TypeKind::Enum(en) => format_components(interner, &en.components),
            TypeKind::Incomplete { .. } => "error-type".to_string(),
            TypeKind::Pending(p) => format_components(interner, &p.strukt.components),
            TypeKind::Template { name } => interner.resolve(*name).to_string(),
        }
    }

    // -------------------------------------------------------------------
    // Template substitution
    // -------------------------------------------------------------------

    /// Rebuild `ty` with every occurrence of the template parameter
    /// `formal` replaced by `actual`.
    pub fn substitute(&mut self, ty: TypeId, formal: TypeId, actual: TypeId) -> TypeId {
        if ty == formal {
            return actual;
        }
        match self.kind(ty).clone() {
            TypeKind::Pointer { pointee } => {
                let inner = self.substitute(pointee, formal, actual);
                if inner == pointee {
                    ty
                } else {
                    self.pointer_to(inner)
                }
            }
            TypeKind::Array { base, count } => {
                let inner = self.substitute(base, formal, actual);
                if inner == base {
                    ty
                } else {
                    self.array_of(inner, count)
                }
            }
            TypeKind::Function { ret, params } => {
                let new_ret = self.substitute(ret, formal, actual);
                let new_params: Vec<TypeId> = params
                    .iter()
                    .map(|&p| self.substitute(p, formal, actual))
                    .collect();
                if new_ret == ret && new_params == params {
                    ty
                } else {
                    self.function_of(new_ret, new_params)
                }
            }
            _ => ty,
        }
    }

    // -------------------------------------------------------------------
    // IR lowering
    // -------------------------------------------------------------------

    /// Lower a front-end type to its IR shape. A struct field pointing back
    /// at its own struct lowers to an opaque byte pointer so the layout
    /// query does not recurse.
    pub fn ir_type(&self, id: TypeId) -> IrType {
        match self.kind(id) {
            TypeKind::Integer { bits, .. } => IrType::Int(*bits),
            TypeKind::Bool => IrType::Bool,
            TypeKind::Void | TypeKind::Error | TypeKind::Template { .. } => IrType::Void,
            TypeKind::Str => IrType::Ptr(Box::new(IrType::Int(8))),
            TypeKind::Pointer { pointee } => IrType::Ptr(Box::new(self.ir_type(*pointee))),
            TypeKind::Array { base, count } => {
                IrType::Array(Box::new(self.ir_type(*base)), *count)
            }
            TypeKind::Function { ret, params } => IrType::Function {
                ret: Box::new(self.ir_type(*ret)),
                params: params.iter().map(|&p| self.ir_type(p)).collect(),
            },
            TypeKind::Struct(st) => self.lower_struct(id, &st.fields),
            TypeKind::Enum(en) => self.ir_type(en.base),
            TypeKind::Incomplete { size } => IrType::Array(Box::new(IrType::Int(8)), *size),
            TypeKind::Pending(p) => match p.resolution {
                PendingResolution::Struct => self.lower_struct(id, &p.strukt.fields),
                PendingResolution::Enum => {
                    self.ir_type(p.base.expect("enum placeholder has a base"))
                }
                PendingResolution::Incomplete { size } => {
                    IrType::Array(Box::new(IrType::Int(8)), size)
                }
                PendingResolution::Absent => IrType::Void,
            },
        }
    }

    fn lower_struct(&self, id: TypeId, fields: &[StructField]) -> IrType {
        let mut lowered = Vec::with_capacity(fields.len());
        for field in fields {
            if let TypeKind::Pointer { pointee } = self.kind(field.ty) {
                if *pointee == id {
                    lowered.push(IrType::Ptr(Box::new(IrType::Int(8))));
                    continue;
                }
            }
            lowered.push(self.ir_type(field.ty));
        }
        IrType::Struct(lowered)
    }
}

fn self_size(types: &Arena<Type>, id: TypeId) -> u64 {
    match &types.get(id).kind {
        TypeKind::Integer { bits, .. } => (*bits as u64) / 8,
        TypeKind::Bool => 1,
        TypeKind::Void | TypeKind::Error | TypeKind::Function { .. } => 0,
        TypeKind::Str => 8,
        TypeKind::Pointer { .. } => 8,
        TypeKind::Array { base, count } => self_size(types, *base) * count,
        TypeKind::Struct(st) => st.fields.iter().map(|f| self_size(types, f.ty)).sum(),
        TypeKind::Enum(en) => self_size(types, en.base),
        TypeKind::Incomplete { size } => *size,
        TypeKind::Pending(p) => match p.resolution {
            PendingResolution::Incomplete { size } => size,
            PendingResolution::Enum => {
                self_size(types, p.base.expect("enum placeholder has a base"))
            }
            _ => p.strukt.fields.iter().map(|f| self_size(types, f.ty)).sum(),
        },
        TypeKind::Template { .. } => 0,
    }
}

fn format_components(interner: &Interner, components: &[Name]) -> String {
    components
        .iter()
        .map(|&c| interner.resolve(c))
        .collect::<Vec<_>>()
        .join("::")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Interner;
    use crate::lexer::{Token, TokenKind};

    fn setup() -> (Interner, TypeRegistry) {
        let mut interner = Interner::default();
        let types = TypeRegistry::with_builtins(&mut interner);
        (interner, types)
    }

    #[test]
    fn builtins_are_registered() {
        let (mut interner, types) = setup();
        for name in ["i8", "i16", "i32", "i64", "u8", "bool", "void", "string"] {
            let key = interner.intern(name);
            assert!(types.get(key).is_some(), "missing builtin {name}");
        }
    }

    #[test]
    fn function_types_are_interned_structurally() {
        let (_, mut types) = setup();
        let i32_ = types.i32_;
        let a = types.function_of(i32_, vec![i32_]);
        let b = types.function_of(i32_, vec![i32_]);
        assert_eq!(a, b);
        let c = types.function_of(i32_, vec![i32_, i32_]);
        assert_ne!(a, c);
    }

    #[test]
    fn integer_cast_ranking() {
        let (mut interner, types) = setup();
        let i8_ = types.get(interner.intern("i8")).unwrap();
        let i64_ = types.get(interner.intern("i64")).unwrap();
        assert_eq!(types.cast_to(i8_, i64_), CastLevel::Implicit);
        assert_eq!(types.cast_to(i64_, i8_), CastLevel::ImplicitWarning);
        assert_eq!(types.cast_to(i8_, types.bool_), CastLevel::Explicit);
        assert_eq!(types.cast_to(types.void, i8_), CastLevel::Disallowed);
    }

    #[test]
    fn pending_transitions_empty_the_work_list() {
        let (mut interner, mut types) = setup();
        let key = interner.intern("K");
        let k = interner.intern("K");
        let id = types.create_pending(key, Token::synthetic(TokenKind::Identifier), vec![k]);
        assert_eq!(types.pending_list(), vec![id]);
        assert!(!types.is_struct(id));

        let field_name = interner.intern("v");
        types.set_fields_and_methods(
            id,
            vec![StructField {
                private: false,
                name: field_name,
                ty: types.i32_,
            }],
            Vec::new(),
        );
        types.init_complete(id);

        assert!(types.pending_list().is_empty());
        assert!(types.is_struct(id));
        assert!(types.is_object(id));
        assert_eq!(types.size(id), 4);
        assert!(types.as_struct(id).unwrap().field(field_name).is_some());
    }

    #[test]
    fn incomplete_placeholder_is_opaque() {
        let (mut interner, mut types) = setup();
        let key = interner.intern("Hidden");
        let id = types.create_pending(key, Token::synthetic(TokenKind::Identifier), vec![key]);
        types.set_fields_and_methods(
            id,
            vec![StructField {
                private: false,
                name: interner.intern("x"),
                ty: types.i32_,
            }],
            Vec::new(),
        );
        types.init_incomplete(id);

        assert!(types.pending_list().is_empty());
        assert!(!types.is_struct(id));
        assert!(!types.is_object(id));
        assert_eq!(types.size(id), 4);
    }

    #[test]
    fn self_referential_struct_lowers_without_recursion() {
        let (mut interner, mut types) = setup();
        let key = interner.intern("Node");
        let id = types.create_pending(key, Token::synthetic(TokenKind::Identifier), vec![key]);
        let self_ptr = types.pointer_to(id);
        types.set_fields_and_methods(
            id,
            vec![
                StructField {
                    private: false,
                    name: interner.intern("value"),
                    ty: types.i32_,
                },
                StructField {
                    private: false,
                    name: interner.intern("next"),
                    ty: self_ptr,
                },
            ],
            Vec::new(),
        );
        types.init_complete(id);

        match types.ir_type(id) {
            IrType::Struct(fields) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[1], IrType::Ptr(Box::new(IrType::Int(8))));
            }
            other => panic!("expected struct lowering, got {other:?}"),
        }
    }
}
