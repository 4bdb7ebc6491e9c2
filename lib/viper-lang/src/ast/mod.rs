//! The abstract syntax tree
//!
//! Nodes own their children; scopes and types are referenced by id. The
//! capability surface (`type_check`, `semantic_check`, `emit`,
//! `clone_into`, `set_template_type`, ...) is dispatched through a single
//! sum type rather than an inheritance hierarchy.

mod expression;
mod global;
mod statement;

pub use expression::{
    BinaryExpression, BinaryOperator, BooleanLiteral, CallExpression, CastExpression,
    IntegerLiteral, MemberAccess, StringLiteral, UnaryExpression, UnaryOperator,
};
pub use global::{
    ClassDeclaration, ClassField, EnumDeclaration, EnumVariant, Function, FunctionArgument,
    Namespace,
};
pub use statement::{IfStatement, ReturnStatement, VariableDeclaration};

use crate::context::{Context, ScopeId, SymbolId};
use crate::diagnostics::Diagnostics;
use crate::ir::{IrBuilder, ValueId};
use crate::lexer::Token;
use crate::types::{CastLevel, TypeId};

#[derive(Debug)]
pub enum Ast {
    Function(Function),
    Class(ClassDeclaration),
    Enum(EnumDeclaration),
    Namespace(Namespace),

    Return(ReturnStatement),
    VarDecl(VariableDeclaration),
    If(IfStatement),

    Binary(BinaryExpression),
    Unary(UnaryExpression),
    Integer(IntegerLiteral),
    Str(StringLiteral),
    Bool(BooleanLiteral),
    Variable(VariableExpression),
    Call(CallExpression),
    Member(MemberAccess),
    Cast(CastExpression),
}

pub use expression::VariableExpression;

impl Ast {
    /// The resolved type of the node, set by the type-check pass.
    pub fn ty(&self) -> Option<TypeId> {
        match self {
            Ast::Function(n) => Some(n.ty),
            Ast::Class(n) => Some(n.ty),
            Ast::Enum(n) => Some(n.ty),
            Ast::Namespace(_) => None,
            Ast::Return(n) => n.ty,
            Ast::VarDecl(n) => n.ty,
            Ast::If(_) => None,
            Ast::Binary(n) => n.ty,
            Ast::Unary(n) => n.ty,
            Ast::Integer(n) => n.ty,
            Ast::Str(n) => n.ty,
            Ast::Bool(n) => n.ty,
            Ast::Variable(n) => n.ty,
            Ast::Call(n) => n.ty,
            Ast::Member(n) => n.ty,
            Ast::Cast(n) => n.ty,
        }
    }

    pub fn scope(&self) -> ScopeId {
        match self {
            Ast::Function(n) => n.scope,
            Ast::Class(n) => n.scope,
            Ast::Enum(n) => n.scope,
            Ast::Namespace(n) => n.scope,
            Ast::Return(n) => n.scope,
            Ast::VarDecl(n) => n.scope,
            Ast::If(n) => n.scope,
            Ast::Binary(n) => n.scope,
            Ast::Unary(n) => n.scope,
            Ast::Integer(n) => n.scope,
            Ast::Str(n) => n.scope,
            Ast::Bool(n) => n.scope,
            Ast::Variable(n) => n.scope,
            Ast::Call(n) => n.scope,
            Ast::Member(n) => n.scope,
            Ast::Cast(n) => n.scope,
        }
    }

    /// The token quoted when diagnostics point at this node.
    pub fn error_token(&self) -> &Token {
        match self {
            Ast::Function(n) => &n.error_token,
            Ast::Class(n) => &n.error_token,
            Ast::Enum(n) => &n.error_token,
            Ast::Namespace(n) => &n.error_token,
            Ast::Return(n) => &n.error_token,
            Ast::VarDecl(n) => &n.error_token,
            Ast::If(n) => &n.error_token,
            Ast::Binary(n) => &n.error_token,
            Ast::Unary(n) => &n.error_token,
            Ast::Integer(n) => &n.error_token,
            Ast::Str(n) => &n.error_token,
            Ast::Bool(n) => &n.error_token,
            Ast::Variable(n) => &n.error_token,
            Ast::Call(n) => &n.error_token,
            Ast::Member(n) => &n.error_token,
            Ast::Cast(n) => &n.error_token,
        }
    }

    /// The symbol this node declares or resolved to, if any.
    pub fn symbol(&self) -> Option<SymbolId> {
        match self {
            Ast::Function(n) => Some(n.symbol),
            Ast::Class(n) => Some(n.symbol),
            Ast::Enum(n) => Some(n.symbol),
            Ast::VarDecl(n) => Some(n.symbol),
            Ast::Variable(n) => n.symbol,
            _ => None,
        }
    }

    pub fn type_check(&mut self, ctx: &mut Context, diag: &mut Diagnostics) {
        match self {
            Ast::Function(n) => n.type_check(ctx, diag),
            Ast::Class(n) => n.type_check(ctx, diag),
            Ast::Enum(n) => n.type_check(ctx, diag),
            Ast::Namespace(n) => n.type_check(ctx, diag),
            Ast::Return(n) => n.type_check(ctx, diag),
            Ast::VarDecl(n) => n.type_check(ctx, diag),
            Ast::If(n) => n.type_check(ctx, diag),
            Ast::Binary(n) => n.type_check(ctx, diag),
            Ast::Unary(n) => n.type_check(ctx, diag),
            Ast::Integer(n) => n.type_check(ctx, diag),
            Ast::Str(n) => n.type_check(ctx, diag),
            Ast::Bool(n) => n.type_check(ctx, diag),
            Ast::Variable(n) => n.type_check(ctx, diag),
            Ast::Call(n) => n.type_check(ctx, diag),
            Ast::Member(n) => n.type_check(ctx, diag),
            Ast::Cast(n) => n.type_check(ctx, diag),
        }
    }

    pub fn semantic_check(&mut self, ctx: &Context, diag: &mut Diagnostics, statement: bool) {
        match self {
            Ast::Function(n) => n.semantic_check(ctx, diag),
            Ast::Class(n) => n.semantic_check(ctx, diag),
            Ast::Enum(_) => {}
            Ast::Namespace(n) => n.semantic_check(ctx, diag),
            Ast::Return(n) => n.semantic_check(ctx, diag, statement),
            Ast::VarDecl(n) => n.semantic_check(ctx, diag, statement),
            Ast::If(n) => n.semantic_check(ctx, diag),
            Ast::Binary(n) => n.semantic_check(ctx, diag, statement),
            Ast::Unary(n) => n.semantic_check(ctx, diag, statement),
            Ast::Integer(_) | Ast::Str(_) | Ast::Bool(_) => {}
            Ast::Variable(_) => {}
            Ast::Call(n) => n.semantic_check(ctx, diag, statement),
            Ast::Member(n) => n.semantic_check(ctx, diag, statement),
            Ast::Cast(n) => n.semantic_check(ctx, diag, statement),
        }
    }

    /// Pre-declare every function into the module so call sites resolve
    /// independently of declaration order.
    pub fn declare(&mut self, ctx: &mut Context, builder: &mut IrBuilder) {
        match self {
            Ast::Function(n) => {
                n.declare(ctx, builder);
            }
            Ast::Class(n) => {
                for method in &mut n.methods {
                    method.declare(ctx, builder);
                }
            }
            Ast::Namespace(n) => {
                for node in &mut n.body {
                    node.declare(ctx, builder);
                }
            }
            _ => {}
        }
    }

    pub fn emit(
        &mut self,
        ctx: &mut Context,
        builder: &mut IrBuilder,
        diag: &mut Diagnostics,
    ) -> Option<ValueId> {
        match self {
            Ast::Function(n) => n.emit(ctx, builder, diag),
            Ast::Class(n) => n.emit(ctx, builder, diag),
            Ast::Enum(n) => n.emit(ctx, builder, diag),
            Ast::Namespace(n) => n.emit(ctx, builder, diag),
            Ast::Return(n) => n.emit(ctx, builder, diag),
            Ast::VarDecl(n) => n.emit(ctx, builder, diag),
            Ast::If(n) => n.emit(ctx, builder, diag),
            Ast::Binary(n) => n.emit(ctx, builder, diag),
            Ast::Unary(n) => n.emit(ctx, builder, diag),
            Ast::Integer(n) => n.emit(ctx, builder),
            Ast::Str(n) => n.emit(builder),
            Ast::Bool(n) => n.emit(builder),
            Ast::Variable(n) => n.emit(ctx, builder),
            Ast::Call(n) => n.emit(ctx, builder, diag),
            Ast::Member(n) => n.emit(ctx, builder, diag),
            Ast::Cast(n) => n.emit(ctx, builder, diag),
        }
    }

    /// Deep-copy the node into another scope, re-linking scopes and
    /// re-registering declared symbols.
    pub fn clone_into(&self, ctx: &mut Context, scope: ScopeId) -> Ast {
        match self {
            Ast::Function(n) => Ast::Function(n.clone_into(ctx, scope)),
            Ast::Class(n) => Ast::Class(n.clone_into(ctx, scope)),
            Ast::Enum(n) => Ast::Enum(n.clone_into(ctx, scope)),
            Ast::Namespace(n) => Ast::Namespace(n.clone_into(ctx, scope)),
            Ast::Return(n) => Ast::Return(n.clone_into(ctx, scope)),
            Ast::VarDecl(n) => Ast::VarDecl(n.clone_into(ctx, scope)),
            Ast::If(n) => Ast::If(n.clone_into(ctx, scope)),
            Ast::Binary(n) => Ast::Binary(n.clone_into(ctx, scope)),
            Ast::Unary(n) => Ast::Unary(n.clone_into(ctx, scope)),
            Ast::Integer(n) => Ast::Integer(n.clone_at(scope)),
            Ast::Str(n) => Ast::Str(n.clone_at(scope)),
            Ast::Bool(n) => Ast::Bool(n.clone_at(scope)),
            Ast::Variable(n) => Ast::Variable(n.clone_at(scope)),
            Ast::Call(n) => Ast::Call(n.clone_into(ctx, scope)),
            Ast::Member(n) => Ast::Member(n.clone_into(ctx, scope)),
            Ast::Cast(n) => Ast::Cast(n.clone_into(ctx, scope)),
        }
    }

    /// The directly contained child nodes.
    pub fn contained_mut(&mut self) -> Vec<&mut Ast> {
        match self {
            Ast::Function(n) => n.body.iter_mut().flatten().collect(),
            Ast::Class(n) => n.methods.iter_mut().collect(),
            Ast::Enum(_) => Vec::new(),
            Ast::Namespace(n) => n.body.iter_mut().collect(),
            Ast::Return(n) => n.value.iter_mut().map(|v| v.as_mut()).collect(),
            Ast::VarDecl(n) => n.init.iter_mut().map(|v| v.as_mut()).collect(),
            Ast::If(n) => {
                let mut out: Vec<&mut Ast> = vec![n.condition.as_mut()];
                out.extend(n.then_body.iter_mut());
                out.extend(n.else_body.iter_mut().flatten());
                out
            }
            Ast::Binary(n) => vec![n.lhs.as_mut(), n.rhs.as_mut()],
            Ast::Unary(n) => vec![n.operand.as_mut()],
            Ast::Integer(_) | Ast::Str(_) | Ast::Bool(_) | Ast::Variable(_) => Vec::new(),
            Ast::Call(n) => {
                let mut out: Vec<&mut Ast> = vec![n.callee.as_mut()];
                out.extend(n.parameters.iter_mut());
                out
            }
            Ast::Member(n) => vec![n.object.as_mut()],
            Ast::Cast(n) => vec![n.value.as_mut()],
        }
    }

    /// Substitute a template parameter type with an actual type, in this
    /// node and every contained node.
    pub fn set_template_type(&mut self, ctx: &mut Context, formal: TypeId, actual: TypeId) {
        match self {
            Ast::Function(n) => n.set_template_type(ctx, formal, actual),
            Ast::VarDecl(n) => n.set_template_type(ctx, formal, actual),
            Ast::Cast(n) => n.set_template_type(ctx, formal, actual),
            Ast::Variable(n) => n.set_template_type(ctx, formal, actual),
            _ => {}
        }
        for child in self.contained_mut() {
            child.set_template_type(ctx, formal, actual);
        }
    }

    /// Whether this node can adapt itself to `dest` without a conversion,
    /// the way an untyped integer literal takes on its context's type.
    pub fn trivially_implicit_cast(&mut self, ctx: &Context, dest: TypeId) -> bool {
        match self {
            Ast::Integer(n) => n.trivially_implicit_cast(ctx, dest),
            _ => false,
        }
    }

    /// Whether the node's value converts implicitly to `dest`, reporting a
    /// warning for lossy conversions. The caller wraps the node in a cast.
    pub fn implicit_cast(&mut self, ctx: &Context, diag: &mut Diagnostics, dest: TypeId) -> bool {
        if self.trivially_implicit_cast(ctx, dest) {
            return true;
        }
        let Some(ty) = self.ty() else {
            return false;
        };
        match ctx.types.cast_to(ty, dest) {
            CastLevel::Implicit => true,
            CastLevel::ImplicitWarning => {
                diag.compiler_warning(
                    "implicit",
                    crate::diagnostics::Span::of(self.error_token()),
                    format!(
                        "implicit conversion from '{}' to '{}' may change the value",
                        ctx.types.display_name(&ctx.interner, ty),
                        ctx.types.display_name(&ctx.interner, dest)
                    ),
                );
                true
            }
            _ => false,
        }
    }
}

/// Wrap `inner` in a synthesized cast to `target`.
pub fn cast_node(inner: Ast, target: TypeId) -> Ast {
    Ast::Cast(CastExpression::synthesized(inner, target))
}

/// Replace the node behind `slot` with a synthesized cast of itself.
pub fn insert_implicit_cast(slot: &mut Box<Ast>, target: TypeId) {
    let placeholder = Ast::Bool(BooleanLiteral::placeholder());
    let inner = std::mem::replace(slot.as_mut(), placeholder);
    **slot = cast_node(inner, target);
}

/// Same as [`insert_implicit_cast`] for nodes stored by value.
pub fn insert_implicit_cast_value(slot: &mut Ast, target: TypeId) {
    let placeholder = Ast::Bool(BooleanLiteral::placeholder());
    let inner = std::mem::replace(slot, placeholder);
    *slot = cast_node(inner, target);
}

/// Convert the node to `dest` if an implicit conversion exists, splicing a
/// cast in unless the node adapted itself trivially. Returns whether the
/// conversion was possible.
pub fn coerce(
    slot: &mut Box<Ast>,
    ctx: &Context,
    diag: &mut Diagnostics,
    dest: TypeId,
) -> bool {
    if !slot.implicit_cast(ctx, diag, dest) {
        return false;
    }
    if slot.ty() != Some(dest) {
        insert_implicit_cast(slot, dest);
    }
    true
}

/// Same as [`coerce`] for nodes stored by value.
pub fn coerce_value(slot: &mut Ast, ctx: &Context, diag: &mut Diagnostics, dest: TypeId) -> bool {
    if !slot.implicit_cast(ctx, diag, dest) {
        return false;
    }
    if slot.ty() != Some(dest) {
        insert_implicit_cast_value(slot, dest);
    }
    true
}
