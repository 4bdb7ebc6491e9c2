//! Global declaration nodes

use super::Ast;
use crate::context::{Context, Name, ScopeId, SymbolId};
use crate::diagnostics::Diagnostics;
use crate::ir::{FuncId, IrBuilder, ValueId};
use crate::lexer::Token;
use crate::mangle;
use crate::types::TypeId;

#[derive(Debug)]
pub struct FunctionArgument {
    pub name: Name,
    pub ty: TypeId,
    pub symbol: SymbolId,
}

#[derive(Debug)]
pub struct Function {
    /// The scope the function is declared in.
    pub scope: ScopeId,
    /// The body scope holding the arguments.
    pub own_scope: ScopeId,
    pub name: Name,
    pub pure: bool,
    pub exported: bool,
    pub ty: TypeId,
    pub arguments: Vec<FunctionArgument>,
    /// `None` for a bodyless declaration (`func f(...) -> T;`).
    pub body: Option<Vec<Ast>>,
    pub symbol: SymbolId,
    /// The IR function, once declared into the module.
    pub ir_function: Option<FuncId>,
    pub error_token: Token,
}

impl Function {
    pub fn type_check(&mut self, ctx: &mut Context, diag: &mut Diagnostics) {
        for node in self.body.iter_mut().flatten() {
            node.type_check(ctx, diag);
        }
    }

    pub fn semantic_check(&mut self, ctx: &Context, diag: &mut Diagnostics) {
        for node in self.body.iter_mut().flatten() {
            node.semantic_check(ctx, diag, true);
        }
    }

    /// Create the IR function and bind it to the symbol, without emitting
    /// the body. Runs ahead of body emission so call sites resolve
    /// regardless of declaration order.
    pub fn declare(&mut self, ctx: &mut Context, builder: &mut IrBuilder) -> Option<FuncId> {
        if let Some(func) = self.ir_function {
            return Some(func);
        }

        let mut names = ctx.namespaces(self.scope);
        names.push(self.name);
        let mangled = mangle::function(&ctx.interner, &ctx.types, &names, self.ty);

        let (ret, params) = ctx.types.function_parts(self.ty)?;
        let ret_ir = ctx.types.ir_type(ret);
        let params_ir = params.iter().map(|&p| ctx.types.ir_type(p)).collect();

        let func = builder.create_function(mangled, ret_ir, params_ir, self.pure);
        let func_value = builder.module.function(func).value;
        ctx.symbol_mut(self.symbol).values.push((None, func_value));
        self.ir_function = Some(func);
        Some(func)
    }

    pub fn emit(
        &mut self,
        ctx: &mut Context,
        builder: &mut IrBuilder,
        diag: &mut Diagnostics,
    ) -> Option<ValueId> {
        let func = self.declare(ctx, builder)?;
        let func_value = builder.module.function(func).value;

        let Some(body) = self.body.as_mut() else {
            return Some(func_value);
        };

        let entry = builder.create_block(func);
        builder.set_insert_point(entry);

        // Arguments live in stack slots so assignments see storage.
        for (index, argument) in self.arguments.iter().enumerate() {
            let incoming = builder.module.argument(func, index);
            let slot = builder.create_alloca(ctx.types.ir_type(argument.ty));
            builder.create_store(slot, incoming);
            ctx.symbol_mut(argument.symbol).values.push((None, slot));
        }

        for node in body {
            node.emit(ctx, builder, diag);
        }

        if !builder.block_terminated() {
            builder.create_ret(None);
        }
        Some(func_value)
    }

    pub fn set_template_type(&mut self, ctx: &mut Context, formal: TypeId, actual: TypeId) {
        let mut argument_types = Vec::with_capacity(self.arguments.len());
        for argument in &mut self.arguments {
            argument.ty = ctx.types.substitute(argument.ty, formal, actual);
            ctx.symbol_mut(argument.symbol).ty = argument.ty;
            argument_types.push(argument.ty);
        }

        let ret = ctx
            .types
            .function_parts(self.ty)
            .map(|(ret, _)| ret)
            .unwrap_or(self.ty);
        let ret = ctx.types.substitute(ret, formal, actual);

        self.ty = ctx.types.function_of(ret, argument_types);
        ctx.symbol_mut(self.symbol).ty = self.ty;
        ctx.scopes.get_mut(self.own_scope).current_return_type = Some(ret);
    }

    pub fn clone_into(&self, ctx: &mut Context, scope: ScopeId) -> Self {
        let (ret, is_pure, owner) = {
            let original = ctx.scopes.get(self.own_scope);
            (original.current_return_type, original.is_pure, original.owner)
        };
        let own_scope = ctx.new_scope(Some(scope), None, false, ret);
        ctx.scopes.get_mut(own_scope).is_pure = is_pure;
        ctx.scopes.get_mut(own_scope).owner = owner;

        let symbol = ctx.declare_symbol(scope, self.name, self.ty);
        ctx.symbol_mut(symbol).pure = self.pure;

        let arguments = self
            .arguments
            .iter()
            .map(|argument| {
                let arg_symbol = ctx.declare_symbol(own_scope, argument.name, argument.ty);
                FunctionArgument {
                    name: argument.name,
                    ty: argument.ty,
                    symbol: arg_symbol,
                }
            })
            .collect();

        let body = self.body.as_ref().map(|body| {
            body.iter()
                .map(|node| node.clone_into(ctx, own_scope))
                .collect()
        });

        Self {
            scope,
            own_scope,
            name: self.name,
            pure: self.pure,
            exported: false,
            ty: self.ty,
            arguments,
            body,
            symbol,
            ir_function: None,
            error_token: self.error_token.clone(),
        }
    }
}

#[derive(Debug)]
pub struct ClassField {
    pub private: bool,
    pub name: Name,
    pub ty: TypeId,
}

#[derive(Debug)]
pub struct ClassDeclaration {
    pub scope: ScopeId,
    /// The class scope: a named global scope holding the method symbols,
    /// with the class type as owner.
    pub own_scope: ScopeId,
    pub name: Name,
    pub exported: bool,
    pub ty: TypeId,
    pub fields: Vec<ClassField>,
    /// Method bodies, as `Ast::Function` nodes scoped inside the class.
    pub methods: Vec<Ast>,
    pub symbol: SymbolId,
    pub error_token: Token,
}

impl ClassDeclaration {
    pub fn type_check(&mut self, ctx: &mut Context, diag: &mut Diagnostics) {
        for method in &mut self.methods {
            method.type_check(ctx, diag);
        }
    }

    pub fn semantic_check(&mut self, ctx: &Context, diag: &mut Diagnostics) {
        for method in &mut self.methods {
            method.semantic_check(ctx, diag, true);
        }
    }

    pub fn emit(
        &mut self,
        ctx: &mut Context,
        builder: &mut IrBuilder,
        diag: &mut Diagnostics,
    ) -> Option<ValueId> {
        for method in &mut self.methods {
            method.emit(ctx, builder, diag);
        }
        None
    }

    pub fn clone_into(&self, ctx: &mut Context, scope: ScopeId) -> Self {
        let own_scope = ctx.new_scope(Some(scope), Some(self.name), true, None);
        ctx.scopes.get_mut(own_scope).owner = Some(self.ty);

        let symbol = ctx.declare_symbol(scope, self.name, self.ty);
        let methods = self
            .methods
            .iter()
            .map(|method| method.clone_into(ctx, own_scope))
            .collect();
        let fields = self
            .fields
            .iter()
            .map(|field| ClassField {
                private: field.private,
                name: field.name,
                ty: field.ty,
            })
            .collect();

        Self {
            scope,
            own_scope,
            name: self.name,
            exported: false,
            ty: self.ty,
            fields,
            methods,
            symbol,
            error_token: self.error_token.clone(),
        }
    }
}

#[derive(Debug)]
pub struct EnumVariant {
    pub name: Name,
    pub value: i64,
    pub symbol: SymbolId,
}

#[derive(Debug)]
pub struct EnumDeclaration {
    pub scope: ScopeId,
    /// A named global scope holding the member symbols, so `E::A` resolves
    /// through the usual qualified lookup.
    pub own_scope: ScopeId,
    pub name: Name,
    pub exported: bool,
    pub ty: TypeId,
    pub base: TypeId,
    pub variants: Vec<EnumVariant>,
    pub symbol: SymbolId,
    pub error_token: Token,
}

impl EnumDeclaration {
    pub fn type_check(&mut self, _ctx: &mut Context, _diag: &mut Diagnostics) {}

    pub fn emit(
        &mut self,
        ctx: &mut Context,
        builder: &mut IrBuilder,
        _diag: &mut Diagnostics,
    ) -> Option<ValueId> {
        for variant in &self.variants {
            let constant = builder.const_int(ctx.types.ir_type(self.ty), variant.value);
            ctx.symbol_mut(variant.symbol).values.push((None, constant));
        }
        None
    }

    pub fn clone_into(&self, ctx: &mut Context, scope: ScopeId) -> Self {
        let own_scope = ctx.new_scope(Some(scope), Some(self.name), true, None);
        let symbol = ctx.declare_symbol(scope, self.name, self.ty);
        let variants = self
            .variants
            .iter()
            .map(|variant| {
                let var_symbol = ctx.declare_symbol(own_scope, variant.name, self.ty);
                EnumVariant {
                    name: variant.name,
                    value: variant.value,
                    symbol: var_symbol,
                }
            })
            .collect();

        Self {
            scope,
            own_scope,
            name: self.name,
            exported: false,
            ty: self.ty,
            base: self.base,
            variants,
            symbol,
            error_token: self.error_token.clone(),
        }
    }
}

#[derive(Debug)]
pub struct Namespace {
    pub scope: ScopeId,
    pub own_scope: ScopeId,
    pub name: Name,
    pub body: Vec<Ast>,
    pub error_token: Token,
}

impl Namespace {
    pub fn type_check(&mut self, ctx: &mut Context, diag: &mut Diagnostics) {
        for node in &mut self.body {
            node.type_check(ctx, diag);
        }
    }

    pub fn semantic_check(&mut self, ctx: &Context, diag: &mut Diagnostics) {
        for node in &mut self.body {
            node.semantic_check(ctx, diag, true);
        }
    }

    pub fn emit(
        &mut self,
        ctx: &mut Context,
        builder: &mut IrBuilder,
        diag: &mut Diagnostics,
    ) -> Option<ValueId> {
        for node in &mut self.body {
            node.emit(ctx, builder, diag);
        }
        None
    }

    pub fn clone_into(&self, ctx: &mut Context, scope: ScopeId) -> Self {
        let own_scope = ctx.new_scope(Some(scope), Some(self.name), true, None);
        let body = self
            .body
            .iter()
            .map(|node| node.clone_into(ctx, own_scope))
            .collect();
        Self {
            scope,
            own_scope,
            name: self.name,
            body,
            error_token: self.error_token.clone(),
        }
    }
}
