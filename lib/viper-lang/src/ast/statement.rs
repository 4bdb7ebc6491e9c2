//! Statement nodes

use super::{coerce, Ast};
use crate::context::{Context, Name, ScopeId, SymbolId};
use crate::diagnostics::{Diagnostics, ErrorKind, Span};
use crate::ir::{IrBuilder, ValueId};
use crate::lexer::Token;
use crate::types::TypeId;

fn display(ctx: &Context, ty: TypeId) -> String {
    ctx.types.display_name(&ctx.interner, ty)
}

#[derive(Debug)]
pub struct ReturnStatement {
    pub scope: ScopeId,
    pub value: Option<Box<Ast>>,
    pub ty: Option<TypeId>,
    pub error_token: Token,
}

impl ReturnStatement {
    pub fn new(scope: ScopeId, value: Option<Ast>, error_token: Token) -> Self {
        Self {
            scope,
            value: value.map(Box::new),
            ty: None,
            error_token,
        }
    }

    pub fn type_check(&mut self, ctx: &mut Context, diag: &mut Diagnostics) {
        let return_type = ctx
            .current_return_type(self.scope)
            .unwrap_or(ctx.types.void);
        self.ty = Some(return_type);

        let Some(value) = self.value.as_mut() else {
            if !ctx.types.is_void(return_type) {
                diag.report_compiler_error(
                    ErrorKind::IncompatibleTypes {
                        value: "void".to_string(),
                        variable: display(ctx, return_type),
                    },
                    Span::of(&self.error_token),
                );
            }
            return;
        };

        value.type_check(ctx, diag);
        let Some(value_ty) = value.ty() else {
            return;
        };
        if ctx.types.is_error(value_ty) {
            return;
        }
        if value_ty != return_type && !coerce(value, ctx, diag, return_type) {
            diag.report_compiler_error(
                ErrorKind::IncompatibleTypes {
                    value: display(ctx, value_ty),
                    variable: display(ctx, return_type),
                },
                Span::of(value.error_token()),
            );
        }
    }

    pub fn semantic_check(&mut self, ctx: &Context, diag: &mut Diagnostics, statement: bool) {
        if let Some(value) = self.value.as_mut() {
            value.semantic_check(ctx, diag, false);
        }
        if !statement {
            diag.report_compiler_error(ErrorKind::ReturnAsExpression, Span::of(&self.error_token));
        }
    }

    pub fn emit(
        &mut self,
        ctx: &mut Context,
        builder: &mut IrBuilder,
        diag: &mut Diagnostics,
    ) -> Option<ValueId> {
        let value = match self.value.as_mut() {
            Some(value) => Some(value.emit(ctx, builder, diag)?),
            None => None,
        };
        Some(builder.create_ret(value))
    }

    pub fn clone_into(&self, ctx: &mut Context, scope: ScopeId) -> Self {
        Self {
            scope,
            value: self
                .value
                .as_ref()
                .map(|v| Box::new(Ast::clone_into(v, ctx, scope))),
            ty: None,
            error_token: self.error_token.clone(),
        }
    }
}

#[derive(Debug)]
pub struct VariableDeclaration {
    pub scope: ScopeId,
    pub name: Name,
    pub ty: Option<TypeId>,
    pub init: Option<Box<Ast>>,
    pub symbol: SymbolId,
    pub error_token: Token,
}

impl VariableDeclaration {
    pub fn new(
        ctx: &mut Context,
        scope: ScopeId,
        name: Name,
        ty: Option<TypeId>,
        init: Option<Ast>,
        error_token: Token,
    ) -> Self {
        let symbol = ctx.declare_symbol(scope, name, ty.unwrap_or(ctx.types.error));
        Self {
            scope,
            name,
            ty,
            init: init.map(Box::new),
            symbol,
            error_token,
        }
    }

    pub fn type_check(&mut self, ctx: &mut Context, diag: &mut Diagnostics) {
        let mut init_checked = false;

        if self.ty.is_none() {
            let Some(init) = self.init.as_mut() else {
                diag.report_compiler_error(
                    ErrorKind::UnknownObjectType {
                        name: self.error_token.text.clone(),
                    },
                    Span::of(&self.error_token),
                );
                self.ty = Some(ctx.types.error);
                return;
            };
            init.type_check(ctx, diag);
            init_checked = true;
            self.ty = init.ty();
            if let Some(ty) = self.ty {
                // The placeholder type from the declaration site is patched
                // now that inference has run.
                ctx.symbol_mut(self.symbol).ty = ty;
            }
        }

        let ty = self.ty.unwrap_or(ctx.types.error);
        if ctx.types.is_error(ty) {
            return;
        }
        if !ctx.types.is_object(ty) {
            diag.report_compiler_error(
                ErrorKind::NotAnObjectType {
                    ty: display(ctx, ty),
                },
                Span::of(&self.error_token),
            );
            self.ty = Some(ctx.types.error);
            return;
        }

        if let Some(init) = self.init.as_mut() {
            if !init_checked {
                init.type_check(ctx, diag);
            }
            let Some(init_ty) = init.ty() else {
                return;
            };
            if ctx.types.is_error(init_ty) {
                return;
            }
            if init_ty != ty && !coerce(init, ctx, diag, ty) {
                diag.report_compiler_error(
                    ErrorKind::IncompatibleTypes {
                        value: display(ctx, init_ty),
                        variable: display(ctx, ty),
                    },
                    Span::of(init.error_token()),
                );
            }
        }
    }

    pub fn semantic_check(&mut self, ctx: &Context, diag: &mut Diagnostics, _statement: bool) {
        if let Some(init) = self.init.as_mut() {
            init.semantic_check(ctx, diag, false);
        }
    }

    pub fn emit(
        &mut self,
        ctx: &mut Context,
        builder: &mut IrBuilder,
        diag: &mut Diagnostics,
    ) -> Option<ValueId> {
        let ty = self.ty?;
        let slot = builder.create_alloca(ctx.types.ir_type(ty));
        ctx.symbol_mut(self.symbol).values.push((None, slot));

        if let Some(init) = self.init.as_mut() {
            let value = init.emit(ctx, builder, diag)?;
            builder.create_store(slot, value);
        }
        None
    }

    pub fn set_template_type(&mut self, ctx: &mut Context, formal: TypeId, actual: TypeId) {
        if let Some(ty) = self.ty {
            let substituted = ctx.types.substitute(ty, formal, actual);
            self.ty = Some(substituted);
            ctx.symbol_mut(self.symbol).ty = substituted;
        }
    }

    pub fn clone_into(&self, ctx: &mut Context, scope: ScopeId) -> Self {
        let init = self
            .init
            .as_ref()
            .map(|i| Box::new(Ast::clone_into(i, ctx, scope)));
        let symbol = ctx.declare_symbol(scope, self.name, self.ty.unwrap_or(ctx.types.error));
        Self {
            scope,
            name: self.name,
            ty: self.ty,
            init,
            symbol,
            error_token: self.error_token.clone(),
        }
    }
}

#[derive(Debug)]
pub struct IfStatement {
    pub scope: ScopeId,
    pub condition: Box<Ast>,
    pub then_scope: ScopeId,
    pub then_body: Vec<Ast>,
    pub else_scope: Option<ScopeId>,
    pub else_body: Option<Vec<Ast>>,
    pub error_token: Token,
}

impl IfStatement {
    pub fn type_check(&mut self, ctx: &mut Context, diag: &mut Diagnostics) {
        self.condition.type_check(ctx, diag);
        if let Some(cond_ty) = self.condition.ty() {
            if !ctx.types.is_error(cond_ty) && cond_ty != ctx.types.bool_ {
                let bool_ = ctx.types.bool_;
                if !coerce(&mut self.condition, ctx, diag, bool_) {
                    diag.report_compiler_error(
                        ErrorKind::IncompatibleTypes {
                            value: display(ctx, cond_ty),
                            variable: display(ctx, bool_),
                        },
                        Span::of(self.condition.error_token()),
                    );
                }
            }
        }

        for node in &mut self.then_body {
            node.type_check(ctx, diag);
        }
        for node in self.else_body.iter_mut().flatten() {
            node.type_check(ctx, diag);
        }
    }

    pub fn semantic_check(&mut self, ctx: &Context, diag: &mut Diagnostics) {
        self.condition.semantic_check(ctx, diag, false);
        for node in &mut self.then_body {
            node.semantic_check(ctx, diag, true);
        }
        for node in self.else_body.iter_mut().flatten() {
            node.semantic_check(ctx, diag, true);
        }
    }

    pub fn emit(
        &mut self,
        ctx: &mut Context,
        builder: &mut IrBuilder,
        diag: &mut Diagnostics,
    ) -> Option<ValueId> {
        let condition = self.condition.emit(ctx, builder, diag)?;
        let current = builder.insert_point()?;
        let function = builder.module.blocks.get(current).function;

        let then_block = builder.create_block(function);
        let merge_block = builder.create_block(function);
        let else_block = if self.else_body.is_some() {
            builder.create_block(function)
        } else {
            merge_block
        };

        builder.create_cond_br(condition, then_block, else_block);

        builder.set_insert_point(then_block);
        for node in &mut self.then_body {
            node.emit(ctx, builder, diag);
        }
        if !builder.block_terminated() {
            builder.create_br(merge_block);
        }

        if let Some(else_body) = self.else_body.as_mut() {
            builder.set_insert_point(else_block);
            for node in else_body {
                node.emit(ctx, builder, diag);
            }
            if !builder.block_terminated() {
                builder.create_br(merge_block);
            }
        }

        builder.set_insert_point(merge_block);
        None
    }

    pub fn clone_into(&self, ctx: &mut Context, scope: ScopeId) -> Self {
        let condition = Box::new(self.condition.clone_into(ctx, scope));
        let then_scope = ctx.new_scope(Some(scope), None, false, None);
        let then_body = self
            .then_body
            .iter()
            .map(|n| n.clone_into(ctx, then_scope))
            .collect();
        let (else_scope, else_body) = match self.else_body.as_ref() {
            Some(body) => {
                let else_scope = ctx.new_scope(Some(scope), None, false, None);
                let body = body.iter().map(|n| n.clone_into(ctx, else_scope)).collect();
                (Some(else_scope), Some(body))
            }
            None => (None, None),
        };
        Self {
            scope,
            condition,
            then_scope,
            then_body,
            else_scope,
            else_body,
            error_token: self.error_token.clone(),
        }
    }
}
