//! Expression nodes

use super::{coerce, coerce_value, Ast};
use crate::context::{Context, Name, ScopeId, SymbolId};
use crate::diagnostics::{Diagnostics, ErrorKind, Span};
use crate::ir::{CmpPred, IrBuilder, IrType, ValueId};
use crate::lexer::Token;
use crate::scope::TemplateInstantiation;
use crate::types::{CastLevel, TypeId, TypeKind};

fn display(ctx: &Context, ty: TypeId) -> String {
    ctx.types.display_name(&ctx.interner, ty)
}

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct IntegerLiteral {
    pub scope: ScopeId,
    pub value: i64,
    pub ty: Option<TypeId>,
    pub error_token: Token,
}

impl IntegerLiteral {
    pub fn new(scope: ScopeId, value: i64, error_token: Token) -> Self {
        Self {
            scope,
            value,
            ty: None,
            error_token,
        }
    }

    pub fn type_check(&mut self, ctx: &mut Context, _diag: &mut Diagnostics) {
        if self.ty.is_none() {
            self.ty = Some(ctx.types.i32_);
        }
    }

    /// An untyped integer literal adapts to any integer destination.
    pub fn trivially_implicit_cast(&mut self, ctx: &Context, dest: TypeId) -> bool {
        if ctx.types.is_integer(dest) {
            self.ty = Some(dest);
            return true;
        }
        false
    }

    pub fn emit(&mut self, ctx: &mut Context, builder: &mut IrBuilder) -> Option<ValueId> {
        let ty = self.ty.unwrap_or(ctx.types.i32_);
        Some(builder.const_int(ctx.types.ir_type(ty), self.value))
    }

    pub fn clone_at(&self, scope: ScopeId) -> Self {
        Self {
            scope,
            value: self.value,
            ty: None,
            error_token: self.error_token.clone(),
        }
    }
}

#[derive(Debug)]
pub struct StringLiteral {
    pub scope: ScopeId,
    pub value: String,
    pub ty: Option<TypeId>,
    pub error_token: Token,
}

impl StringLiteral {
    pub fn new(scope: ScopeId, value: String, error_token: Token) -> Self {
        Self {
            scope,
            value,
            ty: None,
            error_token,
        }
    }

    pub fn type_check(&mut self, ctx: &mut Context, _diag: &mut Diagnostics) {
        self.ty = Some(ctx.types.string);
    }

    pub fn emit(&mut self, builder: &mut IrBuilder) -> Option<ValueId> {
        Some(builder.const_string(self.value.clone()))
    }

    pub fn clone_at(&self, scope: ScopeId) -> Self {
        Self {
            scope,
            value: self.value.clone(),
            ty: None,
            error_token: self.error_token.clone(),
        }
    }
}

#[derive(Debug)]
pub struct BooleanLiteral {
    pub scope: ScopeId,
    pub value: bool,
    pub ty: Option<TypeId>,
    pub error_token: Token,
}

impl BooleanLiteral {
    pub fn new(scope: ScopeId, value: bool, error_token: Token) -> Self {
        Self {
            scope,
            value,
            ty: None,
            error_token,
        }
    }

    /// Stand-in node used while splicing casts into the tree.
    pub fn placeholder() -> Self {
        Self {
            scope: ScopeId::new(0),
            value: false,
            ty: None,
            error_token: Token::synthetic(crate::lexer::TokenKind::FalseKeyword),
        }
    }

    pub fn type_check(&mut self, ctx: &mut Context, _diag: &mut Diagnostics) {
        self.ty = Some(ctx.types.bool_);
    }

    pub fn emit(&mut self, builder: &mut IrBuilder) -> Option<ValueId> {
        Some(builder.const_int(IrType::Bool, self.value as i64))
    }

    pub fn clone_at(&self, scope: ScopeId) -> Self {
        Self {
            scope,
            value: self.value,
            ty: None,
            error_token: self.error_token.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Variable references
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct VariableExpression {
    pub scope: ScopeId,
    /// Possibly namespace-qualified components.
    pub names: Vec<Name>,
    /// Actual types of a `name<T1, T2>` reference.
    pub template_arguments: Vec<TypeId>,
    pub is_implicit_member: bool,
    pub field_index: Option<usize>,
    pub symbol: Option<SymbolId>,
    pub ty: Option<TypeId>,
    pub error_token: Token,
}

impl VariableExpression {
    pub fn new(scope: ScopeId, names: Vec<Name>, error_token: Token) -> Self {
        Self {
            scope,
            names,
            template_arguments: Vec::new(),
            is_implicit_member: false,
            field_index: None,
            symbol: None,
            ty: None,
            error_token,
        }
    }

    pub fn name(&self) -> Name {
        *self.names.last().expect("variable expression has a name")
    }

    pub fn is_qualified(&self) -> bool {
        self.names.len() > 1
    }

    pub fn reconstruct_names(&self, ctx: &Context) -> String {
        self.names
            .iter()
            .map(|&n| ctx.interner.resolve(n))
            .collect::<Vec<_>>()
            .join("::")
    }

    pub fn type_check(&mut self, ctx: &mut Context, diag: &mut Diagnostics) {
        // An unqualified name inside a method may be an implicit-member
        // reference through `this`.
        if !self.is_qualified() && self.template_arguments.is_empty() {
            if let Some(owner) = ctx.find_owner(self.scope) {
                if let Some(st) = ctx.types.as_struct(owner) {
                    if let Some((index, field)) = st.field(self.name()) {
                        self.ty = Some(field.ty);
                        self.field_index = Some(index);
                        self.is_implicit_member = true;
                        return;
                    }
                    if let Some(method) = st.method(self.name()) {
                        self.ty = Some(method.ty);
                        self.is_implicit_member = true;
                        return;
                    }
                }
            }
        }

        let symbol = if self.is_qualified() {
            ctx.resolve_symbol_qualified(self.scope, &self.names)
        } else {
            ctx.resolve_symbol(self.scope, self.name())
        };

        match symbol {
            Some(symbol) => {
                self.symbol = Some(symbol);
                self.ty = Some(ctx.symbol(symbol).ty);
            }
            None => {
                diag.report_compiler_error(
                    ErrorKind::UndeclaredIdentifier {
                        name: self.reconstruct_names(ctx),
                    },
                    Span::of(&self.error_token),
                );
                self.ty = Some(ctx.types.error);
            }
        }
    }

    pub fn emit(&mut self, ctx: &mut Context, builder: &mut IrBuilder) -> Option<ValueId> {
        if self.is_implicit_member {
            let this = ctx.interner.intern("this");
            let this_sym = ctx.resolve_symbol(self.scope, this)?;
            let this_slot = ctx.latest_value(this_sym, None, &builder.module)?;
            let this_ptr = builder.create_load(this_slot);
            let gep = builder.create_struct_gep(this_ptr, self.field_index?);
            return Some(builder.create_load(gep));
        }

        let symbol = self.symbol?;
        if ctx.types.is_function(ctx.symbol(symbol).ty) {
            return ctx.latest_value(symbol, None, &builder.module);
        }

        let latest = ctx
            .latest_value(symbol, builder.insert_point(), &builder.module)
            .or_else(|| ctx.latest_value(symbol, None, &builder.module))?;
        if builder.module.is_alloca(latest) {
            Some(builder.create_load(latest))
        } else {
            Some(latest)
        }
    }

    pub fn set_template_type(&mut self, ctx: &mut Context, formal: TypeId, actual: TypeId) {
        for arg in &mut self.template_arguments {
            *arg = ctx.types.substitute(*arg, formal, actual);
        }
    }

    pub fn clone_at(&self, scope: ScopeId) -> Self {
        Self {
            scope,
            names: self.names.clone(),
            template_arguments: self.template_arguments.clone(),
            is_implicit_member: false,
            field_index: None,
            symbol: None,
            ty: None,
            error_token: self.error_token.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Binary and unary expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,
    Assign,
}

impl BinaryOperator {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::GreaterThan
                | BinaryOperator::LessEqual
                | BinaryOperator::GreaterEqual
        )
    }
}

#[derive(Debug)]
pub struct BinaryExpression {
    pub scope: ScopeId,
    pub op: BinaryOperator,
    pub lhs: Box<Ast>,
    pub rhs: Box<Ast>,
    pub ty: Option<TypeId>,
    pub error_token: Token,
}

impl BinaryExpression {
    pub fn new(scope: ScopeId, op: BinaryOperator, lhs: Ast, rhs: Ast, error_token: Token) -> Self {
        Self {
            scope,
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty: None,
            error_token,
        }
    }

    pub fn type_check(&mut self, ctx: &mut Context, diag: &mut Diagnostics) {
        self.lhs.type_check(ctx, diag);
        self.rhs.type_check(ctx, diag);

        let (Some(lt), Some(rt)) = (self.lhs.ty(), self.rhs.ty()) else {
            self.ty = Some(ctx.types.error);
            return;
        };
        if ctx.types.is_error(lt) || ctx.types.is_error(rt) {
            self.ty = Some(ctx.types.error);
            return;
        }

        if self.op == BinaryOperator::Assign {
            let assignable = match self.lhs.as_ref() {
                Ast::Variable(_) | Ast::Member(_) => true,
                Ast::Unary(unary) => unary.op == UnaryOperator::Dereference,
                _ => false,
            };
            if !assignable {
                diag.report_compiler_error(ErrorKind::NotAssignable, Span::of(&self.error_token));
                self.ty = Some(ctx.types.error);
                return;
            }
            if rt != lt && !coerce(&mut self.rhs, ctx, diag, lt) {
                diag.report_compiler_error(
                    ErrorKind::IncompatibleTypes {
                        value: display(ctx, rt),
                        variable: display(ctx, lt),
                    },
                    Span::of(self.rhs.error_token()),
                );
                self.ty = Some(ctx.types.error);
                return;
            }
            self.ty = Some(lt);
            return;
        }

        // Unify the operand types for arithmetic and comparisons.
        if lt != rt
            && !coerce(&mut self.rhs, ctx, diag, lt)
            && !coerce(&mut self.lhs, ctx, diag, rt)
        {
            diag.report_compiler_error(
                ErrorKind::InvalidOperands {
                    lhs: display(ctx, lt),
                    rhs: display(ctx, rt),
                },
                Span::of(&self.error_token),
            );
            self.ty = Some(ctx.types.error);
            return;
        }

        let operand = self.lhs.ty().expect("operand checked above");
        if self.op.is_comparison() {
            self.ty = Some(ctx.types.bool_);
            return;
        }

        if !ctx.types.is_integer(operand) {
            diag.report_compiler_error(
                ErrorKind::InvalidOperands {
                    lhs: display(ctx, operand),
                    rhs: display(ctx, operand),
                },
                Span::of(&self.error_token),
            );
            self.ty = Some(ctx.types.error);
            return;
        }
        self.ty = Some(operand);
    }

    pub fn semantic_check(&mut self, ctx: &Context, diag: &mut Diagnostics, statement: bool) {
        self.lhs.semantic_check(ctx, diag, false);
        self.rhs.semantic_check(ctx, diag, false);
        if statement && self.op != BinaryOperator::Assign {
            diag.compiler_warning(
                "unused",
                Span::of(&self.error_token),
                "expression result unused".to_string(),
            );
        }
    }

    pub fn emit(
        &mut self,
        ctx: &mut Context,
        builder: &mut IrBuilder,
        diag: &mut Diagnostics,
    ) -> Option<ValueId> {
        if self.op == BinaryOperator::Assign {
            let left = self.lhs.emit(ctx, builder, diag)?;
            let right = self.rhs.emit(ctx, builder, diag)?;
            if let Some(ptr) = builder.module.pointer_operand(left) {
                builder.erase_instruction(left);
                builder.create_store(ptr, right);
            }
            return Some(right);
        }

        let left = self.lhs.emit(ctx, builder, diag)?;
        let right = self.rhs.emit(ctx, builder, diag)?;
        let value = match self.op {
            BinaryOperator::Add => builder.create_add(left, right),
            BinaryOperator::Sub => builder.create_sub(left, right),
            BinaryOperator::Mul => builder.create_mul(left, right),
            BinaryOperator::Div => builder.create_div(left, right),
            BinaryOperator::Equal => builder.create_cmp(CmpPred::Eq, left, right),
            BinaryOperator::NotEqual => builder.create_cmp(CmpPred::Ne, left, right),
            BinaryOperator::LessThan => builder.create_cmp(CmpPred::Lt, left, right),
            BinaryOperator::GreaterThan => builder.create_cmp(CmpPred::Gt, left, right),
            BinaryOperator::LessEqual => builder.create_cmp(CmpPred::Le, left, right),
            BinaryOperator::GreaterEqual => builder.create_cmp(CmpPred::Ge, left, right),
            BinaryOperator::Assign => unreachable!("assignment handled above"),
        };
        Some(value)
    }

    pub fn clone_into(&self, ctx: &mut Context, scope: ScopeId) -> Self {
        Self {
            scope,
            op: self.op,
            lhs: Box::new(self.lhs.clone_into(ctx, scope)),
            rhs: Box::new(self.rhs.clone_into(ctx, scope)),
            ty: None,
            error_token: self.error_token.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    AddressOf,
    Dereference,
    Not,
}

#[derive(Debug)]
pub struct UnaryExpression {
    pub scope: ScopeId,
    pub op: UnaryOperator,
    pub operand: Box<Ast>,
    pub ty: Option<TypeId>,
    pub error_token: Token,
}

impl UnaryExpression {
    pub fn new(scope: ScopeId, op: UnaryOperator, operand: Ast, error_token: Token) -> Self {
        Self {
            scope,
            op,
            operand: Box::new(operand),
            ty: None,
            error_token,
        }
    }

    pub fn type_check(&mut self, ctx: &mut Context, diag: &mut Diagnostics) {
        self.operand.type_check(ctx, diag);
        let Some(ot) = self.operand.ty() else {
            self.ty = Some(ctx.types.error);
            return;
        };
        if ctx.types.is_error(ot) {
            self.ty = Some(ctx.types.error);
            return;
        }

        match self.op {
            UnaryOperator::Negate => {
                if ctx.types.is_integer(ot) {
                    self.ty = Some(ot);
                } else {
                    diag.report_compiler_error(
                        ErrorKind::InvalidUnaryOperand {
                            ty: display(ctx, ot),
                        },
                        Span::of(&self.error_token),
                    );
                    self.ty = Some(ctx.types.error);
                }
            }
            UnaryOperator::AddressOf => {
                let addressable = matches!(self.operand.as_ref(), Ast::Variable(_) | Ast::Member(_));
                if addressable {
                    self.ty = Some(ctx.types.pointer_to(ot));
                } else {
                    diag.report_compiler_error(
                        ErrorKind::NotAddressable,
                        Span::of(&self.error_token),
                    );
                    self.ty = Some(ctx.types.error);
                }
            }
            UnaryOperator::Dereference => match ctx.types.pointee(ot) {
                Some(pointee) => self.ty = Some(pointee),
                None => {
                    diag.report_compiler_error(
                        ErrorKind::NotDereferenceable {
                            ty: display(ctx, ot),
                        },
                        Span::of(&self.error_token),
                    );
                    self.ty = Some(ctx.types.error);
                }
            },
            UnaryOperator::Not => {
                if ot == ctx.types.bool_ {
                    self.ty = Some(ctx.types.bool_);
                } else {
                    diag.report_compiler_error(
                        ErrorKind::InvalidUnaryOperand {
                            ty: display(ctx, ot),
                        },
                        Span::of(&self.error_token),
                    );
                    self.ty = Some(ctx.types.error);
                }
            }
        }
    }

    pub fn semantic_check(&mut self, ctx: &Context, diag: &mut Diagnostics, statement: bool) {
        self.operand.semantic_check(ctx, diag, false);
        if statement {
            diag.compiler_warning(
                "unused",
                Span::of(&self.error_token),
                "expression result unused".to_string(),
            );
        }
    }

    pub fn emit(
        &mut self,
        ctx: &mut Context,
        builder: &mut IrBuilder,
        diag: &mut Diagnostics,
    ) -> Option<ValueId> {
        match self.op {
            UnaryOperator::Negate => {
                let value = self.operand.emit(ctx, builder, diag)?;
                let ty = builder.module.value(value).ty.clone();
                let zero = builder.const_int(ty, 0);
                Some(builder.create_sub(zero, value))
            }
            UnaryOperator::AddressOf => {
                let value = self.operand.emit(ctx, builder, diag)?;
                match builder.module.pointer_operand(value) {
                    Some(ptr) => {
                        builder.erase_instruction(value);
                        Some(ptr)
                    }
                    None => Some(builder.create_addr_of(value)),
                }
            }
            UnaryOperator::Dereference => {
                let value = self.operand.emit(ctx, builder, diag)?;
                Some(builder.create_load(value))
            }
            UnaryOperator::Not => {
                let value = self.operand.emit(ctx, builder, diag)?;
                let zero = builder.const_int(IrType::Bool, 0);
                Some(builder.create_cmp(CmpPred::Eq, value, zero))
            }
        }
    }

    pub fn clone_into(&self, ctx: &mut Context, scope: ScopeId) -> Self {
        Self {
            scope,
            op: self.op,
            operand: Box::new(self.operand.clone_into(ctx, scope)),
            ty: None,
            error_token: self.error_token.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedCallee {
    Symbol(SymbolId),
    /// Calling through a pointer-to-function value; no overload resolution.
    Pointer,
}

struct ViableFunction {
    symbol: SymbolId,
    score: i64,
}

#[derive(Debug)]
pub struct CallExpression {
    pub scope: ScopeId,
    pub callee: Box<Ast>,
    pub parameters: Vec<Ast>,
    pub resolved: Option<ResolvedCallee>,
    pub is_member_function: bool,
    pub ty: Option<TypeId>,
    pub error_token: Token,
}

impl CallExpression {
    pub fn new(scope: ScopeId, callee: Ast, parameters: Vec<Ast>) -> Self {
        let error_token = callee.error_token().clone();
        Self {
            scope,
            callee: Box::new(callee),
            parameters,
            resolved: None,
            is_member_function: false,
            ty: None,
            error_token,
        }
    }

    pub fn type_check(&mut self, ctx: &mut Context, diag: &mut Diagnostics) {
        self.callee.type_check(ctx, diag);
        for parameter in &mut self.parameters {
            parameter.type_check(ctx, diag);
        }

        let best = self.best_viable_function(ctx, diag);
        let Some(best) = best else {
            self.ty = Some(ctx.types.error);
            return;
        };
        self.resolved = Some(best);

        let ResolvedCallee::Symbol(symbol) = best else {
            // Pointer calls were fully typed while resolving.
            return;
        };

        let function_type = ctx.symbol(symbol).ty;
        let Some((ret, formals)) = ctx.types.function_parts(function_type) else {
            self.ty = Some(ctx.types.error);
            return;
        };
        let formals: Vec<TypeId> = formals.to_vec();
        self.ty = Some(ret);

        let offset = usize::from(self.is_member_function);
        let callee_name = ctx.interner.resolve(ctx.symbol(symbol).name).to_string();
        for (index, parameter) in self.parameters.iter_mut().enumerate() {
            let formal = formals[index + offset];
            if parameter.ty() == Some(formal) {
                continue;
            }
            if !coerce_value(parameter, ctx, diag, formal) {
                diag.report_compiler_error(
                    ErrorKind::NoMatchingFunction {
                        name: callee_name.clone(),
                    },
                    Span::of(&self.error_token),
                );
                self.ty = Some(ctx.types.error);
            }
        }
    }

    /// Overload resolution: gather candidates, filter by arity, score each
    /// argument position, and pick the unique minimum.
    fn best_viable_function(
        &mut self,
        ctx: &mut Context,
        diag: &mut Diagnostics,
    ) -> Option<ResolvedCallee> {
        let mut candidates: Vec<SymbolId> = Vec::new();
        let error_name;
        let mut receiver: Option<TypeId> = None;

        match self.callee.as_mut() {
            Ast::Variable(var) => {
                error_name = var.reconstruct_names(ctx);

                // Calling through a pointer-to-function value bypasses
                // overload resolution entirely.
                if let Some(ty) = var.ty {
                    if let Some(pointee) = ctx.types.pointee(ty) {
                        if !ctx.types.is_function(pointee) {
                            diag.report_compiler_error(
                                ErrorKind::NotAFunction { name: error_name },
                                Span::of(&self.error_token),
                            );
                            return None;
                        }
                        return self.resolve_pointer_call(ctx, diag, pointee);
                    }
                }

                if var.is_implicit_member {
                    let owner = ctx.find_owner(self.scope)?;
                    let mut names = ctx.types.components(owner)?.to_vec();
                    names.push(var.name());
                    candidates = ctx.candidate_functions(self.scope, &names);
                    receiver = Some(owner);
                    self.is_member_function = true;
                } else if !var.template_arguments.is_empty() {
                    let symbol = self.instantiate_template(ctx, diag)?;
                    candidates.push(symbol);
                } else {
                    candidates = ctx.candidate_functions(self.scope, &var.names);
                }
            }
            Ast::Member(member) => {
                let struct_ty = member.struct_ty?;
                let mut names = ctx.types.components(struct_ty)?.to_vec();
                names.push(member.member);
                error_name = format!(
                    "{}::{}",
                    display(ctx, struct_ty),
                    ctx.interner.resolve(member.member)
                );
                candidates = ctx.candidate_functions(self.scope, &names);
                receiver = Some(struct_ty);
                self.is_member_function = true;
            }
            other => {
                diag.report_compiler_error(
                    ErrorKind::NotAFunction {
                        name: other.error_token().text.clone(),
                    },
                    Span::of(&self.error_token),
                );
                return None;
            }
        }

        // The argument list the candidates are scored against; member calls
        // prepend the receiver pointer as the `this` argument.
        let mut argument_types: Vec<TypeId> = Vec::new();
        if let Some(receiver) = receiver {
            argument_types.push(ctx.types.pointer_to(receiver));
        }
        for parameter in &self.parameters {
            argument_types.push(parameter.ty()?);
        }

        candidates.retain(|&candidate| {
            let ty = ctx.symbol(candidate).ty;
            match ctx.types.function_parts(ty) {
                Some((_, formals)) => formals.len() == argument_types.len(),
                None => false,
            }
        });

        let mut viable: Vec<ViableFunction> = Vec::new();
        let total = argument_types.len();
        for &candidate in &candidates {
            let ty = ctx.symbol(candidate).ty;
            let Some((_, formals)) = ctx.types.function_parts(ty) else {
                continue;
            };
            let formals: Vec<TypeId> = formals.to_vec();
            let mut score = 0i64;
            let mut disallowed = false;
            for (index, (&argument, &formal)) in
                argument_types.iter().zip(formals.iter()).enumerate()
            {
                let multiplier = if argument == formal {
                    0
                } else {
                    match ctx.types.cast_to(argument, formal) {
                        CastLevel::Implicit => 1,
                        CastLevel::ImplicitWarning => 2,
                        _ => {
                            disallowed = true;
                            break;
                        }
                    }
                };
                // Weight earlier argument positions more.
                score += multiplier * (total - index) as i64;
            }
            if !disallowed {
                viable.push(ViableFunction {
                    symbol: candidate,
                    score,
                });
            }
        }

        if viable.is_empty() {
            diag.report_compiler_error(
                ErrorKind::NoMatchingFunction { name: error_name },
                Span::of(&self.error_token),
            );
            return None;
        }

        viable.sort_by_key(|v| v.score);
        if viable.len() >= 2 && viable[0].score == viable[1].score {
            diag.report_compiler_error(
                ErrorKind::AmbiguousCall { name: error_name },
                Span::of(&self.error_token),
            );
            return None;
        }
        Some(ResolvedCallee::Symbol(viable[0].symbol))
    }

    fn resolve_pointer_call(
        &mut self,
        ctx: &mut Context,
        diag: &mut Diagnostics,
        function_type: TypeId,
    ) -> Option<ResolvedCallee> {
        let Some((ret, formals)) = ctx.types.function_parts(function_type) else {
            return None;
        };
        let formals: Vec<TypeId> = formals.to_vec();
        if formals.len() != self.parameters.len() {
            diag.report_compiler_error(
                ErrorKind::NoMatchingFunction {
                    name: self.error_token.text.clone(),
                },
                Span::of(&self.error_token),
            );
            return None;
        }
        self.ty = Some(ret);
        for (parameter, &formal) in self.parameters.iter_mut().zip(formals.iter()) {
            if parameter.ty() == Some(formal) {
                continue;
            }
            if !coerce_value(parameter, ctx, diag, formal) {
                diag.report_compiler_error(
                    ErrorKind::NoMatchingFunction {
                        name: self.error_token.text.clone(),
                    },
                    Span::of(&self.error_token),
                );
                self.ty = Some(ctx.types.error);
            }
        }
        Some(ResolvedCallee::Pointer)
    }

    /// Resolve a `name<T1, T2>(...)` call against the generic symbol's
    /// instantiation cache, cloning and checking the body on a miss.
    fn instantiate_template(
        &mut self,
        ctx: &mut Context,
        diag: &mut Diagnostics,
    ) -> Option<SymbolId> {
        let Ast::Variable(var) = self.callee.as_ref() else {
            return None;
        };
        let names = var.names.clone();
        let arguments = var.template_arguments.clone();
        let error_name = var.reconstruct_names(ctx);

        let symbol = if names.len() > 1 {
            ctx.resolve_symbol_qualified(self.scope, &names)
        } else {
            ctx.resolve_symbol(self.scope, *names.last().expect("non-empty name"))
        };
        let Some(symbol) = symbol else {
            diag.report_compiler_error(
                ErrorKind::NoTemplatedFunction { name: error_name },
                Span::of(&self.error_token),
            );
            return None;
        };

        if ctx.symbol(symbol).template.is_none() {
            diag.report_compiler_error(
                ErrorKind::NoTemplatedFunction { name: error_name },
                Span::of(&self.error_token),
            );
            return None;
        }

        let parameter_count = ctx
            .symbol(symbol)
            .template
            .as_ref()
            .map(|t| t.parameters.len())
            .unwrap_or(0);
        if parameter_count != arguments.len() {
            diag.report_compiler_error(
                ErrorKind::TemplateParameterMismatch {
                    name: error_name,
                    expected: parameter_count,
                    actual: arguments.len(),
                },
                Span::of(&self.error_token),
            );
            return None;
        }

        // Cache lookup by exact parameter-type equality.
        if let Some(template) = ctx.symbol(symbol).template.as_ref() {
            for instantiation in &template.instantiations {
                if instantiation.arguments == arguments {
                    return instantiation.body.symbol();
                }
            }
        }

        // Cache miss: clone the generic body, substitute the parameter
        // types, and type-check the clone.
        let mut template = ctx
            .symbol_mut(symbol)
            .template
            .take()
            .expect("template presence checked above");
        let Some(body) = template.body.as_ref() else {
            ctx.symbol_mut(symbol).template = Some(template);
            diag.report_compiler_error(
                ErrorKind::NoTemplatedFunction { name: error_name },
                Span::of(&self.error_token),
            );
            return None;
        };

        let target_scope = body.scope();
        let mut clone = body.clone_into(ctx, target_scope);
        for (parameter, &actual) in template.parameters.iter().zip(arguments.iter()) {
            clone.set_template_type(ctx, parameter.ty, actual);
        }
        clone.type_check(ctx, diag);
        let clone_symbol = clone.symbol();

        template.instantiations.push(TemplateInstantiation {
            body: clone,
            arguments,
        });
        ctx.symbol_mut(symbol).template = Some(template);

        clone_symbol
    }

    pub fn semantic_check(&mut self, ctx: &Context, diag: &mut Diagnostics, statement: bool) {
        self.callee.semantic_check(ctx, diag, false);
        for parameter in &mut self.parameters {
            parameter.semantic_check(ctx, diag, false);
        }
        if let Some(ResolvedCallee::Symbol(symbol)) = self.resolved {
            if statement && ctx.symbol(symbol).pure {
                diag.compiler_warning(
                    "unused",
                    Span::of(&self.error_token),
                    "statement has no effect".to_string(),
                );
            }
            // Pure functions should not reach out to impure ones.
            if ctx.in_pure_scope(self.scope) && !ctx.symbol(symbol).pure {
                diag.compiler_warning(
                    "pure",
                    Span::of(&self.error_token),
                    "impure function called from a pure function".to_string(),
                );
            }
        }
    }

    pub fn emit(
        &mut self,
        ctx: &mut Context,
        builder: &mut IrBuilder,
        diag: &mut Diagnostics,
    ) -> Option<ValueId> {
        let callee = match self.resolved? {
            ResolvedCallee::Pointer => self.callee.emit(ctx, builder, diag)?,
            ResolvedCallee::Symbol(symbol) => ctx.latest_value(symbol, None, &builder.module)?,
        };

        let mut arguments = Vec::with_capacity(self.parameters.len() + 1);
        if self.is_member_function {
            match self.callee.as_mut() {
                Ast::Variable(_) => {
                    // Implicit member call: the receiver is `this`.
                    let this = ctx.interner.intern("this");
                    let this_sym = ctx.resolve_symbol(self.scope, this)?;
                    let slot = ctx.latest_value(this_sym, None, &builder.module)?;
                    arguments.push(builder.create_load(slot));
                }
                Ast::Member(member) => {
                    let value = member.object.emit(ctx, builder, diag)?;
                    if member.pointer {
                        arguments.push(value);
                    } else {
                        // A by-value receiver was emitted as a load; call
                        // through its storage instead.
                        match builder.module.pointer_operand(value) {
                            Some(ptr) => {
                                builder.erase_instruction(value);
                                arguments.push(ptr);
                            }
                            None => arguments.push(builder.create_addr_of(value)),
                        }
                    }
                }
                _ => {}
            }
        }
        for parameter in &mut self.parameters {
            arguments.push(parameter.emit(ctx, builder, diag)?);
        }

        Some(builder.create_call(callee, arguments))
    }

    pub fn clone_into(&self, ctx: &mut Context, scope: ScopeId) -> Self {
        let callee = self.callee.clone_into(ctx, scope);
        let parameters = self
            .parameters
            .iter()
            .map(|p| p.clone_into(ctx, scope))
            .collect();
        Self {
            scope,
            callee: Box::new(callee),
            parameters,
            resolved: None,
            is_member_function: false,
            ty: None,
            error_token: self.error_token.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Member access
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct MemberAccess {
    pub scope: ScopeId,
    pub object: Box<Ast>,
    pub member: Name,
    /// `->` access when true, `.` access otherwise.
    pub pointer: bool,
    pub struct_ty: Option<TypeId>,
    pub field_index: Option<usize>,
    /// The accessed field is a pointer back at its own struct; the GEP is
    /// cast back to the concrete type before the load.
    pub self_ptr_cast: bool,
    pub is_method: bool,
    pub private: bool,
    pub ty: Option<TypeId>,
    pub operator_token: Token,
    pub error_token: Token,
}

impl MemberAccess {
    pub fn new(
        scope: ScopeId,
        object: Ast,
        member: Name,
        pointer: bool,
        operator_token: Token,
        field_token: Token,
    ) -> Self {
        Self {
            scope,
            object: Box::new(object),
            member,
            pointer,
            struct_ty: None,
            field_index: None,
            self_ptr_cast: false,
            is_method: false,
            private: false,
            ty: None,
            operator_token,
            error_token: field_token,
        }
    }

    pub fn type_check(&mut self, ctx: &mut Context, diag: &mut Diagnostics) {
        self.object.type_check(ctx, diag);
        let Some(object_ty) = self.object.ty() else {
            self.ty = Some(ctx.types.error);
            return;
        };
        if ctx.types.is_error(object_ty) {
            self.ty = Some(ctx.types.error);
            return;
        }

        let struct_ty = if self.pointer {
            let Some(pointee) = ctx.types.pointee(object_ty) else {
                diag.report_compiler_error(
                    ErrorKind::ArrowOnNonPointer {
                        value: self.object.error_token().text.clone(),
                    },
                    Span::of(&self.operator_token),
                );
                self.ty = Some(ctx.types.error);
                return;
            };
            if !ctx.types.is_struct(pointee) {
                diag.report_compiler_error(
                    ErrorKind::ArrowOnNonStruct {
                        value: self.object.error_token().text.clone(),
                    },
                    Span::of(&self.operator_token),
                );
                self.ty = Some(ctx.types.error);
                return;
            }
            pointee
        } else {
            if !ctx.types.is_struct(object_ty) {
                diag.report_compiler_error(
                    ErrorKind::DotOnNonStruct {
                        value: self.object.error_token().text.clone(),
                    },
                    Span::of(&self.operator_token),
                );
                self.ty = Some(ctx.types.error);
                return;
            }
            object_ty
        };
        self.struct_ty = Some(struct_ty);

        let st = ctx.types.as_struct(struct_ty).expect("checked as struct");
        if let Some((index, field)) = st.field(self.member) {
            self.ty = Some(field.ty);
            self.field_index = Some(index);
            self.private = field.private;
            if let TypeKind::Pointer { pointee } = ctx.types.kind(field.ty) {
                self.self_ptr_cast = *pointee == struct_ty;
            }
        } else if let Some(method) = st.method(self.member) {
            self.ty = Some(method.ty);
            self.private = method.private;
            self.is_method = true;
        } else {
            diag.report_compiler_error(
                ErrorKind::NoSuchMember {
                    class: display(ctx, struct_ty),
                    member: ctx.interner.resolve(self.member).to_string(),
                },
                Span::of(&self.error_token),
            );
            self.ty = Some(ctx.types.error);
        }
    }

    pub fn semantic_check(&mut self, ctx: &Context, diag: &mut Diagnostics, statement: bool) {
        self.object.semantic_check(ctx, diag, statement);

        if statement {
            diag.compiler_warning(
                "unused",
                Span::of(&self.error_token),
                "expression result unused".to_string(),
            );
        }

        // Private members are only reachable from inside the owning class.
        if self.private {
            if let Some(struct_ty) = self.struct_ty {
                if ctx.find_owner(self.scope) != Some(struct_ty) {
                    diag.report_compiler_error(
                        ErrorKind::PrivateMember {
                            class: display(ctx, struct_ty),
                            member: ctx.interner.resolve(self.member).to_string(),
                        },
                        Span::of(&self.error_token),
                    );
                }
            }
        }
    }

    pub fn emit(
        &mut self,
        ctx: &mut Context,
        builder: &mut IrBuilder,
        diag: &mut Diagnostics,
    ) -> Option<ValueId> {
        let ptr = if self.pointer {
            self.object.emit(ctx, builder, diag)?
        } else {
            let value = self.object.emit(ctx, builder, diag)?;
            let ptr = builder.module.pointer_operand(value)?;
            builder.erase_instruction(value);
            ptr
        };

        let mut gep = builder.create_struct_gep(ptr, self.field_index?);
        if self.self_ptr_cast {
            let struct_ir = ctx.types.ir_type(self.struct_ty?);
            let concrete = IrType::Ptr(Box::new(IrType::Ptr(Box::new(struct_ir))));
            gep = builder.create_ptr_cast(gep, concrete);
        }
        Some(builder.create_load(gep))
    }

    pub fn clone_into(&self, ctx: &mut Context, scope: ScopeId) -> Self {
        Self {
            scope,
            object: Box::new(self.object.clone_into(ctx, scope)),
            member: self.member,
            pointer: self.pointer,
            struct_ty: None,
            field_index: None,
            self_ptr_cast: false,
            is_method: false,
            private: false,
            ty: None,
            operator_token: self.operator_token.clone(),
            error_token: self.error_token.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Casts
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CastExpression {
    pub scope: ScopeId,
    pub target: TypeId,
    pub value: Box<Ast>,
    /// Inserted by the type-check pass rather than written in source.
    pub synthesized: bool,
    pub ty: Option<TypeId>,
    pub error_token: Token,
}

impl CastExpression {
    pub fn new(scope: ScopeId, target: TypeId, value: Ast, error_token: Token) -> Self {
        Self {
            scope,
            target,
            value: Box::new(value),
            synthesized: false,
            ty: None,
            error_token,
        }
    }

    pub fn synthesized(value: Ast, target: TypeId) -> Self {
        let scope = value.scope();
        let error_token = value.error_token().clone();
        Self {
            scope,
            target,
            value: Box::new(value),
            synthesized: true,
            ty: Some(target),
            error_token,
        }
    }

    pub fn type_check(&mut self, ctx: &mut Context, diag: &mut Diagnostics) {
        if self.synthesized {
            // The wrapped node was checked before the cast was spliced in.
            self.ty = Some(self.target);
            return;
        }

        self.value.type_check(ctx, diag);
        let Some(vt) = self.value.ty() else {
            self.ty = Some(ctx.types.error);
            return;
        };
        if ctx.types.is_error(vt) {
            self.ty = Some(ctx.types.error);
            return;
        }

        if ctx.types.cast_to(vt, self.target) == CastLevel::Disallowed {
            diag.report_compiler_error(
                ErrorKind::InvalidCast {
                    from: display(ctx, vt),
                    to: display(ctx, self.target),
                },
                Span::of(&self.error_token),
            );
            self.ty = Some(ctx.types.error);
            return;
        }
        self.ty = Some(self.target);
    }

    pub fn semantic_check(&mut self, ctx: &Context, diag: &mut Diagnostics, statement: bool) {
        self.value.semantic_check(ctx, diag, false);
        if statement && !self.synthesized {
            diag.compiler_warning(
                "unused",
                Span::of(&self.error_token),
                "expression result unused".to_string(),
            );
        }
    }

    pub fn emit(
        &mut self,
        ctx: &mut Context,
        builder: &mut IrBuilder,
        diag: &mut Diagnostics,
    ) -> Option<ValueId> {
        let value = self.value.emit(ctx, builder, diag)?;
        let Some(vt) = self.value.ty() else {
            return Some(value);
        };

        let source_integral =
            ctx.types.is_integer(vt) || vt == ctx.types.bool_ || ctx.types.is_enum(vt);
        let target_integral = ctx.types.is_integer(self.target)
            || self.target == ctx.types.bool_
            || ctx.types.is_enum(self.target);

        if source_integral && target_integral {
            let to = ctx.types.ir_type(self.target);
            return Some(builder.create_int_cast(value, to));
        }
        if ctx.types.is_pointer(vt) && ctx.types.is_pointer(self.target) {
            let to = ctx.types.ir_type(self.target);
            return Some(builder.create_ptr_cast(value, to));
        }
        Some(value)
    }

    pub fn set_template_type(&mut self, ctx: &mut Context, formal: TypeId, actual: TypeId) {
        self.target = ctx.types.substitute(self.target, formal, actual);
        if self.synthesized {
            self.ty = Some(self.target);
        }
    }

    pub fn clone_into(&self, ctx: &mut Context, scope: ScopeId) -> Self {
        Self {
            scope,
            target: self.target,
            value: Box::new(self.value.clone_into(ctx, scope)),
            synthesized: self.synthesized,
            ty: if self.synthesized {
                Some(self.target)
            } else {
                None
            },
            error_token: self.error_token.clone(),
        }
    }
}
