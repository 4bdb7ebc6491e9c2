//! Pass 2: the semantic parser
//!
//! Same grammar as the symbol pass, but function and method bodies are
//! parsed into full expression trees. Symbols registered by pass 1 are
//! reused; classes complete their pending placeholders; template
//! declarations attach their bodies and explicit specializations land in
//! the generic symbol's instantiation cache.

use super::{binary_precedence, expected_global, parse_type, prefix_precedence, Cursor};
use crate::ast::{
    Ast, BinaryExpression, BinaryOperator, BooleanLiteral, CallExpression, CastExpression,
    ClassDeclaration, ClassField, EnumDeclaration, Function, FunctionArgument, IfStatement,
    IntegerLiteral, MemberAccess, Namespace, ReturnStatement, StringLiteral, UnaryExpression,
    UnaryOperator, VariableDeclaration, VariableExpression,
};
use crate::context::{Context, Name, ScopeId, SymbolId};
use crate::diagnostics::{CompileError, ErrorKind};
use crate::lexer::{Token, TokenKind};
use crate::mangle;
use crate::scope::{TemplateInstantiation, TemplateParameter};
use crate::types::{EnumField, StructField, StructMethod, TypeId};

pub struct Parser<'a, 't> {
    cursor: Cursor<'t>,
    ctx: &'a mut Context,
    active_scope: ScopeId,
    template_parameters: Vec<TemplateParameter>,
    /// Classes in this unit complete their placeholders fully when the
    /// unit is export-visible at the compilation root, and as size-only
    /// incomplete types otherwise.
    complete_types: bool,
}

impl<'a, 't> Parser<'a, 't> {
    pub fn new(
        tokens: &'t [Token],
        ctx: &'a mut Context,
        unit_scope: ScopeId,
        complete_types: bool,
    ) -> Self {
        Self {
            cursor: Cursor::new(tokens),
            ctx,
            active_scope: unit_scope,
            template_parameters: Vec::new(),
            complete_types,
        }
    }

    pub fn parse(mut self) -> Result<Vec<Ast>, CompileError> {
        let mut ast = Vec::new();
        while !self.cursor.at_eof() {
            if let Some(node) = self.parse_global(false)? {
                ast.push(node);
            }
        }
        Ok(ast)
    }

    fn parse_global(&mut self, exported: bool) -> Result<Option<Ast>, CompileError> {
        match self.cursor.current().kind {
            TokenKind::ExportKeyword => {
                self.cursor.consume();
                if self.cursor.at(TokenKind::LeftBrace) {
                    // Flatten the export block into the surrounding unit;
                    // the grouping only affects export marking.
                    self.cursor.consume();
                    let mut nodes = Vec::new();
                    while !self.cursor.at(TokenKind::RightBrace) && !self.cursor.at_eof() {
                        if let Some(node) = self.parse_global(true)? {
                            nodes.push(node);
                        }
                    }
                    self.cursor.expect_consume(TokenKind::RightBrace)?;
                    // Multiple declarations collapse into a synthetic
                    // namespace-less group via individual returns; callers
                    // collect them one at a time, so re-queue all but one.
                    if nodes.len() <= 1 {
                        return Ok(nodes.pop());
                    }
                    return Ok(Some(Ast::Namespace(Namespace {
                        scope: self.active_scope,
                        own_scope: self.active_scope,
                        name: self.ctx.interner.intern(""),
                        body: nodes,
                        error_token: self.cursor.current().clone(),
                    })));
                }
                self.parse_global(true)
            }
            TokenKind::ImportKeyword => {
                // The import graph was resolved before this pass; the
                // spliced scopes already hang off the root.
                while !self.cursor.at(TokenKind::Semicolon) && !self.cursor.at_eof() {
                    self.cursor.consume();
                }
                if self.cursor.at(TokenKind::Semicolon) {
                    self.cursor.consume();
                }
                Ok(None)
            }
            TokenKind::PureKeyword => {
                self.cursor.consume();
                self.cursor.expect(TokenKind::FuncKeyword)?;
                self.parse_function(true, exported)
            }
            TokenKind::FuncKeyword => self.parse_function(false, exported),
            TokenKind::ClassKeyword => self.parse_class(exported).map(Some),
            TokenKind::EnumKeyword => self.parse_enum(exported).map(Some),
            TokenKind::NamespaceKeyword => self.parse_namespace(exported).map(Some),
            TokenKind::TemplateKeyword => {
                self.parse_template(exported)?;
                Ok(None)
            }
            TokenKind::EndOfFile => {
                self.cursor.consume();
                Ok(None)
            }
            _ => Err(expected_global(self.cursor.current())),
        }
    }

    // -------------------------------------------------------------------
    // Functions and templates
    // -------------------------------------------------------------------

    fn parse_function(&mut self, pure: bool, exported: bool) -> Result<Option<Ast>, CompileError> {
        let func_token = self.cursor.consume(); // func
        let name_token = self.cursor.expect_consume(TokenKind::Identifier)?;
        let name = self.ctx.interner.intern(&name_token.text);

        // `func name<...>` is an explicit template specialization.
        if self.cursor.at(TokenKind::LessThan) {
            self.parse_specialization(pure, name, &name_token, func_token)?;
            return Ok(None);
        }

        let function =
            self.parse_function_rest(pure, exported, name, func_token, self.active_scope, None)?;
        Ok(Some(Ast::Function(function)))
    }

    /// Parse the argument list, return type and body shared by plain
    /// functions, methods and specializations.
    fn parse_function_rest(
        &mut self,
        pure: bool,
        exported: bool,
        name: Name,
        error_token: Token,
        declaring_scope: ScopeId,
        this_type: Option<TypeId>,
    ) -> Result<Function, CompileError> {
        self.cursor.expect_consume(TokenKind::LeftParen)?;
        let mut argument_names = Vec::new();
        let mut argument_types = Vec::new();
        while !self.cursor.at(TokenKind::RightParen) {
            let arg_token = self.cursor.expect_consume(TokenKind::Identifier)?;
            argument_names.push(self.ctx.interner.intern(&arg_token.text));
            self.cursor.expect_consume(TokenKind::Colon)?;
            argument_types.push(parse_type(
                &mut self.cursor,
                self.ctx,
                self.active_scope,
                &self.template_parameters,
            )?);
            if !self.cursor.at(TokenKind::RightParen) {
                self.cursor.expect_consume(TokenKind::Comma)?;
            }
        }
        self.cursor.consume();

        self.cursor.expect_consume(TokenKind::RightArrow)?;
        let return_type = parse_type(
            &mut self.cursor,
            self.ctx,
            self.active_scope,
            &self.template_parameters,
        )?;

        if let Some(this_type) = this_type {
            argument_names.insert(0, self.ctx.interner.intern("this"));
            argument_types.insert(0, this_type);
        }
        let function_type = self
            .ctx
            .types
            .function_of(return_type, argument_types.clone());

        // Reuse the symbol the symbol pass registered; a fresh declaration
        // only happens for nodes pass 1 deliberately skipped.
        let symbol = self
            .find_scope_symbol(declaring_scope, name, function_type)
            .unwrap_or_else(|| self.ctx.declare_symbol(declaring_scope, name, function_type));
        self.ctx.symbol_mut(symbol).pure = pure;
        if exported {
            self.ctx.symbol_mut(symbol).exported = true;
        }

        let own_scope = self
            .ctx
            .new_scope(Some(declaring_scope), None, false, Some(return_type));
        self.ctx.scopes.get_mut(own_scope).is_pure = pure;
        if this_type.is_some() {
            let owner = self.ctx.scopes.get(declaring_scope).owner;
            self.ctx.scopes.get_mut(own_scope).owner = owner;
        }

        let arguments: Vec<FunctionArgument> = argument_names
            .iter()
            .zip(argument_types.iter())
            .map(|(&arg_name, &arg_type)| {
                let arg_symbol = self.ctx.declare_symbol(own_scope, arg_name, arg_type);
                FunctionArgument {
                    name: arg_name,
                    ty: arg_type,
                    symbol: arg_symbol,
                }
            })
            .collect();

        let body = if self.cursor.at(TokenKind::Semicolon) {
            self.cursor.consume();
            None
        } else {
            Some(self.parse_block(own_scope)?)
        };

        Ok(Function {
            scope: declaring_scope,
            own_scope,
            name,
            pure,
            exported,
            ty: function_type,
            arguments,
            body,
            symbol,
            ir_function: None,
            error_token,
        })
    }

    fn parse_specialization(
        &mut self,
        pure: bool,
        name: Name,
        name_token: &Token,
        func_token: Token,
    ) -> Result<(), CompileError> {
        let arguments = self.parse_template_argument_list()?;

        let generic = self
            .ctx
            .resolve_symbol(self.active_scope, name)
            .filter(|&sym| self.ctx.symbol(sym).template.is_some())
            .ok_or_else(|| {
                CompileError::at_token(
                    ErrorKind::NoTemplatedFunction {
                        name: name_token.text.clone(),
                    },
                    name_token,
                )
            })?;

        let expected = self
            .ctx
            .symbol(generic)
            .template
            .as_ref()
            .map(|t| t.parameters.len())
            .unwrap_or(0);
        if expected != arguments.len() {
            return Err(CompileError::at_token(
                ErrorKind::TemplateParameterMismatch {
                    name: name_token.text.clone(),
                    expected,
                    actual: arguments.len(),
                },
                name_token,
            ));
        }

        let function =
            self.parse_function_rest(pure, false, name, func_token, self.active_scope, None)?;

        let template = self
            .ctx
            .symbol_mut(generic)
            .template
            .as_mut()
            .expect("checked above");
        template.instantiations.push(TemplateInstantiation {
            body: Ast::Function(function),
            arguments,
        });
        Ok(())
    }

    fn parse_template_argument_list(&mut self) -> Result<Vec<TypeId>, CompileError> {
        self.cursor.expect_consume(TokenKind::LessThan)?;
        let mut arguments = Vec::new();
        while !self.cursor.at(TokenKind::GreaterThan) {
            arguments.push(parse_type(
                &mut self.cursor,
                self.ctx,
                self.active_scope,
                &self.template_parameters,
            )?);
            if !self.cursor.at(TokenKind::GreaterThan) {
                self.cursor.expect_consume(TokenKind::Comma)?;
            }
        }
        self.cursor.consume();
        Ok(arguments)
    }

    fn parse_template(&mut self, exported: bool) -> Result<(), CompileError> {
        self.cursor.consume(); // template
        self.cursor.expect_consume(TokenKind::LessThan)?;

        let mut parameters = Vec::new();
        while !self.cursor.at(TokenKind::GreaterThan) {
            let name_token = self.cursor.expect_consume(TokenKind::Identifier)?;
            let name = self.ctx.interner.intern(&name_token.text);
            self.cursor.expect_consume(TokenKind::Colon)?;
            self.cursor.expect_consume(TokenKind::TypenameKeyword)?;
            let ty = self.ctx.types.template_param(name);
            parameters.push(TemplateParameter { name, ty });
            if !self.cursor.at(TokenKind::GreaterThan) {
                self.cursor.expect_consume(TokenKind::Comma)?;
            }
        }
        self.cursor.consume();

        let mut pure = false;
        if self.cursor.at(TokenKind::PureKeyword) {
            self.cursor.consume();
            pure = true;
        }
        self.cursor.expect(TokenKind::FuncKeyword)?;
        let func_token = self.cursor.consume();
        let name_token = self.cursor.expect_consume(TokenKind::Identifier)?;
        let name = self.ctx.interner.intern(&name_token.text);

        self.template_parameters = parameters;
        let function =
            self.parse_function_rest(pure, exported, name, func_token, self.active_scope, None)?;
        self.template_parameters.clear();

        // Attach the body to the generic symbol the symbol pass created.
        let symbol = function.symbol;
        if let Some(template) = self.ctx.symbol_mut(symbol).template.as_mut() {
            template.body = Some(Ast::Function(function));
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Classes, enums, namespaces
    // -------------------------------------------------------------------

    fn parse_class(&mut self, exported: bool) -> Result<Ast, CompileError> {
        let class_token = self.cursor.consume(); // class
        let name_token = self.cursor.expect_consume(TokenKind::Identifier)?;
        let name = self.ctx.interner.intern(&name_token.text);

        let class_scope = self
            .ctx
            .find_child_namespace(self.active_scope, name)
            .unwrap_or_else(|| {
                self.ctx
                    .new_scope(Some(self.active_scope), Some(name), true, None)
            });

        let mut components = self.ctx.namespaces(self.active_scope);
        components.push(name);
        let key_text = mangle::type_key(&self.ctx.interner, &components);
        let key = self.ctx.interner.intern(&key_text);
        let ty = match self.ctx.types.get(key) {
            Some(ty) => ty,
            None => self
                .ctx
                .types
                .create_pending(key, class_token.clone(), components),
        };
        self.ctx.scopes.get_mut(class_scope).owner = Some(ty);
        let this_type = self.ctx.types.pointer_to(ty);

        let symbol = self
            .ctx
            .scope_symbol(self.active_scope, name)
            .unwrap_or_else(|| self.ctx.declare_symbol(self.active_scope, name, ty));
        if exported {
            self.ctx.symbol_mut(symbol).exported = true;
        }

        self.cursor.expect_consume(TokenKind::LeftBrace)?;
        let mut fields = Vec::new();
        let mut struct_fields = Vec::new();
        let mut struct_methods = Vec::new();
        let mut methods = Vec::new();

        while !self.cursor.at(TokenKind::RightBrace) && !self.cursor.at_eof() {
            let mut private = true;
            if self.cursor.at(TokenKind::PublicKeyword) {
                self.cursor.consume();
                private = false;
            }
            let mut pure = false;
            if self.cursor.at(TokenKind::PureKeyword) {
                self.cursor.consume();
                pure = true;
                self.cursor.expect(TokenKind::FuncKeyword)?;
            }

            if self.cursor.at(TokenKind::FuncKeyword) {
                let func_token = self.cursor.consume();
                let method_token = self.cursor.expect_consume(TokenKind::Identifier)?;
                let method_name = self.ctx.interner.intern(&method_token.text);
                let method = self.parse_function_rest(
                    pure,
                    exported,
                    method_name,
                    func_token,
                    class_scope,
                    Some(this_type),
                )?;
                struct_methods.push(StructMethod {
                    private,
                    name: method_name,
                    ty: method.ty,
                });
                methods.push(Ast::Function(method));
            } else {
                let field_token = self.cursor.expect_consume(TokenKind::Identifier)?;
                let field_name = self.ctx.interner.intern(&field_token.text);
                self.cursor.expect_consume(TokenKind::Colon)?;
                let field_type = parse_type(
                    &mut self.cursor,
                    self.ctx,
                    self.active_scope,
                    &self.template_parameters,
                )?;
                fields.push(ClassField {
                    private,
                    name: field_name,
                    ty: field_type,
                });
                struct_fields.push(StructField {
                    private,
                    name: field_name,
                    ty: field_type,
                });
                if self.cursor.at(TokenKind::Semicolon) {
                    self.cursor.consume();
                }
            }
        }
        self.cursor.expect_consume(TokenKind::RightBrace)?;

        // The placeholder completes now; classes in units that are not
        // export-visible at the root keep only their size.
        self.ctx
            .types
            .set_fields_and_methods(ty, struct_fields, struct_methods);
        if self.complete_types {
            self.ctx.types.init_complete(ty);
        } else {
            self.ctx.types.init_incomplete(ty);
        }

        Ok(Ast::Class(ClassDeclaration {
            scope: self.active_scope,
            own_scope: class_scope,
            name,
            exported,
            ty,
            fields,
            methods,
            symbol,
            error_token: class_token,
        }))
    }

    fn parse_enum(&mut self, exported: bool) -> Result<Ast, CompileError> {
        let enum_token = self.cursor.consume(); // enum
        let name_token = self.cursor.expect_consume(TokenKind::Identifier)?;
        let name = self.ctx.interner.intern(&name_token.text);

        let own_scope = self
            .ctx
            .find_child_namespace(self.active_scope, name)
            .unwrap_or_else(|| {
                self.ctx
                    .new_scope(Some(self.active_scope), Some(name), true, None)
            });

        let base = if self.cursor.at(TokenKind::Colon) {
            self.cursor.consume();
            parse_type(
                &mut self.cursor,
                self.ctx,
                self.active_scope,
                &self.template_parameters,
            )?
        } else {
            self.ctx.types.i32_
        };

        self.cursor.expect_consume(TokenKind::LeftBrace)?;
        let mut parsed_fields: Vec<(Name, i64)> = Vec::new();
        let mut next_value = 0i64;
        while !self.cursor.at(TokenKind::RightBrace) && !self.cursor.at_eof() {
            let field_token = self.cursor.expect_consume(TokenKind::Identifier)?;
            let field_name = self.ctx.interner.intern(&field_token.text);
            if self.cursor.at(TokenKind::Equals) {
                self.cursor.consume();
                let value_token = self.cursor.expect_consume(TokenKind::IntegerLiteral)?;
                next_value = value_token.text.parse::<i64>().unwrap_or(next_value);
            }
            parsed_fields.push((field_name, next_value));
            next_value += 1;
            if self.cursor.at(TokenKind::Comma) {
                self.cursor.consume();
            }
        }
        self.cursor.expect_consume(TokenKind::RightBrace)?;

        let mut components = self.ctx.namespaces(self.active_scope);
        components.push(name);
        let key_text = mangle::type_key(&self.ctx.interner, &components);
        let key = self.ctx.interner.intern(&key_text);
        let ty = match self.ctx.types.get(key) {
            Some(ty) => ty,
            None => {
                let enum_fields = parsed_fields
                    .iter()
                    .map(|&(name, value)| EnumField { name, value })
                    .collect();
                self.ctx.types.create_enum(key, components, base, enum_fields)
            }
        };

        let symbol = self
            .ctx
            .scope_symbol(self.active_scope, name)
            .unwrap_or_else(|| self.ctx.declare_symbol(self.active_scope, name, ty));
        if exported {
            self.ctx.symbol_mut(symbol).exported = true;
        }

        let variants = parsed_fields
            .iter()
            .map(|&(variant_name, value)| {
                let variant_symbol = self
                    .ctx
                    .scope_symbol(own_scope, variant_name)
                    .unwrap_or_else(|| self.ctx.declare_symbol(own_scope, variant_name, ty));
                crate::ast::EnumVariant {
                    name: variant_name,
                    value,
                    symbol: variant_symbol,
                }
            })
            .collect();

        Ok(Ast::Enum(EnumDeclaration {
            scope: self.active_scope,
            own_scope,
            name,
            exported,
            ty,
            base,
            variants,
            symbol,
            error_token: enum_token,
        }))
    }

    fn parse_namespace(&mut self, exported: bool) -> Result<Ast, CompileError> {
        let namespace_token = self.cursor.consume(); // namespace
        let name_token = self.cursor.expect_consume(TokenKind::Identifier)?;
        let name = self.ctx.interner.intern(&name_token.text);

        let scope = self
            .ctx
            .find_child_namespace(self.active_scope, name)
            .unwrap_or_else(|| {
                self.ctx
                    .new_scope(Some(self.active_scope), Some(name), true, None)
            });

        self.cursor.expect_consume(TokenKind::LeftBrace)?;
        let previous = self.active_scope;
        self.active_scope = scope;
        let mut body = Vec::new();
        while !self.cursor.at(TokenKind::RightBrace) && !self.cursor.at_eof() {
            if let Some(node) = self.parse_global(exported)? {
                body.push(node);
            }
        }
        self.active_scope = previous;
        self.cursor.expect_consume(TokenKind::RightBrace)?;

        Ok(Ast::Namespace(Namespace {
            scope: self.active_scope,
            own_scope: scope,
            name,
            body,
            error_token: namespace_token,
        }))
    }

    // -------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------

    fn parse_block(&mut self, scope: ScopeId) -> Result<Vec<Ast>, CompileError> {
        self.cursor.expect_consume(TokenKind::LeftBrace)?;
        let previous = self.active_scope;
        self.active_scope = scope;
        let mut body = Vec::new();
        while !self.cursor.at(TokenKind::RightBrace) && !self.cursor.at_eof() {
            body.push(self.parse_statement()?);
        }
        self.active_scope = previous;
        self.cursor.expect_consume(TokenKind::RightBrace)?;
        Ok(body)
    }

    fn parse_statement(&mut self) -> Result<Ast, CompileError> {
        let node = self.parse_expression(1)?;
        if matches!(node, Ast::If(_)) {
            if self.cursor.at(TokenKind::Semicolon) {
                self.cursor.consume();
            }
        } else {
            self.cursor.expect_consume(TokenKind::Semicolon)?;
        }
        Ok(node)
    }

    fn parse_variable_declaration(&mut self) -> Result<Ast, CompileError> {
        self.cursor.consume(); // let
        let name_token = self.cursor.expect_consume(TokenKind::Identifier)?;
        let name = self.ctx.interner.intern(&name_token.text);

        let ty = if self.cursor.at(TokenKind::Colon) {
            self.cursor.consume();
            Some(parse_type(
                &mut self.cursor,
                self.ctx,
                self.active_scope,
                &self.template_parameters,
            )?)
        } else {
            None
        };

        let init = if self.cursor.at(TokenKind::Equals) {
            self.cursor.consume();
            Some(self.parse_expression(1)?)
        } else {
            None
        };

        Ok(Ast::VarDecl(VariableDeclaration::new(
            self.ctx,
            self.active_scope,
            name,
            ty,
            init,
            name_token,
        )))
    }

    fn parse_return(&mut self) -> Result<Ast, CompileError> {
        let return_token = self.cursor.consume(); // return
        let value = if self.cursor.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression(1)?)
        };
        Ok(Ast::Return(ReturnStatement::new(
            self.active_scope,
            value,
            return_token,
        )))
    }

    fn parse_if(&mut self) -> Result<Ast, CompileError> {
        let if_token = self.cursor.consume(); // if
        self.cursor.expect_consume(TokenKind::LeftParen)?;
        let condition = self.parse_expression(1)?;
        self.cursor.expect_consume(TokenKind::RightParen)?;

        let then_scope = self.ctx.new_scope(Some(self.active_scope), None, false, None);
        let then_body = self.parse_branch_body(then_scope)?;

        let (else_scope, else_body) = if self.cursor.at(TokenKind::ElseKeyword) {
            self.cursor.consume();
            let scope = self.ctx.new_scope(Some(self.active_scope), None, false, None);
            let body = self.parse_branch_body(scope)?;
            (Some(scope), Some(body))
        } else {
            (None, None)
        };

        Ok(Ast::If(IfStatement {
            scope: self.active_scope,
            condition: Box::new(condition),
            then_scope,
            then_body,
            else_scope,
            else_body,
            error_token: if_token,
        }))
    }

    /// An `if` branch is either a block or a single statement.
    fn parse_branch_body(&mut self, scope: ScopeId) -> Result<Vec<Ast>, CompileError> {
        if self.cursor.at(TokenKind::LeftBrace) {
            self.parse_block(scope)
        } else {
            let previous = self.active_scope;
            self.active_scope = scope;
            let node = self.parse_statement()?;
            self.active_scope = previous;
            Ok(vec![node])
        }
    }

    // -------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------

    fn parse_expression(&mut self, precedence: i32) -> Result<Ast, CompileError> {
        let mut lhs = if prefix_precedence(self.cursor.current().kind) > 0 {
            let op_token = self.cursor.consume();
            let op = match op_token.kind {
                TokenKind::Minus => UnaryOperator::Negate,
                TokenKind::Ampersand => UnaryOperator::AddressOf,
                TokenKind::Star => UnaryOperator::Dereference,
                _ => UnaryOperator::Not,
            };
            let operand = self.parse_expression(prefix_precedence(op_token.kind))?;
            Ast::Unary(UnaryExpression::new(
                self.active_scope,
                op,
                operand,
                op_token,
            ))
        } else {
            self.parse_primary()?
        };

        loop {
            let kind = self.cursor.current().kind;
            match kind {
                TokenKind::LeftParen => {
                    if 90 < precedence {
                        break;
                    }
                    lhs = self.parse_call(lhs)?;
                }
                TokenKind::Dot | TokenKind::RightArrow => {
                    if 90 < precedence {
                        break;
                    }
                    let operator_token = self.cursor.consume();
                    let field_token = self.cursor.expect_consume(TokenKind::Identifier)?;
                    let member = self.ctx.interner.intern(&field_token.text);
                    lhs = Ast::Member(MemberAccess::new(
                        self.active_scope,
                        lhs,
                        member,
                        kind == TokenKind::RightArrow,
                        operator_token,
                        field_token,
                    ));
                }
                _ => {
                    let op_precedence = binary_precedence(kind);
                    if op_precedence == 0 || op_precedence < precedence {
                        break;
                    }
                    let op_token = self.cursor.consume();
                    let op = match kind {
                        TokenKind::Plus => BinaryOperator::Add,
                        TokenKind::Minus => BinaryOperator::Sub,
                        TokenKind::Star => BinaryOperator::Mul,
                        TokenKind::Slash => BinaryOperator::Div,
                        TokenKind::DoubleEquals => BinaryOperator::Equal,
                        TokenKind::BangEquals => BinaryOperator::NotEqual,
                        TokenKind::LessThan => BinaryOperator::LessThan,
                        TokenKind::GreaterThan => BinaryOperator::GreaterThan,
                        TokenKind::LessEqual => BinaryOperator::LessEqual,
                        TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
                        _ => BinaryOperator::Assign,
                    };
                    // Assignment is right-associative.
                    let next_precedence = if op == BinaryOperator::Assign {
                        op_precedence
                    } else {
                        op_precedence + 1
                    };
                    let rhs = self.parse_expression(next_precedence)?;
                    lhs = Ast::Binary(BinaryExpression::new(
                        self.active_scope,
                        op,
                        lhs,
                        rhs,
                        op_token,
                    ));
                }
            }
        }
        Ok(lhs)
    }

    fn parse_call(&mut self, callee: Ast) -> Result<Ast, CompileError> {
        self.cursor.expect_consume(TokenKind::LeftParen)?;
        let mut parameters = Vec::new();
        while !self.cursor.at(TokenKind::RightParen) {
            parameters.push(self.parse_expression(1)?);
            if !self.cursor.at(TokenKind::RightParen) {
                self.cursor.expect_consume(TokenKind::Comma)?;
            }
        }
        self.cursor.consume();
        Ok(Ast::Call(CallExpression::new(
            self.active_scope,
            callee,
            parameters,
        )))
    }

    fn parse_primary(&mut self) -> Result<Ast, CompileError> {
        match self.cursor.current().kind {
            TokenKind::IntegerLiteral => {
                let token = self.cursor.consume();
                let value = token.text.parse::<i64>().unwrap_or(0);
                Ok(Ast::Integer(IntegerLiteral::new(
                    self.active_scope,
                    value,
                    token,
                )))
            }
            TokenKind::StringLiteral => {
                let token = self.cursor.consume();
                let value = token.text.clone();
                Ok(Ast::Str(StringLiteral::new(self.active_scope, value, token)))
            }
            TokenKind::TrueKeyword => {
                let token = self.cursor.consume();
                Ok(Ast::Bool(BooleanLiteral::new(self.active_scope, true, token)))
            }
            TokenKind::FalseKeyword => {
                let token = self.cursor.consume();
                Ok(Ast::Bool(BooleanLiteral::new(
                    self.active_scope,
                    false,
                    token,
                )))
            }
            TokenKind::LeftParen => {
                self.cursor.consume();
                let inner = self.parse_expression(1)?;
                self.cursor.expect_consume(TokenKind::RightParen)?;
                Ok(inner)
            }
            TokenKind::CastKeyword => {
                let cast_token = self.cursor.consume();
                self.cursor.expect_consume(TokenKind::LessThan)?;
                let target = parse_type(
                    &mut self.cursor,
                    self.ctx,
                    self.active_scope,
                    &self.template_parameters,
                )?;
                self.cursor.expect_consume(TokenKind::GreaterThan)?;
                self.cursor.expect_consume(TokenKind::LeftParen)?;
                let value = self.parse_expression(1)?;
                self.cursor.expect_consume(TokenKind::RightParen)?;
                Ok(Ast::Cast(CastExpression::new(
                    self.active_scope,
                    target,
                    value,
                    cast_token,
                )))
            }
            TokenKind::LetKeyword => self.parse_variable_declaration(),
            TokenKind::ReturnKeyword => self.parse_return(),
            TokenKind::IfKeyword => self.parse_if(),
            TokenKind::Identifier => self.parse_variable_expression(),
            _ => Err(CompileError::at_token(
                ErrorKind::UnexpectedToken {
                    expected: "expression".to_string(),
                    found: self.cursor.current().text.clone(),
                },
                self.cursor.current(),
            )),
        }
    }

    fn parse_variable_expression(&mut self) -> Result<Ast, CompileError> {
        let first = self.cursor.expect_consume(TokenKind::Identifier)?;
        let mut names = vec![self.ctx.interner.intern(&first.text)];
        let mut last_token = first;
        while self.cursor.at(TokenKind::DoubleColon) {
            self.cursor.consume();
            let part = self.cursor.expect_consume(TokenKind::Identifier)?;
            names.push(self.ctx.interner.intern(&part.text));
            last_token = part;
        }

        let mut variable = VariableExpression::new(self.active_scope, names, last_token);
        if self.looks_like_template_arguments() {
            variable.template_arguments = self.parse_template_argument_list()?;
        }
        Ok(Ast::Variable(variable))
    }

    /// Decide whether a `<` after an identifier opens a template argument
    /// list: the tokens up to the matching `>` must look like types and be
    /// followed by a call.
    fn looks_like_template_arguments(&self) -> bool {
        if !self.cursor.at(TokenKind::LessThan) {
            return false;
        }
        let mut offset = 1;
        loop {
            match self.cursor.peek(offset).kind {
                TokenKind::GreaterThan => {
                    return self.cursor.peek(offset + 1).kind == TokenKind::LeftParen;
                }
                TokenKind::TypeKeyword
                | TokenKind::Identifier
                | TokenKind::DoubleColon
                | TokenKind::Star
                | TokenKind::Comma
                | TokenKind::LeftBracket
                | TokenKind::RightBracket
                | TokenKind::IntegerLiteral
                | TokenKind::RightArrow
                | TokenKind::LeftParen
                | TokenKind::RightParen => offset += 1,
                _ => return false,
            }
        }
    }

    fn find_scope_symbol(&self, scope: ScopeId, name: Name, ty: TypeId) -> Option<SymbolId> {
        self.ctx
            .scopes
            .get(scope)
            .symbols
            .iter()
            .copied()
            .find(|&id| {
                let symbol = self.ctx.symbol(id);
                symbol.name == name && symbol.ty == ty
            })
    }
}
