//! Pass 1: the symbol parser
//!
//! Parses one unit headers-only. Global declarations register their
//! signatures in the scope tree, function and method bodies are skipped
//! token-by-token, and type references that do not resolve yet become
//! pending placeholders. Plain imports are a no-op in this pass; they are
//! resolved again by the semantic pass.

use super::{expected_global, parse_type, Cursor};
use crate::context::{Context, Name, ScopeId};
use crate::diagnostics::CompileError;
use crate::lexer::{Token, TokenKind};
use crate::mangle;
use crate::scope::{TemplateParameter, TemplateSymbol};
use crate::types::{EnumField, StructField, StructMethod, TypeId, TypeKind};

pub struct SymbolParser<'a, 't> {
    cursor: Cursor<'t>,
    ctx: &'a mut Context,
    active_scope: ScopeId,
    template_parameters: Vec<TemplateParameter>,
}

impl<'a, 't> SymbolParser<'a, 't> {
    pub fn new(tokens: &'t [Token], ctx: &'a mut Context, unit_scope: ScopeId) -> Self {
        Self {
            cursor: Cursor::new(tokens),
            ctx,
            active_scope: unit_scope,
            template_parameters: Vec::new(),
        }
    }

    pub fn parse(mut self) -> Result<(), CompileError> {
        while !self.cursor.at_eof() {
            self.parse_global(false)?;
        }
        Ok(())
    }

    fn parse_global(&mut self, exported: bool) -> Result<(), CompileError> {
        match self.cursor.current().kind {
            TokenKind::ExportKeyword => {
                self.cursor.consume();
                // An export block applies to every nested declaration; a
                // bare export only to the next one.
                if self.cursor.at(TokenKind::LeftBrace) {
                    self.cursor.consume();
                    while !self.cursor.at(TokenKind::RightBrace) && !self.cursor.at_eof() {
                        self.parse_global(true)?;
                    }
                    self.cursor.expect_consume(TokenKind::RightBrace)?;
                    Ok(())
                } else {
                    self.parse_global(true)
                }
            }
            TokenKind::ImportKeyword => {
                self.skip_to_semicolon();
                Ok(())
            }
            TokenKind::PureKeyword => {
                self.cursor.consume();
                self.cursor.expect(TokenKind::FuncKeyword)?;
                self.parse_function(true, exported).map(|_| ())
            }
            TokenKind::FuncKeyword => self.parse_function(false, exported).map(|_| ()),
            TokenKind::ClassKeyword => self.parse_class(exported),
            TokenKind::EnumKeyword => self.parse_enum(exported),
            TokenKind::NamespaceKeyword => self.parse_namespace(exported),
            TokenKind::TemplateKeyword => self.parse_template(exported),
            TokenKind::EndOfFile => {
                self.cursor.consume();
                Ok(())
            }
            _ => Err(expected_global(self.cursor.current())),
        }
    }

    /// Parse a function header and skip its body. Explicit template
    /// specializations (`func f<...>`) are left for the semantic pass.
    fn parse_function(
        &mut self,
        pure: bool,
        exported: bool,
    ) -> Result<Option<crate::context::SymbolId>, CompileError> {
        self.cursor.consume(); // func
        let name_token = self.cursor.expect_consume(TokenKind::Identifier)?;
        let name = self.ctx.interner.intern(&name_token.text);

        let specialization = self.cursor.at(TokenKind::LessThan);
        if specialization {
            self.skip_template_arguments()?;
        }

        let (_, argument_types) = self.parse_signature_arguments()?;
        self.cursor.expect_consume(TokenKind::RightArrow)?;
        let return_type = parse_type(
            &mut self.cursor,
            self.ctx,
            self.active_scope,
            &self.template_parameters,
        )?;
        let function_type = self.ctx.types.function_of(return_type, argument_types);

        if self.cursor.at(TokenKind::Semicolon) {
            self.cursor.consume();
        } else {
            self.skip_body()?;
        }

        if specialization {
            return Ok(None);
        }

        let symbol = self.ctx.declare_symbol(self.active_scope, name, function_type);
        self.ctx.symbol_mut(symbol).pure = pure;
        self.ctx.symbol_mut(symbol).exported = exported;
        Ok(Some(symbol))
    }

    fn parse_signature_arguments(&mut self) -> Result<(Vec<Name>, Vec<TypeId>), CompileError> {
        self.cursor.expect_consume(TokenKind::LeftParen)?;
        let mut names = Vec::new();
        let mut types = Vec::new();
        while !self.cursor.at(TokenKind::RightParen) {
            let name_token = self.cursor.expect_consume(TokenKind::Identifier)?;
            names.push(self.ctx.interner.intern(&name_token.text));
            self.cursor.expect_consume(TokenKind::Colon)?;
            types.push(parse_type(
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
        Ok((names, types))
    }

    fn parse_class(&mut self, exported: bool) -> Result<(), CompileError> {
        let class_token = self.cursor.consume(); // class
        let name_token = self.cursor.expect_consume(TokenKind::Identifier)?;
        let name = self.ctx.interner.intern(&name_token.text);

        let class_scope = match self.ctx.find_child_namespace(self.active_scope, name) {
            Some(scope) => scope,
            None => self
                .ctx
                .new_scope(Some(self.active_scope), Some(name), true, None),
        };

        // The class type must exist before the members parse so methods can
        // take `this` pointers at it.
        let mut components = self.ctx.namespaces(self.active_scope);
        components.push(name);
        let key_text = mangle::type_key(&self.ctx.interner, &components);
        let key = self.ctx.interner.intern(&key_text);

        let ty = match self.ctx.types.get(key) {
            Some(existing) => {
                if matches!(self.ctx.types.kind(existing), TypeKind::Struct(_)) {
                    self.ctx.types.reclassify_to_pending(existing, class_token);
                }
                existing
            }
            None => self
                .ctx
                .types
                .create_pending(key, class_token, components.clone()),
        };
        self.ctx.scopes.get_mut(class_scope).owner = Some(ty);

        let symbol = self.ctx.declare_symbol(self.active_scope, name, ty);
        self.ctx.symbol_mut(symbol).exported = exported;

        let this_type = self.ctx.types.pointer_to(ty);

        self.cursor.expect_consume(TokenKind::LeftBrace)?;
        let mut fields = Vec::new();
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
                self.cursor.consume();
                let method_token = self.cursor.expect_consume(TokenKind::Identifier)?;
                let method_name = self.ctx.interner.intern(&method_token.text);
                let (_, mut argument_types) = self.parse_signature_arguments()?;
                self.cursor.expect_consume(TokenKind::RightArrow)?;
                let return_type = parse_type(
                    &mut self.cursor,
                    self.ctx,
                    self.active_scope,
                    &self.template_parameters,
                )?;
                argument_types.insert(0, this_type);
                let method_type = self.ctx.types.function_of(return_type, argument_types);

                if self.cursor.at(TokenKind::Semicolon) {
                    self.cursor.consume();
                } else {
                    self.skip_body()?;
                }

                let method_symbol = self.ctx.declare_symbol(class_scope, method_name, method_type);
                self.ctx.symbol_mut(method_symbol).pure = pure;
                self.ctx.symbol_mut(method_symbol).exported = exported;
                methods.push(StructMethod {
                    private,
                    name: method_name,
                    ty: method_type,
                });
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
                fields.push(StructField {
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

        self.ctx.types.set_fields_and_methods(ty, fields, methods);
        Ok(())
    }

    fn parse_enum(&mut self, exported: bool) -> Result<(), CompileError> {
        self.cursor.consume(); // enum
        let name_token = self.cursor.expect_consume(TokenKind::Identifier)?;
        let name = self.ctx.interner.intern(&name_token.text);

        let own_scope = match self.ctx.find_child_namespace(self.active_scope, name) {
            Some(scope) => scope,
            None => self
                .ctx
                .new_scope(Some(self.active_scope), Some(name), true, None),
        };

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
        let mut fields = Vec::new();
        let mut next_value = 0i64;
        while !self.cursor.at(TokenKind::RightBrace) && !self.cursor.at_eof() {
            let field_token = self.cursor.expect_consume(TokenKind::Identifier)?;
            let field_name = self.ctx.interner.intern(&field_token.text);
            // Explicit ordinal, or the previous one plus one.
            if self.cursor.at(TokenKind::Equals) {
                self.cursor.consume();
                let value_token = self.cursor.expect_consume(TokenKind::IntegerLiteral)?;
                next_value = value_token.text.parse::<i64>().unwrap_or(next_value);
            }
            fields.push(EnumField {
                name: field_name,
                value: next_value,
            });
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
            Some(existing) => {
                self.ctx.types.init_enum(existing, base);
                existing
            }
            None => self.ctx.types.create_enum(key, components, base, fields.clone()),
        };

        let symbol = self.ctx.declare_symbol(self.active_scope, name, ty);
        self.ctx.symbol_mut(symbol).exported = exported;
        for field in &fields {
            let member = self.ctx.declare_symbol(own_scope, field.name, ty);
            self.ctx.symbol_mut(member).exported = exported;
        }
        Ok(())
    }

    fn parse_namespace(&mut self, exported: bool) -> Result<(), CompileError> {
        self.cursor.consume(); // namespace
        let name_token = self.cursor.expect_consume(TokenKind::Identifier)?;
        let name = self.ctx.interner.intern(&name_token.text);

        let scope = match self.ctx.find_child_namespace(self.active_scope, name) {
            Some(scope) => scope,
            None => self
                .ctx
                .new_scope(Some(self.active_scope), Some(name), true, None),
        };

        self.cursor.expect_consume(TokenKind::LeftBrace)?;
        let previous = self.active_scope;
        self.active_scope = scope;
        while !self.cursor.at(TokenKind::RightBrace) && !self.cursor.at_eof() {
            self.parse_global(exported)?;
        }
        self.active_scope = previous;
        self.cursor.expect_consume(TokenKind::RightBrace)?;
        Ok(())
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

        self.template_parameters = parameters.clone();
        let symbol = self.parse_function(pure, exported)?;
        self.template_parameters.clear();

        if let Some(symbol) = symbol {
            self.ctx.symbol_mut(symbol).template = Some(TemplateSymbol {
                parameters,
                body: None,
                instantiations: Vec::new(),
            });
        }
        Ok(())
    }

    fn skip_to_semicolon(&mut self) {
        while !self.cursor.at(TokenKind::Semicolon) && !self.cursor.at_eof() {
            self.cursor.consume();
        }
        if self.cursor.at(TokenKind::Semicolon) {
            self.cursor.consume();
        }
    }

    /// Skip a `{ ... }` body, tracking brace depth.
    fn skip_body(&mut self) -> Result<(), CompileError> {
        self.cursor.expect_consume(TokenKind::LeftBrace)?;
        let mut depth = 1usize;
        while depth > 0 && !self.cursor.at_eof() {
            match self.cursor.current().kind {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => depth -= 1,
                _ => {}
            }
            self.cursor.consume();
        }
        Ok(())
    }

    fn skip_template_arguments(&mut self) -> Result<(), CompileError> {
        self.cursor.expect_consume(TokenKind::LessThan)?;
        let mut depth = 1usize;
        while depth > 0 && !self.cursor.at_eof() {
            match self.cursor.current().kind {
                TokenKind::LessThan => depth += 1,
                TokenKind::GreaterThan => depth -= 1,
                _ => {}
            }
            self.cursor.consume();
        }
        Ok(())
    }
}
