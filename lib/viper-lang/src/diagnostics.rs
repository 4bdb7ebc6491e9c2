//! Diagnostic collection and reporting
//!
//! Fatal diagnostics are [`CompileError`] values; the parser propagates them
//! with `?`, while the check passes collect them into a [`Diagnostics`] sink
//! and the driver surfaces the aggregated flag after each pass. Rendering
//! goes through Ariadne.

use std::ops::Range;

use ariadne::{Label, Report, ReportKind};
use thiserror::Error;

use crate::context::SourceMap;
use crate::lexer::{SourceLocation, Token};

/// A source range, usually taken from a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl Span {
    pub fn of(token: &Token) -> Self {
        Self {
            start: token.start,
            end: token.end,
        }
    }

    pub fn synthetic() -> Self {
        Self {
            start: SourceLocation::synthetic(),
            end: SourceLocation::synthetic(),
        }
    }

    fn range(&self) -> Range<usize> {
        self.start.offset as usize..self.end.offset as usize
    }
}

/// The specific kind of fatal diagnostic.
#[derive(Debug, Clone, Error)]
pub enum ErrorKind {
    #[error("Expected '{expected}', found '{found}'")]
    UnexpectedToken { expected: String, found: String },

    #[error("Expected global expression. Found '{found}'")]
    ExpectedGlobal { found: String },

    #[error("could not find imported file '{path}'")]
    UnresolvedImport { path: String },

    #[error("undeclared identifier '{name}'")]
    UndeclaredIdentifier { name: String },

    #[error("no matching function for call to '{name}()'")]
    NoMatchingFunction { name: String },

    #[error("call to '{name}()' is ambiguous")]
    AmbiguousCall { name: String },

    #[error("'{name}' cannot be used as a function")]
    NotAFunction { name: String },

    #[error("'operator->' used on non-pointer value '{value}'")]
    ArrowOnNonPointer { value: String },

    #[error("'operator->' used on non-pointer-to-struct value '{value}'")]
    ArrowOnNonStruct { value: String },

    #[error("'operator.' used on non-struct value '{value}'")]
    DotOnNonStruct { value: String },

    #[error("'class {class}' has no member named '{member}'")]
    NoSuchMember { class: String, member: String },

    #[error("'{member}' is a private member of class '{class}'")]
    PrivateMember { class: String, member: String },

    #[error("may not create object of type '{ty}'")]
    NotAnObjectType { ty: String },

    #[error("object '{name}' has unknown type")]
    UnknownObjectType { name: String },

    #[error("value of type '{value}' is not compatible with variable of type '{variable}'")]
    IncompatibleTypes { value: String, variable: String },

    #[error("cannot cast value of type '{from}' to '{to}'")]
    InvalidCast { from: String, to: String },

    #[error("invalid operands to binary expression ('{lhs}' and '{rhs}')")]
    InvalidOperands { lhs: String, rhs: String },

    #[error("invalid operand to unary expression ('{ty}')")]
    InvalidUnaryOperand { ty: String },

    #[error("cannot take the address of this expression")]
    NotAddressable,

    #[error("cannot dereference value of type '{ty}'")]
    NotDereferenceable { ty: String },

    #[error("expression is not assignable")]
    NotAssignable,

    #[error("'return' statement used as an expression")]
    ReturnAsExpression,

    #[error("could not find templated function '{name}' in scope")]
    NoTemplatedFunction { name: String },

    #[error("wrong number of template parameters for '{name}': expected {expected}, found {actual}")]
    TemplateParameterMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("unknown type name '{name}'")]
    UnknownTypeName { name: String },
}

/// A fatal diagnostic with its source location.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub span: Span,
}

impl CompileError {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn at_token(kind: ErrorKind, token: &Token) -> Self {
        Self::new(kind, Span::of(token))
    }

    /// Generate an Ariadne report for terminal rendering.
    pub fn report(&self, sources: &SourceMap) -> Report<'static, (String, Range<usize>)> {
        let path = sources.path(self.span.start.source).display().to_string();
        Report::build(ReportKind::Error, path.clone(), self.span.range().start)
            .with_message(self.kind.to_string())
            .with_label(Label::new((path, self.span.range())).with_message(self.kind.to_string()))
            .finish()
    }

    pub fn eprint(&self, sources: &SourceMap) {
        let cache = ariadne::sources(
            sources
                .iter()
                .map(|(_, path, text)| (path.display().to_string(), text.to_string())),
        );
        // Rendering failures only lose the pretty output, not the message.
        if self.report(sources).eprint(cache).is_err() {
            eprintln!("error: {}", self.kind);
        }
    }
}

/// Collection of fatal diagnostics.
#[derive(Debug, Default)]
pub struct CompileErrors(pub Vec<CompileError>);

impl CompileErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn eprint(&self, sources: &SourceMap) {
        for error in &self.0 {
            error.eprint(sources);
        }
    }
}

impl From<CompileError> for CompileErrors {
    fn from(err: CompileError) -> Self {
        Self(vec![err])
    }
}

/// A non-fatal diagnostic.
#[derive(Debug, Clone)]
pub struct CompileWarning {
    pub category: &'static str,
    pub message: String,
    pub span: Span,
}

/// The sink the check passes report into.
///
/// Fatal reports set an aggregated flag rather than unwinding, so a pass can
/// keep visiting nodes after the first error; the driver checks the flag
/// after the pass.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<CompileError>,
    warnings: Vec<CompileWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_compiler_error(&mut self, kind: ErrorKind, span: Span) {
        self.errors.push(CompileError::new(kind, span));
    }

    pub fn compiler_warning(&mut self, category: &'static str, span: Span, message: String) {
        self.warnings.push(CompileWarning {
            category,
            message,
            span,
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[CompileWarning] {
        &self.warnings
    }

    pub fn take_errors(&mut self) -> CompileErrors {
        CompileErrors(std::mem::take(&mut self.errors))
    }

    pub fn take_warnings(&mut self) -> Vec<CompileWarning> {
        std::mem::take(&mut self.warnings)
    }
}
