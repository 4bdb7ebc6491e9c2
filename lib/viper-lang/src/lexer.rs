//! Lexical analysis
//!
//! Turns the text of one compilation unit into an ordered token vector. Every
//! token carries its kind, its text and a `(start, end)` source location
//! pair; the stream is terminated by a synthetic [`TokenKind::EndOfFile`]
//! token.

use logos::Logos;

use crate::context::SourceId;

/// A point in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub source: SourceId,
    pub line: u32,
    pub column: u32,
    /// Byte offset into the file, used for diagnostic rendering.
    pub offset: u32,
}

impl SourceLocation {
    pub fn synthetic() -> Self {
        Self {
            source: SourceId(0),
            line: 0,
            column: 0,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Error,

    Identifier,
    IntegerLiteral,
    StringLiteral,
    /// A builtin type name recognized by the lexer (`i32`, `bool`, ...).
    TypeKeyword,

    FuncKeyword,
    PureKeyword,
    ClassKeyword,
    NamespaceKeyword,
    EnumKeyword,
    ExportKeyword,
    ImportKeyword,
    TemplateKeyword,
    TypenameKeyword,
    LetKeyword,
    ReturnKeyword,
    IfKeyword,
    ElseKeyword,
    CastKeyword,
    TrueKeyword,
    FalseKeyword,
    PublicKeyword,

    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semicolon,
    Comma,
    Colon,
    DoubleColon,
    Dot,
    RightArrow,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,
    DoubleEquals,
    BangEquals,
    Equals,
    Plus,
    Minus,
    Star,
    Slash,
    Ampersand,
    Bang,

    EndOfFile,
}

impl TokenKind {
    /// The spelling quoted by "expected token" diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Error => "invalid token",
            TokenKind::Identifier => "identifier",
            TokenKind::IntegerLiteral => "integer literal",
            TokenKind::StringLiteral => "string literal",
            TokenKind::TypeKeyword => "type name",
            TokenKind::FuncKeyword => "func",
            TokenKind::PureKeyword => "pure",
            TokenKind::ClassKeyword => "class",
            TokenKind::NamespaceKeyword => "namespace",
            TokenKind::EnumKeyword => "enum",
            TokenKind::ExportKeyword => "export",
            TokenKind::ImportKeyword => "import",
            TokenKind::TemplateKeyword => "template",
            TokenKind::TypenameKeyword => "typename",
            TokenKind::LetKeyword => "let",
            TokenKind::ReturnKeyword => "return",
            TokenKind::IfKeyword => "if",
            TokenKind::ElseKeyword => "else",
            TokenKind::CastKeyword => "cast",
            TokenKind::TrueKeyword => "true",
            TokenKind::FalseKeyword => "false",
            TokenKind::PublicKeyword => "public",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::DoubleColon => "::",
            TokenKind::Dot => ".",
            TokenKind::RightArrow => "->",
            TokenKind::LessThan => "<",
            TokenKind::GreaterThan => ">",
            TokenKind::LessEqual => "<=",
            TokenKind::GreaterEqual => ">=",
            TokenKind::DoubleEquals => "==",
            TokenKind::BangEquals => "!=",
            TokenKind::Equals => "=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Ampersand => "&",
            TokenKind::Bang => "!",
            TokenKind::EndOfFile => "end of file",
        }
    }
}

/// Ordered input to the parser. Immutable after lexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl Token {
    pub fn synthetic(kind: TokenKind) -> Self {
        Self {
            kind,
            text: String::new(),
            start: SourceLocation::synthetic(),
            end: SourceLocation::synthetic(),
        }
    }
}

#[derive(Logos, Debug, PartialEq, Clone, Copy)]
#[logos(skip r"[ \t\r\n\f]+", skip r"//[^\n]*")]
enum RawToken {
    #[token("func")]
    Func,
    #[token("pure")]
    Pure,
    #[token("class")]
    Class,
    #[token("namespace")]
    Namespace,
    #[token("enum")]
    Enum,
    #[token("export")]
    Export,
    #[token("import")]
    Import,
    #[token("template")]
    Template,
    #[token("typename")]
    Typename,
    #[token("let")]
    Let,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("cast")]
    Cast,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("public")]
    Public,

    #[token("i8")]
    #[token("i16")]
    #[token("i32")]
    #[token("i64")]
    #[token("u8")]
    #[token("u16")]
    #[token("u32")]
    #[token("u64")]
    #[token("bool")]
    #[token("void")]
    #[token("string")]
    Type,

    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token("::")]
    DoubleColon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("->")]
    RightArrow,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("<")]
    LessThan,
    #[token(">")]
    GreaterThan,
    #[token("==")]
    DoubleEquals,
    #[token("!=")]
    BangEquals,
    #[token("=")]
    Equals,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("&")]
    Ampersand,
    #[token("!")]
    Bang,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", priority = 2)]
    Identifier,
    #[regex(r"[0-9]+")]
    Integer,
    #[regex(r#""([^"\\]|\\.)*""#)]
    String,
}

fn kind_of(raw: RawToken) -> TokenKind {
    match raw {
        RawToken::Func => TokenKind::FuncKeyword,
        RawToken::Pure => TokenKind::PureKeyword,
        RawToken::Class => TokenKind::ClassKeyword,
        RawToken::Namespace => TokenKind::NamespaceKeyword,
        RawToken::Enum => TokenKind::EnumKeyword,
        RawToken::Export => TokenKind::ExportKeyword,
        RawToken::Import => TokenKind::ImportKeyword,
        RawToken::Template => TokenKind::TemplateKeyword,
        RawToken::Typename => TokenKind::TypenameKeyword,
        RawToken::Let => TokenKind::LetKeyword,
        RawToken::Return => TokenKind::ReturnKeyword,
        RawToken::If => TokenKind::IfKeyword,
        RawToken::Else => TokenKind::ElseKeyword,
        RawToken::Cast => TokenKind::CastKeyword,
        RawToken::True => TokenKind::TrueKeyword,
        RawToken::False => TokenKind::FalseKeyword,
        RawToken::Public => TokenKind::PublicKeyword,
        RawToken::Type => TokenKind::TypeKeyword,
        RawToken::LeftParen => TokenKind::LeftParen,
        RawToken::RightParen => TokenKind::RightParen,
        RawToken::LeftBrace => TokenKind::LeftBrace,
        RawToken::RightBrace => TokenKind::RightBrace,
        RawToken::LeftBracket => TokenKind::LeftBracket,
        RawToken::RightBracket => TokenKind::RightBracket,
        RawToken::Semicolon => TokenKind::Semicolon,
        RawToken::Comma => TokenKind::Comma,
        RawToken::DoubleColon => TokenKind::DoubleColon,
        RawToken::Colon => TokenKind::Colon,
        RawToken::Dot => TokenKind::Dot,
        RawToken::RightArrow => TokenKind::RightArrow,
        RawToken::LessEqual => TokenKind::LessEqual,
        RawToken::GreaterEqual => TokenKind::GreaterEqual,
        RawToken::LessThan => TokenKind::LessThan,
        RawToken::GreaterThan => TokenKind::GreaterThan,
        RawToken::DoubleEquals => TokenKind::DoubleEquals,
        RawToken::BangEquals => TokenKind::BangEquals,
        RawToken::Equals => TokenKind::Equals,
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Ampersand => TokenKind::Ampersand,
        RawToken::Bang => TokenKind::Bang,
        RawToken::Identifier => TokenKind::Identifier,
        RawToken::Integer => TokenKind::IntegerLiteral,
        RawToken::String => TokenKind::StringLiteral,
    }
}

/// Lexes one unit into a token vector ending with `EndOfFile`.
pub struct Lexer<'src> {
    text: &'src str,
    source: SourceId,
    line_starts: Vec<u32>,
}

impl<'src> Lexer<'src> {
    pub fn new(text: &'src str, source: SourceId) -> Self {
        let mut line_starts = vec![0u32];
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx as u32 + 1);
            }
        }
        Self {
            text,
            source,
            line_starts,
        }
    }

    fn location(&self, offset: u32) -> SourceLocation {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line - 1,
        };
        SourceLocation {
            source: self.source,
            line: line as u32 + 1,
            column: offset - self.line_starts[line] + 1,
            offset,
        }
    }

    pub fn lex(&self) -> Vec<Token> {
        let mut tokens = Vec::new();

        for (raw, span) in RawToken::lexer(self.text).spanned() {
            let start = self.location(span.start as u32);
            let end = self.location(span.end as u32);
            let (kind, text) = match raw {
                Ok(raw) => {
                    let slice = &self.text[span.clone()];
                    // Strip the quotes off string literals, keeping escapes.
                    let text = if raw == RawToken::String {
                        unescape(&slice[1..slice.len() - 1])
                    } else {
                        slice.to_string()
                    };
                    (kind_of(raw), text)
                }
                Err(()) => (TokenKind::Error, self.text[span.clone()].to_string()),
            };
            tokens.push(Token {
                kind,
                text,
                start,
                end,
            });
        }

        let eof = self.location(self.text.len() as u32);
        tokens.push(Token {
            kind: TokenKind::EndOfFile,
            text: String::new(),
            start: eof,
            end: eof,
        });

        tokens
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, SourceId(0))
            .lex()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lex_function_header() {
        assert_eq!(
            kinds("func main() -> i32 {"),
            vec![
                TokenKind::FuncKeyword,
                TokenKind::Identifier,
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::RightArrow,
                TokenKind::TypeKeyword,
                TokenKind::LeftBrace,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn lex_compound_punctuation() {
        assert_eq!(
            kinds(":: -> <= >= == != < >"),
            vec![
                TokenKind::DoubleColon,
                TokenKind::RightArrow,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::DoubleEquals,
                TokenKind::BangEquals,
                TokenKind::LessThan,
                TokenKind::GreaterThan,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn lex_locations_track_lines() {
        let tokens = Lexer::new("func\nmain", SourceId(0)).lex();
        assert_eq!(tokens[0].start.line, 1);
        assert_eq!(tokens[1].start.line, 2);
        assert_eq!(tokens[1].start.column, 1);
    }

    #[test]
    fn lex_string_literal_unescapes() {
        let tokens = Lexer::new(r#""hi\n""#, SourceId(0)).lex();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, "hi\n");
    }

    #[test]
    fn lex_comments_are_skipped() {
        assert_eq!(
            kinds("// nothing\nlet x"),
            vec![
                TokenKind::LetKeyword,
                TokenKind::Identifier,
                TokenKind::EndOfFile
            ]
        );
    }
}
