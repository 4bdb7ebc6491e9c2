//! Pipeline properties: token immutability, symbol id uniqueness, and
//! expression typing after the check passes

use std::collections::HashSet;

use viper_lang::ast::Ast;
use viper_lang::context::{Context, SourceId};
use viper_lang::diagnostics::Diagnostics;
use viper_lang::lexer::Lexer;
use viper_lang::parser::{Parser, SymbolParser};

const PROGRAM: &str = "\
namespace X {
    func f(a: i32) -> i32 { return a + 1; }
}
class P { public x: i32; y: i32 }
enum E { A, B = 3 }
func main() -> i32 {
    let p : P;
    let v : i32 = X::f(p.x);
    if (v == 4) { return 1; }
    return v;
}
";

fn run_pipeline(src: &str) -> (Vec<viper_lang::lexer::Token>, Context, Vec<Ast>) {
    let tokens = Lexer::new(src, SourceId(0)).lex();
    let mut ctx = Context::new();
    let root = ctx.root;
    let unit = ctx.new_scope(Some(root), None, true, None);

    SymbolParser::new(&tokens, &mut ctx, unit)
        .parse()
        .expect("symbol pass succeeds");
    let mut ast = Parser::new(&tokens, &mut ctx, unit, true)
        .parse()
        .expect("semantic pass succeeds");

    let mut diag = Diagnostics::new();
    for node in &mut ast {
        node.type_check(&mut ctx, &mut diag);
    }
    for node in &mut ast {
        node.semantic_check(&ctx, &mut diag, true);
    }
    assert!(!diag.has_errors(), "{:?}", diag.errors());

    (tokens, ctx, ast)
}

#[test]
fn token_vector_survives_all_passes() {
    let before = Lexer::new(PROGRAM, SourceId(0)).lex();
    let (after, _, _) = run_pipeline(PROGRAM);
    assert_eq!(before.len(), after.len());
    assert_eq!(before, after);
}

#[test]
fn symbol_ids_are_unique_across_the_program() {
    let (_, ctx, _) = run_pipeline(PROGRAM);
    let ids: Vec<_> = ctx.symbols.iter().map(|(id, _)| id).collect();
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(ids.len(), unique.len());
}

#[test]
fn every_expression_has_a_type_after_type_check() {
    let (_, _, mut ast) = run_pipeline(PROGRAM);

    fn walk(node: &mut Ast) {
        let is_expression = matches!(
            node,
            Ast::Binary(_)
                | Ast::Unary(_)
                | Ast::Integer(_)
                | Ast::Str(_)
                | Ast::Bool(_)
                | Ast::Variable(_)
                | Ast::Call(_)
                | Ast::Member(_)
                | Ast::Cast(_)
        );
        if is_expression {
            assert!(node.ty().is_some(), "untyped expression: {node:?}");
        }
        for child in node.contained_mut() {
            walk(child);
        }
    }

    for node in &mut ast {
        walk(node);
    }
}
