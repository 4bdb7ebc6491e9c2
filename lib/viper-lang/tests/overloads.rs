//! Overload resolution: weighted scoring, ambiguity, elimination

use viper_lang::diagnostics::ErrorKind;
use viper_lang::Compiler;

fn compile(src: &str) -> Result<viper_lang::CompileResult, viper_lang::CompileFailure> {
    Compiler::with_search_paths(Vec::new()).compile_source("test.vpr", src)
}

fn first_error(src: &str) -> ErrorKind {
    match compile(src) {
        Ok(_) => panic!("expected a diagnostic for: {src}"),
        Err(failure) => failure.errors.0.first().expect("at least one error").kind.clone(),
    }
}

#[test]
fn exact_match_beats_implicit_cast() {
    let result = compile(
        "func g(a: i32) -> i32 { return a; }\n\
         func g(a: i64) -> i32 { return 0; }\n\
         func main() -> i32 { let x : i32 = 1; return g(x); }",
    )
    .unwrap();
    let printed = result.module.to_string();
    assert!(printed.contains("call @_F1gI32("), "{printed}");
}

#[test]
fn earlier_positions_weigh_more() {
    // Candidate A converts the later argument, candidate B the earlier
    // one; A's score is lower so A wins.
    let result = compile(
        "func h(a: i32, b: i64) -> i32 { return a; }\n\
         func h(a: i64, b: i32) -> i32 { return b; }\n\
         func main() -> i32 {\n\
             let x : i32 = 1;\n\
             let y : i32 = 2;\n\
             return h(x, y);\n\
         }",
    )
    .unwrap();
    let printed = result.module.to_string();
    assert!(printed.contains("call @_F1hI32I64("), "{printed}");
}

#[test]
fn equal_scores_are_ambiguous() {
    let kind = first_error(
        "func f(a: i8) -> i32 { return 0; }\n\
         func f(a: i16) -> i32 { return 0; }\n\
         func main() -> i32 { let x : i32 = 1; return f(x); }",
    );
    assert!(matches!(kind, ErrorKind::AmbiguousCall { .. }), "got {kind}");
}

#[test]
fn ambiguous_despite_more_exact_matches() {
    // Both candidates score 3; the exact-match count (one vs two) is
    // deliberately not a tie-breaker.
    let kind = first_error(
        "func k(a: i32, b: i64, c: i64) -> i32 { return 0; }\n\
         func k(a: i64, b: i32, c: i32) -> i32 { return 1; }\n\
         func main() -> i32 {\n\
             let x : i32 = 1;\n\
             let y : i32 = 2;\n\
             let z : i32 = 3;\n\
             return k(x, y, z);\n\
         }",
    );
    assert!(matches!(kind, ErrorKind::AmbiguousCall { .. }), "got {kind}");
}

#[test]
fn disallowed_cast_eliminates_candidate() {
    // The bool overload is eliminated (i32 -> bool is not implicit), so
    // the i64 overload wins despite needing a conversion.
    let result = compile(
        "func p(a: bool) -> i32 { return 0; }\n\
         func p(a: i64) -> i32 { return 1; }\n\
         func main() -> i32 { let x : i32 = 1; return p(x); }",
    )
    .unwrap();
    let printed = result.module.to_string();
    assert!(printed.contains("call @_F1pI64("), "{printed}");
}

#[test]
fn no_matching_function_is_fatal() {
    let kind = first_error(
        "func only(a: bool) -> i32 { return 0; }\n\
         func main() -> i32 { let x : i32 = 1; return only(x); }",
    );
    assert!(matches!(kind, ErrorKind::NoMatchingFunction { .. }), "got {kind}");
}

#[test]
fn arity_mismatch_is_fatal() {
    let kind = first_error(
        "func two(a: i32, b: i32) -> i32 { return a; }\n\
         func main() -> i32 { return two(1); }",
    );
    assert!(matches!(kind, ErrorKind::NoMatchingFunction { .. }), "got {kind}");
}

#[test]
fn non_function_call_is_fatal() {
    let kind = first_error("func main() -> i32 { let x : i32 = 1; return x(3); }");
    assert!(matches!(kind, ErrorKind::NoMatchingFunction { .. }), "got {kind}");
}
