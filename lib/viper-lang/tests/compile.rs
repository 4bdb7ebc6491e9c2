//! Integration tests: full single-unit pipeline (lex → symbol pass →
//! semantic pass → type check → semantic check → IR emission)

use viper_lang::diagnostics::ErrorKind;
use viper_lang::Compiler;

fn compile(src: &str) -> Result<viper_lang::CompileResult, viper_lang::CompileFailure> {
    Compiler::with_search_paths(Vec::new()).compile_source("test.vpr", src)
}

fn compile_ok(src: &str) -> viper_lang::CompileResult {
    match compile(src) {
        Ok(result) => result,
        Err(failure) => panic!("expected success, got {:?}", failure.errors.0),
    }
}

fn first_error(src: &str) -> ErrorKind {
    match compile(src) {
        Ok(_) => panic!("expected a diagnostic for: {src}"),
        Err(failure) => failure.errors.0.first().expect("at least one error").kind.clone(),
    }
}

#[test]
fn main_returns_constant() {
    let result = compile_ok("func main() -> i32 { return 0; }");
    let printed = result.module.to_string();
    assert!(printed.contains("func @main() -> i32"), "{printed}");
    assert!(printed.contains("ret i32 0"), "{printed}");
    // A single basic block.
    assert_eq!(printed.matches("label").count(), 1, "{printed}");
    assert!(result.warnings.is_empty());
}

#[test]
fn namespace_qualified_call_is_mangled() {
    let result = compile_ok(
        "namespace X { func f(a: i32) -> i32 { return a; } }\n\
         func main() -> i32 { return X::f(3); }",
    );
    let printed = result.module.to_string();
    assert!(printed.contains("func @_F1X1fI32"), "{printed}");
    assert!(printed.contains("call @_F1X1fI32"), "{printed}");
}

#[test]
fn private_member_access_is_fatal() {
    let kind = first_error(
        "class P { public x: i32; y: i32 }\n\
         func main() -> i32 { let p : P; return p.y; }",
    );
    match kind {
        ErrorKind::PrivateMember { class, member } => {
            assert_eq!(class, "P");
            assert_eq!(member, "y");
        }
        other => panic!("expected a private-member error, got {other}"),
    }
}

#[test]
fn public_member_access_compiles() {
    let result = compile_ok(
        "class P { public x: i32; y: i32 }\n\
         func main() -> i32 { let p : P; return p.x; }",
    );
    let printed = result.module.to_string();
    assert!(printed.contains("gep"), "{printed}");
}

#[test]
fn overloads_disambiguate_by_arity() {
    let result = compile_ok(
        "func g(a: i32) -> i32 { return a; }\n\
         func g(a: i32, b: i32) -> i32 { return a + b; }\n\
         func main() -> i32 { return g(1); }",
    );
    let printed = result.module.to_string();
    assert!(printed.contains("call @_F1gI32("), "{printed}");
}

#[test]
fn explicit_specialization_is_cached() {
    let result = compile_ok(
        "template<T: typename> func id(x: T) -> T { return x; }\n\
         func id<i32>(x: i32) -> i32 { return x; }\n\
         func main() -> i32 { return id<i32>(5); }",
    );
    let printed = result.module.to_string();
    // The parse-time specialization is reused; no second clone appears.
    assert_eq!(printed.matches("func @_F2idI32(").count(), 1, "{printed}");
}

#[test]
fn template_instantiates_on_demand() {
    let result = compile_ok(
        "template<T: typename> func id(x: T) -> T { return x; }\n\
         func main() -> i32 { return id<i32>(7); }",
    );
    let printed = result.module.to_string();
    assert!(printed.contains("func @_F2idI32("), "{printed}");
    assert!(printed.contains("call @_F2idI32"), "{printed}");
}

#[test]
fn template_argument_count_mismatch_is_fatal() {
    let kind = first_error(
        "template<T: typename> func id(x: T) -> T { return x; }\n\
         func main() -> i32 { return id<i32, i64>(5); }",
    );
    assert!(
        matches!(kind, ErrorKind::TemplateParameterMismatch { .. }),
        "got {kind}"
    );
}

#[test]
fn specialization_without_generic_is_fatal() {
    let kind = first_error("func id<i32>(x: i32) -> i32 { return x; }");
    assert!(matches!(kind, ErrorKind::NoTemplatedFunction { .. }), "got {kind}");
}

#[test]
fn undeclared_identifier_is_fatal() {
    let kind = first_error("func main() -> i32 { return missing; }");
    match kind {
        ErrorKind::UndeclaredIdentifier { name } => assert_eq!(name, "missing"),
        other => panic!("expected undeclared identifier, got {other}"),
    }
}

#[test]
fn unknown_type_name_is_fatal() {
    let kind = first_error("func main() -> i32 { let x : Mystery; return 0; }");
    match kind {
        ErrorKind::UnknownTypeName { name } => assert_eq!(name, "Mystery"),
        other => panic!("expected unknown type name, got {other}"),
    }
}

#[test]
fn dot_on_non_struct_is_fatal() {
    let kind = first_error("func main() -> i32 { let x : i32; return x.y; }");
    assert!(matches!(kind, ErrorKind::DotOnNonStruct { .. }), "got {kind}");
}

#[test]
fn incompatible_initializer_is_fatal() {
    let kind = first_error("func main() -> i32 { let b : bool = 5; return 0; }");
    assert!(matches!(kind, ErrorKind::IncompatibleTypes { .. }), "got {kind}");
}

#[test]
fn void_variable_is_fatal() {
    let kind = first_error("func main() -> i32 { let v : void; return 0; }");
    assert!(matches!(kind, ErrorKind::NotAnObjectType { .. }), "got {kind}");
}

#[test]
fn return_literal_adapts_to_return_type() {
    let result = compile_ok("func f() -> i64 { return 5; } func main() -> i32 { return 0; }");
    let printed = result.module.to_string();
    assert!(printed.contains("ret i64 5"), "{printed}");
}

#[test]
fn pure_call_as_statement_warns() {
    let result = compile_ok(
        "pure func f(a: i32) -> i32 { return a; }\n\
         func main() -> i32 { f(1); return 0; }",
    );
    assert!(
        result
            .warnings
            .iter()
            .any(|w| w.category == "unused" && w.message == "statement has no effect"),
        "warnings: {:?}",
        result.warnings
    );
}

#[test]
fn discarded_expression_warns() {
    let result = compile_ok("func main() -> i32 { let x : i32 = 1; x + 2; return 0; }");
    assert!(
        result
            .warnings
            .iter()
            .any(|w| w.message == "expression result unused"),
        "warnings: {:?}",
        result.warnings
    );
}

#[test]
fn if_statement_emits_branches() {
    let result = compile_ok(
        "func main() -> i32 {\n\
             let x : i32 = 1;\n\
             if (x == 1) { return 2; } else { return 3; }\n\
             return 0;\n\
         }",
    );
    let printed = result.module.to_string();
    assert!(printed.contains("cmp eq"), "{printed}");
    assert!(printed.contains("br "), "{printed}");
}

#[test]
fn assignment_stores_through_variable() {
    let result = compile_ok("func main() -> i32 { let x : i32 = 1; x = 2; return x; }");
    let printed = result.module.to_string();
    assert!(printed.contains("store"), "{printed}");
}

#[test]
fn explicit_cast_between_integers() {
    let result = compile_ok(
        "func main() -> i32 { let wide : i64 = 9; return cast<i32>(wide); }",
    );
    let printed = result.module.to_string();
    assert!(printed.contains("intcast"), "{printed}");
    // Narrowing through an explicit cast stays warning-free.
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
}

#[test]
fn enum_members_resolve_qualified() {
    let result = compile_ok(
        "enum Color { Red, Green = 5, Blue }\n\
         func main() -> i32 { return cast<i32>(Color::Blue); }",
    );
    let printed = result.module.to_string();
    assert!(printed.contains("ret"), "{printed}");
}

#[test]
fn method_call_passes_this() {
    let result = compile_ok(
        "class Counter {\n\
             value: i32\n\
             public func get(extra: i32) -> i32 { return value + extra; }\n\
         }\n\
         func main() -> i32 { let c : Counter; return c.get(1); }",
    );
    let printed = result.module.to_string();
    assert!(printed.contains("_F7Counter3get"), "{printed}");
}

#[test]
fn bodyless_function_is_a_declaration() {
    let result = compile_ok(
        "func external(a: i32) -> i32;\n\
         func main() -> i32 { return external(4); }",
    );
    let printed = result.module.to_string();
    assert!(printed.contains("func @_F8externalI32(i32 %0) -> i32;"), "{printed}");
}

#[test]
fn self_referential_class_compiles() {
    let result = compile_ok(
        "class Node { public next: Node*; public value: i32 }\n\
         func main() -> i32 { let n : Node; return n.value; }",
    );
    let printed = result.module.to_string();
    assert!(printed.contains("i8*"), "{printed}");
}
