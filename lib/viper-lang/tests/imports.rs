//! Multi-unit integration tests
//!
//! Real files in temporary project directories: import resolution, pending
//! type completion across units, export chains and visibility pruning.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use viper_lang::diagnostics::ErrorKind;
use viper_lang::Compiler;

fn compile_root(root: &Path) -> Result<viper_lang::CompileResult, viper_lang::CompileFailure> {
    Compiler::with_search_paths(Vec::new()).compile_file(root)
}

#[test]
fn imported_class_completes_pending_type() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("a.vpr"),
        "export class K { public v: i32 }\n",
    )
    .unwrap();
    fs::write(
        temp.path().join("b.vpr"),
        "import a;\nfunc main() -> i32 { let k : K; return k.v; }\n",
    )
    .unwrap();

    let result = compile_root(&temp.path().join("b.vpr"));
    let result = result.unwrap_or_else(|f| panic!("expected success: {:?}", f.errors.0));
    let printed = result.module.to_string();
    assert!(printed.contains("func @main"), "{printed}");
    assert!(printed.contains("gep"), "{printed}");
}

#[test]
fn imported_function_is_callable() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("util.vpr"),
        "export func double(a: i32) -> i32 { return a + a; }\n",
    )
    .unwrap();
    fs::write(
        temp.path().join("main.vpr"),
        "import util;\nfunc main() -> i32 { return double(21); }\n",
    )
    .unwrap();

    let result = compile_root(&temp.path().join("main.vpr")).unwrap();
    let printed = result.module.to_string();
    assert!(printed.contains("call @_F6doubleI32"), "{printed}");
}

#[test]
fn export_import_chain_reaches_root() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("leaf.vpr"),
        "export func answer() -> i32 { return 42; }\n",
    )
    .unwrap();
    fs::write(temp.path().join("mid.vpr"), "export import leaf;\n").unwrap();
    fs::write(
        temp.path().join("root.vpr"),
        "import mid;\nfunc main() -> i32 { return answer(); }\n",
    )
    .unwrap();

    let result = compile_root(&temp.path().join("root.vpr"));
    assert!(result.is_ok(), "{:?}", result.err().map(|f| f.errors.0));
}

#[test]
fn export_records_evaluate_against_the_root() {
    use viper_lang::imports::{Export, Import, ImportManager};
    let root = std::path::PathBuf::from("/p/root.vpr");
    let mid = std::path::PathBuf::from("/p/mid.vpr");
    let leaf = std::path::PathBuf::from("/p/leaf.vpr");

    let mut manager = ImportManager::new(Vec::new());
    manager.imports.push(Import {
        from: mid.clone(),
        imported_by: root.clone(),
        exported: false,
    });
    manager.imports.push(Import {
        from: leaf.clone(),
        imported_by: mid.clone(),
        exported: true,
    });

    let visible = Export {
        exported_from: leaf.clone(),
        symbol: None,
        exported_to: Some(mid.clone()),
    };
    assert!(manager.was_exported_to(&root, &visible));

    let stranded = Export {
        exported_from: std::path::PathBuf::from("/p/other.vpr"),
        symbol: None,
        exported_to: None,
    };
    assert!(!manager.was_exported_to(&root, &stranded));
}

#[test]
fn plain_import_chain_is_not_visible_at_root() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("leaf.vpr"),
        "export func answer() -> i32 { return 42; }\n",
    )
    .unwrap();
    // A plain import does not re-export leaf to mid's importers.
    fs::write(temp.path().join("mid.vpr"), "import leaf;\n").unwrap();
    fs::write(
        temp.path().join("root.vpr"),
        "import mid;\nfunc main() -> i32 { return answer(); }\n",
    )
    .unwrap();

    let failure = compile_root(&temp.path().join("root.vpr"))
        .err()
        .expect("leaf must not be visible at the root");
    assert!(
        failure
            .errors
            .0
            .iter()
            .any(|e| matches!(e.kind, ErrorKind::NoMatchingFunction { .. })),
        "{:?}",
        failure.errors.0
    );
}

#[test]
fn non_exported_symbols_are_pruned() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("a.vpr"),
        "func hidden() -> i32 { return 1; }\nexport func shown() -> i32 { return 2; }\n",
    )
    .unwrap();
    fs::write(
        temp.path().join("b.vpr"),
        "import a;\nfunc main() -> i32 { return hidden(); }\n",
    )
    .unwrap();

    let failure = compile_root(&temp.path().join("b.vpr"))
        .err()
        .expect("hidden must not resolve at the root");
    assert!(
        failure
            .errors
            .0
            .iter()
            .any(|e| matches!(e.kind, ErrorKind::NoMatchingFunction { .. })),
        "{:?}",
        failure.errors.0
    );
}

#[test]
fn unresolved_import_is_fatal() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("main.vpr"), "import nowhere;\n").unwrap();

    let failure = compile_root(&temp.path().join("main.vpr")).err().unwrap();
    assert!(
        matches!(
            failure.errors.0[0].kind,
            ErrorKind::UnresolvedImport { .. }
        ),
        "{:?}",
        failure.errors.0
    );
}

#[test]
fn import_cycles_are_deduplicated() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("a.vpr"),
        "import b;\nexport func fa() -> i32 { return 1; }\n",
    )
    .unwrap();
    fs::write(
        temp.path().join("b.vpr"),
        "import a;\nexport func fb() -> i32 { return 2; }\n",
    )
    .unwrap();
    fs::write(
        temp.path().join("main.vpr"),
        "import a;\nimport b;\nfunc main() -> i32 { return fa() + fb(); }\n",
    )
    .unwrap();

    let result = compile_root(&temp.path().join("main.vpr"));
    assert!(result.is_ok(), "{:?}", result.err().map(|f| f.errors.0));
}

#[test]
fn duplicate_imports_are_collapsed() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("util.vpr"),
        "export func one() -> i32 { return 1; }\n",
    )
    .unwrap();
    fs::write(
        temp.path().join("main.vpr"),
        "import util;\nimport util;\nfunc main() -> i32 { return one(); }\n",
    )
    .unwrap();

    let result = compile_root(&temp.path().join("main.vpr")).unwrap();
    let printed = result.module.to_string();
    // The unit is parsed once, so its function is emitted once.
    assert_eq!(printed.matches("func @_F3one").count(), 1, "{printed}");
}

#[test]
fn imports_resolve_through_subdirectories() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("lib")).unwrap();
    fs::write(
        temp.path().join("lib/math.vpr"),
        "export func square(a: i32) -> i32 { return a * a; }\n",
    )
    .unwrap();
    fs::write(
        temp.path().join("main.vpr"),
        "import lib.math;\nfunc main() -> i32 { return square(3); }\n",
    )
    .unwrap();

    let result = compile_root(&temp.path().join("main.vpr"));
    assert!(result.is_ok(), "{:?}", result.err().map(|f| f.errors.0));
}
