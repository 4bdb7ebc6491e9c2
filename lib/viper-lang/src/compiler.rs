//! The pipeline driver
//!
//! Fixed pass order: import closure, symbol pass over every unit, semantic
//! pass (dependencies first, root last), the unknown-type sweep, type
//! check, visibility pruning before the root's check, semantic check, and
//! finally IR emission of template instantiations and every unit's
//! declarations into one module.

use std::fs;
use std::path::{Path, PathBuf};

use crate::context::{Context, SourceMap, SymbolId};
use crate::diagnostics::{CompileErrors, CompileWarning, Diagnostics};
use crate::imports::ImportManager;
use crate::ir::{IrBuilder, IrModule};
use crate::parser::{Parser, SymbolParser};

pub struct CompileResult {
    pub module: IrModule,
    pub warnings: Vec<CompileWarning>,
    pub sources: SourceMap,
}

#[derive(Debug)]
pub struct CompileFailure {
    pub errors: CompileErrors,
    pub sources: SourceMap,
}

pub struct Compiler {
    search_paths: Vec<PathBuf>,
}

impl Compiler {
    pub fn new() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            search_paths: vec![cwd],
        }
    }

    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn compile_file(&self, path: &Path) -> Result<CompileResult, CompileFailure> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let text = match fs::read_to_string(&root) {
            Ok(text) => text,
            Err(err) => {
                let mut errors = CompileErrors::default();
                errors.0.push(crate::diagnostics::CompileError::new(
                    crate::diagnostics::ErrorKind::UnresolvedImport {
                        path: format!("{} ({err})", root.display()),
                    },
                    crate::diagnostics::Span::synthetic(),
                ));
                return Err(CompileFailure {
                    errors,
                    sources: SourceMap::default(),
                });
            }
        };
        self.compile(root, text)
    }

    /// Compile a root unit given as text; imports resolve against the
    /// given path's directory and the search paths.
    pub fn compile_source(&self, path: impl Into<PathBuf>, text: &str) -> Result<CompileResult, CompileFailure> {
        self.compile(path.into(), text.to_string())
    }

    fn compile(&self, root: PathBuf, text: String) -> Result<CompileResult, CompileFailure> {
        let mut ctx = Context::new();
        let mut manager = ImportManager::new(self.search_paths.clone());

        let fail = |ctx: &mut Context, errors: CompileErrors| CompileFailure {
            errors,
            sources: std::mem::take(&mut ctx.sources),
        };

        if let Err(error) = manager.collect(root.clone(), text, &mut ctx) {
            return Err(fail(&mut ctx, error.into()));
        }
        manager.compute_visibility(&root);

        // Each unit gets an anonymous global scope spliced under the root,
        // so downward resolution sees every unit's globals.
        let process_root = ctx.root;
        for unit in &mut manager.units {
            unit.scope = Some(ctx.new_scope(Some(process_root), None, true, None));
        }

        // Pass 1: skeletons for every unit.
        for index in 0..manager.units.len() {
            let unit_scope = manager.units[index].scope.expect("scope assigned above");
            let parser = SymbolParser::new(&manager.units[index].tokens, &mut ctx, unit_scope);
            if let Err(error) = parser.parse() {
                return Err(fail(&mut ctx, error.into()));
            }
        }
        manager.record_exports(&ctx, &root);

        // Pass 2: full bodies, dependencies first, the root unit last.
        let mut unit_asts = Vec::with_capacity(manager.units.len());
        for index in 0..manager.units.len() {
            let unit_scope = manager.units[index].scope.expect("scope assigned above");
            let complete = manager.units[index].visible_at_root;
            let parser = Parser::new(
                &manager.units[index].tokens,
                &mut ctx,
                unit_scope,
                complete,
            );
            match parser.parse() {
                Ok(ast) => unit_asts.push(ast),
                Err(error) => return Err(fail(&mut ctx, error.into())),
            }
        }

        // Placeholders still pending after pass 2 are unknown type names.
        let unknown = manager.report_unknown_type_errors(&ctx);
        if !unknown.is_empty() {
            return Err(fail(&mut ctx, unknown));
        }

        let mut diag = Diagnostics::new();

        // Explicit specializations recorded at parse time live in the
        // instantiation caches rather than the unit ASTs; check them first.
        for symbol in templated_symbols(&ctx) {
            let Some(mut template) = ctx.symbol_mut(symbol).template.take() else {
                continue;
            };
            for instantiation in &mut template.instantiations {
                instantiation.body.type_check(&mut ctx, &mut diag);
            }
            ctx.symbol_mut(symbol).template = Some(template);
        }

        // Type check. Imported units see everything; the root sees only
        // what the export chains carry to it.
        let last = unit_asts.len() - 1;
        for (index, ast) in unit_asts.iter_mut().enumerate() {
            if index == last {
                manager.prune(&mut ctx, &root);
            }
            for node in ast.iter_mut() {
                node.type_check(&mut ctx, &mut diag);
            }
        }
        if diag.has_errors() {
            let errors = diag.take_errors();
            return Err(fail(&mut ctx, errors));
        }

        for symbol in templated_symbols(&ctx) {
            let Some(mut template) = ctx.symbol_mut(symbol).template.take() else {
                continue;
            };
            for instantiation in &mut template.instantiations {
                instantiation.body.semantic_check(&ctx, &mut diag, true);
            }
            ctx.symbol_mut(symbol).template = Some(template);
        }
        for ast in unit_asts.iter_mut() {
            for node in ast.iter_mut() {
                node.semantic_check(&ctx, &mut diag, true);
            }
        }
        if diag.has_errors() {
            let errors = diag.take_errors();
            return Err(fail(&mut ctx, errors));
        }

        // Emission: template instantiations first, so call sites see their
        // function values, then every unit in dependency order.
        let module_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        let mut builder = IrBuilder::new(IrModule::new(module_name));

        for ast in unit_asts.iter_mut() {
            for node in ast.iter_mut() {
                node.declare(&mut ctx, &mut builder);
            }
        }

        for symbol in templated_symbols(&ctx) {
            let Some(mut template) = ctx.symbol_mut(symbol).template.take() else {
                continue;
            };
            for instantiation in &mut template.instantiations {
                instantiation.body.emit(&mut ctx, &mut builder, &mut diag);
            }
            ctx.symbol_mut(symbol).template = Some(template);
        }

        for ast in unit_asts.iter_mut() {
            for node in ast.iter_mut() {
                node.emit(&mut ctx, &mut builder, &mut diag);
            }
        }

        Ok(CompileResult {
            module: builder.module,
            warnings: diag.take_warnings(),
            sources: std::mem::take(&mut ctx.sources),
        })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Symbols carrying a template payload, collected up front so their
/// instantiation caches can be visited while the symbol arena is mutated.
fn templated_symbols(ctx: &Context) -> Vec<SymbolId> {
    ctx.symbols
        .iter()
        .filter(|(_, symbol)| symbol.template.is_some())
        .map(|(id, _)| id)
        .collect()
}
