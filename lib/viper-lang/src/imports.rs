//! The import manager
//!
//! Walks the import graph of a compilation, records the `(from,
//! imported_by)` edges, and evaluates export visibility: a symbol declared
//! in unit `D` is visible at the compilation root `R` when a chain of
//! `export import` edges carries it to a unit that `R` imports directly.
//! Symbols that fail the check are pruned from the spliced scopes before
//! the root unit is checked.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::context::{Context, ScopeId, SourceId, SymbolId};
use crate::diagnostics::{CompileError, CompileErrors, ErrorKind, Span};
use crate::lexer::{Lexer, Token, TokenKind};

/// One edge of the import graph.
#[derive(Debug, Clone)]
pub struct Import {
    pub from: PathBuf,
    pub imported_by: PathBuf,
    /// Whether the edge came from an `export import` directive.
    pub exported: bool,
}

/// A recorded export. An empty `exported_to` means "visible at any direct
/// importer"; a populated one traces a re-export chain step.
#[derive(Debug, Clone)]
pub struct Export {
    pub exported_from: PathBuf,
    pub symbol: Option<SymbolId>,
    pub exported_to: Option<PathBuf>,
}

/// One lexed compilation unit, in dependency order (root last).
#[derive(Debug)]
pub struct Unit {
    pub path: PathBuf,
    pub source: SourceId,
    pub tokens: Vec<Token>,
    pub scope: Option<ScopeId>,
    pub visible_at_root: bool,
}

pub struct ImportManager {
    search_paths: Vec<PathBuf>,
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
    pub units: Vec<Unit>,
}

impl ImportManager {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            imports: Vec::new(),
            exports: Vec::new(),
            units: Vec::new(),
        }
    }

    /// Collect the transitive import closure starting at the root unit.
    /// Each unit is lexed once; duplicate edges are recorded but not
    /// re-traversed, so traversal stays linear and cycles are harmless.
    pub fn collect(
        &mut self,
        root: PathBuf,
        root_text: String,
        ctx: &mut Context,
    ) -> Result<(), CompileError> {
        let mut visited = HashSet::new();
        visited.insert(root.clone());
        self.collect_unit(root, root_text, ctx, &mut visited)
    }

    fn collect_unit(
        &mut self,
        path: PathBuf,
        text: String,
        ctx: &mut Context,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<(), CompileError> {
        let source = ctx.sources.add(path.clone(), text);
        let tokens = Lexer::new(ctx.sources.text(source), source).lex();

        for directive in header_imports(&tokens) {
            let resolved = self.resolve_import(&path, &directive)?;
            self.imports.push(Import {
                from: resolved.clone(),
                imported_by: path.clone(),
                exported: directive.exported,
            });
            if directive.exported {
                self.exports.push(Export {
                    exported_from: resolved.clone(),
                    symbol: None,
                    exported_to: Some(path.clone()),
                });
            }

            if visited.insert(resolved.clone()) {
                let text = fs::read_to_string(&resolved).map_err(|_| {
                    CompileError::at_token(
                        ErrorKind::UnresolvedImport {
                            path: resolved.display().to_string(),
                        },
                        &directive.token,
                    )
                })?;
                self.collect_unit(resolved, text, ctx, visited)?;
            }
        }

        // Dependencies first; the root ends up last.
        self.units.push(Unit {
            path,
            source,
            tokens,
            scope: None,
            visible_at_root: false,
        });
        Ok(())
    }

    /// Imports resolve against the importer's directory first, then each
    /// configured search path, appending the `.vpr` extension.
    fn resolve_import(
        &self,
        importer: &Path,
        directive: &HeaderImport,
    ) -> Result<PathBuf, CompileError> {
        let mut relative = PathBuf::new();
        for component in &directive.components {
            relative.push(component);
        }
        relative.set_extension("vpr");

        let mut candidates = Vec::new();
        if let Some(parent) = importer.parent() {
            candidates.push(parent.join(&relative));
        }
        for search_path in &self.search_paths {
            candidates.push(search_path.join(&relative));
        }

        for candidate in candidates {
            if candidate.exists() {
                return Ok(candidate.canonicalize().unwrap_or(candidate));
            }
        }
        Err(CompileError::at_token(
            ErrorKind::UnresolvedImport {
                path: relative.display().to_string(),
            },
            &directive.token,
        ))
    }

    /// Whether a unit's exported symbols reach the root: either the root
    /// imports the unit directly, or a chain of `export import` edges does.
    pub fn reaches_root(&self, root: &Path, from: &Path) -> bool {
        if from == root {
            return true;
        }
        let mut seen: HashSet<&Path> = HashSet::new();
        let mut frontier: Vec<&Path> = vec![from];
        seen.insert(from);
        while let Some(current) = frontier.pop() {
            for edge in &self.imports {
                if edge.from != current {
                    continue;
                }
                if edge.imported_by == root {
                    return true;
                }
                if edge.exported && seen.insert(edge.imported_by.as_path()) {
                    frontier.push(edge.imported_by.as_path());
                }
            }
        }
        false
    }

    /// The export-visibility evaluator over recorded export records.
    pub fn was_exported_to(&self, root: &Path, export: &Export) -> bool {
        self.reaches_root(root, &export.exported_from)
    }

    pub fn compute_visibility(&mut self, root: &Path) {
        let reachable: Vec<bool> = self
            .units
            .iter()
            .map(|unit| self.reaches_root(root, &unit.path))
            .collect();
        for (unit, visible) in self.units.iter_mut().zip(reachable) {
            unit.visible_at_root = visible;
        }
    }

    /// Record an export entry for every symbol declared by the spliced
    /// units, mirroring the scope splice.
    pub fn record_exports(&mut self, ctx: &Context, root: &Path) {
        let mut records = Vec::new();
        for unit in &self.units {
            if unit.path == *root {
                continue;
            }
            let Some(scope) = unit.scope else { continue };
            let mut symbols = Vec::new();
            collect_scope_symbols(ctx, scope, &mut symbols);
            for symbol in symbols {
                records.push(Export {
                    exported_from: unit.path.clone(),
                    symbol: Some(symbol),
                    exported_to: None,
                });
            }
        }
        self.exports.extend(records);
    }

    /// Remove symbols that are not export-visible at the root from the
    /// spliced scopes. Runs after the imported units were checked and
    /// before the root unit is.
    pub fn prune(&self, ctx: &mut Context, root: &Path) {
        for unit in &self.units {
            if unit.path == *root {
                continue;
            }
            let Some(scope) = unit.scope else { continue };
            let mut symbols = Vec::new();
            collect_scope_symbols(ctx, scope, &mut symbols);
            for symbol in symbols {
                let keep = unit.visible_at_root && ctx.symbol(symbol).exported;
                if !keep {
                    ctx.symbol_mut(symbol).removed = true;
                }
            }
        }
    }

    /// The post-resolve sweep: every placeholder still on the pending work
    /// list is an unknown type name, reported at its recorded use site.
    pub fn report_unknown_type_errors(&self, ctx: &Context) -> CompileErrors {
        let mut errors = CompileErrors::default();
        for pending in ctx.types.pending_list() {
            let name = ctx.types.display_name(&ctx.interner, pending);
            let span = ctx
                .types
                .pending_token(pending)
                .map(Span::of)
                .unwrap_or_else(Span::synthetic);
            errors
                .0
                .push(CompileError::new(ErrorKind::UnknownTypeName { name }, span));
        }
        errors
    }
}

fn collect_scope_symbols(ctx: &Context, scope: ScopeId, out: &mut Vec<SymbolId>) {
    let entry = ctx.scopes.get(scope);
    out.extend(entry.symbols.iter().copied());
    for &child in &entry.children {
        collect_scope_symbols(ctx, child, out);
    }
}

struct HeaderImport {
    components: Vec<String>,
    exported: bool,
    token: Token,
}

/// Extract the leading `import` / `export import` directives without
/// reading past the header.
fn header_imports(tokens: &[Token]) -> Vec<HeaderImport> {
    let mut directives = Vec::new();
    let mut position = 0usize;

    loop {
        let exported = match tokens.get(position).map(|t| t.kind) {
            Some(TokenKind::ImportKeyword) => false,
            Some(TokenKind::ExportKeyword)
                if tokens.get(position + 1).map(|t| t.kind) == Some(TokenKind::ImportKeyword) =>
            {
                position += 1;
                true
            }
            _ => break,
        };
        position += 1; // import keyword

        let Some(first) = tokens.get(position) else { break };
        let token = first.clone();
        let mut components = Vec::new();
        while let Some(part) = tokens.get(position) {
            if part.kind != TokenKind::Identifier {
                break;
            }
            components.push(part.text.clone());
            position += 1;
            if tokens.get(position).map(|t| t.kind) == Some(TokenKind::Dot) {
                position += 1;
            } else {
                break;
            }
        }
        if tokens.get(position).map(|t| t.kind) == Some(TokenKind::Semicolon) {
            position += 1;
        }
        if !components.is_empty() {
            directives.push(HeaderImport {
                components,
                exported,
                token,
            });
        }
    }
    directives
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SourceId;
    use crate::lexer::Lexer;

    fn lex(src: &str) -> Vec<Token> {
        Lexer::new(src, SourceId(0)).lex()
    }

    #[test]
    fn header_imports_stop_at_first_declaration() {
        let tokens = lex("import a;\nexport import b;\nfunc main() -> i32 { return 0; }");
        let found = header_imports(&tokens);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].components, vec!["a"]);
        assert!(!found[0].exported);
        assert_eq!(found[1].components, vec!["b"]);
        assert!(found[1].exported);
    }

    #[test]
    fn header_imports_dotted_paths() {
        let tokens = lex("import std.io.file;");
        let found = header_imports(&tokens);
        assert_eq!(found[0].components, vec!["std", "io", "file"]);
    }

    #[test]
    fn export_chain_reaches_root() {
        let root = PathBuf::from("/p/root.vpr");
        let mid = PathBuf::from("/p/mid.vpr");
        let leaf = PathBuf::from("/p/leaf.vpr");

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

        assert!(manager.reaches_root(&root, &mid));
        assert!(manager.reaches_root(&root, &leaf));
    }

    #[test]
    fn plain_chain_does_not_reach_root() {
        let root = PathBuf::from("/p/root.vpr");
        let mid = PathBuf::from("/p/mid.vpr");
        let leaf = PathBuf::from("/p/leaf.vpr");

        let mut manager = ImportManager::new(Vec::new());
        manager.imports.push(Import {
            from: mid.clone(),
            imported_by: root.clone(),
            exported: false,
        });
        // A plain import of leaf does not re-export it.
        manager.imports.push(Import {
            from: leaf.clone(),
            imported_by: mid.clone(),
            exported: false,
        });

        assert!(manager.reaches_root(&root, &mid));
        assert!(!manager.reaches_root(&root, &leaf));
    }
}
