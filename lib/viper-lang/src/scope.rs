//! Scopes, symbols and name resolution
//!
//! Scopes form a DAG rooted at the single process-wide root scope; unit
//! scopes and namespace scopes are "global" scopes and take part in the
//! downward search, while function bodies stay private to their owner.
//! Symbols live in a global append-only arena so ids stay unique and stable
//! for the whole compilation.

use crate::ast::Ast;
use crate::context::{Context, Name, ScopeId, SymbolId};
use crate::ir::{BlockId, IrModule, ValueId};
use crate::types::TypeId;

/// One formal parameter of a parametric function.
#[derive(Debug, Clone)]
pub struct TemplateParameter {
    pub name: Name,
    /// The erased stand-in type substituted during instantiation.
    pub ty: TypeId,
}

/// A cached specialization of a generic symbol.
#[derive(Debug)]
pub struct TemplateInstantiation {
    pub body: Ast,
    pub arguments: Vec<TypeId>,
}

/// The template payload of a generic symbol: the original body plus the
/// instantiation cache consulted by exact parameter-type equality.
#[derive(Debug, Default)]
pub struct TemplateSymbol {
    pub parameters: Vec<TemplateParameter>,
    /// Attached during the semantic pass; the symbol pass only records the
    /// signature.
    pub body: Option<Ast>,
    pub instantiations: Vec<TemplateInstantiation>,
}

#[derive(Debug)]
pub struct Symbol {
    pub name: Name,
    pub ty: TypeId,
    pub owner: ScopeId,
    pub pure: bool,
    pub exported: bool,
    pub removed: bool,
    /// SSA-style value bindings, per basic block. A `None` block is a
    /// function-wide binding.
    pub values: Vec<(Option<BlockId>, ValueId)>,
    pub template: Option<TemplateSymbol>,
}

#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub namespace: Option<Name>,
    pub is_global: bool,
    pub is_pure: bool,
    pub current_return_type: Option<TypeId>,
    /// The enclosing struct type, for method bodies.
    pub owner: Option<TypeId>,
    pub children: Vec<ScopeId>,
    pub symbols: Vec<SymbolId>,
}

impl Scope {
    pub fn root() -> Self {
        Self {
            parent: None,
            namespace: None,
            is_global: true,
            is_pure: false,
            current_return_type: None,
            owner: None,
            children: Vec::new(),
            symbols: Vec::new(),
        }
    }
}

impl Context {
    /// Create a scope. Global scopes are linked into their parent's child
    /// list and take part in the downward search; body scopes are not.
    pub fn new_scope(
        &mut self,
        parent: Option<ScopeId>,
        namespace: Option<Name>,
        is_global: bool,
        current_return_type: Option<TypeId>,
    ) -> ScopeId {
        let id = self.scopes.alloc(Scope {
            parent,
            namespace,
            is_global,
            is_pure: false,
            current_return_type,
            owner: None,
            children: Vec::new(),
            symbols: Vec::new(),
        });
        if let Some(parent) = parent {
            if is_global {
                self.scopes.get_mut(parent).children.push(id);
            }
        }
        id
    }

    /// The ordered chain of non-empty namespace names from the root to
    /// `scope`.
    pub fn namespaces(&self, scope: ScopeId) -> Vec<Name> {
        let mut names = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scopes.get(id);
            if let Some(name) = scope.namespace {
                names.push(name);
            }
            current = scope.parent;
        }
        names.reverse();
        names
    }

    /// The return type of the function enclosing `scope`, if any.
    pub fn current_return_type(&self, scope: ScopeId) -> Option<TypeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scopes.get(id);
            if let Some(ty) = scope.current_return_type {
                return Some(ty);
            }
            current = scope.parent;
        }
        None
    }

    /// Whether `scope` sits inside a pure function.
    pub fn in_pure_scope(&self, scope: ScopeId) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scopes.get(id);
            if scope.is_pure {
                return true;
            }
            current = scope.parent;
        }
        false
    }

    /// The innermost enclosing struct owner, walking up the scope chain.
    pub fn find_owner(&self, scope: ScopeId) -> Option<TypeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scopes.get(id);
            if let Some(owner) = scope.owner {
                return Some(owner);
            }
            current = scope.parent;
        }
        None
    }

    /// An already created named child scope (namespace, class or enum
    /// scope), so both parser passes agree on the same scope.
    pub fn find_child_namespace(&self, parent: ScopeId, name: Name) -> Option<ScopeId> {
        self.scopes
            .get(parent)
            .children
            .iter()
            .copied()
            .find(|&child| self.scopes.get(child).namespace == Some(name))
    }

    /// Register a symbol in `scope`. Ids are unique across the process.
    pub fn declare_symbol(&mut self, scope: ScopeId, name: Name, ty: TypeId) -> SymbolId {
        let id = self.symbols.alloc(Symbol {
            name,
            ty,
            owner: scope,
            pure: false,
            exported: false,
            removed: false,
            values: Vec::new(),
            template: None,
        });
        self.scopes.get_mut(scope).symbols.push(id);
        id
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        self.symbols.get(id)
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        self.symbols.get_mut(id)
    }

    /// The first live symbol called `name` directly inside `scope`.
    pub fn scope_symbol(&self, scope: ScopeId, name: Name) -> Option<SymbolId> {
        self.scopes
            .get(scope)
            .symbols
            .iter()
            .copied()
            .find(|&id| {
                let sym = self.symbols.get(id);
                sym.name == name && !sym.removed
            })
    }

    /// Unqualified lookup: walk parent scopes to the root, then scan the
    /// anonymous global subtree.
    pub fn resolve_symbol(&self, scope: ScopeId, name: Name) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(sym) = self.scope_symbol(id, name) {
                return Some(sym);
            }
            current = self.scopes.get(id).parent;
        }
        self.resolve_symbol_down(self.root, name)
    }

    /// Qualified lookup: descend from the root matching the namespace
    /// prefix; on failure, successively prepend the ambient namespace
    /// components and retry.
    pub fn resolve_symbol_qualified(&self, scope: ScopeId, names: &[Name]) -> Option<SymbolId> {
        let mut given: Vec<Name> = names.to_vec();
        let mut active = self.namespaces(scope);
        loop {
            if let Some(sym) = self.resolve_symbol_down_qualified(self.root, &given) {
                return Some(sym);
            }
            match active.pop() {
                Some(outer) => given.insert(0, outer),
                None => return None,
            }
        }
    }

    /// Downward scan into anonymous global scopes only, so names are not
    /// captured across namespaces.
    fn resolve_symbol_down(&self, scope: ScopeId, name: Name) -> Option<SymbolId> {
        if !self.namespaces(scope).is_empty() {
            return None;
        }
        if let Some(sym) = self.scope_symbol(scope, name) {
            return Some(sym);
        }
        for &child in &self.scopes.get(scope).children {
            if let Some(sym) = self.resolve_symbol_down(child, name) {
                return Some(sym);
            }
        }
        None
    }

    fn resolve_symbol_down_qualified(&self, scope: ScopeId, names: &[Name]) -> Option<SymbolId> {
        let (last, prefix) = names.split_last().expect("qualified name is non-empty");
        if self.namespaces(scope) == prefix {
            if let Some(sym) = self.scope_symbol(scope, *last) {
                return Some(sym);
            }
        }
        for &child in &self.scopes.get(scope).children {
            if let Some(sym) = self.resolve_symbol_down_qualified(child, names) {
                return Some(sym);
            }
        }
        None
    }

    /// Gather every live symbol matching the (possibly qualified) name, for
    /// overload resolution. Candidates are collected across all ambient
    /// namespace prefix extensions.
    pub fn candidate_functions(&self, scope: ScopeId, names: &[Name]) -> Vec<SymbolId> {
        let mut given: Vec<Name> = names.to_vec();
        let mut active = self.namespaces(scope);
        let mut candidates = Vec::new();
        loop {
            self.candidates_down(self.root, &given, &mut candidates);
            match active.pop() {
                Some(outer) => given.insert(0, outer),
                None => break,
            }
        }
        candidates
    }

    fn candidates_down(&self, scope: ScopeId, names: &[Name], out: &mut Vec<SymbolId>) {
        let (last, prefix) = names.split_last().expect("qualified name is non-empty");
        if self.namespaces(scope) == prefix {
            for &id in &self.scopes.get(scope).symbols {
                let sym = self.symbols.get(id);
                if sym.name == *last && !sym.removed && !out.contains(&id) {
                    out.push(id);
                }
            }
        }
        for &child in &self.scopes.get(scope).children {
            self.candidates_down(child, names, out);
        }
    }

    /// The latest IR value bound to a symbol, searching the given block and
    /// then its predecessors.
    pub fn latest_value(
        &self,
        sym: SymbolId,
        block: Option<BlockId>,
        module: &IrModule,
    ) -> Option<ValueId> {
        let symbol = self.symbols.get(sym);
        let Some(block) = block else {
            return symbol.values.last().map(|&(_, value)| value);
        };

        for &(bound_block, value) in symbol.values.iter().rev() {
            if bound_block.is_none() || bound_block == Some(block) {
                return Some(value);
            }
        }
        for &pred in &module.blocks.get(block).predecessors {
            if let Some(value) = self.latest_value(sym, Some(pred), module) {
                return Some(value);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    #[test]
    fn symbol_ids_are_unique() {
        let mut ctx = Context::new();
        let name = ctx.interner.intern("x");
        let ty = ctx.types.i32_;
        let a = ctx.declare_symbol(ctx.root, name, ty);
        let b = ctx.declare_symbol(ctx.root, name, ty);
        assert_ne!(a, b);
    }

    #[test]
    fn unqualified_lookup_walks_parents() {
        let mut ctx = Context::new();
        let name = ctx.interner.intern("x");
        let ty = ctx.types.i32_;
        ctx.declare_symbol(ctx.root, name, ty);

        let inner = ctx.new_scope(Some(ctx.root), None, false, None);
        assert!(ctx.resolve_symbol(inner, name).is_some());
    }

    #[test]
    fn downward_lookup_skips_namespaces() {
        let mut ctx = Context::new();
        let ns = ctx.interner.intern("X");
        let name = ctx.interner.intern("f");
        let ty = ctx.types.i32_;

        let ns_scope = ctx.new_scope(Some(ctx.root), Some(ns), true, None);
        ctx.declare_symbol(ns_scope, name, ty);

        // Unqualified from a sibling body scope must not capture X::f.
        let body = ctx.new_scope(Some(ctx.root), None, false, None);
        assert!(ctx.resolve_symbol(body, name).is_none());

        // Qualified lookup descends into the namespace.
        assert!(ctx.resolve_symbol_qualified(body, &[ns, name]).is_some());
    }

    #[test]
    fn ambient_namespace_prefix_is_prepended() {
        let mut ctx = Context::new();
        let x = ctx.interner.intern("X");
        let y = ctx.interner.intern("Y");
        let f = ctx.interner.intern("f");
        let ty = ctx.types.i32_;

        let x_scope = ctx.new_scope(Some(ctx.root), Some(x), true, None);
        let y_scope = ctx.new_scope(Some(x_scope), Some(y), true, None);
        ctx.declare_symbol(y_scope, f, ty);

        // Inside namespace X, `Y::f` means `X::Y::f`.
        assert!(ctx.resolve_symbol_qualified(x_scope, &[y, f]).is_some());
    }

    #[test]
    fn removed_symbols_are_invisible() {
        let mut ctx = Context::new();
        let unit = ctx.new_scope(Some(ctx.root), None, true, None);
        let name = ctx.interner.intern("hidden");
        let ty = ctx.types.i32_;
        let sym = ctx.declare_symbol(unit, name, ty);

        assert!(ctx.resolve_symbol(ctx.root, name).is_some());
        ctx.symbol_mut(sym).removed = true;
        assert!(ctx.resolve_symbol(ctx.root, name).is_none());
    }

    #[test]
    fn candidates_gather_all_overloads() {
        let mut ctx = Context::new();
        let g = ctx.interner.intern("g");
        let i32_ = ctx.types.i32_;
        let one = ctx.types.function_of(i32_, vec![i32_]);
        let two = ctx.types.function_of(i32_, vec![i32_, i32_]);
        ctx.declare_symbol(ctx.root, g, one);
        ctx.declare_symbol(ctx.root, g, two);

        let body = ctx.new_scope(Some(ctx.root), None, false, None);
        assert_eq!(ctx.candidate_functions(body, &[g]).len(), 2);
    }
}
