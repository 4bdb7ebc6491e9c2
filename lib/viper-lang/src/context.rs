//! Shared compilation state
//!
//! The process-wide registries of the front end (interned names, the type
//! registry, the scope arena and the global symbol arena) are bundled into a
//! [`Context`] value that is threaded explicitly through every pass.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::path::PathBuf;

use crate::scope::{Scope, Symbol};
use crate::types::TypeRegistry;

pub struct NodeId<T> {
    idx: u32,
    _marker: PhantomData<T>,
}

impl<T> NodeId<T> {
    pub fn new(idx: usize) -> Self {
        Self {
            idx: idx as u32,
            _marker: PhantomData,
        }
    }

    pub fn idx(&self) -> usize {
        self.idx as usize
    }
}

impl<T> PartialEq for NodeId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}

impl<T> Eq for NodeId<T> {}

impl<T> Clone for NodeId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeId<T> {}

impl<T> Hash for NodeId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.idx.hash(state);
    }
}

impl<T> Debug for NodeId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeId({})", self.idx)
    }
}

pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Arena<T> {
    pub fn alloc(&mut self, item: T) -> NodeId<T> {
        let id = NodeId::new(self.items.len());
        self.items.push(item);
        id
    }

    pub fn get(&self, id: NodeId<T>) -> &T {
        &self.items[id.idx()]
    }

    pub fn get_mut(&mut self, id: NodeId<T>) -> &mut T {
        &mut self.items[id.idx()]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId<T>, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(idx, item)| (NodeId::new(idx), item))
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Debug> Debug for Arena<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena").field("items", &self.items).finish()
    }
}

/// An interned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(u32);

#[derive(Debug, Default)]
pub struct Interner {
    map: HashMap<String, Name>,
    strings: Vec<String>,
}

impl Interner {
    pub fn intern(&mut self, s: &str) -> Name {
        if let Some(&name) = self.map.get(s) {
            return name;
        }

        let name = Name(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.map.insert(s.to_string(), name);
        name
    }

    pub fn resolve(&self, name: Name) -> &str {
        &self.strings[name.0 as usize]
    }

    pub fn try_lookup(&self, s: &str) -> Option<Name> {
        self.map.get(s).copied()
    }
}

/// Identifies one lexed source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u32);

/// Path and full text of every unit read during a compilation, kept so
/// diagnostics can be rendered after the passes have run.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<(PathBuf, String)>,
}

impl SourceMap {
    pub fn add(&mut self, path: PathBuf, text: String) -> SourceId {
        let id = SourceId(self.files.len() as u32);
        self.files.push((path, text));
        id
    }

    pub fn path(&self, id: SourceId) -> &std::path::Path {
        &self.files[id.0 as usize].0
    }

    pub fn text(&self, id: SourceId) -> &str {
        &self.files[id.0 as usize].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &PathBuf, &str)> {
        self.files
            .iter()
            .enumerate()
            .map(|(idx, (path, text))| (SourceId(idx as u32), path, text.as_str()))
    }
}

pub type ScopeId = NodeId<Scope>;
pub type SymbolId = NodeId<Symbol>;

/// The shared state pool of one compilation.
pub struct Context {
    pub interner: Interner,
    pub sources: SourceMap,
    pub types: TypeRegistry,
    pub scopes: Arena<Scope>,
    pub symbols: Arena<Symbol>,
    /// The single process-wide root scope.
    pub root: ScopeId,
}

impl Context {
    pub fn new() -> Self {
        let mut interner = Interner::default();
        let types = TypeRegistry::with_builtins(&mut interner);

        let mut scopes = Arena::default();
        let root = scopes.alloc(Scope::root());

        Self {
            interner,
            sources: SourceMap::default(),
            types,
            scopes,
            symbols: Arena::default(),
            root,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
