//! Scope table
//!
//! Scopes live in an arena and refer to their parent by id, so a lookup
//! walks the chain without cloning it. A name declared in a scope but not
//! yet given an address is a placeholder: it already shadows outer
//! bindings, and assignments resolve to it instead of creating a global.

use crate::error::{CompileError, CompileResult};
use crate::session::GlobalAllocator;
use rustc_hash::FxHashMap;
use std::fmt;

/// Every binding occupies one machine word.
pub const WORD: i64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Local,
    Formal,
    Captured,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScopeKind::Global => "global",
            ScopeKind::Local => "local",
            ScopeKind::Formal => "formal",
            ScopeKind::Captured => "captured",
        };
        f.write_str(name)
    }
}

/// A name's resolved storage.
///
/// What `address` means depends on the machine: a byte address or
/// frame offset on the stack machine, a stack depth or vector index on
/// the closure and vector machines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub kind: ScopeKind,
    pub address: i64,
    pub size: i64,
}

impl Binding {
    pub fn new(name: impl Into<String>, kind: ScopeKind, address: i64) -> Self {
        Self {
            name: name.into(),
            kind,
            address,
            size: WORD,
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}@{}", self.kind, self.name, self.address)
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Declared,
    Bound(Binding),
}

#[derive(Debug)]
struct Frame {
    parent: Option<ScopeId>,
    slots: FxHashMap<String, Slot>,
}

#[derive(Debug)]
pub struct ScopeTable {
    frames: Vec<Frame>,
}

impl Default for ScopeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTable {
    /// Create a table holding only the empty global scope.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame {
                parent: None,
                slots: FxHashMap::default(),
            }],
        }
    }

    /// The global scope.
    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Walk to the outermost scope of `scope`'s chain.
    pub fn root(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        while let Some(parent) = self.frames[current.0].parent {
            current = parent;
        }
        current
    }

    /// Push a child of `parent` holding placeholders for `names`.
    pub fn declare<'n>(
        &mut self,
        parent: ScopeId,
        names: impl IntoIterator<Item = &'n str>,
    ) -> ScopeId {
        self.push_frame(Some(parent), names)
    }

    /// Push a scope with no parent, for function bodies that must not see
    /// the enclosing chain.
    pub fn detached<'n>(&mut self, names: impl IntoIterator<Item = &'n str>) -> ScopeId {
        self.push_frame(None, names)
    }

    fn push_frame<'n>(
        &mut self,
        parent: Option<ScopeId>,
        names: impl IntoIterator<Item = &'n str>,
    ) -> ScopeId {
        let slots = names
            .into_iter()
            .map(|name| (name.to_string(), Slot::Declared))
            .collect();
        self.frames.push(Frame { parent, slots });
        ScopeId(self.frames.len() - 1)
    }

    /// Fix the address of `binding.name` in `scope`.
    ///
    /// Fails if the name already has an address there.
    pub fn bind(&mut self, scope: ScopeId, binding: Binding) -> CompileResult<()> {
        let slots = &mut self.frames[scope.0].slots;
        if let Some(Slot::Bound(existing)) = slots.get(&binding.name) {
            return Err(CompileError::internal(format!(
                "`{}` is already bound as {}",
                binding.name, existing
            )));
        }
        slots.insert(binding.name.clone(), Slot::Bound(binding));
        Ok(())
    }

    /// Resolve `name` by walking outward from `scope`.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> CompileResult<&Binding> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let frame = &self.frames[id.0];
            match frame.slots.get(name) {
                Some(Slot::Bound(binding)) => return Ok(binding),
                Some(Slot::Declared) => {
                    return Err(CompileError::internal(format!(
                        "`{}` is read before its address is fixed",
                        name
                    )))
                }
                None => current = frame.parent,
            }
        }
        Err(CompileError::undefined(name))
    }

    /// Whether `name` is bound or declared anywhere along the chain.
    pub fn is_visible(&self, scope: ScopeId, name: &str) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            let frame = &self.frames[id.0];
            if frame.slots.contains_key(name) {
                return true;
            }
            current = frame.parent;
        }
        false
    }

    /// Resolve an assignment target, allocating a new global in the root
    /// scope when the name is unbound along the whole chain.
    pub fn resolve_or_allocate(
        &mut self,
        scope: ScopeId,
        name: &str,
        globals: &mut GlobalAllocator,
    ) -> CompileResult<Binding> {
        if self.is_visible(scope, name) {
            return self.lookup(scope, name).cloned();
        }
        let root = self.root(scope);
        let binding = Binding::new(name, ScopeKind::Global, globals.allocate(WORD));
        self.bind(root, binding.clone())?;
        Ok(binding)
    }

    /// Global bindings of the global scope, in address order.
    pub fn globals(&self) -> Vec<Binding> {
        let mut globals: Vec<Binding> = self.frames[0]
            .slots
            .values()
            .filter_map(|slot| match slot {
                Slot::Bound(b) if b.kind == ScopeKind::Global => Some(b.clone()),
                _ => None,
            })
            .collect();
        globals.sort_by_key(|b| b.address);
        globals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_outward() {
        let mut table = ScopeTable::new();
        let global = table.global();
        table
            .bind(global, Binding::new("x", ScopeKind::Global, 0))
            .unwrap();
        let inner = table.declare(global, ["y"]);
        table
            .bind(inner, Binding::new("y", ScopeKind::Local, 8))
            .unwrap();

        assert_eq!(table.lookup(inner, "x").unwrap().kind, ScopeKind::Global);
        assert_eq!(table.lookup(inner, "y").unwrap().address, 8);
        assert!(table.lookup(global, "y").is_err());
    }

    #[test]
    fn test_shadowing_hides_but_keeps_outer() {
        let mut table = ScopeTable::new();
        let global = table.global();
        table
            .bind(global, Binding::new("x", ScopeKind::Global, 0))
            .unwrap();
        let inner = table.declare(global, ["x"]);
        table
            .bind(inner, Binding::new("x", ScopeKind::Local, 16))
            .unwrap();

        assert_eq!(table.lookup(inner, "x").unwrap().kind, ScopeKind::Local);
        assert_eq!(table.lookup(global, "x").unwrap().kind, ScopeKind::Global);
    }

    #[test]
    fn test_undefined_variable_carries_name() {
        let table = ScopeTable::new();
        match table.lookup(table.global(), "z") {
            Err(CompileError::UndefinedVariable { name }) => assert_eq!(name, "z"),
            other => panic!("expected UndefinedVariable, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_allocates_global_at_root() {
        let mut table = ScopeTable::new();
        let mut globals = GlobalAllocator::default();
        let global = table.global();
        let inner = table.declare(global, ["a"]);

        let x = table.resolve_or_allocate(inner, "x", &mut globals).unwrap();
        let y = table.resolve_or_allocate(inner, "y", &mut globals).unwrap();
        let x_again = table.resolve_or_allocate(global, "x", &mut globals).unwrap();

        assert_eq!((x.address, y.address), (0, 8));
        assert_eq!(x_again, x);
        assert_eq!(globals.total_size(), 16);
        assert_eq!(table.globals().len(), 2);
    }

    #[test]
    fn test_placeholder_captures_assignment() {
        let mut table = ScopeTable::new();
        let mut globals = GlobalAllocator::default();
        let inner = table.declare(table.global(), ["a"]);

        let err = table.resolve_or_allocate(inner, "a", &mut globals);
        assert!(matches!(err, Err(CompileError::InternalError { .. })));
        assert_eq!(globals.total_size(), 0);
    }

    #[test]
    fn test_detached_scope_is_its_own_root() {
        let mut table = ScopeTable::new();
        let global = table.global();
        table
            .bind(global, Binding::new("g", ScopeKind::Global, 0))
            .unwrap();
        let body = table.detached(["p"]);

        assert_eq!(table.root(body), body);
        assert!(table.lookup(body, "g").is_err());
        let nested = table.declare(body, ["q"]);
        assert_eq!(table.root(nested), body);
    }

    #[test]
    fn test_double_bind_is_rejected() {
        let mut table = ScopeTable::new();
        let global = table.global();
        table
            .bind(global, Binding::new("x", ScopeKind::Global, 0))
            .unwrap();
        assert!(table
            .bind(global, Binding::new("x", ScopeKind::Global, 8))
            .is_err());
    }
}
