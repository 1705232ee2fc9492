//! Symbol table: a stack of named, persistent scopes.
//!
//! Scopes are created once by the symbol collector and never deleted;
//! popping only shrinks the active stack. Later passes re-enter a scope by
//! the [`ScopeId`] the collector left as a decoration, so all three passes
//! resolve names against identical bindings.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::types::{TypeId, TypeManager};

/// Name of the outermost scope.
pub const GLOBAL_SCOPE_NAME: &str = "$global";

/// Handle of a scope in the table's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// What a name stands for inside its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Locally declared variable
    LocalVar,
    /// Function parameter
    Parameter,
    /// Function name
    Function,
}

/// Entry bound to a name in one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// Kind of the binding
    pub kind: SymbolKind,
    /// Declared type
    pub ty: TypeId,
}

/// Declaring a name twice in the same scope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("identifier '{name}' already declared in this scope")]
pub struct AlreadyDeclared {
    /// The colliding name
    pub name: String,
}

#[derive(Debug)]
struct Scope {
    #[allow(dead_code)]
    name: String,
    entries: HashMap<String, Symbol>,
}

/// The scope arena plus the active stack.
#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    stack: Vec<ScopeId>,
}

impl SymbolTable {
    /// Creates an empty table with no active scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh scope, enters it, and returns its handle.
    pub fn push_new_scope(&mut self, name: &str) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            name: name.to_string(),
            entries: HashMap::new(),
        });
        self.stack.push(id);
        id
    }

    /// Re-enters a scope created earlier.
    pub fn push_scope(&mut self, id: ScopeId) {
        self.stack.push(id);
    }

    /// Leaves the current scope. The scope itself persists for later
    /// passes.
    pub fn pop_scope(&mut self) {
        self.stack.pop();
    }

    /// Depth of the active stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn current(&self) -> Option<&Scope> {
        self.stack.last().map(|id| &self.scopes[id.0 as usize])
    }

    fn current_mut(&mut self) -> Option<&mut Scope> {
        let id = *self.stack.last()?;
        Some(&mut self.scopes[id.0 as usize])
    }

    fn add(&mut self, name: &str, sym: Symbol) -> Result<(), AlreadyDeclared> {
        let scope = self
            .current_mut()
            .expect("symbol added outside any scope");
        if scope.entries.contains_key(name) {
            return Err(AlreadyDeclared { name: name.to_string() });
        }
        scope.entries.insert(name.to_string(), sym);
        Ok(())
    }

    /// Declares a local variable in the current scope.
    pub fn add_local_var(&mut self, name: &str, ty: TypeId) -> Result<(), AlreadyDeclared> {
        self.add(name, Symbol { kind: SymbolKind::LocalVar, ty })
    }

    /// Declares a parameter in the current scope.
    pub fn add_parameter(&mut self, name: &str, ty: TypeId) -> Result<(), AlreadyDeclared> {
        self.add(name, Symbol { kind: SymbolKind::Parameter, ty })
    }

    /// Declares a function in the current scope.
    pub fn add_function(&mut self, name: &str, ty: TypeId) -> Result<(), AlreadyDeclared> {
        self.add(name, Symbol { kind: SymbolKind::Function, ty })
    }

    /// Whether the current scope binds `name`.
    pub fn find_in_current_scope(&self, name: &str) -> bool {
        self.current()
            .map(|s| s.entries.contains_key(name))
            .unwrap_or(false)
    }

    /// Walks the stack from the top; returns the depth (0 = current scope)
    /// at which `name` is bound.
    pub fn find_in_stack(&self, name: &str) -> Option<usize> {
        self.stack
            .iter()
            .rev()
            .position(|id| self.scopes[id.0 as usize].entries.contains_key(name))
    }

    fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.stack
            .iter()
            .rev()
            .find_map(|id| self.scopes[id.0 as usize].entries.get(name))
    }

    /// Type of the innermost binding of `name`.
    pub fn get_type(&self, name: &str) -> Option<TypeId> {
        self.resolve(name).map(|s| s.ty)
    }

    /// Whether the innermost binding of `name` is a function.
    pub fn is_function(&self, name: &str) -> bool {
        matches!(self.resolve(name), Some(Symbol { kind: SymbolKind::Function, .. }))
    }

    /// Whether the innermost binding of `name` is a parameter.
    pub fn is_parameter(&self, name: &str) -> bool {
        matches!(self.resolve(name), Some(Symbol { kind: SymbolKind::Parameter, .. }))
    }

    /// True unless the global scope declares `main` as a parameterless
    /// void function.
    pub fn no_main_properly_declared(&self, types: &TypeManager) -> bool {
        let Some(global) = self.scopes.first() else {
            return true;
        };
        let Some(sym) = global.entries.get("main") else {
            return true;
        };
        if sym.kind != SymbolKind::Function {
            return true;
        }
        let params_ok = types.param_count(sym.ty).map(|n| n == 0).unwrap_or(false);
        let ret_ok = types
            .return_type(sym.ty)
            .map(|r| types.is_void(r))
            .unwrap_or(false);
        !(params_ok && ret_ok)
    }

    /// Bindings of a scope sorted by name. Used by tests and diagnostics
    /// tooling; pass order never depends on it.
    pub fn bindings(&self, id: ScopeId) -> Vec<(String, SymbolKind, TypeId)> {
        let mut out: Vec<_> = self.scopes[id.0 as usize]
            .entries
            .iter()
            .map(|(name, sym)| (name.clone(), sym.kind, sym.ty))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_resolve() {
        let types = TypeManager::new();
        let mut table = SymbolTable::new();
        table.push_new_scope(GLOBAL_SCOPE_NAME);
        table.add_local_var("x", types.integer()).unwrap();

        assert!(table.find_in_current_scope("x"));
        assert_eq!(table.find_in_stack("x"), Some(0));
        assert_eq!(table.get_type("x"), Some(types.integer()));
        assert!(!table.is_function("x"));
    }

    #[test]
    fn test_duplicate_in_same_scope() {
        let types = TypeManager::new();
        let mut table = SymbolTable::new();
        table.push_new_scope(GLOBAL_SCOPE_NAME);
        table.add_local_var("x", types.integer()).unwrap();
        let err = table.add_parameter("x", types.float()).unwrap_err();
        assert_eq!(err.name, "x");
    }

    #[test]
    fn test_shadowing_across_scopes() {
        let types = TypeManager::new();
        let mut table = SymbolTable::new();
        table.push_new_scope(GLOBAL_SCOPE_NAME);
        table.add_local_var("x", types.integer()).unwrap();
        table.push_new_scope("f");
        table.add_local_var("x", types.float()).unwrap();

        assert_eq!(table.get_type("x"), Some(types.float()));
        table.pop_scope();
        assert_eq!(table.get_type("x"), Some(types.integer()));
    }

    #[test]
    fn test_scopes_persist_and_reenter() {
        let types = TypeManager::new();
        let mut table = SymbolTable::new();
        table.push_new_scope(GLOBAL_SCOPE_NAME);
        let inner = table.push_new_scope("f");
        table.add_parameter("n", types.integer()).unwrap();
        table.pop_scope();

        assert!(table.find_in_stack("n").is_none());
        table.push_scope(inner);
        assert!(table.find_in_current_scope("n"));
        assert!(table.is_parameter("n"));
        table.pop_scope();
    }

    #[test]
    fn test_main_signature_check() {
        let mut types = TypeManager::new();
        let mut table = SymbolTable::new();
        table.push_new_scope(GLOBAL_SCOPE_NAME);
        assert!(table.no_main_properly_declared(&types));

        let bad = types.function(vec![types.integer()], types.void());
        table.add_function("main", bad).unwrap();
        assert!(table.no_main_properly_declared(&types));

        let mut table = SymbolTable::new();
        table.push_new_scope(GLOBAL_SCOPE_NAME);
        let good = types.function(vec![], types.void());
        table.add_function("main", good).unwrap();
        assert!(!table.no_main_properly_declared(&types));
    }
}
