//! Side table attaching pass results to tree nodes.
//!
//! Three typed sub-maps keyed by node identity: the scope a node opened,
//! the type an expression was given, and whether a position is storable.
//! An absent entry means "not yet decorated"; reading one is a bug in the
//! pass ordering and surfaces as [`CompileError::MissingDecoration`].

use std::collections::HashMap;

use crate::ast::NodeId;
use crate::error::{CompileError, Result};
use crate::symtab::ScopeId;
use crate::types::TypeId;

/// Scope, type and l-value annotations for one tree.
#[derive(Debug, Default)]
pub struct Decorations {
    scopes: HashMap<NodeId, ScopeId>,
    types: HashMap<NodeId, TypeId>,
    lvalues: HashMap<NodeId, bool>,
}

impl Decorations {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the scope opened at `node`.
    pub fn put_scope(&mut self, node: NodeId, scope: ScopeId) {
        self.scopes.insert(node, scope);
    }

    /// The scope recorded at `node`.
    pub fn scope_of(&self, node: NodeId) -> Result<ScopeId> {
        self.scopes
            .get(&node)
            .copied()
            .ok_or(CompileError::MissingDecoration { node, what: "scope" })
    }

    /// Records the type of `node`.
    pub fn put_type(&mut self, node: NodeId, ty: TypeId) {
        self.types.insert(node, ty);
    }

    /// The type recorded at `node`.
    pub fn type_of(&self, node: NodeId) -> Result<TypeId> {
        self.types
            .get(&node)
            .copied()
            .ok_or(CompileError::MissingDecoration { node, what: "type" })
    }

    /// Whether `node` has a type decoration yet.
    pub fn has_type(&self, node: NodeId) -> bool {
        self.types.contains_key(&node)
    }

    /// Records whether `node` denotes a storable location.
    pub fn put_lvalue(&mut self, node: NodeId, is_lvalue: bool) {
        self.lvalues.insert(node, is_lvalue);
    }

    /// The l-value flag recorded at `node`.
    pub fn lvalue_of(&self, node: NodeId) -> Result<bool> {
        self.lvalues
            .get(&node)
            .copied()
            .ok_or(CompileError::MissingDecoration { node, what: "l-value" })
    }

    /// Whether `node` has an l-value decoration yet.
    pub fn has_lvalue(&self, node: NodeId) -> bool {
        self.lvalues.contains_key(&node)
    }
}
