//! First pass: builds scopes and registers every declaration.
//!
//! Walks the tree once, pushing a fresh scope per function, recording
//! parameters and locals, and computing each function's type from its
//! declared parameter and return types. Scope handles and declaration
//! types land in the decoration store for the later passes to re-enter.

use crate::ast::{NodeId, NodeKind, Primitive, Tree};
use crate::error::{CompileError, Result};
use crate::semantic::reporter::DiagnosticKind;
use crate::symtab::GLOBAL_SCOPE_NAME;
use crate::types::TypeId;
use crate::Context;

/// The symbol-collection pass.
#[derive(Debug)]
pub struct SymbolCollector<'a> {
    ctx: &'a mut Context,
}

impl<'a> SymbolCollector<'a> {
    /// Creates the pass over a compilation context.
    pub fn new(ctx: &'a mut Context) -> Self {
        Self { ctx }
    }

    /// Runs the pass over the whole tree.
    pub fn run(&mut self, tree: &Tree) -> Result<()> {
        let root = tree.root().ok_or(CompileError::MissingRoot)?;
        self.visit_program(tree, root)
    }

    fn visit_program(&mut self, tree: &Tree, node: NodeId) -> Result<()> {
        let NodeKind::Program { functions } = tree.kind(node) else {
            return Err(CompileError::MalformedTree { node, expected: "program" });
        };
        let scope = self.ctx.symbols.push_new_scope(GLOBAL_SCOPE_NAME);
        self.ctx.decorations.put_scope(node, scope);
        for &func in functions {
            self.visit_function(tree, func)?;
        }
        self.ctx.symbols.pop_scope();
        Ok(())
    }

    fn visit_function(&mut self, tree: &Tree, node: NodeId) -> Result<()> {
        let NodeKind::Function { name, params, decls, ret_type, .. } = tree.kind(node) else {
            return Err(CompileError::MalformedTree { node, expected: "function" });
        };

        let scope = self.ctx.symbols.push_new_scope(name);
        self.ctx.decorations.put_scope(node, scope);

        let mut param_types = Vec::with_capacity(params.len());
        for &param in params {
            param_types.push(self.visit_param(tree, param)?);
        }
        self.visit_declarations(tree, *decls)?;
        self.ctx.symbols.pop_scope();

        let declared_ret = match ret_type {
            Some(ty) => Some(self.visit_type(tree, *ty)?),
            None => None,
        };

        // A redeclared function keeps an error return type and is not
        // registered; the decoration still lands so later passes read a
        // function type at this node either way.
        if self.ctx.symbols.find_in_current_scope(name) {
            self.ctx.reporter.report(
                DiagnosticKind::DeclaredIdent { name: name.clone() },
                tree.pos(node),
            );
            let ret = self.ctx.types.error();
            let func_ty = self.ctx.types.function(param_types, ret);
            self.ctx.decorations.put_type(node, func_ty);
        } else {
            let ret = declared_ret.unwrap_or_else(|| self.ctx.types.void());
            let func_ty = self.ctx.types.function(param_types, ret);
            self.ctx.decorations.put_type(node, func_ty);
            self.ctx
                .symbols
                .add_function(name, func_ty)
                .expect("current scope was checked for the name above");
        }
        Ok(())
    }

    fn visit_param(&mut self, tree: &Tree, node: NodeId) -> Result<TypeId> {
        let NodeKind::ParamDecl { name, ty } = tree.kind(node) else {
            return Err(CompileError::MalformedTree { node, expected: "parameter declaration" });
        };
        let param_ty = self.visit_type(tree, *ty)?;
        if self.ctx.symbols.add_parameter(name, param_ty).is_err() {
            self.ctx.reporter.report(
                DiagnosticKind::DeclaredIdent { name: name.clone() },
                tree.pos(node),
            );
        }
        self.ctx.decorations.put_type(node, param_ty);
        Ok(param_ty)
    }

    fn visit_declarations(&mut self, tree: &Tree, node: NodeId) -> Result<()> {
        let NodeKind::Declarations { decls } = tree.kind(node) else {
            return Err(CompileError::MalformedTree { node, expected: "declaration block" });
        };
        for &decl in decls {
            self.visit_variable_decl(tree, decl)?;
        }
        Ok(())
    }

    fn visit_variable_decl(&mut self, tree: &Tree, node: NodeId) -> Result<()> {
        let NodeKind::VariableDecl { names, ty } = tree.kind(node) else {
            return Err(CompileError::MalformedTree { node, expected: "variable declaration" });
        };
        let var_ty = self.visit_type(tree, *ty)?;
        for &ident in names {
            let name = tree.ident_name(ident).ok_or(CompileError::MalformedTree {
                node: ident,
                expected: "identifier",
            })?;
            if self.ctx.symbols.add_local_var(name, var_ty).is_err() {
                self.ctx.reporter.report(
                    DiagnosticKind::DeclaredIdent { name: name.to_string() },
                    tree.pos(ident),
                );
            }
        }
        Ok(())
    }

    fn visit_type(&mut self, tree: &Tree, node: NodeId) -> Result<TypeId> {
        let ty = match tree.kind(node) {
            NodeKind::BasicType(prim) => match prim {
                Primitive::Int => self.ctx.types.integer(),
                Primitive::Float => self.ctx.types.float(),
                Primitive::Bool => self.ctx.types.boolean(),
                Primitive::Char => self.ctx.types.character(),
            },
            NodeKind::ArrayType { size, elem } => {
                let elem_ty = self.visit_type(tree, *elem)?;
                self.ctx.types.array(*size, elem_ty)
            }
            _ => {
                return Err(CompileError::MalformedTree { node, expected: "type" });
            }
        };
        self.ctx.decorations.put_type(node, ty);
        Ok(ty)
    }
}
