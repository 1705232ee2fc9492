//! Second pass: type checking and l-value analysis.
//!
//! Re-enters each scope through the handle the collector left on the node,
//! computes a type and an l-value flag for every expression and
//! left-expression, and validates statements against them. All complaints
//! go through the reporter; the `Error` type short-circuits checks on
//! subtrees that already failed so one mistake stays one message.

use crate::ast::{ArithOp, NodeId, NodeKind, RelOp, Tree, UnaryOp};
use crate::error::{CompileError, Result};
use crate::semantic::reporter::DiagnosticKind;
use crate::types::TypeId;
use crate::Context;

/// The type-checking pass.
#[derive(Debug)]
pub struct TypeChecker<'a> {
    ctx: &'a mut Context,
    /// Type of the function whose body is being checked.
    current_function: TypeId,
}

impl<'a> TypeChecker<'a> {
    /// Creates the pass over a compilation context already populated by
    /// the symbol collector.
    pub fn new(ctx: &'a mut Context) -> Self {
        let placeholder = ctx.types.error();
        Self { ctx, current_function: placeholder }
    }

    /// Runs the pass over the whole tree, finishing with the `main` check.
    pub fn run(&mut self, tree: &Tree) -> Result<()> {
        let root = tree.root().ok_or(CompileError::MissingRoot)?;
        let NodeKind::Program { functions } = tree.kind(root) else {
            return Err(CompileError::MalformedTree { node: root, expected: "program" });
        };
        let scope = self.ctx.decorations.scope_of(root)?;
        self.ctx.symbols.push_scope(scope);
        for &func in functions {
            self.visit_function(tree, func)?;
        }
        if self.ctx.symbols.no_main_properly_declared(&self.ctx.types) {
            self.ctx
                .reporter
                .report(DiagnosticKind::NoMainProperlyDeclared, tree.pos(root));
        }
        self.ctx.symbols.pop_scope();
        Ok(())
    }

    fn visit_function(&mut self, tree: &Tree, node: NodeId) -> Result<()> {
        let NodeKind::Function { body, .. } = tree.kind(node) else {
            return Err(CompileError::MalformedTree { node, expected: "function" });
        };
        let scope = self.ctx.decorations.scope_of(node)?;
        self.ctx.symbols.push_scope(scope);
        self.current_function = self.ctx.decorations.type_of(node)?;
        self.visit_statements(tree, *body)?;
        self.ctx.symbols.pop_scope();
        Ok(())
    }

    fn visit_statements(&mut self, tree: &Tree, node: NodeId) -> Result<()> {
        let NodeKind::Statements { stmts } = tree.kind(node) else {
            return Err(CompileError::MalformedTree { node, expected: "statement block" });
        };
        for &stmt in stmts {
            self.visit_statement(tree, stmt)?;
        }
        Ok(())
    }

    fn visit_statement(&mut self, tree: &Tree, node: NodeId) -> Result<()> {
        match tree.kind(node) {
            NodeKind::Assign { target, value } => {
                self.visit_left_expr(tree, *target)?;
                let t_left = self.ctx.decorations.type_of(*target)?;
                self.visit_expr(tree, *value)?;
                let t_right = self.ctx.decorations.type_of(*value)?;

                if !self.ctx.types.is_error(t_left)
                    && !self.ctx.decorations.lvalue_of(*target)?
                {
                    self.ctx.reporter.report(
                        DiagnosticKind::NonReferenceableLeftExpr,
                        tree.pos(*target),
                    );
                }
                if !self.ctx.types.is_error(t_left)
                    && !self.ctx.types.is_error(t_right)
                    && !self.ctx.types.copyable(t_left, t_right)
                {
                    self.ctx
                        .reporter
                        .report(DiagnosticKind::IncompatibleAssignment, tree.pos(node));
                }
            }

            NodeKind::If { cond, then_branch, else_branch } => {
                self.visit_expr(tree, *cond)?;
                let t = self.ctx.decorations.type_of(*cond)?;
                if !self.ctx.types.is_error(t) && !self.ctx.types.is_boolean(t) {
                    self.ctx
                        .reporter
                        .report(DiagnosticKind::BooleanRequired, tree.pos(node));
                }
                self.visit_statements(tree, *then_branch)?;
                if let Some(els) = else_branch {
                    self.visit_statements(tree, *els)?;
                }
            }

            NodeKind::While { cond, body } => {
                self.visit_expr(tree, *cond)?;
                let t = self.ctx.decorations.type_of(*cond)?;
                if !self.ctx.types.is_error(t) && !self.ctx.types.is_boolean(t) {
                    self.ctx
                        .reporter
                        .report(DiagnosticKind::BooleanRequired, tree.pos(node));
                }
                self.visit_statements(tree, *body)?;
            }

            NodeKind::ProcCall { callee, args } => {
                self.check_call(tree, node, *callee, args, false)?;
            }

            NodeKind::Read { target } => {
                self.visit_left_expr(tree, *target)?;
                let t = self.ctx.decorations.type_of(*target)?;
                if !self.ctx.types.is_error(t)
                    && !self.ctx.types.is_primitive(t)
                    && !self.ctx.types.is_function(t)
                {
                    self.ctx
                        .reporter
                        .report(DiagnosticKind::ReadWriteRequireBasic, tree.pos(node));
                }
                if !self.ctx.types.is_error(t) && !self.ctx.decorations.lvalue_of(*target)? {
                    self.ctx
                        .reporter
                        .report(DiagnosticKind::NonReferenceableExpression, tree.pos(node));
                }
            }

            NodeKind::WriteExpr { expr } => {
                self.visit_expr(tree, *expr)?;
                let t = self.ctx.decorations.type_of(*expr)?;
                if !self.ctx.types.is_error(t) && !self.ctx.types.is_primitive(t) {
                    self.ctx
                        .reporter
                        .report(DiagnosticKind::ReadWriteRequireBasic, tree.pos(node));
                }
            }

            NodeKind::WriteString { .. } => {}

            NodeKind::Return { value } => {
                let t_ret = self.ctx.types.return_type(self.current_function)?;
                let t_expr = match value {
                    Some(expr) => {
                        self.visit_expr(tree, *expr)?;
                        self.ctx.decorations.type_of(*expr)?
                    }
                    None => self.ctx.types.void(),
                };
                if !self.ctx.types.is_error(t_expr)
                    && !self.ctx.types.is_error(t_ret)
                    && !self.ctx.types.copyable(t_ret, t_expr)
                {
                    self.ctx
                        .reporter
                        .report(DiagnosticKind::IncompatibleReturn, tree.pos(node));
                }
            }

            NodeKind::Swap { left, right } => {
                self.visit_left_expr(tree, *left)?;
                let t1 = self.ctx.decorations.type_of(*left)?;
                self.visit_left_expr(tree, *right)?;
                let t2 = self.ctx.decorations.type_of(*right)?;
                if !self.ctx.types.is_error(t1)
                    && !self.ctx.types.is_error(t2)
                    && !self.ctx.types.equal(t1, t2)
                {
                    self.ctx
                        .reporter
                        .report(DiagnosticKind::IncompatibleArgumentsInSwap, tree.pos(node));
                }
            }

            NodeKind::Switch { scrutinee, cases, default } => {
                self.visit_expr(tree, *scrutinee)?;
                let t0 = self.ctx.decorations.type_of(*scrutinee)?;
                for case in cases {
                    self.visit_expr(tree, case.value)?;
                    let ti = self.ctx.decorations.type_of(case.value)?;
                    if !self.ctx.types.is_error(t0)
                        && !self.ctx.types.is_error(ti)
                        && !self.ctx.types.comparable(t0, ti, RelOp::Eq)
                    {
                        self.ctx.reporter.report(
                            DiagnosticKind::IncompatibleValueInSwitch,
                            tree.pos(case.value),
                        );
                    }
                    self.visit_statements(tree, case.body)?;
                }
                if let Some(default) = default {
                    self.visit_statements(tree, *default)?;
                }
            }

            NodeKind::Statements { .. } => self.visit_statements(tree, node)?,

            _ => {
                return Err(CompileError::MalformedTree { node, expected: "statement" });
            }
        }
        Ok(())
    }

    /// Shared arity/argument validation for call statements and call
    /// expressions. `as_expr` additionally constrains the return type and
    /// decorates the call node.
    fn check_call(
        &mut self,
        tree: &Tree,
        node: NodeId,
        callee: NodeId,
        args: &[NodeId],
        as_expr: bool,
    ) -> Result<()> {
        let name = tree
            .ident_name(callee)
            .ok_or(CompileError::MalformedTree { node: callee, expected: "identifier" })?
            .to_string();
        self.visit_ident(tree, callee)?;
        let t_callee = self.ctx.decorations.type_of(callee)?;

        let mut bad_call = false;
        if !self.ctx.types.is_function(t_callee) && !self.ctx.types.is_error(t_callee) {
            self.ctx.reporter.report(
                DiagnosticKind::IsNotCallable { name: name.clone() },
                tree.pos(callee),
            );
            bad_call = true;
        }

        let mut result_ty = self.ctx.types.error();
        if self.ctx.types.is_function(t_callee) {
            let t_ret = self.ctx.types.return_type(t_callee)?;
            if as_expr {
                if self.ctx.types.is_void(t_ret) {
                    self.ctx.reporter.report(
                        DiagnosticKind::IsNotFunction { name: name.clone() },
                        tree.pos(callee),
                    );
                } else {
                    result_ty = t_ret;
                }
            }
            if self.ctx.types.param_count(t_callee)? != args.len() {
                self.ctx
                    .reporter
                    .report(DiagnosticKind::NumberOfParameters, tree.pos(node));
                bad_call = true;
            }
        }
        if as_expr {
            self.ctx.decorations.put_type(node, result_ty);
            self.ctx.decorations.put_lvalue(node, false);
        }

        for (i, &arg) in args.iter().enumerate() {
            self.visit_expr(tree, arg)?;
            if bad_call || !self.ctx.types.is_function(t_callee) {
                continue;
            }
            let t_param = self.ctx.types.param_type(t_callee, i)?;
            let t_arg = self.ctx.decorations.type_of(arg)?;
            if !self.ctx.types.is_error(t_param)
                && !self.ctx.types.is_error(t_arg)
                && !self.ctx.types.equal(t_param, t_arg)
                && !(self.ctx.types.is_float(t_param) && self.ctx.types.is_integer(t_arg))
            {
                self.ctx.reporter.report(
                    DiagnosticKind::IncompatibleParameter { index: i + 1 },
                    tree.pos(arg),
                );
            }
        }
        Ok(())
    }

    fn visit_left_expr(&mut self, tree: &Tree, node: NodeId) -> Result<()> {
        let NodeKind::LeftExpr { ident, index } = tree.kind(node) else {
            return Err(CompileError::MalformedTree { node, expected: "left expression" });
        };
        self.visit_ident(tree, *ident)?;
        let mut t = self.ctx.decorations.type_of(*ident)?;
        let mut lvalue = self.ctx.decorations.lvalue_of(*ident)?;

        if let Some(index) = index {
            self.visit_expr(tree, *index)?;
            let t_index = self.ctx.decorations.type_of(*index)?;
            let mut indexable = !self.ctx.types.is_error(t);

            if !self.ctx.types.is_error(t) && !self.ctx.types.is_array(t) {
                self.ctx
                    .reporter
                    .report(DiagnosticKind::NonArrayInArrayAccess, tree.pos(*ident));
                t = self.ctx.types.error();
                lvalue = false;
                indexable = false;
            }
            if !self.ctx.types.is_error(t_index) && !self.ctx.types.is_integer(t_index) {
                self.ctx.reporter.report(
                    DiagnosticKind::NonIntegerIndexInArrayAccess,
                    tree.pos(*index),
                );
            }
            if indexable {
                t = self.ctx.types.array_elem(t)?;
                lvalue = true;
            }
        }

        self.ctx.decorations.put_type(node, t);
        self.ctx.decorations.put_lvalue(node, lvalue);
        Ok(())
    }

    fn visit_expr(&mut self, tree: &Tree, node: NodeId) -> Result<()> {
        match tree.kind(node) {
            NodeKind::IntLit { .. } => {
                let t = self.ctx.types.integer();
                self.decorate(node, t, false);
            }
            NodeKind::FloatLit { .. } => {
                let t = self.ctx.types.float();
                self.decorate(node, t, false);
            }
            NodeKind::CharLit { .. } => {
                let t = self.ctx.types.character();
                self.decorate(node, t, false);
            }
            NodeKind::BoolLit { .. } => {
                let t = self.ctx.types.boolean();
                self.decorate(node, t, false);
            }

            NodeKind::Ident { .. } => self.visit_ident(tree, node)?,

            NodeKind::Paren { expr } => {
                self.visit_expr(tree, *expr)?;
                let t = self.ctx.decorations.type_of(*expr)?;
                self.decorate(node, t, false);
            }

            NodeKind::ArrayIndex { ident, index } => {
                self.visit_ident(tree, *ident)?;
                let t_base = self.ctx.decorations.type_of(*ident)?;
                let lvalue = self.ctx.decorations.lvalue_of(*ident)?;

                if !self.ctx.types.is_error(t_base) && !self.ctx.types.is_array(t_base) {
                    self.ctx
                        .reporter
                        .report(DiagnosticKind::NonArrayInArrayAccess, tree.pos(node));
                }
                let t = if self.ctx.types.is_array(t_base) {
                    self.ctx.types.array_elem(t_base)?
                } else {
                    self.ctx.types.error()
                };
                self.decorate(node, t, lvalue);

                self.visit_expr(tree, *index)?;
                let t_index = self.ctx.decorations.type_of(*index)?;
                if !self.ctx.types.is_error(t_index) && !self.ctx.types.is_integer(t_index) {
                    self.ctx.reporter.report(
                        DiagnosticKind::NonIntegerIndexInArrayAccess,
                        tree.pos(*index),
                    );
                }
            }

            NodeKind::Unary { op, expr } => {
                self.visit_expr(tree, *expr)?;
                let t = self.ctx.decorations.type_of(*expr)?;
                match op {
                    UnaryOp::Not => {
                        if !self.ctx.types.is_error(t) && !self.ctx.types.is_boolean(t) {
                            self.report_bad_operator(tree, node, op.to_string());
                        }
                        let b = self.ctx.types.boolean();
                        self.decorate(node, b, false);
                    }
                    UnaryOp::Plus | UnaryOp::Minus => {
                        if !self.ctx.types.is_error(t) && !self.ctx.types.is_numeric(t) {
                            self.report_bad_operator(tree, node, op.to_string());
                        }
                        let result = if self.ctx.types.is_numeric(t) {
                            t
                        } else {
                            self.ctx.types.integer()
                        };
                        self.decorate(node, result, false);
                    }
                }
            }

            NodeKind::Arith { op, lhs, rhs } => {
                self.visit_expr(tree, *lhs)?;
                let t1 = self.ctx.decorations.type_of(*lhs)?;
                self.visit_expr(tree, *rhs)?;
                let t2 = self.ctx.decorations.type_of(*rhs)?;

                if (!self.ctx.types.is_error(t1) && !self.ctx.types.is_numeric(t1))
                    || (!self.ctx.types.is_error(t2) && !self.ctx.types.is_numeric(t2))
                {
                    self.report_bad_operator(tree, node, op.to_string());
                }
                if *op == ArithOp::Mod
                    && (self.ctx.types.is_float(t1) || self.ctx.types.is_float(t2))
                {
                    self.report_bad_operator(tree, node, op.to_string());
                }
                let t = if self.ctx.types.is_float(t1) || self.ctx.types.is_float(t2) {
                    self.ctx.types.float()
                } else {
                    self.ctx.types.integer()
                };
                self.decorate(node, t, false);
            }

            NodeKind::Rel { op, lhs, rhs } => {
                self.visit_expr(tree, *lhs)?;
                let t1 = self.ctx.decorations.type_of(*lhs)?;
                self.visit_expr(tree, *rhs)?;
                let t2 = self.ctx.decorations.type_of(*rhs)?;

                if !self.ctx.types.is_error(t1)
                    && !self.ctx.types.is_error(t2)
                    && !self.ctx.types.comparable(t1, t2, *op)
                {
                    self.report_bad_operator(tree, node, op.to_string());
                }
                let b = self.ctx.types.boolean();
                self.decorate(node, b, false);
            }

            NodeKind::Logic { op, lhs, rhs } => {
                self.visit_expr(tree, *lhs)?;
                let t1 = self.ctx.decorations.type_of(*lhs)?;
                self.visit_expr(tree, *rhs)?;
                let t2 = self.ctx.decorations.type_of(*rhs)?;

                if (!self.ctx.types.is_error(t1) && !self.ctx.types.is_boolean(t1))
                    || (!self.ctx.types.is_error(t2) && !self.ctx.types.is_boolean(t2))
                {
                    self.report_bad_operator(tree, node, op.to_string());
                }
                let b = self.ctx.types.boolean();
                self.decorate(node, b, false);
            }

            NodeKind::FuncCall { callee, args } => {
                self.check_call(tree, node, *callee, args, true)?;
            }

            _ => {
                return Err(CompileError::MalformedTree { node, expected: "expression" });
            }
        }
        Ok(())
    }

    fn visit_ident(&mut self, tree: &Tree, node: NodeId) -> Result<()> {
        let name = tree
            .ident_name(node)
            .ok_or(CompileError::MalformedTree { node, expected: "identifier" })?;
        match self.ctx.symbols.get_type(name) {
            Some(t) => {
                let is_function = self.ctx.symbols.is_function(name);
                self.decorate(node, t, !is_function);
            }
            None => {
                self.ctx.reporter.report(
                    DiagnosticKind::UndeclaredIdent { name: name.to_string() },
                    tree.pos(node),
                );
                // L-value stays true so an undeclared assignment target
                // reports only the missing declaration.
                let err = self.ctx.types.error();
                self.decorate(node, err, true);
            }
        }
        Ok(())
    }

    fn decorate(&mut self, node: NodeId, ty: TypeId, lvalue: bool) {
        self.ctx.decorations.put_type(node, ty);
        self.ctx.decorations.put_lvalue(node, lvalue);
    }

    fn report_bad_operator(&mut self, tree: &Tree, node: NodeId, op: String) {
        self.ctx
            .reporter
            .report(DiagnosticKind::IncompatibleOperator { op }, tree.pos(node));
    }
}
