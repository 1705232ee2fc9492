//! Third pass: lowers the checked tree into three-address code.
//!
//! Expressions lower to an address plus the instructions that fill it;
//! indexed left-expressions additionally carry the index address so stores
//! can pick `XLOAD` over `LOAD`. Temporary and label counters reset at
//! every function entry, so numbering is per-subroutine.

use crate::ast::{ArithOp, LogicOp, NodeId, NodeKind, RelOp, Tree, UnaryOp};
use crate::error::{CompileError, Result};
use crate::Context;

use super::instruction::Instruction;
use super::program::{Subroutine, TacProgram};

/// Result of lowering one expression or left-expression.
#[derive(Debug, Clone)]
struct ExprCode {
    /// Address holding the value (or the base array for indexed targets)
    addr: String,
    /// Index address, present only for indexed left-expressions
    offs: Option<String>,
    /// Instructions computing the value
    code: Vec<Instruction>,
}

impl ExprCode {
    fn plain(addr: String) -> Self {
        Self { addr, offs: None, code: Vec::new() }
    }
}

/// The code-generation pass.
#[derive(Debug)]
pub struct CodeGenerator<'a> {
    ctx: &'a mut Context,
    temps: u32,
    while_labels: u32,
    if_labels: u32,
}

impl<'a> CodeGenerator<'a> {
    /// Creates the pass over a context populated by the first two passes.
    pub fn new(ctx: &'a mut Context) -> Self {
        Self { ctx, temps: 0, while_labels: 0, if_labels: 0 }
    }

    /// Lowers the whole tree into a program.
    pub fn run(&mut self, tree: &Tree) -> Result<TacProgram> {
        let root = tree.root().ok_or(CompileError::MissingRoot)?;
        let NodeKind::Program { functions } = tree.kind(root) else {
            return Err(CompileError::MalformedTree { node: root, expected: "program" });
        };
        let scope = self.ctx.decorations.scope_of(root)?;
        self.ctx.symbols.push_scope(scope);
        let mut program = TacProgram::new();
        for &func in functions {
            let subroutine = self.gen_function(tree, func)?;
            program.add_subroutine(subroutine);
        }
        self.ctx.symbols.pop_scope();
        Ok(program)
    }

    fn new_temp(&mut self) -> String {
        let temp = format!("%t{}", self.temps);
        self.temps += 1;
        temp
    }

    fn new_while_label(&mut self) -> u32 {
        self.while_labels += 1;
        self.while_labels
    }

    fn new_if_label(&mut self) -> u32 {
        self.if_labels += 1;
        self.if_labels
    }

    // === Functions ===

    fn gen_function(&mut self, tree: &Tree, node: NodeId) -> Result<Subroutine> {
        let NodeKind::Function { name, params, decls, ret_type, body } = tree.kind(node) else {
            return Err(CompileError::MalformedTree { node, expected: "function" });
        };
        let scope = self.ctx.decorations.scope_of(node)?;
        self.ctx.symbols.push_scope(scope);
        self.temps = 0;
        self.while_labels = 0;
        self.if_labels = 0;

        let mut subroutine = Subroutine::new(name);

        if let Some(ret) = ret_type {
            let ret_ty = self.ctx.decorations.type_of(*ret)?;
            subroutine.add_param("_result", self.ctx.types.text(ret_ty), false);
        }

        for &param in params {
            let NodeKind::ParamDecl { name, ty } = tree.kind(param) else {
                return Err(CompileError::MalformedTree {
                    node: param,
                    expected: "parameter declaration",
                });
            };
            let param_ty = self.ctx.decorations.type_of(*ty)?;
            if self.ctx.types.is_array(param_ty) {
                let elem = self.ctx.types.array_elem(param_ty)?;
                subroutine.add_param(name, self.ctx.types.text(elem), true);
            } else {
                subroutine.add_param(name, self.ctx.types.text(param_ty), false);
            }
        }

        self.gen_locals(tree, *decls, &mut subroutine)?;

        let mut code = self.gen_statements(tree, *body)?;
        if ret_type.is_none() {
            code.push(Instruction::Return);
        }
        subroutine.instructions = code;

        self.ctx.symbols.pop_scope();
        Ok(subroutine)
    }

    fn gen_locals(&mut self, tree: &Tree, node: NodeId, subroutine: &mut Subroutine) -> Result<()> {
        let NodeKind::Declarations { decls } = tree.kind(node) else {
            return Err(CompileError::MalformedTree { node, expected: "declaration block" });
        };
        for &decl in decls {
            let NodeKind::VariableDecl { names, ty } = tree.kind(decl) else {
                return Err(CompileError::MalformedTree {
                    node: decl,
                    expected: "variable declaration",
                });
            };
            let var_ty = self.ctx.decorations.type_of(*ty)?;
            let size = self.ctx.types.size_of(var_ty);
            let elem_text = if self.ctx.types.is_array(var_ty) {
                let elem = self.ctx.types.array_elem(var_ty)?;
                self.ctx.types.text(elem)
            } else {
                self.ctx.types.text(var_ty)
            };
            for &ident in names {
                let name = tree.ident_name(ident).ok_or(CompileError::MalformedTree {
                    node: ident,
                    expected: "identifier",
                })?;
                subroutine.add_local(name, elem_text.clone(), size);
            }
        }
        Ok(())
    }

    // === Statements ===

    fn gen_statements(&mut self, tree: &Tree, node: NodeId) -> Result<Vec<Instruction>> {
        let NodeKind::Statements { stmts } = tree.kind(node) else {
            return Err(CompileError::MalformedTree { node, expected: "statement block" });
        };
        let mut code = Vec::new();
        for &stmt in stmts {
            code.extend(self.gen_statement(tree, stmt)?);
        }
        Ok(code)
    }

    fn gen_statement(&mut self, tree: &Tree, node: NodeId) -> Result<Vec<Instruction>> {
        match tree.kind(node) {
            NodeKind::Assign { target, value } => self.gen_assign(tree, *target, *value),

            NodeKind::If { cond, then_branch, else_branch } => {
                let cond_code = self.gen_expr(tree, *cond)?;
                let then_code = self.gen_statements(tree, *then_branch)?;
                let label = self.new_if_label();
                let end_label = format!("endif{label}");

                let mut code = cond_code.code;
                match else_branch {
                    Some(els) => {
                        let else_code = self.gen_statements(tree, *els)?;
                        let else_label = format!("else{label}");
                        code.push(Instruction::FJump(cond_code.addr, else_label.clone()));
                        code.extend(then_code);
                        code.push(Instruction::UJump(end_label.clone()));
                        code.push(Instruction::Label(else_label));
                        code.extend(else_code);
                        code.push(Instruction::Label(end_label));
                    }
                    None => {
                        code.push(Instruction::FJump(cond_code.addr, end_label.clone()));
                        code.extend(then_code);
                        code.push(Instruction::Label(end_label));
                    }
                }
                Ok(code)
            }

            NodeKind::While { cond, body } => {
                let cond_code = self.gen_expr(tree, *cond)?;
                let body_code = self.gen_statements(tree, *body)?;
                let label = self.new_while_label();
                let begin_label = format!("beginwhile{label}");
                let end_label = format!("endwhile{label}");

                let mut code = vec![Instruction::Label(begin_label.clone())];
                code.extend(cond_code.code);
                code.push(Instruction::FJump(cond_code.addr, end_label.clone()));
                code.extend(body_code);
                code.push(Instruction::UJump(begin_label));
                code.push(Instruction::Label(end_label));
                Ok(code)
            }

            NodeKind::ProcCall { callee, args } => {
                let (code, _) = self.gen_call(tree, *callee, args, false)?;
                Ok(code)
            }

            NodeKind::Read { target } => {
                let left = self.gen_left_expr(tree, *target)?;
                let target_ty = self.ctx.decorations.type_of(*target)?;
                let temp = self.new_temp();

                let mut code = left.code;
                if self.ctx.types.is_integer(target_ty) || self.ctx.types.is_boolean(target_ty) {
                    code.push(Instruction::ReadI(temp.clone()));
                } else if self.ctx.types.is_float(target_ty) {
                    code.push(Instruction::ReadF(temp.clone()));
                } else if self.ctx.types.is_character(target_ty) {
                    code.push(Instruction::ReadC(temp.clone()));
                } else {
                    return Err(CompileError::UnsupportedRead { node: *target });
                }
                match left.offs {
                    Some(offs) => code.push(Instruction::XLoad(left.addr, offs, temp)),
                    None => code.push(Instruction::Load(left.addr, temp)),
                }
                Ok(code)
            }

            NodeKind::WriteExpr { expr } => {
                let value = self.gen_expr(tree, *expr)?;
                let expr_ty = self.ctx.decorations.type_of(*expr)?;
                let mut code = value.code;
                if self.ctx.types.is_float(expr_ty) {
                    code.push(Instruction::WriteF(value.addr));
                } else if self.ctx.types.is_character(expr_ty) {
                    code.push(Instruction::WriteC(value.addr));
                } else {
                    code.push(Instruction::WriteI(value.addr));
                }
                Ok(code)
            }

            NodeKind::WriteString { text } => Ok(vec![Instruction::WriteS(text.clone())]),

            NodeKind::Return { value } => {
                let mut code = Vec::new();
                if let Some(expr) = value {
                    let result = self.gen_expr(tree, *expr)?;
                    code.extend(result.code);
                    code.push(Instruction::Load("_result".to_string(), result.addr));
                }
                code.push(Instruction::Return);
                Ok(code)
            }

            NodeKind::Swap { left, right } => self.gen_swap(tree, *left, *right),

            NodeKind::Switch { scrutinee, cases, default } => {
                let scrutinee_code = self.gen_expr(tree, *scrutinee)?;
                let label = self.new_if_label();
                let end_label = format!("endswitch{label}");

                let scrutinee_addr = scrutinee_code.addr;
                let mut code = scrutinee_code.code;
                for case in cases {
                    let value = self.gen_expr(tree, case.value)?;
                    let temp = self.new_temp();
                    code.extend(value.code);
                    code.push(Instruction::Eq(
                        temp.clone(),
                        scrutinee_addr.clone(),
                        value.addr,
                    ));
                    code.push(Instruction::FJump(temp, end_label.clone()));
                    code.extend(self.gen_statements(tree, case.body)?);
                }
                if let Some(default) = default {
                    code.extend(self.gen_statements(tree, *default)?);
                }
                code.push(Instruction::Label(end_label));
                Ok(code)
            }

            NodeKind::Statements { .. } => self.gen_statements(tree, node),

            _ => Err(CompileError::MalformedTree { node, expected: "statement" }),
        }
    }

    fn gen_assign(&mut self, tree: &Tree, target: NodeId, value: NodeId) -> Result<Vec<Instruction>> {
        let left = self.gen_left_expr(tree, target)?;
        let right = self.gen_expr(tree, value)?;
        let t_left = self.ctx.decorations.type_of(target)?;
        let t_right = self.ctx.decorations.type_of(value)?;

        let mut code = left.code;
        code.extend(right.code);

        if self.ctx.types.is_array(t_left) && self.ctx.types.is_array(t_right) {
            // Length-bounded element copy.
            let size = self.ctx.types.array_size(t_left)?;
            let index = self.new_temp();
            let length = self.new_temp();
            let value = self.new_temp();
            let step = self.new_temp();
            let cmp = self.new_temp();
            let label = self.new_while_label();
            let head = format!("while{label}");
            let end = format!("endwhile{label}");

            code.push(Instruction::ILoad(index.clone(), "0".to_string()));
            code.push(Instruction::ILoad(length.clone(), size.to_string()));
            code.push(Instruction::ILoad(step.clone(), "1".to_string()));
            code.push(Instruction::Label(head.clone()));
            code.push(Instruction::Lt(cmp.clone(), index.clone(), length));
            code.push(Instruction::FJump(cmp, end.clone()));
            code.push(Instruction::LoadX(value.clone(), right.addr, index.clone()));
            code.push(Instruction::XLoad(left.addr, index.clone(), value));
            code.push(Instruction::Add(index.clone(), index.clone(), step));
            code.push(Instruction::UJump(head));
            code.push(Instruction::Label(end));
            return Ok(code);
        }

        let mut src = right.addr;
        if self.ctx.types.is_float(t_left) && self.ctx.types.is_integer(t_right) {
            let temp = self.new_temp();
            code.push(Instruction::Float(temp.clone(), src));
            src = temp;
        }
        match left.offs {
            Some(offs) => code.push(Instruction::XLoad(left.addr, offs, src)),
            None => code.push(Instruction::Load(left.addr, src)),
        }
        Ok(code)
    }

    fn gen_swap(&mut self, tree: &Tree, left: NodeId, right: NodeId) -> Result<Vec<Instruction>> {
        let a = self.gen_left_expr(tree, left)?;
        let b = self.gen_left_expr(tree, right)?;
        let t_left = self.ctx.decorations.type_of(left)?;
        let t_right = self.ctx.decorations.type_of(right)?;

        let mut code = a.code;
        code.extend(b.code);

        if self.ctx.types.is_array(t_left) && self.ctx.types.is_array(t_right) {
            // Element-wise exchange through two temporaries.
            let size = self.ctx.types.array_size(t_left)?;
            let index = self.new_temp();
            let length = self.new_temp();
            let step = self.new_temp();
            let cmp = self.new_temp();
            let from_a = self.new_temp();
            let from_b = self.new_temp();
            let label = self.new_while_label();
            let head = format!("while{label}");
            let end = format!("endwhile{label}");

            code.push(Instruction::ILoad(index.clone(), "0".to_string()));
            code.push(Instruction::ILoad(length.clone(), size.to_string()));
            code.push(Instruction::ILoad(step.clone(), "1".to_string()));
            code.push(Instruction::Label(head.clone()));
            code.push(Instruction::Lt(cmp.clone(), index.clone(), length));
            code.push(Instruction::FJump(cmp, end.clone()));
            code.push(Instruction::LoadX(from_a.clone(), a.addr.clone(), index.clone()));
            code.push(Instruction::LoadX(from_b.clone(), b.addr.clone(), index.clone()));
            code.push(Instruction::XLoad(a.addr, index.clone(), from_b));
            code.push(Instruction::XLoad(b.addr, index.clone(), from_a));
            code.push(Instruction::Add(index.clone(), index.clone(), step));
            code.push(Instruction::UJump(head));
            code.push(Instruction::Label(end));
            return Ok(code);
        }

        if a.offs.is_none() && b.offs.is_none() {
            let temp = self.new_temp();
            code.push(Instruction::Load(temp.clone(), a.addr.clone()));
            code.push(Instruction::Load(a.addr, b.addr.clone()));
            code.push(Instruction::Load(b.addr, temp));
            return Ok(code);
        }

        // At least one side is indexed: materialise both values, then
        // store them back crosswise.
        let from_a = self.new_temp();
        let from_b = self.new_temp();
        match &a.offs {
            Some(offs) => code.push(Instruction::LoadX(
                from_a.clone(),
                a.addr.clone(),
                offs.clone(),
            )),
            None => code.push(Instruction::Load(from_a.clone(), a.addr.clone())),
        }
        match &b.offs {
            Some(offs) => code.push(Instruction::LoadX(
                from_b.clone(),
                b.addr.clone(),
                offs.clone(),
            )),
            None => code.push(Instruction::Load(from_b.clone(), b.addr.clone())),
        }
        match a.offs {
            Some(offs) => code.push(Instruction::XLoad(a.addr, offs, from_b)),
            None => code.push(Instruction::Load(a.addr, from_b)),
        }
        match b.offs {
            Some(offs) => code.push(Instruction::XLoad(b.addr, offs, from_a)),
            None => code.push(Instruction::Load(b.addr, from_a)),
        }
        Ok(code)
    }

    // === Expressions ===

    fn gen_left_expr(&mut self, tree: &Tree, node: NodeId) -> Result<ExprCode> {
        let NodeKind::LeftExpr { ident, index } = tree.kind(node) else {
            return Err(CompileError::MalformedTree { node, expected: "left expression" });
        };
        let mut base = self.gen_ident(tree, *ident)?;
        if let Some(index) = index {
            let index_code = self.gen_expr(tree, *index)?;
            base.code.extend(index_code.code);
            base.offs = Some(index_code.addr);
        }
        Ok(base)
    }

    fn gen_ident(&mut self, tree: &Tree, node: NodeId) -> Result<ExprCode> {
        let name = tree
            .ident_name(node)
            .ok_or(CompileError::MalformedTree { node, expected: "identifier" })?;
        let mut result = ExprCode::plain(name.to_string());
        // An array parameter slot holds the caller's address; dereference
        // it before any use.
        let ty = self.ctx.decorations.type_of(node)?;
        if self.ctx.types.is_array(ty) && self.ctx.symbols.is_parameter(name) {
            let temp = self.new_temp();
            result
                .code
                .push(Instruction::Load(temp.clone(), result.addr));
            result.addr = temp;
        }
        Ok(result)
    }

    fn gen_expr(&mut self, tree: &Tree, node: NodeId) -> Result<ExprCode> {
        match tree.kind(node) {
            NodeKind::IntLit { text } => {
                let temp = self.new_temp();
                let code = vec![Instruction::ILoad(temp.clone(), text.clone())];
                Ok(ExprCode { addr: temp, offs: None, code })
            }
            NodeKind::FloatLit { text } => {
                let temp = self.new_temp();
                let code = vec![Instruction::FLoad(temp.clone(), text.clone())];
                Ok(ExprCode { addr: temp, offs: None, code })
            }
            NodeKind::CharLit { text } => {
                let inner = text
                    .strip_prefix('\'')
                    .and_then(|t| t.strip_suffix('\''))
                    .unwrap_or(text);
                let temp = self.new_temp();
                let code = vec![Instruction::ChLoad(temp.clone(), inner.to_string())];
                Ok(ExprCode { addr: temp, offs: None, code })
            }
            NodeKind::BoolLit { value } => {
                let temp = self.new_temp();
                let literal = if *value { "1" } else { "0" };
                let code = vec![Instruction::ILoad(temp.clone(), literal.to_string())];
                Ok(ExprCode { addr: temp, offs: None, code })
            }

            NodeKind::Ident { .. } => self.gen_ident(tree, node),

            NodeKind::Paren { expr } => self.gen_expr(tree, *expr),

            NodeKind::ArrayIndex { ident, index } => {
                let base = self.gen_ident(tree, *ident)?;
                let index_code = self.gen_expr(tree, *index)?;
                let temp = self.new_temp();
                let mut code = base.code;
                code.extend(index_code.code);
                code.push(Instruction::LoadX(temp.clone(), base.addr, index_code.addr));
                Ok(ExprCode { addr: temp, offs: None, code })
            }

            NodeKind::Unary { op, expr } => {
                let operand = self.gen_expr(tree, *expr)?;
                match op {
                    UnaryOp::Plus => Ok(operand),
                    UnaryOp::Minus => {
                        let temp = self.new_temp();
                        let operand_ty = self.ctx.decorations.type_of(*expr)?;
                        let mut code = operand.code;
                        if self.ctx.types.is_float(operand_ty) {
                            code.push(Instruction::FNeg(temp.clone(), operand.addr));
                        } else {
                            code.push(Instruction::Neg(temp.clone(), operand.addr));
                        }
                        Ok(ExprCode { addr: temp, offs: None, code })
                    }
                    UnaryOp::Not => {
                        let temp = self.new_temp();
                        let mut code = operand.code;
                        code.push(Instruction::Not(temp.clone(), operand.addr));
                        Ok(ExprCode { addr: temp, offs: None, code })
                    }
                }
            }

            NodeKind::Arith { op, lhs, rhs } => self.gen_arith(tree, *op, *lhs, *rhs),

            NodeKind::Rel { op, lhs, rhs } => self.gen_rel(tree, *op, *lhs, *rhs),

            NodeKind::Logic { op, lhs, rhs } => {
                let left = self.gen_expr(tree, *lhs)?;
                let right = self.gen_expr(tree, *rhs)?;
                let mut code = left.code;
                code.extend(right.code);
                let temp = self.new_temp();
                code.push(match op {
                    LogicOp::And => Instruction::And(temp.clone(), left.addr, right.addr),
                    LogicOp::Or => Instruction::Or(temp.clone(), left.addr, right.addr),
                });
                Ok(ExprCode { addr: temp, offs: None, code })
            }

            NodeKind::FuncCall { callee, args } => {
                let (code, addr) = self.gen_call(tree, *callee, args, true)?;
                let addr = addr.ok_or(CompileError::MalformedTree {
                    node,
                    expected: "value-returning call",
                })?;
                Ok(ExprCode { addr, offs: None, code })
            }

            _ => Err(CompileError::MalformedTree { node, expected: "expression" }),
        }
    }

    fn gen_arith(&mut self, tree: &Tree, op: ArithOp, lhs: NodeId, rhs: NodeId) -> Result<ExprCode> {
        let left = self.gen_expr(tree, lhs)?;
        let right = self.gen_expr(tree, rhs)?;
        let t1 = self.ctx.decorations.type_of(lhs)?;
        let t2 = self.ctx.decorations.type_of(rhs)?;

        let mut code = left.code;
        code.extend(right.code);
        let mut addr1 = left.addr;
        let mut addr2 = right.addr;

        let float_op =
            (self.ctx.types.is_float(t1) || self.ctx.types.is_float(t2)) && op != ArithOp::Mod;
        if float_op {
            if !self.ctx.types.is_float(t1) {
                let temp = self.new_temp();
                code.push(Instruction::Float(temp.clone(), addr1));
                addr1 = temp;
            } else if !self.ctx.types.is_float(t2) {
                let temp = self.new_temp();
                code.push(Instruction::Float(temp.clone(), addr2));
                addr2 = temp;
            }
        }

        let temp = self.new_temp();
        if float_op {
            code.push(match op {
                ArithOp::Mul => Instruction::FMul(temp.clone(), addr1, addr2),
                ArithOp::Div => Instruction::FDiv(temp.clone(), addr1, addr2),
                ArithOp::Add => Instruction::FAdd(temp.clone(), addr1, addr2),
                ArithOp::Sub => Instruction::FSub(temp.clone(), addr1, addr2),
                ArithOp::Mod => unreachable!("mod never takes the float path"),
            });
        } else {
            match op {
                ArithOp::Mul => code.push(Instruction::Mul(temp.clone(), addr1, addr2)),
                ArithOp::Div => code.push(Instruction::Div(temp.clone(), addr1, addr2)),
                ArithOp::Add => code.push(Instruction::Add(temp.clone(), addr1, addr2)),
                ArithOp::Sub => code.push(Instruction::Sub(temp.clone(), addr1, addr2)),
                ArithOp::Mod => {
                    // a % b == a - (a / b) * b
                    let quotient = self.new_temp();
                    let product = self.new_temp();
                    code.push(Instruction::Div(quotient.clone(), addr1.clone(), addr2.clone()));
                    code.push(Instruction::Mul(product.clone(), quotient, addr2));
                    code.push(Instruction::Sub(temp.clone(), addr1, product));
                }
            }
        }
        Ok(ExprCode { addr: temp, offs: None, code })
    }

    fn gen_rel(&mut self, tree: &Tree, op: RelOp, lhs: NodeId, rhs: NodeId) -> Result<ExprCode> {
        let left = self.gen_expr(tree, lhs)?;
        let right = self.gen_expr(tree, rhs)?;
        let t1 = self.ctx.decorations.type_of(lhs)?;
        let t2 = self.ctx.decorations.type_of(rhs)?;

        let mut code = left.code;
        code.extend(right.code);
        let mut addr1 = left.addr;
        let mut addr2 = right.addr;
        let temp = self.new_temp();

        let float_cmp = self.ctx.types.is_float(t1) || self.ctx.types.is_float(t2);
        if float_cmp {
            if !self.ctx.types.is_float(t1) {
                let widened = self.new_temp();
                code.push(Instruction::Float(widened.clone(), addr1));
                addr1 = widened;
            } else if !self.ctx.types.is_float(t2) {
                let widened = self.new_temp();
                code.push(Instruction::Float(widened.clone(), addr2));
                addr2 = widened;
            }
            match op {
                RelOp::Eq => code.push(Instruction::FEq(temp.clone(), addr1, addr2)),
                RelOp::Neq => {
                    code.push(Instruction::FEq(temp.clone(), addr1, addr2));
                    code.push(Instruction::Not(temp.clone(), temp.clone()));
                }
                RelOp::Lt => code.push(Instruction::FLt(temp.clone(), addr1, addr2)),
                RelOp::Gt => code.push(Instruction::FLt(temp.clone(), addr2, addr1)),
                RelOp::Le => code.push(Instruction::FLe(temp.clone(), addr1, addr2)),
                RelOp::Ge => code.push(Instruction::FLe(temp.clone(), addr2, addr1)),
            }
        } else {
            match op {
                RelOp::Eq => code.push(Instruction::Eq(temp.clone(), addr1, addr2)),
                RelOp::Neq => {
                    code.push(Instruction::Eq(temp.clone(), addr1, addr2));
                    code.push(Instruction::Not(temp.clone(), temp.clone()));
                }
                RelOp::Lt => code.push(Instruction::Lt(temp.clone(), addr1, addr2)),
                RelOp::Gt => code.push(Instruction::Lt(temp.clone(), addr2, addr1)),
                RelOp::Le => code.push(Instruction::Le(temp.clone(), addr1, addr2)),
                RelOp::Ge => code.push(Instruction::Le(temp.clone(), addr2, addr1)),
            }
        }
        Ok(ExprCode { addr: temp, offs: None, code })
    }

    /// Lowers a call. Returns the instructions plus, for value uses, the
    /// temporary the result was popped into.
    fn gen_call(
        &mut self,
        tree: &Tree,
        callee: NodeId,
        args: &[NodeId],
        as_expr: bool,
    ) -> Result<(Vec<Instruction>, Option<String>)> {
        let name = tree
            .ident_name(callee)
            .ok_or(CompileError::MalformedTree { node: callee, expected: "identifier" })?
            .to_string();
        let callee_ty = self.ctx.decorations.type_of(callee)?;
        let returns_value = !self.ctx.types.is_void_function(callee_ty);

        let mut code = Vec::new();
        // Reserve the result slot; a statement-position call to a void
        // callee skips it.
        if as_expr || returns_value {
            code.push(Instruction::Push(None));
        }

        let param_count = if self.ctx.types.is_function(callee_ty) {
            self.ctx.types.param_count(callee_ty)?
        } else {
            0
        };
        for (i, &arg) in args.iter().enumerate() {
            let value = self.gen_expr(tree, arg)?;
            code.extend(value.code);
            let mut addr = value.addr;

            if i < param_count {
                let t_param = self.ctx.types.param_type(callee_ty, i)?;
                let t_arg = self.ctx.decorations.type_of(arg)?;
                if self.ctx.types.is_float(t_param) && !self.ctx.types.is_float(t_arg) {
                    let temp = self.new_temp();
                    code.push(Instruction::Float(temp.clone(), addr));
                    addr = temp;
                } else if self.ctx.types.is_array(t_param) && !self.arg_is_array_parameter(tree, arg)
                {
                    // A locally owned array is passed by address.
                    let temp = self.new_temp();
                    code.push(Instruction::ALoad(temp.clone(), addr));
                    addr = temp;
                }
            }
            code.push(Instruction::Push(Some(addr)));
        }

        code.push(Instruction::Call(name));
        for _ in args {
            code.push(Instruction::Pop(None));
        }

        if as_expr {
            let temp = self.new_temp();
            code.push(Instruction::Pop(Some(temp.clone())));
            Ok((code, Some(temp)))
        } else {
            if returns_value {
                code.push(Instruction::Pop(None));
            }
            Ok((code, None))
        }
    }

    /// Whether `arg` is a bare identifier naming an array parameter; in
    /// that case its slot already holds an address.
    fn arg_is_array_parameter(&self, tree: &Tree, arg: NodeId) -> bool {
        match tree.kind(arg) {
            NodeKind::Ident { name } => self.ctx.symbols.is_parameter(name),
            _ => false,
        }
    }
}
