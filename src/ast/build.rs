//! Convenience constructor for [`Tree`]s.
//!
//! A front end drives this builder while reducing grammar productions; the
//! integration tests use it to write programs down structurally.

use super::{
    ArithOp, LogicOp, NodeId, NodeKind, Pos, Primitive, RelOp, SwitchCase, Tree, UnaryOp,
};

/// Incrementally assembles a [`Tree`].
///
/// Every method adds one node (plus any implicit identifier nodes) at the
/// current position and returns its [`NodeId`]. Call [`TreeBuilder::at`]
/// before a node to attach a source position to it.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: Tree,
    pos: Pos,
}

impl TreeBuilder {
    /// Creates a builder with an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the position attached to subsequently added nodes.
    pub fn at(&mut self, line: u32, col: u32) -> &mut Self {
        self.pos = Pos { line, col };
        self
    }

    fn add(&mut self, kind: NodeKind) -> NodeId {
        self.tree.add(kind, self.pos)
    }

    // === Expressions ===

    /// Integer literal from its lexer text.
    pub fn int(&mut self, text: &str) -> NodeId {
        self.add(NodeKind::IntLit { text: text.to_string() })
    }

    /// Float literal from its lexer text.
    pub fn float(&mut self, text: &str) -> NodeId {
        self.add(NodeKind::FloatLit { text: text.to_string() })
    }

    /// Character literal; the quotes the lexer keeps are added here.
    pub fn chr(&mut self, c: char) -> NodeId {
        self.add(NodeKind::CharLit { text: format!("'{c}'") })
    }

    /// Boolean literal.
    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.add(NodeKind::BoolLit { value })
    }

    /// Identifier use.
    pub fn ident(&mut self, name: &str) -> NodeId {
        self.add(NodeKind::Ident { name: name.to_string() })
    }

    /// Parenthesised expression.
    pub fn paren(&mut self, expr: NodeId) -> NodeId {
        self.add(NodeKind::Paren { expr })
    }

    /// `name[index]` in expression position.
    pub fn array_index(&mut self, name: &str, index: NodeId) -> NodeId {
        let ident = self.ident(name);
        self.add(NodeKind::ArrayIndex { ident, index })
    }

    /// Unary operator application.
    pub fn unary(&mut self, op: UnaryOp, expr: NodeId) -> NodeId {
        self.add(NodeKind::Unary { op, expr })
    }

    /// Arithmetic operation.
    pub fn arith(&mut self, op: ArithOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.add(NodeKind::Arith { op, lhs, rhs })
    }

    /// Relational comparison.
    pub fn rel(&mut self, op: RelOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.add(NodeKind::Rel { op, lhs, rhs })
    }

    /// Boolean connective.
    pub fn logic(&mut self, op: LogicOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.add(NodeKind::Logic { op, lhs, rhs })
    }

    /// Function call in expression position.
    pub fn call(&mut self, name: &str, args: Vec<NodeId>) -> NodeId {
        let callee = self.ident(name);
        self.add(NodeKind::FuncCall { callee, args })
    }

    // === Left-expressions ===

    /// Storable position, optionally indexed.
    pub fn left(&mut self, name: &str, index: Option<NodeId>) -> NodeId {
        let ident = self.ident(name);
        self.add(NodeKind::LeftExpr { ident, index })
    }

    // === Statements ===

    /// Statement block.
    pub fn stmts(&mut self, stmts: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Statements { stmts })
    }

    /// `target := value`.
    pub fn assign(&mut self, target: NodeId, value: NodeId) -> NodeId {
        self.add(NodeKind::Assign { target, value })
    }

    /// `if cond then ... [else ...] endif`.
    pub fn if_stmt(
        &mut self,
        cond: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    ) -> NodeId {
        self.add(NodeKind::If { cond, then_branch, else_branch })
    }

    /// `while cond do ... endwhile`.
    pub fn while_stmt(&mut self, cond: NodeId, body: NodeId) -> NodeId {
        self.add(NodeKind::While { cond, body })
    }

    /// Procedure call statement.
    pub fn proc_call(&mut self, name: &str, args: Vec<NodeId>) -> NodeId {
        let callee = self.ident(name);
        self.add(NodeKind::ProcCall { callee, args })
    }

    /// `read target`.
    pub fn read(&mut self, target: NodeId) -> NodeId {
        self.add(NodeKind::Read { target })
    }

    /// `write expr`.
    pub fn write(&mut self, expr: NodeId) -> NodeId {
        self.add(NodeKind::WriteExpr { expr })
    }

    /// `write "literal"`; `text` keeps its surrounding quotes.
    pub fn write_str(&mut self, text: &str) -> NodeId {
        self.add(NodeKind::WriteString { text: text.to_string() })
    }

    /// `return [expr]`.
    pub fn ret(&mut self, value: Option<NodeId>) -> NodeId {
        self.add(NodeKind::Return { value })
    }

    /// `left <=> right`.
    pub fn swap(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.add(NodeKind::Swap { left, right })
    }

    /// `switch` statement from `(value, body)` arms.
    pub fn switch(
        &mut self,
        scrutinee: NodeId,
        cases: Vec<(NodeId, NodeId)>,
        default: Option<NodeId>,
    ) -> NodeId {
        let cases = cases
            .into_iter()
            .map(|(value, body)| SwitchCase { value, body })
            .collect();
        self.add(NodeKind::Switch { scrutinee, cases, default })
    }

    // === Declarations ===

    /// Basic type spelling.
    pub fn basic(&mut self, prim: Primitive) -> NodeId {
        self.add(NodeKind::BasicType(prim))
    }

    /// `array [size] of elem`.
    pub fn array_type(&mut self, size: usize, elem: Primitive) -> NodeId {
        let elem = self.basic(elem);
        self.add(NodeKind::ArrayType { size, elem })
    }

    /// Parameter declaration.
    pub fn param(&mut self, name: &str, ty: NodeId) -> NodeId {
        self.add(NodeKind::ParamDecl { name: name.to_string(), ty })
    }

    /// `var names : ty`.
    pub fn var_decl(&mut self, names: &[&str], ty: NodeId) -> NodeId {
        let names = names.iter().map(|n| self.ident(n)).collect();
        self.add(NodeKind::VariableDecl { names, ty })
    }

    /// Declaration block.
    pub fn decls(&mut self, decls: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Declarations { decls })
    }

    /// Function definition.
    pub fn function(
        &mut self,
        name: &str,
        params: Vec<NodeId>,
        decls: NodeId,
        ret_type: Option<NodeId>,
        body: NodeId,
    ) -> NodeId {
        self.add(NodeKind::Function {
            name: name.to_string(),
            params,
            decls,
            ret_type,
            body,
        })
    }

    /// Program node; also marks it as the tree root.
    pub fn program(&mut self, functions: Vec<NodeId>) -> NodeId {
        let id = self.add(NodeKind::Program { functions });
        self.tree.set_root(id);
        id
    }

    /// Finishes the build and hands the tree over.
    pub fn finish(self) -> Tree {
        self.tree
    }
}
