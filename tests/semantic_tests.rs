//! Tests for the symbol-collection and type-checking passes.

use aslc::ast::{ArithOp, LogicOp, NodeId, Primitive, RelOp, Tree, TreeBuilder};
use aslc::{CompileOptions, Compiler, Context, DiagnosticKind, SymbolCollector, TypeChecker};

/// Runs the two semantic passes and returns the populated context.
fn analyze(tree: &Tree) -> Context {
    let mut ctx = Context::new();
    SymbolCollector::new(&mut ctx).run(tree).unwrap();
    TypeChecker::new(&mut ctx).run(tree).unwrap();
    ctx
}

fn kinds(ctx: &Context) -> Vec<DiagnosticKind> {
    ctx.reporter.iter().map(|d| d.kind.clone()).collect()
}

/// `func main() <decls> <stmts> endfunc` with nothing else.
fn main_program(build: impl FnOnce(&mut TreeBuilder) -> (Vec<NodeId>, Vec<NodeId>)) -> Tree {
    let mut b = TreeBuilder::new();
    let (decl_nodes, stmt_nodes) = build(&mut b);
    let decls = b.decls(decl_nodes);
    let body = b.stmts(stmt_nodes);
    let main_fn = b.function("main", vec![], decls, None, body);
    b.program(vec![main_fn]);
    b.finish()
}

// ====================
// Clean programs
// ====================

#[test]
fn test_clean_program_reports_nothing() {
    let tree = main_program(|b| {
        let int_ty = b.basic(Primitive::Int);
        let var_x = b.var_decl(&["x"], int_ty);
        let three = b.int("3");
        let four = b.int("4");
        let sum = b.arith(ArithOp::Add, three, four);
        let target = b.left("x", None);
        let assign = b.assign(target, sum);
        (vec![var_x], vec![assign])
    });
    let ctx = analyze(&tree);
    assert!(ctx.reporter.is_empty());
}

#[test]
fn test_int_widens_into_float_slot() {
    let tree = main_program(|b| {
        let float_ty = b.basic(Primitive::Float);
        let var_y = b.var_decl(&["y"], float_ty);
        let two = b.int("2");
        let target = b.left("y", None);
        let assign = b.assign(target, two);
        (vec![var_y], vec![assign])
    });
    let ctx = analyze(&tree);
    assert!(ctx.reporter.is_empty());
}

#[test]
fn test_expression_decorations_are_total() {
    let mut b = TreeBuilder::new();
    let int_ty = b.basic(Primitive::Int);
    let var_x = b.var_decl(&["x"], int_ty);
    let decls = b.decls(vec![var_x]);
    let lhs = b.ident("x");
    let rhs = b.int("1");
    let sum = b.arith(ArithOp::Add, lhs, rhs);
    let target = b.left("x", None);
    let assign = b.assign(target, sum);
    let body = b.stmts(vec![assign]);
    let main_fn = b.function("main", vec![], decls, None, body);
    b.program(vec![main_fn]);
    let tree = b.finish();

    let ctx = analyze(&tree);
    for node in [lhs, rhs, sum, target] {
        assert!(ctx.decorations.has_type(node), "missing type on {node}");
        assert!(ctx.decorations.has_lvalue(node), "missing l-value on {node}");
    }
    assert!(ctx.decorations.lvalue_of(lhs).unwrap());
    assert!(!ctx.decorations.lvalue_of(rhs).unwrap());
    assert!(!ctx.decorations.lvalue_of(sum).unwrap());
    assert!(ctx.decorations.lvalue_of(target).unwrap());
}

#[test]
fn test_function_identifier_is_not_an_lvalue() {
    use aslc::ast::{NodeKind, Pos};

    let mut tree = Tree::new();
    let pos = Pos::default();
    let f_decls = tree.add(NodeKind::Declarations { decls: vec![] }, pos);
    let f_body = tree.add(NodeKind::Statements { stmts: vec![] }, pos);
    let f_fn = tree.add(
        NodeKind::Function {
            name: "f".into(),
            params: vec![],
            decls: f_decls,
            ret_type: None,
            body: f_body,
        },
        pos,
    );

    let callee = tree.add(NodeKind::Ident { name: "f".into() }, pos);
    let call = tree.add(NodeKind::ProcCall { callee, args: vec![] }, pos);
    let decls = tree.add(NodeKind::Declarations { decls: vec![] }, pos);
    let body = tree.add(NodeKind::Statements { stmts: vec![call] }, pos);
    let main_fn = tree.add(
        NodeKind::Function {
            name: "main".into(),
            params: vec![],
            decls,
            ret_type: None,
            body,
        },
        pos,
    );
    let root = tree.add(NodeKind::Program { functions: vec![f_fn, main_fn] }, pos);
    tree.set_root(root);

    let ctx = analyze(&tree);
    assert!(ctx.reporter.is_empty());
    assert!(!ctx.decorations.lvalue_of(callee).unwrap());
}

// ====================
// Declarations
// ====================

#[test]
fn test_duplicate_local_variable() {
    let tree = main_program(|b| {
        let int_ty = b.basic(Primitive::Int);
        let var_x = b.var_decl(&["x", "x"], int_ty);
        (vec![var_x], vec![])
    });
    let ctx = analyze(&tree);
    assert_eq!(
        kinds(&ctx),
        vec![DiagnosticKind::DeclaredIdent { name: "x".into() }]
    );
}

#[test]
fn test_duplicate_parameter() {
    let mut b = TreeBuilder::new();
    let t1 = b.basic(Primitive::Int);
    let p1 = b.param("n", t1);
    let t2 = b.basic(Primitive::Float);
    let p2 = b.param("n", t2);
    let f_decls = b.decls(vec![]);
    let f_body = b.stmts(vec![]);
    let f_fn = b.function("f", vec![p1, p2], f_decls, None, f_body);

    let decls = b.decls(vec![]);
    let body = b.stmts(vec![]);
    let main_fn = b.function("main", vec![], decls, None, body);
    b.program(vec![f_fn, main_fn]);
    let ctx = analyze(&b.finish());
    assert_eq!(
        kinds(&ctx),
        vec![DiagnosticKind::DeclaredIdent { name: "n".into() }]
    );
}

#[test]
fn test_duplicate_function() {
    let mut b = TreeBuilder::new();
    let d1 = b.decls(vec![]);
    let s1 = b.stmts(vec![]);
    let f1 = b.function("f", vec![], d1, None, s1);
    let d2 = b.decls(vec![]);
    let s2 = b.stmts(vec![]);
    let f2 = b.function("f", vec![], d2, None, s2);
    let d3 = b.decls(vec![]);
    let s3 = b.stmts(vec![]);
    let main_fn = b.function("main", vec![], d3, None, s3);
    b.program(vec![f1, f2, main_fn]);
    let ctx = analyze(&b.finish());
    assert_eq!(
        kinds(&ctx),
        vec![DiagnosticKind::DeclaredIdent { name: "f".into() }]
    );
}

#[test]
fn test_collector_is_idempotent_across_fresh_tables() {
    let mut b = TreeBuilder::new();
    let int_ty = b.basic(Primitive::Int);
    let p = b.param("n", int_ty);
    let float_ty = b.basic(Primitive::Float);
    let var_y = b.var_decl(&["y", "z"], float_ty);
    let f_decls = b.decls(vec![var_y]);
    let f_body = b.stmts(vec![]);
    let ret_ty = b.basic(Primitive::Int);
    let f_fn = b.function("f", vec![p], f_decls, Some(ret_ty), f_body);

    let decls = b.decls(vec![]);
    let body = b.stmts(vec![]);
    let main_fn = b.function("main", vec![], decls, None, body);
    let root = b.program(vec![f_fn, main_fn]);
    let tree = b.finish();

    let mut first = Context::new();
    SymbolCollector::new(&mut first).run(&tree).unwrap();
    let mut second = Context::new();
    SymbolCollector::new(&mut second).run(&tree).unwrap();

    for node in [root, f_fn, main_fn] {
        let s1 = first.decorations.scope_of(node).unwrap();
        let s2 = second.decorations.scope_of(node).unwrap();
        assert_eq!(first.symbols.bindings(s1), second.symbols.bindings(s2));
    }
}

// ====================
// Statements
// ====================

#[test]
fn test_incompatible_assignment() {
    let tree = main_program(|b| {
        let int_ty = b.basic(Primitive::Int);
        let var_x = b.var_decl(&["x"], int_ty);
        let value = b.boolean(true);
        let target = b.left("x", None);
        let assign = b.assign(target, value);
        (vec![var_x], vec![assign])
    });
    let ctx = analyze(&tree);
    assert_eq!(kinds(&ctx), vec![DiagnosticKind::IncompatibleAssignment]);
}

#[test]
fn test_if_and_while_require_boolean() {
    let tree = main_program(|b| {
        let int_ty = b.basic(Primitive::Int);
        let var_x = b.var_decl(&["x"], int_ty);
        let cond1 = b.int("1");
        let then = b.stmts(vec![]);
        let if_stmt = b.if_stmt(cond1, then, None);
        let cond2 = b.ident("x");
        let loop_body = b.stmts(vec![]);
        let while_stmt = b.while_stmt(cond2, loop_body);
        (vec![var_x], vec![if_stmt, while_stmt])
    });
    let ctx = analyze(&tree);
    assert_eq!(
        kinds(&ctx),
        vec![DiagnosticKind::BooleanRequired, DiagnosticKind::BooleanRequired]
    );
}

#[test]
fn test_read_and_write_require_basic_types() {
    let tree = main_program(|b| {
        let arr_ty = b.array_type(3, Primitive::Int);
        let var_a = b.var_decl(&["a"], arr_ty);
        let target = b.left("a", None);
        let read = b.read(target);
        let value = b.ident("a");
        let write = b.write(value);
        (vec![var_a], vec![read, write])
    });
    let ctx = analyze(&tree);
    assert_eq!(
        kinds(&ctx),
        vec![
            DiagnosticKind::ReadWriteRequireBasic,
            DiagnosticKind::ReadWriteRequireBasic
        ]
    );
}

#[test]
fn test_return_type_must_be_copyable() {
    let mut b = TreeBuilder::new();
    let ret_ty = b.basic(Primitive::Int);
    let f_decls = b.decls(vec![]);
    let value = b.boolean(false);
    let ret = b.ret(Some(value));
    let f_body = b.stmts(vec![ret]);
    let f_fn = b.function("f", vec![], f_decls, Some(ret_ty), f_body);

    let decls = b.decls(vec![]);
    let body = b.stmts(vec![]);
    let main_fn = b.function("main", vec![], decls, None, body);
    b.program(vec![f_fn, main_fn]);
    let ctx = analyze(&b.finish());
    assert_eq!(kinds(&ctx), vec![DiagnosticKind::IncompatibleReturn]);
}

#[test]
fn test_return_accepts_int_for_float_function() {
    let mut b = TreeBuilder::new();
    let ret_ty = b.basic(Primitive::Float);
    let f_decls = b.decls(vec![]);
    let value = b.int("1");
    let ret = b.ret(Some(value));
    let f_body = b.stmts(vec![ret]);
    let f_fn = b.function("f", vec![], f_decls, Some(ret_ty), f_body);

    let decls = b.decls(vec![]);
    let body = b.stmts(vec![]);
    let main_fn = b.function("main", vec![], decls, None, body);
    b.program(vec![f_fn, main_fn]);
    let ctx = analyze(&b.finish());
    assert!(ctx.reporter.is_empty());
}

#[test]
fn test_swap_requires_equal_types() {
    let tree = main_program(|b| {
        let int_ty = b.basic(Primitive::Int);
        let var_x = b.var_decl(&["x"], int_ty);
        let float_ty = b.basic(Primitive::Float);
        let var_y = b.var_decl(&["y"], float_ty);
        let left = b.left("x", None);
        let right = b.left("y", None);
        let swap = b.swap(left, right);
        (vec![var_x, var_y], vec![swap])
    });
    let ctx = analyze(&tree);
    assert_eq!(kinds(&ctx), vec![DiagnosticKind::IncompatibleArgumentsInSwap]);
}

#[test]
fn test_switch_case_must_be_comparable() {
    let tree = main_program(|b| {
        let int_ty = b.basic(Primitive::Int);
        let var_x = b.var_decl(&["x"], int_ty);
        let scrutinee = b.ident("x");
        let good = b.int("1");
        let good_body = b.stmts(vec![]);
        let bad = b.boolean(true);
        let bad_body = b.stmts(vec![]);
        let switch = b.switch(scrutinee, vec![(good, good_body), (bad, bad_body)], None);
        (vec![var_x], vec![switch])
    });
    let ctx = analyze(&tree);
    assert_eq!(kinds(&ctx), vec![DiagnosticKind::IncompatibleValueInSwitch]);
}

// ====================
// Expressions
// ====================

#[test]
fn test_undeclared_identifier_reports_once() {
    let tree = main_program(|b| {
        let target = b.left("ghost", None);
        let one = b.int("1");
        let assign = b.assign(target, one);
        (vec![], vec![assign])
    });
    let ctx = analyze(&tree);
    // The error type on the target suppresses the assignment check.
    assert_eq!(
        kinds(&ctx),
        vec![DiagnosticKind::UndeclaredIdent { name: "ghost".into() }]
    );
}

#[test]
fn test_mod_rejects_float_operands() {
    let tree = main_program(|b| {
        let int_ty = b.basic(Primitive::Int);
        let var_x = b.var_decl(&["x"], int_ty);
        let lhs = b.float("1.0");
        let rhs = b.int("2");
        let value = b.arith(ArithOp::Mod, lhs, rhs);
        let target = b.left("x", None);
        let assign = b.assign(target, value);
        (vec![var_x], vec![assign])
    });
    let ctx = analyze(&tree);
    assert!(kinds(&ctx)
        .iter()
        .any(|k| matches!(k, DiagnosticKind::IncompatibleOperator { op } if op == "%")));
}

#[test]
fn test_relational_and_logic_operand_checks() {
    let tree = main_program(|b| {
        let bool_ty = b.basic(Primitive::Bool);
        let var_p = b.var_decl(&["p"], bool_ty);

        let lhs = b.boolean(true);
        let rhs = b.int("1");
        let bad_rel = b.rel(RelOp::Lt, lhs, rhs);
        let t1 = b.left("p", None);
        let a1 = b.assign(t1, bad_rel);

        let lhs2 = b.int("1");
        let rhs2 = b.boolean(false);
        let bad_logic = b.logic(LogicOp::And, lhs2, rhs2);
        let t2 = b.left("p", None);
        let a2 = b.assign(t2, bad_logic);
        (vec![var_p], vec![a1, a2])
    });
    let ctx = analyze(&tree);
    assert_eq!(
        kinds(&ctx),
        vec![
            DiagnosticKind::IncompatibleOperator { op: "<".into() },
            DiagnosticKind::IncompatibleOperator { op: "and".into() },
        ]
    );
}

#[test]
fn test_array_access_checks() {
    let tree = main_program(|b| {
        let int_ty = b.basic(Primitive::Int);
        let var_x = b.var_decl(&["x"], int_ty);
        let arr_ty = b.array_type(3, Primitive::Int);
        let var_a = b.var_decl(&["a"], arr_ty);

        // x[0]: not an array
        let zero = b.int("0");
        let target1 = b.left("x", Some(zero));
        let one = b.int("1");
        let a1 = b.assign(target1, one);

        // a[true]: non-integer index
        let t = b.boolean(true);
        let target2 = b.left("a", Some(t));
        let two = b.int("2");
        let a2 = b.assign(target2, two);
        (vec![var_x, var_a], vec![a1, a2])
    });
    let ctx = analyze(&tree);
    assert_eq!(
        kinds(&ctx),
        vec![
            DiagnosticKind::NonArrayInArrayAccess,
            DiagnosticKind::NonIntegerIndexInArrayAccess,
        ]
    );
}

// ====================
// Calls
// ====================

/// `func f(n:int, y:float):int` plus a main body built by the caller.
fn program_with_f(
    build_main: impl FnOnce(&mut TreeBuilder) -> Vec<NodeId>,
) -> Tree {
    let mut b = TreeBuilder::new();
    let int_ty = b.basic(Primitive::Int);
    let p_n = b.param("n", int_ty);
    let float_ty = b.basic(Primitive::Float);
    let p_y = b.param("y", float_ty);
    let f_decls = b.decls(vec![]);
    let zero = b.int("0");
    let f_ret = b.ret(Some(zero));
    let f_body = b.stmts(vec![f_ret]);
    let ret_ty = b.basic(Primitive::Int);
    let f_fn = b.function("f", vec![p_n, p_y], f_decls, Some(ret_ty), f_body);

    let stmts = build_main(&mut b);
    let decls = b.decls(vec![]);
    let body = b.stmts(stmts);
    let main_fn = b.function("main", vec![], decls, None, body);
    b.program(vec![f_fn, main_fn]);
    b.finish()
}

#[test]
fn test_call_arity_mismatch() {
    let tree = program_with_f(|b| {
        let one = b.int("1");
        vec![b.proc_call("f", vec![one])]
    });
    let ctx = analyze(&tree);
    assert_eq!(kinds(&ctx), vec![DiagnosticKind::NumberOfParameters]);
}

#[test]
fn test_call_parameter_type_mismatch() {
    let tree = program_with_f(|b| {
        let bad = b.boolean(true);
        let two = b.float("2.0");
        vec![b.proc_call("f", vec![bad, two])]
    });
    let ctx = analyze(&tree);
    assert_eq!(
        kinds(&ctx),
        vec![DiagnosticKind::IncompatibleParameter { index: 1 }]
    );
}

#[test]
fn test_call_widens_int_argument_into_float_parameter() {
    let tree = program_with_f(|b| {
        let one = b.int("1");
        let two = b.int("2");
        vec![b.proc_call("f", vec![one, two])]
    });
    let ctx = analyze(&tree);
    assert!(ctx.reporter.is_empty());
}

#[test]
fn test_calling_a_variable_is_not_callable() {
    let tree = main_program(|b| {
        let int_ty = b.basic(Primitive::Int);
        let var_x = b.var_decl(&["x"], int_ty);
        let call = b.proc_call("x", vec![]);
        (vec![var_x], vec![call])
    });
    let ctx = analyze(&tree);
    assert_eq!(
        kinds(&ctx),
        vec![DiagnosticKind::IsNotCallable { name: "x".into() }]
    );
}

#[test]
fn test_void_call_used_as_value() {
    let mut b = TreeBuilder::new();
    let p_decls = b.decls(vec![]);
    let p_body = b.stmts(vec![]);
    let p_fn = b.function("p", vec![], p_decls, None, p_body);

    let int_ty = b.basic(Primitive::Int);
    let var_x = b.var_decl(&["x"], int_ty);
    let decls = b.decls(vec![var_x]);
    let call = b.call("p", vec![]);
    let target = b.left("x", None);
    let assign = b.assign(target, call);
    let body = b.stmts(vec![assign]);
    let main_fn = b.function("main", vec![], decls, None, body);
    b.program(vec![p_fn, main_fn]);
    let ctx = analyze(&b.finish());
    // The call's error type suppresses the assignment complaint.
    assert_eq!(
        kinds(&ctx),
        vec![DiagnosticKind::IsNotFunction { name: "p".into() }]
    );
}

// ====================
// main checks and ordering
// ====================

#[test]
fn test_missing_main_is_reported() {
    let mut b = TreeBuilder::new();
    let decls = b.decls(vec![]);
    let body = b.stmts(vec![]);
    let f_fn = b.function("f", vec![], decls, None, body);
    b.program(vec![f_fn]);
    let ctx = analyze(&b.finish());
    assert_eq!(kinds(&ctx), vec![DiagnosticKind::NoMainProperlyDeclared]);
}

#[test]
fn test_main_with_parameters_is_improper() {
    let mut b = TreeBuilder::new();
    let int_ty = b.basic(Primitive::Int);
    let p = b.param("n", int_ty);
    let decls = b.decls(vec![]);
    let body = b.stmts(vec![]);
    let main_fn = b.function("main", vec![p], decls, None, body);
    b.program(vec![main_fn]);
    let ctx = analyze(&b.finish());
    assert_eq!(kinds(&ctx), vec![DiagnosticKind::NoMainProperlyDeclared]);
}

#[test]
fn test_diagnostics_print_in_position_order() {
    let mut b = TreeBuilder::new();
    let decls = b.decls(vec![]);
    b.at(5, 3);
    let late = b.left("late", None);
    let one = b.int("1");
    let a1 = b.assign(late, one);
    b.at(2, 1);
    let early = b.left("early", None);
    let two = b.int("2");
    let a2 = b.assign(early, two);
    let body = b.stmts(vec![a1, a2]);
    b.at(0, 0);
    let main_fn = b.function("main", vec![], decls, None, body);
    b.program(vec![main_fn]);
    let ctx = analyze(&b.finish());

    let mut buf = Vec::new();
    ctx.reporter.print(&mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].contains("'early'"));
    assert!(lines[1].contains("'late'"));
}

#[test]
fn test_compiler_gates_codegen_on_clean_report() {
    let tree = main_program(|b| {
        let target = b.left("ghost", None);
        let one = b.int("1");
        let assign = b.assign(target, one);
        (vec![], vec![assign])
    });

    let output = Compiler::new(CompileOptions::default()).compile(&tree).unwrap();
    assert!(!output.success());
    assert!(output.program.is_none());

    let permissive = CompileOptions { codegen_on_errors: true };
    let output = Compiler::new(permissive).compile(&tree).unwrap();
    assert!(!output.success());
    assert!(output.program.is_some());
}
