//! # aslc: Asl compiler core
//!
//! Semantic analysis and code generation for Asl, a small imperative
//! language with arrays, scalars and loops. The crate consumes a parsed
//! tree and produces a decorated tree, an ordered diagnostic list, and a
//! three-address program organised as subroutines.
//!
//! ## Architecture
//!
//! ```text
//! Parsed tree → Symbol collection → Type check → Code generation → TAC
//! ```
//!
//! Three passes run in sequence over one tree and share a [`Context`]:
//!
//! - [`SymbolCollector`] builds the lexical scopes, registers function
//!   signatures, parameters and locals, and leaves scope handles on the
//!   nodes that opened them.
//! - [`TypeChecker`] re-enters those scopes, computes a type and an
//!   l-value flag for every expression, and validates statements. All
//!   semantic errors accumulate in the [`Reporter`]; the `Error` type
//!   suppresses cascades.
//! - [`CodeGenerator`] lowers each function to a [`Subroutine`] with
//!   typed parameter and local declarations and a flat instruction list.
//!
//! Lexing, parsing, instruction emission and execution are collaborators,
//! not part of this crate.
//!
//! ## Usage
//!
//! ```rust
//! use aslc::ast::{Primitive, TreeBuilder};
//! use aslc::{CompileOptions, Compiler};
//!
//! # fn main() -> aslc::Result<()> {
//! // func main() var x : int  x := 3 + 4 endfunc
//! let mut b = TreeBuilder::new();
//! let int_ty = b.basic(Primitive::Int);
//! let var_x = b.var_decl(&["x"], int_ty);
//! let decls = b.decls(vec![var_x]);
//! let three = b.int("3");
//! let four = b.int("4");
//! let sum = b.arith(aslc::ast::ArithOp::Add, three, four);
//! let target = b.left("x", None);
//! let assign = b.assign(target, sum);
//! let body = b.stmts(vec![assign]);
//! let main_fn = b.function("main", vec![], decls, None, body);
//! b.program(vec![main_fn]);
//! let tree = b.finish();
//!
//! let output = Compiler::new(CompileOptions::default()).compile(&tree)?;
//! assert!(output.success());
//! let program = output.program.expect("clean program generates code");
//! assert_eq!(program.subroutines[0].name, "main");
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod codegen;
pub mod error;
pub mod semantic;
pub mod symtab;
pub mod types;

pub use codegen::{CodeGenerator, Instruction, LocalVar, Parameter, Subroutine, TacProgram};
pub use error::{CompileError, Result};
pub use semantic::{Decorations, Diagnostic, DiagnosticKind, Reporter, SymbolCollector, TypeChecker};
pub use symtab::{ScopeId, SymbolKind, SymbolTable};
pub use types::{TypeId, TypeManager};

use ast::Tree;

/// The shared mutable state of one compilation: the type arena, the scope
/// stack, the decoration store and the diagnostic log. Passes borrow the
/// whole context; nothing here is global.
#[derive(Debug, Default)]
pub struct Context {
    /// Interned types
    pub types: TypeManager,
    /// Scopes and symbols
    pub symbols: SymbolTable,
    /// Per-node scope/type/l-value annotations
    pub decorations: Decorations,
    /// Accumulated semantic diagnostics
    pub reporter: Reporter,
}

impl Context {
    /// Creates a fresh context.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Compilation knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Run code generation even when the type checker reported errors.
    /// The generated program is not guaranteed meaningful in that case.
    pub codegen_on_errors: bool,
}

/// What a compilation produced.
#[derive(Debug)]
pub struct CompileOutput {
    /// Generated program; absent when semantic errors suppressed codegen
    pub program: Option<TacProgram>,
    /// The tables the passes filled, including the diagnostic log
    pub context: Context,
}

impl CompileOutput {
    /// Whether the compilation is semantically clean.
    pub fn success(&self) -> bool {
        self.context.reporter.is_empty()
    }
}

/// Orders the three passes over one tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Creates a compiler with the given options.
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Runs symbol collection, type checking and (on a clean report, or
    /// always with [`CompileOptions::codegen_on_errors`]) code generation.
    pub fn compile(&self, tree: &Tree) -> Result<CompileOutput> {
        let mut context = Context::new();
        SymbolCollector::new(&mut context).run(tree)?;
        TypeChecker::new(&mut context).run(tree)?;

        let program = if context.reporter.is_empty() || self.options.codegen_on_errors {
            Some(CodeGenerator::new(&mut context).run(tree)?)
        } else {
            None
        };
        Ok(CompileOutput { program, context })
    }
}
