//! Semantic analysis: the two tree passes and the side tables they share.
//!
//! The [`SymbolCollector`] builds scopes and records declarations, the
//! [`TypeChecker`] computes a type and an l-value flag for every expression
//! and validates statements. Both leave their results in [`Decorations`]
//! and their complaints in the [`Reporter`]; neither modifies the tree.

pub mod checker;
pub mod collector;
pub mod decorations;
pub mod reporter;

pub use checker::TypeChecker;
pub use collector::SymbolCollector;
pub use decorations::Decorations;
pub use reporter::{Diagnostic, DiagnosticKind, Reporter};
