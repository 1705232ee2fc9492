//! Internal error plane shared across the compilation pipeline.
//!
//! These errors are invariant violations (a pass reading a decoration that
//! was never written, a tree shaped in a way no parser produces), not user
//! mistakes. User-visible semantic errors never travel this channel; they
//! accumulate in the [`Reporter`](crate::semantic::Reporter) instead.

use thiserror::Error;

use crate::ast::NodeId;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Fatal pipeline errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The tree was handed over without a root program node.
    #[error("tree has no root program node")]
    MissingRoot,

    /// A pass read a decoration that an earlier pass never wrote.
    #[error("node {node} has no {what} decoration")]
    MissingDecoration {
        /// Node whose decoration was requested
        node: NodeId,
        /// Which of the three decorations was missing
        what: &'static str,
    },

    /// A node had a kind the current pass cannot accept in that position.
    #[error("malformed tree: expected {expected} at node {node}")]
    MalformedTree {
        /// Offending node
        node: NodeId,
        /// Description of the expected node class
        expected: &'static str,
    },

    /// A type query was issued against the wrong type constructor.
    #[error("type query '{query}' on a non-matching type")]
    InvalidTypeQuery {
        /// The query that failed (e.g. "array_size")
        query: &'static str,
    },

    /// Code generation met an identifier the symbol table cannot resolve.
    #[error("unknown symbol '{name}' during code generation")]
    UnknownSymbol {
        /// The unresolved identifier
        name: String,
    },

    /// Code generation met a read target no READ opcode covers.
    ///
    /// Only reachable on programs the type checker already rejected.
    #[error("read target of node {node} has no primitive type")]
    UnsupportedRead {
        /// The read statement's target node
        node: NodeId,
    },
}
