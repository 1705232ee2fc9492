//! Code generation: the third pass and the program it produces.
//!
//! The [`CodeGenerator`] lowers a checked tree into a [`TacProgram`]: one
//! [`Subroutine`] per function, each a flat list of three-address
//! [`Instruction`]s over named addresses and fresh `%tN` temporaries.

pub mod generator;
pub mod instruction;
pub mod program;

pub use generator::CodeGenerator;
pub use instruction::Instruction;
pub use program::{LocalVar, Parameter, Subroutine, TacProgram};
