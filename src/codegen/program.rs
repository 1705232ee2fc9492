//! Generated code object: subroutines with their declarations.

use serde::{Deserialize, Serialize};

use super::instruction::Instruction;

/// Declared parameter of a subroutine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name (`_result` for the implicit result slot)
    pub name: String,
    /// Textual type; the element type for array parameters
    pub ty: String,
    /// Whether the slot holds the address of a caller-owned array
    pub by_array_ref: bool,
}

/// Declared local variable of a subroutine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalVar {
    /// Variable name
    pub name: String,
    /// Textual element type (the type itself for scalars)
    pub elem_ty: String,
    /// Total cell count; 1 for scalars, the element count for arrays
    pub size: usize,
}

/// One generated subroutine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subroutine {
    /// Subroutine name
    pub name: String,
    /// Ordered parameter declarations, `_result` first when present
    pub params: Vec<Parameter>,
    /// Ordered local-variable declarations
    pub locals: Vec<LocalVar>,
    /// Instruction list
    pub instructions: Vec<Instruction>,
}

impl Subroutine {
    /// Creates an empty subroutine.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Vec::new(),
            locals: Vec::new(),
            instructions: Vec::new(),
        }
    }

    /// Appends a parameter declaration.
    pub fn add_param(&mut self, name: &str, ty: String, by_array_ref: bool) {
        self.params.push(Parameter {
            name: name.to_string(),
            ty,
            by_array_ref,
        });
    }

    /// Appends a local-variable declaration.
    pub fn add_local(&mut self, name: &str, elem_ty: String, size: usize) {
        self.locals.push(LocalVar {
            name: name.to_string(),
            elem_ty,
            size,
        });
    }
}

/// The whole generated program, subroutines in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TacProgram {
    /// Generated subroutines
    pub subroutines: Vec<Subroutine>,
}

impl TacProgram {
    /// Creates an empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a subroutine.
    pub fn add_subroutine(&mut self, subroutine: Subroutine) {
        self.subroutines.push(subroutine);
    }

    /// Finds a subroutine by name.
    pub fn subroutine(&self, name: &str) -> Option<&Subroutine> {
        self.subroutines.iter().find(|s| s.name == name)
    }

    /// Machine-readable dump for embedding drivers.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
