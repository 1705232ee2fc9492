//! Type manager: the interning arena every pass shares.
//!
//! Types are structural: interning the same construction twice returns the
//! same [`TypeId`], so equality and every compatibility query reduce to id
//! comparison. Ids are plain handles, cheap to copy and meaningless without
//! the manager that owns them.

use std::collections::HashMap;
use std::fmt;

use crate::ast::RelOp;
use crate::error::{CompileError, Result};

/// Interned type handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Structural description backing a [`TypeId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TypeDesc {
    Integer,
    Float,
    Boolean,
    Character,
    Void,
    Error,
    Array { size: usize, elem: TypeId },
    Function { params: Vec<TypeId>, ret: TypeId },
}

/// Owns the type arena and answers every shape and compatibility query.
#[derive(Debug)]
pub struct TypeManager {
    descs: Vec<TypeDesc>,
    interned: HashMap<TypeDesc, TypeId>,
    integer: TypeId,
    float: TypeId,
    boolean: TypeId,
    character: TypeId,
    void: TypeId,
    error: TypeId,
}

impl TypeManager {
    /// Creates a manager with the primitive, void and error types
    /// pre-interned.
    pub fn new() -> Self {
        let mut mgr = Self {
            descs: Vec::new(),
            interned: HashMap::new(),
            integer: TypeId(0),
            float: TypeId(0),
            boolean: TypeId(0),
            character: TypeId(0),
            void: TypeId(0),
            error: TypeId(0),
        };
        mgr.integer = mgr.intern(TypeDesc::Integer);
        mgr.float = mgr.intern(TypeDesc::Float);
        mgr.boolean = mgr.intern(TypeDesc::Boolean);
        mgr.character = mgr.intern(TypeDesc::Character);
        mgr.void = mgr.intern(TypeDesc::Void);
        mgr.error = mgr.intern(TypeDesc::Error);
        mgr
    }

    fn intern(&mut self, desc: TypeDesc) -> TypeId {
        if let Some(&id) = self.interned.get(&desc) {
            return id;
        }
        let id = TypeId(self.descs.len() as u32);
        self.descs.push(desc.clone());
        self.interned.insert(desc, id);
        id
    }

    fn desc(&self, t: TypeId) -> &TypeDesc {
        &self.descs[t.0 as usize]
    }

    // === Construction ===

    /// The integer type.
    pub fn integer(&self) -> TypeId {
        self.integer
    }

    /// The float type.
    pub fn float(&self) -> TypeId {
        self.float
    }

    /// The boolean type.
    pub fn boolean(&self) -> TypeId {
        self.boolean
    }

    /// The character type.
    pub fn character(&self) -> TypeId {
        self.character
    }

    /// The void type (function returns only).
    pub fn void(&self) -> TypeId {
        self.void
    }

    /// The error sentinel type.
    pub fn error(&self) -> TypeId {
        self.error
    }

    /// Interns `array [size] of elem`.
    pub fn array(&mut self, size: usize, elem: TypeId) -> TypeId {
        self.intern(TypeDesc::Array { size, elem })
    }

    /// Interns a function type.
    pub fn function(&mut self, params: Vec<TypeId>, ret: TypeId) -> TypeId {
        self.intern(TypeDesc::Function { params, ret })
    }

    // === Predicates ===

    /// Whether `t` is the integer type.
    pub fn is_integer(&self, t: TypeId) -> bool {
        t == self.integer
    }

    /// Whether `t` is the float type.
    pub fn is_float(&self, t: TypeId) -> bool {
        t == self.float
    }

    /// Whether `t` is the boolean type.
    pub fn is_boolean(&self, t: TypeId) -> bool {
        t == self.boolean
    }

    /// Whether `t` is the character type.
    pub fn is_character(&self, t: TypeId) -> bool {
        t == self.character
    }

    /// Whether `t` is the void type.
    pub fn is_void(&self, t: TypeId) -> bool {
        t == self.void
    }

    /// Whether `t` is the error sentinel.
    pub fn is_error(&self, t: TypeId) -> bool {
        t == self.error
    }

    /// Whether `t` is one of the four primitive types.
    pub fn is_primitive(&self, t: TypeId) -> bool {
        t == self.integer || t == self.float || t == self.boolean || t == self.character
    }

    /// Whether `t` is integer or float.
    pub fn is_numeric(&self, t: TypeId) -> bool {
        t == self.integer || t == self.float
    }

    /// Whether `t` is an array type.
    pub fn is_array(&self, t: TypeId) -> bool {
        matches!(self.desc(t), TypeDesc::Array { .. })
    }

    /// Whether `t` is a function type.
    pub fn is_function(&self, t: TypeId) -> bool {
        matches!(self.desc(t), TypeDesc::Function { .. })
    }

    /// Whether `t` is a function type returning void.
    pub fn is_void_function(&self, t: TypeId) -> bool {
        matches!(self.desc(t), TypeDesc::Function { ret, .. } if *ret == self.void)
    }

    // === Shape queries ===

    /// Element count of an array type.
    pub fn array_size(&self, t: TypeId) -> Result<usize> {
        match self.desc(t) {
            TypeDesc::Array { size, .. } => Ok(*size),
            _ => Err(CompileError::InvalidTypeQuery { query: "array_size" }),
        }
    }

    /// Element type of an array type.
    pub fn array_elem(&self, t: TypeId) -> Result<TypeId> {
        match self.desc(t) {
            TypeDesc::Array { elem, .. } => Ok(*elem),
            _ => Err(CompileError::InvalidTypeQuery { query: "array_elem" }),
        }
    }

    /// Number of parameters of a function type.
    pub fn param_count(&self, t: TypeId) -> Result<usize> {
        match self.desc(t) {
            TypeDesc::Function { params, .. } => Ok(params.len()),
            _ => Err(CompileError::InvalidTypeQuery { query: "param_count" }),
        }
    }

    /// Type of parameter `i` of a function type.
    pub fn param_type(&self, t: TypeId, i: usize) -> Result<TypeId> {
        match self.desc(t) {
            TypeDesc::Function { params, .. } => params
                .get(i)
                .copied()
                .ok_or(CompileError::InvalidTypeQuery { query: "param_type" }),
            _ => Err(CompileError::InvalidTypeQuery { query: "param_type" }),
        }
    }

    /// Return type of a function type.
    pub fn return_type(&self, t: TypeId) -> Result<TypeId> {
        match self.desc(t) {
            TypeDesc::Function { ret, .. } => Ok(*ret),
            _ => Err(CompileError::InvalidTypeQuery { query: "return_type" }),
        }
    }

    /// Storage size in abstract cells: primitives take one, arrays
    /// `size * size_of(elem)`, everything else zero.
    pub fn size_of(&self, t: TypeId) -> usize {
        match self.desc(t) {
            TypeDesc::Integer | TypeDesc::Float | TypeDesc::Boolean | TypeDesc::Character => 1,
            TypeDesc::Array { size, elem } => size * self.size_of(*elem),
            _ => 0,
        }
    }

    // === Compatibility ===

    /// Structural equality; interning makes this an id comparison.
    pub fn equal(&self, a: TypeId, b: TypeId) -> bool {
        a == b
    }

    /// Whether a value of `src` may be stored into a slot of `dst`:
    /// identical types, integer widening into float, or arrays with equal
    /// element type and size.
    pub fn copyable(&self, dst: TypeId, src: TypeId) -> bool {
        if dst == src {
            return true;
        }
        if self.is_float(dst) && self.is_integer(src) {
            return true;
        }
        match (self.desc(dst), self.desc(src)) {
            (
                TypeDesc::Array { size: sd, elem: ed },
                TypeDesc::Array { size: ss, elem: es },
            ) => sd == ss && ed == es,
            _ => false,
        }
    }

    /// Whether `a` and `b` may appear on the two sides of `op`: equality
    /// operators accept identical or both-numeric operands, ordering
    /// operators only both-numeric ones.
    pub fn comparable(&self, a: TypeId, b: TypeId, op: RelOp) -> bool {
        let numeric = self.is_numeric(a) && self.is_numeric(b);
        match op {
            RelOp::Eq | RelOp::Neq => a == b || numeric,
            RelOp::Lt | RelOp::Le | RelOp::Gt | RelOp::Ge => numeric,
        }
    }

    /// Stable textual form used when emitting declarations.
    pub fn text(&self, t: TypeId) -> String {
        match self.desc(t) {
            TypeDesc::Integer => "int".to_string(),
            TypeDesc::Float => "float".to_string(),
            TypeDesc::Boolean => "bool".to_string(),
            TypeDesc::Character => "char".to_string(),
            TypeDesc::Void => "void".to_string(),
            TypeDesc::Error => "error".to_string(),
            TypeDesc::Array { size, elem } => {
                format!("array[{}] of {}", size, self.text(*elem))
            }
            TypeDesc::Function { params, ret } => {
                let params: Vec<String> = params.iter().map(|p| self.text(*p)).collect();
                if *ret == self.void {
                    format!("func({})", params.join(","))
                } else {
                    format!("func({}):{}", params.join(","), self.text(*ret))
                }
            }
        }
    }
}

impl Default for TypeManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_idempotent() {
        let mut types = TypeManager::new();
        let elem = types.integer();
        let a = types.array(10, elem);
        let b = types.array(10, elem);
        assert_eq!(a, b);

        let f1 = types.function(vec![elem, types.float()], types.void());
        let f2 = types.function(vec![elem, types.float()], types.void());
        assert_eq!(f1, f2);
    }

    #[test]
    fn test_distinct_constructions_get_distinct_ids() {
        let mut types = TypeManager::new();
        let elem = types.integer();
        let a = types.array(10, elem);
        let b = types.array(11, elem);
        assert_ne!(a, b);
        let c = types.array(10, types.float());
        assert_ne!(a, c);
    }

    #[test]
    fn test_predicates() {
        let mut types = TypeManager::new();
        assert!(types.is_primitive(types.integer()));
        assert!(types.is_primitive(types.character()));
        assert!(!types.is_primitive(types.void()));
        assert!(types.is_numeric(types.float()));
        assert!(!types.is_numeric(types.boolean()));

        let arr = types.array(4, types.boolean());
        assert!(types.is_array(arr));
        assert!(!types.is_primitive(arr));

        let proc_ty = types.function(vec![], types.void());
        assert!(types.is_function(proc_ty));
        assert!(types.is_void_function(proc_ty));
        let func_ty = types.function(vec![], types.integer());
        assert!(!types.is_void_function(func_ty));
    }

    #[test]
    fn test_copyable() {
        let mut types = TypeManager::new();
        let int_ty = types.integer();
        let float_ty = types.float();
        assert!(types.copyable(int_ty, int_ty));
        assert!(types.copyable(float_ty, int_ty));
        assert!(!types.copyable(int_ty, float_ty));

        let a = types.array(3, int_ty);
        let b = types.array(3, int_ty);
        let c = types.array(4, int_ty);
        assert!(types.copyable(a, b));
        assert!(!types.copyable(a, c));
    }

    #[test]
    fn test_comparable() {
        let mut types = TypeManager::new();
        let int_ty = types.integer();
        let float_ty = types.float();
        let bool_ty = types.boolean();
        assert!(types.comparable(int_ty, float_ty, RelOp::Eq));
        assert!(types.comparable(bool_ty, bool_ty, RelOp::Neq));
        assert!(!types.comparable(bool_ty, bool_ty, RelOp::Lt));
        assert!(types.comparable(int_ty, int_ty, RelOp::Ge));
        let arr = types.array(2, int_ty);
        assert!(!types.comparable(arr, int_ty, RelOp::Eq));
    }

    #[test]
    fn test_size_of() {
        let mut types = TypeManager::new();
        assert_eq!(types.size_of(types.integer()), 1);
        let arr = types.array(8, types.float());
        assert_eq!(types.size_of(arr), 8);
    }

    #[test]
    fn test_text() {
        let mut types = TypeManager::new();
        assert_eq!(types.text(types.integer()), "int");
        let arr = types.array(5, types.character());
        assert_eq!(types.text(arr), "array[5] of char");
        let f = types.function(vec![types.integer()], types.float());
        assert_eq!(types.text(f), "func(int):float");
    }
}
