//! # Runtime Surface
//!
//! Fixed catalog of functions provided by the native EigenScript runtime
//! library (and libc/libm). The generator calls these but never defines them;
//! every compilation unit declares the whole catalog once, up front.

use super::ir::{FunctionDecl, IrModule, IrType};
use super::target::TargetInfo;
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Parameter/return type in a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtType {
    /// No value
    Void,
    /// `i1` flag
    Bool,
    /// `i64`
    I64,
    /// `double`
    F64,
    /// Opaque pointer
    Ptr,
    /// Platform `size_t`
    Size,
}

impl RtType {
    /// Concrete IR type for the given target
    pub fn lower(self, target: &TargetInfo) -> IrType {
        match self {
            RtType::Void => IrType::Void,
            RtType::Bool => IrType::BOOL,
            RtType::I64 => IrType::I64,
            RtType::F64 => IrType::Double,
            RtType::Ptr => IrType::Ptr,
            RtType::Size => target.size_type(),
        }
    }
}

/// One runtime function signature
#[derive(Debug, Clone, Copy)]
pub struct RuntimeFn {
    /// Symbol name
    pub name: &'static str,
    /// Return type
    pub ret: RtType,
    /// Parameter types
    pub params: &'static [RtType],
}

impl RuntimeFn {
    /// Declaration for the given target
    pub fn declaration(&self, target: &TargetInfo) -> FunctionDecl {
        FunctionDecl {
            name: self.name.to_string(),
            ret: self.ret.lower(target),
            params: self.params.iter().map(|p| p.lower(target)).collect(),
        }
    }
}

/// libc allocator, used for struct instances
pub const MALLOC: &str = "malloc";

/// Heap-allocate a boxed record holding a value
pub const EIGEN_CREATE: &str = "eigen_create";
/// Initialize a boxed record in caller-provided storage
pub const EIGEN_INIT: &str = "eigen_init";
/// Record a new value, advancing gradient and history
pub const EIGEN_UPDATE: &str = "eigen_update";
/// Current value of a boxed record
pub const EIGEN_GET_VALUE: &str = "eigen_get_value";
/// Latest rate of change (`why`)
pub const EIGEN_GET_GRADIENT: &str = "eigen_get_gradient";
/// Stability measure (`how`)
pub const EIGEN_GET_STABILITY: &str = "eigen_get_stability";
/// Update count (`when`)
pub const EIGEN_GET_ITERATION: &str = "eigen_get_iteration";
/// Free a heap record; null-safe
pub const EIGEN_DESTROY: &str = "eigen_destroy";

/// Allocate a list of the given length
pub const LIST_CREATE: &str = "eigen_list_create";
/// Read a list element
pub const LIST_GET: &str = "eigen_list_get";
/// Write a list element
pub const LIST_SET: &str = "eigen_list_set";
/// Element count of a list
pub const LIST_LENGTH: &str = "eigen_list_length";
/// Push an element, growing the list
pub const LIST_APPEND: &str = "eigen_list_append";
/// Free a list; null-safe
pub const LIST_DESTROY: &str = "eigen_list_destroy";

/// Copy a NUL-terminated constant into a string handle
pub const STRING_CREATE: &str = "eigen_string_create";
/// Free a string; null-safe
pub const STRING_DESTROY: &str = "eigen_string_destroy";
/// Byte length of a string
pub const STRING_LENGTH: &str = "eigen_string_length";
/// New string joining two strings
pub const STRING_CONCAT: &str = "eigen_string_concat";
/// Nonzero when two strings are equal
pub const STRING_EQUALS: &str = "eigen_string_equals";
/// Character code at an index
pub const CHAR_AT: &str = "eigen_char_at";
/// Format a number as a new string
pub const NUMBER_TO_STRING: &str = "eigen_number_to_string";
/// Parse a string as a number
pub const STRING_TO_NUMBER: &str = "eigen_string_to_number";

/// Print a number
pub const PRINT_DOUBLE: &str = "eigen_print_double";
/// Print a string
pub const PRINT_STRING: &str = "eigen_print_string";
/// Print a tracked value's current value
pub const PRINT_VAL: &str = "eigen_print_val";

use RtType::*;

/// Full catalog in declaration order
pub const CATALOG: &[RuntimeFn] = &[
    RuntimeFn { name: MALLOC, ret: Ptr, params: &[Size] },
    // Boxed-value lifecycle
    RuntimeFn { name: EIGEN_CREATE, ret: Ptr, params: &[F64] },
    RuntimeFn { name: EIGEN_INIT, ret: Void, params: &[Ptr, F64] },
    RuntimeFn { name: EIGEN_UPDATE, ret: Void, params: &[Ptr, F64] },
    RuntimeFn { name: EIGEN_GET_VALUE, ret: F64, params: &[Ptr] },
    RuntimeFn { name: EIGEN_GET_GRADIENT, ret: F64, params: &[Ptr] },
    RuntimeFn { name: EIGEN_GET_STABILITY, ret: F64, params: &[Ptr] },
    RuntimeFn { name: EIGEN_GET_ITERATION, ret: I64, params: &[Ptr] },
    RuntimeFn { name: "eigen_check_converged", ret: Bool, params: &[Ptr] },
    RuntimeFn { name: "eigen_check_diverging", ret: Bool, params: &[Ptr] },
    RuntimeFn { name: "eigen_check_oscillating", ret: Bool, params: &[Ptr] },
    RuntimeFn { name: "eigen_check_stable", ret: Bool, params: &[Ptr] },
    RuntimeFn { name: "eigen_check_improving", ret: Bool, params: &[Ptr] },
    RuntimeFn { name: EIGEN_DESTROY, ret: Void, params: &[Ptr] },
    // Lists
    RuntimeFn { name: LIST_CREATE, ret: Ptr, params: &[I64] },
    RuntimeFn { name: LIST_GET, ret: F64, params: &[Ptr, I64] },
    RuntimeFn { name: LIST_SET, ret: Void, params: &[Ptr, I64, F64] },
    RuntimeFn { name: LIST_LENGTH, ret: I64, params: &[Ptr] },
    RuntimeFn { name: LIST_APPEND, ret: Void, params: &[Ptr, F64] },
    RuntimeFn { name: LIST_DESTROY, ret: Void, params: &[Ptr] },
    // Strings
    RuntimeFn { name: STRING_CREATE, ret: Ptr, params: &[Ptr] },
    RuntimeFn { name: STRING_DESTROY, ret: Void, params: &[Ptr] },
    RuntimeFn { name: STRING_LENGTH, ret: I64, params: &[Ptr] },
    RuntimeFn { name: STRING_CONCAT, ret: Ptr, params: &[Ptr, Ptr] },
    RuntimeFn { name: STRING_EQUALS, ret: I64, params: &[Ptr, Ptr] },
    RuntimeFn { name: CHAR_AT, ret: I64, params: &[Ptr, I64] },
    RuntimeFn { name: NUMBER_TO_STRING, ret: Ptr, params: &[F64] },
    RuntimeFn { name: STRING_TO_NUMBER, ret: F64, params: &[Ptr] },
    // Output
    RuntimeFn { name: PRINT_DOUBLE, ret: Void, params: &[F64] },
    RuntimeFn { name: PRINT_STRING, ret: Void, params: &[Ptr] },
    RuntimeFn { name: PRINT_VAL, ret: Void, params: &[F64] },
    // libm
    RuntimeFn { name: "sqrt", ret: F64, params: &[F64] },
    RuntimeFn { name: "fabs", ret: F64, params: &[F64] },
    RuntimeFn { name: "floor", ret: F64, params: &[F64] },
    RuntimeFn { name: "ceil", ret: F64, params: &[F64] },
    RuntimeFn { name: "sin", ret: F64, params: &[F64] },
    RuntimeFn { name: "cos", ret: F64, params: &[F64] },
    RuntimeFn { name: "exp", ret: F64, params: &[F64] },
    RuntimeFn { name: "log", ret: F64, params: &[F64] },
    RuntimeFn { name: "pow", ret: F64, params: &[F64, F64] },
];

/// Source-level state predicate and the runtime check implementing it
#[derive(Debug, Clone, Copy)]
pub struct Predicate {
    /// Runtime check symbol
    pub check: &'static str,
}

/// Source-level interrogative and its runtime accessor
#[derive(Debug, Clone, Copy)]
pub struct Interrogative {
    /// Runtime accessor symbol; `None` means the value itself
    pub accessor: Option<&'static str>,
    /// Result when the operand is an untracked scalar
    pub fast_default: f64,
}

lazy_static! {
    /// Catalog indexed by symbol name
    pub static ref RUNTIME_FUNCTIONS: HashMap<&'static str, RuntimeFn> =
        CATALOG.iter().map(|f| (f.name, *f)).collect();

    /// `converged`, `diverging`, ... keyed by source identifier
    pub static ref PREDICATES: HashMap<&'static str, Predicate> = {
        let mut m = HashMap::new();
        m.insert("converged", Predicate { check: "eigen_check_converged" });
        m.insert("diverging", Predicate { check: "eigen_check_diverging" });
        m.insert("oscillating", Predicate { check: "eigen_check_oscillating" });
        m.insert("stable", Predicate { check: "eigen_check_stable" });
        m.insert("improving", Predicate { check: "eigen_check_improving" });
        m
    };

    /// `what`, `why`, `how`, `when` keyed by question word
    pub static ref INTERROGATIVES: HashMap<&'static str, Interrogative> = {
        let mut m = HashMap::new();
        m.insert("what", Interrogative { accessor: None, fast_default: 0.0 });
        m.insert("why", Interrogative { accessor: Some(EIGEN_GET_GRADIENT), fast_default: 0.0 });
        m.insert("how", Interrogative { accessor: Some(EIGEN_GET_STABILITY), fast_default: 1.0 });
        m.insert("when", Interrogative { accessor: Some(EIGEN_GET_ITERATION), fast_default: 0.0 });
        m
    };

    /// One-argument math builtins: source name -> libm symbol
    pub static ref MATH_UNARY: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("sqrt", "sqrt");
        m.insert("abs", "fabs");
        m.insert("floor", "floor");
        m.insert("ceil", "ceil");
        m.insert("sin", "sin");
        m.insert("cos", "cos");
        m.insert("exp", "exp");
        m.insert("log", "log");
        m
    };
}

/// Declare every catalog entry in `module`
pub fn declare_runtime(module: &mut IrModule, target: &TargetInfo) {
    for f in CATALOG {
        module.declare(f.declaration(target));
    }
}

/// Return type of a catalog function
pub fn return_type(name: &str, target: &TargetInfo) -> Option<IrType> {
    RUNTIME_FUNCTIONS.get(name).map(|f| f.ret.lower(target))
}

/// True when `name` is a runtime (or libc/libm) symbol
pub fn is_runtime_symbol(name: &str) -> bool {
    RUNTIME_FUNCTIONS.contains_key(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_once() {
        let target = TargetInfo::resolve(Some("x86_64-unknown-linux-gnu"));
        let mut module = IrModule::new("m", &target.triple);
        declare_runtime(&mut module, &target);
        declare_runtime(&mut module, &target);
        assert_eq!(module.declarations.len(), CATALOG.len());
    }

    #[test]
    fn test_malloc_uses_size_t() {
        let wasm = TargetInfo::resolve(Some("wasm32-unknown-unknown"));
        let decl = RUNTIME_FUNCTIONS[MALLOC].declaration(&wasm);
        assert_eq!(decl.params, vec![IrType::I32]);
        let native = TargetInfo::resolve(Some("x86_64-unknown-linux-gnu"));
        let decl = RUNTIME_FUNCTIONS[MALLOC].declaration(&native);
        assert_eq!(decl.params, vec![IrType::I64]);
    }

    #[test]
    fn test_tables_reference_catalog() {
        for p in PREDICATES.values() {
            assert!(is_runtime_symbol(p.check));
        }
        for i in INTERROGATIVES.values() {
            if let Some(acc) = i.accessor {
                assert!(is_runtime_symbol(acc));
            }
        }
        for sym in MATH_UNARY.values() {
            assert!(is_runtime_symbol(sym));
        }
    }
}
