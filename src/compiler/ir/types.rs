//! IR type system and fixed aggregate layouts

use std::fmt;

/// First-class IR type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    /// No value (function returns only)
    Void,
    /// Integer of the given bit width (`i1`, `i8`, `i32`, `i64`)
    Int(u32),
    /// 64-bit IEEE float
    Double,
    /// Opaque pointer
    Ptr,
    /// Named struct type (`%EigenValue`)
    Named(String),
    /// Fixed-length array
    Array(u64, Box<IrType>),
}

impl IrType {
    /// 1-bit boolean
    pub const BOOL: IrType = IrType::Int(1);
    /// 8-bit byte
    pub const I8: IrType = IrType::Int(8);
    /// 32-bit integer
    pub const I32: IrType = IrType::Int(32);
    /// 64-bit integer
    pub const I64: IrType = IrType::Int(64);

    /// Returns true for integer types of any width
    pub fn is_int(&self) -> bool {
        matches!(self, IrType::Int(_))
    }

    /// Returns true for the 1-bit boolean type
    pub fn is_bool(&self) -> bool {
        *self == IrType::BOOL
    }

    /// Returns true for `double`
    pub fn is_double(&self) -> bool {
        *self == IrType::Double
    }

    /// Returns true for `ptr`
    pub fn is_ptr(&self) -> bool {
        *self == IrType::Ptr
    }

    /// Returns true when values of this type can live in a register
    pub fn is_first_class(&self) -> bool {
        matches!(self, IrType::Int(_) | IrType::Double | IrType::Ptr)
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Int(bits) => write!(f, "i{}", bits),
            IrType::Double => write!(f, "double"),
            IrType::Ptr => write!(f, "ptr"),
            IrType::Named(name) => write!(f, "%{}", name),
            IrType::Array(len, elem) => write!(f, "[{} x {}]", len, elem),
        }
    }
}

/// Named struct type definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructType {
    /// Type name (without the `%` sigil)
    pub name: String,
    /// Field types in order
    pub fields: Vec<IrType>,
}

/// Capacity of the boxed record's history ring buffer
pub const EIGEN_HISTORY_CAPACITY: u64 = 100;

/// Name of the boxed-record struct type
pub const EIGEN_VALUE_TYPE: &str = "EigenValue";

/// Layout of the runtime's boxed record
///
/// ```text
/// { double value, double gradient, double stability, i64 iteration,
///   [100 x double] history, i32 history_size, i32 history_index,
///   double prev_value, double prev_gradient }
/// ```
pub fn eigen_value_layout() -> StructType {
    StructType {
        name: EIGEN_VALUE_TYPE.to_string(),
        fields: vec![
            IrType::Double,
            IrType::Double,
            IrType::Double,
            IrType::I64,
            IrType::Array(EIGEN_HISTORY_CAPACITY, Box::new(IrType::Double)),
            IrType::I32,
            IrType::I32,
            IrType::Double,
            IrType::Double,
        ],
    }
}

/// Layout shared by list and string handles: `{ ptr data, i64 length, i64 capacity }`
pub fn collection_layout(name: &str) -> StructType {
    StructType {
        name: name.to_string(),
        fields: vec![IrType::Ptr, IrType::I64, IrType::I64],
    }
}

/// Width in bytes of one struct-instance field slot
pub const STRUCT_FIELD_BYTES: u64 = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(IrType::BOOL.to_string(), "i1");
        assert_eq!(IrType::Named("EigenValue".into()).to_string(), "%EigenValue");
        assert_eq!(
            IrType::Array(100, Box::new(IrType::Double)).to_string(),
            "[100 x double]"
        );
    }

    #[test]
    fn test_eigen_layout_shape() {
        let layout = eigen_value_layout();
        assert_eq!(layout.fields.len(), 9);
        assert_eq!(layout.fields[3], IrType::I64);
        assert_eq!(
            layout.fields[4],
            IrType::Array(EIGEN_HISTORY_CAPACITY, Box::new(IrType::Double))
        );
    }
}
