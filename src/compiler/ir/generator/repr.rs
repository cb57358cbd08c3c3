//! Representation lowering: conversions between value kinds.
//!
//! Every value the emitter produces is a [`Typed`]: the IR operand plus the
//! kind that says how to read its bits. These helpers emit whatever
//! instructions a conversion needs. They may allocate (a boxed record) but
//! never free; ownership of new allocations is decided by the caller.

use super::abi;
use super::{Typed, ValueKind};
use crate::compiler::ir::types::EIGEN_VALUE_TYPE;
use crate::compiler::ir::{CastOp, FloatPred, FunctionBuilder, IntPred, IrType, Value};
use crate::compiler::runtime;
use crate::{Error, Result};

/// Where [`to_tracked`] puts a new boxed record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxHome {
    /// In-place record in the current frame (`alloca` + `eigen_init`)
    Stack,
    /// Runtime allocation (`eigen_create`)
    Heap,
}

/// Lower any value to a raw `double`.
///
/// Booleans widen to 0.0/1.0, tracked values read their current value, and
/// pointer kinds reinterpret their address bits so they can transit a
/// floating slot (a list element, for instance).
pub fn to_scalar(b: &mut FunctionBuilder, v: &Typed) -> Value {
    match &v.kind {
        ValueKind::Scalar if v.value.ty.is_bool() => {
            b.cast(CastOp::UiToFp, v.value.clone(), IrType::Double)
        }
        ValueKind::Scalar => v.value.clone(),
        ValueKind::Tracked => b.call(
            IrType::Double,
            runtime::EIGEN_GET_VALUE,
            vec![v.value.clone()],
        ),
        ValueKind::List | ValueKind::Text | ValueKind::Struct(_) => {
            let bits = b.cast(CastOp::PtrToInt, v.value.clone(), IrType::I64);
            b.cast(CastOp::BitCast, bits, IrType::Double)
        }
        ValueKind::Packed => b.cast(CastOp::BitCast, v.value.clone(), IrType::Double),
    }
}

/// Lower a value to a boxed-record pointer.
///
/// A tracked value is returned unchanged, which is what lets two names alias
/// one record. Numbers get a fresh record in `home`.
pub fn to_tracked(b: &mut FunctionBuilder, v: &Typed, home: BoxHome) -> Result<Typed> {
    match &v.kind {
        ValueKind::Tracked => Ok(v.clone()),
        ValueKind::Scalar | ValueKind::Packed => {
            let scalar = to_scalar(b, v);
            let record = match home {
                BoxHome::Heap => b.call(IrType::Ptr, runtime::EIGEN_CREATE, vec![scalar]),
                BoxHome::Stack => {
                    let record = b.alloca_at_entry(IrType::Named(EIGEN_VALUE_TYPE.to_string()));
                    b.call_void(runtime::EIGEN_INIT, vec![record.clone(), scalar]);
                    record
                }
            };
            Ok(Typed::tracked(record))
        }
        other => Err(Error::InvalidConversion {
            from: other.to_string(),
            to: ValueKind::Tracked.to_string(),
        }),
    }
}

/// Lower a value to an `i1` condition
pub fn to_boolean(b: &mut FunctionBuilder, v: &Typed) -> Result<Value> {
    match (&v.kind, &v.value.ty) {
        (ValueKind::Scalar, IrType::Int(1)) => Ok(v.value.clone()),
        (ValueKind::Scalar, IrType::Double) | (ValueKind::Tracked, IrType::Ptr) => {
            let scalar = to_scalar(b, v);
            Ok(b.fcmp(FloatPred::One, scalar, Value::float(0.0)))
        }
        (ValueKind::Packed, IrType::Int(64)) => {
            let scalar = to_scalar(b, v);
            Ok(b.fcmp(FloatPred::One, scalar, Value::float(0.0)))
        }
        (ValueKind::List | ValueKind::Text | ValueKind::Struct(_), IrType::Ptr) => {
            Ok(b.icmp(IntPred::Ne, v.value.clone(), Value::null()))
        }
        (kind, ty) => Err(Error::InvalidConversion {
            from: format!("{} ({})", kind, ty),
            to: "i1".to_string(),
        }),
    }
}

/// Coerce to `want`, decoding packed ABI words on first use
pub fn coerce(b: &mut FunctionBuilder, v: &Typed, want: &ValueKind) -> Result<Typed> {
    match (&v.kind, want) {
        (have, want) if have == want => Ok(v.clone()),
        (ValueKind::Packed, want) => Ok(abi::unpack(b, &v.value, want)),
        (ValueKind::Struct(_), ValueKind::Struct(name)) => {
            Ok(Typed::structure(v.value.clone(), name))
        }
        (ValueKind::Scalar | ValueKind::Tracked, ValueKind::Scalar) => {
            Ok(Typed::scalar(to_scalar(b, v)))
        }
        (have, want) => Err(Error::InvalidConversion {
            from: have.to_string(),
            to: want.to_string(),
        }),
    }
}
