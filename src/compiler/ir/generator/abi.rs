//! Function ABI packing.
//!
//! Every user function takes and returns fixed-width `i64` words. A value
//! crossing the boundary is first tagged ([`AbiSlot`]) with how its bits are
//! to be read, and only erased to a raw word at the last step. On the way in,
//! words stay packed until a use forces a kind, because one function may be
//! called with a number at one site and a string at another.

use super::repr;
use super::{Typed, ValueKind};
use crate::compiler::ir::{CastOp, FunctionBuilder, IrType, Value};

/// A value tagged with its ABI encoding
#[derive(Debug, Clone, PartialEq)]
pub enum AbiSlot {
    /// `double` payload, bit-reinterpreted into the word
    Number(Value),
    /// Pointer payload, converted address-to-integer
    Pointer(Value),
    /// Already a raw word
    Word(Value),
}

impl AbiSlot {
    /// Tag a typed value
    pub fn from_typed(b: &mut FunctionBuilder, v: &Typed) -> Self {
        match &v.kind {
            ValueKind::Scalar => AbiSlot::Number(repr::to_scalar(b, v)),
            ValueKind::Tracked | ValueKind::List | ValueKind::Text | ValueKind::Struct(_) => {
                AbiSlot::Pointer(v.value.clone())
            }
            ValueKind::Packed => AbiSlot::Word(v.value.clone()),
        }
    }

    /// Zero-valued filler for missing arguments
    pub fn zero() -> Self {
        AbiSlot::Number(Value::float(0.0))
    }

    /// Erase the tag, producing the raw `i64` word
    pub fn erase(self, b: &mut FunctionBuilder) -> Value {
        match self {
            AbiSlot::Number(v) => b.cast(CastOp::BitCast, v, IrType::I64),
            AbiSlot::Pointer(p) => b.cast(CastOp::PtrToInt, p, IrType::I64),
            AbiSlot::Word(w) => w,
        }
    }
}

/// Encode a value as one ABI word
pub fn pack(b: &mut FunctionBuilder, v: &Typed) -> Value {
    AbiSlot::from_typed(b, v).erase(b)
}

/// Decode an ABI word as the kind a use site expects
pub fn unpack(b: &mut FunctionBuilder, word: &Value, expected: &ValueKind) -> Typed {
    match expected {
        ValueKind::Scalar => Typed::scalar(b.cast(CastOp::BitCast, word.clone(), IrType::Double)),
        ValueKind::Packed => Typed::packed(word.clone()),
        kind => Typed {
            value: b.cast(CastOp::IntToPtr, word.clone(), IrType::Ptr),
            kind: kind.clone(),
        },
    }
}

/// How a call site's arguments were fitted to the callee's arity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentFit {
    /// Counts matched
    Exact,
    /// This many zero words were appended
    Padded(usize),
    /// This many trailing arguments were dropped
    Truncated(usize),
}

/// Zero-fill missing arguments and drop surplus ones
pub fn fit_arguments(mut args: Vec<AbiSlot>, arity: usize) -> (Vec<AbiSlot>, ArgumentFit) {
    let supplied = args.len();
    if supplied < arity {
        args.resize(arity, AbiSlot::zero());
        (args, ArgumentFit::Padded(arity - supplied))
    } else if supplied > arity {
        args.truncate(arity);
        (args, ArgumentFit::Truncated(supplied - arity))
    } else {
        (args, ArgumentFit::Exact)
    }
}
