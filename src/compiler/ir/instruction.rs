//! IR instruction definitions

use super::types::IrType;
use std::fmt;

/// Virtual register (SSA value, defined exactly once per function)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IrReg(pub u32);

impl IrReg {
    /// Creates a new virtual register with the given ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for IrReg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "%r{}", self.0)
    }
}

/// Instruction operand
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Virtual register
    Reg(IrReg),
    /// Integer constant
    Int(i64),
    /// Floating constant
    Float(f64),
    /// Null pointer
    Null,
    /// Address of a global variable or function
    Global(String),
}

/// Typed value: an operand together with its IR type
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    /// IR type of the operand
    pub ty: IrType,
    /// The operand itself
    pub op: Operand,
}

impl Value {
    /// Register of the given type
    pub fn reg(reg: IrReg, ty: IrType) -> Self {
        Self {
            ty,
            op: Operand::Reg(reg),
        }
    }

    /// `double` constant
    pub fn float(v: f64) -> Self {
        Self {
            ty: IrType::Double,
            op: Operand::Float(v),
        }
    }

    /// Integer constant of the given type
    pub fn int(ty: IrType, v: i64) -> Self {
        Self {
            ty,
            op: Operand::Int(v),
        }
    }

    /// `i1` constant
    pub fn bool(v: bool) -> Self {
        Self::int(IrType::BOOL, i64::from(v))
    }

    /// Null pointer
    pub fn null() -> Self {
        Self {
            ty: IrType::Ptr,
            op: Operand::Null,
        }
    }

    /// Address of a global symbol
    pub fn global(name: impl Into<String>) -> Self {
        Self {
            ty: IrType::Ptr,
            op: Operand::Global(name.into()),
        }
    }

    /// Register backing this value, if any
    pub fn as_reg(&self) -> Option<IrReg> {
        match self.op {
            Operand::Reg(r) => Some(r),
            _ => None,
        }
    }

    /// True for compile-time constants
    pub fn is_const(&self) -> bool {
        !matches!(self.op, Operand::Reg(_) | Operand::Global(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.op {
            Operand::Reg(r) => write!(f, "{}", r),
            Operand::Int(v) if self.ty.is_bool() => {
                write!(f, "{}", if *v != 0 { "true" } else { "false" })
            }
            Operand::Int(v) => write!(f, "{}", v),
            Operand::Float(v) => write!(f, "0x{:016X}", v.to_bits()),
            Operand::Null => write!(f, "null"),
            Operand::Global(name) => write!(f, "@{}", name),
        }
    }
}

/// Two-operand arithmetic and bitwise operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// Float addition
    FAdd,
    /// Float subtraction
    FSub,
    /// Float multiplication
    FMul,
    /// Float division
    FDiv,
    /// Float remainder
    FRem,
    /// Integer addition
    Add,
    /// Integer multiplication
    Mul,
    /// Bitwise and
    And,
    /// Bitwise or
    Or,
    /// Bitwise xor
    Xor,
}

impl BinOp {
    /// True for operations over `double`
    pub fn is_float(self) -> bool {
        matches!(
            self,
            BinOp::FAdd | BinOp::FSub | BinOp::FMul | BinOp::FDiv | BinOp::FRem
        )
    }

    /// LLVM mnemonic
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOp::FAdd => "fadd",
            BinOp::FSub => "fsub",
            BinOp::FMul => "fmul",
            BinOp::FDiv => "fdiv",
            BinOp::FRem => "frem",
            BinOp::Add => "add",
            BinOp::Mul => "mul",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
        }
    }
}

/// Ordered float comparison predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatPred {
    /// Ordered equal
    Oeq,
    /// Ordered not equal
    One,
    /// Ordered less than
    Olt,
    /// Ordered greater than
    Ogt,
    /// Ordered less or equal
    Ole,
    /// Ordered greater or equal
    Oge,
}

impl FloatPred {
    /// LLVM predicate keyword
    pub fn keyword(self) -> &'static str {
        match self {
            FloatPred::Oeq => "oeq",
            FloatPred::One => "one",
            FloatPred::Olt => "olt",
            FloatPred::Ogt => "ogt",
            FloatPred::Ole => "ole",
            FloatPred::Oge => "oge",
        }
    }
}

/// Integer/pointer comparison predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntPred {
    /// Equal
    Eq,
    /// Not equal
    Ne,
}

impl IntPred {
    /// LLVM predicate keyword
    pub fn keyword(self) -> &'static str {
        match self {
            IntPred::Eq => "eq",
            IntPred::Ne => "ne",
        }
    }
}

/// Conversion operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOp {
    /// Unsigned integer to float
    UiToFp,
    /// Signed integer to float
    SiToFp,
    /// Float to signed integer
    FpToSi,
    /// Same-width bit reinterpretation
    BitCast,
    /// Pointer to integer
    PtrToInt,
    /// Integer to pointer
    IntToPtr,
    /// Zero extension
    ZExt,
    /// Truncation
    Trunc,
}

impl CastOp {
    /// LLVM mnemonic
    pub fn mnemonic(self) -> &'static str {
        match self {
            CastOp::UiToFp => "uitofp",
            CastOp::SiToFp => "sitofp",
            CastOp::FpToSi => "fptosi",
            CastOp::BitCast => "bitcast",
            CastOp::PtrToInt => "ptrtoint",
            CastOp::IntToPtr => "inttoptr",
            CastOp::ZExt => "zext",
            CastOp::Trunc => "trunc",
        }
    }

    /// The cast that exactly undoes this one, when such a cast exists
    pub fn inverse(self) -> Option<CastOp> {
        match self {
            CastOp::BitCast => Some(CastOp::BitCast),
            CastOp::PtrToInt => Some(CastOp::IntToPtr),
            CastOp::IntToPtr => Some(CastOp::PtrToInt),
            CastOp::ZExt => Some(CastOp::Trunc),
            _ => None,
        }
    }
}

/// IR instruction (typed SSA form)
#[derive(Debug, Clone, PartialEq)]
pub enum IrInstruction {
    // Memory
    /// Reserve a stack slot: dst = alloca ty
    Alloca {
        /// Pointer to the slot
        dst: IrReg,
        /// Slot type
        ty: IrType,
    },
    /// Read memory: dst = load ty, ptr
    Load {
        /// Loaded value
        dst: IrReg,
        /// Loaded type
        ty: IrType,
        /// Source address
        ptr: Value,
    },
    /// Write memory: store value, ptr
    Store {
        /// Stored value
        value: Value,
        /// Destination address
        ptr: Value,
    },
    /// Address arithmetic: dst = getelementptr elem, base, index
    Gep {
        /// Computed address
        dst: IrReg,
        /// Element type the index scales by
        elem: IrType,
        /// Base address
        base: Value,
        /// Element index
        index: Value,
    },

    // Arithmetic
    /// dst = op lhs, rhs
    Binary {
        /// Result
        dst: IrReg,
        /// Operation
        op: BinOp,
        /// Left operand
        lhs: Value,
        /// Right operand (same type as lhs)
        rhs: Value,
    },
    /// Float negation
    FNeg {
        /// Result
        dst: IrReg,
        /// Operand
        operand: Value,
    },
    /// Float comparison producing `i1`
    FCmp {
        /// Result
        dst: IrReg,
        /// Predicate
        pred: FloatPred,
        /// Left operand
        lhs: Value,
        /// Right operand
        rhs: Value,
    },
    /// Integer or pointer comparison producing `i1`
    ICmp {
        /// Result
        dst: IrReg,
        /// Predicate
        pred: IntPred,
        /// Left operand
        lhs: Value,
        /// Right operand
        rhs: Value,
    },
    /// Conversion: dst = op value to ty
    Cast {
        /// Result
        dst: IrReg,
        /// Conversion
        op: CastOp,
        /// Source value
        value: Value,
        /// Result type
        to: IrType,
    },

    // Calls
    /// Direct call; `dst` is `None` for void callees
    Call {
        /// Result register
        dst: Option<IrReg>,
        /// Return type
        ret: IrType,
        /// Callee symbol
        callee: String,
        /// Arguments
        args: Vec<Value>,
    },

    // Terminators
    /// Unconditional branch
    Br {
        /// Target block label
        target: String,
    },
    /// Two-way branch on an `i1`
    CondBr {
        /// Condition
        cond: Value,
        /// Taken when true
        then_label: String,
        /// Taken when false
        else_label: String,
    },
    /// Return, with a value unless the function is void
    Ret {
        /// Returned value
        value: Option<Value>,
    },
    /// Marks an impossible path
    Unreachable,
}

impl IrInstruction {
    /// Register defined by this instruction
    pub fn dst(&self) -> Option<IrReg> {
        match self {
            IrInstruction::Alloca { dst, .. }
            | IrInstruction::Load { dst, .. }
            | IrInstruction::Gep { dst, .. }
            | IrInstruction::Binary { dst, .. }
            | IrInstruction::FNeg { dst, .. }
            | IrInstruction::FCmp { dst, .. }
            | IrInstruction::ICmp { dst, .. }
            | IrInstruction::Cast { dst, .. } => Some(*dst),
            IrInstruction::Call { dst, .. } => *dst,
            _ => None,
        }
    }

    /// Type of the defined register
    pub fn result_type(&self) -> Option<IrType> {
        match self {
            IrInstruction::Alloca { .. } | IrInstruction::Gep { .. } => Some(IrType::Ptr),
            IrInstruction::Load { ty, .. } => Some(ty.clone()),
            IrInstruction::Binary { lhs, .. } => Some(lhs.ty.clone()),
            IrInstruction::FNeg { .. } => Some(IrType::Double),
            IrInstruction::FCmp { .. } | IrInstruction::ICmp { .. } => Some(IrType::BOOL),
            IrInstruction::Cast { to, .. } => Some(to.clone()),
            IrInstruction::Call { dst: Some(_), ret, .. } => Some(ret.clone()),
            _ => None,
        }
    }

    /// Values read by this instruction
    pub fn operands(&self) -> Vec<&Value> {
        match self {
            IrInstruction::Alloca { .. }
            | IrInstruction::Br { .. }
            | IrInstruction::Unreachable => vec![],
            IrInstruction::Load { ptr, .. } => vec![ptr],
            IrInstruction::Store { value, ptr } => vec![value, ptr],
            IrInstruction::Gep { base, index, .. } => vec![base, index],
            IrInstruction::Binary { lhs, rhs, .. }
            | IrInstruction::FCmp { lhs, rhs, .. }
            | IrInstruction::ICmp { lhs, rhs, .. } => vec![lhs, rhs],
            IrInstruction::FNeg { operand, .. } => vec![operand],
            IrInstruction::Cast { value, .. } => vec![value],
            IrInstruction::Call { args, .. } => args.iter().collect(),
            IrInstruction::CondBr { cond, .. } => vec![cond],
            IrInstruction::Ret { value } => value.iter().collect(),
        }
    }

    /// True for block terminators
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            IrInstruction::Br { .. }
                | IrInstruction::CondBr { .. }
                | IrInstruction::Ret { .. }
                | IrInstruction::Unreachable
        )
    }

    /// Labels this terminator may transfer control to
    pub fn successors(&self) -> Vec<&str> {
        match self {
            IrInstruction::Br { target } => vec![target.as_str()],
            IrInstruction::CondBr {
                then_label,
                else_label,
                ..
            } => vec![then_label.as_str(), else_label.as_str()],
            _ => vec![],
        }
    }

    /// Callee symbol for call instructions
    pub fn callee(&self) -> Option<&str> {
        match self {
            IrInstruction::Call { callee, .. } => Some(callee.as_str()),
            _ => None,
        }
    }
}
