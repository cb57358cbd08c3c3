//! Instruction builder for a single function body.
//!
//! Tracks the insertion block, hands out registers, hoists stack slots into
//! the entry block, and folds casts that can be decided at compile time
//! (constant operands and casts that undo the cast producing their operand).

use super::instruction::{BinOp, CastOp, FloatPred, IntPred, IrInstruction, IrReg, Operand, Value};
use super::program::{BasicBlock, IrFunction};
use super::types::IrType;
use crate::{Error, Result};
use std::collections::HashMap;

/// Builder positioned inside one function
#[derive(Debug)]
pub struct FunctionBuilder {
    func: IrFunction,
    /// Index of the block receiving new instructions
    current: usize,
    /// Next free register number
    next_reg: u32,
    /// Insertion index for hoisted entry-block instructions
    entry_insert: usize,
    /// Source of every cast result, for inverse folding
    cast_defs: HashMap<IrReg, (CastOp, Value)>,
}

impl FunctionBuilder {
    /// Start building `func`, positioned at its entry block
    pub fn new(func: IrFunction) -> Self {
        let next_reg = func.params.len() as u32;
        Self {
            func,
            current: 0,
            next_reg,
            entry_insert: 0,
            cast_defs: HashMap::new(),
        }
    }

    /// Finish and return the function
    pub fn finish(self) -> IrFunction {
        self.func
    }

    /// Function under construction
    pub fn function(&self) -> &IrFunction {
        &self.func
    }

    /// Name of the function under construction
    pub fn name(&self) -> &str {
        &self.func.name
    }

    /// Return type of the function under construction
    pub fn ret_type(&self) -> &IrType {
        &self.func.ret
    }

    /// Allocate a fresh register
    fn alloc_reg(&mut self) -> IrReg {
        let reg = IrReg(self.next_reg);
        self.next_reg += 1;
        reg
    }

    /// Append an instruction to the current block
    fn emit(&mut self, instr: IrInstruction) {
        self.func.blocks[self.current].instructions.push(instr);
    }

    // ==================== Blocks ====================

    /// Append a new empty block and return its label
    pub fn append_block(&mut self, label: &str) -> String {
        self.func.blocks.push(BasicBlock::new(label));
        label.to_string()
    }

    /// Move the insertion point to the end of `label`
    pub fn position_at_end(&mut self, label: &str) -> Result<()> {
        self.current = self
            .func
            .blocks
            .iter()
            .position(|b| b.label == label)
            .ok_or_else(|| Error::internal(format!("no block named '{}'", label)))?;
        Ok(())
    }

    /// Label of the current block
    pub fn current_label(&self) -> &str {
        &self.func.blocks[self.current].label
    }

    /// True when the current block already ends in a terminator
    pub fn is_terminated(&self) -> bool {
        self.func.blocks[self.current].is_terminated()
    }

    // ==================== Memory ====================

    /// Stack slot hoisted into the entry block
    pub fn alloca_at_entry(&mut self, ty: IrType) -> Value {
        let dst = self.alloc_reg();
        self.insert_at_entry(IrInstruction::Alloca { dst, ty });
        Value::reg(dst, IrType::Ptr)
    }

    /// Stack slot hoisted into the entry block and initialized there
    pub fn alloca_at_entry_with(&mut self, ty: IrType, init: Value) -> Value {
        let slot = self.alloca_at_entry(ty);
        self.insert_at_entry(IrInstruction::Store {
            value: init,
            ptr: slot.clone(),
        });
        slot
    }

    fn insert_at_entry(&mut self, instr: IrInstruction) {
        self.func.blocks[0]
            .instructions
            .insert(self.entry_insert, instr);
        self.entry_insert += 1;
    }

    /// dst = load ty, ptr
    pub fn load(&mut self, ty: IrType, ptr: Value) -> Value {
        let dst = self.alloc_reg();
        self.emit(IrInstruction::Load {
            dst,
            ty: ty.clone(),
            ptr,
        });
        Value::reg(dst, ty)
    }

    /// store value, ptr
    pub fn store(&mut self, value: Value, ptr: Value) {
        self.emit(IrInstruction::Store { value, ptr });
    }

    /// dst = getelementptr elem, base, index
    pub fn gep(&mut self, elem: IrType, base: Value, index: Value) -> Value {
        let dst = self.alloc_reg();
        self.emit(IrInstruction::Gep {
            dst,
            elem,
            base,
            index,
        });
        Value::reg(dst, IrType::Ptr)
    }

    // ==================== Arithmetic ====================

    /// dst = op lhs, rhs
    pub fn binary(&mut self, op: BinOp, lhs: Value, rhs: Value) -> Value {
        let ty = lhs.ty.clone();
        let dst = self.alloc_reg();
        self.emit(IrInstruction::Binary { dst, op, lhs, rhs });
        Value::reg(dst, ty)
    }

    /// dst = fneg operand
    pub fn fneg(&mut self, operand: Value) -> Value {
        let dst = self.alloc_reg();
        self.emit(IrInstruction::FNeg { dst, operand });
        Value::reg(dst, IrType::Double)
    }

    /// dst = fcmp pred lhs, rhs
    pub fn fcmp(&mut self, pred: FloatPred, lhs: Value, rhs: Value) -> Value {
        let dst = self.alloc_reg();
        self.emit(IrInstruction::FCmp {
            dst,
            pred,
            lhs,
            rhs,
        });
        Value::reg(dst, IrType::BOOL)
    }

    /// dst = icmp pred lhs, rhs
    pub fn icmp(&mut self, pred: IntPred, lhs: Value, rhs: Value) -> Value {
        let dst = self.alloc_reg();
        self.emit(IrInstruction::ICmp {
            dst,
            pred,
            lhs,
            rhs,
        });
        Value::reg(dst, IrType::BOOL)
    }

    /// dst = op value to `to`, folded when the result is known
    pub fn cast(&mut self, op: CastOp, value: Value, to: IrType) -> Value {
        if value.ty == to && op == CastOp::BitCast {
            return value;
        }
        if let Some(folded) = fold_constant_cast(op, &value, &to) {
            return folded;
        }
        if let Some(reg) = value.as_reg() {
            if let Some((prev_op, source)) = self.cast_defs.get(&reg) {
                if prev_op.inverse() == Some(op) && source.ty == to {
                    return source.clone();
                }
            }
        }
        let dst = self.alloc_reg();
        self.cast_defs.insert(dst, (op, value.clone()));
        self.emit(IrInstruction::Cast {
            dst,
            op,
            value,
            to: to.clone(),
        });
        Value::reg(dst, to)
    }

    // ==================== Calls ====================

    /// Direct call to a function returning `ret` (must not be void)
    pub fn call(&mut self, ret: IrType, callee: &str, args: Vec<Value>) -> Value {
        let dst = self.alloc_reg();
        self.emit(IrInstruction::Call {
            dst: Some(dst),
            ret: ret.clone(),
            callee: callee.to_string(),
            args,
        });
        Value::reg(dst, ret)
    }

    /// Direct call to a void function
    pub fn call_void(&mut self, callee: &str, args: Vec<Value>) {
        self.emit(IrInstruction::Call {
            dst: None,
            ret: IrType::Void,
            callee: callee.to_string(),
            args,
        });
    }

    // ==================== Terminators ====================

    /// br label %target
    pub fn br(&mut self, target: &str) {
        self.emit(IrInstruction::Br {
            target: target.to_string(),
        });
    }

    /// br i1 cond, label %then, label %else
    pub fn cond_br(&mut self, cond: Value, then_label: &str, else_label: &str) {
        self.emit(IrInstruction::CondBr {
            cond,
            then_label: then_label.to_string(),
            else_label: else_label.to_string(),
        });
    }

    /// ret [value]
    pub fn ret(&mut self, value: Option<Value>) {
        self.emit(IrInstruction::Ret { value });
    }
}

fn fold_constant_cast(op: CastOp, value: &Value, to: &IrType) -> Option<Value> {
    match (op, &value.op) {
        (CastOp::SiToFp, Operand::Int(v)) => Some(Value::float(*v as f64)),
        (CastOp::UiToFp, Operand::Int(v)) if value.ty.is_bool() => {
            Some(Value::float(if *v != 0 { 1.0 } else { 0.0 }))
        }
        (CastOp::UiToFp, Operand::Int(v)) => Some(Value::float(*v as u64 as f64)),
        (CastOp::BitCast, Operand::Float(v)) if *to == IrType::I64 => {
            Some(Value::int(IrType::I64, v.to_bits() as i64))
        }
        (CastOp::BitCast, Operand::Int(v)) if to.is_double() => {
            Some(Value::float(f64::from_bits(*v as u64)))
        }
        (CastOp::PtrToInt, Operand::Null) => Some(Value::int(to.clone(), 0)),
        (CastOp::IntToPtr, Operand::Int(0)) => Some(Value::null()),
        (CastOp::ZExt, Operand::Int(v)) if value.ty.is_bool() => {
            Some(Value::int(to.clone(), i64::from(*v != 0)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> FunctionBuilder {
        FunctionBuilder::new(IrFunction::new("f", IrType::I64, vec![IrType::I64]))
    }

    #[test]
    fn test_registers_start_after_params() {
        let mut b = builder();
        let slot = b.alloca_at_entry(IrType::Double);
        assert_eq!(slot.as_reg(), Some(IrReg(1)));
    }

    #[test]
    fn test_entry_allocas_stay_first() {
        let mut b = builder();
        let a = b.alloca_at_entry(IrType::Double);
        b.store(Value::float(1.0), a);
        b.alloca_at_entry(IrType::Ptr);
        let entry = &b.function().blocks[0].instructions;
        assert!(matches!(entry[0], IrInstruction::Alloca { .. }));
        assert!(matches!(entry[1], IrInstruction::Alloca { .. }));
        assert!(matches!(entry[2], IrInstruction::Store { .. }));
    }

    #[test]
    fn test_inverse_casts_fold() {
        let mut b = builder();
        let param = b.function().param_values()[0].clone();
        let as_double = b.cast(CastOp::BitCast, param.clone(), IrType::Double);
        let back = b.cast(CastOp::BitCast, as_double, IrType::I64);
        assert_eq!(back, param);

        let as_ptr = b.cast(CastOp::IntToPtr, param.clone(), IrType::Ptr);
        let back = b.cast(CastOp::PtrToInt, as_ptr, IrType::I64);
        assert_eq!(back, param);
    }

    #[test]
    fn test_constant_casts_fold() {
        let mut b = builder();
        let bits = b.cast(CastOp::BitCast, Value::float(2.5), IrType::I64);
        assert_eq!(bits, Value::int(IrType::I64, 2.5f64.to_bits() as i64));
        let back = b.cast(CastOp::BitCast, bits, IrType::Double);
        assert_eq!(back, Value::float(2.5));
        assert_eq!(
            b.cast(CastOp::UiToFp, Value::bool(true), IrType::Double),
            Value::float(1.0)
        );
        assert!(b.function().blocks[0].instructions.is_empty());
    }
}
