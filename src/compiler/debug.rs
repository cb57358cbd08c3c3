//! Debug utilities for EigenScript→IR compilation
//!
//! Tools for inspecting generated modules: a compact listing and
//! per-module statistics.

use super::ir::{IrInstruction, IrModule, Operand, Value};
use super::runtime;
use std::collections::BTreeMap;

/// Print a module in a compact, numbered listing
pub fn dump_ir(module: &IrModule) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                    IR DUMP");
    println!("═══════════════════════════════════════════════════════════");
    println!("Module: {} ({})", module.name, module.triple);
    println!("Globals: {}", module.globals.len());
    println!("Declarations: {}", module.declarations.len());
    for func in &module.functions {
        let sig = func.signature();
        println!("───────────────────────────────────────────────────────────");
        println!(
            "fn {}({}) -> {}",
            func.name,
            sig.params
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            func.ret
        );
        let mut index = 0;
        for block in &func.blocks {
            println!("{}:", block.label);
            for instr in &block.instructions {
                println!("{:04}:   {}", index, format_ir_instr(instr));
                index += 1;
            }
        }
    }
    println!("═══════════════════════════════════════════════════════════\n");
}

fn operand(v: &Value) -> String {
    match &v.op {
        Operand::Reg(r) => format!("r{}", r.0),
        Operand::Int(i) => i.to_string(),
        Operand::Float(x) => format!("{:?}", x),
        Operand::Null => "null".to_string(),
        Operand::Global(name) => format!("@{}", name),
    }
}

fn operand_list(args: &[Value]) -> String {
    args.iter().map(operand).collect::<Vec<_>>().join(", ")
}

/// Format a single IR instruction
pub fn format_ir_instr(instr: &IrInstruction) -> String {
    match instr {
        IrInstruction::Alloca { dst, ty } => format!("r{} = alloca {}", dst.0, ty),
        IrInstruction::Load { dst, ty, ptr } => format!("r{} = ({})[{}]", dst.0, ty, operand(ptr)),
        IrInstruction::Store { value, ptr } => {
            format!("[{}] = {}:{}", operand(ptr), operand(value), value.ty)
        }
        IrInstruction::Gep {
            dst,
            elem,
            base,
            index,
        } => format!("r{} = &{}[{} x {}]", dst.0, operand(base), operand(index), elem),

        IrInstruction::Binary { dst, op, lhs, rhs } => format!(
            "r{} = {} {}, {}",
            dst.0,
            op.mnemonic(),
            operand(lhs),
            operand(rhs)
        ),
        IrInstruction::FNeg { dst, operand: v } => format!("r{} = -{}", dst.0, operand(v)),
        IrInstruction::FCmp { dst, pred, lhs, rhs } => format!(
            "r{} = {} {} {}",
            dst.0,
            operand(lhs),
            pred.keyword(),
            operand(rhs)
        ),
        IrInstruction::ICmp { dst, pred, lhs, rhs } => format!(
            "r{} = {} {} {}",
            dst.0,
            operand(lhs),
            pred.keyword(),
            operand(rhs)
        ),
        IrInstruction::Cast { dst, op, value, to } => {
            format!("r{} = {} {} -> {}", dst.0, op.mnemonic(), operand(value), to)
        }

        IrInstruction::Call {
            dst, callee, args, ..
        } => match dst {
            Some(d) => format!("r{} = call {}({})", d.0, callee, operand_list(args)),
            None => format!("call {}({})", callee, operand_list(args)),
        },

        IrInstruction::Br { target } => format!("jmp {}", target),
        IrInstruction::CondBr {
            cond,
            then_label,
            else_label,
        } => format!("jif {} -> {} | {}", operand(cond), then_label, else_label),
        IrInstruction::Ret { value } => match value {
            Some(v) => format!("ret {}", operand(v)),
            None => "ret".to_string(),
        },
        IrInstruction::Unreachable => "unreachable".to_string(),
    }
}

/// Call and allocation profile of a module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IrStats {
    /// Calls per callee, across all functions
    pub calls: BTreeMap<String, usize>,
    /// Runtime calls that allocate (boxed values, lists, strings, structs)
    pub allocations: usize,
    /// Runtime calls that release an allocation
    pub releases: usize,
    /// Stack slots
    pub allocas: usize,
}

impl IrStats {
    /// Calls to `callee`
    pub fn calls_to(&self, callee: &str) -> usize {
        self.calls.get(callee).copied().unwrap_or(0)
    }
}

const ALLOCATING: &[&str] = &[
    runtime::EIGEN_CREATE,
    runtime::LIST_CREATE,
    runtime::STRING_CREATE,
    runtime::STRING_CONCAT,
    runtime::NUMBER_TO_STRING,
    runtime::MALLOC,
];

const RELEASING: &[&str] = &[
    runtime::EIGEN_DESTROY,
    runtime::LIST_DESTROY,
    runtime::STRING_DESTROY,
];

/// Collect statistics for a module
pub fn ir_stats(module: &IrModule) -> IrStats {
    let mut stats = IrStats::default();
    for instr in module.functions.iter().flat_map(|f| f.instructions()) {
        match instr {
            IrInstruction::Call { callee, .. } => {
                *stats.calls.entry(callee.clone()).or_insert(0) += 1;
                if ALLOCATING.contains(&callee.as_str()) {
                    stats.allocations += 1;
                }
                if RELEASING.contains(&callee.as_str()) {
                    stats.releases += 1;
                }
            }
            IrInstruction::Alloca { .. } => stats.allocas += 1,
            _ => {}
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ir::{FunctionBuilder, IrFunction, IrReg, IrType};

    #[test]
    fn test_format_call() {
        let instr = IrInstruction::Call {
            dst: Some(IrReg(2)),
            ret: IrType::Ptr,
            callee: runtime::EIGEN_CREATE.into(),
            args: vec![Value::float(1.5)],
        };
        assert_eq!(format_ir_instr(&instr), "r2 = call eigen_create(1.5)");
    }

    #[test]
    fn test_stats_count_allocations() {
        let mut b = FunctionBuilder::new(IrFunction::new("main", IrType::I32, vec![]));
        let record = b.call(IrType::Ptr, runtime::EIGEN_CREATE, vec![Value::float(0.0)]);
        b.call_void(runtime::EIGEN_DESTROY, vec![record]);
        b.alloca_at_entry(IrType::Double);
        b.ret(Some(Value::int(IrType::I32, 0)));
        let mut module = IrModule::new("main", "x86_64-unknown-linux-gnu");
        module.functions.push(b.finish());

        let stats = ir_stats(&module);
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.releases, 1);
        assert_eq!(stats.allocas, 1);
        assert_eq!(stats.calls_to(runtime::EIGEN_CREATE), 1);
        assert_eq!(stats.calls_to("sqrt"), 0);
    }
}
