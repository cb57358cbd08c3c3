//! Textual IR printer.
//!
//! Output is LLVM assembly (opaque-pointer dialect) so it can be handed
//! straight to `llc`. Printing is a pure function of the module, which keeps
//! reruns on identical input byte-identical.

use super::instruction::IrInstruction;
use super::program::{GlobalInit, GlobalVar, IrFunction, IrModule};
use super::types::IrType;
use std::fmt::{self, Write};

impl fmt::Display for IrInstruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IrInstruction::Alloca { dst, ty } => write!(f, "{} = alloca {}", dst, ty),
            IrInstruction::Load { dst, ty, ptr } => {
                write!(f, "{} = load {}, ptr {}", dst, ty, ptr)
            }
            IrInstruction::Store { value, ptr } => {
                write!(f, "store {} {}, ptr {}", value.ty, value, ptr)
            }
            IrInstruction::Gep {
                dst,
                elem,
                base,
                index,
            } => write!(
                f,
                "{} = getelementptr {}, ptr {}, {} {}",
                dst, elem, base, index.ty, index
            ),
            IrInstruction::Binary { dst, op, lhs, rhs } => write!(
                f,
                "{} = {} {} {}, {}",
                dst,
                op.mnemonic(),
                lhs.ty,
                lhs,
                rhs
            ),
            IrInstruction::FNeg { dst, operand } => {
                write!(f, "{} = fneg double {}", dst, operand)
            }
            IrInstruction::FCmp {
                dst,
                pred,
                lhs,
                rhs,
            } => write!(
                f,
                "{} = fcmp {} double {}, {}",
                dst,
                pred.keyword(),
                lhs,
                rhs
            ),
            IrInstruction::ICmp {
                dst,
                pred,
                lhs,
                rhs,
            } => write!(
                f,
                "{} = icmp {} {} {}, {}",
                dst,
                pred.keyword(),
                lhs.ty,
                lhs,
                rhs
            ),
            IrInstruction::Cast { dst, op, value, to } => write!(
                f,
                "{} = {} {} {} to {}",
                dst,
                op.mnemonic(),
                value.ty,
                value,
                to
            ),
            IrInstruction::Call {
                dst,
                ret,
                callee,
                args,
            } => {
                if let Some(dst) = dst {
                    write!(f, "{} = ", dst)?;
                }
                write!(f, "call {} @{}(", ret, callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", arg.ty, arg)?;
                }
                write!(f, ")")
            }
            IrInstruction::Br { target } => write!(f, "br label %{}", target),
            IrInstruction::CondBr {
                cond,
                then_label,
                else_label,
            } => write!(
                f,
                "br i1 {}, label %{}, label %{}",
                cond, then_label, else_label
            ),
            IrInstruction::Ret { value: Some(v) } => write!(f, "ret {} {}", v.ty, v),
            IrInstruction::Ret { value: None } => write!(f, "ret void"),
            IrInstruction::Unreachable => write!(f, "unreachable"),
        }
    }
}

fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if b == b'"' || b == b'\\' || !(0x20..0x7f).contains(&b) {
            let _ = write!(out, "\\{:02X}", b);
        } else {
            out.push(b as char);
        }
    }
    out
}

fn format_global(g: &GlobalVar) -> String {
    let kind = if g.constant { "constant" } else { "global" };
    match &g.init {
        None => format!("@{} = external global {}", g.name, g.ty),
        Some(init) => {
            let init = match init {
                GlobalInit::Float(v) => format!("0x{:016X}", v.to_bits()),
                GlobalInit::Int(v) => v.to_string(),
                GlobalInit::Null => "null".to_string(),
                GlobalInit::Zero => "zeroinitializer".to_string(),
                GlobalInit::Bytes(bytes) => format!("c\"{}\"", escape_bytes(bytes)),
            };
            let unnamed = if matches!(g.init, Some(GlobalInit::Bytes(_))) {
                "unnamed_addr "
            } else {
                ""
            };
            format!(
                "@{} = {}{}{} {} {}",
                g.name,
                g.linkage.keyword(),
                unnamed,
                kind,
                g.ty,
                init
            )
        }
    }
}

fn format_function(func: &IrFunction, out: &mut String) -> fmt::Result {
    let params: Vec<String> = func
        .params
        .iter()
        .map(|(reg, ty)| format!("{} {}", ty, reg))
        .collect();
    writeln!(
        out,
        "define {}{} @{}({}) nounwind {{",
        func.linkage.keyword(),
        func.ret,
        func.name,
        params.join(", ")
    )?;
    for (i, block) in func.blocks.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{}:", block.label)?;
        for instr in &block.instructions {
            writeln!(out, "  {}", instr)?;
        }
    }
    writeln!(out, "}}")
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut out = String::new();
        writeln!(out, "; ModuleID = '{}'", self.name)?;
        writeln!(out, "source_filename = \"{}\"", self.name)?;
        writeln!(out, "target triple = \"{}\"", self.triple)?;

        if !self.struct_types.is_empty() {
            writeln!(out)?;
        }
        for st in &self.struct_types {
            let fields: Vec<String> = st.fields.iter().map(IrType::to_string).collect();
            writeln!(out, "%{} = type {{ {} }}", st.name, fields.join(", "))?;
        }

        if !self.globals.is_empty() {
            writeln!(out)?;
        }
        for g in &self.globals {
            writeln!(out, "{}", format_global(g))?;
        }

        if !self.declarations.is_empty() {
            writeln!(out)?;
        }
        for d in &self.declarations {
            let params: Vec<String> = d.params.iter().map(IrType::to_string).collect();
            writeln!(out, "declare {} @{}({})", d.ret, d.name, params.join(", "))?;
        }

        for func in &self.functions {
            writeln!(out)?;
            format_function(func, &mut out)?;
        }
        f.write_str(&out)
    }
}
