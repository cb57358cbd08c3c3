//! # Typed SSA IR for EigenScript Compilation
//!
//! The generator lowers the AST into this IR, the verifier checks it, and the
//! printer renders it as LLVM assembly for the external backend.
//!
//! ## Module Structure
//!
//! ```text
//! ir/
//! ├── mod.rs          # This file - module definition and re-exports
//! ├── types.rs        # IrType, StructType, runtime record layouts
//! ├── instruction.rs  # IrReg, Operand, Value, IrInstruction
//! ├── program.rs      # BasicBlock, IrFunction, GlobalVar, IrModule
//! ├── builder.rs      # FunctionBuilder (insertion point, cast folding)
//! ├── display.rs      # LLVM assembly printer
//! └── generator/      # AST -> IR lowering
//! ```
//!
//! ## Key Types
//!
//! - [`IrReg`] - SSA register, numbered per function
//! - [`Value`] - Typed operand (register, constant, or global address)
//! - [`IrModule`] - One compilation unit: globals, declarations, functions
//! - [`IrGenerator`] - AST-to-IR emitter

pub mod builder;
pub mod display;
pub mod generator;
pub mod instruction;
pub mod program;
pub mod types;

pub use builder::FunctionBuilder;
pub use generator::{IrGenerator, Typed, ValueKind};
pub use instruction::{BinOp, CastOp, FloatPred, IntPred, IrInstruction, IrReg, Operand, Value};
pub use program::{BasicBlock, FunctionDecl, GlobalInit, GlobalVar, IrFunction, IrModule, Linkage};
pub use types::{IrType, StructType};
