//! # EigenScript Compiler - AST to typed SSA IR
//!
//! This module lowers an analyzed EigenScript unit to LLVM-compatible IR
//! and, through external tools, to object files and linked executables.
//!
//! ## Architecture
//!
//! ```text
//! SourceUnit → IrGenerator → Verifier → LLVM text → llc (.o) → cc/clang (exe/wasm)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use eigenc::compiler::{Compiler, CompileOptions};
//! use eigenc::SourceUnit;
//!
//! let unit = SourceUnit::from_path("program.json")?;
//! let compiler = Compiler::new(CompileOptions::default());
//! let result = compiler.compile(&unit)?;
//! std::fs::write("program.ll", result.ir_text)?;
//! ```

pub mod debug;
pub mod ir;
pub mod runtime;
pub mod target;
pub mod toolchain;
pub mod verifier;

pub use debug::{dump_ir, format_ir_instr, ir_stats};
pub use ir::{IrGenerator, IrInstruction, IrModule, IrReg};
pub use target::TargetInfo;
pub use toolchain::{default_output, Toolchain};
pub use verifier::{Verifier, VerifyError, VerifyResult};

use crate::ast::SourceUnit;
use crate::{Error, Result};
use std::collections::BTreeSet;

/// Kind of compilation unit
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CompileMode {
    /// Standalone program with a `main` entry point
    #[default]
    Program,
    /// Library module exposing `{module}_init` and `{module}_`-prefixed symbols
    Library {
        /// Module name (symbol prefix)
        module: String,
    },
}

/// Final artifact requested from the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EmitKind {
    /// Textual IR only
    #[default]
    Ir,
    /// Object file
    Obj,
    /// Linked executable (or wasm module)
    Exe,
}

/// Compilation options
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Program or library unit
    pub mode: CompileMode,
    /// Target triple (`None` for the host)
    pub target: Option<String>,
    /// Backend optimization level (0-3)
    pub opt_level: u8,
    /// Names requiring full state tracking
    pub observed: BTreeSet<String>,
    /// Imported modules, in initializer order
    pub imported_modules: Vec<String>,
    /// Names that may be read from other modules in the entry body
    pub imported_names: BTreeSet<String>,
    /// Extra symbol prefixes a library exports
    pub export_prefixes: Vec<String>,
    /// Verify the generated module
    pub verify: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            mode: CompileMode::Program,
            target: None,
            opt_level: 2,
            observed: BTreeSet::new(),
            imported_modules: Vec::new(),
            imported_names: BTreeSet::new(),
            export_prefixes: Vec::new(),
            verify: true,
        }
    }
}

impl CompileOptions {
    /// Options for a library unit named `module`
    pub fn library(module: impl Into<String>) -> Self {
        Self {
            mode: CompileMode::Library {
                module: module.into(),
            },
            ..Self::default()
        }
    }

    /// Effective options for `unit`: analysis results and imports recorded
    /// in the unit extend these options, and a unit-level module name turns
    /// a program compilation into a library one
    pub fn merged_with(&self, unit: &SourceUnit) -> Self {
        let mut merged = self.clone();
        merged.opt_level = merged.opt_level.min(3);
        merged.observed.extend(unit.observed.iter().cloned());
        for module in unit.imported_modules() {
            if !merged.imported_modules.contains(&module) {
                merged.imported_modules.push(module);
            }
        }
        if let (CompileMode::Program, Some(module)) = (&merged.mode, &unit.module) {
            merged.mode = CompileMode::Library {
                module: module.clone(),
            };
        }
        merged
    }
}

/// Compilation result with metadata
#[derive(Debug)]
pub struct CompileResult {
    /// Generated module
    pub module: IrModule,
    /// Module rendered as LLVM assembly
    pub ir_text: String,
    /// Verification result (`None` when verification was skipped)
    pub verification: Option<VerifyResult>,
    /// Number of IR instructions
    pub ir_instruction_count: usize,
    /// Top-level allocations released before the program exits
    pub cleanup_count: usize,
    /// Warnings generated during compilation
    pub warnings: Vec<String>,
}

/// EigenScript to IR compiler
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Create a new compiler with options
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Options this compiler was created with
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile an analyzed unit to IR
    pub fn compile(&self, unit: &SourceUnit) -> Result<CompileResult> {
        // Phase 1: Resolve target and unit configuration
        let options = self.options.merged_with(unit);
        let target = TargetInfo::resolve(options.target.as_deref());
        tracing::info!(
            triple = %target.triple,
            mode = ?options.mode,
            observed = options.observed.len(),
            imports = options.imported_modules.len(),
            "compiling unit"
        );

        // Phase 2: Generate IR
        let generated = IrGenerator::new(&options, target).generate(&unit.statements)?;
        let module = generated.module;
        let mut warnings = generated.warnings;

        // Phase 3: Verify
        let verification = if options.verify {
            let result = Verifier::new().verify(&module);
            if !result.valid {
                let errors: Vec<String> = result.errors.iter().map(|e| e.to_string()).collect();
                tracing::error!(count = errors.len(), "generated IR failed verification");
                return Err(Error::VerificationFailed { errors });
            }
            warnings.extend(result.warnings.iter().cloned());
            Some(result)
        } else {
            None
        };

        // Phase 4: Print
        let ir_text = module.to_string();
        tracing::debug!(
            bytes = ir_text.len(),
            instructions = module.instruction_count(),
            "rendered IR"
        );

        Ok(CompileResult {
            ir_instruction_count: module.instruction_count(),
            cleanup_count: generated.cleanup.len(),
            module,
            ir_text,
            verification,
            warnings,
        })
    }

    /// Compile a unit from its JSON form
    pub fn compile_json(&self, text: &str) -> Result<CompileResult> {
        let unit = SourceUnit::from_json(text)?;
        self.compile(&unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ImportSpec, Node};

    #[test]
    fn test_compiler_creation() {
        let compiler = Compiler::new(CompileOptions::default());
        assert_eq!(compiler.options().opt_level, 2);
        assert!(compiler.options().verify);
    }

    #[test]
    fn test_unit_settings_are_merged() {
        let mut unit = SourceUnit::new(vec![Node::Import {
            module: "b".into(),
        }]);
        unit.observed = vec!["x".into()];
        unit.imports = vec![ImportSpec {
            module: "a".into(),
            path: None,
        }];
        unit.module = Some("lib".into());

        let mut options = CompileOptions::default();
        options.opt_level = 9;
        let merged = options.merged_with(&unit);
        assert_eq!(merged.opt_level, 3);
        assert!(merged.observed.contains("x"));
        assert_eq!(merged.imported_modules, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            merged.mode,
            CompileMode::Library {
                module: "lib".into()
            }
        );
    }

    #[test]
    fn test_cli_module_wins_over_unit() {
        let mut unit = SourceUnit::new(vec![]);
        unit.module = Some("from_unit".into());
        let merged = CompileOptions::library("from_cli").merged_with(&unit);
        assert_eq!(
            merged.mode,
            CompileMode::Library {
                module: "from_cli".into()
            }
        );
    }

    #[test]
    fn test_compile_empty_program() {
        let result = Compiler::new(CompileOptions::default())
            .compile(&SourceUnit::new(vec![]))
            .unwrap();
        assert!(result.ir_text.contains("define i32 @main()"));
        assert!(result.verification.unwrap().valid);
    }
}
