//! # IR Module Verifier
//!
//! Validates a generated module before it is printed and handed to the
//! backend. A failure here is a generator defect, never a user error.

use super::ir::{
    CastOp, FunctionDecl, IrFunction, IrInstruction, IrModule, IrReg, IrType, Operand, Value,
};
use std::collections::{HashMap, HashSet};

/// Verification result with warnings
#[derive(Debug, Clone)]
pub struct VerifyResult {
    /// Module is well-formed
    pub valid: bool,
    /// Errors that block emission
    pub errors: Vec<VerifyError>,
    /// Warnings (non-fatal)
    pub warnings: Vec<String>,
    /// Statistics
    pub stats: ModuleStats,
}

/// Module statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleStats {
    /// Defined functions
    pub function_count: usize,
    /// Basic blocks across all functions
    pub block_count: usize,
    /// Instructions across all functions
    pub instruction_count: usize,
    /// Call instructions
    pub call_count: usize,
    /// Globals, including string constants
    pub global_count: usize,
    /// Globals and functions resolved at link time
    pub external_symbol_count: usize,
}

/// Verification error types
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyError {
    /// Block does not end in a terminator.
    MissingTerminator {
        /// Enclosing function
        function: String,
        /// Offending block
        block: String,
    },

    /// Terminator followed by more instructions.
    MisplacedTerminator {
        /// Enclosing function
        function: String,
        /// Offending block
        block: String,
        /// Position of the early terminator
        index: usize,
    },

    /// Two blocks share a label.
    DuplicateLabel {
        /// Enclosing function
        function: String,
        /// Repeated label
        label: String,
    },

    /// Branch to a label that does not exist.
    UnknownLabel {
        /// Enclosing function
        function: String,
        /// Missing label
        label: String,
    },

    /// Register assigned more than once.
    RegisterRedefined {
        /// Enclosing function
        function: String,
        /// Register
        reg: IrReg,
    },

    /// Register read before (in layout order) or without a definition.
    UseBeforeDef {
        /// Enclosing function
        function: String,
        /// Block containing the use
        block: String,
        /// Register
        reg: IrReg,
    },

    /// Operand type disagrees with the instruction.
    TypeMismatch {
        /// Enclosing function
        function: String,
        /// Rendered instruction
        instruction: String,
        /// What was expected
        expected: String,
    },

    /// Call to a symbol that is neither defined nor declared.
    UnknownCallee {
        /// Enclosing function
        function: String,
        /// Callee symbol
        callee: String,
    },

    /// Call with the wrong number of arguments.
    ArityMismatch {
        /// Enclosing function
        function: String,
        /// Callee symbol
        callee: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// Reference to a global that does not exist.
    UnknownGlobal {
        /// Enclosing function
        function: String,
        /// Global name
        name: String,
    },

    /// Symbol defined twice at module level.
    DuplicateSymbol {
        /// Symbol name
        name: String,
    },
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyError::MissingTerminator { function, block } => {
                write!(f, "@{}: block '{}' has no terminator", function, block)
            }
            VerifyError::MisplacedTerminator {
                function,
                block,
                index,
            } => write!(
                f,
                "@{}: block '{}' has a terminator at position {} followed by more instructions",
                function, block, index
            ),
            VerifyError::DuplicateLabel { function, label } => {
                write!(f, "@{}: duplicate block label '{}'", function, label)
            }
            VerifyError::UnknownLabel { function, label } => {
                write!(f, "@{}: branch to unknown label '{}'", function, label)
            }
            VerifyError::RegisterRedefined { function, reg } => {
                write!(f, "@{}: register {} defined more than once", function, reg)
            }
            VerifyError::UseBeforeDef {
                function,
                block,
                reg,
            } => write!(
                f,
                "@{}: register {} used in '{}' before its definition",
                function, reg, block
            ),
            VerifyError::TypeMismatch {
                function,
                instruction,
                expected,
            } => write!(
                f,
                "@{}: type mismatch in `{}` (expected {})",
                function, instruction, expected
            ),
            VerifyError::UnknownCallee { function, callee } => {
                write!(f, "@{}: call to undeclared function @{}", function, callee)
            }
            VerifyError::ArityMismatch {
                function,
                callee,
                expected,
                got,
            } => write!(
                f,
                "@{}: call to @{} passes {} argument(s), declared with {}",
                function, callee, got, expected
            ),
            VerifyError::UnknownGlobal { function, name } => {
                write!(f, "@{}: reference to unknown global @{}", function, name)
            }
            VerifyError::DuplicateSymbol { name } => {
                write!(f, "symbol @{} defined more than once", name)
            }
        }
    }
}

/// IR module verifier
pub struct Verifier {
    /// Treat warnings as errors
    strict: bool,
}

impl Verifier {
    /// Creates a new verifier (warnings don't fail verification)
    pub fn new() -> Self {
        Self { strict: false }
    }

    /// Enable strict mode
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Verify a module
    pub fn verify(&self, module: &IrModule) -> VerifyResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let mut stats = ModuleStats {
            function_count: module.functions.len(),
            global_count: module.globals.len(),
            external_symbol_count: module
                .globals
                .iter()
                .filter(|g| g.is_external_decl())
                .count(),
            ..ModuleStats::default()
        };

        self.check_symbols(module, &mut errors);

        let signatures: HashMap<&str, FunctionDecl> = module
            .declarations
            .iter()
            .map(|d| (d.name.as_str(), d.clone()))
            .chain(module.functions.iter().map(|f| (f.name.as_str(), f.signature())))
            .collect();
        let globals: HashSet<&str> = module.globals.iter().map(|g| g.name.as_str()).collect();

        for func in &module.functions {
            stats.block_count += func.blocks.len();
            stats.instruction_count += func.instructions().count();
            stats.call_count += func.instructions().filter(|i| i.callee().is_some()).count();

            FunctionChecker {
                func,
                signatures: &signatures,
                globals: &globals,
                errors: &mut errors,
                warnings: &mut warnings,
            }
            .run();
        }

        let called: HashSet<&str> = module
            .functions
            .iter()
            .flat_map(|f| f.call_sequence())
            .collect();
        stats.external_symbol_count += module
            .declarations
            .iter()
            .filter(|d| called.contains(d.name.as_str()))
            .count();

        let valid = errors.is_empty() && (!self.strict || warnings.is_empty());

        VerifyResult {
            valid,
            errors,
            warnings,
            stats,
        }
    }

    fn check_symbols(&self, module: &IrModule, errors: &mut Vec<VerifyError>) {
        let mut seen = HashSet::new();
        let names = module
            .globals
            .iter()
            .map(|g| g.name.as_str())
            .chain(module.functions.iter().map(|f| f.name.as_str()));
        for name in names {
            if !seen.insert(name) {
                errors.push(VerifyError::DuplicateSymbol {
                    name: name.to_string(),
                });
            }
        }
        let mut declared = HashSet::new();
        for decl in &module.declarations {
            if !declared.insert(decl.name.as_str()) || module.global(&decl.name).is_some() {
                errors.push(VerifyError::DuplicateSymbol {
                    name: decl.name.clone(),
                });
            }
        }
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-function checks
struct FunctionChecker<'a> {
    func: &'a IrFunction,
    signatures: &'a HashMap<&'a str, FunctionDecl>,
    globals: &'a HashSet<&'a str>,
    errors: &'a mut Vec<VerifyError>,
    warnings: &'a mut Vec<String>,
}

impl FunctionChecker<'_> {
    fn run(mut self) {
        let func = self.func;
        self.check_structure();
        self.check_registers();
        for block in &func.blocks {
            for instr in &block.instructions {
                self.check_types(instr);
                self.check_references(instr);
            }
        }
    }

    /// Terminators, labels, and reachability
    fn check_structure(&mut self) {
        let func = self.func;
        let mut labels = HashSet::new();
        for block in &func.blocks {
            if !labels.insert(block.label.as_str()) {
                self.errors.push(VerifyError::DuplicateLabel {
                    function: self.func.name.clone(),
                    label: block.label.clone(),
                });
            }
        }

        let mut targeted = HashSet::new();
        for block in &func.blocks {
            if !block.is_terminated() {
                self.errors.push(VerifyError::MissingTerminator {
                    function: self.func.name.clone(),
                    block: block.label.clone(),
                });
            }
            let last = block.instructions.len().saturating_sub(1);
            for (i, instr) in block.instructions.iter().enumerate() {
                if instr.is_terminator() && i != last {
                    self.errors.push(VerifyError::MisplacedTerminator {
                        function: self.func.name.clone(),
                        block: block.label.clone(),
                        index: i,
                    });
                }
                for label in instr.successors() {
                    targeted.insert(label);
                    if !labels.contains(label) {
                        self.errors.push(VerifyError::UnknownLabel {
                            function: self.func.name.clone(),
                            label: label.to_string(),
                        });
                    }
                }
            }
        }

        for block in func.blocks.iter().skip(1) {
            if !targeted.contains(block.label.as_str()) {
                self.warnings.push(format!(
                    "@{}: block '{}' has no predecessors",
                    func.name, block.label
                ));
            }
        }
    }

    /// Single definition, defined before use in layout order
    fn check_registers(&mut self) {
        let func = self.func;
        let mut defined: HashSet<IrReg> = func.params.iter().map(|(r, _)| *r).collect();
        for block in &func.blocks {
            for instr in &block.instructions {
                for operand in instr.operands() {
                    if let Operand::Reg(reg) = operand.op {
                        if !defined.contains(&reg) {
                            self.errors.push(VerifyError::UseBeforeDef {
                                function: self.func.name.clone(),
                                block: block.label.clone(),
                                reg,
                            });
                        }
                    }
                }
                if let Some(dst) = instr.dst() {
                    if !defined.insert(dst) {
                        self.errors.push(VerifyError::RegisterRedefined {
                            function: self.func.name.clone(),
                            reg: dst,
                        });
                    }
                }
            }
        }
    }

    fn mismatch(&mut self, instr: &IrInstruction, expected: impl Into<String>) {
        self.errors.push(VerifyError::TypeMismatch {
            function: self.func.name.clone(),
            instruction: instr.to_string(),
            expected: expected.into(),
        });
    }

    fn check_types(&mut self, instr: &IrInstruction) {
        let func = self.func;
        let signatures = self.signatures;
        match instr {
            IrInstruction::Load { ptr, .. } | IrInstruction::Store { ptr, .. } => {
                if !ptr.ty.is_ptr() {
                    self.mismatch(instr, "pointer address");
                }
            }
            IrInstruction::Gep { base, index, .. } => {
                if !base.ty.is_ptr() || !index.ty.is_int() {
                    self.mismatch(instr, "pointer base and integer index");
                }
            }
            IrInstruction::Binary { op, lhs, rhs, .. } => {
                let ok = lhs.ty == rhs.ty
                    && if op.is_float() {
                        lhs.ty.is_double()
                    } else {
                        lhs.ty.is_int()
                    };
                if !ok {
                    let want = if op.is_float() { "double" } else { "integer" };
                    self.mismatch(instr, format!("matching {} operands", want));
                }
            }
            IrInstruction::FNeg { operand, .. } => {
                if !operand.ty.is_double() {
                    self.mismatch(instr, "double operand");
                }
            }
            IrInstruction::FCmp { lhs, rhs, .. } => {
                if !lhs.ty.is_double() || !rhs.ty.is_double() {
                    self.mismatch(instr, "double operands");
                }
            }
            IrInstruction::ICmp { lhs, rhs, .. } => {
                if lhs.ty != rhs.ty || !(lhs.ty.is_int() || lhs.ty.is_ptr()) {
                    self.mismatch(instr, "matching integer or pointer operands");
                }
            }
            IrInstruction::Cast { op, value, to, .. } => {
                if !cast_is_valid(*op, &value.ty, to) {
                    self.mismatch(instr, format!("valid {} operand", op.mnemonic()));
                }
            }
            IrInstruction::CondBr { cond, .. } => {
                if !cond.ty.is_bool() {
                    self.mismatch(instr, "i1 condition");
                }
            }
            IrInstruction::Ret { value } => {
                let ok = match value {
                    Some(v) => v.ty == func.ret,
                    None => func.ret == IrType::Void,
                };
                if !ok {
                    self.mismatch(instr, format!("return of {}", func.ret));
                }
            }
            IrInstruction::Call {
                callee, args, ret, ..
            } => match signatures.get(callee.as_str()) {
                None => self.errors.push(VerifyError::UnknownCallee {
                    function: self.func.name.clone(),
                    callee: callee.clone(),
                }),
                Some(sig) if sig.params.len() != args.len() => {
                    self.errors.push(VerifyError::ArityMismatch {
                        function: self.func.name.clone(),
                        callee: callee.clone(),
                        expected: sig.params.len(),
                        got: args.len(),
                    })
                }
                Some(sig) => {
                    let args_ok = sig.params.iter().zip(args).all(|(p, a)| *p == a.ty);
                    if !args_ok || sig.ret != *ret {
                        let expected = format!(
                            "{} @{}({})",
                            sig.ret,
                            callee,
                            sig.params
                                .iter()
                                .map(|p| p.to_string())
                                .collect::<Vec<_>>()
                                .join(", ")
                        );
                        self.mismatch(instr, expected);
                    }
                }
            },
            IrInstruction::Alloca { .. } | IrInstruction::Br { .. } | IrInstruction::Unreachable => {}
        }
    }

    fn check_references(&mut self, instr: &IrInstruction) {
        let globals = self.globals;
        let missing: Vec<String> = instr
            .operands()
            .into_iter()
            .filter_map(|v: &Value| match &v.op {
                Operand::Global(name) if !globals.contains(name.as_str()) => Some(name.clone()),
                _ => None,
            })
            .collect();
        for name in missing {
            self.errors.push(VerifyError::UnknownGlobal {
                function: self.func.name.clone(),
                name,
            });
        }
    }
}

fn cast_is_valid(op: CastOp, from: &IrType, to: &IrType) -> bool {
    match op {
        CastOp::UiToFp | CastOp::SiToFp => from.is_int() && to.is_double(),
        CastOp::FpToSi => from.is_double() && to.is_int(),
        CastOp::BitCast => {
            matches!(
                (from, to),
                (IrType::Double, IrType::Int(64)) | (IrType::Int(64), IrType::Double)
            ) || from == to
        }
        CastOp::PtrToInt => from.is_ptr() && to.is_int(),
        CastOp::IntToPtr => from.is_int() && to.is_ptr(),
        CastOp::ZExt | CastOp::Trunc => from.is_int() && to.is_int(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ir::{
        BasicBlock, BinOp, FunctionBuilder, GlobalInit, GlobalVar, Linkage,
    };

    fn module_with(func: IrFunction) -> IrModule {
        let mut module = IrModule::new("m", "x86_64-unknown-linux-gnu");
        module.functions.push(func);
        module
    }

    #[test]
    fn test_empty_module() {
        let result = Verifier::new().verify(&IrModule::new("m", "x86_64-unknown-linux-gnu"));
        assert!(result.valid);
        assert_eq!(result.stats.function_count, 0);
    }

    #[test]
    fn test_simple_valid_function() {
        let mut b = FunctionBuilder::new(IrFunction::new("f", IrType::Double, vec![IrType::Double]));
        let x = b.function().param_values()[0].clone();
        let y = b.binary(BinOp::FAdd, x, Value::float(1.0));
        b.ret(Some(y));
        let result = Verifier::new().verify(&module_with(b.finish()));
        assert!(result.valid, "Errors: {:?}", result.errors);
        assert_eq!(result.stats.instruction_count, 2);
    }

    #[test]
    fn test_missing_terminator() {
        let result = Verifier::new().verify(&module_with(IrFunction::new("f", IrType::Void, vec![])));
        assert!(!result.valid);
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::MissingTerminator { .. })));
    }

    #[test]
    fn test_unknown_label_and_unreachable_warning() {
        let mut func = IrFunction::new("f", IrType::Void, vec![]);
        func.blocks[0].instructions.push(IrInstruction::Br {
            target: "nowhere".into(),
        });
        let mut orphan = BasicBlock::new("orphan");
        orphan.instructions.push(IrInstruction::Ret { value: None });
        func.blocks.push(orphan);
        let result = Verifier::new().verify(&module_with(func));
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::UnknownLabel { .. })));
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_type_mismatch_and_unknown_callee() {
        let mut b = FunctionBuilder::new(IrFunction::new("f", IrType::I64, vec![]));
        b.call_void("missing", vec![]);
        b.ret(Some(Value::float(0.0)));
        let result = Verifier::new().verify(&module_with(b.finish()));
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::UnknownCallee { .. })));
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::TypeMismatch { .. })));
    }

    #[test]
    fn test_unknown_global_and_duplicates() {
        let mut b = FunctionBuilder::new(IrFunction::new("f", IrType::Void, vec![]));
        b.load(IrType::Double, Value::global("ghost"));
        b.ret(None);
        let mut module = module_with(b.finish());
        let g = GlobalVar {
            name: "dup".into(),
            ty: IrType::Double,
            linkage: Linkage::Internal,
            init: Some(GlobalInit::Float(0.0)),
            constant: false,
        };
        module.globals.push(g.clone());
        module.globals.push(g);
        let result = Verifier::new().verify(&module);
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::UnknownGlobal { name, .. } if name == "ghost")));
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::DuplicateSymbol { name } if name == "dup")));
    }

    #[test]
    fn test_use_before_def() {
        let mut func = IrFunction::new("f", IrType::Double, vec![]);
        func.blocks[0].instructions.push(IrInstruction::Ret {
            value: Some(Value::reg(IrReg(7), IrType::Double)),
        });
        let result = Verifier::new().verify(&module_with(func));
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, VerifyError::UseBeforeDef { .. })));
    }
}
