//! IR module, function, and basic block definitions

use super::instruction::{IrInstruction, IrReg, Value};
use super::types::{IrType, StructType};

/// Basic block in the control flow graph
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    /// Label identifying this basic block
    pub label: String,
    /// IR instructions in this block; the last one is the terminator
    pub instructions: Vec<IrInstruction>,
}

impl BasicBlock {
    /// Create a new basic block with the given label
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            instructions: Vec::new(),
        }
    }

    /// Final instruction, when it is a terminator
    pub fn terminator(&self) -> Option<&IrInstruction> {
        self.instructions.last().filter(|i| i.is_terminator())
    }

    /// True once the block has been terminated
    pub fn is_terminated(&self) -> bool {
        self.terminator().is_some()
    }
}

/// Symbol visibility at link time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// Visible to other objects
    External,
    /// Visible within this object only
    Internal,
    /// Visible within this object only, omitted from the symbol table
    Private,
}

impl Linkage {
    /// LLVM linkage keyword (empty for the default external linkage)
    pub fn keyword(self) -> &'static str {
        match self {
            Linkage::External => "",
            Linkage::Internal => "internal ",
            Linkage::Private => "private ",
        }
    }
}

/// Initial value of a global variable
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalInit {
    /// `double` constant
    Float(f64),
    /// Integer constant
    Int(i64),
    /// Null pointer
    Null,
    /// Zero-initialized aggregate
    Zero,
    /// NUL-terminated byte string
    Bytes(Vec<u8>),
}

/// Module-level variable
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVar {
    /// Symbol name
    pub name: String,
    /// Value type
    pub ty: IrType,
    /// Link visibility
    pub linkage: Linkage,
    /// Initializer; `None` declares a symbol defined in another object
    pub init: Option<GlobalInit>,
    /// Read-only data
    pub constant: bool,
}

impl GlobalVar {
    /// True when the symbol is resolved at link time
    pub fn is_external_decl(&self) -> bool {
        self.init.is_none()
    }
}

/// Function declared but defined elsewhere (runtime or another module)
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// Symbol name
    pub name: String,
    /// Return type
    pub ret: IrType,
    /// Parameter types
    pub params: Vec<IrType>,
}

/// Function definition
#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    /// Symbol name
    pub name: String,
    /// Return type
    pub ret: IrType,
    /// Parameters, bound to the first registers
    pub params: Vec<(IrReg, IrType)>,
    /// Link visibility
    pub linkage: Linkage,
    /// Blocks in layout order; the first is the entry block
    pub blocks: Vec<BasicBlock>,
}

impl IrFunction {
    /// Create a function with an empty entry block
    pub fn new(name: &str, ret: IrType, params: Vec<IrType>) -> Self {
        let params = params
            .into_iter()
            .enumerate()
            .map(|(i, ty)| (IrReg(i as u32), ty))
            .collect();
        Self {
            name: name.to_string(),
            ret,
            params,
            linkage: Linkage::External,
            blocks: vec![BasicBlock::new("entry")],
        }
    }

    /// Parameter values
    pub fn param_values(&self) -> Vec<Value> {
        self.params
            .iter()
            .map(|(reg, ty)| Value::reg(*reg, ty.clone()))
            .collect()
    }

    /// Block with the given label
    pub fn block(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.label == label)
    }

    /// All instructions in layout order
    pub fn instructions(&self) -> impl Iterator<Item = &IrInstruction> {
        self.blocks.iter().flat_map(|b| b.instructions.iter())
    }

    /// Number of calls to `callee`
    pub fn count_calls(&self, callee: &str) -> usize {
        self.instructions()
            .filter(|i| i.callee() == Some(callee))
            .count()
    }

    /// Callees in call order
    pub fn call_sequence(&self) -> Vec<&str> {
        self.instructions().filter_map(|i| i.callee()).collect()
    }

    /// Signature as a declaration
    pub fn signature(&self) -> FunctionDecl {
        FunctionDecl {
            name: self.name.clone(),
            ret: self.ret.clone(),
            params: self.params.iter().map(|(_, ty)| ty.clone()).collect(),
        }
    }
}

/// Complete IR for one compilation unit
#[derive(Debug, Clone, PartialEq)]
pub struct IrModule {
    /// Module identifier
    pub name: String,
    /// Target triple
    pub triple: String,
    /// Named struct types
    pub struct_types: Vec<StructType>,
    /// Global variables and string constants
    pub globals: Vec<GlobalVar>,
    /// External function declarations
    pub declarations: Vec<FunctionDecl>,
    /// Function definitions in emission order
    pub functions: Vec<IrFunction>,
}

impl IrModule {
    /// Create an empty module
    pub fn new(name: &str, triple: &str) -> Self {
        Self {
            name: name.to_string(),
            triple: triple.to_string(),
            struct_types: Vec::new(),
            globals: Vec::new(),
            declarations: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Global with the given name
    pub fn global(&self, name: &str) -> Option<&GlobalVar> {
        self.globals.iter().find(|g| g.name == name)
    }

    /// Defined function with the given name
    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Declared (external) function with the given name
    pub fn declaration(&self, name: &str) -> Option<&FunctionDecl> {
        self.declarations.iter().find(|d| d.name == name)
    }

    /// Signature of a defined or declared function
    pub fn signature(&self, name: &str) -> Option<FunctionDecl> {
        self.function(name)
            .map(IrFunction::signature)
            .or_else(|| self.declaration(name).cloned())
    }

    /// True when `name` is a global, a function, or a declaration
    pub fn has_symbol(&self, name: &str) -> bool {
        self.global(name).is_some()
            || self.function(name).is_some()
            || self.declaration(name).is_some()
    }

    /// Add a declaration unless one with the same name exists
    pub fn declare(&mut self, decl: FunctionDecl) {
        if self.declaration(&decl.name).is_none() {
            self.declarations.push(decl);
        }
    }

    /// Total instruction count across all functions
    pub fn instruction_count(&self) -> usize {
        self.functions.iter().map(|f| f.instructions().count()).sum()
    }
}
