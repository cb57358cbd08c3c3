//! IR Generator - lowers the EigenScript AST to typed SSA IR
//!
//! ## Module Organization
//!
//! | File | Responsibility |
//! |------|----------------|
//! | `mod.rs` | generator state, statements, bindings, functions |
//! | `expr.rs` | expressions, operators, calls and builtins |
//! | `repr.rs` | conversions between value kinds |
//! | `placement.rs` | where each binding lives |
//! | `abi.rs` | packing values into call-boundary words |
//! | `linkage.rs` | symbol naming and external references |
//!
//! ## Compilation order
//!
//! 1. Declare the runtime catalog, every top-level function, and struct types
//! 2. Emit the entry function (`main` or `{module}_init`), including calls to
//!    imported initializers
//! 3. Emit each function body, after the entry so top-level globals exist
//!
//! A generator compiles exactly one unit; construct a new one per unit.

mod expr;

pub mod abi;
pub mod linkage;
pub mod placement;
pub mod repr;

use self::linkage::LinkageResolver;
use self::placement::{Binding, Placement, Scope, SlotHome, StorageClass};
use self::repr::BoxHome;
use super::builder::FunctionBuilder;
use super::instruction::{IntPred, Value};
use super::program::{GlobalInit, GlobalVar, IrFunction, IrModule, Linkage};
use super::types::{self, IrType};
use crate::ast::Node;
use crate::compiler::runtime;
use crate::compiler::target::TargetInfo;
use crate::compiler::{CompileMode, CompileOptions};
use crate::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Physical kind of a generated value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Raw `double` (or an `i1` flag, widened on demand)
    Scalar,
    /// Pointer to a boxed record
    Tracked,
    /// List handle
    List,
    /// String handle
    Text,
    /// Struct instance of the named type
    Struct(String),
    /// Undecoded `i64` ABI word (parameters, call results, struct fields)
    Packed,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValueKind::Scalar => write!(f, "Scalar"),
            ValueKind::Tracked => write!(f, "Tracked"),
            ValueKind::List => write!(f, "List"),
            ValueKind::Text => write!(f, "Text"),
            ValueKind::Struct(name) => write!(f, "Struct({})", name),
            ValueKind::Packed => write!(f, "Packed"),
        }
    }
}

/// An IR value paired with its kind
#[derive(Debug, Clone, PartialEq)]
pub struct Typed {
    /// IR operand
    pub value: Value,
    /// How to interpret the operand
    pub kind: ValueKind,
}

impl Typed {
    /// Raw double
    pub fn scalar(value: Value) -> Self {
        Self {
            value,
            kind: ValueKind::Scalar,
        }
    }

    /// Boxed record pointer
    pub fn tracked(value: Value) -> Self {
        Self {
            value,
            kind: ValueKind::Tracked,
        }
    }

    /// List handle
    pub fn list(value: Value) -> Self {
        Self {
            value,
            kind: ValueKind::List,
        }
    }

    /// String handle
    pub fn text(value: Value) -> Self {
        Self {
            value,
            kind: ValueKind::Text,
        }
    }

    /// Struct instance of type `name`
    pub fn structure(value: Value, name: &str) -> Self {
        Self {
            value,
            kind: ValueKind::Struct(name.to_string()),
        }
    }

    /// Undecoded ABI word
    pub fn packed(value: Value) -> Self {
        Self {
            value,
            kind: ValueKind::Packed,
        }
    }
}

/// Declared user function
#[derive(Debug, Clone)]
struct FunctionInfo {
    symbol: String,
    params: Vec<String>,
}

/// Function body waiting for the entry function to finish
#[derive(Debug, Clone)]
struct PendingFunction {
    name: String,
    params: Vec<String>,
    body: Vec<Node>,
}

/// Top-level allocation freed by the program's exit block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupEntry {
    /// Private global holding the allocation (null until allocated)
    pub slot: String,
    /// Runtime destructor (null-safe)
    pub destroy: &'static str,
}

/// Output of one generator run
#[derive(Debug, Clone)]
pub struct GeneratedUnit {
    /// The generated module
    pub module: IrModule,
    /// Allocations the entry function destroys before returning
    pub cleanup: Vec<CleanupEntry>,
    /// Non-fatal notes (argument padding, truncation)
    pub warnings: Vec<String>,
}

/// Label of the program's single exit block
const EXIT_LABEL: &str = "exit";

/// IR Generator - lowers one compilation unit
pub struct IrGenerator {
    target: TargetInfo,
    observed: BTreeSet<String>,
    module: IrModule,
    linker: LinkageResolver,
    builder: FunctionBuilder,
    scope: Scope,
    /// Top-level bindings
    globals: HashMap<String, Binding>,
    /// Bindings of the function being emitted
    locals: HashMap<String, Binding>,
    functions: HashMap<String, FunctionInfo>,
    pending: Vec<PendingFunction>,
    /// Struct name -> field names
    structs: HashMap<String, Vec<String>>,
    /// Names referenced from any function body
    shared_names: BTreeSet<String>,
    /// Exit labels of enclosing loops, innermost last
    loop_ends: Vec<String>,
    cleanup: Vec<CleanupEntry>,
    /// Most recently assigned name in the current scope
    last_bound: Option<String>,
    label_counter: u32,
    string_counter: u32,
    warnings: Vec<String>,
}

impl IrGenerator {
    /// Create a generator for one unit
    pub fn new(options: &CompileOptions, target: TargetInfo) -> Self {
        let linker = LinkageResolver::new(
            options.mode.clone(),
            options.imported_modules.clone(),
            options.imported_names.clone(),
            &options.export_prefixes,
        );
        let module_name = match &options.mode {
            CompileMode::Program => "main".to_string(),
            CompileMode::Library { module } => module.clone(),
        };
        let mut module = IrModule::new(&module_name, &target.triple);
        module.struct_types.push(types::eigen_value_layout());
        module.struct_types.push(types::collection_layout("EigenList"));
        module.struct_types.push(types::collection_layout("EigenString"));
        runtime::declare_runtime(&mut module, &target);

        let entry_ret = if linker.is_library() {
            IrType::Void
        } else {
            IrType::I32
        };
        let entry = IrFunction::new(&linker.entry_symbol(), entry_ret, vec![]);

        Self {
            target,
            observed: options.observed.clone(),
            module,
            linker,
            builder: FunctionBuilder::new(entry),
            scope: Scope::TopLevel,
            globals: HashMap::new(),
            locals: HashMap::new(),
            functions: HashMap::new(),
            pending: Vec::new(),
            structs: HashMap::new(),
            shared_names: BTreeSet::new(),
            loop_ends: Vec::new(),
            cleanup: Vec::new(),
            last_bound: None,
            label_counter: 0,
            string_counter: 0,
            warnings: Vec::new(),
        }
    }

    /// Generate the unit
    pub fn generate(mut self, statements: &[Node]) -> Result<GeneratedUnit> {
        // Pass 1: declarations
        for stmt in statements {
            match stmt {
                Node::FunctionDef { name, params, body } => {
                    self.declare_function(name, params, body)
                }
                Node::StructDef { name, fields } => {
                    self.structs.insert(name.clone(), fields.clone());
                }
                _ => {}
            }
        }
        for pending in &self.pending {
            for stmt in &pending.body {
                stmt.collect_reads(&mut self.shared_names);
            }
        }

        // Pass 2: entry function
        self.linker
            .emit_module_inits(&mut self.module, &mut self.builder);
        for stmt in statements {
            self.generate_statement(stmt)?;
        }
        self.finish_entry()?;

        // Pass 3: function bodies
        let mut index = 0;
        while index < self.pending.len() {
            let pending = self.pending[index].clone();
            self.generate_function_body(&pending)?;
            index += 1;
        }

        tracing::debug!(
            functions = self.module.functions.len(),
            globals = self.module.globals.len(),
            cleanup = self.cleanup.len(),
            externals = self.linker.external_count(),
            "generated unit"
        );
        Ok(GeneratedUnit {
            module: self.module,
            cleanup: self.cleanup,
            warnings: self.warnings,
        })
    }

    // ==================== Helpers ====================

    /// Create a unique label (`{prefix}_{n}`)
    fn new_label(&mut self, prefix: &str) -> String {
        let label = format!("{}_{}", prefix, self.label_counter);
        self.label_counter += 1;
        label
    }

    /// Start a fresh block and continue emitting there
    fn continue_in_new_block(&mut self, prefix: &str) -> Result<()> {
        let label = self.new_label(prefix);
        self.builder.append_block(&label);
        self.builder.position_at_end(&label)
    }

    fn is_observed(&self, name: &str) -> bool {
        self.observed.contains(name)
    }

    fn is_program(&self) -> bool {
        !self.linker.is_library()
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Intern a NUL-terminated string constant and return its address
    fn string_constant(&mut self, text: &str) -> Value {
        let name = format!(".str.{}", self.string_counter);
        self.string_counter += 1;
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.module.globals.push(GlobalVar {
            name: name.clone(),
            ty: IrType::Array(bytes.len() as u64, Box::new(IrType::I8)),
            linkage: Linkage::Private,
            init: Some(GlobalInit::Bytes(bytes)),
            constant: true,
        });
        Value::global(name)
    }

    /// Record a runtime allocation for the exit-block cleanup.
    ///
    /// Only allocations made by a program's entry function are tracked;
    /// function-local allocations and library initializer allocations are
    /// not freed by generated code.
    fn track_allocation(&mut self, ptr: &Value, destroy: &'static str) {
        if !(self.is_program() && self.scope == Scope::TopLevel) {
            return;
        }
        let slot = format!("__cleanup.{}", self.cleanup.len());
        self.module.globals.push(GlobalVar {
            name: slot.clone(),
            ty: IrType::Ptr,
            linkage: Linkage::Private,
            init: Some(GlobalInit::Null),
            constant: false,
        });
        self.builder.store(ptr.clone(), Value::global(&slot));
        self.cleanup.push(CleanupEntry { slot, destroy });
    }

    /// Names visible from the current scope, sorted
    fn visible_names(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.globals.keys().cloned().collect();
        if self.scope == Scope::Function {
            names.extend(self.locals.keys().cloned());
        }
        names.into_iter().collect()
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        match self.scope {
            Scope::Function => self.locals.get(name).or_else(|| {
                self.globals
                    .get(name)
                    .filter(|binding| binding.is_module_level())
            }),
            Scope::TopLevel => self.globals.get(name),
        }
    }

    // ==================== Functions ====================

    fn declare_function(&mut self, name: &str, params: &[String], body: &[Node]) {
        if self.functions.contains_key(name) {
            return;
        }
        let symbol = self.linker.function_symbol(name);
        self.functions.insert(
            name.to_string(),
            FunctionInfo {
                symbol,
                params: params.to_vec(),
            },
        );
        self.pending.push(PendingFunction {
            name: name.to_string(),
            params: params.to_vec(),
            body: body.to_vec(),
        });
    }

    fn generate_function_body(&mut self, pending: &PendingFunction) -> Result<()> {
        let info = self
            .functions
            .get(&pending.name)
            .cloned()
            .ok_or_else(|| Error::internal(format!("function '{}' was never declared", pending.name)))?;
        let func = IrFunction::new(
            &info.symbol,
            IrType::I64,
            vec![IrType::I64; info.params.len()],
        );
        self.builder = FunctionBuilder::new(func);
        self.scope = Scope::Function;
        self.locals.clear();
        self.last_bound = None;

        let words = self.builder.function().param_values();
        for (param, word) in pending.params.iter().zip(words) {
            self.bind_local(param, Typed::packed(word))?;
        }

        for stmt in &pending.body {
            self.generate_statement(stmt)?;
        }
        if !self.builder.is_terminated() {
            self.builder.ret(Some(Value::int(IrType::I64, 0)));
        }

        self.push_finished_function();
        Ok(())
    }

    /// Close the entry function. Programs route every return through one
    /// exit block that destroys all tracked top-level allocations.
    fn finish_entry(&mut self) -> Result<()> {
        if self.is_program() {
            if !self.builder.is_terminated() {
                self.builder.br(EXIT_LABEL);
            }
            self.builder.append_block(EXIT_LABEL);
            self.builder.position_at_end(EXIT_LABEL)?;
            for entry in self.cleanup.clone() {
                let ptr = self.builder.load(IrType::Ptr, Value::global(&entry.slot));
                self.builder.call_void(entry.destroy, vec![ptr]);
            }
            self.builder.ret(Some(Value::int(IrType::I32, 0)));
        } else if !self.builder.is_terminated() {
            self.builder.ret(None);
        }
        self.push_finished_function();
        Ok(())
    }

    /// Move the function under construction into the module
    fn push_finished_function(&mut self) {
        let done = std::mem::replace(
            &mut self.builder,
            FunctionBuilder::new(IrFunction::new("", IrType::Void, vec![])),
        );
        self.module.functions.push(done.finish());
    }

    // ==================== Statements ====================

    /// Generate one statement
    pub(crate) fn generate_statement(&mut self, node: &Node) -> Result<()> {
        match node {
            Node::Assignment { name, value } => {
                let value = self.generate_expr(value)?;
                self.assign(name, value)
            }

            Node::IndexedAssignment {
                target,
                index,
                value,
            } => self.generate_indexed_store(target, index, value),

            Node::FunctionDef { name, params, body } => match self.scope {
                Scope::TopLevel => {
                    self.declare_function(name, params, body);
                    Ok(())
                }
                Scope::Function => Err(Error::internal(format!(
                    "nested function definition '{}' reached the generator",
                    name
                ))),
            },

            Node::StructDef { name, fields } => {
                self.structs.insert(name.clone(), fields.clone());
                Ok(())
            }

            Node::Return { value } => self.generate_return(value.as_deref()),

            Node::Break => {
                let end = self.loop_ends.last().cloned().ok_or_else(|| Error::BreakOutsideLoop {
                    hint: Some("'break' can only be used inside a 'loop while' body".to_string()),
                })?;
                self.builder.br(&end);
                self.continue_in_new_block("dead")
            }

            Node::Conditional {
                condition,
                then_block,
                else_block,
            } => self.generate_conditional(condition, then_block, else_block),

            Node::Loop { condition, body } => self.generate_loop(condition, body),

            // Imports are resolved before generation; initializer calls are
            // emitted at the top of the entry function.
            Node::Import { .. } => Ok(()),

            expr => {
                self.generate_expr(expr)?;
                Ok(())
            }
        }
    }

    fn generate_return(&mut self, value: Option<&Node>) -> Result<()> {
        let value = value.map(|v| self.generate_expr(v)).transpose()?;
        match self.scope {
            Scope::Function => {
                let word = match value {
                    Some(v) => {
                        let v = self.normalize_for_abi(&v);
                        abi::pack(&mut self.builder, &v)
                    }
                    None => Value::int(IrType::I64, 0),
                };
                self.builder.ret(Some(word));
            }
            Scope::TopLevel if self.is_program() => self.builder.br(EXIT_LABEL),
            Scope::TopLevel => self.builder.ret(None),
        }
        self.continue_in_new_block("dead")
    }

    fn generate_conditional(
        &mut self,
        condition: &Node,
        then_block: &[Node],
        else_block: &[Node],
    ) -> Result<()> {
        let cond = self.generate_expr(condition)?;
        let cond = repr::to_boolean(&mut self.builder, &cond)?;

        let then_label = self.new_label("if_then");
        let else_label = self.new_label("if_else");
        let merge_label = self.new_label("if_merge");
        self.builder.cond_br(cond, &then_label, &else_label);

        self.builder.append_block(&then_label);
        self.builder.position_at_end(&then_label)?;
        for stmt in then_block {
            self.generate_statement(stmt)?;
        }
        if !self.builder.is_terminated() {
            self.builder.br(&merge_label);
        }

        self.builder.append_block(&else_label);
        self.builder.position_at_end(&else_label)?;
        for stmt in else_block {
            self.generate_statement(stmt)?;
        }
        if !self.builder.is_terminated() {
            self.builder.br(&merge_label);
        }

        self.builder.append_block(&merge_label);
        self.builder.position_at_end(&merge_label)
    }

    /// `loop while cond: body` re-tests the condition before every iteration
    fn generate_loop(&mut self, condition: &Node, body: &[Node]) -> Result<()> {
        let cond_label = self.new_label("loop_cond");
        let body_label = self.new_label("loop_body");
        let end_label = self.new_label("loop_end");

        self.builder.br(&cond_label);
        self.builder.append_block(&cond_label);
        self.builder.position_at_end(&cond_label)?;
        let cond = self.generate_expr(condition)?;
        let cond = repr::to_boolean(&mut self.builder, &cond)?;
        self.builder.cond_br(cond, &body_label, &end_label);

        self.builder.append_block(&body_label);
        self.builder.position_at_end(&body_label)?;
        self.loop_ends.push(end_label.clone());
        let result = body.iter().try_for_each(|stmt| self.generate_statement(stmt));
        self.loop_ends.pop();
        result?;
        if !self.builder.is_terminated() {
            self.builder.br(&cond_label);
        }

        self.builder.append_block(&end_label);
        self.builder.position_at_end(&end_label)
    }

    // ==================== Bindings ====================

    /// Bind `name` to `value`, creating or updating storage per the
    /// placement policy. Inside a function, assignment only ever sees the
    /// function's own bindings: a first assignment shadows any top-level
    /// binding of the same name.
    fn assign(&mut self, name: &str, value: Typed) -> Result<()> {
        let existing = match self.scope {
            Scope::Function => self.locals.get(name).cloned(),
            Scope::TopLevel => self.globals.get(name).cloned(),
        };

        let placement = placement::place(
            self.scope,
            self.is_observed(name),
            &value.kind,
            existing.as_ref().map(|b| (b.class, &b.kind)),
        )?;

        match (placement, existing) {
            (Placement::New(class), _) => self.create_binding(name, class, value)?,
            (Placement::StoreScalar, Some(binding)) => {
                let scalar = repr::to_scalar(&mut self.builder, &value);
                self.builder.store(scalar, binding.slot);
            }
            (Placement::UpdateBox, Some(binding)) => {
                let scalar = repr::to_scalar(&mut self.builder, &value);
                let record = self.builder.load(IrType::Ptr, binding.slot);
                self.builder
                    .call_void(runtime::EIGEN_UPDATE, vec![record, scalar]);
            }
            (Placement::Rebind, Some(binding)) => {
                let want = match (&binding.kind, &value.kind) {
                    (ValueKind::Struct(_), ValueKind::Struct(new)) => ValueKind::Struct(new.clone()),
                    (kind, _) => kind.clone(),
                };
                let coerced = repr::coerce(&mut self.builder, &value, &want)?;
                self.builder.store(coerced.value, binding.slot.clone());
                let updated = Binding {
                    kind: want,
                    ..binding
                };
                match self.scope {
                    Scope::Function => self.locals.insert(name.to_string(), updated),
                    Scope::TopLevel => self.globals.insert(name.to_string(), updated),
                };
            }
            (Placement::StorePacked, Some(binding)) => {
                let value = self.normalize_for_abi(&value);
                let word = abi::pack(&mut self.builder, &value);
                self.builder.store(word, binding.slot);
            }
            (placement, None) => {
                return Err(Error::internal(format!(
                    "placement {:?} for '{}' without an existing binding",
                    placement, name
                )))
            }
        }
        if self.scope == Scope::TopLevel {
            self.publish(name)?;
        }
        self.last_bound = Some(name.to_string());
        Ok(())
    }

    /// Mirror a library's public top-level binding into its exported word.
    ///
    /// Only the initializer assigns top-level names, so the word is current
    /// once the initializer returns.
    fn publish(&mut self, name: &str) -> Result<()> {
        let Some(symbol) = self.linker.export_symbol(name) else {
            return Ok(());
        };
        let Some(binding) = self.globals.get(name).cloned() else {
            return Ok(());
        };
        if self.module.global(&symbol).is_none() {
            if self.module.has_symbol(&symbol)
                || self.functions.values().any(|f| f.symbol == symbol)
            {
                return Err(linkage::symbol_conflict(&symbol, "exported as a variable"));
            }
            let linkage = self.linker.global_linkage(&symbol);
            self.module.globals.push(GlobalVar {
                name: symbol.clone(),
                ty: IrType::I64,
                linkage,
                init: Some(GlobalInit::Int(0)),
                constant: false,
            });
        }
        let current = self.load_binding(&binding);
        let current = self.normalize_for_abi(&current);
        let word = abi::pack(&mut self.builder, &current);
        self.builder.store(word, Value::global(symbol));
        Ok(())
    }

    /// Bind a function parameter, shadowing any top-level binding
    fn bind_local(&mut self, name: &str, value: Typed) -> Result<()> {
        let placement = placement::place(self.scope, self.is_observed(name), &value.kind, None)?;
        match placement {
            Placement::New(class) => self.create_binding(name, class, value),
            other => Err(Error::internal(format!(
                "parameter '{}' placed as {:?}",
                name, other
            ))),
        }
    }

    /// Allocate the slot for a new binding and store the first value
    fn create_binding(&mut self, name: &str, class: StorageClass, value: Typed) -> Result<()> {
        let in_loop = !self.loop_ends.is_empty();
        let home = placement::slot_home(
            self.scope,
            class,
            self.linker.is_library(),
            self.shared_names.contains(name),
        );
        let slot = self.new_slot(name, class, home, in_loop);

        let kind = match class {
            StorageClass::FastSlot => {
                let scalar = repr::to_scalar(&mut self.builder, &value);
                self.builder.store(scalar, slot.clone());
                ValueKind::Scalar
            }
            StorageClass::PackedSlot => {
                let word = abi::pack(&mut self.builder, &value);
                self.builder.store(word, slot.clone());
                ValueKind::Packed
            }
            StorageClass::Alias => {
                self.builder.store(value.value.clone(), slot.clone());
                ValueKind::Tracked
            }
            StorageClass::Handle => {
                self.builder.store(value.value.clone(), slot.clone());
                value.kind.clone()
            }
            StorageClass::StackBox | StorageClass::HeapBox => {
                let box_home = if class == StorageClass::StackBox {
                    BoxHome::Stack
                } else {
                    BoxHome::Heap
                };
                if in_loop {
                    self.init_box_once(&slot, &value, box_home)?;
                } else {
                    self.init_box(&slot, &value, box_home)?;
                }
                ValueKind::Tracked
            }
        };

        let binding = Binding { class, kind, slot };
        match self.scope {
            Scope::Function => self.locals.insert(name.to_string(), binding),
            Scope::TopLevel => self.globals.insert(name.to_string(), binding),
        };
        Ok(())
    }

    fn new_slot(&mut self, name: &str, class: StorageClass, home: SlotHome, in_loop: bool) -> Value {
        let ty = class.slot_type();
        match home {
            SlotHome::Stack if in_loop && class.is_tracked() => {
                self.builder.alloca_at_entry_with(ty, Value::null())
            }
            SlotHome::Stack => self.builder.alloca_at_entry(ty),
            SlotHome::ModuleGlobal => {
                let symbol = self.linker.global_symbol(name);
                let init = match ty {
                    IrType::Double => GlobalInit::Float(0.0),
                    IrType::Ptr => GlobalInit::Null,
                    _ => GlobalInit::Int(0),
                };
                let linkage = self.linker.global_linkage(&symbol);
                self.module.globals.push(GlobalVar {
                    name: symbol.clone(),
                    ty,
                    linkage,
                    init: Some(init),
                    constant: false,
                });
                Value::global(symbol)
            }
        }
    }

    /// Create a boxed record and store its pointer in `slot`
    fn init_box(&mut self, slot: &Value, value: &Typed, home: BoxHome) -> Result<()> {
        let record = repr::to_tracked(&mut self.builder, value, home)?;
        if home == BoxHome::Heap {
            self.track_allocation(&record.value, runtime::EIGEN_DESTROY);
        }
        self.builder.store(record.value, slot.clone());
        Ok(())
    }

    /// First binding inside a loop: create the record on the first pass
    /// (slot still null) and update it on every later pass
    fn init_box_once(&mut self, slot: &Value, value: &Typed, home: BoxHome) -> Result<()> {
        let create_label = self.new_label("box_create");
        let update_label = self.new_label("box_update");
        let join_label = self.new_label("box_join");

        let current = self.builder.load(IrType::Ptr, slot.clone());
        let is_null = self.builder.icmp(IntPred::Eq, current.clone(), Value::null());
        self.builder.cond_br(is_null, &create_label, &update_label);

        self.builder.append_block(&create_label);
        self.builder.position_at_end(&create_label)?;
        self.init_box(slot, value, home)?;
        self.builder.br(&join_label);

        self.builder.append_block(&update_label);
        self.builder.position_at_end(&update_label)?;
        let scalar = repr::to_scalar(&mut self.builder, value);
        self.builder
            .call_void(runtime::EIGEN_UPDATE, vec![current, scalar]);
        self.builder.br(&join_label);

        self.builder.append_block(&join_label);
        self.builder.position_at_end(&join_label)
    }

    /// Read a binding's current value
    fn load_binding(&mut self, binding: &Binding) -> Typed {
        let raw = self
            .builder
            .load(binding.class.slot_type(), binding.slot.clone());
        Typed {
            value: raw,
            kind: binding.kind.clone(),
        }
    }

    /// Values cross calls and struct fields by value: tracked records are
    /// read out to their current scalar first
    fn normalize_for_abi(&mut self, v: &Typed) -> Typed {
        match v.kind {
            ValueKind::Tracked => Typed::scalar(repr::to_scalar(&mut self.builder, v)),
            _ => v.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(statements: Vec<Node>, observed: &[&str]) -> GeneratedUnit {
        let mut options = CompileOptions::default();
        options.observed = observed.iter().map(|s| s.to_string()).collect();
        let target = TargetInfo::resolve(Some("x86_64-unknown-linux-gnu"));
        IrGenerator::new(&options, target)
            .generate(&statements)
            .unwrap()
    }

    #[test]
    fn test_empty_program_has_main_and_exit() {
        let unit = generate(vec![], &[]);
        let main = unit.module.function("main").unwrap();
        assert_eq!(main.ret, IrType::I32);
        assert!(main.block(EXIT_LABEL).is_some());
    }

    #[test]
    fn test_fast_scalar_uses_stack_slot() {
        let unit = generate(vec![Node::assign("x", Node::num(1.0))], &[]);
        let main = unit.module.function("main").unwrap();
        assert_eq!(main.count_calls(runtime::EIGEN_CREATE), 0);
        assert!(unit.module.global("main.x").is_none());
    }

    #[test]
    fn test_observed_top_level_is_heap_and_cleaned() {
        let unit = generate(vec![Node::assign("x", Node::num(1.0))], &["x"]);
        let main = unit.module.function("main").unwrap();
        assert_eq!(main.count_calls(runtime::EIGEN_CREATE), 1);
        assert_eq!(main.count_calls(runtime::EIGEN_DESTROY), 1);
        assert_eq!(unit.cleanup.len(), 1);
        assert!(unit.module.global("main.x").is_some());
    }

    #[test]
    fn test_function_emitted_after_entry() {
        let unit = generate(
            vec![Node::FunctionDef {
                name: "f".into(),
                params: vec!["n".into()],
                body: vec![Node::Return {
                    value: Some(Box::new(Node::ident("n"))),
                }],
            }],
            &[],
        );
        let names: Vec<&str> = unit.module.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["main", "f"]);
    }

    #[test]
    fn test_break_outside_loop() {
        let target = TargetInfo::resolve(Some("x86_64-unknown-linux-gnu"));
        let err = IrGenerator::new(&CompileOptions::default(), target)
            .generate(&[Node::Break])
            .unwrap_err();
        assert!(matches!(err, Error::BreakOutsideLoop { .. }));
        assert_eq!(
            err.hint(),
            Some("'break' can only be used inside a 'loop while' body")
        );
    }
}
