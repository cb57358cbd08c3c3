//! Module linkage resolution.
//!
//! Separately compiled units meet at link time. A name this unit does not
//! define may still be legitimate: it can belong to an imported module, or
//! be read from a function body that runs after every initializer. In those
//! cases the resolver declares an external symbol instead of failing. It also
//! owns symbol naming: library units prefix everything with `{module}_` and
//! only export globals matching the allow-list.
//!
//! Globals cross module boundaries the way arguments cross calls: as one
//! `i64` ABI word. A library mirrors each public top-level binding into
//! `{module}_{name}`; importers declare `external global i64` and read it as
//! a packed word that the use site decodes.

use super::placement::{Binding, StorageClass};
use super::ValueKind;
use crate::compiler::ir::{
    FunctionBuilder, FunctionDecl, GlobalVar, IrModule, IrType, Linkage, Value,
};
use crate::compiler::runtime;
use crate::compiler::CompileMode;
use crate::{Error, Result};
use std::collections::{BTreeSet, HashMap};

/// Symbol naming and external-reference bookkeeping for one unit
#[derive(Debug, Clone)]
pub struct LinkageResolver {
    mode: CompileMode,
    imported_modules: Vec<String>,
    imported_names: BTreeSet<String>,
    export_prefixes: Vec<String>,
    external_globals: HashMap<String, Binding>,
    external_functions: HashMap<String, usize>,
}

impl LinkageResolver {
    /// Create a resolver for a unit compiled in `mode`
    pub fn new(
        mode: CompileMode,
        imported_modules: Vec<String>,
        imported_names: BTreeSet<String>,
        extra_export_prefixes: &[String],
    ) -> Self {
        let mut export_prefixes = Vec::new();
        if let CompileMode::Library { module } = &mode {
            export_prefixes.push(format!("{}_", module));
        }
        export_prefixes.extend(extra_export_prefixes.iter().cloned());
        Self {
            mode,
            imported_modules,
            imported_names,
            export_prefixes,
            external_globals: HashMap::new(),
            external_functions: HashMap::new(),
        }
    }

    /// True for library units
    pub fn is_library(&self) -> bool {
        matches!(self.mode, CompileMode::Library { .. })
    }

    /// Imported modules in initialization order
    pub fn imported_modules(&self) -> &[String] {
        &self.imported_modules
    }

    // ==================== Naming ====================

    /// Symbol of the entry function
    pub fn entry_symbol(&self) -> String {
        match &self.mode {
            CompileMode::Program => "main".to_string(),
            CompileMode::Library { module } => init_symbol(module),
        }
    }

    /// Symbol of a user function
    pub fn function_symbol(&self, name: &str) -> String {
        match &self.mode {
            CompileMode::Library { module } => format!("{}_{}", module, name),
            CompileMode::Program if name == "main" || runtime::is_runtime_symbol(name) => {
                format!("{}.user", name)
            }
            CompileMode::Program => name.to_string(),
        }
    }

    /// Symbol of a top-level variable's storage.
    ///
    /// Storage never carries the module's public prefix, so the export filter
    /// keeps it private; other modules see the exported word instead.
    pub fn global_symbol(&self, name: &str) -> String {
        match &self.mode {
            CompileMode::Library { module } => match name.strip_prefix('_') {
                Some(rest) => format!("_{}.{}", module, rest),
                None => format!("{}.{}", module, name),
            },
            CompileMode::Program => format!("main.{}", name),
        }
    }

    /// Exported word mirroring a library's public top-level `name`
    pub fn export_symbol(&self, name: &str) -> Option<String> {
        match &self.mode {
            CompileMode::Library { module } if !name.starts_with('_') => {
                Some(Self::member_symbol(module, name))
            }
            _ => None,
        }
    }

    /// Symbol of an imported module's member
    pub fn member_symbol(module: &str, member: &str) -> String {
        format!("{}_{}", module, member)
    }

    /// Linkage of a global defined by this unit
    pub fn global_linkage(&self, symbol: &str) -> Linkage {
        match &self.mode {
            CompileMode::Program => Linkage::Internal,
            CompileMode::Library { .. } => {
                if self.export_prefixes.iter().any(|p| symbol.starts_with(p)) {
                    Linkage::External
                } else {
                    Linkage::Private
                }
            }
        }
    }

    // ==================== External references ====================

    /// Whether a missing variable may be deferred to the linker
    pub fn may_defer(&self, name: &str, in_entry: bool) -> bool {
        !in_entry || self.imported_names.contains(name)
    }

    /// Whether a member of `module` may be deferred to the linker
    pub fn may_defer_member(&self, module: &str, member: &str, in_entry: bool) -> bool {
        !in_entry
            || self.imported_modules.iter().any(|m| m == module)
            || self
                .imported_names
                .contains(&Self::member_symbol(module, member))
    }

    /// Declare (once) an external global word and return its binding.
    ///
    /// Fails when the symbol already names a function or a global of this
    /// unit: one symbol cannot be both at link time.
    pub fn external_global(&mut self, module: &mut IrModule, symbol: &str) -> Result<Binding> {
        if let Some(existing) = self.external_globals.get(symbol) {
            return Ok(existing.clone());
        }
        if self.external_functions.contains_key(symbol) || module.has_symbol(symbol) {
            return Err(symbol_conflict(symbol, "read as a variable"));
        }
        tracing::debug!(symbol, "declaring external global");
        module.globals.push(GlobalVar {
            name: symbol.to_string(),
            ty: IrType::I64,
            linkage: Linkage::External,
            init: None,
            constant: false,
        });
        let binding = Binding {
            class: StorageClass::PackedSlot,
            kind: ValueKind::Packed,
            slot: Value::global(symbol),
        };
        self.external_globals
            .insert(symbol.to_string(), binding.clone());
        Ok(binding)
    }

    /// Declare (once) an external function taking `arity` words.
    /// Returns the arity of the declaration actually in effect.
    pub fn external_function(
        &mut self,
        module: &mut IrModule,
        symbol: &str,
        arity: usize,
    ) -> Result<usize> {
        if let Some(declared) = self.external_functions.get(symbol) {
            return Ok(*declared);
        }
        if self.external_globals.contains_key(symbol) || module.has_symbol(symbol) {
            return Err(symbol_conflict(symbol, "called as a function"));
        }
        tracing::debug!(symbol, arity, "declaring external function");
        module.declare(FunctionDecl {
            name: symbol.to_string(),
            ret: IrType::I64,
            params: vec![IrType::I64; arity],
        });
        self.external_functions.insert(symbol.to_string(), arity);
        Ok(arity)
    }

    /// Number of distinct external symbols declared so far
    pub fn external_count(&self) -> usize {
        self.external_globals.len() + self.external_functions.len()
    }

    // ==================== Initialization order ====================

    /// Declare and call every imported module's initializer, in import order
    pub fn emit_module_inits(&self, module: &mut IrModule, b: &mut FunctionBuilder) {
        if self.is_library() {
            return;
        }
        for imported in &self.imported_modules {
            let symbol = init_symbol(imported);
            module.declare(FunctionDecl {
                name: symbol.clone(),
                ret: IrType::Void,
                params: vec![],
            });
            b.call_void(&symbol, vec![]);
        }
    }
}

/// Initializer symbol of a library module
pub fn init_symbol(module: &str) -> String {
    format!("{}_init", module)
}

/// `symbol` is already taken by a different kind of definition
pub fn symbol_conflict(symbol: &str, usage: &str) -> Error {
    Error::SymbolConflict {
        symbol: symbol.to_string(),
        hint: Some(format!(
            "'{}' is {} here but already names a different definition; rename one of them",
            symbol, usage
        )),
    }
}

/// Hint for an undefined name: near misses sharing the first character,
/// otherwise a sample of what is defined
pub fn undefined_hint(name: &str, candidates: &[String]) -> String {
    if candidates.is_empty() {
        return "No variables defined yet".to_string();
    }
    let first = name.chars().next();
    let similar: Vec<&str> = candidates
        .iter()
        .filter(|c| c.chars().next() == first)
        .map(String::as_str)
        .take(3)
        .collect();
    if !similar.is_empty() {
        return format!("Did you mean: {}?", similar.join(", "));
    }
    let available: Vec<&str> = candidates.iter().map(String::as_str).take(5).collect();
    format!("Available variables: {}", available.join(", "))
}
