//! Allocation placement policy.
//!
//! Decides where a binding lives from `(scope, observed?, incoming kind,
//! existing binding)`. Every function here is pure; the emitter performs the
//! decision. Unobserved scalars take the fast path (a plain `double` slot, no
//! runtime calls); observed scalars get a boxed record on the stack inside
//! functions and on the heap at top level, where the cleanup pass frees it.

use super::ValueKind;
use crate::compiler::ir::{IrType, Value};
use crate::{Error, Result};

/// Lexical scope of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Entry function body (`main` or the module initializer)
    TopLevel,
    /// User function body
    Function,
}

/// Physical storage of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// Raw `double` slot; no runtime involvement
    FastSlot,
    /// Slot pointing at a boxed record living in the function's frame
    StackBox,
    /// Slot pointing at a runtime-allocated boxed record
    HeapBox,
    /// Slot pointing at a boxed record owned by another binding
    Alias,
    /// Slot holding a list, string, or struct pointer
    Handle,
    /// Slot holding an undecoded ABI word
    PackedSlot,
}

impl StorageClass {
    /// Type of the slot itself
    pub fn slot_type(self) -> IrType {
        match self {
            StorageClass::FastSlot => IrType::Double,
            StorageClass::PackedSlot => IrType::I64,
            _ => IrType::Ptr,
        }
    }

    /// True when the slot holds a boxed-record pointer
    pub fn is_tracked(self) -> bool {
        matches!(
            self,
            StorageClass::StackBox | StorageClass::HeapBox | StorageClass::Alias
        )
    }
}

/// What an assignment must do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Create a binding with the given storage
    New(StorageClass),
    /// Overwrite a fast slot with the incoming value as a scalar
    StoreScalar,
    /// Push the incoming value into the existing boxed record
    UpdateBox,
    /// Overwrite the stored handle pointer
    Rebind,
    /// Overwrite the stored ABI word
    StorePacked,
}

/// Where a new slot is materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotHome {
    /// `alloca` in the current function's entry block
    Stack,
    /// Module-level global variable
    ModuleGlobal,
}

/// A name bound to storage
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Storage class
    pub class: StorageClass,
    /// Kind of the values read back from this binding
    pub kind: ValueKind,
    /// Address of the slot (register or global)
    pub slot: Value,
}

impl Binding {
    /// True when the slot is a global and thus visible from every function
    pub fn is_module_level(&self) -> bool {
        self.slot.as_reg().is_none()
    }
}

fn compatible_handles(existing: &ValueKind, incoming: &ValueKind) -> bool {
    matches!(
        (existing, incoming),
        (ValueKind::List, ValueKind::List)
            | (ValueKind::Text, ValueKind::Text)
            | (ValueKind::Struct(_), ValueKind::Struct(_))
            | (_, ValueKind::Packed)
    )
}

/// Decide how an assignment of `incoming` is stored
pub fn place(
    scope: Scope,
    observed: bool,
    incoming: &ValueKind,
    existing: Option<(StorageClass, &ValueKind)>,
) -> Result<Placement> {
    let Some((class, existing_kind)) = existing else {
        return Ok(Placement::New(match incoming {
            ValueKind::Scalar | ValueKind::Packed if observed => match scope {
                Scope::Function => StorageClass::StackBox,
                Scope::TopLevel => StorageClass::HeapBox,
            },
            ValueKind::Scalar => StorageClass::FastSlot,
            ValueKind::Packed => StorageClass::PackedSlot,
            ValueKind::Tracked => StorageClass::Alias,
            ValueKind::List | ValueKind::Text | ValueKind::Struct(_) => StorageClass::Handle,
        }));
    };

    let numeric = matches!(
        incoming,
        ValueKind::Scalar | ValueKind::Packed | ValueKind::Tracked
    );
    let decision = match class {
        StorageClass::FastSlot if numeric => Some(Placement::StoreScalar),
        StorageClass::StackBox | StorageClass::HeapBox | StorageClass::Alias if numeric => {
            Some(Placement::UpdateBox)
        }
        StorageClass::Handle if compatible_handles(existing_kind, incoming) => {
            Some(Placement::Rebind)
        }
        StorageClass::PackedSlot => Some(Placement::StorePacked),
        _ => None,
    };
    decision.ok_or_else(|| Error::InvalidConversion {
        from: incoming.to_string(),
        to: existing_kind.to_string(),
    })
}

/// Decide whether a new slot is a stack slot or a module global.
///
/// Library units keep every top-level binding in a global so other modules
/// can link against it. Program units keep fast and packed slots on the
/// stack unless a function body refers to the name (`shared`).
pub fn slot_home(scope: Scope, class: StorageClass, library: bool, shared: bool) -> SlotHome {
    match scope {
        Scope::Function => SlotHome::Stack,
        Scope::TopLevel if library || shared => SlotHome::ModuleGlobal,
        Scope::TopLevel => match class {
            StorageClass::FastSlot | StorageClass::PackedSlot | StorageClass::StackBox => {
                SlotHome::Stack
            }
            StorageClass::HeapBox | StorageClass::Alias | StorageClass::Handle => {
                SlotHome::ModuleGlobal
            }
        },
    }
}
