//! Error types for the EigenScript code generator

use thiserror::Error;

/// Code generation errors
#[derive(Error, Debug, Clone)]
pub enum Error {
    // User-facing diagnostics
    /// Reference to a name that is neither bound locally nor resolvable as an import
    ///
    /// **Triggered by:** Reading a variable in the entry body before any assignment
    /// **Example:** `print of totl` (when only `total` was defined)
    /// **Prevention:** Assign the variable first, or list it as an imported name
    #[error("Undefined variable: {name}")]
    UndefinedName {
        /// Variable name
        name: String,
        /// Suggestion built from the names currently in scope
        hint: Option<String>,
    },

    /// Struct literal with the wrong number of field values
    ///
    /// **Triggered by:** `Point of [1]` when `Point` declares two fields
    #[error("Struct '{name}' expects {expected} field(s), got {got}")]
    StructArity {
        /// Struct type name
        name: String,
        /// Declared field count
        expected: usize,
        /// Supplied value count
        got: usize,
    },

    /// Struct literal or field access naming an unknown struct type
    #[error("Unknown struct type: {name}")]
    UnknownStruct {
        /// Struct type name (or field name when the type could not be inferred)
        name: String,
        /// Suggestion listing known struct types
        hint: Option<String>,
    },

    /// Operator or interrogative with no lowering for the given operands
    ///
    /// **Triggered by:** Unsupported operator symbols, `who is x`, indexing a number
    #[error("Invalid operator: {operator}")]
    InvalidOperator {
        /// Operator spelling
        operator: String,
        /// What the operator can be used with
        hint: Option<String>,
    },

    /// `break` used outside a loop body
    #[error("'break' outside loop")]
    BreakOutsideLoop {
        /// Usage reminder
        hint: Option<String>,
    },

    /// One symbol used both as a variable and as a function
    ///
    /// **Triggered by:** `a is foo` and `foo of 1` in function bodies when
    /// neither is defined in this unit, or a library variable and function
    /// with the same name
    #[error("Conflicting uses of symbol: {symbol}")]
    SymbolConflict {
        /// Link-time symbol
        symbol: String,
        /// How the symbol is already used
        hint: Option<String>,
    },

    // Generator defects
    /// Generator reached a state upstream analysis should have ruled out
    #[error("Internal compiler error: {message}")]
    Internal {
        /// Description of the defect
        message: String,
    },

    /// Impossible value-kind conversion requested by the emitter
    #[error("Internal compiler error: cannot convert {from} to {to}")]
    InvalidConversion {
        /// Source value kind
        from: String,
        /// Requested value kind
        to: String,
    },

    /// Emitted IR failed verification
    #[error("IR verification failed:\n{}", errors.join("\n"))]
    VerificationFailed {
        /// One rendered line per verifier error
        errors: Vec<String>,
    },

    // Environment errors
    /// Filesystem failure while reading input or writing output
    #[error("I/O error on {path}: {message}")]
    Io {
        /// Path being accessed
        path: String,
        /// Underlying OS error
        message: String,
    },

    /// AST document could not be deserialized
    #[error("Malformed AST input: {0}")]
    InputFormat(String),

    /// External tool ran but reported failure
    #[error("{tool} failed: {message}")]
    Toolchain {
        /// Executable name
        tool: String,
        /// Exit status and captured stderr
        message: String,
    },

    /// External tool could not be started
    #[error("'{tool}' not found in PATH")]
    ToolNotFound {
        /// Executable name
        tool: String,
    },
}

/// Broad error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Problem in the user's program, reported with an optional hint
    Diagnostic,
    /// Defect in the generator itself; must never happen for valid input
    Defect,
    /// Filesystem, input format, or external tool failure
    Environment,
}

impl Error {
    /// Create an internal (defect) error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal {
            message: msg.into(),
        }
    }

    /// Create a toolchain failure for the given executable
    pub fn toolchain(tool: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Toolchain {
            tool: tool.into(),
            message: msg.into(),
        }
    }

    /// Create an I/O error annotated with the path involved
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    /// Create an undefined-name diagnostic
    pub fn undefined(name: impl Into<String>, hint: Option<String>) -> Self {
        Error::UndefinedName {
            name: name.into(),
            hint,
        }
    }

    /// Create an invalid-operator diagnostic
    pub fn invalid_operator(operator: impl Into<String>, hint: impl Into<String>) -> Self {
        Error::InvalidOperator {
            operator: operator.into(),
            hint: Some(hint.into()),
        }
    }

    /// Classify the error
    pub fn classify(&self) -> ErrorKind {
        match self {
            Error::UndefinedName { .. }
            | Error::StructArity { .. }
            | Error::UnknownStruct { .. }
            | Error::InvalidOperator { .. }
            | Error::BreakOutsideLoop { .. }
            | Error::SymbolConflict { .. } => ErrorKind::Diagnostic,

            Error::Internal { .. }
            | Error::InvalidConversion { .. }
            | Error::VerificationFailed { .. } => ErrorKind::Defect,

            Error::Io { .. }
            | Error::InputFormat(_)
            | Error::Toolchain { .. }
            | Error::ToolNotFound { .. } => ErrorKind::Environment,
        }
    }

    /// True for generator defects
    pub fn is_internal(&self) -> bool {
        self.classify() == ErrorKind::Defect
    }

    /// Hint attached to a user-facing diagnostic, if any
    pub fn hint(&self) -> Option<&str> {
        match self {
            Error::UndefinedName { hint, .. }
            | Error::UnknownStruct { hint, .. }
            | Error::InvalidOperator { hint, .. }
            | Error::SymbolConflict { hint, .. }
            | Error::BreakOutsideLoop { hint } => hint.as_deref(),
            _ => None,
        }
    }

    /// One-line message plus hint, as printed by the driver
    pub fn enhanced_message(&self) -> String {
        match self.hint() {
            Some(hint) => format!("{}\n  hint: {}", self, hint),
            None => self.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InputFormat(err.to_string())
    }
}

/// Result type for code generation
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(
            Error::undefined("x", None).classify(),
            ErrorKind::Diagnostic
        );
        assert!(Error::internal("boom").is_internal());
        assert!(Error::InvalidConversion {
            from: "List".into(),
            to: "Tracked".into()
        }
        .is_internal());
        assert!(!Error::ToolNotFound { tool: "llc".into() }.is_internal());
    }

    #[test]
    fn test_enhanced_message_includes_hint() {
        let err = Error::undefined("totl", Some("Did you mean: total?".into()));
        let msg = err.enhanced_message();
        assert!(msg.contains("Undefined variable: totl"));
        assert!(msg.contains("hint: Did you mean: total?"));
    }
}
