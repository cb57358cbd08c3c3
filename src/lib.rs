//! # eigenc - EigenScript ahead-of-time code generator
//!
//! Lowers an analyzed EigenScript unit to typed SSA IR in LLVM textual form,
//! then drives the external backend and linker to produce object files,
//! native executables or WebAssembly modules.
//!
//! ## Features
//!
//! - **Observer-driven placement** - only variables the analysis marks as
//!   observed pay for heap-boxed state tracking; everything else is a plain
//!   `double` in a register or stack slot
//! - **Uniform ABI** - every user function takes and returns 64-bit slots,
//!   so values of any kind cross call boundaries the same way
//! - **Multi-module linking** - library units export `{module}_`-prefixed
//!   symbols and an initializer; programs call initializers in import order
//! - **Deterministic output** - identical input yields byte-identical IR
//!
//! ## Quick Start
//!
//! ```rust
//! use eigenc::{CompileOptions, Compiler, Node, SourceUnit};
//!
//! # fn main() -> eigenc::Result<()> {
//! // x is 10
//! // print of x
//! let unit = SourceUnit::new(vec![
//!     Node::assign("x", Node::num(10.0)),
//!     Node::call("print", Node::ident("x")),
//! ]);
//!
//! let result = Compiler::new(CompileOptions::default()).compile(&unit)?;
//! assert!(result.ir_text.contains("define i32 @main()"));
//! assert!(result.ir_text.contains("call void @eigen_print_double"));
//! # Ok(())
//! # }
//! ```
//!
//! ### Observed variables
//!
//! ```rust
//! use eigenc::{CompileOptions, Compiler, Node, SourceUnit};
//!
//! # fn main() -> eigenc::Result<()> {
//! let mut options = CompileOptions::default();
//! options.observed.insert("x".to_string());
//!
//! let unit = SourceUnit::new(vec![Node::assign("x", Node::num(1.0))]);
//! let result = Compiler::new(options).compile(&unit)?;
//!
//! // x is boxed, and the box is released before main returns
//! assert!(result.ir_text.contains("call ptr @eigen_create"));
//! assert!(result.ir_text.contains("call void @eigen_destroy"));
//! assert_eq!(result.cleanup_count, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`ast`] - the AST consumed from the front end (JSON, serde)
//! - [`compiler`] - IR generation, verification and toolchain driving
//! - [`error`] - error types
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, Error>`](Result). User-facing
//! diagnostics carry an optional hint:
//!
//! ```rust
//! use eigenc::{CompileOptions, Compiler, Error, Node, SourceUnit};
//!
//! let unit = SourceUnit::new(vec![Node::call("print", Node::ident("totl"))]);
//! match Compiler::new(CompileOptions::default()).compile(&unit) {
//!     Err(Error::UndefinedName { name, .. }) => assert_eq!(name, "totl"),
//!     other => panic!("expected an undefined-name diagnostic, got {:?}", other),
//! }
//! ```

#![warn(missing_docs)]
#![allow(clippy::collapsible_match)] // Separate error handling for clarity

/// Version of the code generator
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod ast;
pub mod compiler;
pub mod error;

// Re-export main types
pub use ast::{ImportSpec, Literal, Node, SourceUnit};
pub use compiler::{
    CompileMode, CompileOptions, CompileResult, Compiler, EmitKind, TargetInfo, Toolchain,
};
pub use error::{Error, ErrorKind, Result};
