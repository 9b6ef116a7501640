//! Programs, hosts, and emit for the Strata incremental compiler.
//!
//! The [`Program`] and [`TypeChecker`] traits are what the incremental engine
//! consumes. [`CompilerProgram`] implements them over a small TypeScript
//! subset, reading inputs and writing outputs through a [`Host`].

#![warn(missing_docs)]

pub mod compiler;
pub mod emit;
pub mod frontend;
pub mod host;
pub mod program;
pub mod source_file;

pub use compiler::{CompilerProgram, OutputPaths};
pub use emit::{could_not_write_file, EmitOnly, EmitOptions, EmitResult, HostWriter, WriteFile, WriteFileData};
pub use host::{Host, MemoryHost, OsHost};
pub use program::{ExportedSymbol, Program, SymbolFlags, TypeChecker};
pub use source_file::{FileReference, ModuleAugmentation, ResolutionMode, SourceFile};
