//! A frontend for a subset of TypeScript.
//!
//! Files are scanned and parsed into a statement-level syntax tree, bound
//! into module scopes, checked, and printed back as JavaScript and
//! declaration files.

pub mod ast;
pub mod binder;
pub mod checker;
pub mod declarations;
pub mod javascript;
pub mod lib_file;
pub mod parser;
pub mod printer;
pub mod scanner;
pub mod source_map;
pub mod types;
