//! pproc-pp - Directive execution and macro expansion.
//!
//! This crate is translation phase 4. The [`Preprocessor`] pulls tokens
//! from a stack of open files (lexed by `pproc-lex`), executes
//! `#`-directives against its symbol table and conditional-inclusion
//! stack, expands macro invocations, and hands the consumer a stream of
//! cooked tokens: directives gone, macros replaced, adjacent string
//! literals merged, every stream terminated by EOF.

pub mod cpp;
pub mod directives;
pub mod files;
pub mod keyword;
pub mod macros;
pub mod symtab;

pub use cpp::Preprocessor;
pub use directives::Directive;
pub use files::IncludeError;
pub use macros::{Builtin, Macro, MacroArg};
pub use symtab::{DefKind, SymbolTable};
