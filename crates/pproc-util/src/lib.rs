//! pproc-util - Shared infrastructure for the pproc preprocessor.
//!
//! This crate holds the pieces every phase needs: interned identifier
//! symbols, source locations, and the diagnostic sink the preprocessor
//! reports into. Nothing here knows about tokens or directives.

pub mod errlist;
pub mod location;
pub mod symbol;

pub use errlist::{Diagnostic, ErrorList, Level};
pub use location::Location;
pub use symbol::Symbol;
