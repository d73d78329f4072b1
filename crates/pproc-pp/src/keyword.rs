//! C11 keywords.
//!
//! Keywords are registered in the file scope so the name space is
//! complete: the downstream parser finds them as keyword definitions
//! rather than plain names. The preprocessor itself treats them like any
//! other identifier (a keyword can even be `#define`d, shadowing the
//! keyword definition until `#undef`).

use crate::symtab::{DefKind, SymbolTable};

/// C11 6.4.1 keyword list.
pub const KEYWORDS: &[&str] = &[
    "auto",
    "break",
    "case",
    "char",
    "const",
    "continue",
    "default",
    "do",
    "double",
    "else",
    "enum",
    "extern",
    "float",
    "for",
    "goto",
    "if",
    "inline",
    "int",
    "long",
    "register",
    "restrict",
    "return",
    "short",
    "signed",
    "sizeof",
    "static",
    "struct",
    "switch",
    "typedef",
    "union",
    "unsigned",
    "void",
    "volatile",
    "while",
    "_Alignas",
    "_Alignof",
    "_Atomic",
    "_Bool",
    "_Complex",
    "_Generic",
    "_Imaginary",
    "_Noreturn",
    "_Static_assert",
    "_Thread_local",
];

/// Defines every keyword in the (current) file scope.
pub fn setup_keywords(table: &mut SymbolTable) {
    for keyword in KEYWORDS {
        let symbol = table.insert(keyword);
        table.define(symbol, DefKind::Keyword);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pproc_util::Symbol;

    #[test]
    fn keywords_are_seeded() {
        let mut table = SymbolTable::new();
        setup_keywords(&mut table);
        assert!(matches!(
            table.current(Symbol::intern("while")),
            DefKind::Keyword
        ));
        assert!(matches!(
            table.current(Symbol::intern("_Static_assert")),
            DefKind::Keyword
        ));
    }

    #[test]
    fn keywords_are_not_macros() {
        let mut table = SymbolTable::new();
        setup_keywords(&mut table);
        assert!(!table.is_macro(Symbol::intern("int")));
    }
}
