//! Interned identifier symbols.
//!
//! Every identifier that the lexer produces is interned exactly once in a
//! process-wide string table; the `Symbol` handle it gets back is a small
//! copyable index. Two identifiers are the same name iff their symbols
//! compare equal, which is what the symbol table and the macro engine key
//! on.
//!
//! Interned strings are leaked on purpose: the table lives for the whole
//! process, entries are never removed, and the `'static` references avoid
//! lifetime plumbing through every token.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::LazyLock;

use ahash::RandomState;
use dashmap::DashMap;

static STRING_TABLE: LazyLock<StringTable> = LazyLock::new(StringTable::new);

/// A handle to an interned identifier string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// Interns `name`, returning the existing handle if the string has
    /// been seen before.
    pub fn intern(name: &str) -> Symbol {
        STRING_TABLE.intern(name)
    }

    /// Returns the interned string this symbol stands for.
    pub fn as_str(self) -> &'static str {
        STRING_TABLE.get(self)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The process-wide intern table.
///
/// Both maps use ahash. The forward map answers "have we seen this
/// string"; the reverse map makes `Symbol::as_str` O(1).
struct StringTable {
    names: DashMap<&'static str, u32, RandomState>,
    strings: DashMap<u32, &'static str, RandomState>,
    next_index: AtomicU32,
}

impl StringTable {
    fn new() -> Self {
        Self {
            names: DashMap::with_hasher(RandomState::new()),
            strings: DashMap::with_hasher(RandomState::new()),
            next_index: AtomicU32::new(0),
        }
    }

    fn intern(&self, name: &str) -> Symbol {
        if let Some(entry) = self.names.get(name) {
            return Symbol(*entry.value());
        }

        let interned: &'static str = Box::leak(name.to_string().into_boxed_str());
        match self.names.entry(interned) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                // Raced with another intern of the same string; the leaked
                // copy above is wasted but the handle is shared.
                Symbol(*entry.get())
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let index = self.next_index.fetch_add(1, Ordering::Relaxed);
                entry.insert(index);
                self.strings.insert(index, interned);
                Symbol(index)
            }
        }
    }

    fn get(&self, symbol: Symbol) -> &'static str {
        self.strings
            .get(&symbol.0)
            .map(|entry| *entry.value())
            .unwrap_or("")
    }
}
