//! Symbol table with lexical scoping.
//!
//! Every name the preprocessor cares about (directive names, macros,
//! macro arguments, C keywords) maps to a stack of definitions; the top
//! of the stack is what the name currently means. Scopes tie definitions
//! to a lifetime: each scope frame remembers which symbols were defined
//! while it was open, and ending the scope pops exactly those
//! definitions, newest first. The file scope at the bottom is permanent.
//!
//! Macro-argument binding is the hot path here: invoking a function-like
//! macro opens a scope, redefines each formal parameter as a
//! macro-argument, and closes the scope before rescanning.

use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use rustc_hash::FxHasher;

use pproc_util::Symbol;

use crate::directives::Directive;
use crate::macros::{Macro, MacroArg};

/// What a symbol currently means.
#[derive(Clone, Debug)]
pub enum DefKind {
    /// A preprocessing directive name (`define`, `ifdef`, ...).
    Directive(Directive),
    /// An object-like or function-like macro.
    Macro(Macro),
    /// A formal parameter bound during a function-like invocation.
    MacroArg(MacroArg),
    /// A C language keyword (meaningful to the downstream parser only).
    Keyword,
    /// Defined but not yet given a meaning; also what an undefined
    /// symbol reads as.
    Undefined,
}

const UNDEFINED: DefKind = DefKind::Undefined;

#[derive(Debug, Default)]
struct Scope {
    /// Symbols that received a definition while this scope was open, in
    /// definition order.
    defs: Vec<Symbol>,
}

/// Name → definition-stack mapping plus the scope stack.
#[derive(Debug)]
pub struct SymbolTable {
    entries: IndexMap<Symbol, Vec<DefKind>, BuildHasherDefault<FxHasher>>,
    scopes: Vec<Scope>,
}

impl SymbolTable {
    /// Creates a table containing only the permanent file scope.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::default(),
            scopes: vec![Scope::default()],
        }
    }

    /// Makes sure `name` has an entry (with an empty definition stack if
    /// new) and returns its symbol. Idempotent.
    pub fn insert(&mut self, name: &str) -> Symbol {
        let symbol = Symbol::intern(name);
        self.entries.entry(symbol).or_default();
        symbol
    }

    /// True if the symbol has ever been entered into the table.
    pub fn contains(&self, symbol: Symbol) -> bool {
        self.entries.contains_key(&symbol)
    }

    /// The symbol's current definition; `Undefined` when it has none.
    pub fn current(&self, symbol: Symbol) -> &DefKind {
        self.entries
            .get(&symbol)
            .and_then(|defs| defs.last())
            .unwrap_or(&UNDEFINED)
    }

    /// Mutable access to the current definition, if any.
    pub fn current_mut(&mut self, symbol: Symbol) -> Option<&mut DefKind> {
        self.entries.get_mut(&symbol).and_then(|defs| defs.last_mut())
    }

    /// Pushes a new definition for `symbol`, owned by the innermost open
    /// scope. The new definition shadows whatever was current.
    pub fn define(&mut self, symbol: Symbol, kind: DefKind) {
        self.entries.entry(symbol).or_default().push(kind);
        self.scopes
            .last_mut()
            .expect("file scope is permanent")
            .defs
            .push(symbol);
    }

    /// Pops the symbol's current definition (for `#undef`). Returns the
    /// removed definition, or `None` if the symbol had none. The owning
    /// scope's ledger is updated so a later scope end stays balanced.
    pub fn pop_definition(&mut self, symbol: Symbol) -> Option<DefKind> {
        let removed = self.entries.get_mut(&symbol).and_then(|defs| defs.pop())?;
        for scope in self.scopes.iter_mut().rev() {
            if let Some(at) = scope.defs.iter().rposition(|&s| s == symbol) {
                scope.defs.remove(at);
                break;
            }
        }
        Some(removed)
    }

    /// Opens a new scope.
    pub fn scope_begin(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Closes the innermost scope, popping its definitions in LIFO order.
    /// The file scope cannot be closed.
    pub fn scope_end(&mut self) {
        debug_assert!(self.scopes.len() > 1, "file scope cannot end");
        if self.scopes.len() <= 1 {
            return;
        }
        if let Some(scope) = self.scopes.pop() {
            for symbol in scope.defs.into_iter().rev() {
                if let Some(defs) = self.entries.get_mut(&symbol) {
                    defs.pop();
                }
            }
        }
    }

    /// The current definition as a macro, if it is one.
    pub fn macro_ref(&self, symbol: Symbol) -> Option<&Macro> {
        match self.current(symbol) {
            DefKind::Macro(m) => Some(m),
            _ => None,
        }
    }

    pub fn macro_mut(&mut self, symbol: Symbol) -> Option<&mut Macro> {
        match self.current_mut(symbol)? {
            DefKind::Macro(m) => Some(m),
            _ => None,
        }
    }

    /// The current definition as a bound macro argument, if it is one.
    pub fn macro_arg_ref(&self, symbol: Symbol) -> Option<&MacroArg> {
        match self.current(symbol) {
            DefKind::MacroArg(arg) => Some(arg),
            _ => None,
        }
    }

    pub fn is_macro(&self, symbol: Symbol) -> bool {
        matches!(self.current(symbol), DefKind::Macro(_))
    }

    pub fn is_macro_arg(&self, symbol: Symbol) -> bool {
        matches!(self.current(symbol), DefKind::MacroArg(_))
    }

    /// The directive this symbol names, if any.
    pub fn directive(&self, symbol: Symbol) -> Option<Directive> {
        match self.current(symbol) {
            DefKind::Directive(d) => Some(*d),
            _ => None,
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_macro(name: Symbol) -> Macro {
        Macro::new(name)
    }

    #[test]
    fn undefined_symbol_reads_as_undefined() {
        let table = SymbolTable::new();
        let sym = Symbol::intern("nothing_here");
        assert!(matches!(table.current(sym), DefKind::Undefined));
        assert!(!table.contains(sym));
    }

    #[test]
    fn insert_is_idempotent() {
        let mut table = SymbolTable::new();
        let a = table.insert("x");
        let b = table.insert("x");
        assert_eq!(a, b);
        assert!(table.contains(a));
        assert!(matches!(table.current(a), DefKind::Undefined));
    }

    #[test]
    fn define_shadows_and_undef_restores() {
        let mut table = SymbolTable::new();
        let sym = table.insert("M");

        table.define(sym, DefKind::Keyword);
        table.define(sym, DefKind::Macro(test_macro(sym)));
        assert!(table.is_macro(sym));

        table.pop_definition(sym);
        assert!(matches!(table.current(sym), DefKind::Keyword));

        table.pop_definition(sym);
        assert!(matches!(table.current(sym), DefKind::Undefined));
        assert!(table.pop_definition(sym).is_none());
    }

    #[test]
    fn scope_end_pops_only_its_definitions() {
        let mut table = SymbolTable::new();
        let outer = table.insert("outer");
        let inner = table.insert("inner");

        table.define(outer, DefKind::Macro(test_macro(outer)));

        table.scope_begin();
        table.define(inner, DefKind::MacroArg(MacroArg::default()));
        table.define(outer, DefKind::MacroArg(MacroArg::default()));
        assert!(table.is_macro_arg(outer));
        assert!(table.is_macro_arg(inner));
        table.scope_end();

        assert!(table.is_macro(outer));
        assert!(matches!(table.current(inner), DefKind::Undefined));
    }

    #[test]
    fn nested_scopes_unwind_in_order() {
        let mut table = SymbolTable::new();
        let sym = table.insert("p");

        table.scope_begin();
        table.define(sym, DefKind::MacroArg(MacroArg::default()));
        table.scope_begin();
        table.define(sym, DefKind::Undefined);
        assert!(matches!(table.current(sym), DefKind::Undefined));
        table.scope_end();
        assert!(table.is_macro_arg(sym));
        table.scope_end();
        assert!(matches!(table.current(sym), DefKind::Undefined));
    }

    #[test]
    fn undef_inside_scope_keeps_ledger_balanced() {
        let mut table = SymbolTable::new();
        let sym = table.insert("q");

        table.define(sym, DefKind::Keyword);
        table.scope_begin();
        table.define(sym, DefKind::Undefined);
        table.pop_definition(sym);
        // The scope's only definition is already gone; ending the scope
        // must not pop the keyword underneath.
        table.scope_end();
        assert!(matches!(table.current(sym), DefKind::Keyword));
    }

    #[test]
    fn directive_lookup() {
        let mut table = SymbolTable::new();
        let sym = table.insert("define");
        table.define(sym, DefKind::Directive(Directive::Define));
        assert_eq!(table.directive(sym), Some(Directive::Define));
        assert!(!table.is_macro(sym));
    }
}
