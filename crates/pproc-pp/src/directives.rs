//! Preprocessing directives (C11 6.10).
//!
//! Directive names live in the symbol table like everything else; a `#`
//! at the beginning of a line hands control here, and the name after it
//! is recognized by its symbol's current definition. Conditional
//! inclusion is a stack of two-flag frames over an artificial bottom
//! frame, which behaves as if the whole file were wrapped in an always
//! taken `#if 1` (so no transition needs a special case).

use pproc_lex::{Punct, Token};
use pproc_util::Symbol;

use crate::cpp::Preprocessor;
use crate::files::open_include;
use crate::macros::Macro;
use crate::symtab::{DefKind, SymbolTable};

const VA_ARGS_NAME: &str = "__VA_ARGS__";

/// The recognized directives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    Define,
    Elif,
    Else,
    Endif,
    Error,
    If,
    Ifdef,
    Ifndef,
    Include,
    Line,
    Pragma,
    Undef,
}

const DIRECTIVES: &[(&str, Directive)] = &[
    ("if", Directive::If),
    ("ifdef", Directive::Ifdef),
    ("ifndef", Directive::Ifndef),
    ("elif", Directive::Elif),
    ("else", Directive::Else),
    ("endif", Directive::Endif),
    ("include", Directive::Include),
    ("define", Directive::Define),
    ("undef", Directive::Undef),
    ("line", Directive::Line),
    ("error", Directive::Error),
    ("pragma", Directive::Pragma),
];

/// Registers every directive name in the (file) scope.
pub(crate) fn setup_directives(table: &mut SymbolTable) {
    for (name, directive) in DIRECTIVES {
        let symbol = table.insert(name);
        table.define(symbol, DefKind::Directive(*directive));
    }
}

/// One open conditional.
///
/// `skip_this_branch`: the branch currently being read must be
/// discarded. `skip_next_branch`: every further `#elif`/`#else` of this
/// frame must be discarded, either because a branch was already taken or
/// because an enclosing conditional is skipping.
#[derive(Debug)]
pub(crate) struct IfFrame {
    /// The `#if`/`#ifdef`/`#ifndef` token that opened the frame; the
    /// bottom sentinel has none.
    pub token: Option<Token>,
    pub skip_this_branch: bool,
    pub skip_next_branch: bool,
    /// An `#else` was seen; further `#elif`s are errors.
    pub seen_else: bool,
}

impl IfFrame {
    /// The artificial bottom of the stack: an open, taken branch that no
    /// `#elif`/`#else` may extend.
    pub fn bottom() -> Self {
        Self {
            token: None,
            skip_this_branch: false,
            skip_next_branch: true,
            seen_else: false,
        }
    }

    fn new(token: Token) -> Self {
        Self {
            token: Some(token),
            skip_this_branch: false,
            skip_next_branch: false,
            seen_else: false,
        }
    }
}

impl Preprocessor {
    /// True while any open conditional is discarding its current branch.
    pub(crate) fn skipping(&self) -> bool {
        self.ifs.last().is_some_and(|frame| frame.skip_this_branch)
    }

    /// Executes one directive. On entry the current token is the first
    /// token after the `#`; the lexer is already in `emit_eols` mode. On
    /// exit the current token is the directive line's EOL (or EOF) and
    /// the lexer modes are back to normal.
    pub(crate) fn parse_directive(&mut self) {
        if self.token.is_eol_or_eof() {
            // Null directive: a lone '#'.
            self.end_directive();
            return;
        }

        let directive = self.token.name().and_then(|s| self.symtab.directive(s));
        let Some(directive) = directive else {
            self.error(format!(
                "invalid preprocessing directive #{}",
                self.token.spelling
            ));
            self.skip_rest_of_line();
            self.end_directive();
            return;
        };

        let directive_token = self.token.clone();

        // Header-name lexing for the rest of an #include line.
        if directive == Directive::Include {
            if let Some(file) = self.file_stack.last_mut() {
                file.lexer.inside_include = true;
            }
        }

        self.next_token();

        match directive {
            Directive::Ifdef => {
                let cond = self.read_defined_operand();
                self.push_if(directive_token, cond);
                self.skip_rest_and_warn();
            }
            Directive::Ifndef => {
                let cond = !self.read_defined_operand();
                self.push_if(directive_token, cond);
                self.skip_rest_and_warn();
            }
            Directive::If => {
                // Constant expressions are not evaluated; the branch is
                // taken. See the project notes on this limitation.
                self.skip_rest_of_line();
                self.push_if(directive_token, true);
            }
            Directive::Elif => {
                self.skip_rest_of_line();
                self.process_elif();
            }
            Directive::Else => {
                self.process_else();
                self.skip_rest_and_warn();
            }
            Directive::Endif => {
                self.process_endif();
                self.skip_rest_and_warn();
            }
            Directive::Define => {
                self.parse_define();
            }
            Directive::Undef => {
                self.process_undef();
            }
            Directive::Include => {
                self.process_include();
                return;
            }
            Directive::Error => {
                self.process_error();
            }
            Directive::Line | Directive::Pragma => {
                // Recognized; semantics intentionally not implemented.
                self.skip_rest_of_line();
            }
        }

        self.end_directive();
    }

    /// Leaves directive mode: newlines stop producing EOL tokens and
    /// header-name lexing is off again.
    pub(crate) fn end_directive(&mut self) {
        if let Some(file) = self.file_stack.last_mut() {
            file.lexer.emit_eols = false;
            file.lexer.inside_include = false;
        }
    }

    /// Consumes tokens up to (not including) the line's EOL.
    pub(crate) fn skip_rest_of_line(&mut self) {
        while !self.token.is_eol_or_eof() {
            self.next_token();
        }
    }

    /// Like `skip_rest_of_line`, but warns when there was anything to
    /// skip; used where a directive is already complete.
    pub(crate) fn skip_rest_and_warn(&mut self) {
        if !self.token.is_eol_or_eof() {
            self.warn("extra tokens at end of directive will be ignored");
            self.skip_rest_of_line();
        }
    }

    /// Reads the macro-name operand of `#ifdef`/`#ifndef`; returns
    /// whether it is currently defined as a macro.
    fn read_defined_operand(&mut self) -> bool {
        match self.token.name() {
            Some(symbol) => {
                let defined = self.symtab.is_macro(symbol);
                self.next_token();
                defined
            }
            None => {
                self.error("macro name missing after #ifdef/#ifndef");
                false
            }
        }
    }

    /// Opens a conditional frame with condition `cond`.
    fn push_if(&mut self, token: Token, cond: bool) {
        let enclosing_skips = self.skipping();
        let mut frame = IfFrame::new(token);
        frame.skip_next_branch = enclosing_skips;
        frame.skip_this_branch = !cond || frame.skip_next_branch;
        frame.skip_next_branch |= !frame.skip_this_branch;
        self.ifs.push(frame);
    }

    fn process_elif(&mut self) {
        // Same unevaluated-expression stance as #if.
        let cond = true;
        let (bottom, seen_else) = match self.ifs.last() {
            None => return,
            Some(frame) => (frame.token.is_none(), frame.seen_else),
        };
        if bottom {
            self.error("#elif without matching #if");
            return;
        }
        if seen_else {
            self.error("#elif after #else");
            return;
        }
        if let Some(frame) = self.ifs.last_mut() {
            frame.skip_this_branch = !cond || frame.skip_next_branch;
            frame.skip_next_branch |= !frame.skip_this_branch;
        }
    }

    fn process_else(&mut self) {
        let (bottom, seen_else) = match self.ifs.last() {
            None => return,
            Some(frame) => (frame.token.is_none(), frame.seen_else),
        };
        if bottom {
            self.error("#else without matching #if");
            return;
        }
        if seen_else {
            self.error("#else after #else");
            return;
        }
        if let Some(frame) = self.ifs.last_mut() {
            frame.skip_this_branch = frame.skip_next_branch;
            frame.seen_else = true;
        }
    }

    fn process_endif(&mut self) {
        let bottom = self.ifs.last().map_or(true, |frame| frame.token.is_none());
        if bottom {
            self.error("#endif without matching #if");
        } else {
            self.ifs.pop();
        }
    }

    /// `#define NAME [(params)] replacement...`
    fn parse_define(&mut self) {
        if self.skipping() {
            self.skip_rest_of_line();
            return;
        }

        let Some(name) = self.token.name() else {
            self.error("macro name missing after #define");
            self.skip_rest_and_warn();
            return;
        };

        if self.symtab.macro_ref(name).is_some_and(|m| m.builtin) {
            self.warn(format!("redefining builtin macro \"{}\"", name));
        }

        let mut mac = Macro::new(name);
        self.next_token();

        // A '(' glued to the name makes the macro function-like; with
        // whitespace in between it is part of the replacement list.
        if self.token.is_punct(Punct::LParen) && !self.token.after_white {
            mac.funclike = true;
            self.next_token();
            self.parse_macro_arglist(&mut mac);
        }

        while !self.token.is_eol_or_eof() {
            mac.replacement.insert_last(self.token.clone());
            self.next_token();
        }

        if mac
            .replacement
            .first()
            .is_some_and(|t| t.is_punct(Punct::HashHash))
            || mac
                .replacement
                .last()
                .is_some_and(|t| t.is_punct(Punct::HashHash))
        {
            self.error("'##' cannot appear at either end of a macro replacement list");
        }

        tracing::debug!(macro_name = %name, funclike = mac.funclike, "defined");
        self.symtab.define(name, DefKind::Macro(mac));
    }

    /// Parses the formal-parameter list of a function-like `#define`;
    /// the current token is the one after `(`.
    fn parse_macro_arglist(&mut self, mac: &mut Macro) {
        let mut expect_comma = false;
        let mut ended = false;
        let mut after_ellipsis = false;

        while !self.token.is_eol_or_eof() {
            if self.token.is_punct(Punct::Comma) {
                if !expect_comma {
                    self.error("unexpected comma in macro parameter list");
                }
                expect_comma = false;
                self.next_token();
                continue;
            }

            if self.token.is_punct(Punct::RParen) {
                ended = true;
                self.next_token();
                break;
            }

            if expect_comma {
                // Act as if the comma were there and keep going.
                self.error("expected comma in macro parameter list");
            }

            if after_ellipsis {
                self.error("no macro parameters may follow '...'");
            }

            if self.token.is_punct(Punct::Ellipsis) {
                let va_args = Symbol::intern(VA_ARGS_NAME);
                let mut param = self.token.clone();
                param.kind = pproc_lex::TokenKind::Name(va_args);
                mac.params.insert_last(param);
                mac.variadic = true;
                after_ellipsis = true;
            } else if self.token.is_name() {
                mac.params.insert_last(self.token.clone());
            } else {
                self.error(format!(
                    "expected parameter name, got \"{}\"",
                    self.token.spelling
                ));
            }

            expect_comma = true;
            self.next_token();
        }

        if !ended {
            self.error("macro parameter list not terminated with ')'");
        }
    }

    /// `#undef NAME` - pops the current macro definition.
    fn process_undef(&mut self) {
        if self.skipping() {
            self.skip_rest_of_line();
            return;
        }

        let Some(name) = self.token.name() else {
            self.error("macro name missing after #undef");
            self.skip_rest_and_warn();
            return;
        };

        if self.symtab.is_macro(name) {
            self.symtab.pop_definition(name);
        } else {
            self.warn(format!("\"{}\" is not defined as a macro", name));
        }

        self.next_token();
        self.skip_rest_and_warn();
    }

    /// `#error tokens...` - the rest of the line becomes the message.
    fn process_error(&mut self) {
        if self.skipping() {
            self.skip_rest_of_line();
            return;
        }

        let mut text = String::from("#error");
        while !self.token.is_eol_or_eof() {
            text.push(' ');
            text.push_str(&self.token.spelling);
            self.next_token();
        }
        self.error(text);
    }

    /// `#include <h>` / `#include "h"` - resolves the header and pushes
    /// it onto the file stack. Handles its own directive epilogue since
    /// the current token must be parked before the push.
    fn process_include(&mut self) {
        if self.skipping() {
            self.skip_rest_of_line();
            self.end_directive();
            return;
        }

        let header = match &self.token.kind {
            pproc_lex::TokenKind::HeaderName { name, .. } => name.clone(),
            _ => {
                self.error(format!(
                    "header name expected, got \"{}\"",
                    self.token.spelling
                ));
                self.skip_rest_of_line();
                self.end_directive();
                return;
            }
        };

        match open_include(&self.include_dirs, &header, std::rc::Rc::clone(&self.errlist)) {
            Ok(file) => {
                self.next_token();
                self.skip_rest_and_warn();
                // Normal lexing resumes both in the new file and, later,
                // where this one left off.
                self.end_directive();
                self.push_file(file);
            }
            Err(err) => {
                self.error(format!("cannot include file {}: {}", header, err));
                self.skip_rest_of_line();
                self.end_directive();
            }
        }
    }
}
