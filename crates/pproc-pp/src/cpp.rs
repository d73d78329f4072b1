//! The preprocessor driver.
//!
//! [`Preprocessor`] owns all per-translation-unit state: the symbol
//! table, the conditional-inclusion stack, the include-file stack, and a
//! pending-token queue that macro expansions are prepended to. The
//! public [`Preprocessor::next`] streams cooked tokens: directives have
//! been executed, macros expanded, skipped branches discarded, and
//! adjacent string literals merged. The stream always ends with EOF,
//! which is repeated if asked again.

use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use pproc_lex::token::escape_string_bytes;
use pproc_lex::{EncPrefix, Lexer, Punct, Token, TokenKind, TokenList};
use pproc_util::{Diagnostic, ErrorList, Level};

use crate::directives::{setup_directives, IfFrame};
use crate::files::SourceFile;
use crate::keyword::setup_keywords;
use crate::symtab::SymbolTable;

/// Preprocessor state for one translation unit.
pub struct Preprocessor {
    pub(crate) symtab: SymbolTable,
    pub(crate) errlist: Rc<ErrorList>,
    /// `-I` directories, searched before the built-in include path.
    pub(crate) include_dirs: Vec<PathBuf>,
    /// LIFO include stack; the root file sits at the bottom.
    pub(crate) file_stack: Vec<SourceFile>,
    /// Tokens queued in front of the lexer (expansions, re-parked
    /// lookaheads).
    pub(crate) tokens: TokenList,
    /// The token currently under consideration.
    pub(crate) token: Token,
    /// Conditional-inclusion stack; index 0 is the artificial bottom.
    pub(crate) ifs: Vec<IfFrame>,
    /// Unbalanced `#if`s have been reported already.
    reported_open_ifs: bool,
}

impl Preprocessor {
    /// Creates a preprocessor with keywords, directive names, and the
    /// predefined macros set up in the file scope.
    pub fn new(errlist: Rc<ErrorList>) -> Self {
        let mut pp = Self {
            symtab: SymbolTable::new(),
            errlist,
            include_dirs: Vec::new(),
            file_stack: Vec::new(),
            tokens: TokenList::new(),
            token: Token::synthetic(TokenKind::Eof, ""),
            ifs: vec![IfFrame::bottom()],
            reported_open_ifs: false,
        };
        setup_keywords(&mut pp.symtab);
        setup_directives(&mut pp.symtab);
        pp.setup_builtin_macros();
        pp
    }

    /// Adds a directory to the front part of the `#include` search path.
    pub fn add_include_dir(&mut self, dir: PathBuf) {
        self.include_dirs.push(dir);
    }

    pub fn errlist(&self) -> &Rc<ErrorList> {
        &self.errlist
    }

    /// Opens `path` as the translation unit (or pushes it over the
    /// current file) and primes the token stream.
    pub fn open(&mut self, path: &Path) -> io::Result<()> {
        let file = SourceFile::open(path, Rc::clone(&self.errlist))?;
        self.push_file(file);
        Ok(())
    }

    /// Opens an in-memory buffer under the given name.
    pub fn open_source(&mut self, name: &str, source: &str) {
        let file = SourceFile::from_source(name, source, Rc::clone(&self.errlist));
        self.push_file(file);
    }

    /// Pushes `file` onto the include stack. The token currently in
    /// hand belongs to the covered file and is parked on its deferred
    /// queue, to be re-read when `file` is exhausted.
    pub(crate) fn push_file(&mut self, file: SourceFile) {
        if let Some(covered) = self.file_stack.last_mut() {
            let parked = std::mem::replace(&mut self.token, Token::synthetic(TokenKind::Eof, ""));
            covered.deferred.insert_first(parked);
        }
        tracing::debug!(file = %file.filename, depth = self.file_stack.len() + 1, "push file");
        self.file_stack.push(file);
        self.next_token();
    }

    /// Pops the finished top file and resumes the one below it.
    fn pop_file(&mut self) {
        if let Some(done) = self.file_stack.pop() {
            tracing::debug!(file = %done.filename, depth = self.file_stack.len(), "pop file");
        }
        if let Some(resumed) = self.file_stack.last_mut() {
            let mut deferred = std::mem::take(&mut resumed.deferred);
            self.tokens.prepend(&mut deferred);
        }
    }

    /// Advances `self.token`: pending queue first, then the current
    /// file's lexer. The EOF token works as a guard: once the stream is
    /// dry it just keeps coming back.
    pub(crate) fn next_token(&mut self) {
        self.token = if let Some(token) = self.tokens.remove_first() {
            token
        } else if let Some(file) = self.file_stack.last_mut() {
            file.lexer.next_token()
        } else {
            Token::synthetic(TokenKind::Eof, "")
        };
    }

    /// Puts the current token back at the front of the pending queue.
    pub(crate) fn requeue_current(&mut self) {
        self.tokens.insert_first(self.token.clone());
    }

    /// One token of lookahead; the stream is left as it was.
    pub fn peek(&mut self) -> Token {
        let saved = self.token.clone();
        self.next_token();
        let peeked = self.token.clone();
        self.requeue_current();
        self.token = saved;
        peeked
    }

    fn got_hash(&self) -> bool {
        self.token.is_punct(Punct::Hash) && self.token.at_bol
    }

    /// Works the stream until the current token is one the consumer
    /// should see: executes directives, expands macro invocations, and
    /// discards tokens inside skipped conditional branches.
    fn parse(&mut self) {
        while !self.token.is_eof() {
            if self.got_hash() {
                if let Some(file) = self.file_stack.last_mut() {
                    file.lexer.emit_eols = true;
                }
                self.next_token();
                self.parse_directive();
                continue;
            }

            let macro_name = self
                .token
                .name()
                .filter(|s| !self.token.noexpand && self.symtab.is_macro(*s));

            if let Some(symbol) = macro_name {
                let funclike = self.symtab.macro_ref(symbol).is_some_and(|m| m.funclike);
                if funclike {
                    // A function-like macro name only expands when an
                    // opening paren follows; look one token ahead.
                    let name_token = self.token.clone();
                    self.next_token();
                    if self.token.is_punct(Punct::LParen) {
                        let paren = std::mem::replace(&mut self.token, name_token);
                        self.tokens.insert_first(paren);
                        self.parse_macro_invocation();
                    } else {
                        // Not an invocation; the name passes through and
                        // stays unexpandable through later rescans.
                        let lookahead = std::mem::replace(&mut self.token, name_token);
                        self.tokens.insert_first(lookahead);
                        self.token.noexpand = true;
                    }
                } else {
                    self.parse_macro_invocation();
                }
                continue;
            }

            if !self.skipping() {
                break;
            }
            self.next_token();
        }
    }

    /// Collects the full invocation at the current (macro name) token,
    /// expands it, and prepends the expansion to the pending queue.
    fn parse_macro_invocation(&mut self) {
        let Some(symbol) = self.token.name() else {
            return;
        };
        let funclike = self.symtab.macro_ref(symbol).is_some_and(|m| m.funclike);

        let mut invocation = TokenList::new();
        invocation.insert_last(self.token.clone());
        self.next_token();

        if funclike && self.token.is_punct(Punct::LParen) {
            // Grab the whole argument list; balanced parens, malformed
            // content diagnosed later during binding.
            let mut depth = 0usize;
            let mut ended = false;
            while !self.token.is_eof() {
                if self.token.is_punct(Punct::LParen) {
                    depth += 1;
                } else if self.token.is_punct(Punct::RParen) {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        ended = true;
                    }
                }
                invocation.insert_last(self.token.clone());
                self.next_token();
                if ended {
                    break;
                }
            }
        }

        let mut expansion = TokenList::new();
        self.expand_macro(&mut invocation, &mut expansion);
        self.requeue_current();
        self.tokens.prepend(&mut expansion);
        self.next_token();
    }

    /// Returns the next cooked token.
    pub fn next(&mut self) -> Token {
        let mut literals = TokenList::new();

        loop {
            self.parse();

            if self.token.is_string_literal() {
                // Phase 6: adjacent string literals concatenate.
                let literal = self.token.clone();
                self.next_token();
                literals.insert_last(literal);
                continue;
            }

            if !literals.is_empty() {
                return if literals.len() == 1 {
                    match literals.remove_first() {
                        Some(token) => token,
                        None => self.token.clone(),
                    }
                } else {
                    self.cat_literals(&literals)
                };
            }

            if self.token.is_eof() {
                if self.file_stack.len() <= 1 {
                    self.report_open_ifs();
                    return self.token.clone();
                }
                self.pop_file();
                self.next_token();
                continue;
            }

            let result = self.token.clone();
            self.next_token();
            return result;
        }
    }

    /// Merges a run of adjacent string literals into one token carrying
    /// the concatenated payload, the first literal's start and flags,
    /// and the last literal's end.
    fn cat_literals(&self, literals: &TokenList) -> Token {
        let mut value = Vec::new();
        let mut prefix = EncPrefix::None;
        for (i, token) in literals.iter().enumerate() {
            if let TokenKind::StrLit { value: v, prefix: p } = &token.kind {
                value.extend_from_slice(v);
                if i == 0 {
                    prefix = *p;
                }
            }
        }

        let (first, last) = match (literals.first(), literals.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Token::synthetic(TokenKind::StrLit { value, prefix }, ""),
        };

        let spelling = format!("\"{}\"", escape_string_bytes(&value));
        let mut token = Token::new(
            TokenKind::StrLit { value, prefix },
            spelling,
            first.start.clone(),
            last.end.clone(),
        );
        token.at_bol = first.at_bol;
        token.after_white = first.after_white;
        token
    }

    /// At end of the translation unit, every frame above the bottom
    /// sentinel is an `#if` nobody closed.
    fn report_open_ifs(&mut self) {
        if self.reported_open_ifs {
            return;
        }
        self.reported_open_ifs = true;
        for frame in self.ifs.iter().skip(1) {
            let spelling = frame
                .token
                .as_ref()
                .map(|t| t.spelling.clone())
                .unwrap_or_default();
            self.errlist.insert(Diagnostic {
                level: Level::Error,
                filename: frame
                    .token
                    .as_ref()
                    .map(|t| t.start.filename.to_string())
                    .unwrap_or_default(),
                message: format!("unterminated #{} directive", spelling),
                context: String::new(),
                location: frame
                    .token
                    .as_ref()
                    .map(|t| t.start.clone())
                    .unwrap_or_else(pproc_util::Location::synthetic),
            });
        }
    }

    /// Lexes `source` into a token list under the `origin` pseudo-file;
    /// used for builtin expansions and token pasting.
    pub(crate) fn lex_fragment(&self, source: &str, origin: &str) -> TokenList {
        let mut lexer = Lexer::from_source(source, origin, Rc::clone(&self.errlist));
        let mut out = TokenList::new();
        loop {
            let token = lexer.next_token();
            if token.is_eof() {
                break;
            }
            out.insert_last(token);
        }
        out
    }

    fn diagnose(&self, level: Level, message: String) {
        let (filename, context) = match self.file_stack.last() {
            Some(file) => (file.filename.to_string(), file.lexer.current_line()),
            None => (self.token.start.filename.to_string(), String::new()),
        };
        self.errlist.insert(Diagnostic {
            level,
            filename,
            message,
            context,
            location: self.token.start.clone(),
        });
    }

    /// Error at the current token.
    pub(crate) fn error(&self, message: impl Into<String>) {
        self.diagnose(Level::Error, message.into());
    }

    /// Warning at the current token.
    pub(crate) fn warn(&self, message: impl Into<String>) {
        self.diagnose(Level::Warning, message.into());
    }
}
