//! Core lexer implementation.
//!
//! The lexer assembles one logical line at a time: physical lines are read
//! from the input buffer and backslash-newline pairs are spliced out before
//! any token is recognized. Comments are replaced by a single space
//! (tracked through the `had_white` flag), newlines either set `at_bol` on
//! the following token or, in `emit_eols` mode, come out as EOL tokens.

use std::rc::Rc;

use pproc_util::{Diagnostic, ErrorList, Level, Location};

use crate::inbuf::InBuf;
use crate::token::{Token, TokenKind};

/// Tokenizer for one source file.
pub struct Lexer {
    inbuf: InBuf,
    filename: Rc<str>,
    errlist: Rc<ErrorList>,

    /// Current logical line, spliced, without the trailing newline.
    line: Vec<u8>,
    /// Cursor within `line`.
    pos: usize,
    /// Physical line number where the current logical line starts.
    line_no: u32,
    /// Physical line number the next refill will start at.
    next_line_no: u32,
    /// A logical line is loaded and its end not yet consumed.
    line_open: bool,

    /// Byte offset of the current token within `line`.
    pub(crate) token_start: usize,

    /// Recognize header names (`<...>` / `"..."`); set by the directive
    /// processor for the rest of a `#include` line.
    pub inside_include: bool,
    /// Emit EOL tokens instead of swallowing newlines; set around
    /// directive processing.
    pub emit_eols: bool,

    next_at_bol: bool,
    had_white: bool,
}

impl std::fmt::Debug for Lexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer")
            .field("filename", &self.filename)
            .field("line_no", &self.line_no)
            .field("pos", &self.pos)
            .finish()
    }
}

impl Lexer {
    /// Creates a lexer over `inbuf`; `filename` is stamped on every
    /// emitted location.
    pub fn new(inbuf: InBuf, filename: Rc<str>, errlist: Rc<ErrorList>) -> Self {
        Self {
            inbuf,
            filename,
            errlist,
            line: Vec::new(),
            pos: 0,
            line_no: 1,
            next_line_no: 1,
            line_open: false,
            token_start: 0,
            inside_include: false,
            emit_eols: false,
            next_at_bol: true,
            had_white: false,
        }
    }

    /// Convenience constructor over an in-memory string.
    pub fn from_source(source: &str, filename: &str, errlist: Rc<ErrorList>) -> Self {
        Self::new(InBuf::from_str(source), Rc::from(filename), errlist)
    }

    pub fn filename(&self) -> &Rc<str> {
        &self.filename
    }

    /// Line number the lexer is currently working on (drives `__LINE__`).
    pub fn line_no(&self) -> u32 {
        self.line_no
    }

    /// Copy of the current logical line, for diagnostic context.
    pub fn current_line(&self) -> String {
        String::from_utf8_lossy(&self.line).into_owned()
    }

    /// Returns the next preprocessing token.
    ///
    /// Never fails: malformed input produces a diagnostic and a
    /// best-effort token, and every stream ends with an EOF token that is
    /// repeated on further calls.
    pub fn next_token(&mut self) -> Token {
        loop {
            if !self.line_open {
                if !self.refill() {
                    return self.eof_token();
                }
                self.line_open = true;
                self.next_at_bol = true;
                self.had_white = false;
                continue;
            }

            if !self.skip_whitespace_and_comments() {
                // Logical line exhausted.
                self.line_open = false;
                if self.emit_eols {
                    return self.eol_token();
                }
                continue;
            }

            self.token_start = self.pos;
            let at_bol = std::mem::take(&mut self.next_at_bol);
            let after_white = std::mem::take(&mut self.had_white);

            let byte = self.line[self.pos];
            let lexed = match byte {
                b'<' if self.inside_include => Some(self.lex_header_name(true)),
                b'"' if self.inside_include => Some(self.lex_header_name(false)),
                b'"' => Some(self.lex_string(Default::default())),
                b'\'' => Some(self.lex_char_const(Default::default())),
                b'0'..=b'9' => Some(self.lex_number()),
                b'.' if self.peek(1).is_some_and(|d| d.is_ascii_digit()) => {
                    Some(self.lex_number())
                }
                b if b.is_ascii_alphabetic() || b == b'_' || b == b'\\' => Some(self.lex_name()),
                _ => self.lex_punct(),
            };

            match lexed {
                Some(mut token) => {
                    token.at_bol = at_bol;
                    token.after_white = after_white;
                    return token;
                }
                None => {
                    // Bad byte: reported, skipped, flags re-armed.
                    self.next_at_bol = at_bol;
                    self.had_white = after_white;
                }
            }
        }
    }

    /// Loads the next logical line into `line`, splicing continuations.
    /// Returns false at end of input.
    fn refill(&mut self) -> bool {
        self.line.clear();
        self.pos = 0;
        self.line_no = self.next_line_no;

        let mut got_any = false;
        loop {
            let mut saw_newline = false;
            while let Some(byte) = self.inbuf.get_byte() {
                got_any = true;
                if byte == b'\n' {
                    saw_newline = true;
                    break;
                }
                self.line.push(byte);
            }

            if !saw_newline {
                return got_any;
            }

            self.next_line_no += 1;
            if self.line.last() == Some(&b'\r') {
                self.line.pop();
            }
            if self.line.last() == Some(&b'\\') {
                self.line.pop();
                continue;
            }
            return true;
        }
    }

    /// Advances past whitespace and comments. Returns false once the
    /// logical line is exhausted.
    fn skip_whitespace_and_comments(&mut self) -> bool {
        while self.pos < self.line.len() {
            match self.line[self.pos] {
                b' ' | b'\t' | 0x0b | 0x0c => {
                    self.had_white = true;
                    self.pos += 1;
                }
                b'/' if self.peek(1) == Some(b'/') => {
                    self.had_white = true;
                    self.pos = self.line.len();
                }
                b'/' if self.peek(1) == Some(b'*') => {
                    self.had_white = true;
                    self.pos += 2;
                    if !self.skip_block_comment() {
                        return false;
                    }
                }
                _ => return true,
            }
        }
        false
    }

    /// Consumes a `/* ... */` comment, following it across physical
    /// lines. Returns false if the input ends first.
    fn skip_block_comment(&mut self) -> bool {
        loop {
            while self.pos < self.line.len() {
                if self.line[self.pos] == b'*' && self.peek(1) == Some(b'/') {
                    self.pos += 2;
                    return true;
                }
                self.pos += 1;
            }
            if !self.refill() {
                self.error_at(self.pos, "unterminated comment");
                return false;
            }
            self.next_at_bol = true;
        }
    }

    pub(crate) fn peek(&self, offset: usize) -> Option<u8> {
        self.line.get(self.pos + offset).copied()
    }

    pub(crate) fn current(&self) -> Option<u8> {
        self.peek(0)
    }

    pub(crate) fn advance(&mut self) {
        self.pos += 1;
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    /// The spelling of the token currently being lexed.
    pub(crate) fn spelling(&self) -> String {
        String::from_utf8_lossy(&self.line[self.token_start..self.pos]).into_owned()
    }

    pub(crate) fn location_at(&self, pos: usize) -> Location {
        Location::new(Rc::clone(&self.filename), self.line_no, pos as u32 + 1)
    }

    /// Builds a token spanning from `token_start` to the cursor.
    pub(crate) fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(
            kind,
            self.spelling(),
            self.location_at(self.token_start),
            self.location_at(self.pos.saturating_sub(1)),
        )
    }

    fn eof_token(&self) -> Token {
        let loc = Location::new(Rc::clone(&self.filename), self.next_line_no, 1);
        let mut token = Token::new(TokenKind::Eof, "", loc.clone(), loc);
        token.at_bol = true;
        token
    }

    fn eol_token(&mut self) -> Token {
        let loc = self.location_at(self.line.len());
        self.next_at_bol = true;
        self.had_white = false;
        Token::new(TokenKind::Eol, "", loc.clone(), loc)
    }

    /// Records an error-level diagnostic pointing into the current line.
    pub(crate) fn error_at(&self, pos: usize, message: impl Into<String>) {
        self.errlist.insert(Diagnostic {
            level: Level::Error,
            filename: self.filename.to_string(),
            message: message.into(),
            context: self.current_line(),
            location: self.location_at(pos),
        });
    }

    /// Records an error at the start of the current token.
    pub(crate) fn error(&self, message: impl Into<String>) {
        self.error_at(self.token_start, message);
    }
}
