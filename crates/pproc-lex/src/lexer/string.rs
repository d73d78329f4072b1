//! String literal, character constant, and header name lexing.
//!
//! Escape handling follows C11 6.4.4.4: the simple escapes, octal escapes
//! of up to three digits, `\x` with any number of hex digits, and the
//! universal character names `\u` (4 hex digits) and `\U` (8). A newline
//! inside a literal is an error; the literal closes at the end of the
//! line and lexing continues.

use crate::token::{EncPrefix, Token, TokenKind};
use crate::Lexer;

fn simple_escape(byte: u8) -> Option<u32> {
    match byte {
        b'\'' => Some(0x27),
        b'"' => Some(0x22),
        b'?' => Some(0x3f),
        b'\\' => Some(0x5c),
        b'a' => Some(0x07),
        b'b' => Some(0x08),
        b'f' => Some(0x0c),
        b'n' => Some(0x0a),
        b'r' => Some(0x0d),
        b't' => Some(0x09),
        b'v' => Some(0x0b),
        _ => None,
    }
}

impl Lexer {
    /// Lexes a string literal; the cursor sits on the opening quote. Any
    /// encoding prefix has already been consumed by `lex_name`.
    pub(crate) fn lex_string(&mut self, prefix: EncPrefix) -> Token {
        self.advance();

        let mut value = Vec::new();
        loop {
            match self.current() {
                None => {
                    self.error("missing terminating \" character");
                    break;
                }
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    if let Some(escaped) = self.read_escape_sequence() {
                        push_value(&mut value, escaped);
                    }
                }
                Some(byte) => {
                    value.push(byte);
                    self.advance();
                }
            }
        }

        self.make_token(TokenKind::StrLit { value, prefix })
    }

    /// Lexes a character constant; the cursor sits on the opening quote.
    pub(crate) fn lex_char_const(&mut self, prefix: EncPrefix) -> Token {
        self.advance();

        let mut value: Option<u32> = None;
        loop {
            match self.current() {
                None => {
                    self.error("missing terminating ' character");
                    break;
                }
                Some(b'\'') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    if let Some(escaped) = self.read_escape_sequence() {
                        value = Some(escaped);
                    }
                }
                Some(byte) => {
                    value = Some(byte as u32);
                    self.advance();
                }
            }
        }

        if value.is_none() {
            self.error("empty character constant");
        }

        self.make_token(TokenKind::CharConst {
            value: value.unwrap_or(0),
            prefix,
        })
    }

    /// Lexes `<name>` or `"name"` on a `#include` line; the cursor sits on
    /// the opening delimiter.
    pub(crate) fn lex_header_name(&mut self, angled: bool) -> Token {
        let closer = if angled { b'>' } else { b'"' };
        self.advance();

        let mut name = String::new();
        loop {
            match self.current() {
                None => {
                    self.error(if angled {
                        "missing terminating > character"
                    } else {
                        "missing terminating \" character"
                    });
                    break;
                }
                Some(byte) if byte == closer => {
                    self.advance();
                    break;
                }
                Some(byte) => {
                    name.push(byte as char);
                    self.advance();
                }
            }
        }

        self.make_token(TokenKind::HeaderName { name, angled })
    }

    /// Reads one escape sequence; the cursor sits just past the backslash.
    /// Returns the character value, or `None` after reporting a malformed
    /// escape.
    fn read_escape_sequence(&mut self) -> Option<u32> {
        let byte = match self.current() {
            Some(byte) => byte,
            None => {
                self.error("stray backslash at end of line");
                return None;
            }
        };

        if let Some(value) = simple_escape(byte) {
            self.advance();
            return Some(value);
        }

        match byte {
            b'0'..=b'7' => Some(self.read_octal_escape()),
            b'x' => {
                self.advance();
                self.read_hex_escape(1, usize::MAX)
            }
            b'u' => {
                self.advance();
                self.read_hex_escape(4, 4)
            }
            b'U' => {
                self.advance();
                self.read_hex_escape(8, 8)
            }
            _ => {
                self.error(format!("unknown escape sequence '\\{}'", byte as char));
                self.advance();
                None
            }
        }
    }

    /// Up to three octal digits, first one already checked.
    fn read_octal_escape(&mut self) -> u32 {
        let mut value = 0u32;
        for _ in 0..3 {
            match self.current() {
                Some(byte @ b'0'..=b'7') => {
                    value = value * 8 + (byte - b'0') as u32;
                    self.advance();
                }
                _ => break,
            }
        }
        value
    }

    /// Between `min` and `max` hex digits; short sequences are diagnosed.
    fn read_hex_escape(&mut self, min: usize, max: usize) -> Option<u32> {
        let mut value = 0u32;
        let mut count = 0;
        while count < max {
            match self.current() {
                Some(byte) if byte.is_ascii_hexdigit() => {
                    value = value
                        .wrapping_mul(16)
                        .wrapping_add((byte as char).to_digit(16).unwrap());
                    count += 1;
                    self.advance();
                }
                _ => break,
            }
        }

        if count < min {
            self.error("incomplete escape sequence, expected a hex digit");
            return None;
        }
        Some(value)
    }
}

/// Appends an escape's value to a string literal's bytes: small values go
/// in raw, larger ones are encoded as UTF-8 when they form a valid scalar.
fn push_value(value: &mut Vec<u8>, escaped: u32) {
    if escaped <= 0xff {
        value.push(escaped as u8);
    } else if let Some(c) = char::from_u32(escaped) {
        let mut buf = [0u8; 4];
        value.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    } else {
        value.push(escaped as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::core::tests::{lex_all, lex_all_with};
    use pproc_util::{ErrorList, Level};
    use std::rc::Rc;

    fn string_value(token: &Token) -> &[u8] {
        match &token.kind {
            TokenKind::StrLit { value, .. } => value,
            other => panic!("not a string: {:?}", other),
        }
    }

    fn char_value(token: &Token) -> u32 {
        match token.kind {
            TokenKind::CharConst { value, .. } => value,
            ref other => panic!("not a char const: {:?}", other),
        }
    }

    #[test]
    fn plain_string() {
        let tokens = lex_all("\"hello\"");
        assert_eq!(string_value(&tokens[0]), b"hello");
        assert_eq!(tokens[0].spelling, "\"hello\"");
    }

    #[test]
    fn simple_escapes() {
        let tokens = lex_all(r#""a\nb\t\\\"""#);
        assert_eq!(string_value(&tokens[0]), b"a\nb\t\\\"");
    }

    #[test]
    fn octal_escape_stops_at_three_digits() {
        let tokens = lex_all(r#""\1234""#);
        // \123 = 0o123, then literal '4'.
        assert_eq!(string_value(&tokens[0]), &[0o123, b'4']);
    }

    #[test]
    fn hex_escape_any_length() {
        let tokens = lex_all(r#""\x41\xff""#);
        assert_eq!(string_value(&tokens[0]), &[0x41, 0xff]);
    }

    #[test]
    fn universal_character_names() {
        let tokens = lex_all(r#""\u0394""#);
        // U+0394 GREEK CAPITAL DELTA comes out UTF-8 encoded.
        assert_eq!(string_value(&tokens[0]), "\u{0394}".as_bytes());
    }

    #[test]
    fn short_ucn_is_an_error() {
        let errlist = Rc::new(ErrorList::new());
        lex_all_with(r#""\u01""#, &errlist);
        assert_eq!(errlist.count(Level::Error), 1);
    }

    #[test]
    fn unknown_escape_reports() {
        let errlist = Rc::new(ErrorList::new());
        lex_all_with(r#""\q""#, &errlist);
        assert_eq!(errlist.count(Level::Error), 1);
    }

    #[test]
    fn unterminated_string_closes_at_newline() {
        let errlist = Rc::new(ErrorList::new());
        let tokens = lex_all_with("\"abc\ndef", &errlist);
        assert_eq!(errlist.count(Level::Error), 1);
        assert_eq!(string_value(&tokens[0]), b"abc");
        // Lexing continues on the next line.
        assert!(tokens[1].is_name());
    }

    #[test]
    fn char_constants() {
        let tokens = lex_all(r"'a' '\n' '\x41' '\0'");
        assert_eq!(char_value(&tokens[0]), 'a' as u32);
        assert_eq!(char_value(&tokens[1]), '\n' as u32);
        assert_eq!(char_value(&tokens[2]), 0x41);
        assert_eq!(char_value(&tokens[3]), 0);
    }

    #[test]
    fn empty_char_constant_is_value_zero() {
        let errlist = Rc::new(ErrorList::new());
        let tokens = lex_all_with("''", &errlist);
        assert_eq!(char_value(&tokens[0]), 0);
        assert_eq!(errlist.count(Level::Error), 1);
    }

    #[test]
    fn header_names_require_include_mode() {
        // Without the flag, <stdio.h> lexes as punctuators and names.
        let tokens = lex_all("<stdio.h>");
        assert!(tokens.len() > 1);

        let errlist = Rc::new(ErrorList::new());
        let mut lexer = Lexer::from_source("<stdio.h> \"mine.h\"", "t.c", Rc::clone(&errlist));
        lexer.inside_include = true;

        let first = lexer.next_token();
        assert_eq!(
            first.kind,
            TokenKind::HeaderName {
                name: "stdio.h".to_string(),
                angled: true
            }
        );
        let second = lexer.next_token();
        assert_eq!(
            second.kind,
            TokenKind::HeaderName {
                name: "mine.h".to_string(),
                angled: false
            }
        );
    }

    #[test]
    fn unterminated_header_name_reports() {
        let errlist = Rc::new(ErrorList::new());
        let mut lexer = Lexer::from_source("<stdio.h", "t.c", Rc::clone(&errlist));
        lexer.inside_include = true;
        let token = lexer.next_token();
        assert!(matches!(token.kind, TokenKind::HeaderName { .. }));
        assert_eq!(errlist.count(Level::Error), 1);
    }
}
