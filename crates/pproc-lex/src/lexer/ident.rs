//! Identifier lexing.
//!
//! Identifiers may contain backslashes so that universal character names
//! (`\uXXXX`, `\UXXXXXXXX`) pass through unmolested; no normalization is
//! attempted. A one- or two-byte identifier immediately followed by a
//! quote is re-read as the encoding prefix of a string literal or
//! character constant (C11 6.4.4.4/6.4.5).

use pproc_util::Symbol;

use crate::token::{EncPrefix, Token, TokenKind};
use crate::Lexer;

fn is_ident_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'\\'
}

impl Lexer {
    /// Lexes an identifier, or a prefixed literal when the identifier
    /// turns out to be `L`, `u`, `U`, or `u8` glued to a quote.
    pub(crate) fn lex_name(&mut self) -> Token {
        while self.current().is_some_and(is_ident_continue) {
            self.advance();
        }

        let name = self.spelling();

        if name.len() <= 2 {
            match self.current() {
                Some(b'\'') => {
                    if let Some(prefix) = char_prefix(&name) {
                        return self.lex_char_const(prefix);
                    }
                }
                Some(b'"') => {
                    if let Some(prefix) = string_prefix(&name) {
                        return self.lex_string(prefix);
                    }
                }
                _ => {}
            }
        }

        self.make_token(TokenKind::Name(Symbol::intern(&name)))
    }
}

fn char_prefix(name: &str) -> Option<EncPrefix> {
    match name {
        "L" => Some(EncPrefix::L),
        "u" => Some(EncPrefix::U16),
        "U" => Some(EncPrefix::U32),
        _ => None,
    }
}

fn string_prefix(name: &str) -> Option<EncPrefix> {
    match name {
        "L" => Some(EncPrefix::L),
        "u" => Some(EncPrefix::U16),
        "U" => Some(EncPrefix::U32),
        "u8" => Some(EncPrefix::Utf8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::core::tests::{lex_all, spellings};

    #[test]
    fn plain_identifiers() {
        let tokens = lex_all("foo _bar x1 __VA_ARGS__");
        assert_eq!(spellings(&tokens), vec!["foo", "_bar", "x1", "__VA_ARGS__"]);
        for token in &tokens {
            assert!(token.is_name());
        }
    }

    #[test]
    fn identifier_interns_its_name() {
        let tokens = lex_all("twice twice");
        assert_eq!(tokens[0].name(), tokens[1].name());
        assert_eq!(tokens[0].name().unwrap().as_str(), "twice");
    }

    #[test]
    fn ucn_passes_through() {
        let tokens = lex_all("a\\u00e9b");
        assert_eq!(spellings(&tokens), vec!["a\\u00e9b"]);
        assert!(tokens[0].is_name());
    }

    #[test]
    fn prefixed_string_literals() {
        for (src, prefix) in [
            ("L\"x\"", EncPrefix::L),
            ("u\"x\"", EncPrefix::U16),
            ("U\"x\"", EncPrefix::U32),
            ("u8\"x\"", EncPrefix::Utf8),
        ] {
            let tokens = lex_all(src);
            assert_eq!(tokens.len(), 1, "{}", src);
            match &tokens[0].kind {
                TokenKind::StrLit { prefix: p, .. } => assert_eq!(*p, prefix, "{}", src),
                other => panic!("{}: got {:?}", src, other),
            }
        }
    }

    #[test]
    fn prefixed_char_constants() {
        for (src, prefix) in [
            ("L'x'", EncPrefix::L),
            ("u'x'", EncPrefix::U16),
            ("U'x'", EncPrefix::U32),
        ] {
            let tokens = lex_all(src);
            match &tokens[0].kind {
                TokenKind::CharConst { prefix: p, .. } => assert_eq!(*p, prefix, "{}", src),
                other => panic!("{}: got {:?}", src, other),
            }
        }
    }

    #[test]
    fn u8_char_is_not_a_prefix() {
        // u8 prefixes strings only; u8'a' is a name followed by a char.
        let tokens = lex_all("u8'a'");
        assert_eq!(tokens.len(), 2);
        assert!(tokens[0].is_name());
        assert!(matches!(tokens[1].kind, TokenKind::CharConst { .. }));
    }

    #[test]
    fn long_identifier_before_quote_is_not_a_prefix() {
        let tokens = lex_all("abc\"x\"");
        assert_eq!(tokens.len(), 2);
        assert!(tokens[0].is_name());
        assert!(tokens[1].is_string_literal());
    }

    #[test]
    fn prefix_spelling_includes_the_prefix() {
        let tokens = lex_all("L\"w\"");
        assert_eq!(tokens[0].spelling, "L\"w\"");
    }
}
