//! Punctuator lexing.
//!
//! Multi-character punctuators win by longest prefix: `<<=` beats `<<`
//! beats `<`. The cursor always sits on the first byte; `.` followed by a
//! digit has already been routed to the number lexer, and `/` starting a
//! comment never reaches this module.

use crate::token::{Punct, Token, TokenKind};
use crate::Lexer;

impl Lexer {
    /// Lexes one punctuator, or reports and skips a byte that starts no
    /// token at all.
    pub(crate) fn lex_punct(&mut self) -> Option<Token> {
        use Punct::*;

        let one = self.current()?;
        let two = self.peek(1);
        let three = self.peek(2);

        let (punct, len) = match one {
            b'[' => (LBracket, 1),
            b']' => (RBracket, 1),
            b'(' => (LParen, 1),
            b')' => (RParen, 1),
            b'{' => (LBrace, 1),
            b'}' => (RBrace, 1),
            b';' => (Semicolon, 1),
            b',' => (Comma, 1),
            b'?' => (QuestionMark, 1),
            b'~' => (Neg, 1),
            b':' => (Colon, 1),
            b'.' => match (two, three) {
                (Some(b'.'), Some(b'.')) => (Ellipsis, 3),
                _ => (Dot, 1),
            },
            b'-' => match two {
                Some(b'-') => (Dec, 2),
                Some(b'=') => (MinusEq, 2),
                Some(b'>') => (Arrow, 2),
                _ => (Minus, 1),
            },
            b'+' => match two {
                Some(b'+') => (Inc, 2),
                Some(b'=') => (PlusEq, 2),
                _ => (Plus, 1),
            },
            b'&' => match two {
                Some(b'&') => (LogicalAnd, 2),
                Some(b'=') => (AmpersandEq, 2),
                _ => (Ampersand, 1),
            },
            b'|' => match two {
                Some(b'|') => (LogicalOr, 2),
                Some(b'=') => (OrEq, 2),
                _ => (Or, 1),
            },
            b'<' => match (two, three) {
                (Some(b'<'), Some(b'=')) => (ShlEq, 3),
                (Some(b'<'), _) => (Shl, 2),
                (Some(b'='), _) => (Le, 2),
                _ => (Lt, 1),
            },
            b'>' => match (two, three) {
                (Some(b'>'), Some(b'=')) => (ShrEq, 3),
                (Some(b'>'), _) => (Shr, 2),
                (Some(b'='), _) => (Ge, 2),
                _ => (Gt, 1),
            },
            b'=' => match two {
                Some(b'=') => (EqEq, 2),
                _ => (Eq, 1),
            },
            b'!' => match two {
                Some(b'=') => (Neq, 2),
                _ => (Not, 1),
            },
            b'*' => match two {
                Some(b'=') => (AsteriskEq, 2),
                _ => (Asterisk, 1),
            },
            b'/' => match two {
                Some(b'=') => (DivEq, 2),
                _ => (Div, 1),
            },
            b'%' => match two {
                Some(b'=') => (ModEq, 2),
                _ => (Mod, 1),
            },
            b'^' => match two {
                Some(b'=') => (XorEq, 2),
                _ => (Xor, 1),
            },
            b'#' => match two {
                Some(b'#') => (HashHash, 2),
                _ => (Hash, 1),
            },
            _ => {
                self.error_at(self.pos(), format!("unexpected character '{}'", one as char));
                self.advance();
                return None;
            }
        };

        for _ in 0..len {
            self.advance();
        }
        Some(self.make_token(TokenKind::Punct(punct)))
    }
}
