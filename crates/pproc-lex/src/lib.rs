//! pproc-lex - Tokenization for the pproc preprocessor.
//!
//! This crate covers translation phases 1-3: raw bytes come in through a
//! block-buffered [`InBuf`], logical lines are assembled (with
//! backslash-newline splicing) by the [`Lexer`], and preprocessing tokens
//! come out, each carrying its verbatim spelling, two source locations,
//! and the flags the later phases depend on (`at_bol`, `after_white`,
//! `noexpand`).
//!
//! The [`TokenList`] type is the working currency of the macro engine:
//! expansion is nothing but splicing token lists into one another.

pub mod inbuf;
pub mod lexer;
pub mod token;
pub mod toklist;

pub use inbuf::InBuf;
pub use lexer::Lexer;
pub use token::{EncPrefix, Punct, Token, TokenKind};
pub use toklist::TokenList;
