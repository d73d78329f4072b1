//! Macro expansion.
//!
//! Expansion of one invocation runs in four steps: collect and bind the
//! arguments (function-like only), substitute the replacement list
//! (applying `#` and `##` in textual order), drop placemarkers, then
//! rescan the result for further expansion with the macro's `expanding`
//! flag set. A name whose macro is currently expanding is marked
//! `noexpand` instead of being expanded again; the mark is sticky, so the
//! name survives all later rescans verbatim.
//!
//! Builtin macros either carry a prebuilt replacement list (`__STDC__`
//! and friends) or a [`Builtin`] handler that produces a fresh list at
//! every use (`__FILE__`, `__LINE__`, `__DATE__`, `__TIME__`).

use pproc_lex::{Punct, Token, TokenList};
use pproc_lex::token::escape_string_bytes;
use pproc_util::Symbol;

use crate::cpp::Preprocessor;
use crate::symtab::DefKind;

/// Handler identity for the builtins that re-expand at every use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    /// `__FILE__` - name of the file being processed.
    File,
    /// `__LINE__` - current line of that file's lexer.
    Line,
    /// `__DATE__` - date of the run, `"Mmm dd yyyy"`.
    Date,
    /// `__TIME__` - time of the run, `"hh:mm:ss"`.
    Time,
}

/// A macro definition.
#[derive(Clone, Debug)]
pub struct Macro {
    pub name: Symbol,
    pub funclike: bool,
    /// Last formal parameter is `__VA_ARGS__`.
    pub variadic: bool,
    pub builtin: bool,
    /// Formal parameters, as name tokens from the `#define` line.
    pub params: TokenList,
    /// Replacement list, verbatim from the `#define` line.
    pub replacement: TokenList,
    /// Present on handled builtins; produces the expansion per use.
    pub handler: Option<Builtin>,
    /// Set for the dynamic extent of one expansion to suppress
    /// self-reference.
    pub expanding: bool,
}

impl Macro {
    pub fn new(name: Symbol) -> Self {
        Self {
            name,
            funclike: false,
            variadic: false,
            builtin: false,
            params: TokenList::new(),
            replacement: TokenList::new(),
            handler: None,
            expanding: false,
        }
    }

    pub fn is_funclike(&self) -> bool {
        self.funclike
    }
}

/// Argument binding of one formal parameter during an invocation.
#[derive(Clone, Debug, Default)]
pub struct MacroArg {
    /// The raw argument tokens, exactly as written.
    pub tokens: TokenList,
    /// The complete macro expansion of `tokens`.
    pub expansion: TokenList,
}

impl Preprocessor {
    /// Decides whether `token` starts a macro invocation: its current
    /// definition is a macro, it is not flagged `noexpand`, and a
    /// function-like macro must be followed by `(`.
    pub(crate) fn token_is_expandable(&self, token: &Token, next: Option<&Token>) -> bool {
        let Some(symbol) = token.name() else {
            return false;
        };
        if token.noexpand {
            return false;
        }
        let Some(mac) = self.symtab.macro_ref(symbol) else {
            return false;
        };
        if mac.is_funclike() && !next.is_some_and(|t| t.is_punct(Punct::LParen)) {
            return false;
        }
        true
    }

    /// Expands the macro invocation at the front of `invocation` and
    /// appends the cooked result to `out`. The invocation tokens (name,
    /// and for function-like macros the parenthesized argument list) are
    /// consumed.
    pub(crate) fn expand_macro(&mut self, invocation: &mut TokenList, out: &mut TokenList) {
        self.expand_internal(invocation, out);
    }

    fn expand_internal(&mut self, input: &mut TokenList, out: &mut TokenList) {
        let Some(name_token) = input.remove_first() else {
            return;
        };
        let Some(symbol) = name_token.name() else {
            out.insert_last(name_token);
            return;
        };

        let (funclike, variadic, params, replacement, handler) =
            match self.symtab.macro_ref(symbol) {
                Some(mac) => (
                    mac.funclike,
                    mac.variadic,
                    mac.params.copy(),
                    mac.replacement.copy(),
                    mac.handler,
                ),
                None => {
                    out.insert_last(name_token);
                    return;
                }
            };

        tracing::trace!(macro_name = %symbol, "expanding");

        if let Some(builtin) = handler {
            self.expand_builtin(builtin, &name_token, out);
            return;
        }

        self.symtab.scope_begin();

        if funclike {
            self.bind_args(symbol, &params, variadic, input);
        }

        let mut replacement = replacement;
        let mut substituted = TokenList::new();
        self.replace_args(&mut replacement, &mut substituted);
        substituted.remove_placemarkers();

        // The argument scope ends before the rescan; the rescan must see
        // the outer meaning of every name.
        self.symtab.scope_end();

        if let Some(mac) = self.symtab.macro_mut(symbol) {
            mac.expanding = true;
        }
        self.expand_rescan(&mut substituted, out);
        if let Some(mac) = self.symtab.macro_mut(symbol) {
            mac.expanding = false;
        }
    }

    /// Walks `input`, expanding what is expandable, marking
    /// self-references `noexpand`, and passing everything else through.
    pub(crate) fn expand_rescan(&mut self, input: &mut TokenList, out: &mut TokenList) {
        loop {
            let (expandable, expanding) = match input.first() {
                None => break,
                Some(first) => {
                    let expandable = self.token_is_expandable(first, input.get(1));
                    let expanding = first
                        .name()
                        .and_then(|s| self.symtab.macro_ref(s))
                        .is_some_and(|m| m.expanding);
                    (expandable, expandable && expanding)
                }
            };

            if !expandable {
                let Some(token) = input.remove_first() else {
                    break;
                };
                out.insert_last(token);
            } else if expanding {
                let Some(mut token) = input.remove_first() else {
                    break;
                };
                token.noexpand = true;
                out.insert_last(token);
            } else {
                self.expand_internal(input, out);
            }
        }
    }

    /// Collects the arguments of a function-like invocation and binds
    /// each formal parameter, in a fresh definition, to its raw tokens
    /// and their pre-expansion. `input` starts at the `(`.
    fn bind_args(&mut self, name: Symbol, params: &TokenList, variadic: bool, input: &mut TokenList) {
        if input.first().is_some_and(|t| t.is_punct(Punct::LParen)) {
            input.remove_first();
        } else {
            self.error(format!("expected '(' in invocation of macro \"{}\"", name));
            return;
        }

        let param_syms: Vec<Symbol> = params.iter().filter_map(|t| t.name()).collect();
        let mut closed = false;
        let mut missing = false;

        for (i, &param) in param_syms.iter().enumerate() {
            let is_variadic_param = variadic && i + 1 == param_syms.len();

            // Defined as Undefined first; the binding becomes a real
            // macro-argument only after its own expansion is computed, so
            // the expansion does not see the half-built definition.
            self.symtab.define(param, DefKind::Undefined);

            let mut raw = TokenList::new();
            if closed {
                missing = true;
            } else {
                let mut depth = 0usize;
                loop {
                    let (is_lparen, is_rparen, is_comma) = match input.first() {
                        None => {
                            closed = true;
                            break;
                        }
                        Some(front) => (
                            front.is_punct(Punct::LParen),
                            front.is_punct(Punct::RParen),
                            front.is_punct(Punct::Comma),
                        ),
                    };
                    if is_lparen {
                        depth += 1;
                    } else if is_rparen {
                        if depth == 0 {
                            input.remove_first();
                            closed = true;
                            break;
                        }
                        depth -= 1;
                    } else if is_comma && depth == 0 && !is_variadic_param {
                        input.remove_first();
                        break;
                    }
                    let Some(token) = input.remove_first() else {
                        closed = true;
                        break;
                    };
                    raw.insert_last(token);
                }
            }

            let mut scratch = raw.copy();
            let mut expansion = TokenList::new();
            self.expand_rescan(&mut scratch, &mut expansion);

            if let Some(def) = self.symtab.current_mut(param) {
                *def = DefKind::MacroArg(MacroArg {
                    tokens: raw,
                    expansion,
                });
            }
        }

        if missing {
            self.error(format!(
                "macro \"{}\" requires {} arguments",
                name,
                param_syms.len()
            ));
        }

        if !closed {
            // Leftover tokens are extra arguments (or an unterminated
            // list, which the invocation collector already bounded).
            let mut extra = false;
            let mut depth = 0usize;
            loop {
                let (is_lparen, is_rparen) = match input.first() {
                    None => break,
                    Some(front) => (
                        front.is_punct(Punct::LParen),
                        front.is_punct(Punct::RParen),
                    ),
                };
                if is_lparen {
                    depth += 1;
                } else if is_rparen {
                    if depth == 0 {
                        input.remove_first();
                        closed = true;
                        break;
                    }
                    depth -= 1;
                } else {
                    extra = true;
                }
                input.remove_first();
            }
            if extra {
                self.error(format!("macro \"{}\" passed too many arguments", name));
            }
            if !closed {
                self.error(format!(
                    "unterminated argument list in invocation of macro \"{}\"",
                    name
                ));
            }
        }
    }

    /// Substitutes a (copied) replacement list: pasting for `##` pairs,
    /// stringification for `#` before a parameter, pre-expanded argument
    /// lists for bare parameters, everything else verbatim.
    fn replace_args(&mut self, input: &mut TokenList, out: &mut TokenList) {
        let mut hash = false;

        loop {
            let next_is_paste = input.get(1).is_some_and(|t| t.is_punct(Punct::HashHash));
            let (front_is_hash, front_is_arg) = match input.first() {
                None => break,
                Some(front) => (
                    front.is_punct(Punct::Hash),
                    front.name().is_some_and(|s| self.symtab.is_macro_arg(s)),
                ),
            };

            if next_is_paste {
                if hash {
                    self.error("'#' is not followed by a macro parameter");
                    hash = false;
                }
                let Some(first) = input.remove_first() else {
                    break;
                };
                let mut lhs = TokenList::new();
                self.paste_prepare(first, &mut lhs);
                while input.first().is_some_and(|t| t.is_punct(Punct::HashHash)) {
                    input.remove_first();
                    match input.remove_first() {
                        Some(rhs) => self.paste(&mut lhs, rhs),
                        None => {
                            self.error(
                                "'##' cannot appear at the end of a macro replacement list",
                            );
                            break;
                        }
                    }
                }
                out.append(&mut lhs);
                continue;
            }

            if front_is_hash {
                if hash {
                    self.error("'#' is not followed by a macro parameter");
                }
                hash = true;
                input.remove_first();
                continue;
            }

            if !front_is_arg {
                if hash {
                    self.error("'#' is not followed by a macro parameter");
                    hash = false;
                }
                let Some(token) = input.remove_first() else {
                    break;
                };
                out.insert_last(token);
            } else if hash {
                let Some(token) = input.remove_first() else {
                    break;
                };
                out.insert_last(self.stringify(&token));
                hash = false;
            } else {
                let Some(token) = input.remove_first() else {
                    break;
                };
                if let Some(arg) = token.name().and_then(|s| self.symtab.macro_arg_ref(s)) {
                    let mut expansion = arg.expansion.copy();
                    out.append(&mut expansion);
                }
            }
        }

        if hash {
            self.error("'#' is not followed by a macro parameter");
        }
    }

    /// Turns a bound parameter into a single string-literal token built
    /// from the raw argument spellings (6.10.3.2).
    fn stringify(&mut self, name_token: &Token) -> Token {
        let raw = name_token
            .name()
            .and_then(|s| self.symtab.macro_arg_ref(s))
            .map(|arg| arg.tokens.copy())
            .unwrap_or_default();

        let mut text = String::new();
        for (i, token) in raw.iter().enumerate() {
            if token.after_white && i > 0 {
                text.push(' ');
            }
            text.push_str(&token.spelling);
        }

        let value = text.into_bytes();
        let spelling = format!("\"{}\"", escape_string_bytes(&value));

        let mut result = Token::new(
            pproc_lex::TokenKind::StrLit {
                value,
                prefix: Default::default(),
            },
            spelling,
            raw.first()
                .map(|t| t.start.clone())
                .unwrap_or_else(|| name_token.start.clone()),
            raw.last()
                .map(|t| t.end.clone())
                .unwrap_or_else(|| name_token.end.clone()),
        );
        if let Some(first) = raw.first() {
            result.at_bol = first.at_bol;
            result.after_white = first.after_white;
        }
        result
    }

    /// Prepares one `##` operand: a bound parameter contributes its raw
    /// tokens (a placemarker if they are empty), anything else
    /// contributes itself.
    fn paste_prepare(&mut self, token: Token, out: &mut TokenList) {
        if let Some(arg) = token.name().and_then(|s| self.symtab.macro_arg_ref(s)) {
            let mut tokens = arg.tokens.copy();
            out.append(&mut tokens);
            if out.is_empty() {
                out.insert_last(Token::synthetic(pproc_lex::TokenKind::Placemarker, ""));
            }
        } else {
            out.insert_last(token);
        }
    }

    /// Pastes the last token of `lhs` with the first token of the
    /// prepared `rhs_token` operand by re-lexing the concatenated
    /// spellings; the concatenation must come back as exactly one token.
    fn paste(&mut self, lhs: &mut TokenList, rhs_token: Token) {
        let mut rhs = TokenList::new();
        self.paste_prepare(rhs_token, &mut rhs);

        let Some(a) = lhs.remove_last() else { return };
        let Some(b) = rhs.remove_first() else { return };

        let mut result = TokenList::new();
        if a.is_placemarker() {
            result.insert_last(b);
        } else if b.is_placemarker() {
            result.insert_last(a);
        } else {
            let glued = format!("{}{}", a.spelling, b.spelling);
            let mut lexed = self.lex_fragment(&glued, "<paste>");
            if lexed.len() != 1 {
                self.error(format!(
                    "pasting \"{}\" and \"{}\" does not give a valid preprocessing token",
                    a.spelling, b.spelling
                ));
            }
            // The stream stays valid either way: whatever came out of the
            // re-lex is spliced in with the operands' locations.
            for token in lexed.iter_mut() {
                token.start = a.start.clone();
                token.end = b.end.clone();
            }
            if let Some(first) = lexed.first_mut() {
                first.at_bol = a.at_bol;
                first.after_white = a.after_white;
            }
            result.append(&mut lexed);
        }

        lhs.append(&mut result);
        lhs.append(&mut rhs);
    }

    /// Runs a [`Builtin`] handler, appending the expansion it produces
    /// for this particular use; `at` is the invocation's name token.
    pub(crate) fn expand_builtin(&mut self, builtin: Builtin, at: &Token, out: &mut TokenList) {
        let fragment = match builtin {
            Builtin::File => format!("\"{}\"", at.start.filename),
            Builtin::Line => at.start.line.to_string(),
            Builtin::Date => chrono::Local::now().format("\"%b %e %Y\"").to_string(),
            Builtin::Time => chrono::Local::now().format("\"%T\"").to_string(),
        };
        let mut lexed = self.lex_fragment(&fragment, "<builtin>");
        out.append(&mut lexed);
    }

    /// Defines the predefined macros (6.10.8).
    pub(crate) fn setup_builtin_macros(&mut self) {
        self.define_builtin_static("__STDC__", "1");
        self.define_builtin_static("__STDC_VERSION__", "201112L");
        self.define_builtin_static("__STDC_HOSTED__", "0");

        self.define_builtin_handled("__FILE__", Builtin::File);
        self.define_builtin_handled("__LINE__", Builtin::Line);
        self.define_builtin_handled("__DATE__", Builtin::Date);
        self.define_builtin_handled("__TIME__", Builtin::Time);
    }

    fn define_builtin_static(&mut self, name: &str, replacement: &str) {
        let symbol = self.symtab.insert(name);
        let mut mac = Macro::new(symbol);
        mac.builtin = true;
        mac.replacement = self.lex_fragment(replacement, "<builtin>");
        self.symtab.define(symbol, DefKind::Macro(mac));
    }

    fn define_builtin_handled(&mut self, name: &str, handler: Builtin) {
        let symbol = self.symtab.insert(name);
        let mut mac = Macro::new(symbol);
        mac.builtin = true;
        mac.handler = Some(handler);
        self.symtab.define(symbol, DefKind::Macro(mac));
    }
}
