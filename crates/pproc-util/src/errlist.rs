//! Diagnostic collection.
//!
//! The preprocessor never aborts on an error; it records a diagnostic and
//! recovers. All components share one `ErrorList` through `Rc` handles and
//! push into it as problems are found. The CLI decides the exit status
//! from the per-level counts after the token stream has drained.

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};

use crate::location::Location;

/// Diagnostic severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Something worth noticing.
    Notice,
    /// Possible error.
    Warning,
    /// Regular error.
    Error,
    /// Unrecoverable error.
    Fatal,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Notice => write!(f, "notice"),
            Level::Warning => write!(f, "warning"),
            Level::Error => write!(f, "error"),
            Level::Fatal => write!(f, "fatal error"),
        }
    }
}

/// One recorded problem.
///
/// `context` is a copy of the source line the problem was found on; the
/// dump prints it below the message with a caret under `location.column`.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub level: Level,
    pub filename: String,
    pub message: String,
    pub context: String,
    pub location: Location,
}

/// Shared diagnostic sink.
///
/// Interior mutability lets the lexer, the directive processor, and the
/// macro engine all hold an `Rc<ErrorList>` and report without threading
/// `&mut` through every call chain.
#[derive(Debug, Default)]
pub struct ErrorList {
    diagnostics: RefCell<Vec<Diagnostic>>,
    counts: RefCell<[usize; 4]>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic.
    pub fn insert(&self, diagnostic: Diagnostic) {
        self.counts.borrow_mut()[diagnostic.level as usize] += 1;
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// Number of diagnostics recorded at `level`.
    pub fn count(&self, level: Level) -> usize {
        self.counts.borrow()[level as usize]
    }

    /// True if any error- or fatal-level diagnostic was recorded.
    pub fn has_errors(&self) -> bool {
        self.count(Level::Error) > 0 || self.count(Level::Fatal) > 0
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    /// Snapshot of all diagnostics in insertion order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Writes every diagnostic to `out`:
    ///
    /// ```text
    /// <filename>:<line>: <level>: <message>
    /// <source line>
    ///     ^
    /// ```
    ///
    /// The caret line copies tabs from the source line so the mark stays
    /// under the offending column in a terminal.
    pub fn dump(&self, out: &mut dyn Write) -> io::Result<()> {
        let diagnostics = self.diagnostics.borrow();
        for (i, diag) in diagnostics.iter().enumerate() {
            writeln!(
                out,
                "{}:{}: {}: {}",
                diag.filename, diag.location.line, diag.level, diag.message
            )?;

            if !diag.context.is_empty() {
                writeln!(out, "{}", diag.context)?;
                let mut mark = String::new();
                for (col, c) in diag.context.chars().enumerate() {
                    if col + 1 >= diag.location.column as usize {
                        break;
                    }
                    mark.push(if c == '\t' { '\t' } else { ' ' });
                }
                // Short context lines still get the caret at the margin.
                while (mark.len() as u32) < diag.location.column.saturating_sub(1) {
                    mark.push(' ');
                }
                mark.push('^');
                writeln!(out, "{}", mark)?;
            }

            if i + 1 < diagnostics.len() {
                writeln!(out)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn diag(level: Level, column: u32, context: &str) -> Diagnostic {
        Diagnostic {
            level,
            filename: "test.c".to_string(),
            message: "something odd".to_string(),
            context: context.to_string(),
            location: Location::new(Rc::from("test.c"), 3, column),
        }
    }

    #[test]
    fn level_display() {
        assert_eq!(format!("{}", Level::Notice), "notice");
        assert_eq!(format!("{}", Level::Warning), "warning");
        assert_eq!(format!("{}", Level::Error), "error");
        assert_eq!(format!("{}", Level::Fatal), "fatal error");
    }

    #[test]
    fn counts_by_level() {
        let list = ErrorList::new();
        list.insert(diag(Level::Warning, 1, ""));
        list.insert(diag(Level::Error, 1, ""));
        list.insert(diag(Level::Error, 1, ""));

        assert_eq!(list.count(Level::Warning), 1);
        assert_eq!(list.count(Level::Error), 2);
        assert_eq!(list.count(Level::Notice), 0);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let list = ErrorList::new();
        list.insert(diag(Level::Warning, 1, ""));
        assert!(!list.has_errors());

        list.insert(diag(Level::Error, 1, ""));
        assert!(list.has_errors());
    }

    #[test]
    fn fatal_counts_as_error() {
        let list = ErrorList::new();
        list.insert(diag(Level::Fatal, 1, ""));
        assert!(list.has_errors());
    }

    #[test]
    fn dump_places_caret() {
        let list = ErrorList::new();
        list.insert(diag(Level::Error, 5, "int @ x;"));

        let mut out = Vec::new();
        list.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "test.c:3: error: something odd\nint @ x;\n    ^\n"
        );
    }

    #[test]
    fn dump_preserves_tabs_in_mark() {
        let list = ErrorList::new();
        list.insert(diag(Level::Warning, 3, "\tabc"));

        let mut out = Vec::new();
        list.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("\tabc\n\t ^\n"));
    }

    #[test]
    fn shared_handle_reports() {
        let list = Rc::new(ErrorList::new());
        let other = Rc::clone(&list);
        other.insert(diag(Level::Error, 1, ""));
        assert!(list.has_errors());
    }
}
