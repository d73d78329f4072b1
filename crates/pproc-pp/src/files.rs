//! Open files and header resolution.
//!
//! Files form a LIFO include stack owned by the preprocessor. Each open
//! file owns its lexer and a deferred-token list: when `#include` pushes
//! a new file mid-stream, the token the driver was holding is parked on
//! the file being covered and re-read once the included file runs out.

use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

use pproc_lex::{InBuf, Lexer, TokenList};
use pproc_util::ErrorList;

/// Built-in `#include` search directories, tried in order after any
/// user-supplied ones. The empty entry makes a bare relative path work
/// as-is.
const INCLUDE_DIRS: &[&str] = &["", ".", "/usr/include"];

/// Why a header could not be included.
#[derive(Debug, Error)]
pub enum IncludeError {
    #[error("no such file or directory")]
    NotFound,
    #[error("{0}")]
    Io(#[from] io::Error),
}

/// One entry of the include stack.
#[derive(Debug)]
pub struct SourceFile {
    pub filename: Rc<str>,
    pub lexer: Lexer,
    /// Tokens to re-read before asking the lexer again; filled when
    /// another file is pushed on top of this one.
    pub deferred: TokenList,
}

impl SourceFile {
    /// Opens `path` for preprocessing.
    pub fn open(path: &Path, errlist: Rc<ErrorList>) -> io::Result<Self> {
        let inbuf = InBuf::open(path)?;
        let filename: Rc<str> = Rc::from(path.to_string_lossy().as_ref());
        Ok(Self {
            lexer: Lexer::new(inbuf, Rc::clone(&filename), errlist),
            filename,
            deferred: TokenList::new(),
        })
    }

    /// Wraps an in-memory source, for tests and generated fragments.
    pub fn from_source(name: &str, source: &str, errlist: Rc<ErrorList>) -> Self {
        let filename: Rc<str> = Rc::from(name);
        Self {
            lexer: Lexer::new(InBuf::from_str(source), Rc::clone(&filename), errlist),
            filename,
            deferred: TokenList::new(),
        }
    }
}

/// Resolves `filename` and opens it as a [`SourceFile`].
pub fn open_include(
    user_dirs: &[PathBuf],
    filename: &str,
    errlist: Rc<ErrorList>,
) -> Result<SourceFile, IncludeError> {
    let path = resolve_include(user_dirs, filename)?;
    tracing::debug!(header = filename, path = %path.display(), "including");
    Ok(SourceFile::open(&path, errlist)?)
}

/// Resolves `filename` against the search path: an absolute name stands
/// alone, anything else is probed through `user_dirs` and then the
/// built-in list. First hit wins. Angled and quoted headers share this
/// search order.
pub fn resolve_include(user_dirs: &[PathBuf], filename: &str) -> Result<PathBuf, IncludeError> {
    if filename.starts_with('/') {
        let path = PathBuf::from(filename);
        if path.exists() {
            return Ok(path);
        }
        return Err(IncludeError::NotFound);
    }

    let candidates = user_dirs
        .iter()
        .cloned()
        .chain(INCLUDE_DIRS.iter().map(PathBuf::from));

    for dir in candidates {
        let candidate = if dir.as_os_str().is_empty() {
            PathBuf::from(filename)
        } else {
            dir.join(filename)
        };
        tracing::debug!(path = %candidate.display(), "probing include");
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(IncludeError::NotFound)
}
