//! Block-buffered input.
//!
//! `InBuf` hands out one byte at a time from a file handle or an
//! in-memory string, refilling a fixed-size block when it runs dry. The
//! in-memory form backs tests and the "lex this string" utilities the
//! macro engine needs for pasting and builtin expansions.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;

const BLOCK_SIZE: usize = 2048;

/// A byte source with a refillable block buffer.
pub struct InBuf {
    reader: Box<dyn Read>,
    block: Vec<u8>,
    count: usize,
    offset: usize,
}

impl InBuf {
    /// Opens `path` for block-buffered reading.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::with_reader(Box::new(file)))
    }

    /// Buffers over an in-memory string.
    pub fn from_str(source: &str) -> Self {
        Self::with_reader(Box::new(Cursor::new(source.as_bytes().to_vec())))
    }

    fn with_reader(reader: Box<dyn Read>) -> Self {
        Self {
            reader,
            block: vec![0; BLOCK_SIZE],
            count: 0,
            offset: 0,
        }
    }

    /// Returns the next byte, or `None` at end of input.
    ///
    /// Read errors after a successful open are treated as end of input;
    /// the stream stays well formed and the caller's EOF handling covers
    /// the rest.
    pub fn get_byte(&mut self) -> Option<u8> {
        if self.offset == self.count {
            self.count = self.reader.read(&mut self.block).unwrap_or(0);
            self.offset = 0;
        }

        if self.count == 0 {
            return None;
        }

        let byte = self.block[self.offset];
        self.offset += 1;
        Some(byte)
    }
}

impl std::fmt::Debug for InBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InBuf")
            .field("count", &self.count)
            .field("offset", &self.offset)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_all_bytes_in_order() {
        let mut buf = InBuf::from_str("abc");
        assert_eq!(buf.get_byte(), Some(b'a'));
        assert_eq!(buf.get_byte(), Some(b'b'));
        assert_eq!(buf.get_byte(), Some(b'c'));
        assert_eq!(buf.get_byte(), None);
        assert_eq!(buf.get_byte(), None);
    }

    #[test]
    fn empty_source_is_immediately_exhausted() {
        let mut buf = InBuf::from_str("");
        assert_eq!(buf.get_byte(), None);
    }

    #[test]
    fn survives_block_boundary() {
        let source = "x".repeat(BLOCK_SIZE * 2 + 17);
        let mut buf = InBuf::from_str(&source);
        let mut n = 0;
        while buf.get_byte().is_some() {
            n += 1;
        }
        assert_eq!(n, source.len());
    }

    #[test]
    fn open_missing_file_fails() {
        assert!(InBuf::open(Path::new("/nonexistent/pproc-test")).is_err());
    }
}
