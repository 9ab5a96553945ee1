#![forbid(unsafe_code)]
//! A terminfo/termcap terminal-description library: binary-format codecs
//! for the standard terminfo dialect and the NetBSD curses alternate
//! dialect, the in-memory `Term` record and its mutation API, and the
//! parameterized-string interpreter for `%`-escape capability strings.
//!
//! Grounded on `unibilium` (`unibilium.c`/`unibilium.h`), reworked into
//! owned `Vec<u8>` slots rather than an arena-plus-offset layout, and a
//! typed `Error`/`DumpError` boundary rather than bare return codes.

pub mod codec;
pub mod dynseq;
pub mod error;
pub mod interp;
pub mod primitives;
pub mod term;
pub mod variant;

#[cfg(test)]
mod test;

pub use error::{DumpError, DumpResult, Error, Result};
pub use term::Term;
pub use variant::{TermString, Variant};

impl Term {
    /// Parses a standard-dialect compiled terminfo entry.
    pub fn from_mem(data: &[u8]) -> Result<Term> {
        codec::standard::from_mem(data)
    }

    /// Parses a NetBSD curses alternate-dialect compiled entry.
    pub fn from_nbc_mem(data: &[u8]) -> Result<Term> {
        codec::netbsd::from_nbc_mem(data)
    }

    /// Encodes `self` into the standard dialect, writing into `buf`.
    pub fn dump(&self, buf: &mut [u8]) -> DumpResult<usize> {
        codec::standard::dump(self, buf)
    }

    /// Encodes `self` into the NetBSD curses alternate dialect.
    pub fn dump_nbc(&self, buf: &mut [u8]) -> DumpResult<usize> {
        codec::netbsd::dump_nbc(self, buf)
    }
}
