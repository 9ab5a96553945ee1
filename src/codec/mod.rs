//! Wire codecs: the standard terminfo binary dialect (`standard`) and
//! the NetBSD curses alternate dialect (`netbsd`), grounded on
//! `unibi_from_mem`/`unibi_dump` and `unibi_from_nbc_mem`/`unibi_dump_nbc`
//! respectively.

pub mod netbsd;
pub mod standard;
