//! The standard terminfo binary format, grounded on the `#else` branch
//! of `unibi_from_mem` and on `unibi_dump` in
//! `unibilium.c` — the branch gated on `USE_NETBSD_CURSES` is a
//! different, unrelated alternate build and is not modeled here; see
//! `codec::netbsd` for the real NetBSD dialect.

use crate::error::{ensure_len, DumpError, DumpResult, Error, Result};
use crate::primitives::{get_i16le, get_i32le, get_u16le, put_i16le, put_i32le, put_u16le, MAX15BITS};
use crate::term::{Term, BOOL_COUNT, NUM_COUNT, STR_COUNT};
use crate::variant::TermString;

const MAGIC_16BIT: u16 = 0o432;
const MAGIC_32BIT: u16 = 0o1036;

/// Splits a `name|alias|alias` blob on `|`: every piece but the last is
/// an alias, the last piece is the primary name (`unibi_from_mem`'s
/// `while ((z = strchr(a,'|')))` loop — note the name is the final
/// field, the opposite of the "short name first" terminfo convention
/// the file-lookup tools use).
fn split_name_aliases(blob: &[u8]) -> (TermString, Vec<TermString>) {
    let mut aliases = Vec::new();
    let mut rest = blob;
    while let Some(pos) = rest.iter().position(|&b| b == b'|') {
        aliases.push(TermString::from(&rest[..pos]));
        rest = &rest[pos + 1..];
    }
    // `blob` is the NUL-terminated name section written by `dump`; strip
    // the terminator so it doesn't end up embedded in `name` itself.
    if let Some((&0, body)) = rest.split_last() {
        rest = body;
    }
    (TermString::from(rest), aliases)
}

/// Resolves a signed 16-bit offset into a NUL-terminated string within
/// `table` (`off_of`): negative or out-of-range offsets are absent.
fn off_of(table: &[u8], i: i32) -> Option<TermString> {
    if i < 0 || i as usize >= table.len() {
        return None;
    }
    let start = i as usize;
    let end = table[start..]
        .iter()
        .position(|&b| b == 0)
        .map(|p| start + p)
        .unwrap_or(table.len());
    Some(TermString::from(&table[start..end]))
}

/// Parses a standard-format terminfo/termcap-style binary record
/// (`unibi_from_mem`).
pub fn from_mem(data: &[u8]) -> Result<Term> {
    ensure_len!(data.len(), 12, "header");

    let magic = get_u16le(&data[0..2]);
    let numsize: usize = match magic {
        MAGIC_16BIT => 2,
        MAGIC_32BIT => 4,
        _ => return Err(Error::Invalid("unrecognized magic number")),
    };

    let namlen = get_u16le(&data[2..4]) as usize;
    let boollen = get_u16le(&data[4..6]) as usize;
    let numlen = get_u16le(&data[6..8]) as usize;
    let strslen = get_u16le(&data[8..10]) as usize;
    let tablsz = get_u16le(&data[10..12]) as usize;

    let mut p = 12usize;
    ensure_len!(data.len() - p, namlen, "name field");
    let (name, aliases) = split_name_aliases(&data[p..p + namlen]);
    p += namlen;

    let mut term = Term::empty_shell();
    term.name = name;
    term.aliases = aliases;

    ensure_len!(data.len() - p, boollen, "boolean capabilities");
    {
        let bools = term.bools_slice_mut();
        for (i, &byte) in data[p..p + boollen].iter().enumerate() {
            if i < BOOL_COUNT {
                bools[i] = byte != 0;
            }
        }
    }
    p += boollen;

    if (namlen + boollen) % 2 == 1 && p < data.len() {
        p += 1;
    }

    let numbytes = numlen
        .checked_mul(numsize)
        .ok_or(Error::Invalid("numeric section too large"))?;
    ensure_len!(data.len() - p, numbytes, "numeric capabilities");
    {
        let nums = term.nums_slice_mut();
        for i in 0..numlen {
            let v = if numsize == 2 {
                get_i16le(&data[p + i * 2..p + i * 2 + 2])
            } else {
                get_i32le(&data[p + i * 4..p + i * 4 + 4])
            };
            if i < NUM_COUNT {
                nums[i] = v;
            }
        }
    }
    p += numbytes;

    let offbytes = strslen
        .checked_mul(2)
        .ok_or(Error::Invalid("string offset table too large"))?;
    ensure_len!(data.len() - p, offbytes, "string offset table");
    let offtab_start = p;
    p += offbytes;

    ensure_len!(data.len() - p, tablsz, "string table");
    let strtab = &data[p..p + tablsz];
    {
        let strs = term.strs_slice_mut();
        for i in 0..strslen {
            let off = get_i16le(&data[offtab_start + i * 2..offtab_start + i * 2 + 2]);
            if i < STR_COUNT {
                strs[i] = off_of(strtab, off);
            }
        }
    }
    p += tablsz;

    if tablsz % 2 == 1 && p < data.len() {
        p += 1;
    }

    if data.len() - p >= 10 {
        parse_extended(data, p, numsize, &mut term)?;
    }

    debug_assert!(term.check_ext_names_invariant());
    Ok(term)
}

fn parse_extended(data: &[u8], mut p: usize, numsize: usize, term: &mut Term) -> Result<()> {
    let extboollen = get_u16le(&data[p..p + 2]) as i32;
    let extnumlen = get_u16le(&data[p + 2..p + 4]) as i32;
    let extstrslen = get_u16le(&data[p + 4..p + 6]) as i32;
    let _extofflen = get_u16le(&data[p + 6..p + 8]) as i32;
    let exttablsz = get_u16le(&data[p + 8..p + 10]) as i32;

    // Out-of-range sub-header fields: silently skip the whole section,
    // matching unibi_from_mem (not a hard error).
    if extboollen > MAX15BITS
        || extnumlen > MAX15BITS
        || extstrslen > MAX15BITS
        || exttablsz > MAX15BITS
    {
        return Ok(());
    }
    let (extboollen, extnumlen, extstrslen, exttablsz) =
        (extboollen as usize, extnumlen as usize, extstrslen as usize, exttablsz as usize);
    let extalllen = extboollen + extnumlen + extstrslen;

    p += 10;

    let needed = extboollen
        + extboollen % 2
        + extnumlen * numsize
        + extstrslen * 2
        + extalllen * 2
        + exttablsz;
    ensure_len!(data.len() - p, needed, "extended section");

    for &byte in &data[p..p + extboollen] {
        term.ext_bools_mut().push(byte != 0)?;
    }
    p += extboollen;
    if extboollen % 2 == 1 {
        p += 1;
    }

    for i in 0..extnumlen {
        let v = if numsize == 2 {
            get_i16le(&data[p + i * 2..p + i * 2 + 2])
        } else {
            get_i32le(&data[p + i * 4..p + i * 4 + 4])
        };
        term.ext_nums_mut().push(v)?;
    }
    p += extnumlen * numsize;

    let tbl1 = p + extstrslen * 2 + extalllen * 2;
    let mut s_max = 0usize;
    let mut s_sum = 0usize;
    let mut str_offsets = Vec::with_capacity(extstrslen);
    for i in 0..extstrslen {
        let v = get_i16le(&data[p + i * 2..p + i * 2 + 2]);
        if v < 0 || v as usize >= exttablsz {
            str_offsets.push(None);
            continue;
        }
        let start = tbl1 + v as usize;
        let remaining = &data[start..tbl1 + exttablsz];
        // `end` marks one past the string, including its NUL if one was
        // found; `content_end` is where the string's bytes (sans NUL) stop.
        let (end, content_end) = match remaining.iter().position(|&b| b == 0) {
            Some(nul) => (start + nul + 1, start + nul),
            None => (tbl1 + exttablsz, tbl1 + exttablsz),
        };
        s_sum += end - start;
        s_max = s_max.max(end - tbl1);
        str_offsets.push(Some((start, content_end)));
    }
    p += extstrslen * 2;

    if s_max != s_sum {
        return Err(Error::Invalid("extended string table size mismatch"));
    }

    let names_table_start = tbl1 + s_sum;
    let tblsz2 = exttablsz - s_sum;

    let mut name_ranges = Vec::with_capacity(extalllen);
    for i in 0..extalllen {
        let v = get_i16le(&data[p + i * 2..p + i * 2 + 2]);
        if v < 0 || v as usize >= tblsz2 {
            return Err(Error::Invalid("extended capability name offset out of range"));
        }
        let start = names_table_start + v as usize;
        let region = &data[start..names_table_start + tblsz2];
        let end = region
            .iter()
            .position(|&b| b == 0)
            .map(|nul| start + nul)
            .ok_or(Error::Invalid("extended capability name not NUL-terminated"))?;
        name_ranges.push((start, end));
    }

    for range in str_offsets {
        let v = range.map(|(s, e)| TermString::from(&data[s..e]));
        term.ext_strs_mut().push(v)?;
    }
    for (start, end) in name_ranges {
        term.ext_names_mut().push(TermString::from(&data[start..end]))?;
    }

    Ok(())
}

/// Computes the required buffer size and, if `buf` is large enough,
/// writes the standard-format encoding of `term` into it (`unibi_dump`'s
/// two-pass size-then-write shape).
pub fn dump(term: &Term, buf: &mut [u8]) -> DumpResult<usize> {
    debug_assert!(term.check_ext_names_invariant());

    let namlen = term.name.len()
        + 1
        + term.aliases.iter().map(|a| a.len() + 1).sum::<usize>();

    let boollen = term
        .bools_slice()
        .iter()
        .rposition(|&b| b)
        .map(|i| i + 1)
        .unwrap_or(0);

    let numlen = term
        .nums_slice()
        .iter()
        .rposition(|&n| n >= 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    let mut numsize = 2usize;
    for &v in &term.nums_slice()[..numlen] {
        if v > MAX15BITS {
            if v > crate::primitives::MAX31BITS {
                return Err(DumpError::Hard(Error::Invalid("numeric capability exceeds 31 bits")));
            }
            numsize = 4;
        }
    }
    // Extended numerics share the same dialect-wide numeric width as the
    // standard ones: one magic, one width, for the whole record.
    for &v in term.ext_nums_raw().iter() {
        if v > MAX15BITS {
            if v > crate::primitives::MAX31BITS {
                return Err(DumpError::Hard(Error::Invalid("extended numeric exceeds 31 bits")));
            }
            numsize = 4;
        }
    }

    let strslen = term
        .strs_slice()
        .iter()
        .rposition(|s| s.is_some())
        .map(|i| i + 1)
        .unwrap_or(0);
    let tablsz: usize = term.strs_slice()[..strslen]
        .iter()
        .filter_map(|s| s.as_ref())
        .map(|s| s.len() + 1)
        .sum();
    if tablsz > MAX15BITS as usize {
        return Err(DumpError::Hard(Error::Invalid("string table exceeds 32767 bytes")));
    }

    if term.count_ext_bool() > MAX15BITS as usize
        || term.count_ext_num() > MAX15BITS as usize
        || term.count_ext_str() > MAX15BITS as usize
    {
        return Err(DumpError::Hard(Error::Invalid("extended capability count too large")));
    }

    let mut req = 2 + 5 * 2 + namlen + boollen;
    if req % 2 == 1 {
        req += 1;
    }
    req += numlen * numsize;
    req += strslen * 2 + tablsz;

    let ext_count = term.count_ext_bool() + term.count_ext_num() + term.count_ext_str();
    let mut ext_tablsz1 = 0usize;
    let mut ext_tablsz2 = 0usize;
    if ext_count > 0 {
        if req % 2 == 1 {
            req += 1;
        }
        req += 5 * 2;
        req += term.count_ext_bool();
        if req % 2 == 1 {
            req += 1;
        }

        req += term.count_ext_num() * numsize;
        req += term.count_ext_str() * 2;
        req += ext_count * 2;

        ext_tablsz1 = term
            .ext_strs_raw()
            .iter()
            .filter_map(|s| s.as_ref())
            .map(|s| s.len() + 1)
            .sum();
        if ext_tablsz1 > MAX15BITS as usize {
            return Err(DumpError::Hard(Error::Invalid("extended string table exceeds 32767 bytes")));
        }
        req += ext_tablsz1;

        ext_tablsz2 = term.ext_names_raw().iter().map(|s| s.len() + 1).sum();
        if ext_tablsz2 > MAX15BITS as usize {
            return Err(DumpError::Hard(Error::Invalid("extended name table exceeds 32767 bytes")));
        }
        req += ext_tablsz2;

        if ext_tablsz1 + ext_tablsz2 > MAX15BITS as usize {
            return Err(DumpError::Hard(Error::Invalid("extended tables exceed 32767 bytes combined")));
        }
    }

    if req > buf.len() {
        return Err(DumpError::BufferTooSmall { required: req });
    }

    let mut w = 0usize;
    put_u16le(&mut buf[w..w + 2], if numsize == 2 { MAGIC_16BIT } else { MAGIC_32BIT });
    w += 2;
    put_u16le(&mut buf[w..w + 2], namlen as u16);
    w += 2;
    put_u16le(&mut buf[w..w + 2], boollen as u16);
    w += 2;
    put_u16le(&mut buf[w..w + 2], numlen as u16);
    w += 2;
    put_u16le(&mut buf[w..w + 2], strslen as u16);
    w += 2;
    put_u16le(&mut buf[w..w + 2], tablsz as u16);
    w += 2;

    for alias in &term.aliases {
        buf[w..w + alias.len()].copy_from_slice(alias.as_bytes());
        w += alias.len();
        buf[w] = b'|';
        w += 1;
    }
    buf[w..w + term.name.len()].copy_from_slice(term.name.as_bytes());
    w += term.name.len();
    buf[w] = 0;
    w += 1;

    for &b in &term.bools_slice()[..boollen] {
        buf[w] = b as u8;
        w += 1;
    }
    if (namlen + boollen) % 2 == 1 {
        buf[w] = 0;
        w += 1;
    }

    for &v in &term.nums_slice()[..numlen] {
        if numsize == 2 {
            put_i16le(&mut buf[w..w + 2], v);
            w += 2;
        } else {
            put_i32le(&mut buf[w..w + 4], v);
            w += 4;
        }
    }

    {
        let offtab = w;
        let tbl = offtab + strslen * 2;
        let mut off = 0usize;
        let mut tbl_w = tbl;
        for (i, s) in term.strs_slice()[..strslen].iter().enumerate() {
            let cell = offtab + i * 2;
            match s {
                None => put_i16le(&mut buf[cell..cell + 2], -1),
                Some(s) => {
                    put_i16le(&mut buf[cell..cell + 2], off as i32);
                    buf[tbl_w..tbl_w + s.len()].copy_from_slice(s.as_bytes());
                    tbl_w += s.len();
                    buf[tbl_w] = 0;
                    tbl_w += 1;
                    off += s.len() + 1;
                }
            }
        }
        w = tbl + tablsz;
    }

    if ext_count > 0 {
        if w % 2 == 1 {
            buf[w] = 0;
            w += 1;
        }
        put_u16le(&mut buf[w..w + 2], term.count_ext_bool() as u16);
        put_u16le(&mut buf[w + 2..w + 4], term.count_ext_num() as u16);
        put_u16le(&mut buf[w + 4..w + 6], term.count_ext_str() as u16);
        put_u16le(&mut buf[w + 6..w + 8], (term.count_ext_str() + ext_count) as u16);
        put_u16le(&mut buf[w + 8..w + 10], (ext_tablsz1 + ext_tablsz2) as u16);
        w += 10;

        for &b in term.ext_bools_raw().iter() {
            buf[w] = b as u8;
            w += 1;
        }
        if term.count_ext_bool() % 2 == 1 {
            buf[w] = 0;
            w += 1;
        }

        for &v in term.ext_nums_raw().iter() {
            if numsize == 2 {
                put_i16le(&mut buf[w..w + 2], v);
                w += 2;
            } else {
                put_i32le(&mut buf[w..w + 4], v);
                w += 4;
            }
        }

        let str_offtab = w;
        let tbl1 = str_offtab + (term.count_ext_str() + ext_count) * 2;
        let tbl2 = tbl1 + ext_tablsz1;
        let mut off = 0usize;
        let mut tbl_w = tbl1;
        for (i, s) in term.ext_strs_raw().iter().enumerate() {
            let cell = str_offtab + i * 2;
            match s {
                None => put_i16le(&mut buf[cell..cell + 2], -1),
                Some(s) => {
                    put_u16le(&mut buf[cell..cell + 2], off as u16);
                    buf[tbl_w..tbl_w + s.len()].copy_from_slice(s.as_bytes());
                    tbl_w += s.len();
                    buf[tbl_w] = 0;
                    tbl_w += 1;
                    off += s.len() + 1;
                }
            }
        }

        let name_offtab = str_offtab + term.count_ext_str() * 2;
        let mut off = 0usize;
        let mut tbl_w = tbl2;
        for (i, name) in term.ext_names_raw().iter().enumerate() {
            let cell = name_offtab + i * 2;
            put_u16le(&mut buf[cell..cell + 2], off as u16);
            buf[tbl_w..tbl_w + name.len()].copy_from_slice(name.as_bytes());
            tbl_w += name.len();
            buf[tbl_w] = 0;
            tbl_w += 1;
            off += name.len() + 1;
        }
        w = tbl2 + ext_tablsz2;
    }

    debug_assert_eq!(w, req);
    Ok(req)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(term: &Term) -> Term {
        let mut sized = [0u8; 0];
        let needed = match dump(term, &mut sized) {
            Err(DumpError::BufferTooSmall { required }) => required,
            other => panic!("expected BufferTooSmall, got {other:?}"),
        };
        let mut buf = vec![0u8; needed];
        let written = dump(term, &mut buf).expect("dump into sized buffer");
        assert_eq!(written, needed);
        from_mem(&buf).expect("parse what we just dumped")
    }

    #[test]
    fn dummy_roundtrips() {
        let t = Term::dummy();
        let back = roundtrip(&t);
        assert_eq!(back.name.to_string(), t.name.to_string());
        assert_eq!(back.aliases.len(), t.aliases.len());
    }

    #[test]
    fn bools_and_strings_roundtrip() {
        let mut t = Term::dummy();
        t.set_bool(3, true);
        t.set_num(5, 42);
        t.set_str(10, Some(&b"hello"[..]));
        let back = roundtrip(&t);
        assert_eq!(back.get_bool(3), 1);
        assert_eq!(back.get_num(5), 42);
        assert_eq!(back.get_str(10), Some(&b"hello"[..]));
    }

    #[test]
    fn extended_capabilities_roundtrip() {
        let mut t = Term::dummy();
        t.add_ext_bool("XB", true).unwrap();
        t.add_ext_num("XN", 7).unwrap();
        t.add_ext_str("XS", Some(&b"payload"[..])).unwrap();
        let back = roundtrip(&t);
        assert_eq!(back.count_ext_bool(), 1);
        assert_eq!(back.get_ext_bool(0), 1);
        assert_eq!(back.get_ext_bool_name(0), Some(&b"XB"[..]));
        assert_eq!(back.get_ext_num(0), 7);
        assert_eq!(back.get_ext_num_name(0), Some(&b"XN"[..]));
        assert_eq!(back.get_ext_str(0), Some(&b"payload"[..]));
        assert_eq!(back.get_ext_str_name(0), Some(&b"XS"[..]));
    }

    #[test]
    fn numeric_dialect_switches_to_32bit_past_15_bits() {
        let mut t = Term::dummy();
        t.set_num(0, MAX15BITS + 1);
        let mut sized = [0u8; 0];
        let needed = match dump(&t, &mut sized) {
            Err(DumpError::BufferTooSmall { required }) => required,
            other => panic!("unexpected: {other:?}"),
        };
        let mut buf = vec![0u8; needed];
        dump(&t, &mut buf).unwrap();
        assert_eq!(get_u16le(&buf[0..2]), MAGIC_32BIT);
        let back = from_mem(&buf).unwrap();
        assert_eq!(back.get_num(0), MAX15BITS + 1);
    }

    #[test]
    fn extended_strings_and_names_do_not_overlap() {
        let mut t = Term::dummy();
        t.add_ext_bool("XB", true).unwrap();
        t.add_ext_num("XN", 3).unwrap();
        t.add_ext_str("XS1", Some(&b"alpha"[..])).unwrap();
        t.add_ext_str("XS2", Some(&b"bravo"[..])).unwrap();
        let back = roundtrip(&t);
        assert_eq!(back.get_ext_bool_name(0), Some(&b"XB"[..]));
        assert_eq!(back.get_ext_num_name(0), Some(&b"XN"[..]));
        assert_eq!(back.get_ext_str_name(0), Some(&b"XS1"[..]));
        assert_eq!(back.get_ext_str_name(1), Some(&b"XS2"[..]));
        assert_eq!(back.get_ext_str(0), Some(&b"alpha"[..]));
        assert_eq!(back.get_ext_str(1), Some(&b"bravo"[..]));
    }

    #[test]
    fn extended_numeric_forces_32bit_dialect() {
        let mut t = Term::dummy();
        t.add_ext_num("XN", MAX15BITS + 1).unwrap();
        let mut sized = [0u8; 0];
        let needed = match dump(&t, &mut sized) {
            Err(DumpError::BufferTooSmall { required }) => required,
            other => panic!("unexpected: {other:?}"),
        };
        let mut buf = vec![0u8; needed];
        let written = dump(&t, &mut buf).unwrap();
        assert_eq!(written, needed);
        assert_eq!(get_u16le(&buf[0..2]), MAGIC_32BIT);
        let back = roundtrip(&t);
        assert_eq!(back.get_ext_num(0), MAX15BITS + 1);
    }

    #[test]
    fn truncated_input_is_rejected() {
        let t = Term::dummy();
        let mut sized = [0u8; 0];
        let needed = match dump(&t, &mut sized) {
            Err(DumpError::BufferTooSmall { required }) => required,
            other => panic!("unexpected: {other:?}"),
        };
        let mut buf = vec![0u8; needed];
        dump(&t, &mut buf).unwrap();
        let err = from_mem(&buf[..buf.len() - 1]).unwrap_err();
        assert!(matches!(err, Error::Truncated(_)));
    }

    #[test]
    fn bad_magic_is_invalid() {
        let mut buf = vec![0u8; 12];
        put_u16le(&mut buf[0..2], 0x1234);
        assert!(matches!(from_mem(&buf), Err(Error::Invalid(_))));
    }
}
