//! The NetBSD curses alternate binary dialect, grounded on
//! `unibi_from_nbc_mem`/`unibi_dump_nbc` in
//! `uninetbsd_curses.c`. This is a distinct wire format from the
//! standard one in `codec::standard` — different section layout, and a
//! remap between NetBSD's own capability ordinals and this crate's
//! standard ordinals.
//!
//! Each capability list (`bools`/`nums`/`strs`) is wrapped in a
//! `{u16 byte_size}{u16 count}{entries...}` header. The size field
//! covers everything from the count field onward; this codec reads and
//! writes it but, like the original, never cross-checks it against the
//! entries that follow — the count field is authoritative.

use crate::error::{ensure_len, DumpError, DumpResult, Error, Result};
use crate::primitives::{get_i16le, get_u16le, put_u16le};
use crate::term::Term;
use crate::variant::TermString;

/// NetBSD boolean ordinal -> standard boolean ordinal (`nc_bools2nbc`).
const BOOL_TO_STD: [u16; 37] = [
    0, 1, 28, 27, 3, 30, 35, 31, 17, 4, 5, 6, 7, 23, 8, 32, 9, 29, 10, 36, 11, 12, 13, 14, 21, 2,
    25, 26, 24, 15, 22, 33, 34, 16, 18, 19, 20,
];

/// NetBSD numeric ordinal -> standard numeric ordinal (`nc_nums2nbc`).
const NUM_TO_STD: [u16; 33] = [
    31, 32, 16, 30, 0, 18, 17, 1, 9, 10, 2, 3, 11, 4, 13, 19, 20, 14, 12, 21, 22, 15, 8, 23, 24,
    25, 26, 27, 5, 28, 6, 29, 7,
];

/// NetBSD string ordinal -> standard string ordinal (`nc_strs2nbc`).
const STR_TO_STD: [u16; 394] = [
    146, 385, 0, 1, 372, 371, 370, 2, 304, 305, 306, 307, 3, 145, 354, 4, 270, 5, 269, 6, 7, 363,
    373, 8, 9, 277, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 374, 308, 21, 22, 362, 280, 23,
    275, 378, 24, 155, 375, 25, 151, 26, 27, 28, 29, 30, 309, 310, 386, 31, 311, 387, 312, 388,
    313, 314, 315, 379, 33, 34, 389, 381, 32, 316, 35, 317, 318, 390, 36, 319, 391, 149, 37, 38,
    152, 39, 40, 41, 320, 42, 321, 322, 323, 380, 382, 324, 43, 325, 326, 44, 327, 150, 285, 284,
    45, 46, 47, 358, 278, 279, 48, 49, 50, 51, 138, 299, 300, 52, 53, 54, 139, 140, 141, 55, 158,
    148, 142, 143, 159, 56, 57, 160, 161, 162, 163, 58, 59, 60, 61, 62, 164, 165, 63, 64, 166, 65,
    66, 68, 69, 70, 71, 72, 73, 74, 75, 67, 216, 217, 218, 219, 220, 221, 222, 223, 224, 225, 226,
    227, 228, 229, 230, 231, 232, 233, 234, 235, 236, 237, 238, 239, 240, 241, 242, 243, 244, 245,
    246, 247, 248, 249, 250, 251, 252, 253, 254, 255, 256, 257, 258, 259, 260, 261, 262, 263, 264,
    265, 266, 267, 268, 167, 168, 76, 77, 78, 79, 80, 169, 170, 355, 171, 172, 81, 173, 174, 82,
    175, 176, 177, 178, 179, 180, 181, 182, 83, 183, 186, 187, 188, 189, 190, 191, 192, 193, 194,
    195, 196, 84, 197, 198, 199, 200, 201, 202, 203, 204, 205, 206, 207, 85, 208, 209, 210, 211,
    212, 213, 86, 214, 184, 185, 87, 88, 89, 90, 91, 93, 94, 95, 96, 97, 98, 99, 100, 92, 273, 157,
    156, 101, 102, 328, 329, 330, 331, 332, 333, 356, 103, 334, 298, 297, 104, 105, 106, 107, 335,
    108, 109, 110, 111, 336, 112, 337, 113, 114, 338, 383, 115, 116, 361, 117, 147, 118, 144, 119,
    120, 283, 281, 276, 121, 215, 357, 122, 123, 124, 125, 126, 127, 128, 384, 129, 130, 339, 364,
    365, 366, 367, 392, 360, 359, 131, 303, 340, 341, 274, 376, 301, 302, 271, 342, 368, 377, 393,
    272, 343, 132, 369, 344, 345, 133, 346, 347, 348, 349, 350, 351, 134, 352, 135, 282, 287, 288,
    289, 290, 291, 292, 293, 294, 295, 296, 136, 137, 286, 154, 153, 353,
];

/// Strips a leading `OT` ("old termcap") prefix from a capability name,
/// mirroring `PUT_CAP2EXT_NAME`'s treatment of names with no NetBSD
/// ordinal of their own. This crate has no capability-name table for
/// standard capabilities, so `dump_nbc` never needs this at runtime — it
/// only emits a `Term`'s own named extended capabilities — but the
/// behavior is worth pinning down with a test.
#[cfg(test)]
fn strip_ot_prefix(name: &[u8]) -> &[u8] {
    if name.len() >= 2 && name[0] == b'O' && name[1] == b'T' {
        &name[2..]
    } else {
        name
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8]> {
        ensure_len!(self.remaining(), n, what);
        let s = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn u16(&mut self, what: &'static str) -> Result<u16> {
        Ok(get_u16le(self.take(2, what)?))
    }

    fn i16(&mut self, what: &'static str) -> Result<i32> {
        Ok(get_i16le(self.take(2, what)?))
    }

    /// A `{u16 len}{len bytes}` field where `len == 0` means "not
    /// present", and any other length includes a trailing NUL to strip.
    fn prefixed_str(&mut self, what: &'static str) -> Result<Option<TermString>> {
        let len = self.u16(what)? as usize;
        if len == 0 {
            return Ok(None);
        }
        let bytes = self.take(len, what)?;
        Ok(Some(TermString::from(&bytes[..len - 1])))
    }

    /// Same shape, but an empty field is a valid empty byte string
    /// rather than "absent" (used for the three name fields).
    fn prefixed_bytes(&mut self, what: &'static str) -> Result<Vec<u8>> {
        let len = self.u16(what)? as usize;
        if len == 0 {
            return Ok(Vec::new());
        }
        Ok(self.take(len, what)?[..len - 1].to_vec())
    }

    /// A `{u16 len}{len bytes}` field with no NUL terminator at all
    /// (`HANDLE_EXT_NAME`'s plain `memcpy`) — used for extended
    /// capability names, unlike the three NUL-terminated name fields
    /// above.
    fn exact_bytes(&mut self, what: &'static str) -> Result<Vec<u8>> {
        let len = self.u16(what)? as usize;
        Ok(self.take(len, what)?.to_vec())
    }
}

/// Parses a NetBSD curses binary record (`unibi_from_nbc_mem`).
pub fn from_nbc_mem(data: &[u8]) -> Result<Term> {
    let mut c = Cursor::new(data);
    if c.u8("leading tag byte")? != 1 {
        return Err(Error::Invalid("NetBSD record missing leading tag byte"));
    }

    let short_name = c.prefixed_bytes("short name")?;
    let aliases_blob = c.prefixed_bytes("aliases")?;
    let description = c.prefixed_bytes("description")?;

    let mut term = Term::empty_shell();
    let mut aliases = vec![TermString::from(short_name.as_slice())];
    if !aliases_blob.is_empty() {
        let mut rest = aliases_blob.as_slice();
        while let Some(pos) = rest.iter().position(|&b| b == b'|') {
            aliases.push(TermString::from(&rest[..pos]));
            rest = &rest[pos + 1..];
        }
        aliases.push(TermString::from(rest));
    }
    term.name = if description.is_empty() {
        aliases[0].clone()
    } else {
        TermString::from(description.as_slice())
    };
    term.aliases = aliases;

    let boolsz = c.u16("boolean list size")?;
    if boolsz != 0 {
        let count = c.u16("boolean list count")?;
        for _ in 0..count {
            let idx = c.u16("boolean ordinal")?;
            let _flag = c.u8("boolean flag")?;
            let std_idx = *BOOL_TO_STD
                .get(idx as usize)
                .ok_or(Error::Invalid("NetBSD boolean ordinal out of range"))?;
            term.set_bool(std_idx as usize, true);
        }
    }

    let numsz = c.u16("numeric list size")?;
    if numsz != 0 {
        let count = c.u16("numeric list count")?;
        for _ in 0..count {
            let idx = c.u16("numeric ordinal")?;
            let val = c.i16("numeric value")?;
            let std_idx = *NUM_TO_STD
                .get(idx as usize)
                .ok_or(Error::Invalid("NetBSD numeric ordinal out of range"))?;
            term.set_num(std_idx as usize, val);
        }
    }

    let strsz = c.u16("string list size")?;
    if strsz != 0 {
        let count = c.u16("string list count")?;
        for _ in 0..count {
            let idx = c.u16("string ordinal")?;
            let val = c.prefixed_str("string value")?;
            let std_idx = *STR_TO_STD
                .get(idx as usize)
                .ok_or(Error::Invalid("NetBSD string ordinal out of range"))?;
            term.set_str(std_idx as usize, val);
        }
    }

    let extsz = c.u16("extended section size")?;
    if extsz != 0 {
        let count = c.u16("extended section count")?;
        for _ in 0..count {
            let name = c.exact_bytes("extended capability name")?;
            let tag = c.u8("extended capability type tag")?;
            match tag {
                b'f' => {
                    let flag = c.u8("extended boolean flag")?;
                    term.add_ext_bool(name.as_slice(), flag != 0)?;
                }
                b'n' => {
                    let val = c.u16("extended numeric value")?;
                    term.add_ext_num(name.as_slice(), val as i32)?;
                }
                b's' => {
                    let val = c.prefixed_str("extended string value")?;
                    term.add_ext_str(name.as_slice(), val)?;
                }
                _ => return Err(Error::Invalid("unknown extended capability type tag")),
            }
        }
    }

    Ok(term)
}

struct Sizer {
    req: usize,
}

impl Sizer {
    fn byte(&mut self) {
        self.req += 1;
    }
    fn u16(&mut self) {
        self.req += 2;
    }
    fn str_field(&mut self, s: Option<&[u8]>) {
        self.u16();
        if let Some(s) = s {
            self.req += s.len() + 1;
        }
    }
}

/// Computes the required buffer size and, if `buf` is large enough,
/// writes the NetBSD curses binary encoding of `term` into it
/// (`unibi_dump_nbc`).
pub fn dump_nbc(term: &Term, buf: &mut [u8]) -> DumpResult<usize> {
    let mut bool_entries: Vec<(u16, bool)> = Vec::new();
    for (i, &std_idx) in BOOL_TO_STD.iter().enumerate() {
        if term.get_bool(std_idx as usize) != 0 {
            bool_entries.push((i as u16, true));
        }
    }
    let mut num_entries: Vec<(u16, i32)> = Vec::new();
    for (i, &std_idx) in NUM_TO_STD.iter().enumerate() {
        let v = term.get_num(std_idx as usize);
        if v >= 0 {
            num_entries.push((i as u16, v));
        }
    }
    let mut str_entries: Vec<(u16, Option<&[u8]>)> = Vec::new();
    for (i, &std_idx) in STR_TO_STD.iter().enumerate() {
        if let Some(s) = term.get_str(std_idx as usize) {
            str_entries.push((i as u16, Some(s)));
        }
    }

    let mut sz = Sizer { req: 0 };
    sz.byte();
    sz.str_field(Some(term.aliases[0].as_bytes()));
    {
        let joined = join_aliases_after_first(term);
        sz.str_field(if joined.is_empty() { None } else { Some(&joined) });
    }
    sz.str_field(Some(term.name.as_bytes()));

    if !bool_entries.is_empty() {
        sz.u16();
        sz.u16();
        for _ in &bool_entries {
            sz.u16();
            sz.byte();
        }
    } else {
        sz.u16();
    }

    if !num_entries.is_empty() {
        sz.u16();
        sz.u16();
        for _ in &num_entries {
            sz.u16();
            sz.u16();
        }
    } else {
        sz.u16();
    }

    if !str_entries.is_empty() {
        sz.u16();
        sz.u16();
        for (_, s) in &str_entries {
            sz.u16();
            sz.str_field(*s);
        }
    } else {
        sz.u16();
    }

    let ext_count = term.count_ext_bool() + term.count_ext_num() + term.count_ext_str();
    let mut ext_body = 0usize; // bytes from the count field onward
    if ext_count > 0 {
        let before = sz.req;
        sz.u16();
        sz.u16();
        for (i, _) in term.ext_bools_raw().iter().enumerate() {
            let name = term.get_ext_bool_name(i).unwrap_or(b"");
            sz.u16();
            sz.req += name.len();
            sz.byte();
            sz.byte();
        }
        for (i, _) in term.ext_nums_raw().iter().enumerate() {
            let name = term.get_ext_num_name(i).unwrap_or(b"");
            sz.u16();
            sz.req += name.len();
            sz.byte();
            sz.u16();
        }
        for (i, v) in term.ext_strs_raw().iter().enumerate() {
            let name = term.get_ext_str_name(i).unwrap_or(b"");
            sz.u16();
            sz.req += name.len();
            sz.byte();
            sz.str_field(v.as_ref().map(|s| s.as_bytes()));
        }
        // bytes written minus the size field itself
        ext_body = sz.req - before - 2;
    } else {
        sz.u16();
    }

    let req = sz.req;
    if req > buf.len() {
        return Err(DumpError::BufferTooSmall { required: req });
    }

    let mut w = Writer { buf, pos: 0 };
    w.byte(1);
    w.str_field(Some(term.aliases[0].as_bytes()));
    let joined = join_aliases_after_first(term);
    w.str_field(if joined.is_empty() { None } else { Some(&joined) });
    w.str_field(Some(term.name.as_bytes()));

    if bool_entries.is_empty() {
        w.u16(0);
    } else {
        w.u16((2 + bool_entries.len() * 3) as u16);
        w.u16(bool_entries.len() as u16);
        for (idx, _) in &bool_entries {
            w.u16(*idx);
            w.byte(1);
        }
    }

    if num_entries.is_empty() {
        w.u16(0);
    } else {
        w.u16((2 + num_entries.len() * 4) as u16);
        w.u16(num_entries.len() as u16);
        for (idx, v) in &num_entries {
            w.u16(*idx);
            w.i16(*v);
        }
    }

    if str_entries.is_empty() {
        w.u16(0);
    } else {
        let body: usize = str_entries
            .iter()
            .map(|(_, s)| 2 + 2 + s.map(|s| s.len() + 1).unwrap_or(0))
            .sum();
        w.u16((2 + body) as u16);
        w.u16(str_entries.len() as u16);
        for (idx, s) in &str_entries {
            w.u16(*idx);
            w.str_field(*s);
        }
    }

    if ext_count == 0 {
        w.u16(0);
    } else {
        w.u16((2 + ext_body) as u16);
        w.u16(ext_count as u16);
        for (i, &v) in term.ext_bools_raw().iter().enumerate() {
            let name = term.get_ext_bool_name(i).unwrap_or(b"").to_vec();
            w.str_name(&name);
            w.byte(b'f');
            w.byte(v as u8);
        }
        for (i, &v) in term.ext_nums_raw().iter().enumerate() {
            let name = term.get_ext_num_name(i).unwrap_or(b"").to_vec();
            w.str_name(&name);
            w.byte(b'n');
            w.u16(v as u16);
        }
        for (i, v) in term.ext_strs_raw().iter().enumerate() {
            let name = term.get_ext_str_name(i).unwrap_or(b"").to_vec();
            w.str_name(&name);
            w.byte(b's');
            w.str_field(v.as_ref().map(|s| s.as_bytes()));
        }
    }

    debug_assert_eq!(w.pos, req);
    Ok(req)
}

fn join_aliases_after_first(term: &Term) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, a) in term.aliases.iter().enumerate().skip(1) {
        if i > 1 {
            out.push(b'|');
        }
        out.extend_from_slice(a.as_bytes());
    }
    out
}

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn byte(&mut self, v: u8) {
        self.buf[self.pos] = v;
        self.pos += 1;
    }
    fn u16(&mut self, v: u16) {
        put_u16le(&mut self.buf[self.pos..self.pos + 2], v);
        self.pos += 2;
    }
    fn i16(&mut self, v: i32) {
        crate::primitives::put_i16le(&mut self.buf[self.pos..self.pos + 2], v);
        self.pos += 2;
    }
    fn str_name(&mut self, name: &[u8]) {
        self.u16(name.len() as u16);
        self.buf[self.pos..self.pos + name.len()].copy_from_slice(name);
        self.pos += name.len();
    }
    fn str_field(&mut self, s: Option<&[u8]>) {
        match s {
            None => self.u16(0),
            Some(s) => {
                self.u16((s.len() + 1) as u16);
                self.buf[self.pos..self.pos + s.len()].copy_from_slice(s);
                self.pos += s.len();
                self.buf[self.pos] = 0;
                self.pos += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(term: &Term) -> Term {
        let mut sized = [0u8; 0];
        let needed = match dump_nbc(term, &mut sized) {
            Err(DumpError::BufferTooSmall { required }) => required,
            other => panic!("expected BufferTooSmall, got {other:?}"),
        };
        let mut buf = vec![0u8; needed];
        let written = dump_nbc(term, &mut buf).expect("dump_nbc into sized buffer");
        assert_eq!(written, needed);
        from_nbc_mem(&buf).expect("parse what we just dumped")
    }

    #[test]
    fn dummy_roundtrips() {
        let t = Term::dummy();
        let back = roundtrip(&t);
        assert_eq!(back.name.to_string(), t.name.to_string());
    }

    #[test]
    fn standard_capabilities_roundtrip_through_remap() {
        let mut t = Term::dummy();
        t.set_bool(BOOL_TO_STD[2] as usize, true);
        t.set_num(NUM_TO_STD[5] as usize, 123);
        t.set_str(STR_TO_STD[7] as usize, Some(&b"cup-like"[..]));
        let back = roundtrip(&t);
        assert_eq!(back.get_bool(BOOL_TO_STD[2] as usize), 1);
        assert_eq!(back.get_num(NUM_TO_STD[5] as usize), 123);
        assert_eq!(back.get_str(STR_TO_STD[7] as usize), Some(&b"cup-like"[..]));
    }

    #[test]
    fn extended_capabilities_roundtrip() {
        let mut t = Term::dummy();
        t.add_ext_bool("Xb", true).unwrap();
        t.add_ext_num("Xn", 9).unwrap();
        t.add_ext_str("Xs", Some(&b"value"[..])).unwrap();
        let back = roundtrip(&t);
        assert_eq!(back.count_ext_bool(), 1);
        assert_eq!(back.get_ext_bool_name(0), Some(&b"Xb"[..]));
        assert_eq!(back.get_ext_num(0), 9);
        assert_eq!(back.get_ext_str(0), Some(&b"value"[..]));
    }

    #[test]
    fn missing_leading_tag_byte_is_invalid() {
        let buf = [0u8, 0, 0];
        assert!(matches!(from_nbc_mem(&buf), Err(Error::Invalid(_))));
    }

    #[test]
    fn unknown_extended_tag_is_invalid() {
        // tag byte, empty name/aliases/description, empty bool/num/str
        // lists, then one extended entry with an unrecognized tag 'z'.
        let mut buf = vec![1u8];
        buf.extend_from_slice(&0u16.to_le_bytes()); // short name
        buf.extend_from_slice(&0u16.to_le_bytes()); // aliases
        buf.extend_from_slice(&0u16.to_le_bytes()); // description
        buf.extend_from_slice(&0u16.to_le_bytes()); // bools
        buf.extend_from_slice(&0u16.to_le_bytes()); // nums
        buf.extend_from_slice(&0u16.to_le_bytes()); // strs
        buf.extend_from_slice(&8u16.to_le_bytes()); // ext size
        buf.extend_from_slice(&1u16.to_le_bytes()); // ext count
        buf.extend_from_slice(&0u16.to_le_bytes()); // name len
        buf.push(b'z'); // unknown tag
        assert!(matches!(from_nbc_mem(&buf), Err(Error::Invalid(_))));
    }

    #[test]
    fn ot_prefix_is_stripped() {
        assert_eq!(strip_ot_prefix(b"OTbs"), b"bs");
        assert_eq!(strip_ot_prefix(b"bs"), b"bs");
        assert_eq!(strip_ot_prefix(b"O"), b"O");
    }
}
