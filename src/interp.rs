//! The parameterized-string interpreter, grounded on `unibi_format`/
//! `unibi_run` in `unibilium.c`. A stack machine that drives two
//! caller-supplied callbacks; it never fails — malformed format strings
//! degrade to emitting their raw bytes.

use crate::variant::Variant;

/// Capacity bound ("capacity ≥ 64 variants is sufficient in practice;
/// design requires ≥ 32"). Pushes beyond this are silently dropped
/// rather than growing the stack.
const STACK_CAPACITY: usize = 64;

/// Pushing beyond width/precision/`{N}` bounds this large would let a
/// hostile format string (`%999999999d`) drive an unbounded allocation;
/// the original's fixed `dput()` buffer bounds this implicitly via
/// `int`, this crate bounds it explicitly.
const MAX_FIELD: usize = 4096;

/// The 26 dynamic (`a`..`z`) and 26 static (`A`..`Z`) variable slots.
/// Dynamic variables are meant to be reset between unrelated formats by
/// the caller; `format` itself never resets them — that's the caller's
/// lifecycle to manage, matching `unibi_format`'s `unibi_var_t
/// dynamic[26]` parameter.
#[derive(Debug, Clone)]
pub struct Vars {
    pub dynamic: [Variant; 26],
    pub statics: [Variant; 26],
}

impl Default for Vars {
    fn default() -> Self {
        Vars {
            dynamic: std::array::from_fn(|_| Variant::default()),
            statics: std::array::from_fn(|_| Variant::default()),
        }
    }
}

/// The nine input parameters.
pub type Params = [Variant; 9];

struct Stack {
    data: Vec<Variant>,
}

impl Stack {
    fn new() -> Self {
        Stack { data: Vec::with_capacity(STACK_CAPACITY) }
    }

    /// Silently drops the push once the stack is at capacity.
    fn push(&mut self, v: Variant) {
        if self.data.len() < STACK_CAPACITY {
            self.data.push(v);
        }
    }

    /// Popping an empty stack yields the integer zero.
    fn pop(&mut self) -> Variant {
        self.data.pop().unwrap_or(Variant::int(0))
    }

    fn pop_int(&mut self) -> i32 {
        self.pop().as_int()
    }

    fn pop_bytes(&mut self) -> Vec<u8> {
        self.pop().as_bytes().to_vec()
    }
}

#[derive(Default, Clone, Copy)]
struct Flags {
    alt: bool,
    plus: bool,
    minus: bool,
    zero: bool,
    space: bool,
}

/// Runs `fmt` against `vars` and `params`, invoking `write` for literal
/// output and `pad` for `$<…>` directives (`unibi_format`).
pub fn format(
    vars: &mut Vars,
    fmt: &[u8],
    params: &Params,
    mut write: impl FnMut(&[u8]),
    mut pad: impl FnMut(u32, bool, bool),
) {
    let mut stack = Stack::new();
    let mut params = params.clone();
    let mut i = 0usize;

    while i < fmt.len() {
        match fmt[i] {
            b'%' => i = exec_percent(vars, fmt, i, &mut stack, &mut params, &mut write),
            b'$' => match try_pad(fmt, i, &mut pad) {
                Some(next) => i = next,
                None => {
                    write(b"$");
                    i += 1;
                }
            },
            _ => {
                let start = i;
                while i < fmt.len() && fmt[i] != b'%' && fmt[i] != b'$' {
                    i += 1;
                }
                write(&fmt[start..i]);
            }
        }
    }
}

/// A top-level convenience entry point (`unibi_run`): binds a fresh
/// [`Vars`] and output sink, runs `fmt`, and returns the number of bytes
/// that *would* have been written — possibly exceeding `buf.len()`, in
/// which case only the first `buf.len()` bytes are actually copied.
pub fn run(fmt: &[u8], params: &Params, buf: &mut [u8]) -> usize {
    let mut vars = Vars::default();
    let mut total = 0usize;
    let mut written = 0usize;
    format(
        &mut vars,
        fmt,
        params,
        |bytes| {
            total += bytes.len();
            let remaining = buf.len().saturating_sub(written);
            let take = bytes.len().min(remaining);
            buf[written..written + take].copy_from_slice(&bytes[..take]);
            written += take;
        },
        |_, _, _| {},
    );
    total
}

/// Parses the `$<n[.f][/][*]>` or `$<n[.f][*][/]>` padding directive
/// starting at `fmt[i] == '$'`. Returns `None` (malformed) if the
/// directive doesn't match, in which case the caller emits `$` literally.
fn try_pad(fmt: &[u8], i: usize, pad: &mut impl FnMut(u32, bool, bool)) -> Option<usize> {
    if fmt.get(i + 1) != Some(&b'<') {
        return None;
    }
    let mut j = i + 2;
    let start = j;
    while fmt.get(j).is_some_and(u8::is_ascii_digit) {
        j += 1;
    }
    if j == start {
        return None;
    }
    let whole: u32 = std::str::from_utf8(&fmt[start..j]).ok()?.parse().ok()?;

    let mut tenths = 0u32;
    if fmt.get(j) == Some(&b'.') {
        let digit = *fmt.get(j + 1)?;
        if !digit.is_ascii_digit() {
            return None;
        }
        tenths = (digit - b'0') as u32;
        j += 2;
    }

    let mut mandatory = false;
    let mut proportional = false;
    loop {
        match fmt.get(j) {
            Some(b'/') => {
                mandatory = true;
                j += 1;
            }
            Some(b'*') => {
                proportional = true;
                j += 1;
            }
            _ => break,
        }
    }

    if fmt.get(j) != Some(&b'>') {
        return None;
    }
    pad(whole.saturating_mul(10) + tenths, proportional, mandatory);
    Some(j + 1)
}

/// Executes the `%`-directive starting at `fmt[i] == '%'`, returning the
/// index just past it. Unrecognized two-byte sequences emit themselves
/// raw.
fn exec_percent(
    vars: &mut Vars,
    fmt: &[u8],
    i: usize,
    stack: &mut Stack,
    params: &mut Params,
    write: &mut impl FnMut(&[u8]),
) -> usize {
    let Some(&c) = fmt.get(i + 1) else {
        write(b"%");
        return i + 1;
    };

    match c {
        b'%' => {
            write(b"%");
            i + 2
        }
        b'c' => {
            let v = stack.pop_int();
            write(&[v as u8]);
            i + 2
        }
        b's' => {
            let v = stack.pop_bytes();
            write(&v);
            i + 2
        }
        b'p' => match fmt.get(i + 2) {
            Some(&d) if (b'1'..=b'9').contains(&d) => {
                stack.push(params[(d - b'1') as usize].clone());
                i + 3
            }
            _ => {
                write(&fmt[i..i + 2]);
                i + 2
            }
        },
        b'P' => match fmt.get(i + 2) {
            Some(&ch) if ch.is_ascii_lowercase() => {
                vars.dynamic[(ch - b'a') as usize] = stack.pop();
                i + 3
            }
            Some(&ch) if ch.is_ascii_uppercase() => {
                vars.statics[(ch - b'A') as usize] = stack.pop();
                i + 3
            }
            _ => {
                write(&fmt[i..i + 2]);
                i + 2
            }
        },
        b'g' => match fmt.get(i + 2) {
            Some(&ch) if ch.is_ascii_lowercase() => {
                stack.push(vars.dynamic[(ch - b'a') as usize].clone());
                i + 3
            }
            Some(&ch) if ch.is_ascii_uppercase() => {
                stack.push(vars.statics[(ch - b'A') as usize].clone());
                i + 3
            }
            _ => {
                write(&fmt[i..i + 2]);
                i + 2
            }
        },
        b'\'' => {
            if fmt.get(i + 3) == Some(&b'\'') {
                stack.push(Variant::int(fmt[i + 2] as i32));
                i + 4
            } else {
                write(&fmt[i..i + 2]);
                i + 2
            }
        }
        b'{' => {
            let start = i + 2;
            let mut j = start;
            if fmt.get(j) == Some(&b'-') {
                j += 1;
            }
            while fmt.get(j).is_some_and(u8::is_ascii_digit) {
                j += 1;
            }
            if j > start && fmt.get(j) == Some(&b'}') {
                let n: i32 = std::str::from_utf8(&fmt[start..j])
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
                stack.push(Variant::int(n));
                j + 1
            } else {
                write(&fmt[i..i + 2]);
                i + 2
            }
        }
        b'l' => {
            let v = stack.pop_bytes();
            stack.push(Variant::int(v.len() as i32));
            i + 2
        }
        b'i' => {
            params[0] = Variant::int(params[0].as_int().wrapping_add(1));
            params[1] = Variant::int(params[1].as_int().wrapping_add(1));
            i + 2
        }
        b'?' => i + 2,
        b't' => {
            let cond = stack.pop_int();
            if cond == 0 {
                skip_branch(fmt, i + 2, true)
            } else {
                i + 2
            }
        }
        b'e' => skip_branch(fmt, i + 2, false),
        b';' => i + 2,
        b'+' => {
            binop(stack, i32::wrapping_add);
            i + 2
        }
        b'-' => {
            binop(stack, i32::wrapping_sub);
            i + 2
        }
        b'*' => {
            binop(stack, i32::wrapping_mul);
            i + 2
        }
        b'/' => {
            binop(stack, |a, b| if b == 0 { 0 } else { a.wrapping_div(b) });
            i + 2
        }
        b'm' => {
            binop(stack, |a, b| if b == 0 { 0 } else { a.wrapping_rem(b) });
            i + 2
        }
        b'&' => {
            binop(stack, |a, b| a & b);
            i + 2
        }
        b'|' => {
            binop(stack, |a, b| a | b);
            i + 2
        }
        b'^' => {
            binop(stack, |a, b| a ^ b);
            i + 2
        }
        b'=' => {
            binop(stack, |a, b| (a == b) as i32);
            i + 2
        }
        b'<' => {
            binop(stack, |a, b| (a < b) as i32);
            i + 2
        }
        b'>' => {
            binop(stack, |a, b| (a > b) as i32);
            i + 2
        }
        b'A' => {
            binop(stack, |a, b| ((a != 0) && (b != 0)) as i32);
            i + 2
        }
        b'O' => {
            binop(stack, |a, b| ((a != 0) || (b != 0)) as i32);
            i + 2
        }
        b'!' => {
            let v = stack.pop_int();
            stack.push(Variant::int((v == 0) as i32));
            i + 2
        }
        b'~' => {
            let v = stack.pop_int();
            stack.push(Variant::int(!v));
            i + 2
        }
        b':' | b'#' | b'.' | b'0'..=b'9' | b'd' | b'o' | b'x' | b'X' => {
            match exec_conversion(stack, fmt, i + 1, write) {
                Some(next) => next,
                None => {
                    write(&fmt[i..i + 2]);
                    i + 2
                }
            }
        }
        _ => {
            write(&fmt[i..i + 2]);
            i + 2
        }
    }
}

/// Pops two operands (`b` then `a`, since `b` was pushed last), applies
/// `op(a, b)`, and pushes the integer result.
fn binop(stack: &mut Stack, op: impl FnOnce(i32, i32) -> i32) {
    let b = stack.pop_int();
    let a = stack.pop_int();
    stack.push(Variant::int(op(a, b)));
}

/// Scans forward from just past a `%?`'s `%t` (or a taken `%t`'s own
/// body) looking for the matching `%e`/`%;`, tracking nested `%?`/`%;`
/// depth. When `stop_on_e` is true (skipping a false `%t` body), either
/// an `%e` or a `%;` at depth 0 ends the scan; otherwise (skipping a
/// taken-then's `%e` branch) only `%;` does.
fn skip_branch(fmt: &[u8], mut i: usize, stop_on_e: bool) -> usize {
    let mut depth = 0usize;
    while i < fmt.len() {
        if fmt[i] == b'%' && i + 1 < fmt.len() {
            match fmt[i + 1] {
                b'?' => {
                    depth += 1;
                    i += 2;
                    continue;
                }
                b';' => {
                    if depth == 0 {
                        return i + 2;
                    }
                    depth -= 1;
                    i += 2;
                    continue;
                }
                b'e' => {
                    if depth == 0 && stop_on_e {
                        return i + 2;
                    }
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        i += 1;
    }
    i
}

/// Parses and executes the printf-style conversion grammar:
/// `[:][flags][width][.precision]conversion`, where
/// `j` points just past the `%`. Returns `None` if no valid conversion
/// character terminates the parse, so the caller can fall back to
/// emitting the raw `%x` pair.
fn exec_conversion(
    stack: &mut Stack,
    fmt: &[u8],
    mut j: usize,
    write: &mut impl FnMut(&[u8]),
) -> Option<usize> {
    if fmt.get(j) == Some(&b':') {
        j += 1;
    }
    let mut flags = Flags::default();
    loop {
        match fmt.get(j) {
            Some(b'#') => flags.alt = true,
            Some(b'+') => flags.plus = true,
            Some(b'-') => flags.minus = true,
            Some(b'0') => flags.zero = true,
            Some(b' ') => flags.space = true,
            _ => break,
        }
        j += 1;
    }

    let width = parse_decimal(fmt, &mut j).map(|w| w.min(MAX_FIELD));
    let precision = if fmt.get(j) == Some(&b'.') {
        j += 1;
        Some(parse_decimal(fmt, &mut j).unwrap_or(0).min(MAX_FIELD))
    } else {
        None
    };

    let conv = *fmt.get(j)?;
    if !matches!(conv, b'd' | b'o' | b'x' | b'X' | b's') {
        return None;
    }
    j += 1;

    let rendered = if conv == b's' {
        render_str(stack.pop_bytes(), flags, width, precision)
    } else {
        render_int(stack.pop_int(), conv, flags, width, precision)
    };
    write(&rendered);
    Some(j)
}

fn parse_decimal(fmt: &[u8], j: &mut usize) -> Option<usize> {
    let start = *j;
    while fmt.get(*j).is_some_and(u8::is_ascii_digit) {
        *j += 1;
    }
    if *j == start {
        return None;
    }
    std::str::from_utf8(&fmt[start..*j]).ok()?.parse().ok()
}

fn render_int(v: i32, conv: u8, flags: Flags, width: Option<usize>, precision: Option<usize>) -> Vec<u8> {
    let neg = conv == b'd' && v < 0;
    let mag: u64 = if conv == b'd' {
        (v as i64).unsigned_abs()
    } else {
        v as u32 as u64
    };
    let mut digits = match conv {
        b'd' => mag.to_string(),
        b'o' => format!("{mag:o}"),
        b'x' => format!("{mag:x}"),
        b'X' => format!("{mag:X}"),
        _ => unreachable!(),
    };
    if let Some(p) = precision {
        if p == 0 && mag == 0 {
            digits.clear();
        } else if digits.len() < p {
            digits = "0".repeat(p - digits.len()) + &digits;
        }
    }

    let mut prefix = String::new();
    if neg {
        prefix.push('-');
    } else if conv == b'd' && flags.plus {
        prefix.push('+');
    } else if conv == b'd' && flags.space {
        prefix.push(' ');
    }
    if flags.alt && mag != 0 {
        match conv {
            b'o' if !digits.starts_with('0') => digits.insert(0, '0'),
            b'x' => prefix.push_str("0x"),
            b'X' => prefix.push_str("0X"),
            _ => {}
        }
    }

    let body = (prefix + &digits).into_bytes();
    pad_numeric(body, width, flags, precision.is_some())
}

fn render_str(mut s: Vec<u8>, flags: Flags, width: Option<usize>, precision: Option<usize>) -> Vec<u8> {
    if let Some(p) = precision {
        s.truncate(p);
    }
    pad_generic(s, width, flags.minus)
}

fn pad_numeric(body: Vec<u8>, width: Option<usize>, flags: Flags, has_precision: bool) -> Vec<u8> {
    let Some(width) = width else { return body };
    if body.len() >= width || flags.minus {
        return pad_generic(body, Some(width), flags.minus);
    }
    if flags.zero && !has_precision {
        let pad_len = width - body.len();
        let split = match body.first() {
            Some(b'-') | Some(b'+') | Some(b' ') => 1,
            _ => 0,
        };
        let split = if body[split..].starts_with(b"0x") || body[split..].starts_with(b"0X") {
            split + 2
        } else {
            split
        };
        let mut out = Vec::with_capacity(width);
        out.extend_from_slice(&body[..split]);
        out.resize(out.len() + pad_len, b'0');
        out.extend_from_slice(&body[split..]);
        out
    } else {
        pad_generic(body, Some(width), false)
    }
}

fn pad_generic(body: Vec<u8>, width: Option<usize>, left_justify: bool) -> Vec<u8> {
    let Some(width) = width else { return body };
    if body.len() >= width {
        return body;
    }
    let pad_len = width - body.len();
    let mut out = Vec::with_capacity(width);
    if left_justify {
        out.extend_from_slice(&body);
        out.resize(width, b' ');
    } else {
        out.resize(pad_len, b' ');
        out.extend_from_slice(&body);
    }
    out
}
