//! Little-endian primitives shared by the preamble and event codecs.
//!
//! Two string shapes exist on the wire: an 8-bit length prefix (symbol names,
//! plugin registration info) and a 16-bit length prefix (runtime strings).
//! Neither is null-terminated; the prefix is authoritative. The payload is
//! whatever bytes the host produced, so decoding never rejects a string.

use crate::errors::{BinLogError, BinLogResult};
use serde::{Deserialize, Serialize};

/// Byte width of a platform-dependent field (wall-clock time or cell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Width {
    Four,
    Eight,
}

impl Width {
    pub fn from_byte(field: &str, width: u8) -> BinLogResult<Self> {
        match width {
            4 => Ok(Width::Four),
            8 => Ok(Width::Eight),
            other => Err(BinLogError::unsupported_width(field, other)),
        }
    }

    pub fn bytes(self) -> u8 {
        match self {
            Width::Four => 4,
            Width::Eight => 8,
        }
    }

    fn native_pointer() -> Self {
        if std::mem::size_of::<usize>() == 4 {
            Width::Four
        } else {
            Width::Eight
        }
    }
}

/// Widths a writer and reader must agree on.
///
/// Only `time` is declared in the file header. `cell` is implied by the
/// runtime that produced the file, so a reader has to be told.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatWidths {
    pub time: Width,
    pub cell: Width,
}

impl FormatWidths {
    /// Widths of the host this crate was built for.
    pub fn native() -> Self {
        Self {
            time: Width::Eight,
            cell: Width::native_pointer(),
        }
    }
}

impl Default for FormatWidths {
    fn default() -> Self {
        Self::native()
    }
}

pub const STR8_MAX: usize = u8::MAX as usize;
pub const STR16_MAX: usize = u16::MAX as usize;

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
pub fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

pub fn put_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

pub fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn put_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn put_f32(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Writes a signed value at the given width, narrowing to i32 for `Four`.
pub fn put_wide(out: &mut Vec<u8>, width: Width, v: i64) {
    match width {
        Width::Four => out.extend_from_slice(&(v as i32).to_le_bytes()),
        Width::Eight => out.extend_from_slice(&v.to_le_bytes()),
    }
}

pub fn put_str8(out: &mut Vec<u8>, s: &str) {
    let s = truncate_utf8(s, STR8_MAX);
    out.push(s.len() as u8);
    out.extend_from_slice(s.as_bytes());
}

pub fn put_str16(out: &mut Vec<u8>, s: &str) {
    let s = truncate_utf8(s, STR16_MAX);
    put_u16(out, s.len() as u16);
    out.extend_from_slice(s.as_bytes());
}

/// Bounds-checked cursor over an in-memory trace.
pub struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize, what: &str) -> BinLogResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(BinLogError::format(
                self.pos,
                format!("truncated {what}: need {n} bytes, have {}", self.remaining()),
            ));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &str) -> BinLogResult<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N, what)?);
        Ok(buf)
    }

    pub fn u8(&mut self, what: &str) -> BinLogResult<u8> {
        Ok(self.take(1, what)?[0])
    }

    pub fn u16(&mut self, what: &str) -> BinLogResult<u16> {
        Ok(u16::from_le_bytes(self.array(what)?))
    }

    pub fn u32(&mut self, what: &str) -> BinLogResult<u32> {
        Ok(u32::from_le_bytes(self.array(what)?))
    }

    pub fn i32(&mut self, what: &str) -> BinLogResult<i32> {
        Ok(i32::from_le_bytes(self.array(what)?))
    }

    pub fn f32(&mut self, what: &str) -> BinLogResult<f32> {
        Ok(f32::from_le_bytes(self.array(what)?))
    }

    pub fn wide(&mut self, width: Width, what: &str) -> BinLogResult<i64> {
        match width {
            Width::Four => Ok(i32::from_le_bytes(self.array(what)?) as i64),
            Width::Eight => Ok(i64::from_le_bytes(self.array(what)?)),
        }
    }

    pub fn str8(&mut self, what: &str) -> BinLogResult<String> {
        let len = self.u8(what)? as usize;
        self.string(len, what)
    }

    pub fn str16(&mut self, what: &str) -> BinLogResult<String> {
        let len = self.u16(what)? as usize;
        self.string(len, what)
    }

    /// Host strings are raw bytes; invalid UTF-8 becomes U+FFFD.
    fn string(&mut self, len: usize, what: &str) -> BinLogResult<String> {
        let raw = self.take(len, what)?;
        Ok(String::from_utf8_lossy(raw).into_owned())
    }
}
