//! Event records and their opcode-driven codec.
//!
//! Every record starts with the same header:
//! `u8` opcode, wall-clock time (header-declared width), `f32` game time,
//! `i32` plugin id. The payload that follows is fixed by the opcode; records
//! carry no length prefix, so the decoder must know every shape.

use crate::errors::{BinLogError, BinLogResult};
use crate::wire::{self, Cursor, FormatWidths};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Plugin id used when an event has no plugin context.
pub const NO_PLUGIN: i32 = -1;

/// Operation codes as written in the first byte of each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum BinLogOp {
    Start = 1,
    End = 2,
    NativeCall = 3,
    NativeError = 4,
    NativeRet = 5,
    CallPubFunc = 6,
    SetLine = 7,
    Registered = 8,
    FormatString = 9,
    NativeParams = 10,
    GetString = 11,
    SetString = 12,
}

impl BinLogOp {
    pub const ALL: [BinLogOp; 12] = [
        BinLogOp::Start,
        BinLogOp::End,
        BinLogOp::NativeCall,
        BinLogOp::NativeError,
        BinLogOp::NativeRet,
        BinLogOp::CallPubFunc,
        BinLogOp::SetLine,
        BinLogOp::Registered,
        BinLogOp::FormatString,
        BinLogOp::NativeParams,
        BinLogOp::GetString,
        BinLogOp::SetString,
    ];

    pub fn from_byte(b: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| *op as u8 == b)
    }

    pub fn name(self) -> &'static str {
        match self {
            BinLogOp::Start => "start",
            BinLogOp::End => "end",
            BinLogOp::NativeCall => "native_call",
            BinLogOp::NativeError => "native_error",
            BinLogOp::NativeRet => "native_ret",
            BinLogOp::CallPubFunc => "call_pub_func",
            BinLogOp::SetLine => "set_line",
            BinLogOp::Registered => "registered",
            BinLogOp::FormatString => "format_string",
            BinLogOp::NativeParams => "native_params",
            BinLogOp::GetString => "get_string",
            BinLogOp::SetString => "set_string",
        }
    }
}

impl fmt::Display for BinLogOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A traced runtime event, one variant per opcode.
///
/// Cell-valued fields are `i64` here and narrowed to the file's cell width
/// when written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Event {
    Start,
    End,
    NativeCall { native_id: i32, num_params: i32 },
    NativeError { error: i32, message: String },
    NativeRet { value: i64 },
    CallPubFunc { public_id: i32 },
    SetLine { line: i32 },
    Registered { title: String, version: String },
    FormatString { param: i32, max_len: i32, result: String },
    NativeParams { params: Vec<i64> },
    GetString { addr: i64, value: String },
    SetString { addr: i64, max_len: i32, value: String },
}

impl Event {
    pub fn op(&self) -> BinLogOp {
        match self {
            Event::Start => BinLogOp::Start,
            Event::End => BinLogOp::End,
            Event::NativeCall { .. } => BinLogOp::NativeCall,
            Event::NativeError { .. } => BinLogOp::NativeError,
            Event::NativeRet { .. } => BinLogOp::NativeRet,
            Event::CallPubFunc { .. } => BinLogOp::CallPubFunc,
            Event::SetLine { .. } => BinLogOp::SetLine,
            Event::Registered { .. } => BinLogOp::Registered,
            Event::FormatString { .. } => BinLogOp::FormatString,
            Event::NativeParams { .. } => BinLogOp::NativeParams,
            Event::GetString { .. } => BinLogOp::GetString,
            Event::SetString { .. } => BinLogOp::SetString,
        }
    }

    pub fn native_call(native_id: i32, num_params: i32) -> Self {
        Event::NativeCall {
            native_id,
            num_params,
        }
    }

    pub fn native_error(error: i32, message: impl Into<String>) -> Self {
        Event::NativeError {
            error,
            message: message.into(),
        }
    }

    pub fn native_ret(value: i64) -> Self {
        Event::NativeRet { value }
    }

    pub fn call_pub_func(public_id: i32) -> Self {
        Event::CallPubFunc { public_id }
    }

    pub fn set_line(line: i32) -> Self {
        Event::SetLine { line }
    }

    pub fn registered(title: impl Into<String>, version: impl Into<String>) -> Self {
        Event::Registered {
            title: title.into(),
            version: version.into(),
        }
    }

    pub fn format_string(param: i32, max_len: i32, result: impl Into<String>) -> Self {
        Event::FormatString {
            param,
            max_len,
            result: result.into(),
        }
    }

    pub fn native_params(params: Vec<i64>) -> Self {
        Event::NativeParams { params }
    }

    pub fn get_string(addr: i64, value: impl Into<String>) -> Self {
        Event::GetString {
            addr,
            value: value.into(),
        }
    }

    pub fn set_string(addr: i64, max_len: i32, value: impl Into<String>) -> Self {
        Event::SetString {
            addr,
            max_len,
            value: value.into(),
        }
    }
}

/// One record as it appears in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Seconds since the Unix epoch.
    pub wall_time: i64,
    pub game_time: f32,
    pub plugin_id: i32,
    pub event: Event,
}

impl EventRecord {
    pub fn op(&self) -> BinLogOp {
        self.event.op()
    }
}

/// Append the wire form of `record` to `out`.
pub fn encode_record(out: &mut Vec<u8>, record: &EventRecord, widths: FormatWidths) {
    wire::put_u8(out, record.op() as u8);
    wire::put_wide(out, widths.time, record.wall_time);
    wire::put_f32(out, record.game_time);
    wire::put_i32(out, record.plugin_id);

    match &record.event {
        Event::Start | Event::End => {}
        Event::NativeCall {
            native_id,
            num_params,
        } => {
            wire::put_i32(out, *native_id);
            wire::put_i32(out, *num_params);
        }
        Event::NativeError { error, message } => {
            wire::put_i32(out, *error);
            wire::put_str16(out, message);
        }
        Event::NativeRet { value } => wire::put_wide(out, widths.cell, *value),
        Event::CallPubFunc { public_id } => wire::put_i32(out, *public_id),
        Event::SetLine { line } => wire::put_i32(out, *line),
        Event::Registered { title, version } => {
            wire::put_str8(out, title);
            wire::put_str8(out, version);
        }
        Event::FormatString {
            param,
            max_len,
            result,
        } => {
            wire::put_i32(out, *param);
            wire::put_i32(out, *max_len);
            wire::put_str16(out, result);
        }
        Event::NativeParams { params } => {
            wire::put_i32(out, params.len() as i32);
            for cell in params {
                wire::put_wide(out, widths.cell, *cell);
            }
        }
        Event::GetString { addr, value } => {
            wire::put_wide(out, widths.cell, *addr);
            wire::put_str16(out, value);
        }
        Event::SetString {
            addr,
            max_len,
            value,
        } => {
            wire::put_wide(out, widths.cell, *addr);
            wire::put_i32(out, *max_len);
            wire::put_str16(out, value);
        }
    }
}

/// Decode one record at the cursor.
///
/// On error the cursor position is unspecified; callers that want to keep
/// going must stop instead, since the format is not self-framing.
pub fn decode_record(cur: &mut Cursor<'_>, widths: FormatWidths) -> BinLogResult<EventRecord> {
    let start = cur.position();
    let raw_op = cur.u8("opcode")?;
    let op = BinLogOp::from_byte(raw_op)
        .ok_or_else(|| BinLogError::format(start, format!("unknown opcode {raw_op:#04X}")))?;

    let wall_time = cur.wide(widths.time, "wall-clock time")?;
    let game_time = cur.f32("game time")?;
    let plugin_id = cur.i32("plugin id")?;

    let event = match op {
        BinLogOp::Start => Event::Start,
        BinLogOp::End => Event::End,
        BinLogOp::NativeCall => Event::NativeCall {
            native_id: cur.i32("native id")?,
            num_params: cur.i32("parameter count")?,
        },
        BinLogOp::NativeError => Event::NativeError {
            error: cur.i32("error code")?,
            message: cur.str16("error message")?,
        },
        BinLogOp::NativeRet => Event::NativeRet {
            value: cur.wide(widths.cell, "return value")?,
        },
        BinLogOp::CallPubFunc => Event::CallPubFunc {
            public_id: cur.i32("public id")?,
        },
        BinLogOp::SetLine => Event::SetLine {
            line: cur.i32("line number")?,
        },
        BinLogOp::Registered => Event::Registered {
            title: cur.str8("plugin title")?,
            version: cur.str8("plugin version")?,
        },
        BinLogOp::FormatString => Event::FormatString {
            param: cur.i32("parameter index")?,
            max_len: cur.i32("max length")?,
            result: cur.str16("formatted string")?,
        },
        BinLogOp::NativeParams => {
            let count_at = cur.position();
            let count = cur.i32("parameter count")?;
            let count = usize::try_from(count).map_err(|_| {
                BinLogError::format(count_at, format!("negative parameter count {count}"))
            })?;
            let needed = count.saturating_mul(widths.cell.bytes() as usize);
            if needed > cur.remaining() {
                return Err(BinLogError::format(
                    count_at,
                    format!("truncated parameter list: {count} cells declared"),
                ));
            }
            let mut params = Vec::with_capacity(count);
            for _ in 0..count {
                params.push(cur.wide(widths.cell, "parameter cell")?);
            }
            Event::NativeParams { params }
        }
        BinLogOp::GetString => Event::GetString {
            addr: cur.wide(widths.cell, "source address")?,
            value: cur.str16("string value")?,
        },
        BinLogOp::SetString => Event::SetString {
            addr: cur.wide(widths.cell, "destination address")?,
            max_len: cur.i32("max length")?,
            value: cur.str16("string value")?,
        },
    };

    Ok(EventRecord {
        wall_time,
        game_time,
        plugin_id,
        event,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Width;

    const W88: FormatWidths = FormatWidths {
        time: Width::Eight,
        cell: Width::Eight,
    };
    const W44: FormatWidths = FormatWidths {
        time: Width::Four,
        cell: Width::Four,
    };

    fn record(event: Event) -> EventRecord {
        EventRecord {
            wall_time: 1_700_000_000,
            game_time: 12.5,
            plugin_id: 0,
            event,
        }
    }

    fn encode(event: Event, widths: FormatWidths) -> Vec<u8> {
        let mut out = Vec::new();
        encode_record(&mut out, &record(event), widths);
        out
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode(Event::Start, W88);
        assert_eq!(bytes.len(), 1 + 8 + 4 + 4);
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..9], &1_700_000_000i64.to_le_bytes());
        assert_eq!(&bytes[9..13], &12.5f32.to_le_bytes());
        assert_eq!(&bytes[13..17], &0i32.to_le_bytes());

        let narrow = encode(Event::End, W44);
        assert_eq!(narrow.len(), 1 + 4 + 4 + 4);
        assert_eq!(narrow[0], 2);
    }

    #[test]
    fn test_payload_sizes_follow_opcode() {
        let header = 17;
        let cases = vec![
            (Event::native_call(1, 2), 8),
            (Event::native_error(3, "bad"), 4 + 2 + 3),
            (Event::native_ret(42), 8),
            (Event::call_pub_func(7), 4),
            (Event::set_line(120), 4),
            (Event::registered("Admin", "1.0"), 1 + 5 + 1 + 3),
            (Event::format_string(2, 64, "hi"), 4 + 4 + 2 + 2),
            (Event::native_params(vec![1, 2, 3]), 4 + 3 * 8),
            (Event::get_string(0x100, "abc"), 8 + 2 + 3),
            (Event::set_string(0x200, 32, "x"), 8 + 4 + 2 + 1),
        ];
        for (event, payload) in cases {
            let op = event.op();
            assert_eq!(encode(event, W88).len(), header + payload, "{op}");
        }
    }

    #[test]
    fn test_decode_every_opcode() {
        let events = vec![
            Event::Start,
            Event::native_call(1, 2),
            Event::native_error(-5, "index out of bounds"),
            Event::native_ret(-1),
            Event::call_pub_func(0),
            Event::set_line(77),
            Event::registered("Admin Base", "1.9.0"),
            Event::format_string(1, 190, "Hello %s"),
            Event::native_params(Vec::new()),
            Event::native_params(vec![i64::from(i32::MIN), 0, 9]),
            Event::get_string(4096, ""),
            Event::set_string(8192, 31, "name"),
            Event::End,
        ];
        for widths in [W88, W44] {
            let mut bytes = Vec::new();
            for event in &events {
                encode_record(&mut bytes, &record(event.clone()), widths);
            }
            let mut cur = Cursor::new(&bytes);
            for event in &events {
                let decoded = decode_record(&mut cur, widths).unwrap();
                assert_eq!(&decoded.event, event);
                assert_eq!(decoded.wall_time, 1_700_000_000);
                assert_eq!(decoded.game_time, 12.5);
            }
            assert!(cur.is_empty());
        }
    }

    #[test]
    fn test_unknown_opcode() {
        let mut bytes = encode(Event::Start, W88);
        bytes[0] = 0x7F;
        let err = decode_record(&mut Cursor::new(&bytes), W88).unwrap_err();
        assert!(err.to_string().contains("unknown opcode"));
    }

    #[test]
    fn test_oversized_param_count_is_malformed() {
        let mut bytes = encode(Event::native_params(vec![5]), W88);
        // bump the declared count without adding cells
        bytes[17..21].copy_from_slice(&1000i32.to_le_bytes());
        assert!(decode_record(&mut Cursor::new(&bytes), W88).is_err());
    }

    #[test]
    fn test_opcode_bytes() {
        for (i, op) in BinLogOp::ALL.iter().enumerate() {
            assert_eq!(*op as u8, i as u8 + 1);
            assert_eq!(BinLogOp::from_byte(i as u8 + 1), Some(*op));
        }
        assert_eq!(BinLogOp::from_byte(0), None);
        assert_eq!(BinLogOp::from_byte(13), None);
    }
}
