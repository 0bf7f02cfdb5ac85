//! File preamble: magic, version, time width and the plugin symbol table.
//!
//! Layout (little-endian):
//! - `u32` magic (`"AMBL"`)
//! - `u16` version
//! - `u8`  byte width of the wall-clock time field
//! - `u32` plugin count, then per plugin:
//!   - `u8` status, `str8` filename
//!   - `u32` native count, `str8` per native name
//!   - `u32` public count, `str8` per public name
//!
//! The preamble is written once per file and never touched again.

use crate::errors::{BinLogError, BinLogResult};
use crate::symbols::{PluginRecord, PluginStatus, SymbolTable};
use crate::wire::{self, Cursor, Width};
use serde::{Deserialize, Serialize};

pub const BINLOG_MAGIC: u32 = 0x414D_424C;
pub const BINLOG_VERSION: u16 = 0x0200;

/// Decoded file preamble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preamble {
    pub version: u16,
    pub time_width: Width,
    pub symbols: SymbolTable,
}

/// Serialize the preamble for `symbols` into a fresh buffer.
pub fn encode_preamble(symbols: &SymbolTable, time_width: Width) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    wire::put_u32(&mut out, BINLOG_MAGIC);
    wire::put_u16(&mut out, BINLOG_VERSION);
    wire::put_u8(&mut out, time_width.bytes());
    wire::put_u32(&mut out, symbols.plugins.len() as u32);
    for plugin in &symbols.plugins {
        encode_plugin(&mut out, plugin);
    }
    out
}

fn encode_plugin(out: &mut Vec<u8>, plugin: &PluginRecord) {
    wire::put_u8(out, plugin.status.as_byte());
    wire::put_str8(out, &plugin.filename);
    wire::put_u32(out, plugin.natives.len() as u32);
    for name in &plugin.natives {
        wire::put_str8(out, name);
    }
    wire::put_u32(out, plugin.publics.len() as u32);
    for name in &plugin.publics {
        wire::put_str8(out, name);
    }
}

/// Parse the preamble, leaving the cursor at the first event record.
pub fn decode_preamble(cur: &mut Cursor<'_>) -> BinLogResult<Preamble> {
    let magic = cur.u32("magic")?;
    if magic != BINLOG_MAGIC {
        return Err(BinLogError::format(
            0,
            format!("bad magic {magic:#010X}, expected {BINLOG_MAGIC:#010X}"),
        ));
    }

    let version = cur.u16("version")?;
    if version != BINLOG_VERSION {
        return Err(BinLogError::format(
            4,
            format!("unsupported version {version:#06X}"),
        ));
    }

    let time_width = Width::from_byte("time", cur.u8("time width")?)?;

    let count = cur.u32("plugin count")?;
    let mut plugins = Vec::new();
    for _ in 0..count {
        plugins.push(decode_plugin(cur)?);
    }

    Ok(Preamble {
        version,
        time_width,
        symbols: SymbolTable { plugins },
    })
}

fn decode_plugin(cur: &mut Cursor<'_>) -> BinLogResult<PluginRecord> {
    let status = PluginStatus::from_byte(cur.u8("plugin status")?);
    let filename = cur.str8("plugin filename")?;

    let native_count = cur.u32("native count")?;
    let mut natives = Vec::new();
    for _ in 0..native_count {
        natives.push(cur.str8("native name")?);
    }

    let public_count = cur.u32("public count")?;
    let mut publics = Vec::new();
    for _ in 0..public_count {
        publics.push(cur.str8("public name")?);
    }

    Ok(PluginRecord {
        status,
        filename,
        natives,
        publics,
    })
}
