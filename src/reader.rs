// reader.rs - Minimal post-mortem reader
//
// The preamble must parse cleanly. Events are read until the first record
// that fails to decode; anything after it is reported as a torn tail rather
// than failing the whole file.

use crate::errors::{BinLogError, BinLogResult};
use crate::event::{decode_record, BinLogOp, EventRecord};
use crate::preamble::{decode_preamble, Preamble};
use crate::wire::{Cursor, FormatWidths, Width};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedLog {
    pub preamble: Preamble,
    pub events: Vec<EventRecord>,
    /// Byte offset just past the last complete record.
    pub valid_len: usize,
    /// True when bytes after `valid_len` were ignored.
    pub truncated: bool,
}

impl ParsedLog {
    pub fn count_by_op(&self) -> BTreeMap<BinLogOp, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.events {
            *counts.entry(record.op()).or_insert(0) += 1;
        }
        counts
    }
}

/// Parse a whole trace held in memory.
pub fn read_log(bytes: &[u8], cell_width: Width) -> BinLogResult<ParsedLog> {
    let mut cur = Cursor::new(bytes);
    let preamble = decode_preamble(&mut cur)?;
    let widths = FormatWidths {
        time: preamble.time_width,
        cell: cell_width,
    };

    let mut events = Vec::new();
    let mut valid_len = cur.position();
    while !cur.is_empty() {
        match decode_record(&mut cur, widths) {
            Ok(record) => {
                events.push(record);
                valid_len = cur.position();
            }
            Err(e) => {
                debug!(offset = valid_len, error = %e, "stopping at malformed record");
                break;
            }
        }
    }

    Ok(ParsedLog {
        preamble,
        events,
        valid_len,
        truncated: valid_len < bytes.len(),
    })
}

pub fn read_log_file(path: impl AsRef<Path>, cell_width: Width) -> BinLogResult<ParsedLog> {
    let bytes = std::fs::read(path.as_ref()).map_err(|e| BinLogError::io("reading trace file", e))?;
    read_log(&bytes, cell_width)
}
