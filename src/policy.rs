// policy.rs - Verbosity and size gate consulted before every record
//
// The gate never fails. An excluded opcode is dropped; a record that would
// push the file past its size limit tells the session to close.

use crate::event::BinLogOp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bitmask of event classes eligible for writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceLevel(u32);

impl TraceLevel {
    pub const NONE: TraceLevel = TraceLevel(0);
    /// Lifecycle markers, native calls, returns and errors, registration.
    pub const DEFAULT: TraceLevel = TraceLevel(1);
    pub const STRINGS: TraceLevel = TraceLevel(2);
    pub const FORMATS: TraceLevel = TraceLevel(4);
    pub const NATIVE_PARAMS: TraceLevel = TraceLevel(8);
    pub const CALLS: TraceLevel = TraceLevel(16);
    pub const LINES: TraceLevel = TraceLevel(32);
    pub const ALL: TraceLevel = TraceLevel(63);

    pub const fn from_bits(bits: u32) -> Self {
        TraceLevel(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: TraceLevel) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub const fn union(self, other: TraceLevel) -> Self {
        TraceLevel(self.0 | other.0)
    }

    pub const fn without(self, other: TraceLevel) -> Self {
        TraceLevel(self.0 & !other.0)
    }

    /// Class an opcode belongs to.
    pub fn class_of(op: BinLogOp) -> TraceLevel {
        match op {
            BinLogOp::Start
            | BinLogOp::End
            | BinLogOp::NativeCall
            | BinLogOp::NativeError
            | BinLogOp::NativeRet
            | BinLogOp::Registered => TraceLevel::DEFAULT,
            BinLogOp::GetString | BinLogOp::SetString => TraceLevel::STRINGS,
            BinLogOp::FormatString => TraceLevel::FORMATS,
            BinLogOp::NativeParams => TraceLevel::NATIVE_PARAMS,
            BinLogOp::CallPubFunc => TraceLevel::CALLS,
            BinLogOp::SetLine => TraceLevel::LINES,
        }
    }

    pub fn admits(self, op: BinLogOp) -> bool {
        self.contains(Self::class_of(op))
    }
}

impl Default for TraceLevel {
    fn default() -> Self {
        TraceLevel::DEFAULT
            .union(TraceLevel::STRINGS)
            .union(TraceLevel::FORMATS)
    }
}

impl std::ops::BitOr for TraceLevel {
    type Output = TraceLevel;

    fn bitor(self, rhs: TraceLevel) -> TraceLevel {
        self.union(rhs)
    }
}

impl fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Live gate settings; can be swapped on an open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySettings {
    pub level: TraceLevel,
    /// Maximum file size in bytes; 0 means unlimited.
    pub max_size: u64,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            level: TraceLevel::default(),
            max_size: 0,
        }
    }
}

/// Outcome of consulting the gate for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Write,
    /// Appending would exceed `max_size`.
    Close,
}

impl PolicySettings {
    pub fn admits(&self, op: BinLogOp) -> bool {
        self.level.admits(op)
    }

    /// Size check for a record of `record_len` bytes on top of `written`.
    pub fn check_size(&self, written: u64, record_len: usize) -> Admission {
        if self.max_size != 0 && written.saturating_add(record_len as u64) > self.max_size {
            Admission::Close
        } else {
            Admission::Write
        }
    }
}
