//! Library root for the `ambl` crate
//! Binary execution-trace logging for an embedded scripting VM, plus a
//! reader for post-mortem inspection of the resulting files.

// Core error handling
pub mod errors;

// Wire format
pub mod wire;
pub mod preamble;
pub mod event;

// Plugin symbols
pub mod symbols;

// Writer session & policy
pub mod clock;
pub mod policy;
pub mod session;
pub mod log_dir;

// Reading traces back
pub mod reader;

// Configuration & CLI
pub mod cli;
pub mod config;


pub use clock::{FixedClock, SystemClock, TraceClock};
pub use errors::{BinLogError, BinLogResult};
pub use event::{BinLogOp, Event, EventRecord, NO_PLUGIN};
pub use policy::{PolicySettings, TraceLevel};
pub use reader::{read_log, read_log_file, ParsedLog};
pub use session::{BinLog, SharedBinLog};
pub use symbols::{PluginRecord, PluginRegistry, PluginStatus, SymbolTable};
pub use wire::{FormatWidths, Width};
