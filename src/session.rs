//! Trace session: owns the open file and enforces the open/closed lifecycle.
//!
//! `Closed` -> `open()` -> `Open` -> `close()` | size limit | I/O failure -> `Closed`.
//!
//! Only `open` reports failure. Writing is best-effort: events on a closed
//! session, events excluded by the level, and events that fail to write are
//! all dropped without an error reaching the caller.

use crate::clock::{SystemClock, TraceClock};
use crate::config::BinLogConfig;
use crate::errors::{BinLogError, BinLogResult, SafeLock};
use crate::event::{encode_record, BinLogOp, Event, EventRecord};
use crate::log_dir::LogDirectory;
use crate::policy::{Admission, PolicySettings};
use crate::preamble::encode_preamble;
use crate::symbols::{PluginRegistry, SymbolTable};
use crate::wire::FormatWidths;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

struct OpenLog {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl OpenLog {
    fn append(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }
}

enum SessionState {
    Closed,
    Open(OpenLog),
}

/// A binary trace log writer. At most one file is open per instance.
pub struct BinLog<C: TraceClock = SystemClock> {
    state: SessionState,
    policy: PolicySettings,
    widths: FormatWidths,
    clock: C,
    scratch: Vec<u8>,
}

impl BinLog<SystemClock> {
    pub fn new(policy: PolicySettings, widths: FormatWidths) -> Self {
        Self::with_clock(policy, widths, SystemClock::new())
    }

    /// Writer using the configured level, size limit and widths.
    pub fn from_config(config: &BinLogConfig) -> BinLogResult<Self> {
        Ok(Self::new(config.policy(), config.widths()?))
    }

    /// Build a writer from `config` and open the next numbered file in
    /// the configured `log_dir`.
    pub fn open_configured<R>(
        config: &BinLogConfig,
        registry: &R,
    ) -> BinLogResult<(Self, PathBuf)>
    where
        R: PluginRegistry + ?Sized,
    {
        let mut log = Self::from_config(config)?;
        let path = log.open_next(&config.log_directory(), registry)?;
        Ok((log, path))
    }
}

impl<C: TraceClock> BinLog<C> {
    pub fn with_clock(policy: PolicySettings, widths: FormatWidths, clock: C) -> Self {
        Self {
            state: SessionState::Closed,
            policy,
            widths,
            clock,
            scratch: Vec::with_capacity(64),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open(_))
    }

    /// Path of the open file, if any.
    pub fn path(&self) -> Option<&Path> {
        match &self.state {
            SessionState::Open(log) => Some(&log.path),
            SessionState::Closed => None,
        }
    }

    /// Bytes appended to the open file so far, preamble included.
    pub fn bytes_written(&self) -> u64 {
        match &self.state {
            SessionState::Open(log) => log.written,
            SessionState::Closed => 0,
        }
    }

    pub fn policy(&self) -> PolicySettings {
        self.policy
    }

    /// Replace level and size limit; applies from the next event on.
    pub fn set_policy(&mut self, policy: PolicySettings) {
        self.policy = policy;
    }

    pub fn widths(&self) -> FormatWidths {
        self.widths
    }

    /// Create `path`, write the preamble for the registry's current plugins,
    /// and start accepting events.
    ///
    /// Fails with `AlreadyOpen` if a file is open (that session is left
    /// alone), with `SizeLimit` if the preamble alone exceeds `max_size`
    /// (no file is created), or with `Io` if the file cannot be created or
    /// written.
    pub fn open<R>(&mut self, path: impl AsRef<Path>, registry: &R) -> BinLogResult<()>
    where
        R: PluginRegistry + ?Sized,
    {
        if let SessionState::Open(log) = &self.state {
            warn!(
                open = %log.path.display(),
                requested = %path.as_ref().display(),
                "trace session already open"
            );
            return Err(BinLogError::AlreadyOpen {
                path: log.path.display().to_string(),
            });
        }

        let path = path.as_ref().to_path_buf();
        let symbols = SymbolTable::capture(registry);
        let preamble = encode_preamble(&symbols, self.widths.time);

        if self.policy.check_size(0, preamble.len()) == Admission::Close {
            warn!(
                path = %path.display(),
                preamble = preamble.len(),
                max_size = self.policy.max_size,
                "trace preamble exceeds size limit, not opening"
            );
            return Err(BinLogError::SizeLimit {
                needed: preamble.len() as u64,
                max_size: self.policy.max_size,
            });
        }

        let file = File::create(&path).map_err(|e| BinLogError::io("creating trace file", e))?;

        let mut log = OpenLog {
            path,
            writer: BufWriter::new(file),
            written: 0,
        };
        log.append(&preamble)
            .map_err(|e| BinLogError::io("writing trace preamble", e))?;

        info!(
            path = %log.path.display(),
            plugins = symbols.len(),
            level = %self.policy.level,
            max_size = self.policy.max_size,
            "trace session opened"
        );
        self.state = SessionState::Open(log);
        Ok(())
    }

    /// Open the next numbered file in `dir`; returns its path.
    pub fn open_next<R>(&mut self, dir: &LogDirectory, registry: &R) -> BinLogResult<PathBuf>
    where
        R: PluginRegistry + ?Sized,
    {
        if let SessionState::Open(log) = &self.state {
            return Err(BinLogError::AlreadyOpen {
                path: log.path.display().to_string(),
            });
        }
        let path = dir.next_path()?;
        self.open(&path, registry)?;
        Ok(path)
    }

    /// Flush and release the file. No-op when already closed.
    pub fn close(&mut self) {
        let SessionState::Open(mut log) = std::mem::replace(&mut self.state, SessionState::Closed)
        else {
            return;
        };

        if let Err(e) = log.writer.flush() {
            warn!(path = %log.path.display(), error = %e, "failed to flush trace file");
        }
        info!(
            path = %log.path.display(),
            bytes = log.written,
            "trace session closed"
        );
    }

    /// Flush buffered records without closing.
    pub fn flush(&mut self) {
        let failed = match &mut self.state {
            SessionState::Open(log) => log.writer.flush().err(),
            SessionState::Closed => None,
        };
        if let Some(e) = failed {
            warn!(error = %e, "trace flush failed, closing session");
            self.close();
        }
    }

    /// Record one event for `plugin_id` (`NO_PLUGIN` for none).
    pub fn write_op(&mut self, plugin_id: i32, event: Event) {
        let written = match &self.state {
            SessionState::Open(log) => log.written,
            SessionState::Closed => return,
        };

        let op = event.op();
        if !self.policy.admits(op) {
            return;
        }

        let record = EventRecord {
            wall_time: self.clock.wall_time(),
            game_time: self.clock.game_time(),
            plugin_id,
            event,
        };
        self.scratch.clear();
        encode_record(&mut self.scratch, &record, self.widths);

        if self.policy.check_size(written, self.scratch.len()) == Admission::Close {
            info!(
                max_size = self.policy.max_size,
                written,
                op = %op,
                "trace size limit reached"
            );
            self.close();
            return;
        }

        let result = match &mut self.state {
            SessionState::Open(log) => log.append(&self.scratch),
            SessionState::Closed => return,
        };
        match result {
            Ok(()) => debug!(op = %op, plugin_id, "trace record written"),
            Err(e) => {
                warn!(op = %op, error = %e, "trace write failed, closing session");
                self.close();
            }
        }
    }

    pub fn native_call(&mut self, plugin_id: i32, native_id: i32, num_params: i32) {
        self.write_op(plugin_id, Event::native_call(native_id, num_params));
    }

    pub fn native_ret(&mut self, plugin_id: i32, value: i64) {
        self.write_op(plugin_id, Event::native_ret(value));
    }

    pub fn native_params(&mut self, plugin_id: i32, params: &[i64]) {
        // skip the copy when the level would drop it anyway
        if self.is_open() && self.policy.admits(BinLogOp::NativeParams) {
            self.write_op(plugin_id, Event::native_params(params.to_vec()));
        }
    }
}

impl<C: TraceClock> Drop for BinLog<C> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Thread-safe handle for hosts that trace from more than one thread.
///
/// All calls are serialized through one lock so records stay in call order.
/// A poisoned lock drops the event instead of panicking.
pub struct SharedBinLog<C: TraceClock = SystemClock> {
    inner: Arc<Mutex<BinLog<C>>>,
}

impl<C: TraceClock> Clone for SharedBinLog<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: TraceClock> SharedBinLog<C> {
    pub fn new(log: BinLog<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(log)),
        }
    }

    pub fn open<R>(&self, path: impl AsRef<Path>, registry: &R) -> BinLogResult<()>
    where
        R: PluginRegistry + ?Sized,
    {
        self.inner.safe_lock()?.open(path, registry)
    }

    pub fn close(&self) {
        match self.inner.safe_lock() {
            Ok(mut log) => log.close(),
            Err(e) => warn!(error = %e, "trace close skipped"),
        }
    }

    pub fn write_op(&self, plugin_id: i32, event: Event) {
        match self.inner.safe_lock() {
            Ok(mut log) => log.write_op(plugin_id, event),
            Err(e) => debug!(error = %e, "trace event dropped"),
        }
    }

    pub fn set_policy(&self, policy: PolicySettings) {
        if let Ok(mut log) = self.inner.safe_lock() {
            log.set_policy(policy);
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.safe_lock().map(|log| log.is_open()).unwrap_or(false)
    }
}
