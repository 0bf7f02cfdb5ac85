//! Error handling for the binary trace logger
//!
//! Errors only cross the boundary of the writer when a caller asks for them
//! (`open`, the reader, configuration). The event path itself never fails
//! outward; see `session`.

use thiserror::Error;

/// Main error type for the trace logger
#[derive(Error, Debug)]
pub enum BinLogError {
    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("A trace session is already open: {path}")]
    AlreadyOpen { path: String },

    #[error("Trace preamble needs {needed} bytes but max_size is {max_size}")]
    SizeLimit { needed: u64, max_size: u64 },

    #[error("Malformed trace file at offset {offset}: {message}")]
    Format { offset: usize, message: String },

    #[error("Unsupported width {width} for {field} (expected 4 or 8)")]
    UnsupportedWidth { field: String, width: u8 },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Mutex lock failed: {resource}")]
    MutexPoisoned { resource: String },
}

/// Result alias used across the crate
pub type BinLogResult<T> = Result<T, BinLogError>;

impl BinLogError {
    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a format error at a byte offset
    pub fn format(offset: usize, message: impl Into<String>) -> Self {
        Self::Format {
            offset,
            message: message.into(),
        }
    }

    pub fn unsupported_width(field: impl Into<String>, width: u8) -> Self {
        Self::UnsupportedWidth {
            field: field.into(),
            width,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for BinLogError {
    fn from(err: figment::Error) -> Self {
        BinLogError::config(err.to_string())
    }
}

/// Lock a mutex, returning a `BinLogError` on poison instead of panicking
pub trait SafeLock<T: ?Sized> {
    fn safe_lock(&self) -> BinLogResult<std::sync::MutexGuard<'_, T>>;
}

impl<T: ?Sized> SafeLock<T> for std::sync::Mutex<T> {
    fn safe_lock(&self) -> BinLogResult<std::sync::MutexGuard<'_, T>> {
        self.lock().map_err(|_| BinLogError::MutexPoisoned {
            resource: "binlog_session".to_string(),
        })
    }
}
