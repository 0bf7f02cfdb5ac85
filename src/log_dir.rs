// log_dir.rs - Numbered trace files inside a log directory
//
// A small `lastlog` file holds the last number handed out (u32 LE).
// Each call to `next_path` bumps it and returns `binlogNNNN.blg`.

use crate::errors::{BinLogError, BinLogResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const COUNTER_FILE: &str = "lastlog";

#[derive(Debug, Clone)]
pub struct LogDirectory {
    root: PathBuf,
}

impl LogDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Last number handed out, 0 if none yet.
    pub fn last_counter(&self) -> BinLogResult<u32> {
        let path = self.root.join(COUNTER_FILE);
        match fs::read(&path) {
            Ok(bytes) if bytes.len() >= 4 => {
                Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            // short or empty counter file: start over
            Ok(_) => Ok(0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(BinLogError::io("reading log counter", e)),
        }
    }

    /// Allocate the next file name and persist the counter.
    pub fn next_path(&self) -> BinLogResult<PathBuf> {
        fs::create_dir_all(&self.root)
            .map_err(|e| BinLogError::io("creating log directory", e))?;

        let next = self.last_counter()?.wrapping_add(1);
        fs::write(self.root.join(COUNTER_FILE), next.to_le_bytes())
            .map_err(|e| BinLogError::io("writing log counter", e))?;

        let path = self.root.join(file_name(next));
        debug!(counter = next, path = %path.display(), "allocated trace file");
        Ok(path)
    }
}

fn file_name(counter: u32) -> String {
    format!("binlog{counter:04}.blg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_numbering_starts_at_one() {
        let tmp = tempdir().unwrap();
        let dir = LogDirectory::new(tmp.path().join("binlogs"));

        assert_eq!(dir.last_counter().unwrap(), 0);
        let first = dir.next_path().unwrap();
        let second = dir.next_path().unwrap();

        assert!(first.ends_with("binlog0001.blg"));
        assert!(second.ends_with("binlog0002.blg"));
        assert_eq!(dir.last_counter().unwrap(), 2);
    }

    #[test]
    fn test_counter_survives_reopen() {
        let tmp = tempdir().unwrap();
        LogDirectory::new(tmp.path()).next_path().unwrap();

        let again = LogDirectory::new(tmp.path()).next_path().unwrap();
        assert!(again.ends_with("binlog0002.blg"));
    }

    #[test]
    fn test_wide_counter_is_not_clipped() {
        assert_eq!(file_name(12345), "binlog12345.blg");
    }
}
