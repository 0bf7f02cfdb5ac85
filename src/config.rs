// config.rs - Layered configuration for the trace logger
//
// Defaults, then a TOML file, then `AMBL_*` environment variables.

use crate::errors::{BinLogError, BinLogResult};
use crate::log_dir::LogDirectory;
use crate::policy::{PolicySettings, TraceLevel};
use crate::wire::{FormatWidths, Width};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_FILE: &str = "ambl.toml";
pub const ENV_PREFIX: &str = "AMBL_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinLogConfig {
    /// Directory that receives numbered trace files.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Event class bitmask, see `TraceLevel`.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Maximum trace file size in bytes (0 = unlimited).
    #[serde(default)]
    pub max_size: u64,
    #[serde(default = "default_time_width")]
    pub time_width: u8,
    #[serde(default = "default_cell_width")]
    pub cell_width: u8,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs/binlogs")
}

fn default_level() -> u32 {
    TraceLevel::default().bits()
}

fn default_time_width() -> u8 {
    FormatWidths::native().time.bytes()
}

fn default_cell_width() -> u8 {
    FormatWidths::native().cell.bytes()
}

impl Default for BinLogConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            level: default_level(),
            max_size: 0,
            time_width: default_time_width(),
            cell_width: default_cell_width(),
        }
    }
}

impl BinLogConfig {
    pub fn policy(&self) -> PolicySettings {
        PolicySettings {
            level: TraceLevel::from_bits(self.level),
            max_size: self.max_size,
        }
    }

    pub fn widths(&self) -> BinLogResult<FormatWidths> {
        Ok(FormatWidths {
            time: Width::from_byte("time_width", self.time_width)?,
            cell: Width::from_byte("cell_width", self.cell_width)?,
        })
    }

    pub fn log_directory(&self) -> LogDirectory {
        LogDirectory::new(self.log_dir.clone())
    }

    fn validate(&self) -> BinLogResult<()> {
        self.widths()?;
        if self.log_dir.as_os_str().is_empty() {
            return Err(BinLogError::config("log_dir must not be empty"));
        }
        Ok(())
    }
}

/// Load configuration from `path` (or `ambl.toml` when absent) and the environment.
pub fn load_config(path: Option<&str>) -> BinLogResult<BinLogConfig> {
    let file = path.unwrap_or(DEFAULT_CONFIG_FILE);
    let figment = Figment::from(Serialized::defaults(BinLogConfig::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed(ENV_PREFIX));

    let config: BinLogConfig = figment.extract()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BinLogConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.policy(), PolicySettings::default());
        assert_eq!(config.widths().unwrap(), FormatWidths::native());
    }

    #[test]
    fn test_bad_width_rejected() {
        let config = BinLogConfig {
            cell_width: 2,
            ..BinLogConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cell_width"));
    }
}
