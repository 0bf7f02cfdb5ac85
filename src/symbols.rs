// symbols.rs - Plugin symbol table captured when a trace session opens
//
// Events refer to plugins, natives and publics by position only, so the
// table must keep the loader's order exactly.

use serde::{Deserialize, Serialize};

/// Status byte reported by the plugin loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginStatus {
    BadLoad,
    Error,
    Locked,
    Paused,
    Stopped,
    Running,
    Unknown(u8),
}

impl PluginStatus {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => PluginStatus::BadLoad,
            1 => PluginStatus::Error,
            2 => PluginStatus::Locked,
            3 => PluginStatus::Paused,
            4 => PluginStatus::Stopped,
            5 => PluginStatus::Running,
            other => PluginStatus::Unknown(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            PluginStatus::BadLoad => 0,
            PluginStatus::Error => 1,
            PluginStatus::Locked => 2,
            PluginStatus::Paused => 3,
            PluginStatus::Stopped => 4,
            PluginStatus::Running => 5,
            PluginStatus::Unknown(b) => b,
        }
    }
}

/// One loaded plugin as seen at session open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    pub status: PluginStatus,
    pub filename: String,
    pub natives: Vec<String>,
    pub publics: Vec<String>,
}

impl PluginRecord {
    pub fn new(filename: impl Into<String>, status: PluginStatus) -> Self {
        Self {
            status,
            filename: filename.into(),
            natives: Vec::new(),
            publics: Vec::new(),
        }
    }

    pub fn with_natives<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.natives = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_publics<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.publics = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Source of plugin information, implemented by the host's plugin loader.
///
/// Implementations must yield plugins in load order, and each plugin's
/// natives and publics in the order the VM indexes them.
pub trait PluginRegistry {
    fn loaded_plugins(&self) -> Vec<PluginRecord>;
}

impl PluginRegistry for Vec<PluginRecord> {
    fn loaded_plugins(&self) -> Vec<PluginRecord> {
        self.clone()
    }
}

impl PluginRegistry for [PluginRecord] {
    fn loaded_plugins(&self) -> Vec<PluginRecord> {
        self.to_vec()
    }
}

/// Ordered plugin records; a plugin's index is its plugin id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable {
    pub plugins: Vec<PluginRecord>,
}

impl SymbolTable {
    /// Snapshot the registry. No names are dropped or reordered.
    pub fn capture<R: PluginRegistry + ?Sized>(registry: &R) -> Self {
        Self {
            plugins: registry.loaded_plugins(),
        }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn plugin(&self, plugin_id: i32) -> Option<&PluginRecord> {
        usize::try_from(plugin_id)
            .ok()
            .and_then(|idx| self.plugins.get(idx))
    }

    pub fn plugin_name(&self, plugin_id: i32) -> Option<&str> {
        self.plugin(plugin_id).map(|p| p.filename.as_str())
    }

    pub fn native_name(&self, plugin_id: i32, native_id: i32) -> Option<&str> {
        let idx = usize::try_from(native_id).ok()?;
        self.plugin(plugin_id)?.natives.get(idx).map(String::as_str)
    }

    pub fn public_name(&self, plugin_id: i32, public_id: i32) -> Option<&str> {
        let idx = usize::try_from(public_id).ok()?;
        self.plugin(plugin_id)?.publics.get(idx).map(String::as_str)
    }
}
