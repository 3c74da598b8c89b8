//! Search tunables and their TOML loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::search::{SearchOptions, SliceBudget};

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub search: QueryConfig,
    pub scan: ScanConfig,
}

/// Query intake behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Quiet period after the last keystroke before a scan starts.
    pub debounce_ms: u64,
    /// Initial case sensitivity for new sessions.
    pub case_sensitive: bool,
    /// Initial whole-word mode for new sessions.
    pub whole_word: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            case_sensitive: false,
            whole_word: false,
        }
    }
}

/// Per-slice limits for the cooperative scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Nodes visited per slice (minimum 1).
    pub batch_nodes: usize,
    /// Wall time per slice in milliseconds (minimum 1).
    pub slice_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_nodes: 100,
            slice_ms: 8,
        }
    }
}

impl SearchConfig {
    /// Debounce delay for query edits.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }

    /// Slice limits, clamped so every slice makes progress.
    pub fn slice_budget(&self) -> SliceBudget {
        SliceBudget {
            max_nodes: self.scan.batch_nodes.max(1),
            max_duration: Duration::from_millis(self.scan.slice_ms.max(1)),
        }
    }

    /// Options a new session starts with.
    pub fn initial_options(&self) -> SearchOptions {
        SearchOptions {
            case_sensitive: self.search.case_sensitive,
            whole_word: self.search.whole_word,
        }
    }

    /// Loads config from `path`. Returns defaults if the file doesn't exist
    /// or can't be parsed.
    pub fn load(path: &Path) -> Self {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("config: failed to read {}: {e}", path.display());
                }
                return Self::default();
            }
        };

        match toml::from_str(&data) {
            Ok(cfg) => {
                log::debug!("config: loaded from {}", path.display());
                cfg
            }
            Err(e) => {
                log::warn!("config: parse error in {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Tries to load config, returning an error message on failure.
    /// Unlike `load()`, a missing file is an error too, so callers given an
    /// explicit path can report it.
    pub fn try_load(path: &Path) -> Result<Self, String> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        toml::from_str(&data).map_err(|e| format!("parse error in {}: {e}", path.display()))
    }
}

/// Directory holding `config.toml`.
///
/// `ORIFIND_CONFIG_DIR` wins when set. Otherwise `%APPDATA%\orifind` on
/// Windows, `$XDG_CONFIG_HOME/orifind` or `~/.config/orifind` elsewhere,
/// and `./orifind` when none of those variables exist.
pub fn config_dir() -> PathBuf {
    resolve_config_dir(cfg!(windows), |key| {
        std::env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from)
    })
}

fn resolve_config_dir(windows: bool, var: impl Fn(&str) -> Option<PathBuf>) -> PathBuf {
    if let Some(dir) = var("ORIFIND_CONFIG_DIR") {
        return dir;
    }
    let base = if windows {
        var("APPDATA")
    } else {
        var("XDG_CONFIG_HOME").or_else(|| var("HOME").map(|home| home.join(".config")))
    };
    base.unwrap_or_else(|| PathBuf::from(".")).join("orifind")
}

/// Returns the path to the config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}
