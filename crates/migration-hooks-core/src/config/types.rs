//! Configuration types

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults::{
    DEFAULT_CONNECTION, DEFAULT_DATA_DIR, DEFAULT_EXTENSION, DEFAULT_HOOKS_DIR,
    DEFAULT_MIGRATIONS_DIR, DEFAULT_TIMEOUT_SECS,
};

/// Configuration for hook dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    /// Run step handler files. Registered callbacks fire either way.
    pub enabled: bool,

    /// Directory searched for handler files (defaults to `{data_dir}/hooks`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Directory holding migrations and hooks
    pub data_dir: PathBuf,

    /// Directory holding migration files (defaults to `{data_dir}/migrations`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrations_path: Option<PathBuf>,

    /// Handler file extension
    pub extension: String,

    /// Propagate hook failures to the migration driver instead of logging them
    pub halt_on_error: bool,

    /// Treat a handler file that is not a handler definition as a failure
    pub strict_mode: bool,

    /// Log step, operation and duration for every handler run
    pub log_execution: bool,

    /// Execution budget per handler operation in seconds (0 = unbounded)
    pub timeout: u64,

    /// Connection identifier passed to hooks
    pub connection: String,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            migrations_path: None,
            extension: DEFAULT_EXTENSION.to_string(),
            halt_on_error: false,
            strict_mode: false,
            log_execution: true,
            timeout: DEFAULT_TIMEOUT_SECS,
            connection: DEFAULT_CONNECTION.to_string(),
        }
    }
}

impl HooksConfig {
    /// Handler directory, relative paths resolved against `base_dir`
    pub fn hooks_dir(&self, base_dir: &Path) -> PathBuf {
        let dir = self
            .path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DEFAULT_HOOKS_DIR));
        resolve(base_dir, dir)
    }

    /// Migrations directory, relative paths resolved against `base_dir`
    pub fn migrations_dir(&self, base_dir: &Path) -> PathBuf {
        let dir = self
            .migrations_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DEFAULT_MIGRATIONS_DIR));
        resolve(base_dir, dir)
    }

    /// Execution budget per handler operation, `None` when unbounded
    pub fn budget(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }
}

fn resolve(base_dir: &Path, dir: PathBuf) -> PathBuf {
    if dir.is_absolute() {
        dir
    } else {
        base_dir.join(dir)
    }
}
