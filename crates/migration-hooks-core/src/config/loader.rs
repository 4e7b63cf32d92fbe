//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::HooksConfig;
use super::validation::validate_config;

/// Prefix of the environment variables overriding configuration values
pub const ENV_PREFIX: &str = "MIGRATION_HOOKS_";

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<HooksConfig> {
    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: HooksConfig = if format == "TOML" {
        toml::from_str(&content).map_err(ConfigError::TomlError)?
    } else {
        serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?
    };

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find configuration file in directory or parent directories
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.is_file() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration from directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(HooksConfig, PathBuf)> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// Load configuration or use defaults when no config file exists.
///
/// A config file that exists but fails to parse or validate is an error.
pub fn load_config_or_default(dir: &Path) -> Result<(HooksConfig, Option<PathBuf>)> {
    match find_config(dir) {
        Some(path) => {
            let config = load_config(&path)?;
            Ok((config, Some(path)))
        }
        None => {
            debug!(dir = %dir.display(), "no config found, using defaults");
            Ok((HooksConfig::default(), None))
        }
    }
}

/// Directory relative config paths resolve against: the config file's
/// directory, or `fallback` when there is no config file
pub fn config_base_dir(config_path: Option<&Path>, fallback: &Path) -> PathBuf {
    config_path
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| fallback.to_path_buf())
}

/// Apply `MIGRATION_HOOKS_*` environment overrides, then re-validate
pub fn apply_env_overrides(config: &mut HooksConfig) -> Result<()> {
    apply_env_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides read through `lookup`, then re-validate.
///
/// Values that do not parse are ignored with a warning.
pub fn apply_env_overrides_from<F>(config: &mut HooksConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| {
        let key = format!("{ENV_PREFIX}{name}");
        lookup(&key).map(|value| (key, value))
    };

    if let Some((key, v)) = var("ENABLED") {
        set_flag(&mut config.enabled, &key, &v);
    }
    if let Some((key, v)) = var("HALT_ON_ERROR") {
        set_flag(&mut config.halt_on_error, &key, &v);
    }
    if let Some((key, v)) = var("STRICT_MODE") {
        set_flag(&mut config.strict_mode, &key, &v);
    }
    if let Some((key, v)) = var("LOG_EXECUTION") {
        set_flag(&mut config.log_execution, &key, &v);
    }

    if let Some((key, v)) = var("TIMEOUT") {
        match v.trim().parse() {
            Ok(n) => config.timeout = n,
            Err(_) => warn!(key = %key, value = %v, "ignoring invalid timeout override"),
        }
    }

    if let Some((_, v)) = var("PATH") {
        config.path = Some(PathBuf::from(v));
    }
    if let Some((_, v)) = var("EXTENSION") {
        config.extension = v.trim().trim_start_matches('.').to_string();
    }
    if let Some((_, v)) = var("CONNECTION") {
        config.connection = v;
    }

    validate_config(config)
}

fn set_flag(flag: &mut bool, key: &str, value: &str) {
    match parse_bool(value) {
        Some(b) => *flag = b,
        None => warn!(key, value, "ignoring invalid boolean override"),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
