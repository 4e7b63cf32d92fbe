//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::defaults::SUPPORTED_EXTENSIONS;
use super::types::HooksConfig;

/// Validate configuration
pub fn validate_config(config: &HooksConfig) -> Result<()> {
    debug!("validating configuration");
    validate_extension(config)?;
    validate_paths(config)?;

    if config.connection.trim().is_empty() {
        return Err(invalid("connection", "connection cannot be empty"));
    }

    debug!("configuration validation passed");
    Ok(())
}

fn validate_extension(config: &HooksConfig) -> Result<()> {
    let extension = config.extension.trim_start_matches('.');
    if !SUPPORTED_EXTENSIONS.contains(&extension) {
        return Err(invalid(
            "extension",
            &format!("must be one of: {}", SUPPORTED_EXTENSIONS.join(", ")),
        ));
    }
    Ok(())
}

fn validate_paths(config: &HooksConfig) -> Result<()> {
    if config.data_dir.as_os_str().is_empty() {
        return Err(invalid("data_dir", "path cannot be empty"));
    }
    if config.path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
        return Err(invalid("path", "path cannot be empty"));
    }
    if config
        .migrations_path
        .as_ref()
        .is_some_and(|p| p.as_os_str().is_empty())
    {
        return Err(invalid("migrations_path", "path cannot be empty"));
    }
    Ok(())
}

fn invalid(field: &str, message: &str) -> crate::error::HooksError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&HooksConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let config = HooksConfig {
            extension: "php".to_string(),
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("extension"));

        let config = HooksConfig {
            extension: ".yml".to_string(),
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_empty_paths() {
        let config = HooksConfig {
            path: Some(PathBuf::new()),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());

        let config = HooksConfig {
            data_dir: PathBuf::new(),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_empty_connection() {
        let config = HooksConfig {
            connection: "  ".to_string(),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
