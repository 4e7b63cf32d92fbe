//! Default configuration values

use super::types::HooksConfig;

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "migration-hooks.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "migration-hooks.yaml";

/// Directory holding migrations and hooks, relative to the project root
pub const DEFAULT_DATA_DIR: &str = "database";

/// Hooks directory name inside the data directory
pub const DEFAULT_HOOKS_DIR: &str = "hooks";

/// Migrations directory name inside the data directory
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

/// Default handler file extension
pub const DEFAULT_EXTENSION: &str = "toml";

/// Default execution budget per handler operation, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default connection identifier
pub const DEFAULT_CONNECTION: &str = "default";

/// Handler file extensions the loader understands
pub const SUPPORTED_EXTENSIONS: &[&str] = &["toml", "yaml", "yml"];

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".migration-hooks.toml",
        ".migration-hooks.yaml",
    ]
}

/// Generate default configuration TOML
pub fn default_config_toml() -> String {
    toml::to_string_pretty(&HooksConfig::default())
        .unwrap_or_else(|_| DEFAULT_CONFIG_TEMPLATE.to_string())
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Migration hooks configuration

# Run step handler files (registered callbacks always run)
enabled = true

# Directory holding migrations/ and hooks/
data_dir = "database"

# Handler directory, defaults to {data_dir}/hooks
# path = "database/hooks"

# Handler file extension: toml, yaml or yml
extension = "toml"

# Stop the migration run on the first failing hook
halt_on_error = false

# Treat malformed handler files as failures instead of warnings
strict_mode = false

# Log the duration of every handler operation
log_execution = true

# Execution budget per handler operation in seconds (0 = unbounded)
timeout = 60

connection = "default"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let parsed: HooksConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        let defaults = HooksConfig::default();
        assert_eq!(parsed.enabled, defaults.enabled);
        assert_eq!(parsed.extension, defaults.extension);
        assert_eq!(parsed.timeout, defaults.timeout);
        assert_eq!(parsed.path, None);
    }

    #[test]
    fn test_generated_config_roundtrips() {
        let parsed: HooksConfig = toml::from_str(&default_config_toml()).unwrap();
        assert_eq!(parsed.connection, DEFAULT_CONNECTION);
        assert_eq!(parsed.data_dir.to_str(), Some(DEFAULT_DATA_DIR));
    }
}
