//! Error types for migration hooks

use std::path::PathBuf;
use thiserror::Error;

use crate::handlers::HandlerOp;

/// Result type alias using HooksError
pub type Result<T> = std::result::Result<T, HooksError>;

/// Main error type for migration hook operations
#[derive(Debug, Error)]
pub enum HooksError {
    /// A hook failed while dispatching a lifecycle signal
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Handler scaffolding and coverage errors
    #[error(transparent)]
    Scaffold(#[from] ScaffoldError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl HooksError {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }
}

/// Failures raised while running step handlers or registry callbacks.
///
/// All three are reported the same way: always logged, and propagated to the
/// migration driver only when `halt_on_error` is set.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The handler file exists but could not be evaluated, or it is not a
    /// handler definition
    #[error("Failed to load hook for {step} from {}: {message}", path.display())]
    HandlerLoad {
        step: String,
        path: PathBuf,
        message: String,
    },

    /// A handler operation failed or ran past its execution budget
    #[error("Migration hook failed for {step}::{operation}: {message}")]
    HandlerExecution {
        step: String,
        operation: HandlerOp,
        message: String,
        timed_out: bool,
    },

    /// A registered callback failed
    #[error("Migration hook callback for '{event}' failed: {message}")]
    RegistryCallback { event: String, message: String },
}

impl DispatchError {
    /// Build a timeout failure for a handler operation
    pub fn timeout(step: impl Into<String>, operation: HandlerOp, seconds: u64) -> Self {
        Self::HandlerExecution {
            step: step.into(),
            operation,
            message: format!("timeout after {seconds}s"),
            timed_out: true,
        }
    }

    /// Whether this failure came from an exhausted execution budget
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::HandlerExecution { timed_out: true, .. })
    }

    /// Short name of the failure class, used in logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HandlerLoad { .. } => "handler_load",
            Self::HandlerExecution { .. } => "handler_execution",
            Self::RegistryCallback { .. } => "registry_callback",
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from handler scaffolding and coverage scans
#[derive(Debug, Error)]
pub enum ScaffoldError {
    /// No migration file matches the requested name exactly
    #[error("Migration file not found: {name}")]
    MigrationNotFound { name: String, available: Vec<String> },

    /// A handler file is already present for the migration
    #[error("Hook file already exists: {0}")]
    AlreadyExists(PathBuf),

    /// The hooks directory does not exist
    #[error("Hooks directory does not exist: {0}")]
    HooksDirMissing(PathBuf),

    /// The migrations directory does not exist
    #[error("Migrations directory does not exist: {0}")]
    MigrationsDirMissing(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
