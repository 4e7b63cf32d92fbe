//! Handler files - `{hooks_dir}/{step}.{extension}`
//!
//! A handler file is a TOML or YAML document with up to four tables, one per
//! operation:
//!
//! ```toml
//! [before_up]
//! command = "pg_dump --table users > backups/users.sql"
//!
//! [after_up]
//! command = "./bin/seed-admin"
//! cwd = ".."
//! env = { SEED_PROFILE = "minimal" }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::command::{CommandSpec, ShellCommand};
use super::{HandlerOp, HandlerSource, LoadError, StepHandler};
use crate::hooks::HookContext;

/// Parsed contents of a handler file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_up: Option<CommandSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_up: Option<CommandSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_down: Option<CommandSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_down: Option<CommandSpec>,
}

impl HandlerDefinition {
    /// Get the command for an operation
    pub fn command(&self, op: HandlerOp) -> Option<&CommandSpec> {
        match op {
            HandlerOp::BeforeUp => self.before_up.as_ref(),
            HandlerOp::AfterUp => self.after_up.as_ref(),
            HandlerOp::BeforeDown => self.before_down.as_ref(),
            HandlerOp::AfterDown => self.after_down.as_ref(),
        }
    }

    /// Operations defined in the file
    pub fn defined_ops(&self) -> Vec<HandlerOp> {
        HandlerOp::all()
            .iter()
            .copied()
            .filter(|op| self.command(*op).is_some())
            .collect()
    }
}

/// Handler source reading handler files from a directory
#[derive(Debug, Clone)]
pub struct FileHandlerSource {
    dir: PathBuf,
    extension: String,
    timeout: Option<Duration>,
}

impl FileHandlerSource {
    /// Create a source for handler files in `dir` with the given extension
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            dir: dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
            timeout: None,
        }
    }

    /// Kill handler commands once `timeout` elapses
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the handler directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the handler file extension
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Location of the handler file for a step
    pub fn handler_path(&self, step: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", step, self.extension))
    }

    /// Read and parse the handler file for a step without building a handler.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn inspect(&self, step: &str) -> Result<Option<HandlerDefinition>, LoadError> {
        let path = self.handler_path(step);
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| LoadError::Evaluation {
            path: path.clone(),
            message: format!("failed to read hook file: {e}"),
        })?;

        parse_definition(&path, &content, &self.extension).map(Some)
    }
}

impl HandlerSource for FileHandlerSource {
    fn load(&self, step: &str, context: &HookContext) -> Result<Option<StepHandler>, LoadError> {
        let Some(definition) = self.inspect(step)? else {
            debug!(step, dir = %self.dir.display(), "no hook file for step");
            return Ok(None);
        };

        let context_env = context.to_env();
        let mut handler = StepHandler::new();
        for op in definition.defined_ops() {
            if let Some(spec) = definition.command(op) {
                let command = ShellCommand::new(spec.clone())
                    .with_context_env(context_env.clone())
                    .with_base_dir(self.dir.clone())
                    .with_timeout(self.timeout);
                handler.set(op, Arc::new(move || command.run()));
            }
        }

        Ok(Some(handler))
    }
}

fn parse_definition(path: &Path, content: &str, extension: &str) -> Result<HandlerDefinition, LoadError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let evaluation = |message: String| LoadError::Evaluation {
        path: path.to_path_buf(),
        message,
    };
    let shape = |message: String| LoadError::Shape {
        path: path.to_path_buf(),
        message: format!("Hook file {file_name} did not define a hook: {message}"),
    };

    match extension {
        "yaml" | "yml" => {
            let value: serde_yaml::Value =
                serde_yaml::from_str(content).map_err(|e| evaluation(e.to_string()))?;
            if !value.is_mapping() {
                return Err(shape("expected a mapping of hook operations".to_string()));
            }
            serde_yaml::from_value(value).map_err(|e| shape(e.to_string()))
        }
        _ => {
            let value: toml::Value =
                toml::from_str(content).map_err(|e| evaluation(e.to_string()))?;
            if !value.is_table() {
                return Err(shape("expected a table of hook operations".to_string()));
            }
            value.try_into().map_err(|e: toml::de::Error| shape(e.to_string()))
        }
    }
}
