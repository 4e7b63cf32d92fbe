//! Dispatch context handed to every callback and step handler

use std::collections::HashMap;
use std::sync::Arc;

use super::event::{Direction, HookEvent};
use crate::step::MigrationStep;

/// Snapshot of the data describing one dispatch.
///
/// Built once per lifecycle signal and only ever shared by reference, so every
/// callback of a dispatch observes the same values.
#[derive(Debug, Clone)]
pub struct HookContext {
    /// Event being dispatched
    pub event: HookEvent,
    /// Direction of the run
    pub method: Direction,
    /// Connection or environment identifier supplied by the host
    pub connection: String,
    /// Step name derived from the step's file path (per-step events only)
    pub step_identifier: Option<String>,
    /// Location of the step definition (per-step events only)
    pub file_path: Option<String>,
    /// The host's step handle (per-step events only)
    pub migration: Option<Arc<dyn MigrationStep>>,
}

impl HookContext {
    /// Create a context for a run-wide event
    pub fn new(event: HookEvent, method: Direction, connection: impl Into<String>) -> Self {
        Self {
            event,
            method,
            connection: connection.into(),
            step_identifier: None,
            file_path: None,
            migration: None,
        }
    }

    /// Set the step identifier
    pub fn with_step_identifier(mut self, step: Option<String>) -> Self {
        self.step_identifier = step;
        self
    }

    /// Set the step file path
    pub fn with_file_path(mut self, path: Option<String>) -> Self {
        self.file_path = path;
        self
    }

    /// Set the step handle
    pub fn with_migration(mut self, migration: Arc<dyn MigrationStep>) -> Self {
        self.migration = Some(migration);
        self
    }

    /// Step identifier, treating an absent one as empty
    pub fn step_name(&self) -> &str {
        self.step_identifier.as_deref().unwrap_or("")
    }

    /// Convert context to environment variables
    pub fn to_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();

        env.insert("MIGRATION_HOOKS_CTX_EVENT".to_string(), self.event.as_str().to_string());
        env.insert("MIGRATION_HOOKS_CTX_METHOD".to_string(), self.method.as_str().to_string());
        env.insert("MIGRATION_HOOKS_CTX_CONNECTION".to_string(), self.connection.clone());

        if let Some(ref v) = self.step_identifier {
            env.insert("MIGRATION_HOOKS_CTX_STEP".to_string(), v.clone());
        }
        if let Some(ref v) = self.file_path {
            env.insert("MIGRATION_HOOKS_CTX_FILE_PATH".to_string(), v.clone());
        }

        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::PathStep;

    #[test]
    fn test_run_context_has_no_step() {
        let ctx = HookContext::new(HookEvent::AllStarted, Direction::Up, "testing");
        assert_eq!(ctx.connection, "testing");
        assert!(ctx.step_identifier.is_none());
        assert!(ctx.migration.is_none());
        assert_eq!(ctx.step_name(), "");
    }

    #[test]
    fn test_context_to_env() {
        let ctx = HookContext::new(HookEvent::StepEnded, Direction::Down, "pgsql")
            .with_step_identifier(Some("2024_01_01_create_users_table".to_string()))
            .with_file_path(Some("/m/2024_01_01_create_users_table.sql".to_string()))
            .with_migration(Arc::new(PathStep::new("/m/2024_01_01_create_users_table.sql")));

        let env = ctx.to_env();
        assert_eq!(env.get("MIGRATION_HOOKS_CTX_EVENT"), Some(&"step_ended".to_string()));
        assert_eq!(env.get("MIGRATION_HOOKS_CTX_METHOD"), Some(&"down".to_string()));
        assert_eq!(env.get("MIGRATION_HOOKS_CTX_CONNECTION"), Some(&"pgsql".to_string()));
        assert_eq!(
            env.get("MIGRATION_HOOKS_CTX_STEP"),
            Some(&"2024_01_01_create_users_table".to_string())
        );
        assert!(env.contains_key("MIGRATION_HOOKS_CTX_FILE_PATH"));
    }

    #[test]
    fn test_run_context_env_omits_step_keys() {
        let env = HookContext::new(HookEvent::AllEnded, Direction::Up, "default").to_env();
        assert!(!env.contains_key("MIGRATION_HOOKS_CTX_STEP"));
        assert!(!env.contains_key("MIGRATION_HOOKS_CTX_FILE_PATH"));
    }

    #[test]
    fn test_context_env_does_not_override_config() {
        use crate::config::{apply_env_overrides_from, HooksConfig};

        let env = HookContext::new(HookEvent::StepStarted, Direction::Down, "analytics")
            .with_step_identifier(Some("create_users_table".to_string()))
            .to_env();
        assert!(env.keys().all(|k| k.starts_with("MIGRATION_HOOKS_CTX_")));

        let mut config = HooksConfig::default();
        apply_env_overrides_from(&mut config, |key| env.get(key).cloned()).unwrap();
        assert_eq!(config.connection, HooksConfig::default().connection);
    }
}
