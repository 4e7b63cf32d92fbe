//! Handler file scaffolding

use std::path::{Path, PathBuf};

use tracing::info;

use crate::coverage::discover_migrations;
use crate::error::{HooksError, Result, ScaffoldError};
use crate::step::step_identifier;

/// Placeholder replaced with the migration name
pub const MIGRATION_NAME_PLACEHOLDER: &str = "{{migration_name}}";

/// Handler template in TOML
pub const TOML_TEMPLATE: &str = r#"# Migration hook for: {{migration_name}}
#
# Runs automatically when the migration runs. Every table is optional:
# before_up, after_up, before_down, after_down.
#
# Commands run through the shell with these variables set:
#   MIGRATION_HOOKS_CTX_EVENT, MIGRATION_HOOKS_CTX_METHOD, MIGRATION_HOOKS_CTX_CONNECTION,
#   MIGRATION_HOOKS_CTX_STEP, MIGRATION_HOOKS_CTX_FILE_PATH
# Relative `cwd` values resolve against the hooks directory.

[before_up]
description = "Before migration up: {{migration_name}}"
command = "echo 'Before migration up: {{migration_name}}'"
# Check prerequisites or back up data before the schema changes:
# command = "pg_dump --data-only --table users > backups/{{migration_name}}.sql"

[after_up]
description = "After migration up: {{migration_name}}"
command = "echo 'After migration up: {{migration_name}}'"
# Seed data, clear caches or rebuild search indexes:
# command = "./bin/seed --only admin"
# env = { SEED_PROFILE = "minimal" }

[before_down]
description = "Before migration down: {{migration_name}}"
command = "echo 'Before migration down: {{migration_name}}'"
# Save data the rollback is about to drop:
# command = "pg_dump --data-only --table users > backups/{{migration_name}}-rollback.sql"

[after_down]
description = "After migration down: {{migration_name}}"
command = "echo 'After migration down: {{migration_name}}'"
# Clean up or restore saved data:
# command = "rm -f backups/{{migration_name}}-rollback.sql"
"#;

/// Handler template in YAML
pub const YAML_TEMPLATE: &str = r#"# Migration hook for: {{migration_name}}
#
# Runs automatically when the migration runs. Every key is optional:
# before_up, after_up, before_down, after_down.
#
# Commands run through the shell with these variables set:
#   MIGRATION_HOOKS_CTX_EVENT, MIGRATION_HOOKS_CTX_METHOD, MIGRATION_HOOKS_CTX_CONNECTION,
#   MIGRATION_HOOKS_CTX_STEP, MIGRATION_HOOKS_CTX_FILE_PATH
# Relative `cwd` values resolve against the hooks directory.

before_up:
  description: "Before migration up: {{migration_name}}"
  command: "echo 'Before migration up: {{migration_name}}'"
  # Check prerequisites or back up data before the schema changes:
  # command: "pg_dump --data-only --table users > backups/{{migration_name}}.sql"

after_up:
  description: "After migration up: {{migration_name}}"
  command: "echo 'After migration up: {{migration_name}}'"
  # Seed data, clear caches or rebuild search indexes:
  # command: "./bin/seed --only admin"
  # env:
  #   SEED_PROFILE: minimal

before_down:
  description: "Before migration down: {{migration_name}}"
  command: "echo 'Before migration down: {{migration_name}}'"

after_down:
  description: "After migration down: {{migration_name}}"
  command: "echo 'After migration down: {{migration_name}}'"
"#;

/// Render the handler template for a migration
pub fn render_handler(migration: &str, extension: &str) -> String {
    let template = match extension.trim_start_matches('.') {
        "yaml" | "yml" => YAML_TEMPLATE,
        _ => TOML_TEMPLATE,
    };
    template.replace(MIGRATION_NAME_PLACEHOLDER, migration)
}

/// Create the handler file for a migration.
///
/// `name` must match a migration file name exactly (an extension is
/// ignored). The hooks directory is created when missing. An existing
/// handler file is replaced only with `overwrite`, and only once the
/// migration has been found.
pub fn create_handler_file(
    name: &str,
    hooks_dir: &Path,
    migrations_dir: &Path,
    extension: &str,
    overwrite: bool,
) -> Result<PathBuf> {
    let migration = step_identifier(Some(name.trim())).unwrap_or_default();

    let available = match discover_migrations(migrations_dir) {
        Ok(names) => names,
        Err(HooksError::Scaffold(ScaffoldError::MigrationsDirMissing(_))) => Vec::new(),
        Err(e) => return Err(e),
    };
    if migration.is_empty() || !available.contains(&migration) {
        return Err(ScaffoldError::MigrationNotFound {
            name: migration,
            available,
        }
        .into());
    }

    if !hooks_dir.is_dir() {
        std::fs::create_dir_all(hooks_dir).map_err(ScaffoldError::Io)?;
        info!(dir = %hooks_dir.display(), "created hooks directory");
    }

    let extension = extension.trim_start_matches('.');
    let path = hooks_dir.join(format!("{migration}.{extension}"));
    if path.exists() {
        if !overwrite {
            return Err(ScaffoldError::AlreadyExists(path).into());
        }
        info!(path = %path.display(), "replacing existing migration hook");
    }

    std::fs::write(&path, render_handler(&migration, extension)).map_err(ScaffoldError::Io)?;
    info!(path = %path.display(), "created migration hook");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{FileHandlerSource, HandlerOp};
    use tempfile::TempDir;

    fn fixture() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let migrations = temp.path().join("database/migrations");
        std::fs::create_dir_all(&migrations).unwrap();
        std::fs::write(
            migrations.join("2024_01_15_123456_create_users_table.sql"),
            "",
        )
        .unwrap();
        let hooks = temp.path().join("database/hooks");
        (temp, migrations, hooks)
    }

    #[test]
    fn test_create_handler_file() {
        let (_temp, migrations, hooks) = fixture();

        let path = create_handler_file(
            "2024_01_15_123456_create_users_table.sql",
            &hooks,
            &migrations,
            "toml",
            false,
        )
        .unwrap();

        assert_eq!(path, hooks.join("2024_01_15_123456_create_users_table.toml"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Before migration up: 2024_01_15_123456_create_users_table"));
        assert!(!content.contains(MIGRATION_NAME_PLACEHOLDER));
    }

    #[test]
    fn test_templates_define_all_operations() {
        for extension in ["toml", "yaml"] {
            let (_temp, migrations, hooks) = fixture();
            create_handler_file(
                "2024_01_15_123456_create_users_table",
                &hooks,
                &migrations,
                extension,
                false,
            )
            .unwrap();

            let definition = FileHandlerSource::new(&hooks, extension)
                .inspect("2024_01_15_123456_create_users_table")
                .unwrap()
                .unwrap();
            assert_eq!(definition.defined_ops(), HandlerOp::all().to_vec());
        }
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let (_temp, migrations, hooks) = fixture();
        let name = "2024_01_15_123456_create_users_table";
        create_handler_file(name, &hooks, &migrations, "toml", false).unwrap();

        let err = create_handler_file(name, &hooks, &migrations, "toml", false).unwrap_err();
        assert!(matches!(
            err,
            HooksError::Scaffold(ScaffoldError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_requires_exact_migration_name() {
        let (_temp, migrations, hooks) = fixture();

        let err = create_handler_file("create_users_table", &hooks, &migrations, "toml", true).unwrap_err();
        match err {
            HooksError::Scaffold(ScaffoldError::MigrationNotFound { name, available }) => {
                assert_eq!(name, "create_users_table");
                assert_eq!(available, vec!["2024_01_15_123456_create_users_table"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!hooks.exists());
    }

    #[test]
    fn test_overwrite_replaces_existing_file() {
        let (_temp, migrations, hooks) = fixture();
        let name = "2024_01_15_123456_create_users_table";
        let path = create_handler_file(name, &hooks, &migrations, "toml", false).unwrap();
        std::fs::write(&path, "[after_up]\ncommand = \"true\"\n").unwrap();

        let replaced = create_handler_file(name, &hooks, &migrations, "toml", true).unwrap();
        assert_eq!(replaced, path);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Before migration up"));
    }

    #[test]
    fn test_overwrite_keeps_orphan_hook_when_migration_missing() {
        let (_temp, migrations, hooks) = fixture();
        std::fs::create_dir_all(&hooks).unwrap();
        let orphan = hooks.join("legacy_backfill.toml");
        std::fs::write(&orphan, "[before_up]\ncommand = \"true\"\n").unwrap();

        let err = create_handler_file("legacy_backfill", &hooks, &migrations, "toml", true).unwrap_err();
        assert!(matches!(
            err,
            HooksError::Scaffold(ScaffoldError::MigrationNotFound { .. })
        ));
        assert_eq!(
            std::fs::read_to_string(&orphan).unwrap(),
            "[before_up]\ncommand = \"true\"\n"
        );
    }
}
