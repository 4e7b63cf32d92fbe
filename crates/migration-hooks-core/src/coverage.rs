//! Coverage of migrations by handler files

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, ScaffoldError};
use crate::handlers::{FileHandlerSource, LoadError};
use crate::step::step_identifier;

/// Hook status of one migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookCoverage {
    /// Migration name (file name without extension)
    pub migration: String,
    /// Whether a handler file exists for the migration
    pub has_hook: bool,
    /// Operations the handler file defines, or a description of why it
    /// could not be read
    pub methods: Vec<String>,
}

/// Coverage of a migrations directory by a hooks directory
#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    /// Directory searched for handler files
    pub hooks_dir: PathBuf,
    /// One entry per migration, sorted by name
    pub entries: Vec<HookCoverage>,
    /// Migrations without a handler file
    pub missing: Vec<String>,
    /// Number of migrations
    pub total_migrations: usize,
    /// Number of migrations with a handler file
    pub with_hooks: usize,
    /// Percentage of migrations with a handler file, one decimal
    pub coverage: f64,
}

/// List migration files in `migrations_dir`, sorted by migration name.
///
/// Hidden files such as `.gitkeep` are ignored.
pub fn migration_files(migrations_dir: &Path) -> Result<Vec<PathBuf>> {
    if !migrations_dir.is_dir() {
        return Err(ScaffoldError::MigrationsDirMissing(migrations_dir.to_path_buf()).into());
    }

    let mut files: Vec<(String, PathBuf)> = WalkDir::new(migrations_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let name = visible_stem(e.file_name().to_string_lossy().as_ref())?;
            Some((name, e.into_path()))
        })
        .collect();
    files.sort();

    debug!(dir = %migrations_dir.display(), count = files.len(), "discovered migrations");
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

/// List migration names in `migrations_dir`, sorted
pub fn discover_migrations(migrations_dir: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = migration_files(migrations_dir)?
        .iter()
        .filter_map(|path| step_identifier(path.file_name()?.to_str()))
        .collect();
    names.dedup();
    Ok(names)
}

/// Compare the migrations in `migrations_dir` against the handler files of `source`
pub fn scan_coverage(migrations_dir: &Path, source: &FileHandlerSource) -> Result<CoverageReport> {
    let hooks_dir = source.dir();
    if !hooks_dir.is_dir() {
        return Err(ScaffoldError::HooksDirMissing(hooks_dir.to_path_buf()).into());
    }

    let migrations = discover_migrations(migrations_dir)?;
    let hooks = hook_names(hooks_dir, source.extension());

    let mut entries = Vec::with_capacity(migrations.len());
    let mut missing = Vec::new();

    for migration in migrations {
        let has_hook = hooks.contains(&migration);
        let methods = if has_hook {
            hook_methods(source, &migration)
        } else {
            missing.push(migration.clone());
            Vec::new()
        };
        entries.push(HookCoverage {
            migration,
            has_hook,
            methods,
        });
    }

    let total_migrations = entries.len();
    let with_hooks = total_migrations - missing.len();
    let coverage = if total_migrations == 0 {
        0.0
    } else {
        let percent = with_hooks as f64 / total_migrations as f64 * 100.0;
        (percent * 10.0).round() / 10.0
    };

    Ok(CoverageReport {
        hooks_dir: hooks_dir.to_path_buf(),
        entries,
        missing,
        total_migrations,
        with_hooks,
        coverage,
    })
}

fn hook_methods(source: &FileHandlerSource, migration: &str) -> Vec<String> {
    match source.inspect(migration) {
        Ok(Some(definition)) => definition
            .defined_ops()
            .iter()
            .map(|op| op.method_name().to_string())
            .collect(),
        Ok(None) => Vec::new(),
        Err(LoadError::Shape { .. }) => vec!["Invalid hook file".to_string()],
        Err(e) => vec![format!("Error: {e}")],
    }
}

/// Names of handler files directly inside `dir` with the given extension
fn hook_names(dir: &Path, extension: &str) -> BTreeSet<String> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|x| x == extension))
        .filter_map(|e| visible_stem(e.file_name().to_string_lossy().as_ref()))
        .collect()
}

fn visible_stem(file_name: &str) -> Option<String> {
    if file_name.starts_with('.') {
        return None;
    }
    step_identifier(Some(file_name))
}
