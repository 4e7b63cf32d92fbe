//! Step identity - mapping migration handles to handler names

use std::fmt;
use std::path::{Path, PathBuf};

/// A migration step as handed over by the host's migration driver.
///
/// The dispatcher only needs to know where the step was defined; everything
/// else about the step is opaque and passed through to callbacks untouched.
pub trait MigrationStep: fmt::Debug + Send + Sync {
    /// Location of the step definition, if it can be determined.
    ///
    /// Best-effort: implementations return `None` instead of failing.
    fn file_path(&self) -> Option<String>;
}

/// A migration step backed by a file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    path: PathBuf,
}

impl PathStep {
    /// Create a step for the migration file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the migration file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MigrationStep for PathStep {
    fn file_path(&self) -> Option<String> {
        let absolute = if self.path.is_absolute() {
            self.path.clone()
        } else {
            std::env::current_dir().ok()?.join(&self.path)
        };
        Some(absolute.to_string_lossy().into_owned())
    }
}

/// Derive the step identifier from a migration file path.
///
/// The identifier is the base name with its extension stripped. Windows
/// separators are accepted. An absent path stays absent and an empty path
/// maps to an empty identifier; callers rely on the two being distinct.
pub fn step_identifier(file_path: Option<&str>) -> Option<String> {
    let path = file_path?;
    if path.is_empty() {
        return Some(String::new());
    }

    let normalized = path.replace('\\', "/");
    let trimmed = normalized.trim_end_matches('/');
    let base = trimmed.rsplit('/').next().unwrap_or(trimmed);

    let stem = match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    };

    Some(stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_from_migration_path() {
        assert_eq!(
            step_identifier(Some(
                "/database/migrations/2024_01_01_000000_create_users_table.php"
            )),
            Some("2024_01_01_000000_create_users_table".to_string())
        );
    }

    #[test]
    fn test_identifier_absent_empty_distinct() {
        assert_eq!(step_identifier(None), None);
        assert_eq!(step_identifier(Some("")), Some(String::new()));
    }

    #[test]
    fn test_identifier_windows_separators() {
        assert_eq!(
            step_identifier(Some(r"C:\app\database\migrations\2024_02_02_add_index.sql")),
            Some("2024_02_02_add_index".to_string())
        );
    }

    #[test]
    fn test_identifier_without_directory_or_extension() {
        assert_eq!(
            step_identifier(Some("create_posts_table")),
            Some("create_posts_table".to_string())
        );
        assert_eq!(
            step_identifier(Some("create_posts_table.rs")),
            Some("create_posts_table".to_string())
        );
    }

    #[test]
    fn test_identifier_keeps_inner_dots_and_hidden_names() {
        assert_eq!(
            step_identifier(Some("/m/2024_01_01.seed.sql")),
            Some("2024_01_01.seed".to_string())
        );
        assert_eq!(step_identifier(Some("/m/.hidden")), Some(".hidden".to_string()));
        assert_eq!(
            step_identifier(Some("/m/create_users_table/")),
            Some("create_users_table".to_string())
        );
    }

    #[test]
    fn test_path_step_reports_absolute_path() {
        let step = PathStep::new("database/migrations/2024_01_01_create_users_table.sql");
        let path = step.file_path().unwrap();
        assert!(Path::new(&path).is_absolute());
        assert_eq!(
            step_identifier(Some(&path)),
            Some("2024_01_01_create_users_table".to_string())
        );
    }
}
