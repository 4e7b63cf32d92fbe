//! Make command - scaffold a hook file for a migration

use clap::Args;
use console::style;
use dialoguer::Select;
use tracing::info;

use migration_hooks_core::coverage::discover_migrations;
use migration_hooks_core::{
    create_handler_file, scan_coverage, FileHandlerSource, HooksError, ScaffoldError,
};

use crate::cli::{output, Cli, OutputFormat, Workspace};

/// Create a hook file for a migration
#[derive(Debug, Args)]
pub struct MakeCommand {
    /// Full migration name, including its timestamp (prompted when omitted)
    pub migration: Option<String>,

    /// Replace an existing hook file
    #[arg(short, long)]
    pub force: bool,
}

impl MakeCommand {
    /// Execute the make command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(migration = ?self.migration, force = self.force, "executing make command");
        let workspace = Workspace::load()?;
        let hooks_dir = workspace.hooks_dir();
        let migrations_dir = workspace.migrations_dir();
        let extension = workspace.config.extension.as_str();

        let migration = match self.migration {
            Some(ref name) => name.clone(),
            None => match self.prompt_migration(&workspace)? {
                Some(name) => name,
                None => {
                    if !cli.quiet {
                        output::success("All migrations have hook files!");
                    }
                    return Ok(());
                }
            },
        };

        let path = match create_handler_file(
            &migration,
            &hooks_dir,
            &migrations_dir,
            extension,
            self.force,
        ) {
            Ok(path) => path,
            Err(HooksError::Scaffold(ScaffoldError::MigrationNotFound { name, available }))
                if cli.format == OutputFormat::Text && !cli.quiet =>
            {
                print_available(&available);
                return Err(HooksError::from(ScaffoldError::MigrationNotFound { name, available }).into());
            }
            Err(e) => return Err(e.into()),
        };

        match cli.format {
            OutputFormat::Json => {
                let out = serde_json::json!({
                    "migration": path.file_stem().map(|s| s.to_string_lossy().to_string()),
                    "path": path.to_string_lossy(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    output::success(&format!(
                        "Migration hook created: {}",
                        output::path_style().apply_to(path.display())
                    ));
                }
            }
        }

        Ok(())
    }

    /// Ask which migration lacking a hook file to scaffold
    fn prompt_migration(&self, workspace: &Workspace) -> anyhow::Result<Option<String>> {
        let hooks_dir = workspace.hooks_dir();
        let migrations_dir = workspace.migrations_dir();

        let candidates = if hooks_dir.is_dir() {
            let source = FileHandlerSource::new(&hooks_dir, workspace.config.extension.as_str());
            scan_coverage(&migrations_dir, &source)?.missing
        } else {
            discover_migrations(&migrations_dir)?
        };

        if candidates.is_empty() {
            return Ok(None);
        }

        let selection = Select::new()
            .with_prompt("Migration to create a hook for")
            .items(&candidates)
            .default(0)
            .interact()?;

        Ok(candidates.into_iter().nth(selection))
    }
}

fn print_available(available: &[String]) {
    if available.is_empty() {
        output::warning("No migration files found.");
        return;
    }

    output::info("Available migration files:");
    for migration in available {
        println!("  - {}", output::migration_style().apply_to(migration));
    }
    println!();
    println!("Usage:   migration-hooks make <full_migration_filename>");
    println!(
        "Example: {}",
        style("migration-hooks make 2024_01_15_123456_create_users_table").dim()
    );
}
