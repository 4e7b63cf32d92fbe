//! List command - migration to hook file coverage

use clap::Args;
use console::style;
use tabled::{Table, Tabled};
use tracing::info;

use migration_hooks_core::{scan_coverage, CoverageReport, FileHandlerSource, HookCoverage};

use crate::cli::{output, Cli, OutputFormat, Workspace};

/// List migrations and their hook files
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Show only migrations without hooks
    #[arg(long)]
    pub missing: bool,
}

impl ListCommand {
    /// Execute the list command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(missing = self.missing, "executing list command");
        let workspace = Workspace::load()?;
        let source = FileHandlerSource::new(
            workspace.hooks_dir(),
            workspace.config.extension.as_str(),
        );

        let report = scan_coverage(&workspace.migrations_dir(), &source)?;

        match cli.format {
            OutputFormat::Json => {
                if self.missing {
                    println!("{}", serde_json::to_string_pretty(&report.missing)?);
                } else {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
            OutputFormat::Text if self.missing => print_missing(&report),
            OutputFormat::Text => print_all(&report),
        }

        Ok(())
    }
}

/// Coverage row for table output
#[derive(Debug, Tabled)]
struct CoverageRow {
    #[tabled(rename = "Migration")]
    migration: String,
    #[tabled(rename = "Hook Exists")]
    hook_exists: &'static str,
    #[tabled(rename = "Hook Methods")]
    methods: String,
}

impl From<&HookCoverage> for CoverageRow {
    fn from(entry: &HookCoverage) -> Self {
        Self {
            migration: entry.migration.clone(),
            hook_exists: if entry.has_hook { "✓" } else { "✗" },
            methods: if entry.has_hook {
                entry.methods.join(", ")
            } else {
                "-".to_string()
            },
        }
    }
}

fn print_all(report: &CoverageReport) {
    println!("{}", output::header("Migration Hooks Status:"));
    println!();

    if report.entries.is_empty() {
        output::warning("No migration files found.");
    } else {
        let rows: Vec<CoverageRow> = report.entries.iter().map(CoverageRow::from).collect();
        println!("{}", Table::new(rows));
    }
    println!();
    println!(
        "{}",
        output::key_value("Hooks directory", &report.hooks_dir.display().to_string())
    );
    println!(
        "{}",
        output::key_value("Total migrations", &report.total_migrations.to_string())
    );
    println!(
        "{}",
        output::key_value("Migrations with hooks", &report.with_hooks.to_string())
    );
    println!(
        "{}",
        output::key_value("Coverage", &format!("{}%", report.coverage))
    );
}

fn print_missing(report: &CoverageReport) {
    if report.missing.is_empty() {
        output::success("All migrations have hook files!");
        return;
    }

    output::info("Migrations without hooks:");
    println!();
    for migration in &report.missing {
        println!("  • {}", output::migration_style().apply_to(migration));
    }
    println!();
    println!("To create a hook file, run:");
    println!("  {}", style("migration-hooks make <migration-name>").yellow());
}
