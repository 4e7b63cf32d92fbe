//! Run command - drive the dispatcher through a migration run
//!
//! The command does not change any schema. It raises the lifecycle signals a
//! migration driver would raise, so hook files can be exercised on their own.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::info;

use migration_hooks_core::coverage::migration_files;
use migration_hooks_core::step::step_identifier;
use migration_hooks_core::{
    Direction, DispatchReport, Dispatcher, HooksConfig, MigrationStep, PathStep,
};

use crate::cli::{output, Cli, OutputFormat, Workspace};

/// Dispatch lifecycle hooks for a migration run
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Direction of the run (up, down)
    #[arg(short, long, default_value = "up", value_parser = parse_direction)]
    pub direction: Direction,

    /// Connection identifier passed to hooks
    #[arg(long)]
    pub connection: Option<String>,

    /// Migrations to run, by name or path (defaults to every migration)
    pub steps: Vec<String>,
}

fn parse_direction(s: &str) -> Result<Direction, String> {
    Direction::parse(s).ok_or_else(|| format!("invalid direction '{s}', expected up or down"))
}

impl RunCommand {
    /// Execute the run command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(direction = %self.direction, steps = self.steps.len(), "executing run command");
        let workspace = Workspace::load()?;
        let steps = self.resolve_steps(&workspace)?;

        let mut dispatcher = Dispatcher::from_config(workspace.config.clone(), &workspace.base_dir);
        if let Some(ref connection) = self.connection {
            dispatcher = dispatcher.with_connection(connection.as_str());
        }

        let text = cli.format == OutputFormat::Text && !cli.quiet;
        if text {
            print_header(&workspace.config, dispatcher.connection(), self.direction, steps.len());
        }

        let mut reports = Vec::new();
        reports.push(dispatcher.all_started(self.direction)?);

        for path in steps {
            let step: Arc<dyn MigrationStep> = Arc::new(PathStep::new(path));
            let started = dispatcher.step_started(self.direction, step.clone())?;
            let ended = dispatcher.step_ended(self.direction, step)?;
            if text {
                print_step(&started, &ended);
            }
            reports.push(started);
            reports.push(ended);
        }

        reports.push(dispatcher.all_ended(self.direction)?);

        let failures: usize = reports.iter().map(|r| r.failures.len()).sum();
        let warnings: usize = reports.iter().map(|r| r.warnings.len()).sum();

        match cli.format {
            OutputFormat::Json => {
                let out = serde_json::json!({
                    "direction": self.direction.as_str(),
                    "connection": dispatcher.connection(),
                    "failures": failures,
                    "warnings": warnings,
                    "dispatches": reports.iter().map(report_json).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    println!();
                    if failures == 0 && warnings == 0 {
                        output::success("All hooks completed");
                    } else {
                        output::warning(&format!(
                            "Hooks completed with {failures} failure(s) and {warnings} warning(s)"
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// Migration files to run, in run order
    fn resolve_steps(&self, workspace: &Workspace) -> anyhow::Result<Vec<PathBuf>> {
        let migrations_dir = workspace.migrations_dir();

        let mut steps = if self.steps.is_empty() {
            migration_files(&migrations_dir)?
        } else {
            let available = if migrations_dir.is_dir() {
                migration_files(&migrations_dir)?
            } else {
                Vec::new()
            };
            self.steps
                .iter()
                .map(|name| resolve_step(name, &available))
                .collect::<anyhow::Result<Vec<_>>>()?
        };

        // Rollbacks undo migrations newest first
        if self.direction == Direction::Down && self.steps.is_empty() {
            steps.reverse();
        }
        Ok(steps)
    }
}

fn resolve_step(name: &str, available: &[PathBuf]) -> anyhow::Result<PathBuf> {
    let path = Path::new(name);
    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    let wanted = step_identifier(Some(name));
    available
        .iter()
        .find(|p| step_identifier(p.file_name().and_then(|n| n.to_str())) == wanted)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Migration file not found: {name}"))
}

fn print_header(config: &HooksConfig, connection: &str, direction: Direction, steps: usize) {
    println!("{}", output::header("Migration Hooks Run"));
    println!("{}", output::key_value("Direction", direction.as_str()));
    println!("{}", output::key_value("Connection", connection));
    println!("{}", output::key_value("Steps", &steps.to_string()));
    if !config.enabled {
        println!(
            "{}",
            output::key_value("Hook files", &style("disabled").yellow().to_string())
        );
    }
    println!();
}

fn print_step(started: &DispatchReport, ended: &DispatchReport) {
    let name = started.step.as_deref().unwrap_or("?");
    let ops: Vec<String> = [started, ended]
        .iter()
        .filter_map(|r| r.handler)
        .map(|h| {
            let label = format!("{} ({}ms)", h.op, h.duration.as_millis());
            if h.succeeded {
                style(label).green().to_string()
            } else {
                style(label).red().to_string()
            }
        })
        .collect();

    let detail = if ops.is_empty() {
        style("no hook").dim().to_string()
    } else {
        ops.join(", ")
    };
    println!("  {} {}", output::migration_style().apply_to(name), detail);

    for report in [started, ended] {
        for failure in &report.failures {
            println!("    {} {}", style("✗").red(), failure);
        }
        for warning in &report.warnings {
            println!("    {} {}", style("!").yellow(), warning);
        }
    }
}

fn report_json(report: &DispatchReport) -> serde_json::Value {
    serde_json::json!({
        "event": report.event.as_str(),
        "step": report.step,
        "handler": report.handler.map(|h| serde_json::json!({
            "method": h.op.method_name(),
            "duration_ms": h.duration.as_millis() as u64,
            "succeeded": h.succeeded,
        })),
        "callbacks_run": report.callbacks_run,
        "failures": report.failures.iter().map(|f| serde_json::json!({
            "kind": f.kind(),
            "message": f.to_string(),
            "timed_out": f.is_timeout(),
        })).collect::<Vec<_>>(),
        "warnings": report.warnings,
    })
}
