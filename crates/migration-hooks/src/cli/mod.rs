//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use migration_hooks_core::config::{
    apply_env_overrides, config_base_dir, load_config_or_default,
};
use migration_hooks_core::HooksConfig;

use commands::{CompletionsCommand, InitCommand, ListCommand, MakeCommand, RunCommand};

/// migration-hooks - Lifecycle hooks for schema migrations
#[derive(Debug, Parser)]
#[command(name = "migration-hooks")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a migration-hooks configuration file
    Init(InitCommand),

    /// Create a hook file for a migration
    Make(MakeCommand),

    /// List migrations and their hook files
    List(ListCommand),

    /// Dispatch lifecycle hooks for a migration run
    Run(RunCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Init(ref cmd) => cmd.execute(&self),
            Commands::Make(ref cmd) => cmd.execute(&self),
            Commands::List(ref cmd) => cmd.execute(&self),
            Commands::Run(ref cmd) => cmd.execute(&self),
            Commands::Completions(ref cmd) => cmd.execute(&self),
        }
    }
}

/// Configuration resolved for the current directory
pub struct Workspace {
    /// Effective configuration, environment overrides applied
    pub config: HooksConfig,
    /// Config file in use, if any
    pub config_path: Option<PathBuf>,
    /// Directory relative configuration paths resolve against
    pub base_dir: PathBuf,
}

impl Workspace {
    /// Load the configuration for the current directory
    pub fn load() -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        let (mut config, config_path) = load_config_or_default(&cwd)?;
        apply_env_overrides(&mut config)?;
        let base_dir = config_base_dir(config_path.as_deref(), &cwd);

        Ok(Self {
            config,
            config_path,
            base_dir,
        })
    }

    /// Handler directory
    pub fn hooks_dir(&self) -> PathBuf {
        self.config.hooks_dir(&self.base_dir)
    }

    /// Migrations directory
    pub fn migrations_dir(&self) -> PathBuf {
        self.config.migrations_dir(&self.base_dir)
    }
}
