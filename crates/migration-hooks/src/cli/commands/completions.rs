//! Completions command - shell completion scripts for the binary

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use tracing::info;

use crate::cli::{output, Cli};

const BIN_NAME: &str = "migration-hooks";

/// Generate shell completions
#[derive(Debug, Args)]
pub struct CompletionsCommand {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl CompletionsCommand {
    /// Execute the completions command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(shell = %self.shell, "executing completions command");
        let script = render(self.shell);

        match self.output {
            Some(ref path) => {
                std::fs::write(path, &script)?;
                if !cli.quiet {
                    output::success(&format!(
                        "{} completions written to {}",
                        self.shell,
                        output::path_style().apply_to(path.display())
                    ));
                }
            }
            None => std::io::stdout().write_all(&script)?,
        }

        Ok(())
    }
}

/// Completion script for `shell`
fn render(shell: Shell) -> Vec<u8> {
    let mut buf = Vec::new();
    generate(shell, &mut Cli::command(), BIN_NAME, &mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_script_covers_subcommands() {
        let script = String::from_utf8(render(Shell::Bash)).unwrap();
        for subcommand in ["init", "make", "list", "run"] {
            assert!(script.contains(subcommand), "missing {subcommand}");
        }
    }

    #[test]
    fn test_shell_names_parse() {
        let cli = Cli::try_parse_from(["migration-hooks", "completions", "zsh"]).unwrap();
        match cli.command {
            crate::cli::Commands::Completions(cmd) => {
                assert_eq!(cmd.shell, Shell::Zsh);
                assert!(cmd.output.is_none());
                assert!(!render(cmd.shell).is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
