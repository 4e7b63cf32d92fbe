//! CLI commands

mod completions;
mod init;
mod list;
mod make;
mod run;

pub use completions::CompletionsCommand;
pub use init::InitCommand;
pub use list::ListCommand;
pub use make::MakeCommand;
pub use run::RunCommand;
