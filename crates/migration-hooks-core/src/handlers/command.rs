//! Shell commands backing file-defined handler operations

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One operation as written in a handler file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSpec {
    /// Command to run through the platform shell
    pub command: String,

    /// Working directory (defaults to the current directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Extra environment variables
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,

    /// Description for logging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A command ready to run, with its context environment and deadline
#[derive(Debug, Clone)]
pub struct ShellCommand {
    spec: CommandSpec,
    context_env: HashMap<String, String>,
    base_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ShellCommand {
    /// Create a runnable command from its spec
    pub fn new(spec: CommandSpec) -> Self {
        Self {
            spec,
            context_env: HashMap::new(),
            base_dir: None,
            timeout: None,
        }
    }

    /// Set the variables describing the dispatch
    pub fn with_context_env(mut self, env: HashMap<String, String>) -> Self {
        self.context_env = env;
        self
    }

    /// Set the directory relative `cwd` values resolve against
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Kill the command once `timeout` elapses
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the command spec
    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Run the command to completion.
    ///
    /// Fails on spawn errors, non-zero exit and timeout.
    pub fn run(&self) -> anyhow::Result<()> {
        let shell = if cfg!(windows) { "cmd" } else { "sh" };
        let shell_arg = if cfg!(windows) { "/C" } else { "-c" };

        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg)
            .arg(&self.spec.command)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if let Some(ref cwd) = self.spec.cwd {
            let dir = match self.base_dir {
                Some(ref base) if cwd.is_relative() => base.join(cwd),
                _ => cwd.clone(),
            };
            cmd.current_dir(dir);
        }

        for (k, v) in &self.context_env {
            cmd.env(k, v);
        }
        for (k, v) in &self.spec.env {
            cmd.env(k, v);
        }

        // Own process group, so a timeout takes the shell's children down too
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        debug!(command = %self.spec.command, "running hook command");
        let mut child = cmd
            .spawn()
            .map_err(|e| anyhow::anyhow!("failed to spawn `{}`: {e}", self.spec.command))?;

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                if status.success() {
                    return Ok(());
                }
                let code = status.code().unwrap_or(-1);
                anyhow::bail!("`{}` exited with code {code}", self.spec.command);
            }

            if let Some(timeout) = self.timeout {
                if start.elapsed() >= timeout {
                    #[cfg(unix)]
                    {
                        // SAFETY: kill() is async-signal-safe. Negative PID targets
                        // the process group created by process_group(0).
                        unsafe {
                            libc::kill(-(child.id() as i32), libc::SIGKILL);
                        }
                    }
                    #[cfg(not(unix))]
                    {
                        let _ = child.kill();
                    }
                    let _ = child.wait();
                    anyhow::bail!(
                        "`{}` timed out after {}s",
                        self.spec.command,
                        timeout.as_secs()
                    );
                }
            }

            std::thread::sleep(Duration::from_millis(20));
        }
    }
}
