use crate::audit::AuditLogger;
use crate::config::EngineConfig;
use crate::error::{GitError, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Result of executing a git command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
}

/// Executes git commands inside one working directory.
///
/// Arguments are passed as an argv slice and never go through a shell, so
/// refs, paths, and commit messages may contain any characters.
#[derive(Debug, Clone)]
pub struct GitExecutor {
    binary: String,
    working_dir: PathBuf,
    timeout: Duration,
    audit: Option<Arc<AuditLogger>>,
}

impl GitExecutor {
    /// Create an executor for the given working directory
    pub fn new<P: AsRef<Path>>(working_dir: P) -> Self {
        Self::from_config(&EngineConfig::default(), working_dir)
    }

    /// Create an executor configured from an [`EngineConfig`]
    pub fn from_config<P: AsRef<Path>>(config: &EngineConfig, working_dir: P) -> Self {
        Self {
            binary: config.git.binary.clone(),
            working_dir: working_dir.as_ref().to_path_buf(),
            timeout: Duration::from_secs(config.git.timeout_seconds),
            audit: AuditLogger::from_config(&config.audit),
        }
    }

    /// Execute a git command and return its output.
    ///
    /// The argv slice should not include the "git" prefix.
    /// Example: `executor.run(&["rev-list", "--count", "main"])`
    pub async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        if args.is_empty() {
            return Err(GitError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty git argument list",
            )));
        }

        let command = args.join(" ");

        let child = Command::new(&self.binary)
            .args(args)
            .current_dir(&self.working_dir)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(GitError::Timeout {
                    command,
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        self.process_output(output, &command)
    }

    /// Process command output into a CommandOutput struct
    fn process_output(&self, output: Output, command: &str) -> Result<CommandOutput> {
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);
        let success = output.status.success();

        if let Some(audit) = &self.audit {
            // Audit failures never affect the command's result
            let _ = audit.log_command(command, &self.working_dir, exit_code);
        }

        if !success {
            return Err(GitError::CommandFailed {
                command: command.to_string(),
                exit_code,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
            success,
        })
    }

    /// Get the directory commands run in
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}
