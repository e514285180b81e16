use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while inspecting or comparing repositories
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    /// A ref, commit, or path did not resolve to anything (empty process
    /// output where content was expected).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The git invocation exited with a non-zero status. Folded into typed
    /// results only by the merge-attempt and conflict-listing flows; fatal
    /// everywhere else.
    #[error("Command 'git {command}' failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// Process output did not match the expected field/record structure.
    /// Always fatal: it indicates a tooling or encoding mismatch, never a
    /// condition to paper over.
    #[error("Failed to parse git output: {0}")]
    ParseError(String),

    #[error("Command 'git {command}' timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    /// Creation or registration of an ephemeral workspace failed. Cleanup
    /// failures are logged instead and never surface through this variant.
    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Crate-level result alias
pub type Result<T> = GitResult<T>;
