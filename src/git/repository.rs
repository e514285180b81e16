use crate::config::EngineConfig;
use crate::error::{GitError, Result};
use crate::git::executor::GitExecutor;
use std::path::{Path, PathBuf};

/// A validated handle on one on-disk repository.
///
/// The hosting layer stores repositories at exact known paths, so there is no
/// upward directory walk here; the path either is a repository (worktree or
/// bare) or the open fails.
#[derive(Debug, Clone)]
pub struct Repository {
    path: PathBuf,
    executor: GitExecutor,
}

impl Repository {
    /// Open a repository at a known path
    pub fn open<P: AsRef<Path>>(config: &EngineConfig, path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !Self::looks_like_repository(&path) {
            return Err(GitError::NotARepository(path));
        }

        let executor = GitExecutor::from_config(config, &path);
        Ok(Self { path, executor })
    }

    /// Worktree clones carry a `.git`; bare repositories expose HEAD and the
    /// object store directly.
    fn looks_like_repository(path: &Path) -> bool {
        path.join(".git").exists()
            || (path.join("HEAD").is_file() && path.join("objects").is_dir())
    }

    /// Get the repository path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the git executor for this repository
    pub fn executor(&self) -> &GitExecutor {
        &self.executor
    }

    /// A repository with no branches yet has zero commits on any ref
    pub async fn is_empty(&self) -> Result<bool> {
        let output = self.executor.run(&["branch", "--list"]).await?;
        Ok(output.stdout.trim().is_empty())
    }
}
