use crate::audit::AuditLogger;
use crate::config::EngineConfig;
use crate::error::{GitError, Result};
use crate::git::executor::GitExecutor;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;

/// Distinguishes remote names generated within the same millisecond
static REMOTE_SEQ: AtomicU64 = AtomicU64::new(0);

/// An ephemeral on-disk clone used to stage cross-repository queries and
/// merges without mutating the source repository.
///
/// The backing directory is uniquely named, exclusively owned by the
/// operation that created the workspace, and removed on every exit path:
/// dropping the handle cleans up even when the operation bailed out early.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    root: PathBuf,
    executor: GitExecutor,
    remotes: Vec<String>,
    audit: Option<Arc<AuditLogger>>,
}

impl Workspace {
    /// Clone `source` into a fresh temp directory, optionally checked out at
    /// one branch.
    ///
    /// A failed clone removes the half-created directory before the error
    /// propagates.
    pub async fn clone_from(
        config: &EngineConfig,
        source: &Path,
        branch: Option<&str>,
    ) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("githarbor-");

        let dir = match &config.workspace.temp_root {
            Some(root) => {
                std::fs::create_dir_all(root)
                    .map_err(|e| GitError::Workspace(format!("temp root unusable: {e}")))?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| GitError::Workspace(format!("failed to allocate temp directory: {e}")))?;

        let root = dir.path().to_path_buf();
        let executor = GitExecutor::from_config(config, &root);

        let source_str = source.to_string_lossy().into_owned();
        let mut args: Vec<&str> = vec!["clone"];
        if let Some(branch) = branch {
            args.push("--branch");
            args.push(branch);
        }
        args.push(&source_str);
        args.push(".");

        // On failure `dir` drops here and takes the directory with it
        executor.run(&args).await?;

        // Merge and resolution commits need an identity inside the clone
        executor
            .run(&["config", "user.name", &config.git.committer_name])
            .await?;
        executor
            .run(&["config", "user.email", &config.git.committer_email])
            .await?;

        Ok(Self {
            dir: Some(dir),
            root,
            executor,
            remotes: Vec::new(),
            audit: AuditLogger::from_config(&config.audit),
        })
    }

    /// Register another repository as a remote and fetch it, so its refs are
    /// reachable as `<name>/<branch>`. Returns the generated remote name.
    pub async fn add_remote(&mut self, repository: &Path) -> Result<String> {
        let name = format!(
            "fork-{}-{}",
            Utc::now().timestamp_millis(),
            REMOTE_SEQ.fetch_add(1, Ordering::Relaxed)
        );

        let repo_str = repository.to_string_lossy().into_owned();
        self.executor
            .run(&["remote", "add", &name, &repo_str])
            .await?;
        self.executor.run(&["fetch", &name]).await?;

        self.remotes.push(name.clone());
        Ok(name)
    }

    /// Resolve `name` to a commit hash inside the workspace.
    ///
    /// Tries the remote-qualified form first when a remote is given, then the
    /// raw name (hashes, tags), then `origin/<name>` for branches of the
    /// cloned repository that were not checked out locally.
    pub async fn resolve_ref(&self, name: &str, remote: Option<&str>) -> Result<String> {
        let mut candidates = Vec::new();
        if let Some(remote) = remote {
            candidates.push(format!("{remote}/{name}"));
        }
        candidates.push(name.to_string());
        candidates.push(format!("origin/{name}"));

        for candidate in &candidates {
            let spec = format!("{candidate}^{{commit}}");
            match self
                .executor
                .run(&["rev-parse", "--verify", "--quiet", &spec])
                .await
            {
                Ok(output) => {
                    let hash = output.stdout.trim();
                    if !hash.is_empty() {
                        return Ok(hash.to_string());
                    }
                }
                Err(GitError::CommandFailed { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(GitError::NotFound(format!(
            "ref '{name}' does not resolve in workspace"
        )))
    }

    /// Remove the backing directory. Idempotent; called automatically on
    /// drop. Removal failures are logged and never propagate, so they cannot
    /// mask the owning operation's result.
    pub fn destroy(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                match &self.audit {
                    Some(audit) => {
                        let _ = audit.log_cleanup_failure(&self.root, &e.to_string());
                    }
                    None => {
                        eprintln!(
                            "failed to remove workspace {}: {}",
                            self.root.display(),
                            e
                        );
                    }
                }
            }
        }
    }

    /// Root directory of the clone
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Executor running commands inside the clone
    pub fn executor(&self) -> &GitExecutor {
        &self.executor
    }

    /// Remote names added to this workspace, in order
    pub fn remotes(&self) -> &[String] {
        &self.remotes
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.destroy();
    }
}
