use crate::config::EngineConfig;
use crate::error::{GitError, Result};
use crate::git::repository::Repository;
use crate::git::workspace::Workspace;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// One unmerged file surfaced after a failed automatic merge.
///
/// Binary conflicts never carry textual conflict markers; their content is
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub path: String,
    pub is_binary: bool,
    pub content: String,
}

/// Caller-supplied resolved content for one conflicted path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictResolution {
    pub path: String,
    pub content: String,
}

/// Merge feasibility, execution, and the conflict lifecycle.
///
/// Every operation stages its work in a [`Workspace`] cloned from the target
/// repository, so neither source nor target is ever mutated except by an
/// explicit push.
#[derive(Debug, Clone)]
pub struct MergeEngine {
    config: EngineConfig,
}

impl MergeEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Whether `source_branch` merges cleanly into `target_branch`.
    ///
    /// A failed merge attempt answers the question and folds to `false`;
    /// anything else (bad refs, clone failure) propagates.
    pub async fn is_mergeable(
        &self,
        source: &Repository,
        source_branch: &str,
        target: &Repository,
        target_branch: &str,
    ) -> Result<bool> {
        let (mut ws, merge_ref) = self
            .stage(source, source_branch, target, target_branch)
            .await?;

        let attempt = ws
            .executor()
            .run(&["merge", "--no-commit", "--no-ff", &merge_ref])
            .await;
        ws.destroy();

        match attempt {
            Ok(_) => Ok(true),
            Err(GitError::CommandFailed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Merge `source_branch` into `target_branch` with the given message and
    /// push the result back to the target repository.
    ///
    /// Any failure here is authoritative and propagates; callers either
    /// checked `is_mergeable` first or accept the error.
    pub async fn merge(
        &self,
        source: &Repository,
        source_branch: &str,
        target: &Repository,
        target_branch: &str,
        message: &str,
    ) -> Result<()> {
        let (mut ws, merge_ref) = self
            .stage(source, source_branch, target, target_branch)
            .await?;

        let result = async {
            ws.executor()
                .run(&["merge", "--no-ff", "-m", message, &merge_ref])
                .await?;
            ws.executor().run(&["push", "origin", target_branch]).await?;
            Ok(())
        }
        .await;
        ws.destroy();
        result
    }

    /// Stage the merge, let it fail, and report every unmerged file.
    ///
    /// The merge attempt's own failure is deliberately ignored here: a
    /// conflicted merge is the expected outcome, not an error. `merge`
    /// propagates the identical failure class; the asymmetry is intentional.
    pub async fn list_conflicts(
        &self,
        source: &Repository,
        source_branch: &str,
        target: &Repository,
        target_branch: &str,
    ) -> Result<Vec<Conflict>> {
        let (mut ws, merge_ref) = self
            .stage(source, source_branch, target, target_branch)
            .await?;

        let result = async {
            match ws
                .executor()
                .run(&["merge", "--no-commit", "--no-ff", &merge_ref])
                .await
            {
                Ok(_) | Err(GitError::CommandFailed { .. }) => {}
                Err(e) => return Err(e),
            }

            let output = ws
                .executor()
                .run(&["diff", "--name-only", "--diff-filter=U"])
                .await?;

            let mut conflicts = Vec::new();
            for path in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
                let bytes = tokio::fs::read(ws.root().join(path)).await?;
                if bytes.contains(&0) {
                    conflicts.push(Conflict {
                        path: path.to_string(),
                        is_binary: true,
                        content: String::new(),
                    });
                } else {
                    conflicts.push(Conflict {
                        path: path.to_string(),
                        is_binary: false,
                        content: String::from_utf8_lossy(&bytes).into_owned(),
                    });
                }
            }

            Ok(conflicts)
        }
        .await;
        ws.destroy();
        result
    }

    /// Overwrite conflicted paths with resolved content on a fresh clone of
    /// `branch`, commit with a message referencing the originating pull
    /// request, and push.
    ///
    /// Resolution paths are repository-relative; absolute or `..`-traversing
    /// paths are rejected before anything is written. Every step is fatal on
    /// failure: a partially resolved conflict must not be pushed.
    pub async fn resolve_conflicts(
        &self,
        repo: &Repository,
        branch: &str,
        resolutions: &[ConflictResolution],
        pull_request_ref: &str,
    ) -> Result<()> {
        let mut ws = Workspace::clone_from(&self.config, repo.path(), Some(branch)).await?;

        let result = async {
            for resolution in resolutions {
                let dest = resolution_destination(ws.root(), &resolution.path)?;
                if let Some(parent) = dest.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&dest, resolution.content.as_bytes()).await?;
                ws.executor().run(&["add", "--", &resolution.path]).await?;
            }

            let message = format!("Resolve conflicts for pull request {pull_request_ref}");
            ws.executor().run(&["commit", "-m", &message]).await?;
            ws.executor().run(&["push", "origin", branch]).await?;
            Ok(())
        }
        .await;
        ws.destroy();
        result
    }

    /// Clone the target repository at its target branch and make the source
    /// branch reachable, adding the source as a remote when it is a different
    /// repository. Returns the workspace and the hash to merge.
    async fn stage(
        &self,
        source: &Repository,
        source_branch: &str,
        target: &Repository,
        target_branch: &str,
    ) -> Result<(Workspace, String)> {
        let mut ws =
            Workspace::clone_from(&self.config, target.path(), Some(target_branch)).await?;

        let merge_ref = if source.path() == target.path() {
            ws.resolve_ref(source_branch, None).await?
        } else {
            let remote = ws.add_remote(source.path()).await?;
            ws.resolve_ref(source_branch, Some(&remote)).await?
        };

        Ok((ws, merge_ref))
    }
}

/// Join a repository-relative resolution path onto the workspace root,
/// rejecting anything that would land outside it
fn resolution_destination(root: &Path, path: &str) -> Result<PathBuf> {
    let relative = Path::new(path);
    let escapes = relative.is_absolute()
        || relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));

    if escapes {
        return Err(GitError::Workspace(format!(
            "resolution path '{path}' escapes the workspace"
        )));
    }

    Ok(root.join(relative))
}
