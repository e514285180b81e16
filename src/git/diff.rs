use crate::config::EngineConfig;
use crate::error::{GitError, Result};
use crate::git::executor::GitExecutor;
use crate::git::parser::{self, FileDiff};
use crate::git::repository::Repository;
use crate::git::workspace::Workspace;

/// Hash of git's canonical empty tree, used as the diff base for root commits
pub const EMPTY_TREE_HASH: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// File-level and hunk-level differences within one repository or across two.
///
/// Branch comparisons are always cumulative from the common ancestor of base
/// and target, never base against target directly: a feature branch's diff
/// view stays stable while the base branch moves forward.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    config: EngineConfig,
}

impl DiffEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Merge-base of two refs
    pub async fn common_ancestor(
        &self,
        repo: &Repository,
        ref1: &str,
        ref2: &str,
    ) -> Result<String> {
        ancestor_for(repo.executor(), ref1, ref2).await
    }

    /// Paths changed between the common ancestor of base/target and target
    pub async fn changed_files(
        &self,
        repo: &Repository,
        base_ref: &str,
        target_ref: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<String>> {
        let paths = changed_paths_for(repo.executor(), base_ref, target_ref).await?;
        Ok(paginate(paths, offset, limit))
    }

    /// Hunk-level diff of one file between the common ancestor of base/target
    /// and target
    pub async fn file_diff(
        &self,
        repo: &Repository,
        path: &str,
        base_ref: &str,
        target_ref: &str,
    ) -> Result<FileDiff> {
        file_diff_for(repo.executor(), path, base_ref, target_ref).await
    }

    /// Paths a single commit changed, diffed against its first parent or the
    /// empty tree for a root commit
    pub async fn changed_files_for_commit(
        &self,
        repo: &Repository,
        commit_hash: &str,
    ) -> Result<Vec<String>> {
        let parent = parent_or_empty_tree(repo.executor(), commit_hash).await?;
        let output = repo
            .executor()
            .run(&["diff", "--name-only", &parent, commit_hash])
            .await?;
        Ok(parser::parse_path_lines(&output.stdout))
    }

    /// Hunk-level diff of one file in a single commit
    pub async fn file_diff_for_commit(
        &self,
        repo: &Repository,
        commit_hash: &str,
        path: &str,
    ) -> Result<FileDiff> {
        let parent = parent_or_empty_tree(repo.executor(), commit_hash).await?;
        let output = repo
            .executor()
            .run(&["diff", &parent, commit_hash, "--", path])
            .await?;
        parser::parse_file_diff(path, &output.stdout)
    }

    /// `changed_files` where base and target may live in different
    /// repositories; equal paths degrade to the single-repository call.
    pub async fn changed_files_between_repositories(
        &self,
        base: &Repository,
        base_ref: &str,
        target: &Repository,
        target_ref: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<String>> {
        if base.path() == target.path() {
            return self
                .changed_files(base, base_ref, target_ref, offset, limit)
                .await;
        }

        let (mut ws, remote) = self.fork_workspace(base, target).await?;
        let result = async {
            let base_hash = ws.resolve_ref(base_ref, None).await?;
            let target_hash = ws.resolve_ref(target_ref, Some(&remote)).await?;
            changed_paths_for(ws.executor(), &base_hash, &target_hash).await
        }
        .await;
        ws.destroy();
        Ok(paginate(result?, offset, limit))
    }

    /// `file_diff` where base and target may live in different repositories
    pub async fn file_diff_between_repositories(
        &self,
        path: &str,
        base: &Repository,
        base_ref: &str,
        target: &Repository,
        target_ref: &str,
    ) -> Result<FileDiff> {
        if base.path() == target.path() {
            return self.file_diff(base, path, base_ref, target_ref).await;
        }

        let (mut ws, remote) = self.fork_workspace(base, target).await?;
        let result = async {
            let base_hash = ws.resolve_ref(base_ref, None).await?;
            let target_hash = ws.resolve_ref(target_ref, Some(&remote)).await?;
            file_diff_for(ws.executor(), path, &base_hash, &target_hash).await
        }
        .await;
        ws.destroy();
        result
    }

    async fn fork_workspace(
        &self,
        base: &Repository,
        target: &Repository,
    ) -> Result<(Workspace, String)> {
        let mut ws = Workspace::clone_from(&self.config, base.path(), None).await?;
        let remote = ws.add_remote(target.path()).await?;
        Ok((ws, remote))
    }
}

fn paginate(paths: Vec<String>, offset: usize, limit: usize) -> Vec<String> {
    paths.into_iter().skip(offset).take(limit).collect()
}

async fn ancestor_for(exec: &GitExecutor, ref1: &str, ref2: &str) -> Result<String> {
    let output = exec.run(&["merge-base", ref1, ref2]).await?;
    let ancestor = output.stdout.trim();

    if ancestor.is_empty() {
        return Err(GitError::NotFound(format!(
            "no common ancestor of '{ref1}' and '{ref2}'"
        )));
    }

    Ok(ancestor.to_string())
}

async fn changed_paths_for(
    exec: &GitExecutor,
    base_ref: &str,
    target_ref: &str,
) -> Result<Vec<String>> {
    let ancestor = ancestor_for(exec, base_ref, target_ref).await?;
    let output = exec
        .run(&["diff", "--name-only", &ancestor, target_ref])
        .await?;
    Ok(parser::parse_path_lines(&output.stdout))
}

async fn file_diff_for(
    exec: &GitExecutor,
    path: &str,
    base_ref: &str,
    target_ref: &str,
) -> Result<FileDiff> {
    let ancestor = ancestor_for(exec, base_ref, target_ref).await?;
    let output = exec
        .run(&["diff", &ancestor, target_ref, "--", path])
        .await?;
    parser::parse_file_diff(path, &output.stdout)
}

/// First parent of a commit, or the empty tree when the commit is the
/// repository's root
async fn parent_or_empty_tree(exec: &GitExecutor, commit_hash: &str) -> Result<String> {
    let output = exec
        .run(&["rev-list", "--parents", "--max-count=1", commit_hash])
        .await?;
    let tokens: Vec<&str> = output.stdout.split_whitespace().collect();

    match tokens.len() {
        0 => Err(GitError::NotFound(format!(
            "commit '{commit_hash}' not found"
        ))),
        1 => Ok(EMPTY_TREE_HASH.to_string()),
        _ => Ok(tokens[1].to_string()),
    }
}
