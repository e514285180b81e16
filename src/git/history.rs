use crate::config::EngineConfig;
use crate::error::{GitError, Result};
use crate::git::executor::GitExecutor;
use crate::git::parser::{self, Branch, Commit, LOG_FORMAT, Tag, TreeEntry};
use crate::git::repository::Repository;
use crate::git::workspace::Workspace;
use futures::future;

/// Read-only history queries against one repository, plus workspace-backed
/// variants that compare refs across two unrelated repositories.
#[derive(Debug, Clone)]
pub struct HistoryService {
    config: EngineConfig,
}

impl HistoryService {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// List all branches with their head commits.
    ///
    /// Head commits are resolved concurrently; each sub-query only reads the
    /// already-stable on-disk repository.
    pub async fn list_branches(&self, repo: &Repository) -> Result<Vec<Branch>> {
        let output = repo.executor().run(&["branch", "--list"]).await?;
        let lines = parser::parse_branch_lines(&output.stdout)?;

        let heads = future::try_join_all(
            lines
                .iter()
                .map(|line| last_commit_for(repo.executor(), &line.name, None)),
        )
        .await?;

        Ok(lines
            .into_iter()
            .zip(heads)
            .map(|(line, head)| Branch {
                name: line.name,
                head,
                is_current: line.is_current,
            })
            .collect())
    }

    /// List all tags with the commits they point at
    pub async fn list_tags(&self, repo: &Repository) -> Result<Vec<Tag>> {
        let output = repo.executor().run(&["tag", "--list"]).await?;
        let names: Vec<String> = output
            .stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.trim().to_string())
            .collect();

        let commits = future::try_join_all(
            names
                .iter()
                .map(|name| last_commit_for(repo.executor(), name, None)),
        )
        .await?;

        Ok(names
            .into_iter()
            .zip(commits)
            .map(|(name, commit)| Tag { name, commit })
            .collect())
    }

    /// List one directory level of the tree at a ref. An empty path lists the
    /// repository root.
    pub async fn list_tree(
        &self,
        repo: &Repository,
        refname: &str,
        path: &str,
    ) -> Result<Vec<TreeEntry>> {
        let output = if path.is_empty() {
            repo.executor().run(&["ls-tree", refname]).await?
        } else {
            // Trailing slash makes ls-tree list the directory's contents
            // instead of the directory entry itself
            let dir = format!("{}/", path.trim_end_matches('/'));
            repo.executor()
                .run(&["ls-tree", refname, "--", &dir])
                .await?
        };

        parser::parse_tree_entries(&output.stdout)
    }

    /// Resolve a ref (branch, tag, or hash) to its commit
    pub async fn get_commit(&self, repo: &Repository, refname: &str) -> Result<Commit> {
        last_commit_for(repo.executor(), refname, None).await
    }

    /// Head commit of a ref
    pub async fn get_last_commit(&self, repo: &Repository, refname: &str) -> Result<Commit> {
        last_commit_for(repo.executor(), refname, None).await
    }

    /// Most recent commit touching `path` on a ref. An empty path is
    /// normalized to the repository root.
    pub async fn get_file_last_commit(
        &self,
        repo: &Repository,
        refname: &str,
        path: &str,
    ) -> Result<Commit> {
        let path = if path.is_empty() { "." } else { path };
        last_commit_for(repo.executor(), refname, Some(path)).await
    }

    /// Paginated log of a ref, newest first.
    ///
    /// Pagination runs inside git (`--skip`/`--max-count`) so process output
    /// stays bounded.
    pub async fn list_commits(
        &self,
        repo: &Repository,
        refname: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Commit>> {
        commits_for(repo.executor(), refname, offset, limit).await
    }

    /// Paginated log of commits reachable from `target_ref` but not from
    /// `base_ref`
    pub async fn list_commits_between(
        &self,
        repo: &Repository,
        base_ref: &str,
        target_ref: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Commit>> {
        let range = format!("{base_ref}..{target_ref}");
        commits_for(repo.executor(), &range, offset, limit).await
    }

    /// Number of commits reachable from a ref. A repository with no branches
    /// yet has no resolvable ref and counts as zero rather than erroring.
    pub async fn count_commits(&self, repo: &Repository, refname: &str) -> Result<u64> {
        self.count_or_zero_when_unborn(repo, refname.to_string()).await
    }

    /// Number of commits in `base_ref..target_ref`
    pub async fn count_commits_between(
        &self,
        repo: &Repository,
        base_ref: &str,
        target_ref: &str,
    ) -> Result<u64> {
        self.count_or_zero_when_unborn(repo, format!("{base_ref}..{target_ref}"))
            .await
    }

    async fn count_or_zero_when_unborn(&self, repo: &Repository, range: String) -> Result<u64> {
        match count_for(repo.executor(), &range).await {
            Ok(count) => Ok(count),
            Err(err @ GitError::CommandFailed { .. }) => {
                if repo.is_empty().await? {
                    Ok(0)
                } else {
                    Err(err)
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Head commit of a ref that lives in another repository, staged through
    /// a workspace cloned from `base`. Equal paths degrade to the plain
    /// single-repository query with no clone.
    pub async fn get_last_commit_across(
        &self,
        base: &Repository,
        target: &Repository,
        target_ref: &str,
    ) -> Result<Commit> {
        if base.path() == target.path() {
            return self.get_last_commit(base, target_ref).await;
        }

        let (mut ws, remote) = self.fork_workspace(base, target).await?;
        let result = async {
            let resolved = ws.resolve_ref(target_ref, Some(&remote)).await?;
            last_commit_for(ws.executor(), &resolved, None).await
        }
        .await;
        ws.destroy();
        result
    }

    /// `list_commits_between` where base and target may live in different
    /// repositories
    pub async fn list_commits_between_repositories(
        &self,
        base: &Repository,
        base_ref: &str,
        target: &Repository,
        target_ref: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Commit>> {
        if base.path() == target.path() {
            return self
                .list_commits_between(base, base_ref, target_ref, offset, limit)
                .await;
        }

        let (mut ws, remote) = self.fork_workspace(base, target).await?;
        let result = async {
            let range = cross_range(&ws, &remote, base_ref, target_ref).await?;
            commits_for(ws.executor(), &range, offset, limit).await
        }
        .await;
        ws.destroy();
        result
    }

    /// `count_commits_between` where base and target may live in different
    /// repositories
    pub async fn count_commits_between_repositories(
        &self,
        base: &Repository,
        base_ref: &str,
        target: &Repository,
        target_ref: &str,
    ) -> Result<u64> {
        if base.path() == target.path() {
            return self.count_commits_between(base, base_ref, target_ref).await;
        }

        let (mut ws, remote) = self.fork_workspace(base, target).await?;
        let result = async {
            let range = cross_range(&ws, &remote, base_ref, target_ref).await?;
            count_for(ws.executor(), &range).await
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

/// Resolve both sides inside the workspace and build a `base..target` range
async fn cross_range(
    ws: &Workspace,
    remote: &str,
    base_ref: &str,
    target_ref: &str,
) -> Result<String> {
    let base = ws.resolve_ref(base_ref, None).await?;
    let target = ws.resolve_ref(target_ref, Some(remote)).await?;
    Ok(format!("{base}..{target}"))
}

pub(crate) async fn last_commit_for(
    exec: &GitExecutor,
    refspec: &str,
    path: Option<&str>,
) -> Result<Commit> {
    let format = format!("--format={LOG_FORMAT}");
    let mut args = vec!["log", refspec, "--max-count=1", format.as_str()];
    if let Some(path) = path {
        args.push("--");
        args.push(path);
    }

    let output = exec.run(&args).await?;
    parser::parse_log(&output.stdout)?
        .into_iter()
        .next()
        .ok_or_else(|| GitError::NotFound(format!("no commit for ref '{refspec}'")))
}

pub(crate) async fn commits_for(
    exec: &GitExecutor,
    refspec: &str,
    skip: usize,
    limit: usize,
) -> Result<Vec<Commit>> {
    let format = format!("--format={LOG_FORMAT}");
    let skip_arg = format!("--skip={skip}");
    let limit_arg = format!("--max-count={limit}");

    let output = exec
        .run(&["log", refspec, &skip_arg, &limit_arg, &format])
        .await?;
    parser::parse_log(&output.stdout)
}

pub(crate) async fn count_for(exec: &GitExecutor, refspec: &str) -> Result<u64> {
    let output = exec.run(&["rev-list", "--count", refspec]).await?;
    output
        .stdout
        .trim()
        .parse()
        .map_err(|_| GitError::ParseError(format!("invalid rev-list count '{}'", output.stdout.trim())))
}
