mod helpers;

use githarbor::{ConflictResolution, EngineConfig, MergeEngine, Repository};
use helpers::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Work repo with `main` and a `feature` branch touching a disjoint file,
/// served as a bare repository the way the hosting layer stores them.
fn serve_with_disjoint_branches() -> (TempDir, TempDir, PathBuf) {
    let (work_temp, work_path) = create_test_repo();
    create_commit(&work_path, "a.txt", "one\ntwo\n", "base");
    create_branch(&work_path, "feature");
    create_commit(&work_path, "b.txt", "feature work\n", "disjoint change");
    checkout(&work_path, "main");
    create_commit(&work_path, "c.txt", "main work\n", "main moves on");

    let (bare_temp, bare_path) = clone_bare(&work_path);
    (work_temp, bare_temp, bare_path)
}

/// Bare repo whose `main` and `feature` both rewrite the same line of a.txt
fn serve_with_conflicting_branches() -> (TempDir, TempDir, PathBuf) {
    let (work_temp, work_path) = create_test_repo();
    create_commit(&work_path, "a.txt", "one\ntwo\n", "base");
    create_branch(&work_path, "feature");
    create_commit(&work_path, "a.txt", "one\nfeature version\n", "feature edit");
    checkout(&work_path, "main");
    create_commit(&work_path, "a.txt", "one\nmain version\n", "main edit");

    let (bare_temp, bare_path) = clone_bare(&work_path);
    (work_temp, bare_temp, bare_path)
}

fn open(config: &EngineConfig, path: &Path) -> Repository {
    Repository::open(config, path).expect("Failed to open repository")
}

#[tokio::test]
async fn disjoint_branches_are_mergeable_with_no_conflicts() {
    let (_work, _bare, bare_path) = serve_with_disjoint_branches();
    let (temp_root, config) = config_with_temp_root();
    let engine = MergeEngine::new(config.clone());
    let repo = open(&config, &bare_path);

    assert!(
        engine
            .is_mergeable(&repo, "feature", &repo, "main")
            .await
            .unwrap()
    );

    let conflicts = engine
        .list_conflicts(&repo, "feature", &repo, "main")
        .await
        .unwrap();
    assert!(conflicts.is_empty());

    assert_no_workspace_left(&temp_root);
}

#[tokio::test]
async fn same_line_edits_conflict_exactly_once() {
    let (_work, _bare, bare_path) = serve_with_conflicting_branches();
    let (temp_root, config) = config_with_temp_root();
    let engine = MergeEngine::new(config.clone());
    let repo = open(&config, &bare_path);

    assert!(
        !engine
            .is_mergeable(&repo, "feature", &repo, "main")
            .await
            .unwrap()
    );

    let conflicts = engine
        .list_conflicts(&repo, "feature", &repo, "main")
        .await
        .unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].path, "a.txt");
    assert!(!conflicts[0].is_binary);
    assert!(conflicts[0].content.contains("<<<<<<<"));
    assert!(conflicts[0].content.contains("feature version"));
    assert!(conflicts[0].content.contains("main version"));

    assert_no_workspace_left(&temp_root);
}

#[tokio::test]
async fn merge_commits_and_pushes_to_target() {
    let (_work, _bare, bare_path) = serve_with_disjoint_branches();
    let (temp_root, config) = config_with_temp_root();
    let engine = MergeEngine::new(config.clone());
    let repo = open(&config, &bare_path);

    engine
        .merge(&repo, "feature", &repo, "main", "Merge feature into main")
        .await
        .unwrap();

    let log = git(&bare_path, &["log", "main", "--format=%s", "--max-count=1"]);
    assert_eq!(log.trim(), "Merge feature into main");

    // The merged file is now reachable from main
    let shown = git(&bare_path, &["show", "main:b.txt"]);
    assert_eq!(shown, "feature work\n");

    assert_no_workspace_left(&temp_root);
}

#[tokio::test]
async fn merge_of_conflicting_branches_fails_and_cleans_up() {
    let (_work, _bare, bare_path) = serve_with_conflicting_branches();
    let (temp_root, config) = config_with_temp_root();
    let engine = MergeEngine::new(config.clone());
    let repo = open(&config, &bare_path);

    let before = git(&bare_path, &["rev-parse", "main"]);
    let result = engine
        .merge(&repo, "feature", &repo, "main", "should not land")
        .await;
    assert!(result.is_err());

    // Target repository untouched
    let after = git(&bare_path, &["rev-parse", "main"]);
    assert_eq!(before, after);

    assert_no_workspace_left(&temp_root);
}

#[tokio::test]
async fn cross_repository_merge_from_fork() {
    let (_work, work_path) = create_test_repo();
    create_commit(&work_path, "a.txt", "shared\n", "base");
    let (_bare_temp, bare_path) = clone_bare(&work_path);

    let (_fork_temp, fork_path) = clone_fork(&work_path);
    create_branch(&fork_path, "fix");
    create_commit(&fork_path, "fix.txt", "patch\n", "fork fix");

    let (temp_root, config) = config_with_temp_root();
    let engine = MergeEngine::new(config.clone());
    let target = open(&config, &bare_path);
    let source = open(&config, &fork_path);

    assert!(
        engine
            .is_mergeable(&source, "fix", &target, "main")
            .await
            .unwrap()
    );

    engine
        .merge(&source, "fix", &target, "main", "Merge fork fix")
        .await
        .unwrap();

    let shown = git(&bare_path, &["show", "main:fix.txt"]);
    assert_eq!(shown, "patch\n");

    assert_no_workspace_left(&temp_root);
}

#[tokio::test]
async fn binary_conflicts_carry_no_content() {
    let (_work, work_path) = create_test_repo();
    create_binary_commit(&work_path, "blob.bin", &[0u8, 1, 2, 3], "base blob");
    create_branch(&work_path, "feature");
    create_binary_commit(&work_path, "blob.bin", &[0u8, 9, 9, 9], "feature blob");
    checkout(&work_path, "main");
    create_binary_commit(&work_path, "blob.bin", &[0u8, 7, 7, 7], "main blob");

    let (_bare_temp, bare_path) = clone_bare(&work_path);
    let (temp_root, config) = config_with_temp_root();
    let engine = MergeEngine::new(config.clone());
    let repo = open(&config, &bare_path);

    let conflicts = engine
        .list_conflicts(&repo, "feature", &repo, "main")
        .await
        .unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].path, "blob.bin");
    assert!(conflicts[0].is_binary);
    assert!(conflicts[0].content.is_empty());

    assert_no_workspace_left(&temp_root);
}

#[tokio::test]
async fn resolve_conflicts_commits_resolution_and_pushes() {
    let (_work, _bare, bare_path) = serve_with_conflicting_branches();
    let (temp_root, config) = config_with_temp_root();
    let engine = MergeEngine::new(config.clone());
    let repo = open(&config, &bare_path);

    let resolutions = [ConflictResolution {
        path: "a.txt".to_string(),
        content: "one\nresolved version\n".to_string(),
    }];

    engine
        .resolve_conflicts(&repo, "feature", &resolutions, "#42")
        .await
        .unwrap();

    let shown = git(&bare_path, &["show", "feature:a.txt"]);
    assert_eq!(shown, "one\nresolved version\n");

    let log = git(&bare_path, &["log", "feature", "--format=%s", "--max-count=1"]);
    assert!(log.contains("#42"));

    assert_no_workspace_left(&temp_root);
}

#[tokio::test]
async fn resolve_conflicts_with_no_change_fails_fatally() {
    let (_work, _bare, bare_path) = serve_with_disjoint_branches();
    let (temp_root, config) = config_with_temp_root();
    let engine = MergeEngine::new(config.clone());
    let repo = open(&config, &bare_path);

    // Identical content stages nothing, so the commit must fail loudly
    let resolutions = [ConflictResolution {
        path: "b.txt".to_string(),
        content: "feature work\n".to_string(),
    }];

    let result = engine
        .resolve_conflicts(&repo, "feature", &resolutions, "#7")
        .await;
    assert!(result.is_err());

    assert_no_workspace_left(&temp_root);
}

#[tokio::test]
async fn resolve_conflicts_rejects_paths_escaping_the_workspace() {
    let (_work, _bare, bare_path) = serve_with_conflicting_branches();
    let (temp_root, config) = config_with_temp_root();
    let engine = MergeEngine::new(config.clone());
    let repo = open(&config, &bare_path);

    for escaping in ["../escaped.txt", "/tmp/escaped.txt", "a/../../escaped.txt"] {
        let resolutions = [ConflictResolution {
            path: escaping.to_string(),
            content: "should never land\n".to_string(),
        }];

        let result = engine
            .resolve_conflicts(&repo, "feature", &resolutions, "#13")
            .await;
        assert!(result.is_err(), "path {escaping:?} was accepted");
    }

    // Nothing was written next to the workspaces, and nothing survives them
    assert_no_workspace_left(&temp_root);
}
