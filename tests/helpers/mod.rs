#![allow(dead_code)]

use githarbor::EngineConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Run git in a repository, asserting success
pub fn git(repo: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Helper to create a test git repository on branch `main`
pub fn create_test_repo() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let repo_path = temp_dir.path().to_path_buf();

    git(&repo_path, &["init", "-b", "main"]);
    git(&repo_path, &["config", "user.name", "Test User"]);
    git(&repo_path, &["config", "user.email", "test@example.com"]);

    (temp_dir, repo_path)
}

/// Helper to create a commit touching one file
pub fn create_commit(repo_path: &Path, file: &str, content: &str, message: &str) {
    let file_path = repo_path.join(file);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(&file_path, content).expect("Failed to write file");

    git(repo_path, &["add", file]);
    git(repo_path, &["commit", "-m", message]);
}

/// Helper to create a commit with binary content
pub fn create_binary_commit(repo_path: &Path, file: &str, content: &[u8], message: &str) {
    fs::write(repo_path.join(file), content).expect("Failed to write file");

    git(repo_path, &["add", file]);
    git(repo_path, &["commit", "-m", message]);
}

/// Create a branch at the current head and switch to it
pub fn create_branch(repo_path: &Path, name: &str) {
    git(repo_path, &["switch", "-c", name]);
}

/// Switch to an existing branch
pub fn checkout(repo_path: &Path, name: &str) {
    git(repo_path, &["switch", name]);
}

/// Resolve a ref to its full hash
pub fn rev_parse(repo_path: &Path, refname: &str) -> String {
    git(repo_path, &["rev-parse", refname]).trim().to_string()
}

/// Bare clone of a repository, as the hosting layer stores served repos
pub fn clone_bare(source: &Path) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let bare_path = temp_dir.path().join("repo.git");

    let output = Command::new("git")
        .args([
            "clone",
            "--bare",
            source.to_str().expect("non-utf8 path"),
            bare_path.to_str().expect("non-utf8 path"),
        ])
        .output()
        .expect("Failed to run git clone --bare");
    assert!(output.status.success());

    (temp_dir, bare_path)
}

/// Full clone of a repository (a fork, from the engine's point of view)
pub fn clone_fork(source: &Path) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let fork_path = temp_dir.path().join("fork");

    let output = Command::new("git")
        .args([
            "clone",
            source.to_str().expect("non-utf8 path"),
            fork_path.to_str().expect("non-utf8 path"),
        ])
        .output()
        .expect("Failed to run git clone");
    assert!(output.status.success());

    git(&fork_path, &["config", "user.name", "Fork User"]);
    git(&fork_path, &["config", "user.email", "fork@example.com"]);

    (temp_dir, fork_path)
}

/// Config whose workspaces land in a dedicated directory, so tests can assert
/// nothing survives an operation
pub fn config_with_temp_root() -> (TempDir, EngineConfig) {
    let temp_root = TempDir::new().expect("Failed to create temp root");
    let mut config = EngineConfig::default();
    config.workspace.temp_root = Some(temp_root.path().to_path_buf());
    (temp_root, config)
}

/// Assert that no workspace directory is left under the configured temp root
pub fn assert_no_workspace_left(temp_root: &TempDir) {
    let leftovers: Vec<_> = fs::read_dir(temp_root.path())
        .expect("Failed to read temp root")
        .collect();
    assert!(
        leftovers.is_empty(),
        "workspace directories persisted: {leftovers:?}"
    );
}
