use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Create a test git repository with a deterministic default branch.
pub fn create_test_repo() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let repo_path = temp_dir.path().to_path_buf();

    git(&repo_path, &["init", "-b", "main"]);
    git(&repo_path, &["config", "user.name", "Test User"]);
    git(&repo_path, &["config", "user.email", "test@example.com"]);
    git(&repo_path, &["config", "commit.gpgsign", "false"]);

    (temp_dir, repo_path)
}

/// Write a file, stage it, and commit it.
pub fn create_commit(repo_path: &Path, file: &str, content: &str, message: &str) {
    fs::write(repo_path.join(file), content).expect("failed to write file");
    git(repo_path, &["add", file]);
    git(repo_path, &["commit", "-m", message]);
}

/// Create a branch at the current HEAD.
#[allow(dead_code)]
pub fn create_branch(repo_path: &Path, name: &str) {
    git(repo_path, &["branch", name]);
}

#[allow(dead_code)]
pub fn checkout(repo_path: &Path, target: &str) {
    git(repo_path, &["checkout", target]);
}

/// Run git in the repo, panicking on failure.
pub fn git(repo_path: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .unwrap_or_else(|e| panic!("failed to run git {args:?}: {e}"));
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Capture stdout of a git command in the repo.
#[allow(dead_code)]
pub fn git_stdout(repo_path: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .unwrap_or_else(|e| panic!("failed to run git {args:?}: {e}"));
    String::from_utf8_lossy(&output.stdout).into_owned()
}
