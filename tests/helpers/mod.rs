use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Helper to create a test git repository
pub fn create_test_repo() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let repo_path = temp_dir.path().to_path_buf();

    git(&repo_path, &["init", "--initial-branch=main"]);
    git(&repo_path, &["config", "user.name", "Test User"]);
    git(&repo_path, &["config", "user.email", "test@example.com"]);

    (temp_dir, repo_path)
}

/// Helper to create a commit
pub fn create_commit(repo_path: &Path, file: &str, content: &str, message: &str) {
    fs::write(repo_path.join(file), content).expect("Failed to write file");
    git(repo_path, &["add", file]);
    git(repo_path, &["commit", "-m", message]);
}

/// Helper to create an upstream repository plus a clone tracking it.
///
/// The upstream gets one initial commit so the clone has a checked-out
/// `main` with `origin/main` as its remote counterpart; fetches against it
/// work entirely offline.
pub fn create_cloned_repo() -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let upstream = temp_dir.path().join("upstream");
    let clone = temp_dir.path().join("clone");

    fs::create_dir(&upstream).unwrap();
    git(&upstream, &["init", "--initial-branch=main"]);
    git(&upstream, &["config", "user.name", "Test User"]);
    git(&upstream, &["config", "user.email", "test@example.com"]);
    create_commit(&upstream, "seed.txt", "seed", "Initial commit");

    git(
        temp_dir.path(),
        &[
            "clone",
            upstream.to_str().unwrap(),
            clone.to_str().unwrap(),
        ],
    );
    git(&clone, &["config", "user.name", "Test User"]);
    git(&clone, &["config", "user.email", "test@example.com"]);

    (temp_dir, upstream, clone)
}

/// Run a git command in a directory, panicking on failure.
pub fn git(repo_path: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .expect("Failed to execute git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}
