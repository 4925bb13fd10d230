mod helpers;

use gitmirror::Repository;
use helpers::{create_commit, create_test_repo, git};
use std::fs;

#[tokio::test]
async fn test_path_with_spaces() {
    let (_temp, repo_path) = create_test_repo();
    let repo = Repository::new(&repo_path);

    fs::write(repo_path.join("with space.txt"), "content\n").unwrap();

    let status = repo.status().await.unwrap();
    assert_eq!(status.entries.len(), 1);
    // Surrounding quotes from the porcelain output are stripped.
    assert!(status.entries[0].path.ends_with("with space.txt"));
}

#[tokio::test]
async fn test_staged_rename_carries_old_path() {
    let (_temp, repo_path) = create_test_repo();
    create_commit(&repo_path, "old.txt", "same content\n", "Initial commit");
    git(&repo_path, &["mv", "old.txt", "new.txt"]);
    let repo = Repository::new(&repo_path);

    let status = repo.status().await.unwrap();
    assert_eq!(status.entries.len(), 1);

    let entry = &status.entries[0];
    assert_eq!(entry.index_status, 'R');
    assert!(entry.path.ends_with("new.txt"));
    assert!(entry
        .old_path
        .as_ref()
        .is_some_and(|p| p.ends_with("old.txt")));
}

#[tokio::test]
async fn test_binary_file_has_zero_numstat() {
    let (_temp, repo_path) = create_test_repo();
    fs::write(repo_path.join("blob.bin"), [0u8, 159, 146, 150]).unwrap();
    git(&repo_path, &["add", "blob.bin"]);
    git(&repo_path, &["commit", "-m", "Add binary"]);
    fs::write(repo_path.join("blob.bin"), [0u8, 1, 2, 3, 4]).unwrap();
    let repo = Repository::new(&repo_path);

    let status = repo.status().await.unwrap();
    let entry = &status.entries[0];
    assert!(entry.is_unstaged());
    // The numstat block renders `-` for binaries; the join defaults to zero.
    assert_eq!(entry.unstaged.added, 0);
    assert_eq!(entry.unstaged.removed, 0);
}

#[tokio::test]
async fn test_branch_names_with_slashes() {
    let (_temp, repo_path) = create_test_repo();
    create_commit(&repo_path, "file.txt", "content", "Initial commit");
    git(&repo_path, &["branch", "feature/nested/name"]);
    let repo = Repository::new(&repo_path);

    let branches = repo.branches().await.unwrap();
    assert!(branches.iter().any(|b| b.name() == "feature/nested/name"));
}

#[tokio::test]
async fn test_detached_head() {
    let (_temp, repo_path) = create_test_repo();
    create_commit(&repo_path, "file.txt", "content", "Initial commit");
    let repo = Repository::new(&repo_path);

    let revision = repo.head_revision().await.unwrap();
    repo.run_mutating(&["checkout", &revision]).await.unwrap();

    assert_eq!(repo.current_branch().await.unwrap(), None);
    assert!(repo.tracking_status().await.is_none());
}

#[tokio::test]
async fn test_not_a_repository_accessors() {
    let temp = tempfile::TempDir::new().unwrap();
    let repo = Repository::new(temp.path());

    assert!(!repo.is_repository().await);
    assert!(repo.top_level().await.is_err());
    assert!(repo.status().await.is_err());
    assert!(repo.tracking_status().await.is_none());
}

#[tokio::test]
async fn test_subdirectory_context_resolves_to_top_level() {
    let (_temp, repo_path) = create_test_repo();
    create_commit(&repo_path, "file.txt", "content", "Initial commit");
    let sub = repo_path.join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("inner.txt"), "content\n").unwrap();

    // Context rooted below the top level: paths still join against the
    // real top-level directory.
    let repo = Repository::new(&sub);
    let status = repo.status().await.unwrap();
    assert_eq!(status.entries.len(), 1);
    assert!(status.entries[0].path.ends_with("sub/inner.txt"));

    let top_level = repo.top_level().await.unwrap();
    assert_eq!(
        top_level.canonicalize().unwrap(),
        repo_path.canonicalize().unwrap()
    );
}

#[tokio::test]
async fn test_status_not_deduplicated_and_ordered() {
    let (_temp, repo_path) = create_test_repo();
    create_commit(&repo_path, "a.txt", "a\n", "Initial commit");
    let repo = Repository::new(&repo_path);

    fs::write(repo_path.join("a.txt"), "a\nb\n").unwrap();
    git(&repo_path, &["add", "a.txt"]);
    fs::write(repo_path.join("a.txt"), "a\nb\nc\n").unwrap();

    // Partially staged: one entry with both sides populated.
    let status = repo.status().await.unwrap();
    assert_eq!(status.entries.len(), 1);

    let entry = &status.entries[0];
    assert_eq!(entry.index_status, 'M');
    assert_eq!(entry.worktree_status, 'M');
    assert_eq!(status.partially_staged().count(), 1);
    assert_eq!(entry.staged.added, 1);
    assert_eq!(entry.unstaged.added, 1);
}
