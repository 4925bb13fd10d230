use gitmirror::{Config, GitVersion, Repository, RepositoryStatus};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match GitVersion::validate().await {
        Ok(version) => log::debug!("git version: {}", version),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let mut watch = false;
    let mut dump_log = false;
    let mut path: Option<String> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--watch" => watch = true,
            "--log" => dump_log = true,
            other => path = Some(other.to_string()),
        }
    }

    let root = match path {
        Some(p) => p.into(),
        None => match Repository::discover() {
            Ok(repo) => repo.path().to_path_buf(),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let config = Config::load_or_default();
    let repo = Repository::open(&root, &config);

    if !repo.is_repository().await {
        eprintln!("Error: {} is not a git repository", root.display());
        return ExitCode::FAILURE;
    }

    let mut last = print_model(&repo).await;

    if dump_log {
        println!();
        println!("invocation log:");
        for line in repo.command_log().snapshot() {
            println!("  {}", line);
        }
    }

    if watch {
        // The watcher invalidates the cache; re-printing on change is just
        // polling the (then recomputed) memoized status.
        loop {
            tokio::time::sleep(Duration::from_secs(2)).await;
            let current = repo.status().await.ok();
            if current != last {
                println!();
                last = print_model(&repo).await;
            }
        }
    }

    ExitCode::SUCCESS
}

async fn print_model(repo: &Arc<Repository>) -> Option<RepositoryStatus> {
    match repo.current_branch().await {
        Ok(Some(branch)) => println!("on branch {}", branch),
        Ok(None) => println!("detached HEAD"),
        Err(e) => println!("branch unavailable: {}", e),
    }

    if let Ok(revision) = repo.head_revision().await {
        println!("at {}", revision);
    }

    if let Ok(branches) = repo.branches().await {
        println!("branches:");
        for branch in &branches {
            println!("  {}", branch.qualified_name());
        }
    }

    match repo.remotes().await {
        Ok(remotes) if remotes.is_empty() => println!("no remotes"),
        Ok(remotes) => {
            println!("remotes:");
            for remote in &remotes {
                println!("  {} -> {}", remote.alias, remote.url);
            }
            match repo.tracking_status().await {
                Some(tracking) => println!(
                    "tracking {}: {} ahead, {} behind",
                    tracking.remote, tracking.ahead, tracking.behind
                ),
                None => println!("no tracking status"),
            }
        }
        Err(e) => println!("remotes unavailable: {}", e),
    }

    let status = repo.status().await;
    match &status {
        Ok(status) if status.is_clean() => println!("working tree clean"),
        Ok(status) => {
            println!("changes:");
            for entry in &status.entries {
                println!(
                    "  {}{} {} (+{} -{})",
                    entry.index_status,
                    entry.worktree_status,
                    entry.path.display(),
                    entry.unstaged.added + entry.staged.added,
                    entry.unstaged.removed + entry.staged.removed,
                );
            }
        }
        Err(e) => println!("status unavailable: {}", e),
    }

    status.ok()
}
