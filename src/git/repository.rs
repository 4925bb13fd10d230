use crate::audit::AuditLogger;
use crate::config::Config;
use crate::error::{GitError, GitResult};
use crate::git::log::CommandLog;
use crate::git::parser::{self, Branch, Remote, RemoteTrackingStatus, RepositoryStatus};
use crate::git::runner::{CommandResult, CommandRunner};
use crate::watcher::ChangeWatcher;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{mpsc, OnceCell};

type Slot<T> = Arc<OnceCell<T>>;

/// Memoization state for one repository context.
///
/// Each accessor owns one slot; the diff map keys per revision range.
/// Invalidation swaps the whole struct for a fresh one in a single
/// critical section, so readers never observe a partially-cleared cache.
/// A computation that was in flight at that moment keeps writing into its
/// now-orphaned cell and its stale result is never stored back.
#[derive(Default)]
struct Cache {
    top_level: Slot<GitResult<PathBuf>>,
    branches: Slot<GitResult<Vec<Branch>>>,
    current_branch: Slot<GitResult<Option<String>>>,
    head_revision: Slot<GitResult<String>>,
    remotes: Slot<GitResult<Vec<Remote>>>,
    tracking: Slot<Option<RemoteTrackingStatus>>,
    status: Slot<GitResult<RepositoryStatus>>,
    diffs: HashMap<(String, String), Slot<GitResult<RepositoryStatus>>>,
}

/// A live, queryable model of one git working tree.
///
/// Accessors are lazy and memoized: the first call runs the underlying git
/// command(s) and parses the output; concurrent callers of the same
/// accessor share the in-flight computation, so no accessor ever spawns
/// the same process twice before invalidation. The cache invalidates as a
/// whole when a mutating command completes or the filesystem watcher
/// reports a change under the working tree.
pub struct Repository {
    path: PathBuf,
    runner: CommandRunner,
    log: CommandLog,
    audit: Option<AuditLogger>,
    cache: Mutex<Cache>,
    watcher: Mutex<Option<ChangeWatcher>>,
}

impl Repository {
    /// Create a context for a known working-tree root, with defaults and
    /// no filesystem watcher. See [`Repository::open`] for the watched
    /// variant.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let log = CommandLog::default();
        let runner = CommandRunner::new(&path, log.clone());

        Self {
            path,
            runner,
            log,
            audit: None,
            cache: Mutex::new(Cache::default()),
            watcher: Mutex::new(None),
        }
    }

    /// Create a context honoring a [`Config`]: program name, log capacity
    /// and the mutating-command history.
    pub fn with_config<P: AsRef<Path>>(path: P, config: &Config) -> Self {
        let path = path.as_ref().to_path_buf();
        let log = CommandLog::new(config.cache.command_log_capacity);
        let runner = CommandRunner::with_program(&path, &config.git.program, log.clone());

        let audit = if config.behavior.log_commands {
            match AuditLogger::new() {
                Ok(logger) => Some(logger),
                Err(e) => {
                    log::warn!("command history disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            path,
            runner,
            log,
            audit,
            cache: Mutex::new(Cache::default()),
            watcher: Mutex::new(None),
        }
    }

    /// Open a shared, watched context: filesystem changes under the
    /// working tree invalidate the cache. Must be called from within a
    /// tokio runtime.
    ///
    /// Watcher setup failure degrades to an unwatched context (the cache
    /// then goes stale until a mutating command or an explicit
    /// [`Repository::invalidate`]); it is logged, never an error.
    pub fn open<P: AsRef<Path>>(path: P, config: &Config) -> Arc<Self> {
        let repo = Arc::new(Self::with_config(path, config));

        if config.behavior.watch {
            let (tx, rx) = mpsc::unbounded_channel();
            match ChangeWatcher::new(&repo.path, tx) {
                Ok(watcher) => {
                    *repo.watcher.lock().unwrap() = Some(watcher);
                    spawn_invalidation_task(Arc::downgrade(&repo), rx);
                }
                Err(e) => {
                    log::warn!("file watcher unavailable for {}: {}", repo.path.display(), e);
                }
            }
        }

        repo
    }

    /// Detect a working-tree root from the current directory upwards.
    pub fn discover() -> GitResult<Self> {
        let current_dir = env::current_dir()?;
        Self::discover_from(current_dir)
    }

    /// Detect a working-tree root starting from a specific directory.
    pub fn discover_from<P: AsRef<Path>>(start_path: P) -> GitResult<Self> {
        let mut current = start_path.as_ref().to_path_buf();

        loop {
            if current.join(".git").exists() {
                return Ok(Self::new(current));
            }

            if !current.pop() {
                return Err(GitError::NotARepository);
            }
        }
    }

    /// The working-tree root this context was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the rolling invocation log.
    pub fn command_log(&self) -> &CommandLog {
        &self.log
    }

    /// Whether the working tree is inside a git repository. Shares the
    /// memoized `top_level` computation.
    pub async fn is_repository(&self) -> bool {
        self.top_level().await.is_ok()
    }

    /// Absolute top-level directory of the working tree.
    pub async fn top_level(&self) -> GitResult<PathBuf> {
        let cell = self.cache.lock().unwrap().top_level.clone();
        cell.get_or_init(|| self.compute_top_level()).await.clone()
    }

    /// All local and remote branches.
    pub async fn branches(&self) -> GitResult<Vec<Branch>> {
        let cell = self.cache.lock().unwrap().branches.clone();
        cell.get_or_init(|| self.compute_branches()).await.clone()
    }

    /// Name of the checked-out branch, `None` when HEAD is detached.
    pub async fn current_branch(&self) -> GitResult<Option<String>> {
        let cell = self.cache.lock().unwrap().current_branch.clone();
        cell.get_or_init(|| self.compute_current_branch())
            .await
            .clone()
    }

    /// Revision id of HEAD.
    pub async fn head_revision(&self) -> GitResult<String> {
        let cell = self.cache.lock().unwrap().head_revision.clone();
        cell.get_or_init(|| self.compute_head_revision())
            .await
            .clone()
    }

    /// Configured remotes, fetch/push duplicates collapsed.
    pub async fn remotes(&self) -> GitResult<Vec<Remote>> {
        let cell = self.cache.lock().unwrap().remotes.clone();
        cell.get_or_init(|| self.compute_remotes()).await.clone()
    }

    /// The remote ahead/behind queries run against: `origin` when
    /// configured, otherwise the first listed remote.
    pub async fn default_remote(&self) -> GitResult<Option<Remote>> {
        let remotes = self.remotes().await?;
        Ok(pick_default_remote(&remotes).cloned())
    }

    /// Ahead/behind counts of the current branch against its counterpart
    /// on the default remote, fetching first. `None` whenever the answer
    /// does not exist: no remotes, detached HEAD, no matching remote
    /// branch, or any failure along the way (logged, never propagated).
    pub async fn tracking_status(&self) -> Option<RemoteTrackingStatus> {
        let cell = self.cache.lock().unwrap().tracking.clone();
        cell.get_or_init(|| self.compute_tracking_status())
            .await
            .clone()
    }

    /// Full working-tree status: porcelain entries joined with staged and
    /// unstaged per-file line counts.
    pub async fn status(&self) -> GitResult<RepositoryStatus> {
        let cell = self.cache.lock().unwrap().status.clone();
        cell.get_or_init(|| self.compute_status()).await.clone()
    }

    /// Changed files between two revisions. Memoized per ordered
    /// `(from, to)` pair; repeated queries for the same range are free.
    pub async fn diff_range(&self, from: &str, to: &str) -> GitResult<RepositoryStatus> {
        let cell = {
            let mut cache = self.cache.lock().unwrap();
            cache
                .diffs
                .entry((from.to_string(), to.to_string()))
                .or_default()
                .clone()
        };
        cell.get_or_init(|| self.compute_diff_range(from, to))
            .await
            .clone()
    }

    /// Run a command that does not change repository-visible state. The
    /// cache stays intact.
    ///
    /// Every output line is routed into the invocation log; stderr lines
    /// are then suppressed from the captured stdout so parsers see clean
    /// input.
    pub async fn run_read(&self, args: &[&str]) -> GitResult<CommandResult> {
        let log = self.log.clone();
        self.runner
            .run_filtered(args, move |is_stderr, line| {
                log.push(line);
                !is_stderr
            })
            .await
    }

    /// Run a state-changing command (checkout, commit, reset, ...). The
    /// entire memoized state is discarded after the process completes and
    /// before the result is returned, so any immediately-following
    /// accessor call recomputes.
    pub async fn run_mutating(&self, args: &[&str]) -> GitResult<CommandResult> {
        let result = self.run_read(args).await;

        self.invalidate();

        if let (Ok(res), Some(audit)) = (&result, &self.audit) {
            let command = args.join(" ");
            if let Err(e) = audit.log_command(&command, &self.path, res.exit_code) {
                log::warn!("failed to append command history: {}", e);
            }
        }

        result
    }

    /// Discard every memoized accessor value and the whole diff-range map
    /// in one atomic step.
    pub fn invalidate(&self) {
        let mut cache = self.cache.lock().unwrap();
        *cache = Cache::default();
    }

    async fn compute_top_level(&self) -> GitResult<PathBuf> {
        let result = self.run_read(&["rev-parse", "--show-toplevel"]).await?;
        if !result.success() {
            return Err(GitError::NotARepository);
        }
        Ok(PathBuf::from(result.stdout.trim()))
    }

    async fn compute_branches(&self) -> GitResult<Vec<Branch>> {
        let result = self
            .run_read(&[
                "for-each-ref",
                "--format=%(refname)%09%(upstream:short)",
                "refs/heads",
                "refs/remotes",
            ])
            .await?;
        if !result.success() {
            return Err(GitError::CommandFailed(format!(
                "for-each-ref exited with {}",
                result.exit_code
            )));
        }
        Ok(parser::parse_branches(&result.stdout))
    }

    async fn compute_current_branch(&self) -> GitResult<Option<String>> {
        let result = self.run_read(&["branch", "--show-current"]).await?;
        if !result.success() {
            return Err(GitError::CommandFailed(format!(
                "branch --show-current exited with {}",
                result.exit_code
            )));
        }

        let branch = result.stdout.trim();
        if branch.is_empty() {
            // Detached HEAD
            Ok(None)
        } else {
            Ok(Some(branch.to_string()))
        }
    }

    async fn compute_head_revision(&self) -> GitResult<String> {
        let result = self.run_read(&["rev-parse", "HEAD"]).await?;
        if !result.success() {
            return Err(GitError::CommandFailed(format!(
                "rev-parse HEAD exited with {}",
                result.exit_code
            )));
        }
        Ok(result.stdout.trim().to_string())
    }

    async fn compute_remotes(&self) -> GitResult<Vec<Remote>> {
        let result = self.run_read(&["remote", "-v"]).await?;
        if !result.success() {
            return Err(GitError::CommandFailed(format!(
                "remote -v exited with {}",
                result.exit_code
            )));
        }
        Ok(parser::parse_remotes(&result.stdout))
    }

    async fn compute_tracking_status(&self) -> Option<RemoteTrackingStatus> {
        match self.try_tracking_status().await {
            Ok(tracking) => tracking,
            Err(e) => {
                log::debug!("remote tracking status unavailable: {}", e);
                None
            }
        }
    }

    async fn try_tracking_status(&self) -> GitResult<Option<RemoteTrackingStatus>> {
        let remotes = self.remotes().await?;
        let Some(remote) = pick_default_remote(&remotes) else {
            return Ok(None);
        };

        let Some(branch) = self.current_branch().await? else {
            return Ok(None);
        };

        // Fetch so the counts compare against fresh remote-tracking refs.
        // Classified read-only: it does not touch the working tree.
        self.run_read(&["fetch", &remote.alias]).await?;

        let upstream_exists = self.branches().await?.iter().any(|b| {
            matches!(b, Branch::Remote { remote: alias, name }
                if *alias == remote.alias && *name == branch)
        });
        if !upstream_exists {
            // The local branch has nothing to compare against.
            return Ok(None);
        }

        let upstream = format!("{}/{}", remote.alias, branch);
        let ahead = self.count_range(&format!("{}..{}", upstream, branch)).await;
        let behind = self.count_range(&format!("{}..{}", branch, upstream)).await;

        match (ahead, behind) {
            (Some(ahead), Some(behind)) => Ok(Some(RemoteTrackingStatus {
                remote: remote.alias.clone(),
                ahead,
                behind,
            })),
            _ => Ok(None),
        }
    }

    async fn count_range(&self, range: &str) -> Option<u32> {
        let result = self.run_read(&["rev-list", "--count", range]).await.ok()?;
        if !result.success() {
            return None;
        }
        parser::parse_count(&result.stdout)
    }

    async fn compute_status(&self) -> GitResult<RepositoryStatus> {
        // Four concurrent sub-queries; the join by path below is what makes
        // the result coherent.
        let (top_level, status, unstaged, staged) = tokio::join!(
            self.top_level(),
            self.run_read(&["status", "--porcelain"]),
            self.run_read(&["diff", "--numstat"]),
            self.run_read(&["diff", "--numstat", "--cached"]),
        );

        let top_level = top_level?;
        let status = status?;
        if !status.success() {
            return Err(GitError::CommandFailed(format!(
                "status --porcelain exited with {}",
                status.exit_code
            )));
        }
        let unstaged = parser::parse_numstat(&unstaged?.stdout);
        let staged = parser::parse_numstat(&staged?.stdout);

        Ok(parser::parse_status(
            &status.stdout,
            &top_level,
            &unstaged,
            &staged,
        ))
    }

    async fn compute_diff_range(&self, from: &str, to: &str) -> GitResult<RepositoryStatus> {
        let name_status_args = ["diff", "--name-status", from, to];
        let numstat_args = ["diff", "--numstat", from, to];
        let (top_level, names, stats) = tokio::join!(
            self.top_level(),
            self.run_read(&name_status_args),
            self.run_read(&numstat_args),
        );

        let top_level = top_level?;
        let names = names?;
        if !names.success() {
            return Err(GitError::CommandFailed(format!(
                "diff {} {} exited with {}",
                from, to, names.exit_code
            )));
        }
        let stats = parser::parse_numstat(&stats?.stdout);

        Ok(parser::parse_name_status(&names.stdout, &top_level, &stats))
    }
}

fn pick_default_remote(remotes: &[Remote]) -> Option<&Remote> {
    remotes
        .iter()
        .find(|r| r.alias == "origin")
        .or_else(|| remotes.first())
}

/// Applies watcher-reported changes on the runtime's scheduling domain
/// rather than from the OS callback thread. Exits when the repository is
/// dropped (the sender closes) or the context is no longer referenced.
fn spawn_invalidation_task(
    repo: Weak<Repository>,
    mut changes: mpsc::UnboundedReceiver<()>,
) {
    tokio::spawn(async move {
        while changes.recv().await.is_some() {
            let Some(repo) = repo.upgrade() else {
                break;
            };
            repo.invalidate();
        }
    });
}
