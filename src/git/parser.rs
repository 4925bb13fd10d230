use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Parse `for-each-ref --format=%(refname)%09%(upstream:short)` output into
/// branches. Refs under `refs/remotes/` become remote branches; everything
/// else is local, with the upstream column as its tracking ref.
pub fn parse_branches(output: &str) -> Vec<Branch> {
    let mut branches = Vec::new();

    for line in output.lines() {
        if line.is_empty() {
            continue;
        }

        let (refname, upstream) = line.split_once('\t').unwrap_or((line, ""));
        let segments: Vec<&str> = refname.split('/').collect();
        if segments.len() < 3 {
            continue;
        }

        if segments[1] == "remotes" {
            // refs/remotes/<alias>/<name...>
            if segments.len() < 4 {
                continue;
            }
            branches.push(Branch::Remote {
                remote: segments[2].to_string(),
                name: segments[3..].join("/"),
            });
        } else {
            // refs/heads/<name...>; branch names may themselves contain '/'
            let tracking = upstream.trim();
            branches.push(Branch::Local {
                name: segments[2..].join("/"),
                tracking: if tracking.is_empty() {
                    None
                } else {
                    Some(tracking.to_string())
                },
            });
        }
    }

    branches
}

/// Parse `remote -v` output. Each remote appears once per direction
/// (fetch/push); exact (alias, url) duplicates collapse, keeping first
/// appearance order.
pub fn parse_remotes(output: &str) -> Vec<Remote> {
    let mut remotes: Vec<Remote> = Vec::new();

    for line in output.lines() {
        let Some((alias, rest)) = line.split_once('\t') else {
            continue;
        };
        let Some(url) = rest.split_whitespace().next() else {
            continue;
        };

        let remote = Remote {
            alias: alias.to_string(),
            url: url.to_string(),
        };
        if !remotes.contains(&remote) {
            remotes.push(remote);
        }
    }

    remotes
}

/// Parse `diff --numstat` output into a per-path map of line counts.
///
/// Rename rows render the path as `prefix{old => new}suffix`; the braces
/// are rewritten to the new side before the path is used as a key. Binary
/// files render `-` for both counts and are dropped; lookups for paths
/// absent from the map default to a zero [`NumStat`].
pub fn parse_numstat(output: &str) -> HashMap<String, NumStat> {
    let mut stats = HashMap::new();

    for line in output.lines() {
        let mut fields = line.splitn(3, '\t');
        let (Some(added), Some(removed), Some(path)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let (Ok(added), Ok(removed)) = (added.parse(), removed.parse()) else {
            continue;
        };

        stats.insert(rewrite_rename(path), NumStat { added, removed });
    }

    stats
}

/// Rewrite a numstat rename path to its new side:
/// `src/{old.rs => new.rs}` becomes `src/new.rs`.
fn rewrite_rename(path: &str) -> String {
    if let (Some(open), Some(close)) = (path.find('{'), path.rfind('}')) {
        if open < close {
            if let Some((_, new)) = path[open + 1..close].split_once(" => ") {
                return format!("{}{}{}", &path[..open], new, &path[close + 1..]);
            }
        }
    }
    path.to_string()
}

/// Parse `status --porcelain` output, joining each entry against the
/// unstaged and staged numstat maps by its (new) relative path.
///
/// The first two characters of a line are the index (X) and worktree (Y)
/// status codes; the remainder is either a path or `old -> new` for a
/// rename. Paths are unquoted, slash-normalized and made absolute against
/// the repository top-level.
pub fn parse_status(
    output: &str,
    top_level: &Path,
    unstaged: &HashMap<String, NumStat>,
    staged: &HashMap<String, NumStat>,
) -> RepositoryStatus {
    let mut entries = Vec::new();

    for line in output.lines() {
        let mut chars = line.chars();
        let (Some(x), Some(y)) = (chars.next(), chars.next()) else {
            continue;
        };
        let rest = chars.as_str().trim();
        if rest.is_empty() {
            continue;
        }

        let (old_rel, new_rel) = match rest.split_once(" -> ") {
            Some((old, new)) => (Some(normalize_path(old)), normalize_path(new)),
            None => (None, normalize_path(rest)),
        };

        entries.push(FileStatus {
            path: top_level.join(&new_rel),
            old_path: old_rel.map(|old| top_level.join(old)),
            index_status: x,
            worktree_status: y,
            unstaged: unstaged.get(new_rel.as_str()).copied().unwrap_or_default(),
            staged: staged.get(new_rel.as_str()).copied().unwrap_or_default(),
        });
    }

    RepositoryStatus { entries }
}

/// Parse `diff --name-status <from> <to>` output, joining against the
/// range's numstat map.
///
/// Range diffs have no index concept: the single change-kind letter
/// populates both status characters and the single numstat both count
/// fields, so [`FileStatus::is_staged`]/[`FileStatus::is_unstaged`] are
/// not meaningful on these entries.
pub fn parse_name_status(
    output: &str,
    top_level: &Path,
    stats: &HashMap<String, NumStat>,
) -> RepositoryStatus {
    let mut entries = Vec::new();

    for line in output.lines() {
        let mut fields = line.split('\t');
        let Some(kind) = fields.next().and_then(|code| code.chars().next()) else {
            continue;
        };

        // Rename/copy rows carry two paths; everything else carries one.
        let (old_rel, new_rel) = match (fields.next(), fields.next()) {
            (Some(old), Some(new)) => (Some(normalize_path(old)), normalize_path(new)),
            (Some(path), None) => (None, normalize_path(path)),
            _ => continue,
        };
        if new_rel.is_empty() {
            continue;
        }

        let counts = stats.get(new_rel.as_str()).copied().unwrap_or_default();
        entries.push(FileStatus {
            path: top_level.join(&new_rel),
            old_path: old_rel.map(|old| top_level.join(old)),
            index_status: kind,
            worktree_status: kind,
            unstaged: counts,
            staged: counts,
        });
    }

    RepositoryStatus { entries }
}

/// Parse a `rev-list --count` output. Anything that is not a single
/// non-negative integer (detached state, bad range, error text) is `None`.
pub fn parse_count(output: &str) -> Option<u32> {
    output.trim().parse().ok()
}

fn normalize_path(raw: &str) -> String {
    raw.trim().trim_matches('"').replace('\\', "/")
}

/// A branch known to the repository. Immutable snapshot, recreated on
/// every listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Branch {
    Local {
        name: String,
        /// Upstream tracking ref (e.g. `origin/main`), when configured.
        tracking: Option<String>,
    },
    Remote {
        remote: String,
        name: String,
    },
}

impl Branch {
    pub fn name(&self) -> &str {
        match self {
            Branch::Local { name, .. } | Branch::Remote { name, .. } => name,
        }
    }

    /// Local branches qualify as their own name; remote branches as
    /// `remote/name`.
    pub fn qualified_name(&self) -> String {
        match self {
            Branch::Local { name, .. } => name.clone(),
            Branch::Remote { remote, name } => format!("{}/{}", remote, name),
        }
    }
}

/// A configured remote. Equality is by (alias, url) so fetch/push listing
/// duplicates collapse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Remote {
    pub alias: String,
    pub url: String,
}

/// Added/removed line counts for one file in one diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumStat {
    pub added: u32,
    pub removed: u32,
}

/// One working-tree entry from a status or range-diff listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    /// Absolute path of the (new) file.
    pub path: PathBuf,
    /// Rename source, when the entry is a rename.
    pub old_path: Option<PathBuf>,
    /// Index-side status code (X).
    pub index_status: char,
    /// Worktree-side status code (Y).
    pub worktree_status: char,
    pub unstaged: NumStat,
    pub staged: NumStat,
}

impl FileStatus {
    /// Whether git tracks this file at all ('?' marks untracked).
    pub fn is_in_index(&self) -> bool {
        self.worktree_status != '?'
    }

    pub fn is_unstaged(&self) -> bool {
        self.worktree_status != ' '
    }

    pub fn is_staged(&self) -> bool {
        self.index_status != ' ' && self.index_status != '?'
    }
}

/// Ordered, non-deduplicated working-tree status with filtered views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryStatus {
    pub entries: Vec<FileStatus>,
}

impl RepositoryStatus {
    pub fn staged(&self) -> impl Iterator<Item = &FileStatus> {
        self.entries.iter().filter(|e| e.is_staged())
    }

    pub fn unstaged(&self) -> impl Iterator<Item = &FileStatus> {
        self.entries.iter().filter(|e| e.is_unstaged())
    }

    pub fn untracked(&self) -> impl Iterator<Item = &FileStatus> {
        self.entries.iter().filter(|e| !e.is_in_index())
    }

    /// Entries with both a staged and an unstaged side (tracked files
    /// partially added to the index).
    pub fn partially_staged(&self) -> impl Iterator<Item = &FileStatus> {
        self.entries
            .iter()
            .filter(|e| e.is_staged() && e.is_in_index() && e.is_unstaged())
    }

    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ahead/behind counts of the current branch relative to its remote
/// counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrackingStatus {
    pub remote: String,
    pub ahead: u32,
    pub behind: u32,
}
