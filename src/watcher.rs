use crate::error::{GitError, GitResult};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc::UnboundedSender;

/// Watches a working tree and forwards every content change as a unit
/// message on a channel.
///
/// The consumer (see `Repository::open`) applies invalidation on its own
/// scheduling domain; nothing is mutated from the OS callback thread.
/// Watch errors are logged and otherwise swallowed, so a broken watcher
/// degrades to a stale cache rather than a broken repository. Dropping
/// the watcher stops the stream and closes the channel.
pub struct ChangeWatcher {
    _watcher: RecommendedWatcher,
}

impl ChangeWatcher {
    pub fn new(repo_dir: &Path, changes: UnboundedSender<()>) -> GitResult<Self> {
        let mut watcher =
            notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if is_changed(&event) {
                        log::trace!("file changed: {:?} ({:?})", event.paths, event.kind);
                        // The receiver may already be gone during teardown.
                        let _ = changes.send(());
                    }
                }
                Err(e) => log::error!("file watcher error: {:?}", e),
            })
            .map_err(|e| GitError::Io(e.to_string()))?;

        watcher
            .watch(repo_dir, RecursiveMode::Recursive)
            .map_err(|e| GitError::Io(e.to_string()))?;

        log::info!(
            "file watcher started for {} (kind: {:?})",
            repo_dir.display(),
            RecommendedWatcher::kind()
        );

        Ok(Self { _watcher: watcher })
    }
}

fn is_changed(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}
