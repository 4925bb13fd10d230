use crate::config::Config;
use crate::error::{GitError, GitResult};
use crate::git::repository::Repository;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Maps an opaque identifier to a working-tree root.
///
/// The host application owns the notion of identity (a project id, a
/// workspace slug, a plain path); the registry only asks it to resolve.
#[async_trait]
pub trait PathResolver: Send + Sync {
    /// Absolute working-tree path for `id`, or `None` when unresolvable.
    async fn resolve(&self, id: &str) -> Option<PathBuf>;
}

/// Resolver for hosts whose identifiers already are filesystem paths.
pub struct DirectoryResolver;

#[async_trait]
impl PathResolver for DirectoryResolver {
    async fn resolve(&self, id: &str) -> Option<PathBuf> {
        let path = PathBuf::from(id);
        path.is_dir().then_some(path)
    }
}

/// Explicit mapping of identifier -> shared repository context, owned by
/// the composing application.
///
/// Every caller resolving the same identifier gets the same
/// `Arc<Repository>`, so invalidation is visible to all of them. A context
/// lives until [`RepositoryRegistry::forget`] drops it.
pub struct RepositoryRegistry {
    resolver: Box<dyn PathResolver>,
    config: Config,
    repos: Mutex<HashMap<String, Arc<Repository>>>,
}

impl RepositoryRegistry {
    pub fn new(resolver: Box<dyn PathResolver>, config: Config) -> Self {
        Self {
            resolver,
            config,
            repos: Mutex::new(HashMap::new()),
        }
    }

    /// Return the context for `id`, opening (and watching) it on first
    /// reference.
    pub async fn get_or_open(&self, id: &str) -> GitResult<Arc<Repository>> {
        let mut repos = self.repos.lock().await;

        if let Some(repo) = repos.get(id) {
            return Ok(Arc::clone(repo));
        }

        let Some(path) = self.resolver.resolve(id).await else {
            return Err(GitError::NotARepository);
        };

        let repo = Repository::open(path, &self.config);
        repos.insert(id.to_string(), Arc::clone(&repo));
        Ok(repo)
    }

    /// Drop the context for `id`. Callers still holding the `Arc` keep a
    /// working (if eventually unwatched) reference; new lookups reopen.
    pub async fn forget(&self, id: &str) -> bool {
        self.repos.lock().await.remove(id).is_some()
    }

    /// Identifiers with a live context.
    pub async fn ids(&self) -> Vec<String> {
        self.repos.lock().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn create_test_repo() -> TempDir {
        let temp = TempDir::new().unwrap();
        Command::new("git")
            .args(["init", "--initial-branch=main"])
            .current_dir(temp.path())
            .output()
            .unwrap();
        temp
    }

    fn test_config() -> Config {
        let mut config = Config::default_config();
        config.behavior.watch = false;
        config.behavior.log_commands = false;
        config
    }

    #[tokio::test]
    async fn test_same_id_shares_context() {
        let temp = create_test_repo();
        let registry = RepositoryRegistry::new(Box::new(DirectoryResolver), test_config());

        let id = temp.path().to_string_lossy().to_string();
        let a = registry.get_or_open(&id).await.unwrap();
        let b = registry.get_or_open(&id).await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_unresolvable_id() {
        let registry = RepositoryRegistry::new(Box::new(DirectoryResolver), test_config());

        let result = registry.get_or_open("/no/such/directory").await;
        assert!(matches!(result, Err(GitError::NotARepository)));
        assert!(registry.ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_forget_drops_context() {
        let temp = create_test_repo();
        let registry = RepositoryRegistry::new(Box::new(DirectoryResolver), test_config());

        let id = temp.path().to_string_lossy().to_string();
        let first = registry.get_or_open(&id).await.unwrap();

        assert!(registry.forget(&id).await);
        assert!(!registry.forget(&id).await);

        let second = registry.get_or_open(&id).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
