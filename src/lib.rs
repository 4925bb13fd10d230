pub mod audit;
pub mod config;
pub mod error;
pub mod git;
pub mod registry;
pub mod watcher;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::{GitError, GitResult};
pub use git::{
    Branch, CommandLog, CommandResult, FileStatus, GitVersion, NumStat, Remote,
    RemoteTrackingStatus, Repository, RepositoryStatus,
};
pub use registry::{DirectoryResolver, PathResolver, RepositoryRegistry};
pub use watcher::ChangeWatcher;
