pub mod log;
pub mod parser;
pub mod repository;
pub mod runner;
pub mod version;

// Re-export commonly used types
pub use self::log::CommandLog;
pub use parser::{
    parse_branches, parse_count, parse_name_status, parse_numstat, parse_remotes, parse_status,
    Branch, FileStatus, NumStat, Remote, RemoteTrackingStatus, RepositoryStatus,
};
pub use repository::Repository;
pub use runner::{CommandResult, CommandRunner};
pub use version::GitVersion;
