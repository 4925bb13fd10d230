use thiserror::Error;

/// Errors that can occur during git operations.
///
/// Variants carry owned strings rather than source errors so that the type
/// stays `Clone`: memoized accessor slots hold a `GitResult<T>` and every
/// concurrent waiter receives the same outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GitError {
    #[error("Not a git repository")]
    NotARepository,

    #[error("Git command failed: {0}")]
    CommandFailed(String),

    #[error("Failed to parse git output: {0}")]
    ParseError(String),

    #[error("Failed to spawn process: {0}")]
    Spawn(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for GitError {
    fn from(e: std::io::Error) -> Self {
        GitError::Io(e.to_string())
    }
}

/// Result type for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;
