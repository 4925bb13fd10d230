use crate::error::{GitError, GitResult};
use tokio::process::Command;

/// Minimum supported git version: `--no-optional-locks`, which every
/// invocation relies on, first shipped in 2.15.
const MIN_GIT_VERSION: (u32, u32) = (2, 15);

/// Version of the installed git binary.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GitVersion {
    /// Detect the installed git version.
    pub async fn detect() -> GitResult<Self> {
        let output = Command::new("git")
            .arg("--version")
            .output()
            .await
            .map_err(|e| GitError::Spawn(format!("git --version: {}", e)))?;

        if !output.status.success() {
            return Err(GitError::CommandFailed(
                "git --version exited non-zero".to_string(),
            ));
        }

        Self::parse(&String::from_utf8_lossy(&output.stdout))
    }

    /// Parse a version banner like `git version 2.39.2` (platform builds
    /// may append further dotted segments, e.g. `2.39.2.windows.1`).
    pub fn parse(version_str: &str) -> GitResult<Self> {
        let parts: Vec<&str> = version_str.split_whitespace().collect();

        if parts.len() < 3 || parts[0] != "git" || parts[1] != "version" {
            return Err(GitError::ParseError(format!(
                "unexpected version banner: {}",
                version_str.trim()
            )));
        }

        let nums: Vec<&str> = parts[2].split('.').collect();
        if nums.len() < 2 {
            return Err(GitError::ParseError(format!(
                "unexpected version number: {}",
                parts[2]
            )));
        }

        let major = nums[0]
            .parse::<u32>()
            .map_err(|_| GitError::ParseError(format!("invalid major version: {}", nums[0])))?;
        let minor = nums[1]
            .parse::<u32>()
            .map_err(|_| GitError::ParseError(format!("invalid minor version: {}", nums[1])))?;
        let patch = nums.get(2).and_then(|p| p.parse().ok()).unwrap_or(0);

        Ok(GitVersion {
            major,
            minor,
            patch,
        })
    }

    pub fn is_supported(&self) -> bool {
        self.major > MIN_GIT_VERSION.0
            || (self.major == MIN_GIT_VERSION.0 && self.minor >= MIN_GIT_VERSION.1)
    }

    /// Detect and require a supported version.
    pub async fn validate() -> GitResult<Self> {
        let version = Self::detect().await?;

        if !version.is_supported() {
            return Err(GitError::CommandFailed(format!(
                "git {} is too old; {}.{} or newer is required",
                version, MIN_GIT_VERSION.0, MIN_GIT_VERSION.1
            )));
        }

        Ok(version)
    }
}

impl std::fmt::Display for GitVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
