use crate::error::{GitError, GitResult};
use crate::git::log::CommandLog;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Flags injected ahead of every subcommand: unquoted pathnames for
/// machine-parseable output, and no optional lock files so concurrent
/// status reads never contend with the filesystem watcher.
const BASE_ARGS: [&str; 3] = ["-c", "core.quotepath=false", "--no-optional-locks"];

/// Result of one completed external invocation.
///
/// A non-zero exit code is data, not an error; call sites interpret it
/// (e.g. a failed `rev-parse --show-toplevel` means "not a repository").
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs git commands in one working directory, streaming output lines
/// through an optional filter.
///
/// Every invocation appends a `">> git <args>"` record to the shared
/// [`CommandLog`] before the process starts. The returned future resolves
/// only after both output streams hit EOF *and* the process has exited, so
/// the captured output is never truncated by late-arriving lines.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    working_dir: PathBuf,
    program: String,
    log: CommandLog,
}

impl CommandRunner {
    pub fn new<P: AsRef<Path>>(working_dir: P, log: CommandLog) -> Self {
        Self::with_program(working_dir, "git", log)
    }

    pub fn with_program<P: AsRef<Path>>(working_dir: P, program: &str, log: CommandLog) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            program: program.to_string(),
            log,
        }
    }

    /// Run a git command, aggregating every stdout and stderr line.
    pub async fn run(&self, args: &[&str]) -> GitResult<CommandResult> {
        self.run_filtered(args, |_, _| true).await
    }

    /// Run a git command, calling `filter(is_stderr, line)` for each output
    /// line as it arrives. Returning `false` drops the line from the
    /// aggregated output; the filter may have already routed it elsewhere
    /// (typically into the invocation log).
    pub async fn run_filtered<F>(&self, args: &[&str], mut filter: F) -> GitResult<CommandResult>
    where
        F: FnMut(bool, &str) -> bool + Send,
    {
        self.log
            .push(format!(">> {} {}", self.program, args.join(" ")));

        let mut child = Command::new(&self.program)
            .args(BASE_ARGS)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GitError::Spawn(format!("{} {}: {}", self.program, args.join(" "), e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GitError::Spawn("stdout pipe missing".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| GitError::Spawn("stderr pipe missing".to_string()))?;

        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();

        let mut captured = String::new();
        let mut out_done = false;
        let mut err_done = false;

        // Drain both streams to EOF before waiting on the child; exit alone
        // does not imply the pipes are empty.
        while !(out_done && err_done) {
            tokio::select! {
                line = out_lines.next_line(), if !out_done => match line? {
                    Some(l) => {
                        if filter(false, &l) {
                            captured.push_str(&l);
                            captured.push('\n');
                        }
                    }
                    None => out_done = true,
                },
                line = err_lines.next_line(), if !err_done => match line? {
                    Some(l) => {
                        if filter(true, &l) {
                            captured.push_str(&l);
                            captured.push('\n');
                        }
                    }
                    None => err_done = true,
                },
            }
        }

        let status = child.wait().await?;

        Ok(CommandResult {
            exit_code: status.code().unwrap_or(-1),
            stdout: captured,
        })
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}
