//! Version-control accessor.
//!
//! [`GitRunner`] is the only way the rest of the crate talks to git: run a
//! subcommand against a repository path, get stdout back or a [`GitError`].
//! It never interprets output and never retries.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

/// How a command's output is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// stdout/stderr are captured; stdout is returned for decision logic.
    Captured,
    /// stdout/stderr go straight to the operator's terminal; nothing is returned.
    Streamed,
}

#[derive(Debug, Error)]
pub enum GitError {
    /// The git binary could not be started.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// git ran and exited non-zero. Output is empty in streamed mode.
    #[error("`{command}` failed in {repo} (status {status}){}", render_output(.stdout, .stderr))]
    Failed {
        command: String,
        repo: PathBuf,
        status: String,
        stdout: String,
        stderr: String,
    },
}

impl GitError {
    /// Combined captured output, stdout first.
    pub fn output(&self) -> String {
        match self {
            GitError::Spawn { source, .. } => source.to_string(),
            GitError::Failed { stdout, stderr, .. } => format!("{stdout}{stderr}"),
        }
    }
}

fn render_output(stdout: &str, stderr: &str) -> String {
    let combined = format!("{stdout}{stderr}");
    let trimmed = combined.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{trimmed}")
    }
}

pub trait GitRunner {
    /// Run `git <args>` against `repo`.
    fn run(&self, repo: &Path, args: &[&str], mode: OutputMode) -> Result<String, GitError>;
}

/// Shells out to the system `git` binary as `git -C <repo> <args>`.
#[derive(Debug, Clone)]
pub struct SystemGit {
    program: OsString,
}

impl Default for SystemGit {
    fn default() -> Self {
        Self {
            program: OsString::from("git"),
        }
    }
}

impl SystemGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git executable.
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl GitRunner for SystemGit {
    fn run(&self, repo: &Path, args: &[&str], mode: OutputMode) -> Result<String, GitError> {
        let command = format!("git {}", args.join(" "));
        tracing::debug!(repo = %repo.display(), "{command}");

        let mut cmd = Command::new(&self.program);
        cmd.arg("-C").arg(repo).args(args);
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.stdin(Stdio::null());

        match mode {
            OutputMode::Captured => {
                let output = cmd.output().map_err(|source| GitError::Spawn {
                    command: command.clone(),
                    source,
                })?;
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                if !output.status.success() {
                    return Err(GitError::Failed {
                        command,
                        repo: repo.to_path_buf(),
                        status: output.status.to_string(),
                        stdout,
                        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    });
                }
                Ok(stdout)
            }
            OutputMode::Streamed => {
                let status = cmd
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()
                    .map_err(|source| GitError::Spawn {
                        command: command.clone(),
                        source,
                    })?;
                if !status.success() {
                    return Err(GitError::Failed {
                        command,
                        repo: repo.to_path_buf(),
                        status: status.to_string(),
                        stdout: String::new(),
                        stderr: String::new(),
                    });
                }
                Ok(String::new())
            }
        }
    }
}
