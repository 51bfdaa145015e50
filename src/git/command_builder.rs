//! Builder for git command execution.
//!
//! Centralizes subprocess handling for every git invocation in the crate:
//! argument assembly, working directory via `git -C`, output capture,
//! timeouts, and mapping of failures onto [`IndexError`] variants. All
//! execution is async on top of [`tokio::process::Command`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use vcs_index::git::command_builder::GitCommand;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let head = GitCommand::new()
//!     .args(["symbolic-ref", "--short", "HEAD"])
//!     .current_dir("/path/to/mirror")
//!     .execute_stdout()
//!     .await?;
//! println!("default branch: {head}");
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::IndexError;

/// A git command ready to be executed.
///
/// Commands default to captured output and a five minute timeout, enough for
/// mirror clones of large repositories while still failing fast on hung
/// authentication prompts.
pub struct GitCommand {
    /// Arguments passed to git (e.g. `["clone", "--mirror", url, path]`)
    args: Vec<String>,
    /// Working directory, passed as `git -C <dir>` so execution is
    /// independent of the process cwd
    current_dir: Option<PathBuf>,
    /// Maximum duration to wait for completion
    timeout_duration: Option<Duration>,
    /// For clone commands, the URL for better error messages
    clone_url: Option<String>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            timeout_duration: Some(Duration::from_secs(300)),
            clone_url: None,
        }
    }
}

impl GitCommand {
    /// Create an empty command builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory the command runs in.
    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Override the default timeout.
    #[must_use]
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout_duration = Some(duration);
        self
    }

    /// Execute the command, capturing output.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::GitCloneFailed`] for failed clones and
    /// [`IndexError::GitCommandError`] for every other non-zero exit or
    /// timeout.
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.clone());

        tracing::debug!(target: "git", "executing: git {}", full_args.join(" "));

        let mut cmd = Command::new("git");
        cmd.args(&full_args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // Never fall into an interactive credential prompt during a scan.
        cmd.env("GIT_TERMINAL_PROMPT", "0");

        let operation = self
            .args
            .first()
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());

        let output_future = cmd.output();
        let output = if let Some(duration) = self.timeout_duration {
            match timeout(duration, output_future).await {
                Ok(result) => result
                    .context(format!("failed to execute git {}", full_args.join(" ")))?,
                Err(_) => {
                    tracing::warn!(
                        target: "git",
                        "command timed out after {}s: git {}",
                        duration.as_secs(),
                        full_args.join(" ")
                    );
                    return Err(IndexError::GitCommandError {
                        operation,
                        stderr: format!(
                            "git command timed out after {} seconds",
                            duration.as_secs()
                        ),
                    }
                    .into());
                }
            }
        } else {
            output_future
                .await
                .context(format!("failed to execute git {}", full_args.join(" ")))?
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            tracing::debug!(
                target: "git",
                "command failed with exit code {:?}: {}",
                output.status.code(),
                stderr.trim()
            );

            let error = if operation == "clone" {
                IndexError::GitCloneFailed {
                    url: self.clone_url.unwrap_or_else(|| "unknown".to_string()),
                    reason: stderr,
                }
            } else {
                IndexError::GitCommandError { operation, stderr }
            };
            return Err(error.into());
        }

        Ok(GitCommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Execute and return trimmed stdout.
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Execute, keeping only success or failure.
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }
}

/// Captured output of a completed git command.
#[derive(Debug)]
pub struct GitCommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

// Convenience builders for the operations discovery needs.

impl GitCommand {
    /// `git clone --mirror <url> <target>`: bare mirror with all refs.
    #[must_use]
    pub fn clone_mirror(url: &str, target: impl AsRef<Path>) -> Self {
        let mut cmd = Self::new()
            .args(["clone", "--mirror"])
            .arg(url)
            .arg(target.as_ref().display().to_string());
        cmd.clone_url = Some(url.to_string());
        cmd
    }

    /// `git remote update --prune`: refresh all refs of a mirror.
    #[must_use]
    pub fn update_mirror() -> Self {
        Self::new().args(["remote", "update", "--prune"])
    }

    /// `git for-each-ref --format=... <pattern>`: list refs with their
    /// revision ids, sorted by ref name.
    #[must_use]
    pub fn for_each_ref(pattern: &str) -> Self {
        Self::new()
            .args([
                "for-each-ref",
                "--sort=refname",
                "--format=%(refname:short) %(objectname)",
            ])
            .arg(pattern)
    }

    /// `git show <revision>:<path>`: file content at a revision.
    #[must_use]
    pub fn show_file(revision: &str, path: &str) -> Self {
        Self::new().arg("show").arg(format!("{revision}:{path}"))
    }

    /// `git symbolic-ref --short HEAD`: name of the primary branch.
    #[must_use]
    pub fn head_branch() -> Self {
        Self::new().args(["symbolic-ref", "--short", "HEAD"])
    }

    /// `git ls-remote --heads <url>`: cheap reachability probe.
    #[must_use]
    pub fn ls_remote(url: &str) -> Self {
        Self::new()
            .args(["ls-remote", "--heads"])
            .arg(url)
            .timeout(Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn version_command_succeeds() {
        let output = GitCommand::new().arg("--version").execute().await.unwrap();
        assert!(output.stdout.contains("git version"));
    }

    #[tokio::test]
    async fn failed_command_maps_to_typed_error() {
        let err = GitCommand::new()
            .args(["rev-parse", "HEAD"])
            .current_dir(std::env::temp_dir())
            .execute()
            .await
            .unwrap_err();
        let index_err = err.downcast_ref::<IndexError>().unwrap();
        assert!(matches!(index_err, IndexError::GitCommandError { .. }));
    }
}
