//! System-git wrapper used by the reference repository driver.
//!
//! Like Cargo with `git-fetch-with-cli`, this crate shells out to the
//! system `git` binary rather than embedding a git implementation. That
//! keeps authentication (SSH agents, credential helpers, platform keychains)
//! and protocol support exactly as the user has configured them, and it
//! means discovery works against any transport the local git does.
//!
//! The model is a **bare mirror** per repository URL: [`GitRepo::mirror`]
//! clones with `--mirror` into a cache directory on first use and refreshes
//! refs with `remote update --prune` on later scans. All ref listing and
//! file reads then run locally against the mirror, so discovery pays the
//! network cost once per scan, not once per revision.
//!
//! All operations are async on tokio via [`command_builder::GitCommand`].

pub mod command_builder;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::IndexError;
use command_builder::GitCommand;

/// Handle to a local bare mirror of a repository.
#[derive(Debug, Clone)]
pub struct GitRepo {
    /// Filesystem path of the mirror
    path: PathBuf,
}

impl GitRepo {
    /// Wrap an existing mirror directory.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The mirror's filesystem path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure a fresh mirror of `url` exists at `target`.
    ///
    /// Clones with `--mirror` when the directory is missing, otherwise
    /// refreshes all refs with `remote update --prune` so deleted upstream
    /// refs disappear locally too.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::GitCloneFailed`] when the initial clone fails
    /// and [`IndexError::GitCommandError`] when a refresh fails.
    pub async fn mirror(url: &str, target: impl AsRef<Path>) -> Result<Self> {
        let target = target.as_ref();
        if target.join("HEAD").is_file() {
            GitCommand::update_mirror()
                .current_dir(target)
                .execute_success()
                .await?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            GitCommand::clone_mirror(url, target).execute().await?;
        }
        Ok(Self::new(target))
    }

    /// List tags as ordered `(name, revision)` pairs, sorted by tag name.
    ///
    /// For annotated tags the revision is the tag object id; git resolves it
    /// transparently wherever a revision is accepted.
    pub async fn tags(&self) -> Result<Vec<(String, String)>> {
        self.refs("refs/tags").await
    }

    /// List branches as ordered `(name, revision)` pairs, sorted by name.
    pub async fn branches(&self) -> Result<Vec<(String, String)>> {
        self.refs("refs/heads").await
    }

    async fn refs(&self, pattern: &str) -> Result<Vec<(String, String)>> {
        let stdout = GitCommand::for_each_ref(pattern)
            .current_dir(&self.path)
            .execute_stdout()
            .await?;
        Ok(stdout
            .lines()
            .filter_map(|line| {
                let (name, revision) = line.rsplit_once(' ')?;
                Some((name.to_string(), revision.to_string()))
            })
            .collect())
    }

    /// Name of the branch HEAD points at (the primary branch).
    pub async fn head_branch(&self) -> Result<String> {
        GitCommand::head_branch()
            .current_dir(&self.path)
            .execute_stdout()
            .await
    }

    /// Read one file's content at a revision.
    ///
    /// Returns `Ok(None)` when the path does not exist in the revision's
    /// tree; every other git failure is an error.
    pub async fn file_at_revision(&self, revision: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let result = GitCommand::show_file(revision, path)
            .current_dir(&self.path)
            .execute()
            .await;
        match result {
            Ok(output) => Ok(Some(output.stdout.into_bytes())),
            Err(err) => {
                if let Some(IndexError::GitCommandError { stderr, .. }) =
                    err.downcast_ref::<IndexError>()
                {
                    if is_missing_path(stderr) {
                        return Ok(None);
                    }
                }
                Err(err)
            }
        }
    }

    /// Whether `git ls-remote` can reach `url`.
    pub async fn probe_remote(url: &str) -> bool {
        GitCommand::ls_remote(url).execute().await.is_ok()
    }
}

// `git show rev:path` failure modes that mean "path not in this tree" rather
// than a broken repository or transport.
fn is_missing_path(stderr: &str) -> bool {
    stderr.contains("does not exist")
        || stderr.contains("exists on disk, but not in")
        || stderr.contains("invalid object name")
}

/// Whether a git executable is available on PATH.
#[must_use]
pub fn is_git_installed() -> bool {
    which::which("git").is_ok()
}

/// Fail early with [`IndexError::GitNotFound`] when git is missing.
pub fn ensure_git_available() -> Result<()> {
    if is_git_installed() {
        Ok(())
    } else {
        Err(IndexError::GitNotFound.into())
    }
}

/// Extract `(owner, repo)` from common git URL shapes for cache directory
/// naming. Falls back to a sanitized rendering of the whole URL.
#[must_use]
pub fn parse_git_url(url: &str) -> (String, String) {
    let trimmed = url.trim_end_matches('/').trim_end_matches(".git");
    // git@host:owner/repo
    let path = trimmed
        .rsplit_once(':')
        .map_or(trimmed, |(_, path)| path);
    let mut segments = path.rsplit('/');
    let repo = segments.next().unwrap_or_default();
    let owner = segments.next().unwrap_or_default();
    if repo.is_empty() || owner.is_empty() || owner.contains("//") {
        ("unknown".to_string(), sanitize(trimmed))
    } else {
        (sanitize(owner), sanitize(repo))
    }
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
            c
        } else {
            '-'
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_https_urls() {
        let (owner, repo) = parse_git_url("https://github.com/acme/widget.git");
        assert_eq!(owner, "acme");
        assert_eq!(repo, "widget");
    }

    #[test]
    fn parses_ssh_urls() {
        let (owner, repo) = parse_git_url("git@github.com:acme/widget.git");
        assert_eq!(owner, "acme");
        assert_eq!(repo, "widget");
    }

    #[test]
    fn parses_file_urls() {
        let (owner, repo) = parse_git_url("file:///srv/repos/widget.git");
        assert_eq!(owner, "repos");
        assert_eq!(repo, "widget");
    }

    #[test]
    fn odd_urls_fall_back_to_sanitized_form() {
        let (owner, repo) = parse_git_url("widget");
        assert_eq!(owner, "unknown");
        assert_eq!(repo, "widget");
    }

    #[test]
    fn missing_path_detection() {
        assert!(is_missing_path(
            "fatal: path 'package.json' does not exist in 'v1.0.0'"
        ));
        assert!(is_missing_path(
            "fatal: path 'x' exists on disk, but not in 'v1.0.0'"
        ));
        assert!(!is_missing_path("fatal: not a git repository"));
    }
}
