//! Reference driver: git over the system binary.
//!
//! Backed by a per-URL bare mirror (see [`crate::git`]). Initialization
//! clones or refreshes the mirror (the single network round-trip of a scan)
//! and every later call, ref listing and file reads alike, runs locally
//! against it.
//!
//! Mirrors live under the configured cache directory, or the platform cache
//! dir (`~/.cache/vcs-index/mirrors` on Linux) when none is given,
//! named `{owner}_{repo}` the way the URL parses.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::core::Result;
use crate::discovery::RepositoryConfig;
use crate::git::{GitRepo, ensure_git_available, parse_git_url};
use crate::manifest::Location;

use super::{DriverFactory, RepositoryDriver};

/// Git repository driver over a local bare mirror.
#[derive(Debug)]
pub struct GitDriver {
    url: String,
    repo: GitRepo,
}

impl GitDriver {
    /// Clone or refresh the mirror for `config.url` and wrap it.
    ///
    /// # Errors
    ///
    /// Fails when git is not installed or the mirror cannot be created.
    pub async fn initialize(config: &RepositoryConfig) -> Result<Self> {
        ensure_git_available()?;
        let mirror_path = mirror_path(config);
        let repo = GitRepo::mirror(&config.url, &mirror_path).await?;
        Ok(Self {
            url: config.url.clone(),
            repo,
        })
    }
}

fn mirror_path(config: &RepositoryConfig) -> PathBuf {
    let base = config.cache_dir.clone().unwrap_or_else(|| {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("vcs-index")
    });
    let (owner, repo) = parse_git_url(&config.url);
    base.join("mirrors").join(format!("{owner}_{repo}"))
}

#[async_trait]
impl RepositoryDriver for GitDriver {
    fn url(&self) -> &str {
        &self.url
    }

    async fn tags(&self) -> Result<Vec<(String, String)>> {
        self.repo.tags().await
    }

    async fn branches(&self) -> Result<Vec<(String, String)>> {
        self.repo.branches().await
    }

    async fn root_identifier(&self) -> Result<String> {
        self.repo.head_branch().await
    }

    async fn file_content(&self, path: &str, revision: &str) -> Result<Option<Vec<u8>>> {
        self.repo.file_at_revision(revision, path).await
    }

    fn synthetic_dist(&self, _revision: &str) -> Option<Location> {
        // Plain git has no archive endpoint to point a dist at.
        None
    }

    fn synthetic_source(&self, revision: &str) -> Option<Location> {
        Some(Location {
            kind: "git".to_string(),
            url: self.url.clone(),
            reference: Some(revision.to_string()),
        })
    }

    async fn cleanup(&self) -> Result<()> {
        // The mirror doubles as the cross-scan cache; nothing to release.
        Ok(())
    }
}

/// Factory for [`GitDriver`].
///
/// The shallow pass claims URLs that are unambiguously git (`.git` suffix,
/// `git://` or `git@` addressing, local paths holding a repository). The
/// deep pass probes the remote with `git ls-remote`, which claims anything
/// the local git can actually talk to. That is permissive, so this factory should
/// sit late in the registry once other VCS factories exist.
pub struct GitDriverFactory;

#[async_trait]
impl DriverFactory for GitDriverFactory {
    fn kind(&self) -> &'static str {
        "git"
    }

    async fn supports(&self, url: &str, deep: bool) -> bool {
        if looks_like_git_url(url) {
            return true;
        }
        if deep && ensure_git_available().is_ok() {
            return GitRepo::probe_remote(url).await;
        }
        false
    }

    async fn create(&self, config: &RepositoryConfig) -> Result<Box<dyn RepositoryDriver>> {
        Ok(Box::new(GitDriver::initialize(config).await?))
    }
}

fn looks_like_git_url(url: &str) -> bool {
    if url.ends_with(".git") || url.starts_with("git://") || url.starts_with("git@") {
        return true;
    }
    // Local repositories: a directory with a HEAD file (bare or mirror)
    // or a .git subdirectory.
    let path = url.strip_prefix("file://").unwrap_or(url);
    let path = std::path::Path::new(path);
    path.join(".git").is_dir() || path.join("HEAD").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_git_urls_syntactically() {
        assert!(looks_like_git_url("https://github.com/acme/widget.git"));
        assert!(looks_like_git_url("git://example.com/widget"));
        assert!(looks_like_git_url("git@github.com:acme/widget.git"));
        assert!(!looks_like_git_url("https://example.com/widget"));
        assert!(!looks_like_git_url("/nonexistent/path"));
    }

    #[test]
    fn mirror_paths_are_scoped_per_repository() {
        let mut config = RepositoryConfig::new("https://github.com/acme/widget.git");
        config.cache_dir = Some(PathBuf::from("/tmp/vcs-index-test"));
        let a = mirror_path(&config);

        config.url = "https://github.com/acme/gadget.git".to_string();
        let b = mirror_path(&config);

        assert_ne!(a, b);
        assert!(a.ends_with("mirrors/acme_widget"));
    }
}
