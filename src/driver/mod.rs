//! Repository driver capability and driver selection.
//!
//! A [`RepositoryDriver`] is the narrow interface discovery consumes: list
//! tags and branches as ordered `(name, revision)` pairs, read one file at a
//! revision, synthesize default dist/source locations, and clean up per-scan
//! resources. The engine never sees a VCS protocol, only this capability.
//!
//! # Driver selection
//!
//! [`DriverRegistry`] holds an ordered list of predicate-guarded factories.
//! Selection for a repository config runs in three stages:
//!
//! 1. an explicit `kind` in the config short-circuits to the factory with
//!    that name;
//! 2. a first pass asks each factory `supports(url, deep = false)`: cheap,
//!    purely syntactic checks;
//! 3. a second pass asks `supports(url, deep = true)`, where factories may
//!    probe the network (e.g. `git ls-remote`).
//!
//! The two-pass fallback matters: permissive drivers that would claim almost
//! any URL must only be tried after every cheap match has failed, so they
//! are registered last and only win on the deep pass.

pub mod git;

use async_trait::async_trait;

use crate::core::{IndexError, Result};
use crate::discovery::RepositoryConfig;
use crate::manifest::Location;

pub use git::{GitDriver, GitDriverFactory};

/// Capability consumed by the discovery engine.
///
/// Implementations must classify "nothing at this path/revision" as
/// `Ok(None)` from [`file_content`](Self::file_content); errors are reserved
/// for transport and repository failures.
#[async_trait]
pub trait RepositoryDriver: std::fmt::Debug + Send + Sync {
    /// The repository URL this driver was initialized for.
    fn url(&self) -> &str;

    /// Tags as ordered `(name, revision id)` pairs.
    async fn tags(&self) -> Result<Vec<(String, String)>>;

    /// Branches as ordered `(name, revision id)` pairs.
    async fn branches(&self) -> Result<Vec<(String, String)>>;

    /// Identifier of the repository root (the primary branch).
    async fn root_identifier(&self) -> Result<String>;

    /// Content of one file at a revision, or `None` when the path does not
    /// exist there.
    async fn file_content(&self, path: &str, revision: &str) -> Result<Option<Vec<u8>>>;

    /// Default dist location for a revision, when the driver can provide
    /// one.
    fn synthetic_dist(&self, revision: &str) -> Option<Location>;

    /// Default source location for a revision.
    fn synthetic_source(&self, revision: &str) -> Option<Location>;

    /// Release per-scan resources (temporary checkouts and the like).
    async fn cleanup(&self) -> Result<()>;
}

/// Creates drivers for URLs it recognizes.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Name matched against an explicit `kind` in the repository config.
    fn kind(&self) -> &'static str;

    /// Whether this factory claims `url`. With `deep` set the check may be
    /// expensive (network probes); without it must stay syntactic.
    async fn supports(&self, url: &str, deep: bool) -> bool;

    /// Initialize a driver for the repository.
    async fn create(&self, config: &RepositoryConfig) -> Result<Box<dyn RepositoryDriver>>;
}

/// Ordered collection of driver factories.
pub struct DriverRegistry {
    factories: Vec<Box<dyn DriverFactory>>,
}

impl DriverRegistry {
    /// Empty registry; use [`register`](Self::register) to add factories in
    /// priority order.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Registry with the built-in drivers.
    #[must_use]
    pub fn with_default_drivers() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(GitDriverFactory));
        registry
    }

    /// Append a factory. Order is priority: permissive factories belong
    /// last.
    pub fn register(&mut self, factory: Box<dyn DriverFactory>) {
        self.factories.push(factory);
    }

    /// Select and initialize a driver for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NoDriverFound`] when no factory claims the URL
    /// on either pass, or the selected factory's initialization error.
    pub async fn driver_for(&self, config: &RepositoryConfig) -> Result<Box<dyn RepositoryDriver>> {
        if let Some(kind) = &config.kind {
            for factory in &self.factories {
                if factory.kind() == kind {
                    return factory.create(config).await;
                }
            }
            return Err(IndexError::NoDriverFound {
                url: config.url.clone(),
            }
            .into());
        }

        for deep in [false, true] {
            for factory in &self.factories {
                if factory.supports(&config.url, deep).await {
                    tracing::debug!(
                        "driver '{}' claimed {} (deep: {deep})",
                        factory.kind(),
                        config.url
                    );
                    return factory.create(config).await;
                }
            }
        }

        Err(IndexError::NoDriverFound {
            url: config.url.clone(),
        }
        .into())
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_default_drivers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingFactory {
        kind: &'static str,
        shallow: bool,
        deep: bool,
    }

    #[async_trait]
    impl DriverFactory for RecordingFactory {
        fn kind(&self) -> &'static str {
            self.kind
        }

        async fn supports(&self, _url: &str, deep: bool) -> bool {
            if deep { self.deep } else { self.shallow }
        }

        async fn create(&self, config: &RepositoryConfig) -> Result<Box<dyn RepositoryDriver>> {
            Err(anyhow::anyhow!("{} claimed {}", self.kind, config.url))
        }
    }

    fn config(url: &str) -> RepositoryConfig {
        RepositoryConfig::new(url)
    }

    #[tokio::test]
    async fn explicit_kind_short_circuits() {
        let mut registry = DriverRegistry::new();
        registry.register(Box::new(RecordingFactory {
            kind: "hg",
            shallow: true,
            deep: true,
        }));
        registry.register(Box::new(RecordingFactory {
            kind: "svn",
            shallow: false,
            deep: false,
        }));

        let mut cfg = config("https://example.com/repo");
        cfg.kind = Some("svn".to_string());
        let err = registry.driver_for(&cfg).await.unwrap_err();
        assert!(err.to_string().contains("svn claimed"));
    }

    #[tokio::test]
    async fn shallow_pass_wins_over_deep_only_factories() {
        let mut registry = DriverRegistry::new();
        // Registered first, but only claims URLs on the deep pass.
        registry.register(Box::new(RecordingFactory {
            kind: "fallback",
            shallow: false,
            deep: true,
        }));
        registry.register(Box::new(RecordingFactory {
            kind: "git",
            shallow: true,
            deep: true,
        }));

        let err = registry.driver_for(&config("https://example.com/repo")).await.unwrap_err();
        assert!(err.to_string().contains("git claimed"));
    }

    #[tokio::test]
    async fn deep_pass_runs_when_nothing_matches_shallow() {
        let mut registry = DriverRegistry::new();
        registry.register(Box::new(RecordingFactory {
            kind: "fallback",
            shallow: false,
            deep: true,
        }));

        let err = registry.driver_for(&config("https://example.com/repo")).await.unwrap_err();
        assert!(err.to_string().contains("fallback claimed"));
    }

    #[tokio::test]
    async fn unclaimed_urls_are_an_error() {
        let mut registry = DriverRegistry::new();
        registry.register(Box::new(RecordingFactory {
            kind: "git",
            shallow: false,
            deep: false,
        }));

        let err = registry.driver_for(&config("mailto:nobody@example.com")).await.unwrap_err();
        let index_err = err.downcast_ref::<IndexError>().unwrap();
        assert!(matches!(index_err, IndexError::NoDriverFound { .. }));
    }

    #[tokio::test]
    async fn unknown_explicit_kind_is_an_error() {
        let registry = DriverRegistry::with_default_drivers();
        let mut cfg = config("https://example.com/repo.git");
        cfg.kind = Some("fossil".to_string());
        let err = registry.driver_for(&cfg).await.unwrap_err();
        let index_err = err.downcast_ref::<IndexError>().unwrap();
        assert!(matches!(index_err, IndexError::NoDriverFound { .. }));
    }
}
