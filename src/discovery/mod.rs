//! The discovery engine: tag/branch enumeration, validation, and catalog
//! synthesis.
//!
//! One [`DiscoveryEngine`] instance performs one scan of one repository. The
//! scan walks every tag, then every branch, and for each ref:
//!
//! 1. **Fetch** the manifest at the ref's revision (through the shared
//!    [`ManifestCache`]);
//! 2. **Validate**: normalize the ref name, resolve the manual/auto
//!    version, reject mismatches and duplicates;
//! 3. **Synthesize** a package record via [`crate::loader`];
//! 4. **Insert** it into the insertion-ordered [`PackageCatalog`].
//!
//! When the root manifest of a ref declares monorepo sub-paths
//! (`config.monorepo`), steps 1–4 repeat once per sub-path with the manifest
//! path rebased into that directory, each pass contributing at most one
//! additional record that shares the ref's version and carries the sub-path
//! as its base path.
//!
//! # Failure isolation
//!
//! Every per-ref failure is caught at the ref boundary, logged as a warning
//! with the ref name and reason, and skipped. The distinctions that matter:
//!
//! - a revision with no manifest at all is remembered in the
//!   empty-reference side channel (useful for upstream negative caching);
//! - a malformed manifest on a *branch* additionally raises the
//!   catalog-wide branch-error flag the caller can surface as a warning;
//! - transport failures are split by their not-found flag into the two
//!   cases above.
//!
//! The only fatal outcome is an empty catalog after all refs are exhausted:
//! [`IndexError::EmptyCatalog`].
//!
//! # Concurrency
//!
//! A scan is logically sequential: duplicate detection depends on
//! everything discovered so far, and refs arrive pre-sorted by name so
//! "first writer wins" is reproducible across runs. Independent repository
//! scans share no mutable state beyond the (optional, correctness-neutral)
//! manifest cache and can run concurrently; the CLI does exactly that.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, warn};

use crate::cache::{CacheKey, ManifestCache};
use crate::catalog::{Package, PackageCatalog};
use crate::core::{IndexError, Result};
use crate::driver::{DriverRegistry, RepositoryDriver};
use crate::loader::{self, LoadContext};
use crate::manifest::Manifest;
use crate::version::{
    branch_pretty_version, normalize, normalize_branch, strip_dev_suffix_normalized,
    strip_dev_suffix_pretty,
};

/// Names that alias a repository's primary branch. They all normalize to the
/// development sentinel, so only one of them may contribute a record: the
/// branch HEAD points at when that is itself an alias, otherwise the first
/// alias present in this order.
const PRIMARY_BRANCH_ALIASES: [&str; 4] = ["master", "main", "trunk", "default"];

/// Whether a revision was reached through a tag or a branch.
///
/// Tags are immutable release pointers; branches are mutable development
/// lines. The distinction drives versioning rules and cacheability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// Immutable named pointer, conventionally a released version
    Tag,
    /// Mutable named pointer, conventionally an in-development line
    Branch,
}

impl RefKind {
    fn label(self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Branch => "branch",
        }
    }
}

/// Configuration for scanning one repository.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Repository URL
    pub url: String,
    /// Explicit driver kind; `None` lets the registry pick by URL
    pub kind: Option<String>,
    /// Canonical package name, overriding whatever the manifests declare
    pub package_name: Option<String>,
    /// Tag prefix marking release tags, stripped before interpretation
    pub release_prefix: Option<String>,
    /// Manifest file name read at each revision
    pub manifest_path: String,
    /// Directory for driver caches (mirrors); `None` uses the platform
    /// cache dir
    pub cache_dir: Option<PathBuf>,
}

impl RepositoryConfig {
    /// Config with conventional defaults: `package.json` manifests and the
    /// `release-` tag prefix convention.
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            kind: None,
            package_name: None,
            release_prefix: Some("release-".to_string()),
            manifest_path: "package.json".to_string(),
            cache_dir: None,
        }
    }
}

/// Output of one completed scan.
#[derive(Debug, Serialize)]
pub struct DiscoveryResult {
    /// Repository the scan ran against
    pub url: String,
    /// Discovered package records, in discovery order
    pub packages: Vec<Package>,
    /// Revision ids confirmed to hold no manifest, in discovery order
    pub empty_references: Vec<String>,
    /// Whether any branch failed with malformed-manifest severity
    pub branch_error_occurred: bool,
}

/// Scan one repository: select a driver, walk its refs, return the catalog.
///
/// # Errors
///
/// Fails when no driver claims the URL, when ref enumeration itself fails,
/// or, after all refs are processed, when zero packages were discovered
/// ([`IndexError::EmptyCatalog`]).
pub async fn scan(
    config: RepositoryConfig,
    registry: &DriverRegistry,
    cache: Arc<ManifestCache>,
) -> Result<DiscoveryResult> {
    let driver = registry.driver_for(&config).await?;
    DiscoveryEngine::new(config, driver, cache).run().await
}

/// Per-scan state: the driver, the accumulating catalog, and the failure
/// side channels. Owned exclusively by one scan; immutable once the scan
/// returns.
pub struct DiscoveryEngine {
    config: RepositoryConfig,
    driver: Box<dyn RepositoryDriver>,
    cache: Arc<ManifestCache>,
    catalog: PackageCatalog,
    empty_references: Vec<String>,
    branch_error_occurred: bool,
}

impl DiscoveryEngine {
    /// Build an engine around an already-initialized driver.
    #[must_use]
    pub fn new(
        config: RepositoryConfig,
        driver: Box<dyn RepositoryDriver>,
        cache: Arc<ManifestCache>,
    ) -> Self {
        Self {
            config,
            driver,
            cache,
            catalog: PackageCatalog::new(),
            empty_references: Vec::new(),
            branch_error_occurred: false,
        }
    }

    /// Run the scan to completion.
    pub async fn run(mut self) -> Result<DiscoveryResult> {
        let tags = self.driver.tags().await?;
        for (tag, revision) in &tags {
            if let Some(paths) = self.process_tag(tag, revision, "").await {
                self.fan_out(RefKind::Tag, tag, revision, paths).await;
            }
        }

        let branches = self.driver.branches().await?;
        let primary = self.primary_alias(&branches).await;
        for (branch, revision) in &branches {
            if PRIMARY_BRANCH_ALIASES.contains(&branch.as_str())
                && primary.as_deref() != Some(branch.as_str())
            {
                warn!(
                    "skipped branch {branch}, cannot process it alongside {} as both resolve to the same development version",
                    primary.as_deref().unwrap_or_default()
                );
                continue;
            }
            if let Some(paths) = self.process_branch(branch, revision, "").await {
                self.fan_out(RefKind::Branch, branch, revision, paths).await;
            }
        }

        if let Err(e) = self.driver.cleanup().await {
            warn!("driver cleanup failed for {}: {e}", self.config.url);
        }

        if self.catalog.is_empty() {
            return Err(IndexError::EmptyCatalog {
                url: self.config.url.clone(),
            }
            .into());
        }

        Ok(DiscoveryResult {
            url: self.config.url,
            packages: self.catalog.into_packages(),
            empty_references: self.empty_references,
            branch_error_occurred: self.branch_error_occurred,
        })
    }

    /// Which primary-branch alias may contribute a record.
    ///
    /// The branch HEAD points at wins when it is itself a present alias;
    /// otherwise the first present alias in [`PRIMARY_BRANCH_ALIASES`] order.
    async fn primary_alias(&self, branches: &[(String, String)]) -> Option<String> {
        let present = |name: &str| branches.iter().any(|(n, _)| n == name);
        if !PRIMARY_BRANCH_ALIASES.iter().any(|alias| present(alias)) {
            return None;
        }

        if let Ok(head) = self.driver.root_identifier().await {
            if PRIMARY_BRANCH_ALIASES.contains(&head.as_str()) && present(&head) {
                return Some(head);
            }
        }
        PRIMARY_BRANCH_ALIASES
            .iter()
            .find(|alias| present(alias))
            .map(|alias| (*alias).to_string())
    }

    /// Re-run ref processing once per monorepo sub-path the root manifest
    /// declared.
    async fn fan_out(
        &mut self,
        kind: RefKind,
        ref_name: &str,
        revision: &str,
        paths: BTreeMap<String, String>,
    ) {
        for (name, path) in paths {
            debug!(
                "reading manifest of {} ({name}) in folder {path} ({ref_name})",
                self.display_name()
            );
            match kind {
                RefKind::Tag => {
                    self.process_tag(ref_name, revision, &path).await;
                }
                RefKind::Branch => {
                    self.process_branch(ref_name, revision, &path).await;
                }
            }
        }
    }

    /// Validate one tag and synthesize its package record.
    ///
    /// Non-fatal on every failure path: logs a warning and returns. For the
    /// root pass a successfully fetched manifest yields its monorepo map, so
    /// the caller can fan out without re-reading the revision; validation
    /// failures after the fetch still yield it.
    async fn process_tag(
        &mut self,
        tag: &str,
        revision: &str,
        sub_path: &str,
    ) -> Option<BTreeMap<String, String>> {
        // A configured release prefix marks "this is a release tag"; the
        // remainder is the pure version string.
        let tag = self
            .config
            .release_prefix
            .as_deref()
            .and_then(|prefix| tag.strip_prefix(prefix))
            .unwrap_or(tag);

        let Ok(parsed_tag) = normalize(tag) else {
            warn!("skipped tag {tag}, invalid tag name");
            return None;
        };

        let manifest = match self.fetch_manifest(RefKind::Tag, revision, sub_path).await {
            Ok(Some(manifest)) => manifest,
            Ok(None) => {
                warn!("skipped tag {tag}, no manifest file");
                self.record_empty_reference(revision);
                return None;
            }
            Err(e) => {
                if e.is_not_found() {
                    self.record_empty_reference(revision);
                    warn!("skipped tag {tag}, no manifest file was found");
                } else {
                    warn!("skipped tag {tag}, {e}");
                }
                return None;
            }
        };
        let fan = sub_path.is_empty().then(|| manifest.monorepo_paths());

        // Manually versioned package, or auto-versioned from the tag name.
        let (version, version_normalized) = if let Some(declared) = manifest.version() {
            match normalize(declared) {
                Ok(normalized) => (declared.to_string(), normalized),
                Err(e) => {
                    warn!("skipped tag {tag}, {e}");
                    return fan;
                }
            }
        } else {
            (tag.to_string(), parsed_tag.clone())
        };

        // Tags represent immutable releases, never in-development markers.
        let version = strip_dev_suffix_pretty(&version);
        let version_normalized = strip_dev_suffix_normalized(&version_normalized);

        // Broken package: the manifest claims a different version than the
        // tag it is checked out at.
        if version_normalized != parsed_tag {
            warn!(
                "{}",
                IndexError::VersionMismatch {
                    tag: tag.to_string(),
                    tag_version: parsed_tag,
                    manifest_version: version_normalized,
                }
            );
            return fan;
        }

        debug!("importing tag {tag} ({version_normalized})");
        self.synthesize(manifest, tag, revision, sub_path, version, version_normalized, RefKind::Tag);
        fan
    }

    /// Validate one branch and synthesize its package record.
    ///
    /// Branches are always auto-versioned from the branch name; a manifest's
    /// declared version is never authoritative here. Malformed records raise
    /// the branch-error flag; transport failures do not.
    async fn process_branch(
        &mut self,
        branch: &str,
        revision: &str,
        sub_path: &str,
    ) -> Option<BTreeMap<String, String>> {
        debug!("reading manifest of {} ({branch})", self.display_name());

        let Ok(version_normalized) = normalize_branch(branch) else {
            warn!("skipped branch {branch}, invalid name");
            return None;
        };
        let version = branch_pretty_version(branch, &version_normalized);

        let manifest = match self.fetch_manifest(RefKind::Branch, revision, sub_path).await {
            Ok(Some(manifest)) => manifest,
            Ok(None) => {
                warn!("skipped branch {branch}, no manifest file");
                self.record_empty_reference(revision);
                return None;
            }
            Err(e) if e.is_not_found() => {
                self.record_empty_reference(revision);
                warn!("skipped branch {branch}, no manifest file was found");
                return None;
            }
            Err(e) if e.is_malformed() => {
                self.branch_error_occurred = true;
                error!("skipped branch {branch}, {e}");
                return None;
            }
            Err(e) => {
                warn!("skipped branch {branch}, {e}");
                return None;
            }
        };
        let fan = sub_path.is_empty().then(|| manifest.monorepo_paths());

        debug!("importing branch {branch} ({version})");
        self.synthesize(manifest, branch, revision, sub_path, version, version_normalized, RefKind::Branch);
        fan
    }

    /// Load a package record and insert it, applying the severity rules of
    /// the ref kind. A record whose `(name, normalized version)` slot is
    /// already taken is skipped with a warning naming the losing ref.
    fn synthesize(
        &mut self,
        manifest: Manifest,
        ref_name: &str,
        revision: &str,
        sub_path: &str,
        version: String,
        version_normalized: String,
        kind: RefKind,
    ) {
        let ctx = LoadContext {
            canonical_name: self.config.package_name.clone(),
            version,
            version_normalized,
            base_path: sub_path.to_string(),
            default_dist: self.driver.synthetic_dist(revision),
            default_source: self.driver.synthetic_source(revision),
            reference: revision.to_string(),
        };

        match loader::load(manifest, ctx) {
            Ok(package) => {
                if let Some(existing) = self.catalog.find(&package.name, &package.version_normalized)
                {
                    warn!(
                        "skipped {} {ref_name}, {}",
                        kind.label(),
                        IndexError::DuplicateVersion {
                            reference: ref_name.to_string(),
                            existing: existing.version.clone(),
                            normalized: package.version_normalized.clone(),
                        }
                    );
                } else {
                    self.catalog.insert(package);
                }
            }
            Err(e) => match kind {
                RefKind::Tag => warn!("skipped tag {ref_name}, {e}"),
                RefKind::Branch => {
                    self.branch_error_occurred = true;
                    error!("skipped branch {ref_name}, {e}");
                }
            },
        }
    }

    /// Fetch and parse the manifest at a revision, going through the cache
    /// for immutable refs.
    async fn fetch_manifest(
        &mut self,
        kind: RefKind,
        revision: &str,
        sub_path: &str,
    ) -> Result<Option<Manifest>, IndexError> {
        let path = if sub_path.is_empty() {
            self.config.manifest_path.clone()
        } else {
            format!(
                "{}/{}",
                sub_path.trim_end_matches('/'),
                self.config.manifest_path
            )
        };

        let key = CacheKey::new(&self.config.url, revision, &path, kind);
        if let Some(bytes) = self.cache.get(&key) {
            return Manifest::parse(&bytes, revision).map(Some);
        }

        let bytes = self
            .driver
            .file_content(&path, revision)
            .await
            .map_err(|e| self.classify_driver_error(e))?;
        let Some(bytes) = bytes else {
            return Ok(None);
        };

        let manifest = Manifest::parse(&bytes, revision)?;
        self.cache.put(key, bytes);
        Ok(Some(manifest))
    }

    /// Fold a driver failure into the [`IndexError`] taxonomy, preserving a
    /// typed error's classification.
    fn classify_driver_error(&self, error: anyhow::Error) -> IndexError {
        match error.downcast::<IndexError>() {
            Ok(typed) => typed,
            Err(other) => IndexError::Transport {
                url: self.config.url.clone(),
                reason: format!("{other:#}"),
                not_found: false,
            },
        }
    }

    fn record_empty_reference(&mut self, revision: &str) {
        if !self.empty_references.iter().any(|r| r == revision) {
            self.empty_references.push(revision.to_string());
        }
    }

    fn display_name(&self) -> &str {
        self.config
            .package_name
            .as_deref()
            .unwrap_or(&self.config.url)
    }
}
