//! vcs-index: package-version discovery from VCS tags and branches.
//!
//! This crate scans a version-control repository, treats every tag and
//! branch as a candidate package version, reads the package manifest at each
//! revision, validates and normalizes the version, and synthesizes an
//! in-memory catalog of concrete package records suitable for dependency
//! resolution. It is built to survive arbitrarily messy repositories:
//! malformed manifests, tags that lie about their version, duplicate
//! versions across refs, and flaky transports are all isolated per ref and
//! reported as warnings; only a repository with *no* usable manifest
//! anywhere fails a scan.
//!
//! # Architecture
//!
//! Discovery is a pipeline of narrow components, leaf-first:
//!
//! - [`version`]: pure normalization of raw tag/branch strings into
//!   canonical, comparable version identifiers
//! - [`manifest`]: the untyped JSON descriptor read at one revision, with
//!   accessors for the keys discovery consumes
//! - [`cache`]: repository-scoped manifest byte cache; immutable (tag)
//!   revisions only, a pure latency optimization
//! - [`loader`]: synthesis of one immutable package record from a manifest
//!   plus a resolved version
//! - [`catalog`]: the insertion-ordered record set with
//!   `(name, normalized version)` conflict lookup
//! - [`driver`]: the repository capability (list refs, read files,
//!   synthesize locations) with predicate-guarded driver selection and a
//!   git reference adapter
//! - [`discovery`]: the orchestrating engine running the tag pass, branch
//!   pass, monorepo fan-out, and failure isolation
//!
//! The [`git`] module wraps the system `git` binary (mirror clones, ref
//! listing, file reads) for the reference driver; [`cli`] and [`core`] hold
//! the command-line surface and the shared error taxonomy.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vcs_index::cache::ManifestCache;
//! use vcs_index::discovery::{self, RepositoryConfig};
//! use vcs_index::driver::DriverRegistry;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = DriverRegistry::with_default_drivers();
//! let cache = Arc::new(ManifestCache::new());
//!
//! let config = RepositoryConfig::new("https://github.com/acme/widget.git");
//! let result = discovery::scan(config, &registry, cache).await?;
//!
//! for package in &result.packages {
//!     println!("{} {}", package.name, package.version);
//! }
//! eprintln!("{} revisions held no manifest", result.empty_references.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod core;
pub mod discovery;
pub mod driver;
pub mod git;
pub mod loader;
pub mod manifest;
pub mod version;
