//! Package records and the accumulating discovery catalog.
//!
//! A [`Package`] is one installable version of one package, synthesized from
//! a manifest plus a resolved version; once inserted into the
//! [`PackageCatalog`] it is never mutated or removed. The catalog preserves
//! insertion order (iterating twice yields the same sequence) and enforces
//! the uniqueness invariant: within one catalog the pair
//! `(name, version_normalized)` appears at most once, and the first record
//! discovered for a pair wins.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::manifest::Location;

/// One installable version of one package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    /// Package name the record is indexed under
    pub name: String,
    /// Human-facing version string (e.g. `v1.2.0`, `dev-main`)
    pub version: String,
    /// Canonical version identifier used for ordering and conflicts
    pub version_normalized: String,
    /// Downloadable-archive reference, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist: Option<Location>,
    /// Version-control reference for this version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Location>,
    /// Sub-directory the package lives in, for monorepo fan-out entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    /// Manifest keys discovery did not interpret, passed through opaquely
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Insertion-ordered set of discovered packages with conflict lookup.
#[derive(Debug, Default)]
pub struct PackageCatalog {
    packages: Vec<Package>,
    // (name, version_normalized) -> index into `packages`
    index: HashMap<(String, String), usize>,
}

impl PackageCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a package, unless its `(name, version_normalized)` slot is
    /// already taken.
    ///
    /// Returns `true` when the package was inserted, `false` when an
    /// existing record won the slot. Existing records are never overwritten.
    pub fn insert(&mut self, package: Package) -> bool {
        let slot = (package.name.clone(), package.version_normalized.clone());
        if self.index.contains_key(&slot) {
            return false;
        }
        self.index.insert(slot, self.packages.len());
        self.packages.push(package);
        true
    }

    /// Look up a record by name and normalized version.
    #[must_use]
    pub fn find(&self, name: &str, version_normalized: &str) -> Option<&Package> {
        self.index
            .get(&(name.to_string(), version_normalized.to_string()))
            .map(|&i| &self.packages[i])
    }

    /// All discovered packages, in insertion order.
    #[must_use]
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Number of discovered packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether nothing has been discovered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Consume the catalog, yielding the ordered package records.
    #[must_use]
    pub fn into_packages(self) -> Vec<Package> {
        self.packages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(name: &str, version: &str, normalized: &str) -> Package {
        Package {
            name: name.to_string(),
            version: version.to_string(),
            version_normalized: normalized.to_string(),
            dist: None,
            source: None,
            base_path: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn first_writer_wins() {
        let mut catalog = PackageCatalog::new();
        assert!(catalog.insert(package("acme/widget", "1.2.0", "1.2.0.0")));
        assert!(!catalog.insert(package("acme/widget", "v1.2.0", "1.2.0.0")));

        assert_eq!(catalog.len(), 1);
        let found = catalog.find("acme/widget", "1.2.0.0").unwrap();
        assert_eq!(found.version, "1.2.0");
    }

    #[test]
    fn same_version_different_names_coexist() {
        let mut catalog = PackageCatalog::new();
        assert!(catalog.insert(package("acme/widget", "1.0.0", "1.0.0.0")));
        assert!(catalog.insert(package("acme/gadget", "1.0.0", "1.0.0.0")));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn iteration_order_is_stable() {
        let mut catalog = PackageCatalog::new();
        for v in ["3.0.0", "1.0.0", "2.0.0"] {
            catalog.insert(package("acme/widget", v, &format!("{v}.0")));
        }
        let first: Vec<_> = catalog.packages().iter().map(|p| p.version.clone()).collect();
        let second: Vec<_> = catalog.packages().iter().map(|p| p.version.clone()).collect();
        assert_eq!(first, vec!["3.0.0", "1.0.0", "2.0.0"]);
        assert_eq!(first, second);
    }

    #[test]
    fn find_misses_return_none() {
        let catalog = PackageCatalog::new();
        assert!(catalog.find("acme/widget", "1.0.0.0").is_none());
    }
}
