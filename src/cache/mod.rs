//! Manifest byte cache keyed by repository-scoped revisions.
//!
//! Discovery costs one driver round-trip per ref; the cache removes repeat
//! fetches for revisions that can never change. It is a pure latency
//! optimization: a miss (or a disabled cache) changes nothing about
//! discovery results.
//!
//! # Cacheability policy
//!
//! Only content-addressed, immutable revisions are cached: the key must name
//! a tag ref whose revision is a full hex object id. Branch tips are mutable
//! between scans and are never cached: [`ManifestCache::get`] and
//! [`ManifestCache::put`] are deliberate no-ops for such keys, so a stale
//! branch manifest can never be read back.
//!
//! # Sharing
//!
//! Keys embed the repository URL, so a single cache can be shared (behind an
//! [`std::sync::Arc`]) across concurrent scans of different repositories
//! without revision-id collisions. The map itself is a [`DashMap`], safe for
//! concurrent readers and writers.

use dashmap::DashMap;

use crate::discovery::RefKind;

/// Identifies one cached manifest fetch.
///
/// Scoped by repository URL so revision ids from different repositories can
/// never collide, and by sub-path so monorepo fan-out entries cache
/// independently of the root manifest at the same revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// URL of the owning repository
    pub repo_url: String,
    /// Revision identifier the manifest was read at
    pub revision: String,
    /// Manifest path within the revision (includes any monorepo sub-path)
    pub path: String,
    /// Whether the revision was reached through a tag or a branch
    pub kind: RefKind,
}

impl CacheKey {
    /// Build a key for one manifest fetch.
    #[must_use]
    pub fn new(repo_url: &str, revision: &str, path: &str, kind: RefKind) -> Self {
        Self {
            repo_url: repo_url.to_string(),
            revision: revision.to_string(),
            path: path.to_string(),
            kind,
        }
    }
}

/// Shared store of previously fetched manifest bytes.
#[derive(Debug, Default)]
pub struct ManifestCache {
    entries: DashMap<CacheKey, Vec<u8>>,
}

impl ManifestCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether entries under this key may be stored and read back.
    ///
    /// True only for tag refs at a content-addressed revision (full 40- or
    /// 64-character hex object id). Everything else is mutable and must be
    /// re-fetched on every scan.
    #[must_use]
    pub fn is_cacheable(&self, key: &CacheKey) -> bool {
        key.kind == RefKind::Tag && is_object_id(&key.revision)
    }

    /// Fetch previously stored bytes, if the key is cacheable and present.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        if !self.is_cacheable(key) {
            return None;
        }
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Store manifest bytes under a key. Silently ignored for
    /// non-cacheable keys.
    pub fn put(&self, key: CacheKey, bytes: Vec<u8>) {
        if self.is_cacheable(&key) {
            self.entries.insert(key, bytes);
        }
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_object_id(revision: &str) -> bool {
    (revision.len() == 40 || revision.len() == 64)
        && revision.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "a94a8fe5ccb19ba61c4c0873d391e987982fbbd3";

    #[test]
    fn tag_revisions_round_trip_byte_identical() {
        let cache = ManifestCache::new();
        let key = CacheKey::new("https://example.com/a.git", SHA, "package.json", RefKind::Tag);
        assert!(cache.is_cacheable(&key));

        let bytes = br#"{"name": "acme/widget"}"#.to_vec();
        cache.put(key.clone(), bytes.clone());
        assert_eq!(cache.get(&key), Some(bytes));
    }

    #[test]
    fn branch_tips_are_never_cached() {
        let cache = ManifestCache::new();
        let key = CacheKey::new("https://example.com/a.git", SHA, "package.json", RefKind::Branch);
        assert!(!cache.is_cacheable(&key));

        cache.put(key.clone(), b"{}".to_vec());
        assert_eq!(cache.get(&key), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn symbolic_revisions_are_never_cached() {
        let cache = ManifestCache::new();
        let key = CacheKey::new("https://example.com/a.git", "v1.0.0", "package.json", RefKind::Tag);
        assert!(!cache.is_cacheable(&key));
        cache.put(key.clone(), b"{}".to_vec());
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn keys_are_scoped_per_repository_and_path() {
        let cache = ManifestCache::new();
        let a = CacheKey::new("https://example.com/a.git", SHA, "package.json", RefKind::Tag);
        let b = CacheKey::new("https://example.com/b.git", SHA, "package.json", RefKind::Tag);
        let sub = CacheKey::new(
            "https://example.com/a.git",
            SHA,
            "packages/lib-a/package.json",
            RefKind::Tag,
        );

        cache.put(a.clone(), b"root-a".to_vec());
        cache.put(sub.clone(), b"sub-a".to_vec());

        assert_eq!(cache.get(&a), Some(b"root-a".to_vec()));
        assert_eq!(cache.get(&b), None);
        assert_eq!(cache.get(&sub), Some(b"sub-a".to_vec()));
    }
}
