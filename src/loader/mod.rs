//! Package record synthesis from raw manifests.
//!
//! The loader turns one fetched [`Manifest`] plus the version resolved by
//! the discovery engine into an immutable [`Package`] record. The rules it
//! owns:
//!
//! - a caller-configured canonical name overrides the manifest's own `name`
//!   (a repository may host a package under a different name than it should
//!   be indexed by); with neither, the record is rejected as malformed;
//! - `dist` and `source` locations missing from the manifest are defaulted
//!   from driver-synthesized locations for the revision;
//! - a non-empty sub-path (monorepo fan-out) is recorded as the package's
//!   base path;
//! - everything the engine did not interpret passes through into `extra`.
//!
//! Version resolution (manual vs. auto, dev-suffix stripping, mismatch
//! checks) happens *before* the loader runs; the context carries the final
//! pretty and normalized strings.

use crate::catalog::Package;
use crate::core::IndexError;
use crate::manifest::{Location, Manifest};

/// Everything the loader needs beyond the manifest itself.
#[derive(Debug, Clone)]
pub struct LoadContext {
    /// Canonical package name configured for the repository, if any
    pub canonical_name: Option<String>,
    /// Resolved human-facing version string
    pub version: String,
    /// Resolved normalized version identifier
    pub version_normalized: String,
    /// Sub-path the manifest was fetched from; empty for the repository root
    pub base_path: String,
    /// Driver-synthesized dist location for the revision
    pub default_dist: Option<Location>,
    /// Driver-synthesized source location for the revision
    pub default_source: Option<Location>,
    /// Revision identifier, for diagnostics
    pub reference: String,
}

/// Synthesize a package record from a manifest and a resolved version.
///
/// # Errors
///
/// Returns [`IndexError::ManifestMissingName`] when neither the manifest nor
/// the context supplies a package name.
pub fn load(manifest: Manifest, ctx: LoadContext) -> Result<Package, IndexError> {
    let name = ctx
        .canonical_name
        .clone()
        .or_else(|| manifest.name().map(str::to_string))
        .ok_or(IndexError::ManifestMissingName {
            reference: ctx.reference.clone(),
        })?;

    let dist = manifest.dist().or(ctx.default_dist);
    let source = manifest.source().or(ctx.default_source);
    let base_path = if ctx.base_path.is_empty() {
        None
    } else {
        Some(ctx.base_path)
    };

    Ok(Package {
        name,
        version: ctx.version,
        version_normalized: ctx.version_normalized,
        dist,
        source,
        base_path,
        extra: manifest.into_extra(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> LoadContext {
        LoadContext {
            canonical_name: None,
            version: "1.2.0".to_string(),
            version_normalized: "1.2.0.0".to_string(),
            base_path: String::new(),
            default_dist: None,
            default_source: Some(Location {
                kind: "git".to_string(),
                url: "https://example.com/repo.git".to_string(),
                reference: Some("a94a8fe5ccb19ba61c4c0873d391e987982fbbd3".to_string()),
            }),
            reference: "a94a8fe5ccb19ba61c4c0873d391e987982fbbd3".to_string(),
        }
    }

    fn manifest(json: &str) -> Manifest {
        Manifest::parse(json.as_bytes(), "test").unwrap()
    }

    #[test]
    fn manifest_name_used_when_no_canonical_name() {
        let package = load(manifest(r#"{"name": "acme/widget"}"#), ctx()).unwrap();
        assert_eq!(package.name, "acme/widget");
        assert_eq!(package.version, "1.2.0");
        assert_eq!(package.version_normalized, "1.2.0.0");
    }

    #[test]
    fn canonical_name_overrides_manifest_name() {
        let mut context = ctx();
        context.canonical_name = Some("acme/renamed".to_string());
        let package = load(manifest(r#"{"name": "acme/widget"}"#), context).unwrap();
        assert_eq!(package.name, "acme/renamed");
    }

    #[test]
    fn nameless_manifest_is_rejected() {
        let err = load(manifest(r#"{"description": "anonymous"}"#), ctx()).unwrap_err();
        assert!(matches!(err, IndexError::ManifestMissingName { .. }));
        assert!(err.is_malformed());
    }

    #[test]
    fn locations_default_from_the_driver() {
        let package = load(manifest(r#"{"name": "acme/widget"}"#), ctx()).unwrap();
        assert!(package.dist.is_none());
        let source = package.source.unwrap();
        assert_eq!(source.kind, "git");
        assert_eq!(source.url, "https://example.com/repo.git");
    }

    #[test]
    fn declared_locations_win_over_defaults() {
        let package = load(
            manifest(
                r#"{"name": "acme/widget",
                    "source": {"type": "git", "url": "https://mirror.example.com/w.git", "reference": "def"}}"#,
            ),
            ctx(),
        )
        .unwrap();
        assert_eq!(package.source.unwrap().url, "https://mirror.example.com/w.git");
    }

    #[test]
    fn sub_path_becomes_base_path() {
        let mut context = ctx();
        context.base_path = "packages/a".to_string();
        let package = load(manifest(r#"{"name": "acme/lib-a"}"#), context).unwrap();
        assert_eq!(package.base_path.as_deref(), Some("packages/a"));

        let package = load(manifest(r#"{"name": "acme/lib-a"}"#), ctx()).unwrap();
        assert_eq!(package.base_path, None);
    }

    #[test]
    fn unrecognized_keys_pass_through() {
        let package = load(
            manifest(r#"{"name": "acme/widget", "license": "MIT", "authors": []}"#),
            ctx(),
        )
        .unwrap();
        assert!(package.extra.contains_key("license"));
        assert!(package.extra.contains_key("authors"));
    }
}
