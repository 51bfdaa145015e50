//! Version normalization for tag and branch names.
//!
//! Discovery treats every tag and branch name as a candidate version string.
//! This module turns those raw strings into canonical, comparable
//! identifiers: two raw strings that normalize to the same identifier are the
//! same version for conflict purposes. Normalization is a pure function of
//! its input; it never consults repository state.
//!
//! # Normalized form
//!
//! Release versions normalize to four dot-separated numeric components plus
//! an optional stability suffix:
//!
//! - `"1.2.0"` → `"1.2.0.0"`
//! - `"v1.0-beta2"` → `"1.0.0.0-beta2"`
//! - `"2.1.3.7"` → `"2.1.3.7"`
//! - `"1.0.0-rc1"` → `"1.0.0.0-RC1"`
//!
//! Branch names use a permissive grammar and always land in the development
//! family, which sorts and compares distinctly from releases:
//!
//! - `"2.x"` → `"2.9999999.9999999.9999999-dev"`
//! - `"1.0"` (as a branch) → `"1.0.9999999.9999999-dev"`
//! - `"feature/foo"` → `"dev-feature/foo"`
//! - `"master"`, `"main"`, `"trunk"`, `"default"` → `"9999999-dev"` (the
//!   highest development sentinel, reserved for the primary branch)
//!
//! # Failure mode
//!
//! [`normalize`] returns [`IndexError::InvalidVersion`] for anything outside
//! the release grammar. Callers must treat that as "skip this ref", never as
//! a fatal error. [`normalize_branch`] only rejects empty names; everything
//! else falls back to the `dev-` family.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::IndexError;

/// Strict release-version grammar: optional `v` prefix, one to four numeric
/// components, optional stability suffix with optional numeric index,
/// optional trailing dev marker.
static RELEASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix) ^ v? (\d{1,5}) (\.\d+)? (\.\d+)? (\.\d+)?
          (?: [._-]? (stable|beta|b|rc|alpha|a|patch|pl|p) ((?:[.-]?\d+)*)? )?
          ([.-]?dev)? $",
    )
    .unwrap()
});

/// Permissive branch grammar: numeric components where `x`, `X` or `*` act
/// as wildcards.
static BRANCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?(\d+)(\.(?:\d+|[xX*]))?(\.(?:\d+|[xX*]))?(\.(?:\d+|[xX*]))?$").unwrap());

/// Names conventionally given to a repository's primary branch. They all
/// normalize to the same development sentinel.
static DEFAULT_BRANCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:dev-)?(?:master|main|trunk|default)$").unwrap());

static PRETTY_DEV_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[.-]?dev$").unwrap());

static NORMALIZED_DEV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(^dev-|[.-]?dev$)").unwrap());

static NINES_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\.9999999)+").unwrap());

/// The development sentinel reserved for a repository's primary branch.
pub const DEV_SENTINEL: &str = "9999999-dev";

/// Normalize a tag-like version string into its canonical form.
///
/// Missing numeric components are filled with `.0` up to four, a leading `v`
/// is dropped, stability markers are spelled out (`b` → `beta`, `rc` → `RC`,
/// `pl` → `patch`) and a `stable` marker is dropped entirely. A trailing dev
/// marker is preserved as `-dev`.
///
/// Normalization is idempotent: feeding the canonical rendering back in
/// yields the same string.
///
/// # Errors
///
/// Returns [`IndexError::InvalidVersion`] for any string outside the grammar.
pub fn normalize(raw: &str) -> Result<String, IndexError> {
    let version = raw.trim();
    if version.is_empty() {
        return Err(IndexError::InvalidVersion {
            input: raw.to_string(),
        });
    }

    // Primary-branch names occasionally show up where a version is expected;
    // they normalize to the development sentinel rather than failing.
    if DEFAULT_BRANCH_RE.is_match(version) {
        return Ok(DEV_SENTINEL.to_string());
    }

    // Explicit development versions pass through untouched.
    if let Some(name) = version.strip_prefix("dev-") {
        if name.is_empty() {
            return Err(IndexError::InvalidVersion {
                input: raw.to_string(),
            });
        }
        return Ok(format!("dev-{name}"));
    }

    let Some(caps) = RELEASE_RE.captures(version) else {
        return Err(IndexError::InvalidVersion {
            input: raw.to_string(),
        });
    };

    let mut normalized = caps.get(1).map_or("0", |m| m.as_str()).to_string();
    for group in 2..=4 {
        match caps.get(group) {
            Some(m) => normalized.push_str(m.as_str()),
            None => normalized.push_str(".0"),
        }
    }

    if let Some(stability) = caps.get(5) {
        let expanded = expand_stability(stability.as_str());
        if !expanded.is_empty() {
            normalized.push('-');
            normalized.push_str(expanded);
            if let Some(index) = caps.get(6) {
                normalized.push_str(index.as_str().trim_start_matches(['.', '-']));
            }
        }
    }

    if caps.get(7).is_some() {
        normalized.push_str("-dev");
    }

    Ok(normalized)
}

/// Normalize a branch name into the development version family.
///
/// Primary-branch names map to [`DEV_SENTINEL`]; numeric branches (with
/// optional `x`/`*` wildcards) fill the missing or wildcard components with
/// `9999999` and gain a `-dev` suffix; anything else becomes `dev-{name}`.
///
/// # Errors
///
/// Returns [`IndexError::InvalidVersion`] only for empty names.
pub fn normalize_branch(raw: &str) -> Result<String, IndexError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(IndexError::InvalidVersion {
            input: raw.to_string(),
        });
    }

    if DEFAULT_BRANCH_RE.is_match(name) {
        return Ok(DEV_SENTINEL.to_string());
    }

    if let Some(caps) = BRANCH_RE.captures(name) {
        let mut version = String::new();
        for group in 1..=4 {
            match caps.get(group) {
                Some(m) => version.push_str(&m.as_str().replace(['*', 'X'], "x")),
                None => version.push_str(".x"),
            }
        }
        return Ok(format!("{}-dev", version.replace('x', "9999999")));
    }

    Ok(format!("dev-{name}"))
}

/// Strip a trailing development marker from a pretty version string.
///
/// Tags represent immutable releases; a `1.2.0-dev` tag pretty-prints as
/// `1.2.0`.
#[must_use]
pub fn strip_dev_suffix_pretty(version: &str) -> String {
    PRETTY_DEV_SUFFIX_RE.replace_all(version, "").into_owned()
}

/// Strip development markers (leading `dev-` or trailing dev suffix) from a
/// normalized version string.
#[must_use]
pub fn strip_dev_suffix_normalized(version: &str) -> String {
    NORMALIZED_DEV_RE.replace_all(version, "").into_owned()
}

/// Derive the human-facing version string for a branch.
///
/// Branches in the `dev-` family (and the primary-branch sentinel) render as
/// `dev-{branch}`. Numeric development versions collapse their `9999999`
/// wildcard runs back to `.x`, keeping a `v` prefix when the branch name had
/// one.
#[must_use]
pub fn branch_pretty_version(branch: &str, normalized: &str) -> String {
    if normalized.starts_with("dev-") || normalized == DEV_SENTINEL {
        return format!("dev-{branch}");
    }

    let prefix = if branch.starts_with('v') { "v" } else { "" };
    format!("{prefix}{}", NINES_RUN_RE.replace_all(normalized, ".x"))
}

fn expand_stability(stability: &str) -> &'static str {
    match stability.to_ascii_lowercase().as_str() {
        "a" | "alpha" => "alpha",
        "b" | "beta" => "beta",
        "p" | "pl" | "patch" => "patch",
        "rc" => "RC",
        // "stable" carries no information once the version is canonical.
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_four_components() {
        assert_eq!(normalize("1.2.0").unwrap(), "1.2.0.0");
        assert_eq!(normalize("1.0").unwrap(), "1.0.0.0");
        assert_eq!(normalize("0").unwrap(), "0.0.0.0");
        assert_eq!(normalize("2.1.3.7").unwrap(), "2.1.3.7");
    }

    #[test]
    fn strips_v_prefix() {
        assert_eq!(normalize("v1.2.0").unwrap(), "1.2.0.0");
        assert_eq!(normalize("V4.0").unwrap(), "4.0.0.0");
    }

    #[test]
    fn expands_stability_markers() {
        assert_eq!(normalize("1.0.0-rc1").unwrap(), "1.0.0.0-RC1");
        assert_eq!(normalize("1.0.0-RC1").unwrap(), "1.0.0.0-RC1");
        assert_eq!(normalize("1.0.0-b2").unwrap(), "1.0.0.0-beta2");
        assert_eq!(normalize("1.0.0-beta.2").unwrap(), "1.0.0.0-beta2");
        assert_eq!(normalize("1.0.0-a5").unwrap(), "1.0.0.0-alpha5");
        assert_eq!(normalize("1.0.0-pl3").unwrap(), "1.0.0.0-patch3");
        assert_eq!(normalize("1.0.0-stable").unwrap(), "1.0.0.0");
    }

    #[test]
    fn preserves_dev_markers() {
        assert_eq!(normalize("1.0.0-dev").unwrap(), "1.0.0.0-dev");
        assert_eq!(normalize("1.0.0RC1dev").unwrap(), "1.0.0.0-RC1-dev");
    }

    #[test]
    fn rejects_non_versions() {
        assert!(normalize("").is_err());
        assert!(normalize("not-a-version").is_err());
        assert!(normalize("1.2.three").is_err());
        assert!(normalize("feature/foo").is_err());
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["1.2.0", "v1.0-beta2", "1.0.0-rc1", "2.1.3.7", "1.0.0-pl3", "0.4"] {
            let once = normalize(raw).unwrap();
            let twice = normalize(&once).unwrap();
            assert_eq!(once, twice, "re-normalizing {raw}");
        }
    }

    #[test]
    fn primary_branch_names_hit_the_sentinel() {
        for name in ["master", "main", "trunk", "default", "MASTER"] {
            assert_eq!(normalize_branch(name).unwrap(), DEV_SENTINEL, "branch {name}");
        }
    }

    #[test]
    fn numeric_branches_fill_wildcards() {
        assert_eq!(
            normalize_branch("1.x").unwrap(),
            "1.9999999.9999999.9999999-dev"
        );
        assert_eq!(
            normalize_branch("2.0").unwrap(),
            "2.0.9999999.9999999-dev"
        );
        assert_eq!(normalize_branch("1.2.3.4").unwrap(), "1.2.3.4-dev");
        assert_eq!(
            normalize_branch("v3.*").unwrap(),
            "3.9999999.9999999.9999999-dev"
        );
    }

    #[test]
    fn other_branches_join_the_dev_family() {
        assert_eq!(normalize_branch("feature/foo").unwrap(), "dev-feature/foo");
        assert_eq!(normalize_branch("bugfix-123x").unwrap(), "dev-bugfix-123x");
        assert!(normalize_branch("").is_err());
    }

    #[test]
    fn two_spellings_one_identifier() {
        // The mismatch rule depends on this: "v1.2.0" and "1.2.0" are the
        // same version, only their pretty renderings differ.
        assert_eq!(normalize("v1.2.0").unwrap(), normalize("1.2.0").unwrap());
    }

    #[test]
    fn dev_suffix_stripping() {
        assert_eq!(strip_dev_suffix_pretty("1.2.0-dev"), "1.2.0");
        assert_eq!(strip_dev_suffix_pretty("1.2.0.dev"), "1.2.0");
        assert_eq!(strip_dev_suffix_pretty("1.2.0dev"), "1.2.0");
        assert_eq!(strip_dev_suffix_pretty("1.2.0"), "1.2.0");
        assert_eq!(strip_dev_suffix_normalized("1.2.0.0-dev"), "1.2.0.0");
        assert_eq!(strip_dev_suffix_normalized("dev-main"), "main");
        assert_eq!(strip_dev_suffix_normalized("1.2.0.0"), "1.2.0.0");
    }

    #[test]
    fn branch_pretty_versions() {
        assert_eq!(branch_pretty_version("main", DEV_SENTINEL), "dev-main");
        assert_eq!(
            branch_pretty_version("feature/foo", "dev-feature/foo"),
            "dev-feature/foo"
        );
        assert_eq!(
            branch_pretty_version("2.0", "2.0.9999999.9999999-dev"),
            "2.0.x-dev"
        );
        assert_eq!(
            branch_pretty_version("v1.x", "1.9999999.9999999.9999999-dev"),
            "v1.x-dev"
        );
    }
}
