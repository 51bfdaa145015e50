//! Error handling for vcs-index.
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`IndexError`]) so the discovery engine can
//!    classify failures precisely (a missing manifest is not a broken one).
//! 2. **User-friendly messages** for the CLI, with the repository URL or ref
//!    name embedded so a skipped ref can be traced back to its cause.
//!
//! # Error severity during a scan
//!
//! Almost every variant here is *non-fatal* in the context of a repository
//! scan: the engine catches it at the per-ref boundary, logs a warning, and
//! moves on. The only condition that aborts a scan is [`IndexError::EmptyCatalog`]:
//! no tag and no branch yielded a usable manifest. See
//! [`crate::discovery`] for the isolation rules.
//!
//! # Classification helpers
//!
//! [`IndexError::is_not_found`] distinguishes a "nothing at this revision"
//! transport failure (recorded as an empty reference) from every other
//! transport failure (logged, skipped, and for branches, raising the
//! branch-error flag).

use colored::Colorize;
use thiserror::Error;

/// The error type for all vcs-index operations.
///
/// Variants are grouped by the stage of discovery that raises them: version
/// normalization, manifest fetch/parse, record validation, catalog insertion,
/// driver transport, and the ambient git plumbing underneath the reference
/// driver.
#[derive(Error, Debug)]
pub enum IndexError {
    /// A tag or branch name does not parse as a version string.
    ///
    /// Raised by the version normalizer; callers treat this as "skip the
    /// ref", never as a fatal error.
    #[error("invalid version string '{input}'")]
    InvalidVersion {
        /// The raw string that failed normalization
        input: String,
    },

    /// Manifest content was present at a revision but could not be parsed
    /// or failed semantic validation.
    #[error("malformed manifest at {reference}: {reason}")]
    ManifestMalformed {
        /// The revision (or ref name) the manifest was read from
        reference: String,
        /// Why parsing or validation failed
        reason: String,
    },

    /// A manifest produced a record with no package name and no canonical
    /// name was configured to fill the gap.
    #[error("manifest at {reference} declares no package name")]
    ManifestMissingName {
        /// The revision (or ref name) the manifest was read from
        reference: String,
    },

    /// A tag's resolved version disagrees with the tag's own name.
    ///
    /// Guards against a manifest that claims a different version than the
    /// tag it is checked out at.
    #[error(
        "tag '{tag}' ({tag_version}) does not match version ({manifest_version}) in the manifest"
    )]
    VersionMismatch {
        /// The (prefix-stripped) tag name
        tag: String,
        /// The normalized version derived from the tag name
        tag_version: String,
        /// The normalized version the manifest resolved to
        manifest_version: String,
    },

    /// A second ref resolved to a `(name, normalized version)` pair already
    /// present in the catalog. First writer wins.
    #[error(
        "'{reference}' conflicts with '{existing}' as both resolve to {normalized} internally"
    )]
    DuplicateVersion {
        /// The ref being rejected
        reference: String,
        /// The pretty version of the record already in the catalog
        existing: String,
        /// The shared normalized version
        normalized: String,
    },

    /// The repository driver itself failed (network, auth, host error).
    ///
    /// `not_found` distinguishes "nothing at this revision" from every other
    /// transport failure; the discovery engine records the former as an
    /// empty reference.
    #[error("transport failure for {url}: {reason}")]
    Transport {
        /// The repository URL the driver was talking to
        url: String,
        /// Driver-provided failure description
        reason: String,
        /// Whether the failure is a not-found condition
        not_found: bool,
    },

    /// Zero packages were discovered across all tags and branches.
    ///
    /// The one unrecoverable condition of a scan.
    #[error(
        "no valid manifest was found in any branch or tag of {url}, could not load a package from it"
    )]
    EmptyCatalog {
        /// The repository URL that yielded nothing
        url: String,
    },

    /// No driver in the registry claimed support for a repository URL,
    /// even on the permissive second pass.
    #[error("no driver found to handle VCS repository {url}")]
    NoDriverFound {
        /// The unclaimed repository URL
        url: String,
    },

    /// Git executable not found in PATH.
    #[error("git is not installed or not found in PATH")]
    GitNotFound,

    /// A git command returned a non-zero exit code.
    #[error("git operation failed: {operation}")]
    GitCommandError {
        /// The git operation that failed (e.g. "clone", "fetch", "show")
        operation: String,
        /// The error output from the git command
        stderr: String,
    },

    /// Repository mirror clone failed.
    #[error("failed to clone repository: {url}")]
    GitCloneFailed {
        /// The repository URL that failed to clone
        url: String,
        /// The reason for the clone failure
        reason: String,
    },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error wrapper.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IndexError {
    /// Whether this error represents a "nothing at this revision" condition.
    ///
    /// True for [`IndexError::Transport`] with the `not_found` flag set. The
    /// discovery engine records such revisions as empty references instead of
    /// treating them as failures.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Transport { not_found: true, .. })
    }

    /// Whether this error counts as malformed-manifest severity.
    ///
    /// For branches, this severity raises the catalog-wide branch-error flag.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::ManifestMalformed { .. } | Self::ManifestMissingName { .. } | Self::Json(_)
        )
    }
}

/// Print an error to stderr with CLI coloring.
///
/// Walks the `anyhow` chain so wrapped [`IndexError`]s keep their context
/// lines in order.
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} {}", "error:".red().bold(), error);
    for cause in error.chain().skip(1) {
        eprintln!("  {} {}", "caused by:".yellow(), cause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_not_found_classification() {
        let err = IndexError::Transport {
            url: "https://example.com/repo.git".to_string(),
            reason: "HTTP 404".to_string(),
            not_found: true,
        };
        assert!(err.is_not_found());
        assert!(!err.is_malformed());

        let err = IndexError::Transport {
            url: "https://example.com/repo.git".to_string(),
            reason: "connection refused".to_string(),
            not_found: false,
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn malformed_classification() {
        let err = IndexError::ManifestMalformed {
            reference: "abc123".to_string(),
            reason: "expected object".to_string(),
        };
        assert!(err.is_malformed());
        assert!(!err.is_not_found());

        let err = IndexError::ManifestMissingName {
            reference: "abc123".to_string(),
        };
        assert!(err.is_malformed());
    }

    #[test]
    fn messages_name_the_offending_ref() {
        let err = IndexError::VersionMismatch {
            tag: "1.2.0".to_string(),
            tag_version: "1.2.0.0".to_string(),
            manifest_version: "1.3.0.0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("1.2.0"));
        assert!(msg.contains("1.3.0.0"));

        let err = IndexError::EmptyCatalog {
            url: "https://example.com/repo.git".to_string(),
        };
        assert!(err.to_string().contains("https://example.com/repo.git"));
    }
}
