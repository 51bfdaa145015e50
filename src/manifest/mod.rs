//! Package manifest parsing and field access.
//!
//! A manifest is the JSON descriptor file read from one revision of a
//! repository (default file name `package.json`, configurable per
//! repository). Discovery consumes a handful of keys (`name`, `version`,
//! `dist`, `source` and the monorepo extension under `config.monorepo`) and
//! passes every other key through opaquely into the synthesized package
//! record.
//!
//! Manifests are fetched once per revision (subject to the
//! [`crate::cache`] layer), never mutated, and discarded once a package
//! record has been synthesized from them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::IndexError;

/// A dist or source location attached to a package version.
///
/// `kind` is the transport ("git", "zip", ...), `url` the address, and
/// `reference` the revision the location points at (absent for plain
/// archive URLs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Transport kind, e.g. `git` or `zip`
    #[serde(rename = "type")]
    pub kind: String,
    /// Address of the archive or repository
    pub url: String,
    /// Revision identifier within the location, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// An untyped manifest read from a single revision.
///
/// Thin wrapper over the raw JSON object; accessors pull out the keys
/// discovery consumes and [`Manifest::into_extra`] hands back everything
/// else for opaque passthrough.
#[derive(Debug, Clone)]
pub struct Manifest {
    fields: Map<String, Value>,
}

impl Manifest {
    /// Parse manifest bytes into a structured manifest.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::ManifestMalformed`] when the bytes are not a
    /// JSON object; `reference` names the revision for diagnostics.
    pub fn parse(bytes: &[u8], reference: &str) -> Result<Self, IndexError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| IndexError::ManifestMalformed {
                reference: reference.to_string(),
                reason: e.to_string(),
            })?;
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(IndexError::ManifestMalformed {
                reference: reference.to_string(),
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
        }
    }

    /// The declared package name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    /// The manually declared version, if any.
    ///
    /// Presence of this key makes the package "manually versioned": the
    /// declared value is authoritative over the ref name.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.fields.get("version").and_then(Value::as_str)
    }

    /// The declared dist location, if present and well-formed.
    #[must_use]
    pub fn dist(&self) -> Option<Location> {
        self.fields
            .get("dist")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// The declared source location, if present and well-formed.
    #[must_use]
    pub fn source(&self) -> Option<Location> {
        self.fields
            .get("source")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// The monorepo fan-out map declared under `config.monorepo`.
    ///
    /// Maps a logical sub-package name to the relative directory holding its
    /// manifest. Ordered deterministically so fan-out processes sub-paths in
    /// a stable sequence.
    #[must_use]
    pub fn monorepo_paths(&self) -> BTreeMap<String, String> {
        let mut paths = BTreeMap::new();
        if let Some(map) = self
            .fields
            .get("config")
            .and_then(Value::as_object)
            .and_then(|config| config.get("monorepo"))
            .and_then(Value::as_object)
        {
            for (name, path) in map {
                if let Some(path) = path.as_str() {
                    paths.insert(name.clone(), path.to_string());
                }
            }
        }
        paths
    }

    /// Consume the manifest, returning every key discovery did not interpret.
    ///
    /// Unrecognized keys travel into the package record's `extra` map
    /// unchanged.
    #[must_use]
    pub fn into_extra(mut self) -> Map<String, Value> {
        for consumed in ["name", "version", "dist", "source"] {
            self.fields.remove(consumed);
        }
        self.fields
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(json: &str) -> Manifest {
        Manifest::parse(json.as_bytes(), "deadbeef").unwrap()
    }

    #[test]
    fn reads_declared_fields() {
        let m = manifest(
            r#"{
                "name": "acme/widget",
                "version": "1.2.0",
                "dist": {"type": "zip", "url": "https://example.com/w.zip"},
                "source": {"type": "git", "url": "https://example.com/w.git", "reference": "abc"}
            }"#,
        );
        assert_eq!(m.name(), Some("acme/widget"));
        assert_eq!(m.version(), Some("1.2.0"));
        let dist = m.dist().unwrap();
        assert_eq!(dist.kind, "zip");
        assert_eq!(dist.reference, None);
        let source = m.source().unwrap();
        assert_eq!(source.reference.as_deref(), Some("abc"));
    }

    #[test]
    fn missing_fields_are_absent() {
        let m = manifest(r#"{"description": "no name here"}"#);
        assert_eq!(m.name(), None);
        assert_eq!(m.version(), None);
        assert!(m.dist().is_none());
        assert!(m.source().is_none());
        assert!(m.monorepo_paths().is_empty());
    }

    #[test]
    fn monorepo_map_is_ordered() {
        let m = manifest(
            r#"{"config": {"monorepo": {"lib-b": "packages/b", "lib-a": "packages/a"}}}"#,
        );
        let paths: Vec<_> = m.monorepo_paths().into_iter().collect();
        assert_eq!(
            paths,
            vec![
                ("lib-a".to_string(), "packages/a".to_string()),
                ("lib-b".to_string(), "packages/b".to_string()),
            ]
        );
    }

    #[test]
    fn extra_keeps_unrecognized_keys_only() {
        let m = manifest(
            r#"{"name": "acme/widget", "version": "1.0", "homepage": "https://acme.dev", "keywords": ["a"]}"#,
        );
        let extra = m.into_extra();
        assert!(extra.contains_key("homepage"));
        assert!(extra.contains_key("keywords"));
        assert!(!extra.contains_key("name"));
        assert!(!extra.contains_key("version"));
    }

    #[test]
    fn rejects_non_object_manifests() {
        let err = Manifest::parse(b"[1, 2, 3]", "deadbeef").unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("deadbeef"));

        let err = Manifest::parse(b"{not json", "deadbeef").unwrap_err();
        assert!(err.is_malformed());
    }
}
