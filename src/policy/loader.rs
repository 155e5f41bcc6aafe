//! Loading policy sets from YAML or JSON documents.
//!
//! Expected shape:
//!
//! ```yaml
//! name: default
//! version: v1
//! rules:
//!   - id: allow-all-model-invoke
//!     action: model.invoke
//!     resource_match: "model:*"
//!     effect: allow
//!   - id: deny-untrusted-http
//!     action: tool.invoke
//!     resource_match: "tool:http*"
//!     effect: deny
//!     conditions:
//!       - name: untrusted-domain
//!         when: { op: equals, key: spec_metadata.domain, value: untrusted.example.com }
//! ```
//!
//! Omitted fields default to `name: default`, `subject_match: "*"`,
//! `resource_match: "*"` and `effect: deny`. `effect` is case-insensitive
//! and anything other than `allow` denies.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::model::PolicySet;
use crate::ports::FileSystem;

/// Errors raised while loading policy files.
#[derive(Debug, Error)]
pub enum PolicyLoadError {
    /// The file could not be read.
    #[error("failed to read policy file {path}: {message}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error text.
        message: String,
    },
    /// The document is not a valid policy set.
    #[error("failed to parse policy set{}: {source}", origin(.path.as_deref()))]
    Parse {
        /// File that failed, when loading from disk.
        path: Option<PathBuf>,
        /// Parser error.
        #[source]
        source: serde_yaml::Error,
    },
}

fn origin(path: Option<&Path>) -> String {
    path.map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}

/// Parses a policy set from a YAML (or JSON, which is valid YAML) string.
///
/// # Errors
///
/// Returns [`PolicyLoadError::Parse`] if the document does not describe a
/// policy set.
pub fn load_policy_set_from_str(document: &str) -> Result<PolicySet, PolicyLoadError> {
    serde_yaml::from_str(document).map_err(|source| PolicyLoadError::Parse { path: None, source })
}

/// Reads and parses a policy file through the filesystem port.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_policy_set_from_path(
    fs: &dyn FileSystem,
    path: &Path,
) -> Result<PolicySet, PolicyLoadError> {
    let document = fs.read_to_string(path).map_err(|e| PolicyLoadError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_yaml::from_str(&document).map_err(|source| PolicyLoadError::Parse {
        path: Some(path.to_path_buf()),
        source,
    })
}

/// Loads several policy files and merges them in order.
///
/// Rules from earlier files are evaluated first. Returns `None` when
/// `paths` is empty.
///
/// # Errors
///
/// Returns the first read or parse error encountered.
pub fn load_policy_files(
    fs: &dyn FileSystem,
    paths: &[PathBuf],
) -> Result<Option<PolicySet>, PolicyLoadError> {
    let mut merged: Option<PolicySet> = None;
    for path in paths {
        let set = load_policy_set_from_path(fs, path)?;
        merged = Some(match merged {
            Some(acc) => acc.merge(set),
            None => set,
        });
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::policy::{DecisionContext, PolicyEffect, PolicyEngine};
    use crate::ports::BoxError;

    /// In-memory filesystem for loading without touching disk.
    struct MemFs {
        files: HashMap<PathBuf, String>,
    }

    impl MemFs {
        fn with(files: &[(&str, &str)]) -> Self {
            let files = files
                .iter()
                .map(|(p, c)| (PathBuf::from(p), (*c).to_string()))
                .collect();
            Self { files }
        }
    }

    impl FileSystem for MemFs {
        fn read_to_string(&self, path: &Path) -> Result<String, BoxError> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| format!("File not found: {}", path.display()).into())
        }

        fn exists(&self, path: &Path) -> bool {
            self.files.contains_key(path)
        }
    }

    #[test]
    fn loads_rules_with_defaults() {
        let set = load_policy_set_from_str(
            "version: v1\nrules:\n  - id: r1\n    action: model.invoke\n",
        )
        .unwrap();

        assert_eq!(set.name, "default");
        assert_eq!(set.version.as_deref(), Some("v1"));
        let rule = &set.rules[0];
        assert_eq!(rule.subject_match, "*");
        assert_eq!(rule.resource_match, "*");
        assert_eq!(rule.effect, PolicyEffect::Deny);
    }

    #[test]
    fn loads_json_document() {
        let set = load_policy_set_from_str(
            r#"{"name": "loaded", "version": "v1", "rules": [
                {"id": "allow-all-model-invoke", "subject_match": "*",
                 "action": "model.invoke", "resource_match": "model:*", "effect": "allow"}
            ]}"#,
        )
        .unwrap();

        let engine = PolicyEngine::new(set);
        let ctx = DecisionContext::new();
        let decision = engine.evaluate("user:any", "model.invoke", "model:iris", &ctx);
        assert!(decision.allowed);
        assert_eq!(decision.rule_id.as_deref(), Some("allow-all-model-invoke"));
    }

    #[test]
    fn loads_declarative_conditions() {
        let set = load_policy_set_from_str(
            "rules:\n  - id: deny-untrusted\n    action: tool.invoke\n    conditions:\n      - name: untrusted\n        when: { op: equals, key: spec_metadata.domain, value: bad.test }\n",
        )
        .unwrap();

        assert_eq!(set.rules[0].conditions.len(), 1);
        assert_eq!(set.rules[0].conditions[0].name(), "untrusted");
    }

    #[test]
    fn effect_is_case_insensitive() {
        let set = load_policy_set_from_str(
            "rules:\n  - id: a\n    action: x\n    effect: Allow\n  - id: b\n    action: x\n    effect: DENY\n",
        )
        .unwrap();

        assert_eq!(set.rules[0].effect, PolicyEffect::Allow);
        assert_eq!(set.rules[1].effect, PolicyEffect::Deny);
    }

    #[test]
    fn unrecognised_effect_denies() {
        let set = load_policy_set_from_str(
            "rules:\n  - id: r\n    action: a\n    effect: maybe\n",
        )
        .unwrap();

        assert_eq!(set.rules[0].effect, PolicyEffect::Deny);
        let engine = PolicyEngine::new(set);
        let decision = engine.evaluate("alice", "a", "res", &DecisionContext::new());
        assert!(!decision.allowed);
        assert_eq!(decision.rule_id.as_deref(), Some("r"));
    }

    #[test]
    fn files_merge_in_order() {
        let fs = MemFs::with(&[
            ("/p/base.yaml", "name: base\nrules:\n  - id: first\n    action: x\n"),
            ("/p/extra.yaml", "version: v9\nrules:\n  - id: second\n    action: x\n"),
        ]);

        let paths = [
            PathBuf::from("/p/base.yaml"),
            PathBuf::from("/p/extra.yaml"),
        ];
        let set = load_policy_files(&fs, &paths).unwrap().unwrap();

        let ids: Vec<&str> = set.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
        assert_eq!(set.name, "base");
        assert_eq!(set.version.as_deref(), Some("v9"));
    }

    #[test]
    fn no_files_means_no_policy() {
        let fs = MemFs::with(&[]);
        assert!(load_policy_files(&fs, &[]).unwrap().is_none());
    }

    #[test]
    fn missing_file_reports_path() {
        let fs = MemFs::with(&[]);
        let err = load_policy_set_from_path(&fs, Path::new("/nope.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nope.yaml"));
    }
}
