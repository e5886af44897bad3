//! Policy data, policy metadata, and the policy content hash.
//!
//! The data document lives at `<policy_dir>/data/policy_data.json`;
//! rule sources for an external engine live under `<policy_dir>/rego/`.
//! Both feed the content hash, so any change to either produces a new
//! policy epoch.

pub mod urlcheck;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Policy load failures. These surface as process startup failures, never as
/// silent fallbacks to permissive behavior.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Filesystem failure while reading policy sources.
    #[error("policy source io failure: {0}")]
    Io(#[from] std::io::Error),
    /// The policy data document is not valid JSON of the expected shape.
    #[error("policy data parse failure: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Identity block of the policy data document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    /// Stable policy identifier.
    pub policy_id: String,
    /// Human-assigned policy version.
    pub policy_version: String,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            policy_id: "agent-policy".to_owned(),
            policy_version: "unknown".to_owned(),
        }
    }
}

/// Tunable policy data consumed by the embedded decision rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyData {
    /// Policy identity.
    pub settings: PolicySettings,
    /// Maximum ticket body length in characters.
    pub max_ticket_body_chars: usize,
    /// Per-domain URL path allowlist. Entries ending in `/` are prefix
    /// matches; all other entries are exact matches. A domain without an
    /// entry denies every path.
    pub path_allowlist: BTreeMap<String, Vec<String>>,
}

impl Default for PolicyData {
    fn default() -> Self {
        let mut path_allowlist = BTreeMap::new();
        path_allowlist.insert(
            "api.company.tld".to_owned(),
            vec!["/status".to_owned(), "/info".to_owned(), "/v1/".to_owned()],
        );
        path_allowlist.insert("docs.company.tld".to_owned(), vec!["/".to_owned()]);
        Self {
            settings: PolicySettings::default(),
            max_ticket_body_chars: 4000,
            path_allowlist,
        }
    }
}

impl PolicyData {
    /// Load the data document from `<policy_dir>/data/policy_data.json`.
    /// A missing document yields the built-in defaults.
    pub fn load(policy_dir: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = policy_dir.as_ref().join("data").join("policy_data.json");
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Whether `path` is admitted by the allowlist of the domain matched for
    /// `host` (the host itself or the allowlisted parent domain).
    pub fn path_allowed(&self, host: &str, path: &str) -> bool {
        let Some(entries) = self
            .path_allowlist
            .iter()
            .find(|(domain, _)| host == domain.as_str() || host.ends_with(&format!(".{domain}")))
            .map(|(_, entries)| entries)
        else {
            return false;
        };

        entries.iter().any(|entry| {
            if let Some(prefix) = entry.strip_suffix('/') {
                path == entry || path == prefix || path.starts_with(entry)
            } else {
                path == entry
            }
        })
    }
}

/// Process-level policy identity snapshot, immutable after init.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyMeta {
    /// Stable policy identifier.
    pub policy_id: String,
    /// Human-assigned policy version.
    pub policy_version: String,
    /// Content hash over the policy sources and data document.
    pub policy_hash: String,
}

impl PolicyMeta {
    /// Load identity from the data document and compute the content hash.
    pub fn load(policy_dir: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let data = PolicyData::load(&policy_dir)?;
        Ok(Self {
            policy_id: data.settings.policy_id,
            policy_version: data.settings.policy_version,
            policy_hash: compute_policy_hash(policy_dir)?,
        })
    }
}

/// Stable content hash over the ordered policy sources plus the data
/// document. Each file contributes its name then its bytes; files are
/// visited in sorted name order, so discovery order cannot change the
/// result.
pub fn compute_policy_hash(policy_dir: impl AsRef<Path>) -> Result<String, PolicyError> {
    let policy_dir = policy_dir.as_ref();
    let mut hasher = Sha256::new();

    let rego_dir = policy_dir.join("rego");
    if rego_dir.is_dir() {
        let mut sources: Vec<_> = std::fs::read_dir(&rego_dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("rego"))
            .collect();
        sources.sort();
        for path in sources {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                hasher.update(name.as_bytes());
            }
            hasher.update(std::fs::read(&path)?);
        }
    }

    let data_path = policy_dir.join("data").join("policy_data.json");
    if data_path.exists() {
        hasher.update("policy_data.json".as_bytes());
        hasher.update(std::fs::read(&data_path)?);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_policy_tree(dir: &Path, rego: &[(&str, &str)]) {
        std::fs::create_dir_all(dir.join("rego")).expect("mkdir rego");
        std::fs::create_dir_all(dir.join("data")).expect("mkdir data");
        for (name, body) in rego {
            std::fs::write(dir.join("rego").join(name), body).expect("write rego");
        }
        std::fs::write(
            dir.join("data").join("policy_data.json"),
            serde_json::to_string(&PolicyData::default()).expect("serialize"),
        )
        .expect("write data");
    }

    #[test]
    fn test_hash_independent_of_write_order() {
        let a = tempfile::tempdir().expect("tempdir");
        let b = tempfile::tempdir().expect("tempdir");
        write_policy_tree(a.path(), &[("alpha.rego", "package a"), ("beta.rego", "package b")]);
        write_policy_tree(b.path(), &[("beta.rego", "package b"), ("alpha.rego", "package a")]);

        let ha = compute_policy_hash(a.path()).expect("hash a");
        let hb = compute_policy_hash(b.path()).expect("hash b");
        assert_eq!(ha, hb);
        assert_eq!(ha.len(), 64);
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = tempfile::tempdir().expect("tempdir");
        write_policy_tree(a.path(), &[("alpha.rego", "package a")]);
        let before = compute_policy_hash(a.path()).expect("hash");

        std::fs::write(a.path().join("rego").join("alpha.rego"), "package a2").expect("rewrite");
        let after = compute_policy_hash(a.path()).expect("hash");
        assert_ne!(before, after);
    }

    #[test]
    fn test_missing_data_document_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = PolicyData::load(dir.path()).expect("load");
        assert_eq!(data.max_ticket_body_chars, 4000);
        assert_eq!(data.settings.policy_id, "agent-policy");
    }

    #[test]
    fn test_path_allowed_exact_and_prefix() {
        let data = PolicyData::default();
        assert!(data.path_allowed("api.company.tld", "/status"));
        assert!(data.path_allowed("api.company.tld", "/v1/users"));
        assert!(!data.path_allowed("api.company.tld", "/admin/export"));
        // Subdomain uses the parent domain's allowlist.
        assert!(data.path_allowed("eu.api.company.tld", "/status"));
        // "/" entry admits everything on the docs host.
        assert!(data.path_allowed("docs.company.tld", "/any/where"));
        // Unlisted domain denies.
        assert!(!data.path_allowed("evil.tld", "/status"));
    }

    #[test]
    fn test_policy_meta_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_policy_tree(dir.path(), &[]);
        let meta = PolicyMeta::load(dir.path()).expect("load");
        assert_eq!(meta.policy_id, "agent-policy");
        assert_eq!(meta.policy_hash.len(), 64);
    }
}
