//! Credential rule set
//!
//! An externally supplied YAML mapping from a condition key to a username
//! and optional password. Condition keys are `node=<name>`, `image=<image>`,
//! `kind=<kind>`, or the literal `default`, and are consulted in that fixed
//! specificity order: the first key present in the rule set fully determines
//! the credentials for a device. Fields are never inherited across levels.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{FormatError, SchemaError};
use crate::model::Device;

/// The least-specific condition key, matched when nothing else is
pub const DEFAULT_CONDITION: &str = "default";

/// One credential rule: username is mandatory at the matched level (checked
/// at resolution time), password is optional
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credential {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// The full rule set, keyed by condition string
#[derive(Debug, Clone, Default)]
pub struct CredentialRules(IndexMap<String, Credential>);

impl CredentialRules {
    /// Read a rule set from a YAML file; the root must be a mapping
    pub fn load(path: &Path) -> Result<Self, crate::ClsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| FormatError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: serde_yaml::Value =
            serde_yaml::from_str(&raw).map_err(|source| FormatError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;
        let serde_yaml::Value::Mapping(mapping) = value else {
            return Err(FormatError::NotAMapping {
                path: path.to_path_buf(),
            }
            .into());
        };

        let mut rules = IndexMap::new();
        for (key, value) in mapping {
            let condition = key
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{:?}", key));
            let credential: Credential =
                serde_yaml::from_value(value).map_err(|e| SchemaError::InvalidCredential {
                    condition: condition.clone(),
                    detail: e.to_string(),
                })?;
            rules.insert(condition, credential);
        }
        Ok(Self(rules))
    }

    /// Look up a rule by its exact condition key
    pub fn lookup(&self, condition: &str) -> Option<&Credential> {
        self.0.get(condition)
    }

    #[cfg(test)]
    pub fn insert(&mut self, condition: impl Into<String>, credential: Credential) {
        self.0.insert(condition.into(), credential);
    }
}

/// The condition keys for a device, most to least specific
///
/// This ordering is the resolution algorithm's central contract: node-match
/// beats image-match beats kind-match beats `default`.
pub fn condition_keys(device: &Device) -> [String; 4] {
    [
        format!("node={}", device.name),
        format!("image={}", device.image),
        format!("kind={}", device.kind),
        DEFAULT_CONDITION.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::default_ports;

    fn sample_device() -> Device {
        Device {
            name: "r1".to_string(),
            image: "ceos:4.32".to_string(),
            kind: "ceos".to_string(),
            state: "running".to_string(),
            ipv4_address: "172.20.20.2".to_string(),
            ipv6_address: String::new(),
            ports: default_ports(),
        }
    }

    #[test]
    fn test_condition_keys_most_to_least_specific() {
        let keys = condition_keys(&sample_device());
        assert_eq!(
            keys,
            [
                "node=r1".to_string(),
                "image=ceos:4.32".to_string(),
                "kind=ceos".to_string(),
                "default".to_string(),
            ]
        );
    }

    #[test]
    fn test_load_rules_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.yml");
        std::fs::write(
            &path,
            "node=r1:\n  username: admin\n  password: secret\ndefault:\n  username: clab\n",
        )
        .unwrap();
        let rules = CredentialRules::load(&path).unwrap();
        let rule = rules.lookup("node=r1").unwrap();
        assert_eq!(rule.username.as_deref(), Some("admin"));
        assert_eq!(rule.password.as_deref(), Some("secret"));
        let fallback = rules.lookup("default").unwrap();
        assert_eq!(fallback.username.as_deref(), Some("clab"));
        assert!(fallback.password.is_none());
    }

    #[test]
    fn test_non_mapping_rule_file_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.yml");
        std::fs::write(&path, "- just\n- a\n- list\n").unwrap();
        let err = CredentialRules::load(&path).unwrap_err();
        assert!(matches!(
            err,
            crate::ClsError::Format(FormatError::NotAMapping { .. })
        ));
    }

    #[test]
    fn test_wrong_shaped_entry_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.yml");
        std::fs::write(&path, "default: just-a-string\n").unwrap();
        let err = CredentialRules::load(&path).unwrap_err();
        assert!(matches!(
            err,
            crate::ClsError::Schema(SchemaError::InvalidCredential { .. })
        ));
    }
}
