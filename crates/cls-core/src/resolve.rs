//! Credential and address resolution
//!
//! Given a canonical device, a credential rule set, and an address-selection
//! method, compute the concrete address, username, and password to use for
//! one session launch.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::creds::{condition_keys, CredentialRules};
use crate::error::ResolveError;
use crate::model::{Device, Metadata, DEFAULT_SSH_PORT, SSH_SERVICE};

/// How to pick the address used to reach a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMethod {
    /// Use the device name, assumed resolvable via DNS/hosts
    Dns,
    /// Use the device's recorded IPv4 address
    Ipv4,
    /// Use the device's recorded IPv6 address
    Ipv6,
    /// Use the Containerlab host from the metadata envelope
    ClabHost,
}

impl AddressMethod {
    /// All accepted spellings, for CLI help and error messages
    pub const CHOICES: [&'static str; 4] = ["dns", "ipv4", "ipv6", "clabhost"];
}

impl fmt::Display for AddressMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressMethod::Dns => write!(f, "dns"),
            AddressMethod::Ipv4 => write!(f, "ipv4"),
            AddressMethod::Ipv6 => write!(f, "ipv6"),
            AddressMethod::ClabHost => write!(f, "clabhost"),
        }
    }
}

impl FromStr for AddressMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dns" => Ok(AddressMethod::Dns),
            "ipv4" => Ok(AddressMethod::Ipv4),
            "ipv6" => Ok(AddressMethod::Ipv6),
            "clabhost" => Ok(AddressMethod::ClabHost),
            other => Err(format!(
                "invalid address method {:?} (expected one of: {})",
                other,
                AddressMethod::CHOICES.join(", ")
            )),
        }
    }
}

/// The concrete connection parameters for one device, computed immediately
/// before launch and never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub name: String,
    pub address: String,
    pub username: String,
    /// Absent when the matched credential level carries no password; launch
    /// adapters must then omit password auto-fill
    pub password: Option<String>,
    pub ports: IndexMap<String, u16>,
}

impl ResolvedSession {
    pub fn ssh_port(&self) -> u16 {
        self.ports
            .get(SSH_SERVICE)
            .copied()
            .unwrap_or(DEFAULT_SSH_PORT)
    }
}

/// Resolve the address and credentials for one device
///
/// Credential selection walks the condition keys in fixed specificity order
/// (node, image, kind, default) and stops at the first key present in the
/// rule set. The matched level fully determines both fields: a missing
/// username there is a hard error, never a fall-through.
pub fn resolve(
    device: &Device,
    rules: &CredentialRules,
    method: AddressMethod,
    metadata: &Metadata,
) -> Result<ResolvedSession, ResolveError> {
    let address = select_address(device, method, metadata)?;

    let matched = condition_keys(device)
        .iter()
        .find_map(|condition| rules.lookup(condition).cloned());

    let credential = matched.ok_or_else(|| ResolveError::CredentialNotFound {
        device: device.name.clone(),
    })?;
    let username = credential
        .username
        .ok_or_else(|| ResolveError::CredentialNotFound {
            device: device.name.clone(),
        })?;

    Ok(ResolvedSession {
        name: device.name.clone(),
        address,
        username,
        password: credential.password,
        ports: device.ports.clone(),
    })
}

fn select_address(
    device: &Device,
    method: AddressMethod,
    metadata: &Metadata,
) -> Result<String, ResolveError> {
    let address = match method {
        AddressMethod::Dns => device.name.as_str(),
        AddressMethod::Ipv4 => device.ipv4_address.as_str(),
        AddressMethod::Ipv6 => device.ipv6_address.as_str(),
        AddressMethod::ClabHost => metadata.clab_host.as_str(),
    };
    if address.is_empty() {
        return Err(ResolveError::AmbiguousAddress {
            device: device.name.clone(),
            method: method.to_string(),
        });
    }
    Ok(address.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creds::Credential;
    use crate::model::default_ports;

    fn sample_device() -> Device {
        Device {
            name: "r1".to_string(),
            image: "ceos:4.32".to_string(),
            kind: "ceos".to_string(),
            state: "running".to_string(),
            ipv4_address: "172.20.20.2".to_string(),
            ipv6_address: "3fff:172:20:20::2".to_string(),
            ports: default_ports(),
        }
    }

    fn metadata() -> Metadata {
        Metadata::new("clab.example.net")
    }

    fn rules_with(entries: &[(&str, Option<&str>, Option<&str>)]) -> CredentialRules {
        let mut rules = CredentialRules::default();
        for (condition, username, password) in entries {
            rules.insert(
                *condition,
                Credential {
                    username: username.map(str::to_string),
                    password: password.map(str::to_string),
                },
            );
        }
        rules
    }

    #[test]
    fn test_address_methods_are_mutually_exclusive_sources() {
        let device = sample_device();
        let rules = rules_with(&[("default", Some("admin"), None)]);

        let by_dns = resolve(&device, &rules, AddressMethod::Dns, &metadata()).unwrap();
        assert_eq!(by_dns.address, "r1");
        assert_ne!(by_dns.address, device.ipv4_address);

        let by_ipv4 = resolve(&device, &rules, AddressMethod::Ipv4, &metadata()).unwrap();
        assert_eq!(by_ipv4.address, "172.20.20.2");
        assert_ne!(by_ipv4.address, device.name);

        let by_ipv6 = resolve(&device, &rules, AddressMethod::Ipv6, &metadata()).unwrap();
        assert_eq!(by_ipv6.address, "3fff:172:20:20::2");

        let by_host = resolve(&device, &rules, AddressMethod::ClabHost, &metadata()).unwrap();
        assert_eq!(by_host.address, "clab.example.net");
    }

    #[test]
    fn test_most_specific_condition_wins() {
        let device = sample_device();
        let rules = rules_with(&[
            ("default", Some("fallback"), Some("fallbackpw")),
            ("node=r1", Some("admin"), Some("secret")),
        ]);
        let session = resolve(&device, &rules, AddressMethod::Dns, &metadata()).unwrap();
        assert_eq!(session.username, "admin");
        assert_eq!(session.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_image_beats_kind_beats_default() {
        let device = sample_device();
        let rules = rules_with(&[
            ("kind=ceos", Some("kinduser"), None),
            ("image=ceos:4.32", Some("imageuser"), None),
            ("default", Some("fallback"), None),
        ]);
        let session = resolve(&device, &rules, AddressMethod::Dns, &metadata()).unwrap();
        assert_eq!(session.username, "imageuser");
    }

    #[test]
    fn test_password_never_inherited_from_less_specific_level() {
        let device = sample_device();
        let rules = rules_with(&[
            ("node=r1", Some("admin"), None),
            ("default", Some("fallback"), Some("fallbackpw")),
        ]);
        let session = resolve(&device, &rules, AddressMethod::Dns, &metadata()).unwrap();
        assert_eq!(session.username, "admin");
        assert!(session.password.is_none());
    }

    #[test]
    fn test_no_match_names_the_device() {
        let mut device = sample_device();
        device.name = "r2".to_string();
        let rules = rules_with(&[("node=r1", Some("admin"), None)]);
        let err = resolve(&device, &rules, AddressMethod::Dns, &metadata()).unwrap_err();
        match err {
            ResolveError::CredentialNotFound { device } => assert_eq!(device, "r2"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_username_at_matched_level_is_hard_error() {
        let device = sample_device();
        // node-level matches but has no username; must not fall through to default
        let rules = rules_with(&[
            ("node=r1", None, Some("secret")),
            ("default", Some("fallback"), None),
        ]);
        let err = resolve(&device, &rules, AddressMethod::Dns, &metadata()).unwrap_err();
        assert!(matches!(err, ResolveError::CredentialNotFound { .. }));
    }

    #[test]
    fn test_missing_ipv6_is_ambiguous_address() {
        let mut device = sample_device();
        device.ipv6_address = String::new();
        let rules = rules_with(&[("default", Some("admin"), None)]);
        let err = resolve(&device, &rules, AddressMethod::Ipv6, &metadata()).unwrap_err();
        match err {
            ResolveError::AmbiguousAddress { device, method } => {
                assert_eq!(device, "r1");
                assert_eq!(method, "ipv6");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("dns".parse::<AddressMethod>().unwrap(), AddressMethod::Dns);
        assert_eq!(
            "CLABHOST".parse::<AddressMethod>().unwrap(),
            AddressMethod::ClabHost
        );
        assert!("serial".parse::<AddressMethod>().is_err());
    }
}
