//! Port override merge
//!
//! Applies a sparse YAML override document (lab -> device -> service ->
//! port) onto an existing canonical document, overwriting only the named
//! service ports in place. This is the only component permitted to mutate a
//! persisted canonical document. The merge is idempotent.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::document::CanonicalDocument;
use crate::error::{FormatError, OverrideError};
use crate::ClsError;

/// Sparse override document: lab -> device name -> service name -> port
pub type PortOverrides = IndexMap<String, IndexMap<String, IndexMap<String, u16>>>;

/// Read an override document from a YAML file
///
/// Every nesting level down to the service map must be a mapping, and port
/// values must be integers that fit a port number.
pub fn load_overrides(path: &Path) -> Result<PortOverrides, ClsError> {
    let raw = std::fs::read_to_string(path).map_err(|source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: serde_yaml::Value =
        serde_yaml::from_str(&raw).map_err(|source| FormatError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;

    let root = as_mapping(&value, "the document root")?;
    let mut overrides = PortOverrides::new();
    for (lab_key, lab_value) in root {
        let lab = key_string(lab_key);
        let devices = as_mapping(lab_value, &format!("lab {lab}"))?;
        let mut device_overrides = IndexMap::new();
        for (device_key, device_value) in devices {
            let device = key_string(device_key);
            let services =
                as_mapping(device_value, &format!("device {device} in lab {lab}"))?;
            let mut service_ports = IndexMap::new();
            for (service_key, port_value) in services {
                let service = key_string(service_key);
                let port = port_value
                    .as_u64()
                    .and_then(|p| u16::try_from(p).ok())
                    .ok_or_else(|| OverrideError::Malformed {
                        detail: format!(
                            "port for service {service} on device {device} in lab {lab} is not a valid port number"
                        ),
                    })?;
                service_ports.insert(service, port);
            }
            device_overrides.insert(device, service_ports);
        }
        overrides.insert(lab, device_overrides);
    }
    Ok(overrides)
}

fn as_mapping<'a>(
    value: &'a serde_yaml::Value,
    location: &str,
) -> Result<&'a serde_yaml::Mapping, OverrideError> {
    value.as_mapping().ok_or_else(|| OverrideError::Malformed {
        detail: format!("{location} is not a mapping"),
    })
}

fn key_string(key: &serde_yaml::Value) -> String {
    key.as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", key))
}

/// Overwrite the named service ports on the named devices, in place
///
/// Fails when an override references a lab or device absent from the base
/// document. No field other than the named service ports is touched.
pub fn apply_overrides(
    doc: &mut CanonicalDocument,
    overrides: &PortOverrides,
) -> Result<(), OverrideError> {
    for (lab, device_overrides) in overrides {
        let devices = doc
            .labs
            .get_mut(lab)
            .ok_or_else(|| OverrideError::UnknownLab { lab: lab.clone() })?;

        // name -> index over the existing devices in this lab
        let index_by_name: IndexMap<String, usize> = devices
            .iter()
            .enumerate()
            .map(|(idx, device)| (device.name.clone(), idx))
            .collect();

        for (name, service_ports) in device_overrides {
            let idx = *index_by_name
                .get(name.as_str())
                .ok_or_else(|| OverrideError::UnknownDevice {
                    lab: lab.clone(),
                    device: name.clone(),
                })?;
            for (service, port) in service_ports {
                tracing::info!(
                    device = %name,
                    service = %service,
                    port = *port,
                    "applying port override"
                );
                devices[idx].ports.insert(service.clone(), *port);
            }
        }
    }
    Ok(())
}

/// Load a base document and an override file, merge, and write the result
///
/// Writes back to the data-file path unless an alternate output path is
/// given. Returns the path written.
pub fn inject_custom_ports(
    portfile: &Path,
    datafile: &Path,
    output: Option<&Path>,
) -> Result<PathBuf, ClsError> {
    let mut doc = CanonicalDocument::load(datafile)?;
    let overrides = load_overrides(portfile)?;
    apply_overrides(&mut doc, &overrides)?;

    let destination = output.unwrap_or(datafile).to_path_buf();
    doc.save(&destination)?;
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{default_ports, Device, Metadata};

    fn device(name: &str) -> Device {
        Device {
            name: name.to_string(),
            image: "ceos:4.32".to_string(),
            kind: "ceos".to_string(),
            state: "running".to_string(),
            ipv4_address: "172.20.20.2".to_string(),
            ipv6_address: String::new(),
            ports: default_ports(),
        }
    }

    fn base_document() -> CanonicalDocument {
        let mut doc = CanonicalDocument::new(Metadata::new("localhost"));
        doc.labs
            .insert("lab1".to_string(), vec![device("r1"), device("r2")]);
        doc
    }

    fn overrides_for(lab: &str, dev: &str, service: &str, port: u16) -> PortOverrides {
        let mut services = IndexMap::new();
        services.insert(service.to_string(), port);
        let mut devices = IndexMap::new();
        devices.insert(dev.to_string(), services);
        let mut overrides = PortOverrides::new();
        overrides.insert(lab.to_string(), devices);
        overrides
    }

    #[test]
    fn test_overrides_only_named_service_ports() {
        let mut doc = base_document();
        let overrides = overrides_for("lab1", "r1", "ssh", 2022);
        apply_overrides(&mut doc, &overrides).unwrap();

        let r1 = &doc.labs["lab1"][0];
        assert_eq!(r1.ssh_port(), 2022);
        // untouched sibling and untouched fields
        assert_eq!(doc.labs["lab1"][1].ssh_port(), 22);
        assert_eq!(r1.ipv4_address, "172.20.20.2");
        assert_eq!(r1.image, "ceos:4.32");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let overrides = overrides_for("lab1", "r1", "ssh", 2022);

        let mut once = base_document();
        apply_overrides(&mut once, &overrides).unwrap();

        let mut twice = base_document();
        apply_overrides(&mut twice, &overrides).unwrap();
        apply_overrides(&mut twice, &overrides).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_unknown_lab_is_rejected() {
        let mut doc = base_document();
        let overrides = overrides_for("lab9", "r1", "ssh", 2022);
        let err = apply_overrides(&mut doc, &overrides).unwrap_err();
        assert!(matches!(err, OverrideError::UnknownLab { .. }));
    }

    #[test]
    fn test_unknown_device_is_rejected() {
        let mut doc = base_document();
        let overrides = overrides_for("lab1", "r9", "ssh", 2022);
        let err = apply_overrides(&mut doc, &overrides).unwrap_err();
        match err {
            OverrideError::UnknownDevice { lab, device } => {
                assert_eq!(lab, "lab1");
                assert_eq!(device, "r9");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_override_nesting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ports.yml");
        std::fs::write(&path, "lab1:\n  - r1\n  - r2\n").unwrap();
        let err = load_overrides(&path).unwrap_err();
        assert!(matches!(
            err,
            ClsError::Override(OverrideError::Malformed { .. })
        ));
    }

    #[test]
    fn test_port_out_of_range_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ports.yml");
        std::fs::write(&path, "lab1:\n  r1:\n    ssh: 70000\n").unwrap();
        let err = load_overrides(&path).unwrap_err();
        assert!(matches!(
            err,
            ClsError::Override(OverrideError::Malformed { .. })
        ));
    }

    #[test]
    fn test_inject_writes_to_alternate_output() {
        let dir = tempfile::tempdir().unwrap();
        let datafile = dir.path().join("nodes.json");
        let portfile = dir.path().join("ports.yml");
        let output = dir.path().join("patched.json");

        base_document().save(&datafile).unwrap();
        std::fs::write(&portfile, "lab1:\n  r2:\n    ssh: 8022\n").unwrap();

        let written = inject_custom_ports(&portfile, &datafile, Some(&output)).unwrap();
        assert_eq!(written, output);

        // original untouched, patched copy carries the override and envelope
        let original = CanonicalDocument::load(&datafile).unwrap();
        assert_eq!(original.labs["lab1"][1].ssh_port(), 22);
        let patched = CanonicalDocument::load(&output).unwrap();
        assert_eq!(patched.labs["lab1"][1].ssh_port(), 8022);
        assert_eq!(patched.metadata, original.metadata);
    }
}
