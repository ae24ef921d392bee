//! Ingestion adapters
//!
//! Two sources, one output contract: a canonical document whose labs hold
//! only running devices, tagged with default SSH ports, with the metadata
//! envelope carrying the queried/assumed Containerlab host. Both adapters
//! reject duplicate device names within a lab rather than deduping.

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::api::ApiClient;
use crate::document::CanonicalDocument;
use crate::error::{ApiError, FormatError, SchemaError};
use crate::model::{Device, Lab, Metadata, DEFAULT_SSH_PORT, SSH_SERVICE};
use crate::ClsError;

/// Inspection-report label carrying the device's long node name
pub const LONGNAME_LABEL: &str = "clab-node-longname";

/// Inspection-report label carrying the device kind
pub const KIND_LABEL: &str = "clab-node-kind";

/// Retrieve running devices from the Containerlab API
///
/// Queries the named labs, or every lab when none are given. Workloads in
/// any state other than `running` are dropped silently. An "all labs" query
/// that comes back empty is an error.
pub fn retrieve_from_api(
    host: &str,
    username: &str,
    password: &str,
    labs: &[String],
) -> Result<CanonicalDocument, ClsError> {
    let mut client = ApiClient::new(host);
    client.login(username, password)?;

    let all_nodes: IndexMap<String, Vec<Device>> = if labs.is_empty() {
        tracing::info!("retrieving running nodes for all labs");
        let found = client.all_labs()?;
        if found.is_empty() {
            return Err(ApiError::NoRunningLabs.into());
        }
        tracing::info!(
            labs = %found.keys().cloned().collect::<Vec<_>>().join(", "),
            "labs found"
        );
        found
    } else {
        let mut requested = IndexMap::new();
        for lab in labs {
            tracing::info!(lab = %lab, "retrieving running nodes");
            requested.insert(lab.clone(), client.lab_nodes(lab)?);
        }
        requested
    };

    let mut doc = CanonicalDocument::new(Metadata::new(host));
    for (lab, nodes) in all_nodes {
        let running: Lab = nodes
            .into_iter()
            .filter(Device::is_running)
            .map(with_default_ssh_port)
            .collect();
        ensure_unique_names(&lab, &running)?;
        doc.labs.insert(lab, running);
    }
    Ok(doc)
}

/// Parse a pre-rendered `containerlab inspect` report into a canonical
/// document
///
/// The report is keyed by lab name; every running entry must carry the
/// `clab-node-longname` and `clab-node-kind` labels plus image, state, and
/// address fields.
pub fn parse_inspect_report(input: &Path, host: &str) -> Result<CanonicalDocument, ClsError> {
    let raw = std::fs::read_to_string(input).map_err(|source| FormatError::Io {
        path: input.to_path_buf(),
        source,
    })?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|source| FormatError::Json {
            path: input.to_path_buf(),
            source,
        })?;
    let serde_json::Value::Object(root) = value else {
        return Err(FormatError::NotAMapping {
            path: input.to_path_buf(),
        }
        .into());
    };

    let mut doc = CanonicalDocument::new(Metadata::new(host));
    for (lab, entries) in root {
        tracing::info!(lab = %lab, "parsing inspect output");
        if !entries.is_array() {
            return Err(SchemaError::NotAList { lab }.into());
        }
        let entries: Vec<InspectEntry> =
            serde_json::from_value(entries).map_err(|e| SchemaError::InvalidDevice {
                lab: lab.clone(),
                detail: e.to_string(),
            })?;

        let mut devices = Lab::new();
        for entry in entries {
            let state = entry.state.clone().ok_or_else(|| SchemaError::MissingField {
                lab: lab.clone(),
                field: "State".to_string(),
            })?;
            if state != crate::model::RUNNING_STATE {
                continue;
            }
            devices.push(entry.into_device(&lab, state)?);
        }
        ensure_unique_names(&lab, &devices)?;
        doc.labs.insert(lab, devices);
    }
    Ok(doc)
}

/// One raw entry of an inspection report; all fields optional so missing
/// ones can be reported by name
#[derive(Debug, Deserialize)]
struct InspectEntry {
    #[serde(rename = "Image")]
    image: Option<String>,
    #[serde(rename = "State")]
    state: Option<String>,
    #[serde(rename = "Labels")]
    labels: Option<IndexMap<String, String>>,
    #[serde(rename = "NetworkSettings")]
    network_settings: Option<InspectNetworkSettings>,
}

#[derive(Debug, Deserialize)]
struct InspectNetworkSettings {
    #[serde(rename = "IPv4addr")]
    ipv4_addr: Option<String>,
    #[serde(rename = "IPv6addr")]
    ipv6_addr: Option<String>,
}

impl InspectEntry {
    fn into_device(self, lab: &str, state: String) -> Result<Device, SchemaError> {
        let missing = |field: &str| SchemaError::MissingField {
            lab: lab.to_string(),
            field: field.to_string(),
        };

        let labels = self.labels.ok_or_else(|| missing("Labels"))?;
        let name = labels
            .get(LONGNAME_LABEL)
            .cloned()
            .ok_or_else(|| missing(LONGNAME_LABEL))?;
        let kind = labels
            .get(KIND_LABEL)
            .cloned()
            .ok_or_else(|| missing(KIND_LABEL))?;
        let image = self.image.ok_or_else(|| missing("Image"))?;
        let network = self
            .network_settings
            .ok_or_else(|| missing("NetworkSettings"))?;
        let ipv4_address = network.ipv4_addr.ok_or_else(|| missing("IPv4addr"))?;
        let ipv6_address = network.ipv6_addr.ok_or_else(|| missing("IPv6addr"))?;

        Ok(Device {
            name,
            image,
            kind,
            state,
            ipv4_address,
            ipv6_address,
            ports: crate::model::default_ports(),
        })
    }
}

/// Guarantee the SSH service entry exists on an ingested device
fn with_default_ssh_port(mut device: Device) -> Device {
    device
        .ports
        .entry(SSH_SERVICE.to_string())
        .or_insert(DEFAULT_SSH_PORT);
    device
}

/// Reject (never dedupe) name collisions within a lab
fn ensure_unique_names(lab: &str, devices: &[Device]) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for device in devices {
        if !seen.insert(device.name.as_str()) {
            return Err(SchemaError::DuplicateDevice {
                lab: lab.to_string(),
                device: device.name.clone(),
            });
        }
    }
    Ok(())
}
