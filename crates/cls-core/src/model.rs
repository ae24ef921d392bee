//! Canonical record shapes shared across the pipeline

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The reserved key carrying the metadata envelope in canonical documents
pub const METADATA_KEY: &str = "_metadata_";

/// Device state required for inclusion in a canonical document
pub const RUNNING_STATE: &str = "running";

/// Service name for the SSH port entry every device carries
pub const SSH_SERVICE: &str = "ssh";

/// Default SSH port tagged onto ingested devices
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Metadata envelope attached to every canonical document
///
/// Carries the orchestration host needed by the `clabhost` address method.
/// Stripped before device iteration, re-attached on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// IP address or DNS hostname of the Containerlab host
    #[serde(rename = "clabHost")]
    pub clab_host: String,
}

impl Metadata {
    pub fn new(clab_host: impl Into<String>) -> Self {
        Self {
            clab_host: clab_host.into(),
        }
    }
}

/// One running workload instance within a lab
///
/// Identity is `(lab, name)`; ingestion guarantees `name` is unique within
/// its lab so port-override lookups stay unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub image: String,
    pub kind: String,
    pub state: String,
    #[serde(default)]
    pub ipv4_address: String,
    #[serde(default)]
    pub ipv6_address: String,
    /// Service name -> port number; always carries at least `ssh`
    #[serde(default = "default_ports")]
    pub ports: IndexMap<String, u16>,
}

/// The default port map tagged onto every ingested device
pub fn default_ports() -> IndexMap<String, u16> {
    let mut ports = IndexMap::new();
    ports.insert(SSH_SERVICE.to_string(), DEFAULT_SSH_PORT);
    ports
}

impl Device {
    /// Whether this device should survive ingestion filtering
    pub fn is_running(&self) -> bool {
        self.state == RUNNING_STATE
    }

    /// The SSH port for this device
    pub fn ssh_port(&self) -> u16 {
        self.ports
            .get(SSH_SERVICE)
            .copied()
            .unwrap_or(DEFAULT_SSH_PORT)
    }
}

/// A named ordered collection of devices
pub type Lab = Vec<Device>;
