//! Canonical document I/O
//!
//! A canonical document is a JSON object whose reserved `_metadata_` key
//! carries the metadata envelope and whose remaining keys map lab names to
//! ordered device lists. The envelope is held separately in memory so
//! device iteration never has to special-case it; it is re-attached (first)
//! whenever the document is written back to disk.

use std::path::Path;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{FormatError, SchemaError};
use crate::model::{Lab, Metadata, METADATA_KEY};
#[cfg(test)]
use crate::model::Device;

/// An in-memory canonical document: the metadata envelope plus the ordered
/// lab -> devices mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalDocument {
    pub metadata: Metadata,
    pub labs: IndexMap<String, Lab>,
}

impl CanonicalDocument {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            labs: IndexMap::new(),
        }
    }

    /// Read a canonical document from a JSON file
    ///
    /// The root must be a JSON object carrying the mandatory `_metadata_`
    /// envelope; every other key must map to an array of device records.
    pub fn load(path: &Path) -> Result<Self, crate::ClsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| FormatError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|source| FormatError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let Value::Object(mut root) = value else {
            return Err(FormatError::NotAMapping {
                path: path.to_path_buf(),
            }
            .into());
        };

        let metadata_value = root
            .shift_remove(METADATA_KEY)
            .ok_or(SchemaError::MissingMetadata {
                path: path.to_path_buf(),
            })?;
        let metadata: Metadata =
            serde_json::from_value(metadata_value).map_err(|e| SchemaError::InvalidMetadata {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;

        let mut labs = IndexMap::new();
        for (lab, value) in root {
            if !value.is_array() {
                return Err(SchemaError::NotAList { lab }.into());
            }
            let devices: Lab =
                serde_json::from_value(value).map_err(|e| SchemaError::InvalidDevice {
                    lab: lab.clone(),
                    detail: e.to_string(),
                })?;
            labs.insert(lab, devices);
        }

        Ok(Self { metadata, labs })
    }

    /// Write the document back as pretty-printed JSON, envelope first
    pub fn save(&self, path: &Path) -> Result<(), crate::ClsError> {
        let mut root = serde_json::Map::new();
        root.insert(
            METADATA_KEY.to_string(),
            serde_json::to_value(&self.metadata).expect("metadata is always serializable"),
        );
        for (lab, devices) in &self.labs {
            root.insert(
                lab.clone(),
                serde_json::to_value(devices).expect("devices are always serializable"),
            );
        }

        let rendered = serde_json::to_string_pretty(&Value::Object(root))
            .expect("canonical document is always serializable");
        std::fs::write(path, rendered).map_err(|source| FormatError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "canonical document written");
        Ok(())
    }

    /// Total number of devices across all labs
    pub fn device_count(&self) -> usize {
        self.labs.values().map(Vec::len).sum()
    }
}
