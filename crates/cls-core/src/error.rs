//! Error taxonomy for the resolution and launch pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the clab-sessions pipeline
#[derive(Error, Debug)]
pub enum ClsError {
    /// Input file is not valid JSON/YAML or not a mapping at the root
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Required field absent or wrong shape inside an otherwise-valid document
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Credential/address resolution failure
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Port-override merge failure
    #[error(transparent)]
    Override(#[from] OverrideError),

    /// Containerlab API failure
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Input-file format errors: the file could not be read, parsed, or is not
/// an object/mapping at the root
#[derive(Error, Debug)]
pub enum FormatError {
    /// File could not be read or written
    #[error("failed to access {path}: {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Not valid JSON
    #[error("{path} is not valid JSON: {source}", path = path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Not valid YAML
    #[error("{path} is not valid YAML: {source}", path = path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Root of the document is not an object/mapping
    #[error("{path} is not an object/mapping at the root", path = path.display())]
    NotAMapping { path: PathBuf },
}

/// Structural errors inside an otherwise well-formed document
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The mandatory `_metadata_` envelope is absent
    #[error("unable to retrieve the required _metadata_ field from {path}", path = path.display())]
    MissingMetadata { path: PathBuf },

    /// The `_metadata_` envelope has the wrong shape
    #[error("invalid _metadata_ envelope in {path}: {detail}", path = path.display())]
    InvalidMetadata { path: PathBuf, detail: String },

    /// A lab entry is not an array of device records
    #[error("device list for lab {lab} is not an array/list")]
    NotAList { lab: String },

    /// A device record is missing a field or has a wrong-typed field
    #[error("malformed device record in lab {lab}: {detail}")]
    InvalidDevice { lab: String, detail: String },

    /// A required field is absent from a record in the named lab
    #[error("lab {lab}: required field {field} is missing")]
    MissingField { lab: String, field: String },

    /// Two running devices in one lab share a name
    #[error("lab {lab}: duplicate device name {device}")]
    DuplicateDevice { lab: String, device: String },

    /// A credential rule entry has the wrong shape
    #[error("invalid credential entry for condition {condition}: {detail}")]
    InvalidCredential { condition: String, detail: String },
}

/// Resolution-engine failures
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No condition key (including `default`) matched, or the matched level
    /// carries no username
    #[error("unable to retrieve username for device {device}")]
    CredentialNotFound { device: String },

    /// The requested address method needs a field the device lacks
    #[error("device {device} has no address recorded for method {method}")]
    AmbiguousAddress { device: String, method: String },
}

/// Port-override merge failures
#[derive(Error, Debug)]
pub enum OverrideError {
    /// Override references a lab absent from the base document
    #[error("port override references unknown lab {lab}")]
    UnknownLab { lab: String },

    /// Override references a device absent from the named lab
    #[error("port override references unknown device {device} in lab {lab}")]
    UnknownDevice { lab: String, device: String },

    /// Override document is not a mapping at the expected nesting level
    #[error("malformed port override: {detail}")]
    Malformed { detail: String },
}

/// Containerlab API failures
#[derive(Error, Debug)]
pub enum ApiError {
    /// Login did not return HTTP 200
    #[error("error authenticating to the Containerlab API, host: {host}, status code: {status}, error: {message}")]
    Authentication {
        host: String,
        status: u16,
        message: String,
    },

    /// A lab query did not return HTTP 200; carries the lab name when the
    /// query was scoped to one
    #[error(
        "error retrieving lab nodes{scope}, host: {host}, status code: {status}, error: {message}",
        scope = lab.as_deref().map(|lab| format!(" for lab {lab}")).unwrap_or_default()
    )]
    Request {
        host: String,
        lab: Option<String>,
        status: u16,
        message: String,
    },

    /// Transport-level failure talking to the API
    #[error("error connecting to the Containerlab API: {0}")]
    Transport(#[from] reqwest::Error),

    /// An "all labs" query returned an empty result
    #[error("no running labs found - check to make sure there are labs running")]
    NoRunningLabs,

    /// Interactive password prompt failed
    #[error("failed to read password from the terminal: {0}")]
    Prompt(#[source] std::io::Error),
}
