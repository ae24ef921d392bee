//! cls-core: Canonical lab-device model and resolution engine for clab-sessions
//!
//! This crate provides the shared record shapes (devices, labs, the metadata
//! envelope), the credential/address resolution engine, the port-override
//! merge, and the ingestion adapters that normalize Containerlab API
//! responses and inspection reports into one canonical document format.

pub mod api;
pub mod creds;
pub mod document;
pub mod error;
pub mod ingest;
pub mod model;
pub mod ports;
pub mod resolve;

pub use document::CanonicalDocument;
pub use error::ClsError;
pub use model::{Device, Metadata};
pub use resolve::{AddressMethod, ResolvedSession};
