//! Quick pipeline orchestrator
//!
//! A flat env-style configuration file selects one retrieval method and one
//! launch method; the orchestrator validates each stage's required keys up
//! front (reporting every missing key at once), then sequences
//! Retrieving -> optional PortPatching -> Launching. Any stage failure
//! moves the pipeline to Failed and aborts the remaining stages; there is
//! no partial-pipeline resume.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use indexmap::IndexMap;

use cls_core::AddressMethod;

use crate::commands;
use crate::error::ConfigError;
use crate::launch::mtputty;

/// Selector key for the retrieval stage
pub const BASIC_RETRIEVAL_METHOD: &str = "BASIC_RETRIEVAL_METHOD";

/// Selector key for the launch stage
pub const BASIC_LAUNCH_METHOD: &str = "BASIC_LAUNCH_METHOD";

/// Key enabling the optional port-patching stage
pub const RETRIEVE_PORTS_FILE: &str = "RETRIEVE_PORTS_FILE";

/// Pipeline stages, in order; any failure transitions directly to Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Retrieving,
    PortPatching,
    Launching,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Idle => write!(f, "idle"),
            Stage::Retrieving => write!(f, "retrieving"),
            Stage::PortPatching => write!(f, "port-patching"),
            Stage::Launching => write!(f, "launching"),
            Stage::Done => write!(f, "done"),
            Stage::Failed => write!(f, "failed"),
        }
    }
}

/// The parsed flat key=value configuration
pub struct QuickConfig {
    path: PathBuf,
    settings: IndexMap<String, String>,
}

impl QuickConfig {
    /// Parse an env-style config file without touching the process
    /// environment
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let iter = dotenvy::from_path_iter(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = IndexMap::new();
        for item in iter {
            let (key, value) = item.map_err(|source| ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
            settings.insert(key, value);
        }
        tracing::debug!(
            config = %path.display(),
            keys = settings.len(),
            "quick config loaded"
        );
        Ok(Self {
            path: path.to_path_buf(),
            settings,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// Fetch a single mandatory key
    pub fn require(&self, task: &str, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingKeys {
            task: task.to_string(),
            config: self.path.clone(),
            keys: vec![key.to_string()],
        })
    }

    /// Validate that every listed key is present, reporting all absentees
    /// in one error rather than just the first
    pub fn require_all(&self, task: &str, keys: &[&str]) -> Result<(), ConfigError> {
        let missing: Vec<String> = keys
            .iter()
            .filter(|key| !self.settings.contains_key(**key))
            .map(|key| key.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingKeys {
                task: task.to_string(),
                config: self.path.clone(),
                keys: missing,
            })
        }
    }
}

/// Run the full quick pipeline from a config file
pub fn run(config_path: &Path) -> Result<()> {
    let mut stage = Stage::Idle;
    run_pipeline(config_path, &mut stage)
}

fn run_pipeline(config_path: &Path, stage: &mut Stage) -> Result<()> {
    let result = run_stages(config_path, stage);
    if result.is_err() {
        let failed_during = *stage;
        *stage = Stage::Failed;
        tracing::error!(during = %failed_during, "quick pipeline aborted");
    }
    result
}

fn run_stages(config_path: &Path, stage: &mut Stage) -> Result<()> {
    let settings = QuickConfig::load(config_path)?;
    settings.require_all(
        "validating basic settings",
        &[BASIC_RETRIEVAL_METHOD, BASIC_LAUNCH_METHOD],
    )?;

    *stage = Stage::Retrieving;
    tracing::info!(stage = %stage, "quick pipeline stage");
    let datafile = run_retrieval(&settings)?;

    if settings.get(RETRIEVE_PORTS_FILE).is_some() {
        *stage = Stage::PortPatching;
        tracing::info!(stage = %stage, "quick pipeline stage");
        run_port_patching(&settings, &datafile)?;
    }

    *stage = Stage::Launching;
    tracing::info!(stage = %stage, "quick pipeline stage");
    run_launch(&settings)?;

    *stage = Stage::Done;
    tracing::info!(stage = %stage, "quick pipeline stage");
    Ok(())
}

fn run_retrieval(settings: &QuickConfig) -> Result<PathBuf> {
    let method = settings
        .require("selecting the retrieval method", BASIC_RETRIEVAL_METHOD)?
        .to_ascii_lowercase();
    match method.as_str() {
        "api" => {
            let task = "validating API settings";
            settings.require_all(task, &["RETRIEVE_API_USERNAME", "RETRIEVE_API_OUTPUT"])?;
            let username = settings.require(task, "RETRIEVE_API_USERNAME")?;
            let output = PathBuf::from(settings.require(task, "RETRIEVE_API_OUTPUT")?);
            let host = settings.get("RETRIEVE_API_HOST").unwrap_or("localhost");
            let labs: Vec<String> = settings
                .get("RETRIEVE_API_LABS")
                .map(|value| {
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|lab| !lab.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            commands::retrieve_api_command(
                host,
                username,
                settings.get("RETRIEVE_API_PASSWORD"),
                &labs,
                &output,
            )?;
            Ok(output)
        }
        "inspect" => {
            let task = "validating inspect output parser settings";
            settings.require_all(task, &["RETRIEVE_INSPECT_INPUT", "RETRIEVE_INSPECT_OUTPUT"])?;
            let input = PathBuf::from(settings.require(task, "RETRIEVE_INSPECT_INPUT")?);
            let output = PathBuf::from(settings.require(task, "RETRIEVE_INSPECT_OUTPUT")?);
            let host = settings.get("RETRIEVE_INSPECT_HOST").unwrap_or("localhost");
            commands::parse_inspect_command(&input, &output, host)?;
            Ok(output)
        }
        other => Err(ConfigError::InvalidChoice {
            key: BASIC_RETRIEVAL_METHOD.to_string(),
            value: other.to_string(),
        }
        .into()),
    }
}

fn run_port_patching(settings: &QuickConfig, datafile: &Path) -> Result<()> {
    let portfile = PathBuf::from(settings.require("patching ports", RETRIEVE_PORTS_FILE)?);
    let output = settings.get("RETRIEVE_PORTS_OUTPUT").map(PathBuf::from);
    commands::inject_ports_command(&portfile, datafile, output.as_deref())
}

fn run_launch(settings: &QuickConfig) -> Result<()> {
    let method = settings
        .require("selecting the launch method", BASIC_LAUNCH_METHOD)?
        .to_ascii_lowercase();

    let prefix = match method.as_str() {
        "securecrt" => "SECURECRT",
        "putty" => "PUTTY",
        "mtputty" => "MTPUTTY",
        "native-openssh" => "OPENSSH",
        other => {
            return Err(ConfigError::InvalidChoice {
                key: BASIC_LAUNCH_METHOD.to_string(),
                value: other.to_string(),
            }
            .into())
        }
    };

    let creds_key = format!("LAUNCH_{prefix}_CREDS");
    let input_key = format!("LAUNCH_{prefix}_INPUT");
    let terminal_key = format!("LAUNCH_{prefix}_TERMINAL");
    let task = format!("validating {} settings", method);

    let mut required = vec![creds_key.as_str(), input_key.as_str()];
    if prefix == "OPENSSH" {
        required.push(terminal_key.as_str());
    }
    settings.require_all(&task, &required)?;

    let creds = PathBuf::from(settings.require(&task, &creds_key)?);
    let input = PathBuf::from(settings.require(&task, &input_key)?);
    let address_method = parse_address_method(settings, &format!("LAUNCH_{prefix}_METHOD"))?;
    let jumphost = settings.get(&format!("LAUNCH_{prefix}_JUMPHOST"));

    match prefix {
        "SECURECRT" => {
            let executable = settings
                .get("LAUNCH_SECURECRT_EXECUTABLE")
                .unwrap_or("securecrt");
            commands::launch_securecrt(&input, &creds, address_method, jumphost, executable)
        }
        "PUTTY" => {
            let executable = settings.get("LAUNCH_PUTTY_EXECUTABLE").unwrap_or("putty");
            commands::launch_putty(&input, &creds, address_method, jumphost, executable)
        }
        "MTPUTTY" => {
            let config = PathBuf::from(
                settings
                    .get("LAUNCH_MTPUTTY_CONFIG")
                    .unwrap_or(mtputty::DEFAULT_CONFIG_PATH),
            );
            commands::launch_mtputty(&input, &creds, address_method, jumphost, &config)
        }
        "OPENSSH" => {
            let executable = settings.get("LAUNCH_OPENSSH_EXECUTABLE").unwrap_or("ssh");
            let terminal = settings.require(&task, &terminal_key)?;
            commands::launch_openssh(
                &input,
                &creds,
                address_method,
                jumphost,
                executable,
                terminal,
            )
        }
        _ => unreachable!("prefix is one of the four adapters"),
    }
}

fn parse_address_method(settings: &QuickConfig, key: &str) -> Result<AddressMethod, ConfigError> {
    match settings.get(key) {
        None => Ok(AddressMethod::Dns),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidChoice {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
