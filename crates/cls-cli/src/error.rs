//! CLI-layer error types

use std::path::PathBuf;
use thiserror::Error;

/// Quick-orchestrator configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The quick config file could not be read or parsed
    #[error("failed to read quick config {path}: {source}", path = path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    /// One or more required keys are absent; all of them are reported at once
    #[error(
        "error while {task}, the following required keys are not present in {config}: {keys}",
        config = config.display(),
        keys = keys.join(", ")
    )]
    MissingKeys {
        task: String,
        config: PathBuf,
        keys: Vec<String>,
    },

    /// A selector key holds a value outside its accepted set
    #[error("the value {value:?} provided under the {key:?} option is not valid")]
    InvalidChoice { key: String, value: String },
}

/// Session-launch errors
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The external terminal executable could not be located or started.
    /// Reported per device; does not abort the remaining devices.
    #[error(
        "error running launch command: {executable} not found. Try the following steps:\n\
         (1) Running the executable provided directly in the shell to test its functionality\n\
         (2) Using an absolute path, if you are using a relative path\n\
         (3) Confirming that the file exists and that your user has permission to view/execute it"
    )]
    ExecutableNotFound { executable: String },

    /// The spawn failed for a reason other than a missing executable
    #[error("failed to start {executable}: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    /// The terminal command string could not be split into arguments
    #[error("invalid terminal command {command:?}")]
    InvalidTerminalCommand { command: String },

    /// The MTPuTTY configuration file could not be backed up
    #[error("failed to back up {path} to {backup}: {source}", path = path.display(), backup = backup.display())]
    Backup {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The MTPuTTY configuration file could not be read or written
    #[error("failed to access MTPuTTY configuration {path}: {source}", path = path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The MTPuTTY configuration is not valid XML
    #[error("failed to parse MTPuTTY configuration {path}: {source}", path = path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: xmltree::ParseError,
    },

    /// The MTPuTTY configuration could not be serialized back
    #[error("failed to write MTPuTTY configuration {path}: {source}", path = path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: xmltree::Error,
    },

    /// The MTPuTTY configuration lacks the Servers/Putty section
    #[error("MTPuTTY configuration {path} has no Servers/Putty section", path = path.display())]
    MissingServerSection { path: PathBuf },
}
