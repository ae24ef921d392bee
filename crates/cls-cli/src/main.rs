//! clab-sessions CLI
//!
//! Single binary for all clab-sessions operations:
//! - node-data (retrieve or parse lab inventories into the canonical format)
//! - launch (open terminal sessions to lab devices)
//! - quick (run retrieval, port patching, and launch from one config file)

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clab_sessions::commands;
use clab_sessions::launch::mtputty;
use clab_sessions::quick;
use cls_core::AddressMethod;

#[derive(Parser)]
#[command(name = "clab-sessions")]
#[command(author, version, about = "Containerlab SSH session launcher")]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve or convert lab device data into the canonical format
    NodeData {
        #[command(subcommand)]
        action: NodeDataAction,
    },

    /// Launch SSH sessions to lab devices with a terminal emulator
    Launch {
        #[command(subcommand)]
        adapter: LaunchAdapter,
    },

    /// Run retrieval, optional port patching, and launch from one config file
    Quick {
        /// Path to the quick config file
        #[arg(short, long, default_value = "config.env")]
        config: PathBuf,
    },
}

#[derive(Subcommand)]
enum NodeDataAction {
    /// Retrieve running nodes from the Containerlab API server
    RetrieveApi {
        /// Containerlab host running the API server
        #[arg(long, default_value = "localhost")]
        host: String,
        /// Username for the API server
        #[arg(short, long)]
        username: String,
        /// Password for the API server (falls back to the CLABPASS
        /// environment variable, then an interactive prompt)
        #[arg(short, long)]
        password: Option<String>,
        /// File to write the device data to
        #[arg(short, long)]
        output: PathBuf,
        /// Restrict retrieval to the named lab (repeatable)
        #[arg(short, long = "lab")]
        labs: Vec<String>,
    },

    /// Parse an exported `containerlab inspect --format json` report
    ParseInspect {
        /// Exported inspect report to read
        #[arg(short, long)]
        input: PathBuf,
        /// File to write the device data to
        #[arg(short, long)]
        output: PathBuf,
        /// Containerlab host the report was exported from
        #[arg(long, default_value = "localhost")]
        host: String,
    },

    /// Overwrite service ports in a device data file from an override file
    InjectPorts {
        /// YAML file with the port overrides
        #[arg(short, long)]
        portfile: PathBuf,
        /// Device data file to patch
        #[arg(short, long)]
        datafile: PathBuf,
        /// Write the result here instead of overwriting the data file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Options shared by every launch adapter
#[derive(clap::Args)]
struct LaunchCommon {
    /// Device data file in the canonical format
    #[arg(short, long)]
    input: PathBuf,

    /// YAML file with the credential rules
    #[arg(short, long)]
    creds: PathBuf,

    /// How to address the devices
    #[arg(short, long, default_value = "dns", value_parser = AddressMethod::from_str)]
    method: AddressMethod,

    /// Jump host session or alias to tunnel through
    #[arg(short, long = "session")]
    jumphost: Option<String>,
}

#[derive(Subcommand)]
enum LaunchAdapter {
    /// Launch SecureCRT tabs
    Securecrt {
        #[command(flatten)]
        common: LaunchCommon,
        /// SecureCRT executable to invoke
        #[arg(short, long, default_value = "securecrt")]
        executable: String,
    },

    /// Launch PuTTY windows
    Putty {
        #[command(flatten)]
        common: LaunchCommon,
        /// PuTTY executable to invoke
        #[arg(short, long, default_value = "putty")]
        executable: String,
    },

    /// Stage sessions into the MTPuTTY configuration file
    Mtputty {
        #[command(flatten)]
        common: LaunchCommon,
        /// MTPuTTY configuration file to update
        #[arg(long, default_value = mtputty::DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Launch OpenSSH inside a terminal emulator of choice
    Openssh {
        #[command(flatten)]
        common: LaunchCommon,
        /// ssh executable to invoke
        #[arg(short, long, default_value = "ssh")]
        executable: String,
        /// Terminal emulator command line to wrap ssh in
        #[arg(short, long)]
        terminal: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::NodeData { action } => match action {
            NodeDataAction::RetrieveApi {
                host,
                username,
                password,
                output,
                labs,
            } => {
                commands::retrieve_api_command(
                    &host,
                    &username,
                    password.as_deref(),
                    &labs,
                    &output,
                )?;
            }
            NodeDataAction::ParseInspect {
                input,
                output,
                host,
            } => {
                commands::parse_inspect_command(&input, &output, &host)?;
            }
            NodeDataAction::InjectPorts {
                portfile,
                datafile,
                output,
            } => {
                commands::inject_ports_command(&portfile, &datafile, output.as_deref())?;
            }
        },

        Commands::Launch { adapter } => match adapter {
            LaunchAdapter::Securecrt { common, executable } => {
                commands::launch_securecrt(
                    &common.input,
                    &common.creds,
                    common.method,
                    common.jumphost.as_deref(),
                    &executable,
                )?;
            }
            LaunchAdapter::Putty { common, executable } => {
                commands::launch_putty(
                    &common.input,
                    &common.creds,
                    common.method,
                    common.jumphost.as_deref(),
                    &executable,
                )?;
            }
            LaunchAdapter::Mtputty { common, config } => {
                commands::launch_mtputty(
                    &common.input,
                    &common.creds,
                    common.method,
                    common.jumphost.as_deref(),
                    &config,
                )?;
            }
            LaunchAdapter::Openssh {
                common,
                executable,
                terminal,
            } => {
                commands::launch_openssh(
                    &common.input,
                    &common.creds,
                    common.method,
                    common.jumphost.as_deref(),
                    &executable,
                    &terminal,
                )?;
            }
        },

        Commands::Quick { config } => {
            quick::run(&config)?;
        }
    }

    Ok(())
}
