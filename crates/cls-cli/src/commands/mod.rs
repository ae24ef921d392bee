//! CLI command implementations

mod launch;
mod node_data;

pub use launch::{
    launch_mtputty, launch_openssh, launch_putty, launch_securecrt, prepare_sessions,
};
pub use node_data::{inject_ports_command, parse_inspect_command, retrieve_api_command};
