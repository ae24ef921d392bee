//! node-data command implementations: ingestion and port patching

use std::path::Path;

use anyhow::{Context, Result};

use cls_core::{api, ingest, ports};

use crate::output::print_success;

/// Retrieve running nodes from the Containerlab API and write the canonical
/// document
pub fn retrieve_api_command(
    host: &str,
    username: &str,
    password: Option<&str>,
    labs: &[String],
    output: &Path,
) -> Result<()> {
    let password = api::resolve_password(password)?;
    let doc = ingest::retrieve_from_api(host, username, &password, labs)
        .context("failed to retrieve running nodes from the Containerlab API")?;
    doc.save(output)?;
    print_success(&format!(
        "Output successfully written to {}",
        output.display()
    ));
    Ok(())
}

/// Parse an exported inspect report and write the canonical document
pub fn parse_inspect_command(input: &Path, output: &Path, host: &str) -> Result<()> {
    let doc = ingest::parse_inspect_report(input, host)
        .with_context(|| format!("failed to parse inspect output from {}", input.display()))?;
    doc.save(output)?;
    print_success(&format!(
        "Output successfully written to {}",
        output.display()
    ));
    Ok(())
}

/// Apply a port-override file onto a rendered canonical document
pub fn inject_ports_command(
    portfile: &Path,
    datafile: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let written = ports::inject_custom_ports(portfile, datafile, output)
        .context("failed to inject custom ports")?;
    print_success(&format!(
        "Output with custom port numbers written to {}",
        written.display()
    ));
    Ok(())
}
