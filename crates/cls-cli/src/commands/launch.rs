//! launch command implementations
//!
//! Every launch command builds the resolved-session list exactly once, then
//! hands it to the selected adapter. Resolution failures abort the whole
//! invocation; a missing executable is reported per device and the batch
//! continues, since each spawn is independent.

use std::path::Path;

use anyhow::{Context, Result};

use cls_core::creds::CredentialRules;
use cls_core::resolve::resolve;
use cls_core::{AddressMethod, CanonicalDocument, ResolvedSession};

use crate::error::LaunchError;
use crate::launch::{args, mtputty, spawn_detached};
use crate::output::{print_error, print_info, print_warning};

/// Load the canonical document and credential rules, then resolve every
/// device into a session, in document order
pub fn prepare_sessions(
    input: &Path,
    creds: &Path,
    method: AddressMethod,
) -> Result<Vec<ResolvedSession>> {
    let doc = CanonicalDocument::load(input)
        .with_context(|| format!("failed to import lab devices from {}", input.display()))?;
    let rules = CredentialRules::load(creds)
        .with_context(|| format!("failed to import device credentials from {}", creds.display()))?;

    let mut sessions = Vec::with_capacity(doc.device_count());
    for (lab, devices) in &doc.labs {
        tracing::debug!(lab = %lab, devices = devices.len(), "resolving sessions");
        for device in devices {
            let session = resolve(device, &rules, method, &doc.metadata)?;
            if session.password.is_none() {
                print_warning(&format!(
                    "Unable to retrieve password for device {}. Password autofill won't be available for this device",
                    session.name
                ));
            }
            sessions.push(session);
        }
    }
    Ok(sessions)
}

fn announce(adapter: &str, input: &Path, count: usize, jumphost: Option<&str>) {
    print_info(&format!(
        "Preparing to launch {adapter} sessions for {count} devices from {}...",
        input.display()
    ));
    match jumphost {
        Some(jumphost) => print_info(&format!("Using jumphost: {jumphost}")),
        None => print_info("Not using a jumphost; connecting via localhost"),
    }
}

/// Spawn one terminal per session, reporting missing executables per device
/// without aborting the batch
fn launch_each(
    sessions: &[ResolvedSession],
    executable: &str,
    build: impl Fn(&ResolvedSession) -> Result<Vec<String>, LaunchError>,
) -> Result<()> {
    for session in sessions {
        print_info(&format!(
            "Launching SSH session to device {} using address {}, port {}, username {}",
            session.name,
            session.address,
            session.ssh_port(),
            session.username
        ));
        let argv = build(session)?;
        match spawn_detached(executable, &argv) {
            Ok(()) => {}
            Err(e @ LaunchError::ExecutableNotFound { .. }) => {
                // independent spawns: keep going with the next device
                print_error(&e.to_string());
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Launch SecureCRT terminals to lab devices
pub fn launch_securecrt(
    input: &Path,
    creds: &Path,
    method: AddressMethod,
    jumphost: Option<&str>,
    executable: &str,
) -> Result<()> {
    let sessions = prepare_sessions(input, creds, method)?;
    announce("SecureCRT", input, sessions.len(), jumphost);
    launch_each(&sessions, executable, |session| {
        Ok(args::securecrt_args(executable, session, jumphost))
    })
}

/// Launch windowed PuTTY terminals to lab devices
pub fn launch_putty(
    input: &Path,
    creds: &Path,
    method: AddressMethod,
    jumphost: Option<&str>,
    executable: &str,
) -> Result<()> {
    let sessions = prepare_sessions(input, creds, method)?;
    announce("PuTTY", input, sessions.len(), jumphost);
    launch_each(&sessions, executable, |session| {
        Ok(args::putty_args(executable, session, jumphost))
    })
}

/// Launch sessions using OpenSSH inside the user's terminal of choice
pub fn launch_openssh(
    input: &Path,
    creds: &Path,
    method: AddressMethod,
    jumphost: Option<&str>,
    executable: &str,
    terminal: &str,
) -> Result<()> {
    let sessions = prepare_sessions(input, creds, method)?;
    announce("native OpenSSH", input, sessions.len(), jumphost);
    launch_each(&sessions, executable, |session| {
        args::openssh_args(terminal, executable, session, jumphost)
    })
}

/// Stage MTPuTTY sessions for lab devices (launched later from the MTPuTTY
/// GUI)
pub fn launch_mtputty(
    input: &Path,
    creds: &Path,
    method: AddressMethod,
    jumphost: Option<&str>,
    config: &Path,
) -> Result<()> {
    let sessions = prepare_sessions(input, creds, method)?;
    match jumphost {
        Some(jumphost) => print_info(&format!("Using jumphost: {jumphost}")),
        None => print_info("Not using a jumphost; connecting via localhost"),
    }

    let backup = Path::new(mtputty::BACKUP_FILE);
    mtputty::stage_sessions(config, backup, &sessions, jumphost)?;
    print_info(&format!(
        "Backup of the MTPuTTY configuration successfully created in the {:?} file in the current directory",
        mtputty::BACKUP_FILE
    ));
    print_info(&format!(
        "New MTPuTTY configuration successfully written to {}",
        config.display()
    ));
    Ok(())
}
