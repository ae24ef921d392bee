//! Argument-vector builders for the interactive launch adapters
//!
//! Pure functions: a resolved session plus an optional jump host map
//! deterministically to the argv handed to the external executable.
//! Password flags are omitted whenever the session carries no password.

use cls_core::ResolvedSession;

use crate::error::LaunchError;

/// SecureCRT: `/T /ssh2 <addr> /l <user> [/password <pw>] /P <port>
/// /accepthostkeys`, with the jump host expressed as a firewall session
pub fn securecrt_args(
    executable: &str,
    session: &ResolvedSession,
    jumphost: Option<&str>,
) -> Vec<String> {
    let mut argv = vec![executable.to_string()];
    if let Some(jumphost) = jumphost {
        argv.push(format!("/firewall=Session:{jumphost}"));
    }
    argv.extend([
        "/T".to_string(),
        "/ssh2".to_string(),
        session.address.clone(),
        "/l".to_string(),
        session.username.clone(),
    ]);
    if let Some(password) = &session.password {
        argv.push("/password".to_string());
        argv.push(password.clone());
    }
    argv.extend([
        "/P".to_string(),
        session.ssh_port().to_string(),
        "/accepthostkeys".to_string(),
    ]);
    argv
}

/// PuTTY: `[-load <jh>] -ssh <addr> -l <user> -P <port> [-pw <pw>]`
pub fn putty_args(
    executable: &str,
    session: &ResolvedSession,
    jumphost: Option<&str>,
) -> Vec<String> {
    let mut argv = vec![executable.to_string()];
    if let Some(jumphost) = jumphost {
        argv.push("-load".to_string());
        argv.push(jumphost.to_string());
    }
    argv.extend([
        "-ssh".to_string(),
        session.address.clone(),
        "-l".to_string(),
        session.username.clone(),
        "-P".to_string(),
        session.ssh_port().to_string(),
    ]);
    if let Some(password) = &session.password {
        argv.push("-pw".to_string());
        argv.push(password.clone());
    }
    argv
}

/// Native OpenSSH wrapped in the user's terminal of choice:
/// `<terminal command...> <ssh> [-J <jh>] -l <user> -p <port> <addr>`
///
/// The terminal command is a full shell-style string and is split with
/// shlex. Password auto-fill is never available on this path.
pub fn openssh_args(
    terminal: &str,
    executable: &str,
    session: &ResolvedSession,
    jumphost: Option<&str>,
) -> Result<Vec<String>, LaunchError> {
    let mut argv = shlex::split(terminal).ok_or_else(|| LaunchError::InvalidTerminalCommand {
        command: terminal.to_string(),
    })?;
    if argv.is_empty() {
        return Err(LaunchError::InvalidTerminalCommand {
            command: terminal.to_string(),
        });
    }

    argv.push(executable.to_string());
    if let Some(jumphost) = jumphost {
        argv.push("-J".to_string());
        argv.push(jumphost.to_string());
    }
    argv.extend([
        "-l".to_string(),
        session.username.clone(),
        "-p".to_string(),
        session.ssh_port().to_string(),
        session.address.clone(),
    ]);
    Ok(argv)
}
