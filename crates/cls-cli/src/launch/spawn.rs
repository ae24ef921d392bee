//! Fire-and-forget process spawning for the interactive adapters

use std::process::{Command, Stdio};

use crate::error::LaunchError;

/// Spawn the external terminal process described by `argv` and return
/// without waiting on it
///
/// The orchestrator never supervises spawned terminals. A missing
/// executable maps to [`LaunchError::ExecutableNotFound`], which callers
/// report per device without aborting the remaining batch.
pub fn spawn_detached(executable: &str, argv: &[String]) -> Result<(), LaunchError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(LaunchError::InvalidTerminalCommand {
            command: String::new(),
        });
    };

    match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => {
            tracing::debug!(program = %program, pid = child.id(), "launched terminal process");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(LaunchError::ExecutableNotFound {
                executable: executable.to_string(),
            })
        }
        Err(source) => Err(LaunchError::Spawn {
            executable: executable.to_string(),
            source,
        }),
    }
}
