//! Bounded execution of external programs.

use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

use super::OsdError;

/// Run `command` to completion, killing it once `timeout` elapses.
///
/// Standard input is closed; standard output and error are captured.
///
/// # Errors
///
/// - [`OsdError::NotInstalled`] if the program cannot be found
/// - [`OsdError::TimedOut`] if it runs longer than `timeout`
/// - [`OsdError::CommandFailed`] on a non-zero exit status
pub async fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<Output, OsdError> {
    let program = command
        .as_std()
        .get_program()
        .to_string_lossy()
        .into_owned();

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => OsdError::NotInstalled {
            program: program.clone(),
        },
        _ => OsdError::Io(e),
    })?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| OsdError::TimedOut {
            program: program.clone(),
            timeout,
        })??;

    if !output.status.success() {
        return Err(OsdError::CommandFailed {
            program,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}
