//! Queries the local tmate session for its SSH connection string.

use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// Errors that can occur when querying tmate
#[derive(Debug, Error)]
pub enum TmateError {
    /// The tmate binary could not be launched
    #[error("failed to run tmate: {0}")]
    Spawn(#[from] std::io::Error),

    /// tmate exited with a failure
    #[error("failed to interact with tmate, are you in a tmate session?")]
    NotInSession,

    /// tmate produced something other than an ssh command
    #[error("no ssh string returned, is the tmate session active?")]
    NoConnection,
}

/// Returns the current tmate SSH connection target (`user@host`).
pub fn ssh_connection() -> Result<String, TmateError> {
    let output = Command::new("tmate")
        .args(["display", "-p", "#{tmate_ssh}"])
        .output()?;
    if !output.status.success() {
        return Err(TmateError::NotInSession);
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let connection = parse_ssh_output(&stdout)?;
    debug!(%connection, "resolved tmate connection string");
    Ok(connection)
}

/// Pulls the connection target out of tmate's `ssh <target>` output.
fn parse_ssh_output(output: &str) -> Result<String, TmateError> {
    if !output.starts_with("ssh") {
        return Err(TmateError::NoConnection);
    }
    output
        .split_whitespace()
        .nth(1)
        .map(str::to_owned)
        .ok_or(TmateError::NoConnection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_output() {
        let connection = parse_ssh_output("ssh abcdef@nyc1.tmate.io\n").expect("Should parse");
        assert_eq!(connection, "abcdef@nyc1.tmate.io");
    }

    #[test]
    fn test_parse_rejects_non_ssh_output() {
        let error = parse_ssh_output("no current session\n").expect_err("Should fail");
        assert!(matches!(error, TmateError::NoConnection));
    }

    #[test]
    fn test_parse_rejects_empty_output() {
        assert!(matches!(
            parse_ssh_output(""),
            Err(TmateError::NoConnection)
        ));
    }

    #[test]
    fn test_parse_rejects_bare_ssh() {
        // "ssh" with no target is as useless as no output at all
        assert!(matches!(
            parse_ssh_output("ssh\n"),
            Err(TmateError::NoConnection)
        ));
    }
}
