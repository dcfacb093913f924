//! Handing credentials to other programs.
//!
//! Two ways out: run the user's command with the credentials in its
//! environment, or write them into an AWS CLI profile with
//! `aws configure set`.

use crate::cache::CredentialRecord;
use crate::validation::validate_profile_name;
use crate::{Result, RooError};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Executes a command and returns stdout as a string.
///
/// # Errors
///
/// - [`RooError::CommandNotInstalled`] if the program is not found
/// - [`RooError::CommandFailed`] if the exit code is non-zero
pub async fn run_command(program: &str, args: &[&str]) -> Result<String> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let output = cmd.output().await.map_err(|e| spawn_error(program, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RooError::CommandFailed(format!(
            "{} failed with exit code {}: {}",
            program,
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }

    String::from_utf8(output.stdout).map_err(|e| {
        RooError::Other(anyhow::anyhow!("Invalid UTF-8 in command output: {}", e))
    })
}

/// Runs `command` with the credentials exported and the terminal inherited.
///
/// Returns the child's exit code; a child killed by a signal reports 1.
///
/// # Errors
///
/// - [`RooError::MissingCommand`] if `command` is empty
/// - [`RooError::CommandNotInstalled`] if the program is not found
pub async fn run_with_credentials(command: &[String], credentials: &CredentialRecord) -> Result<i32> {
    let (program, args) = command.split_first().ok_or(RooError::MissingCommand)?;

    debug!("Executing: {:?}", command);

    let status = Command::new(program)
        .args(args)
        .envs(credentials.env_vars())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| spawn_error(program, e))?;

    Ok(status.code().unwrap_or(1))
}

fn spawn_error(program: &str, e: std::io::Error) -> RooError {
    if e.kind() == std::io::ErrorKind::NotFound {
        RooError::CommandNotInstalled(format!("{} command not found", program))
    } else {
        RooError::Io(e)
    }
}

/// Writes credentials into a named AWS CLI profile.
///
/// Each key is set with a separate `aws --profile <name> configure set`
/// call, so other keys in the profile are left alone.
#[derive(Debug, Clone)]
pub struct ProfileWriter {
    program: String,
}

impl ProfileWriter {
    /// Keys written to the profile, in order.
    pub const KEYS: [&'static str; 4] = [
        "aws_access_key_id",
        "aws_secret_access_key",
        "aws_session_token",
        "expiration_time",
    ];

    /// Writer using the `aws` executable from PATH.
    pub fn new() -> Self {
        Self::with_program("aws")
    }

    /// Writer using a specific AWS CLI executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Writes the credentials to `profile`.
    ///
    /// A key that fails to write is logged and skipped; the remaining keys are
    /// still attempted. Returns the number of keys written.
    ///
    /// # Errors
    ///
    /// - an invalid profile name
    /// - [`RooError::CommandNotInstalled`] if the AWS CLI cannot be found
    pub async fn write(&self, profile: &str, credentials: &CredentialRecord) -> Result<usize> {
        validate_profile_name(profile)?;

        let expiration = credentials.expires_at.to_rfc3339();
        let values = [
            credentials.access_key_id.as_str(),
            credentials.secret_access_key.as_str(),
            credentials.session_token.as_str(),
            expiration.as_str(),
        ];

        let mut written = 0;
        for (key, value) in Self::KEYS.into_iter().zip(values) {
            let args = ["--profile", profile, "configure", "set", key, value];
            match run_command(&self.program, &args).await {
                Ok(_) => written += 1,
                Err(e @ RooError::CommandNotInstalled(_)) => return Err(e),
                Err(e) => warn!("Unable to write {} to profile {}: {}", key, profile, e),
            }
        }

        Ok(written)
    }
}

impl Default for ProfileWriter {
    fn default() -> Self {
        Self::new()
    }
}
