//! Error types for roo operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`RooError`].
pub type Result<T> = std::result::Result<T, RooError>;

/// Errors that can occur while resolving roles, caching credentials, or
/// launching the user's command.
///
/// Secret material never appears in any variant's message.
#[derive(Debug, Error)]
pub enum RooError {
    /// No configured role matched the search term by ARN, name, or alias.
    #[error("unable to find role by ARN, name, or alias: {0}")]
    RoleNotFound(String),

    /// No role was requested and none is flagged as default.
    #[error("no role provided (--role) and no default role configured")]
    NoDefaultRole,

    /// The role ARN does not have the `arn:<partition>:iam::<account>:role/<name>` shape.
    #[error("invalid role ARN '{arn}': {reason}")]
    InvalidArn {
        /// The offending ARN
        arn: String,
        /// What was wrong with it
        reason: String,
    },

    /// The MFA one-time code was rejected before being sent anywhere.
    #[error("invalid MFA code: {0}")]
    InvalidMfaCode(String),

    /// The config file does not exist yet.
    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The config file exists but could not be understood.
    #[error("config file {}: {message}", path.display())]
    Config {
        /// Config file location
        path: PathBuf,
        /// Parser or validation message
        message: String,
    },

    /// Writing the credential cache failed.
    ///
    /// The orchestrator may still use the in-memory credentials for the
    /// current invocation.
    #[error("unable to write credential cache {}: {source}", path.display())]
    CacheWrite {
        /// Cache file location
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The credential exchange with the identity provider failed.
    #[error("identity exchange failed: {0}")]
    Identity(String),

    /// Writing to a profile was requested without naming one.
    #[error("no target profile: pass --target-profile or set target_aws_profile for the role")]
    MissingTargetProfile,

    /// No command was given to run with the credentials.
    #[error("no command provided to execute")]
    MissingCommand,

    /// Required executable is not on the PATH.
    #[error("command not installed: {0}")]
    CommandNotInstalled(String),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    CommandFailed(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RooError {
    /// Creates an [`RooError::InvalidArn`] for `arn`.
    pub fn invalid_arn(arn: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArn {
            arn: arn.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code the binary reports for this error.
    ///
    /// Setup problems the user is expected to fix by hand (fresh config,
    /// nothing to run) use 100, everything else 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ConfigNotFound(_) | Self::MissingCommand => 100,
            _ => 1,
        }
    }
}
