//! Credential exchange with an identity provider.
//!
//! The [`IdentityProvider`] trait is the seam between roo and whatever turns
//! an MFA code plus a role ARN into temporary credentials. The cache and role
//! lookup never depend on it; only the orchestrator in [`crate::app`] does.
//!
//! # Implementations
//!
//! - [`sts::StsIdentityProvider`]: AWS STS `AssumeRole` via the AWS SDK
//!   (feature `sts`)
//! - [`mock::MockIdentityProvider`]: in-memory provider with error injection
//!   (feature `mock`)

use crate::cache::CredentialRecord;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "sts")]
pub mod sts;

/// Prefix of the role session names roo creates.
pub const SESSION_NAME_PREFIX: &str = "roo";

/// Parameters for a single MFA-protected role assumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    /// ARN of the role to assume
    pub role_arn: String,
    /// MFA device serial or ARN
    pub mfa_serial: String,
    /// One-time code from the MFA device
    pub token_code: String,
    /// Role session name, visible in CloudTrail
    pub session_name: String,
}

impl AssumeRoleRequest {
    /// Creates a request with a fresh session name.
    pub fn new(
        role_arn: impl Into<String>,
        mfa_serial: impl Into<String>,
        token_code: impl Into<String>,
    ) -> Self {
        Self {
            role_arn: role_arn.into(),
            mfa_serial: mfa_serial.into(),
            token_code: token_code.into(),
            session_name: session_name(),
        }
    }
}

/// Session name of the form `roo-<unix-nanos>`.
pub fn session_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}-{}", SESSION_NAME_PREFIX, nanos)
}

/// A service that exchanges an MFA code for temporary role credentials.
///
/// The call may block for as long as the provider takes; roo imposes no
/// timeout of its own.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the provider name (e.g., "sts", "mock").
    fn name(&self) -> &str;

    /// Assumes the requested role and returns the issued credentials.
    ///
    /// # Errors
    ///
    /// Returns [`RooError::Identity`](crate::RooError::Identity) if the
    /// exchange is rejected or the provider cannot be reached.
    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<CredentialRecord>;

    /// Returns the ARN of the caller.
    ///
    /// With `None` this is the base identity used for the exchange; with
    /// credentials it is the identity those credentials belong to.
    async fn caller_identity(&self, credentials: Option<&CredentialRecord>) -> Result<String>;
}

#[async_trait]
impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<CredentialRecord> {
        (**self).assume_role(request).await
    }

    async fn caller_identity(&self, credentials: Option<&CredentialRecord>) -> Result<String> {
        (**self).caller_identity(credentials).await
    }
}
