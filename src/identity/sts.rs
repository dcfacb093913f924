//! AWS STS identity provider.
//!
//! Calls `AssumeRole` with an MFA serial and one-time code, using the base
//! credentials the AWS SDK finds for the configured profile (environment,
//! shared config/credentials files, instance metadata).

use crate::cache::CredentialRecord;
use crate::identity::{AssumeRoleRequest, IdentityProvider};
use crate::{Result, RooError};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sts::error::DisplayErrorContext;
use aws_sdk_sts::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Region used for STS calls when none is configured.
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Identity provider backed by AWS STS.
#[derive(Debug, Clone, Default)]
pub struct StsIdentityProvider {
    profile: Option<String>,
}

impl StsIdentityProvider {
    /// Creates a provider using the base AWS profile `profile`, or the SDK's
    /// default credential chain if `None` or empty.
    pub fn new(profile: Option<String>) -> Self {
        Self {
            profile: profile.filter(|p| !p.is_empty()),
        }
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    async fn sdk_config(&self, credentials: Option<&CredentialRecord>) -> SdkConfig {
        // Priority: ENV vars -> Config file -> EC2 metadata -> DEFAULT_AWS_REGION
        let loader = || {
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(profile) = &self.profile {
                loader = loader.profile_name(profile);
            }
            if let Some(creds) = credentials {
                loader = loader.credentials_provider(aws_sdk_sts::config::Credentials::new(
                    creds.access_key_id.clone(),
                    creds.secret_access_key.clone(),
                    Some(creds.session_token.clone()),
                    None,
                    "roo",
                ));
            }
            loader
        };

        let loaded = loader().load().await;
        if let Some(region) = loaded.region().map(|r| r.to_string()) {
            debug!("Using region: {}", region);
            return loaded;
        }

        debug!("No region configured, using default {} for STS", DEFAULT_AWS_REGION);
        loader().region(Region::new(DEFAULT_AWS_REGION)).load().await
    }
}

#[async_trait]
impl IdentityProvider for StsIdentityProvider {
    fn name(&self) -> &str {
        "sts"
    }

    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<CredentialRecord> {
        info!("Calling AWS STS AssumeRole");
        debug!("Role ARN: {}", request.role_arn);
        debug!("MFA serial: {}", request.mfa_serial);
        debug!("Session name: {}", request.session_name);

        let client = Client::new(&self.sdk_config(None).await);

        let response = client
            .assume_role()
            .role_arn(&request.role_arn)
            .role_session_name(&request.session_name)
            .serial_number(&request.mfa_serial)
            .token_code(&request.token_code)
            .send()
            .await
            .map_err(|e| {
                RooError::Identity(format!(
                    "unable to assume role {}: {}",
                    request.role_arn,
                    DisplayErrorContext(&e)
                ))
            })?;

        if let Some(user) = response.assumed_role_user() {
            info!("Assumed role: {}", user.arn());
        }

        let sts_creds = response
            .credentials()
            .ok_or_else(|| RooError::Identity("AWS STS returned no credentials".to_string()))?;

        let expiration = sts_creds.expiration();
        let expires_at = DateTime::<Utc>::from_timestamp(expiration.secs(), expiration.subsec_nanos())
            .ok_or_else(|| {
                RooError::Identity(format!(
                    "AWS STS returned an out-of-range expiration: {:?}",
                    expiration
                ))
            })?;

        Ok(CredentialRecord::new(
            sts_creds.access_key_id(),
            sts_creds.secret_access_key(),
            sts_creds.session_token(),
            expires_at,
        ))
    }

    async fn caller_identity(&self, credentials: Option<&CredentialRecord>) -> Result<String> {
        let client = Client::new(&self.sdk_config(credentials).await);

        let response = client.get_caller_identity().send().await.map_err(|e| {
            RooError::Identity(format!(
                "unable to get caller identity: {}",
                DisplayErrorContext(&e)
            ))
        })?;

        response
            .arn()
            .map(str::to_string)
            .ok_or_else(|| RooError::Identity("AWS STS returned no caller ARN".to_string()))
    }
}
