//! Mock identity provider for testing.
//!
//! Issues canned credentials in memory, records every request, and supports
//! error injection to simulate a rejected exchange.

use crate::cache::CredentialRecord;
use crate::identity::{AssumeRoleRequest, IdentityProvider};
use crate::{Result, RooError};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Mutex;

/// Mock identity provider.
///
/// # Example
///
/// ```
/// use roo::identity::mock::MockIdentityProvider;
/// use roo::identity::{AssumeRoleRequest, IdentityProvider};
///
/// #[tokio::main]
/// async fn main() -> roo::Result<()> {
///     let provider = MockIdentityProvider::new();
///     let request = AssumeRoleRequest::new(
///         "arn:aws:iam::111111111111:role/Admin",
///         "arn:aws:iam::999999999999:mfa/me",
///         "123456",
///     );
///
///     let creds = provider.assume_role(&request).await?;
///     assert!(creds.access_key_id.starts_with("ASIAMOCK"));
///     assert_eq!(provider.assume_count(), 1);
///
///     Ok(())
/// }
/// ```
pub struct MockIdentityProvider {
    lifetime: Duration,
    requests: Mutex<Vec<AssumeRoleRequest>>,

    /// Error to return from `assume_role()`
    pub assume_error: Option<RooError>,
    /// Error to return from `caller_identity()`
    pub identity_error: Option<RooError>,
}

impl MockIdentityProvider {
    /// Creates a provider issuing credentials valid for one hour.
    pub fn new() -> Self {
        Self {
            lifetime: Duration::hours(1),
            requests: Mutex::new(Vec::new()),
            assume_error: None,
            identity_error: None,
        }
    }

    /// Sets how long issued credentials stay valid. Negative values issue
    /// already-expired credentials.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Number of `assume_role()` calls so far, failed ones included.
    pub fn assume_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<AssumeRoleRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<CredentialRecord> {
        let count = {
            let mut requests = self
                .requests
                .lock()
                .map_err(|e| RooError::Other(anyhow::anyhow!("lock poisoned: {}", e)))?;
            requests.push(request.clone());
            requests.len()
        };

        if let Some(ref err) = self.assume_error {
            return Err(RooError::Identity(err.to_string()));
        }

        Ok(CredentialRecord::new(
            format!("ASIAMOCK{:08}", count),
            format!("mock-secret-{}", count),
            format!("mock-session-token-{}", count),
            Utc::now() + self.lifetime,
        ))
    }

    async fn caller_identity(&self, credentials: Option<&CredentialRecord>) -> Result<String> {
        if let Some(ref err) = self.identity_error {
            return Err(RooError::Identity(err.to_string()));
        }

        let assumed = credentials.and_then(|_| {
            self.requests
                .lock()
                .ok()
                .and_then(|r| r.last().map(|req| req.role_arn.clone()))
        });

        Ok(assumed.unwrap_or_else(|| "arn:aws:iam::000000000000:user/mock".to_string()))
    }
}
