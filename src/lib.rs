//! Roo - assume AWS IAM roles with MFA and reuse the credentials.
//!
//! Roo exchanges an MFA one-time code for temporary role credentials via STS
//! `AssumeRole`, caches them on disk per account and role, and hands them to
//! a command (or an AWS CLI profile) until they get close to expiry.
//!
//! # Features
//!
//! - **Role Lookup**: Find a role by ARN, name, or alias with a fixed
//!   precedence ([`directory::RoleDirectory`])
//! - **Credential Cache**: One owner-only file per account and role, replaced
//!   atomically, refreshed inside a configurable window before expiry
//!   ([`cache::CredentialCache`])
//! - **Soft Failures**: A missing or corrupt cache never blocks fetching
//!   fresh credentials
//! - **Pluggable Exchange**: STS in production, an in-memory mock in tests
//!   ([`identity::IdentityProvider`])
//!
//! # Quick Start
//!
//! ```no_run
//! use roo::cache::CredentialCache;
//! use roo::config::{ensure_dir, ConfigFile, Settings};
//! use roo::identity::{mock::MockIdentityProvider, AssumeRoleRequest, IdentityProvider};
//!
//! #[tokio::main]
//! async fn main() -> roo::Result<()> {
//!     let settings = Settings::from_home()?;
//!     let config = ConfigFile::load(&settings.config_file)?;
//!     let directory = config.directory();
//!
//!     let role = directory
//!         .resolve("prod")
//!         .ok_or_else(|| roo::RooError::RoleNotFound("prod".to_string()))?;
//!     let arn = role.parsed_arn()?;
//!
//!     ensure_dir(&settings.cache_dir)?;
//!     let mut cache = CredentialCache::new(settings.cache_path(&arn.cache_file_name()));
//!
//!     if cache.needs_refresh(settings.refresh_window) {
//!         let provider = MockIdentityProvider::new();
//!         let request = AssumeRoleRequest::new(&role.arn, &config.mfa_serial, "123456");
//!         cache.commit_record(provider.assume_role(&request).await?)?;
//!     }
//!
//!     if let Some(creds) = cache.current() {
//!         println!("access key: {}", creds.access_key_id);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! | Feature | Default | Provides |
//! |---------|---------|----------|
//! | `sts` | yes | [`identity::sts::StsIdentityProvider`] and the `roo` binary |
//! | `mock` | yes | [`identity::mock::MockIdentityProvider`] |

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod directory;
pub mod error;
pub mod identity;
pub mod launcher;
pub mod prompt;
pub mod role;
pub mod validation;

pub use cache::{CredentialCache, CredentialRecord};
pub use config::{ConfigFile, Settings};
pub use directory::RoleDirectory;
pub use error::{Result, RooError};
pub use identity::IdentityProvider;
pub use role::{RoleArn, RoleRecord};
