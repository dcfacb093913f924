//! Role records and role ARN parsing.

use crate::{Result, RooError};
use serde::{Deserialize, Serialize};

/// Extension used for credential cache files.
pub const CACHE_FILE_EXTENSION: &str = "json";

/// A configured, assumable IAM role.
///
/// Records are read once from the config file and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    /// Human identifier, unique among configured roles by convention
    #[serde(rename = "name", default)]
    pub display_name: String,

    /// Canonical identity: `arn:aws:iam::<account>:role/<role-name>`
    #[serde(default)]
    pub arn: String,

    /// Additional lookup keys, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    /// Whether this role is used when none is requested
    #[serde(rename = "default", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_default: bool,

    /// External AWS CLI profile to receive the credentials on `--write-profile`
    #[serde(
        rename = "target_aws_profile",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target_profile_name: Option<String>,
}

impl RoleRecord {
    /// Creates a role with a name and ARN and no aliases.
    pub fn new(display_name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            arn: arn.into(),
            ..Default::default()
        }
    }

    /// Adds a lookup alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Flags this role as the default.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Sets the AWS CLI profile the credentials are written to.
    pub fn with_target_profile(mut self, profile: impl Into<String>) -> Self {
        self.target_profile_name = Some(profile.into());
        self
    }

    /// Parses this role's ARN.
    ///
    /// # Errors
    ///
    /// Returns [`RooError::InvalidArn`] if the ARN is empty or malformed.
    pub fn parsed_arn(&self) -> Result<RoleArn> {
        RoleArn::parse(&self.arn)
    }
}

/// Digits in an AWS account ID.
pub const ACCOUNT_ID_LENGTH: usize = 12;

fn encode_key_component(name: &str) -> String {
    name.replace('%', "%25").replace('/', "%2F")
}

/// The parts of an IAM role ARN that identify a cache record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleArn {
    /// AWS partition (`aws`, `aws-cn`, `aws-us-gov`, ...)
    pub partition: String,
    /// Numeric account ID
    pub account_id: String,
    /// Role name, including any IAM path (`path/to/Name`)
    pub role_name: String,
}

impl RoleArn {
    /// Parses `arn:<partition>:iam::<account>:role/<name>`.
    ///
    /// # Errors
    ///
    /// Returns [`RooError::InvalidArn`] when the ARN is not an IAM role ARN,
    /// carries a region, has an account ID other than 12 digits, or has an
    /// empty role name or path segment.
    ///
    /// # Example
    ///
    /// ```
    /// use roo::role::RoleArn;
    ///
    /// let arn = RoleArn::parse("arn:aws:iam::111111111111:role/Admin").unwrap();
    /// assert_eq!(arn.account_id, "111111111111");
    /// assert_eq!(arn.role_name, "Admin");
    /// assert_eq!(arn.cache_file_name(), "111111111111-Admin.json");
    /// ```
    pub fn parse(arn: &str) -> Result<Self> {
        if arn.is_empty() {
            return Err(RooError::invalid_arn(arn, "ARN is empty"));
        }

        // arn:partition:service:region:account:resource
        let parts: Vec<&str> = arn.splitn(6, ':').collect();
        if parts.len() != 6 || parts[0] != "arn" {
            return Err(RooError::invalid_arn(arn, "not an ARN"));
        }

        let (partition, service, region, account_id, resource) =
            (parts[1], parts[2], parts[3], parts[4], parts[5]);

        if partition.is_empty() {
            return Err(RooError::invalid_arn(arn, "missing partition"));
        }

        if service != "iam" {
            return Err(RooError::invalid_arn(arn, "not an IAM ARN"));
        }

        // IAM is a global service.
        if !region.is_empty() {
            return Err(RooError::invalid_arn(arn, "IAM ARNs carry no region"));
        }

        if account_id.len() != ACCOUNT_ID_LENGTH || !account_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(RooError::invalid_arn(
                arn,
                "unable to determine account number",
            ));
        }

        let role_name = match resource.strip_prefix("role/") {
            Some(name) if !name.split('/').any(str::is_empty) => name,
            _ => {
                return Err(RooError::invalid_arn(
                    arn,
                    "unable to determine the role name",
                ))
            }
        };

        Ok(Self {
            partition: partition.to_string(),
            account_id: account_id.to_string(),
            role_name: role_name.to_string(),
        })
    }

    /// Cache record key, `<account>-<roleName>`.
    ///
    /// The role name is percent-encoded (`%` as `%25`, `/` as `%2F`) so the
    /// key is a single path component and distinct roles never share one.
    pub fn cache_key(&self) -> String {
        format!("{}-{}", self.account_id, encode_key_component(&self.role_name))
    }

    /// Cache file name, the cache key plus [`CACHE_FILE_EXTENSION`].
    pub fn cache_file_name(&self) -> String {
        format!("{}.{}", self.cache_key(), CACHE_FILE_EXTENSION)
    }
}
