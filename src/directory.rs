//! Role lookup over the configured role list.
//!
//! [`RoleDirectory::resolve`] maps a free-form search term to one role using
//! three ordered passes over the roles in declaration order:
//!
//! 1. exact match against the ARN
//! 2. exact match against the display name
//! 3. exact, case-sensitive match against any alias
//!
//! The first match of the first pass that matches anything wins, so an alias
//! can never beat another role's ARN or name, and an earlier-declared role
//! always beats a later one within the same pass.

use crate::role::RoleRecord;
use tracing::debug;

/// Ordered, read-only set of configured roles.
#[derive(Debug, Clone, Default)]
pub struct RoleDirectory {
    roles: Vec<RoleRecord>,
}

impl RoleDirectory {
    /// Creates a directory from roles in declaration order.
    pub fn new(roles: Vec<RoleRecord>) -> Self {
        Self { roles }
    }

    /// Resolves `search_term` to a role, or `None` if nothing matches.
    ///
    /// A returned role may still carry an empty ARN; callers treat that as an
    /// invalid resolution too.
    ///
    /// # Example
    ///
    /// ```
    /// use roo::directory::RoleDirectory;
    /// use roo::role::RoleRecord;
    ///
    /// let directory = RoleDirectory::new(vec![
    ///     RoleRecord::new("prod", "arn:aws:iam::111111111111:role/Admin").with_alias("p"),
    ///     RoleRecord::new("dev", "arn:aws:iam::222222222222:role/Dev").with_alias("prod"),
    /// ]);
    ///
    /// // Name match on "prod" wins before dev's alias "prod" is ever looked at.
    /// let role = directory.resolve("prod").unwrap();
    /// assert_eq!(role.arn, "arn:aws:iam::111111111111:role/Admin");
    /// ```
    pub fn resolve(&self, search_term: &str) -> Option<&RoleRecord> {
        if let Some(role) = self.roles.iter().find(|r| r.arn == search_term) {
            debug!(role = %role.display_name, "resolved role by ARN");
            return Some(role);
        }

        if let Some(role) = self.roles.iter().find(|r| r.display_name == search_term) {
            debug!(role = %role.display_name, "resolved role by name");
            return Some(role);
        }

        let role = self
            .roles
            .iter()
            .find(|r| r.aliases.iter().any(|alias| alias == search_term));
        if let Some(role) = role {
            debug!(role = %role.display_name, alias = search_term, "resolved role by alias");
        }
        role
    }

    /// Returns the first role flagged as default.
    ///
    /// When several are flagged only declaration order decides; see
    /// [`has_multiple_defaults`](Self::has_multiple_defaults).
    pub fn default_role(&self) -> Option<&RoleRecord> {
        self.roles.iter().find(|r| r.is_default)
    }

    /// Number of roles flagged as default.
    pub fn default_count(&self) -> usize {
        self.roles.iter().filter(|r| r.is_default).count()
    }

    /// True when more than one role is flagged default.
    pub fn has_multiple_defaults(&self) -> bool {
        self.default_count() > 1
    }

    /// All roles in declaration order.
    pub fn roles(&self) -> &[RoleRecord] {
        &self.roles
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ADMIN_ARN: &str = "arn:aws:iam::111111111111:role/Admin";
    const DEV_ARN: &str = "arn:aws:iam::222222222222:role/Dev";
    const RO_ARN: &str = "arn:aws:iam::333333333333:role/ReadOnly";

    fn sample_directory() -> RoleDirectory {
        RoleDirectory::new(vec![
            RoleRecord::new("prod", ADMIN_ARN).with_alias("p"),
            RoleRecord::new("dev", DEV_ARN).with_alias("prod"),
        ])
    }

    #[test]
    fn test_resolve_by_arn() {
        let directory = sample_directory();
        let role = directory.resolve(DEV_ARN).unwrap();
        assert_eq!(role.display_name, "dev");
    }

    #[test]
    fn test_resolve_name_beats_later_alias() {
        let directory = sample_directory();
        let role = directory.resolve("prod").unwrap();
        assert_eq!(role.arn, ADMIN_ARN);
    }

    #[test]
    fn test_resolve_by_alias() {
        let directory = sample_directory();
        let role = directory.resolve("p").unwrap();
        assert_eq!(role.display_name, "prod");
    }

    #[test]
    fn test_resolve_arn_beats_earlier_name_and_alias() {
        // An earlier role uses the later role's ARN text as its name and alias.
        let directory = RoleDirectory::new(vec![
            RoleRecord::new(RO_ARN, ADMIN_ARN).with_alias(RO_ARN),
            RoleRecord::new("readonly", RO_ARN),
        ]);

        let role = directory.resolve(RO_ARN).unwrap();
        assert_eq!(role.display_name, "readonly");
    }

    #[test]
    fn test_resolve_alias_earlier_role_wins() {
        let directory = RoleDirectory::new(vec![
            RoleRecord::new("first", ADMIN_ARN)
                .with_alias("a")
                .with_alias("shared"),
            RoleRecord::new("second", DEV_ARN).with_alias("shared"),
        ]);

        let role = directory.resolve("shared").unwrap();
        assert_eq!(role.display_name, "first");
    }

    #[test]
    fn test_resolve_alias_is_case_sensitive() {
        let directory = sample_directory();
        assert!(directory.resolve("P").is_none());
        assert!(directory.resolve("PROD").is_none());
    }

    #[test]
    fn test_resolve_not_found() {
        let directory = sample_directory();
        assert!(directory.resolve("staging").is_none());
        assert!(directory.resolve("").is_none());
        assert!(RoleDirectory::default().resolve("prod").is_none());
    }

    #[test]
    fn test_resolve_role_with_empty_arn() {
        let directory = RoleDirectory::new(vec![RoleRecord::new("broken", "")]);
        let role = directory.resolve("broken").unwrap();
        assert!(role.arn.is_empty());
    }

    #[test]
    fn test_default_role() {
        let directory = RoleDirectory::new(vec![
            RoleRecord::new("dev", DEV_ARN),
            RoleRecord::new("prod", ADMIN_ARN).as_default(),
        ]);

        assert_eq!(directory.default_role().unwrap().display_name, "prod");
        assert!(!directory.has_multiple_defaults());
    }

    #[test]
    fn test_default_role_first_of_many() {
        let directory = RoleDirectory::new(vec![
            RoleRecord::new("dev", DEV_ARN).as_default(),
            RoleRecord::new("prod", ADMIN_ARN).as_default(),
        ]);

        assert_eq!(directory.default_role().unwrap().display_name, "dev");
        assert_eq!(directory.default_count(), 2);
        assert!(directory.has_multiple_defaults());
    }

    #[test]
    fn test_no_default_role() {
        let directory = sample_directory();
        assert!(directory.default_role().is_none());
        assert_eq!(directory.len(), 2);
        assert!(!directory.is_empty());
    }

    // A small token pool so names, ARNs and aliases collide often.
    const TOKENS: [&str; 5] = ["prod", "dev", ADMIN_ARN, DEV_ARN, "p"];

    fn role_list() -> impl Strategy<Value = Vec<RoleRecord>> {
        prop::collection::vec(
            (0..TOKENS.len(), 0..TOKENS.len(), prop::collection::vec(0..TOKENS.len(), 0..3)),
            0..6,
        )
        .prop_map(|specs| {
            specs
                .into_iter()
                .map(|(name, arn, aliases)| {
                    aliases
                        .into_iter()
                        .fold(RoleRecord::new(TOKENS[name], TOKENS[arn]), |role, alias| {
                            role.with_alias(TOKENS[alias])
                        })
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_resolve_follows_pass_precedence(roles in role_list(), term in 0..TOKENS.len()) {
            let term = TOKENS[term];
            let expected = roles
                .iter()
                .position(|r| r.arn == term)
                .or_else(|| roles.iter().position(|r| r.display_name == term))
                .or_else(|| roles.iter().position(|r| r.aliases.iter().any(|a| a == term)));

            let directory = RoleDirectory::new(roles.clone());
            let resolved = directory
                .resolve(term)
                .map(|found| directory.roles().iter().position(|r| std::ptr::eq(r, found)).unwrap());

            prop_assert_eq!(resolved, expected);
        }

        #[test]
        fn prop_arn_match_beats_any_name_or_alias(roles in role_list()) {
            let directory = RoleDirectory::new(roles.clone());

            for role in &roles {
                let found = directory.resolve(&role.arn).unwrap();
                prop_assert_eq!(&found.arn, &role.arn);
            }
        }
    }
}
