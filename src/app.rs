//! One roo invocation, start to finish.
//!
//! [`App`] wires role lookup, the credential cache, the identity exchange,
//! and the launcher together. It never exits the process; the outcome (or
//! error) goes back to `main`, which picks the exit code.

use crate::cache::CredentialCache;
use crate::config::{ensure_dir, ConfigFile, Settings};
use crate::directory::RoleDirectory;
use crate::identity::{AssumeRoleRequest, IdentityProvider};
use crate::launcher::{run_with_credentials, ProfileWriter};
use crate::prompt::{obtain_mfa_code, CodePrompt, TerminalPrompt};
use crate::role::RoleRecord;
use crate::{Result, RooError};
use std::fmt::Write as _;
use tracing::{debug, info, warn};

/// What the user asked for on the command line.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// Role ARN, name, or alias; `None` selects the default role
    pub role: Option<String>,
    /// MFA code given up front
    pub code: Option<String>,
    /// Print the configured roles and stop
    pub list: bool,
    /// Refresh even if the cache is still good
    pub force_refresh: bool,
    /// Write to an AWS CLI profile instead of running a command
    pub write_profile: bool,
    /// Profile to write to, overriding the role's `target_aws_profile`
    pub target_profile: Option<String>,
    /// Command to run with the credentials
    pub command: Vec<String>,
}

/// How an invocation finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Roles were listed.
    Listed,
    /// Credentials were written to the named profile.
    ProfileWritten(String),
    /// The user's command ran and exited with this code.
    Exited(i32),
}

impl Outcome {
    /// Exit code for the roo process.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Listed | Self::ProfileWritten(_) => 0,
            Self::Exited(code) => *code,
        }
    }
}

/// The orchestrator.
pub struct App {
    settings: Settings,
    config: ConfigFile,
    directory: RoleDirectory,
    provider: Box<dyn IdentityProvider>,
    prompt: Box<dyn CodePrompt>,
    profile_writer: ProfileWriter,
}

impl App {
    /// Creates an app that prompts on the terminal and writes profiles with
    /// the `aws` CLI.
    pub fn new(settings: Settings, config: ConfigFile, provider: Box<dyn IdentityProvider>) -> Self {
        let directory = config.directory();
        Self {
            settings,
            config,
            directory,
            provider,
            prompt: Box::new(TerminalPrompt),
            profile_writer: ProfileWriter::new(),
        }
    }

    /// Replaces the MFA code prompt.
    pub fn with_prompt(mut self, prompt: Box<dyn CodePrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Replaces the profile writer.
    pub fn with_profile_writer(mut self, writer: ProfileWriter) -> Self {
        self.profile_writer = writer;
        self
    }

    /// Loads the config file, writing an example one first if it is missing.
    ///
    /// # Errors
    ///
    /// A missing config file is bootstrapped and then still reported as
    /// [`RooError::ConfigNotFound`], so the user edits it before going on.
    pub fn load_config(settings: &Settings) -> Result<ConfigFile> {
        match ConfigFile::load(&settings.config_file) {
            Err(RooError::ConfigNotFound(path)) => {
                if let Some(parent) = path.parent() {
                    ensure_dir(parent)?;
                }
                ConfigFile::bootstrap(&path)?;
                println!("Hey there! I noticed you didn't have a configuration file, so I created one for you.");
                println!(
                    "You can find it at {} - You should probably modify it with the values you need!",
                    path.display()
                );
                Err(RooError::ConfigNotFound(path))
            }
            other => other,
        }
    }

    /// Runs one invocation.
    ///
    /// # Errors
    ///
    /// - [`RooError::RoleNotFound`] / [`RooError::NoDefaultRole`] if no role
    ///   can be selected
    /// - [`RooError::InvalidArn`] if the selected role's ARN is malformed
    /// - [`RooError::MissingCommand`] / [`RooError::MissingTargetProfile`] if
    ///   there is nowhere to send the credentials
    /// - [`RooError::InvalidMfaCode`] or [`RooError::Identity`] if a refresh
    ///   was needed and failed
    ///
    /// A failure to write the cache is logged and does not fail the run.
    pub async fn run(&self, invocation: &Invocation) -> Result<Outcome> {
        if invocation.list {
            print!("{}", format_roles(&self.directory));
            return Ok(Outcome::Listed);
        }

        let role = self.select_role(invocation.role.as_deref())?;
        debug!(role = ?role, "selected role");

        let target_profile = if invocation.write_profile {
            Some(target_profile(invocation, role)?)
        } else if invocation.command.is_empty() {
            return Err(RooError::MissingCommand);
        } else {
            None
        };

        let arn = role.parsed_arn()?;
        debug!("Account Number: {}", arn.account_id);
        debug!("Role Name:      {}", arn.role_name);

        ensure_dir(&self.settings.cache_dir)?;
        let mut cache = CredentialCache::new(self.settings.cache_path(&arn.cache_file_name()))
            .with_refresh_window(self.settings.refresh_window);

        if let Some(current) = cache.current() {
            debug!("Current Access Key ID: {}", current.access_key_id);
        }

        let needs_refresh = invocation.force_refresh || cache.needs_refresh(self.settings.refresh_window);
        if needs_refresh {
            debug!(forced = invocation.force_refresh, "refresh required");
            self.refresh(&mut cache, role, invocation.code.as_deref()).await?;
        } else {
            info!("Using cached credentials!");
        }

        let credentials = cache
            .current()
            .cloned()
            .ok_or_else(|| RooError::Other(anyhow::anyhow!("unable to retrieve credentials")))?;
        debug!("Retrieved credentials with Access Key ID {}", credentials.access_key_id);

        if self.settings.debug {
            let caller = self.provider.caller_identity(Some(&credentials)).await?;
            info!("Credentials belong to {}", caller);
        }

        match target_profile {
            Some(profile) => {
                info!("Writing credentials to profile {}", profile);
                self.profile_writer.write(&profile, &credentials).await?;
                println!("Profile written: {}", profile);
                Ok(Outcome::ProfileWritten(profile))
            }
            None => {
                let code = run_with_credentials(&invocation.command, &credentials).await?;
                Ok(Outcome::Exited(code))
            }
        }
    }

    fn select_role(&self, search_term: Option<&str>) -> Result<&RoleRecord> {
        let role = match search_term.filter(|s| !s.is_empty()) {
            Some(term) => self
                .directory
                .resolve(term)
                .ok_or_else(|| RooError::RoleNotFound(term.to_string()))?,
            None => {
                let role = self.directory.default_role().ok_or(RooError::NoDefaultRole)?;
                if self.directory.has_multiple_defaults() {
                    warn!(
                        "More than one role is flagged as default; using the first one, {}",
                        role.display_name
                    );
                }
                role
            }
        };

        if role.arn.is_empty() {
            return Err(RooError::RoleNotFound(
                search_term.unwrap_or(&role.display_name).to_string(),
            ));
        }

        Ok(role)
    }

    async fn refresh(
        &self,
        cache: &mut CredentialCache,
        role: &RoleRecord,
        code: Option<&str>,
    ) -> Result<()> {
        let code = obtain_mfa_code(code, self.prompt.as_ref())?;

        if self.settings.verbose {
            let caller = self.provider.caller_identity(None).await?;
            info!("Hello world, I'm {} - Time to assume another role!", caller);
        }

        let request = AssumeRoleRequest::new(&role.arn, &self.config.mfa_serial, code);
        let credentials = self.provider.assume_role(&request).await?;
        info!(
            "Assumed role {} via {}, credentials expire at {}",
            role.arn,
            self.provider.name(),
            credentials.expires_at
        );

        match cache.commit_record(credentials) {
            Ok(()) => debug!("New credentials written to {}", cache.path().display()),
            Err(e) => warn!("{} - continuing with unsaved credentials", e),
        }

        Ok(())
    }
}

fn target_profile(invocation: &Invocation, role: &RoleRecord) -> Result<String> {
    invocation
        .target_profile
        .clone()
        .or_else(|| role.target_profile_name.clone())
        .filter(|p| !p.is_empty())
        .ok_or(RooError::MissingTargetProfile)
}

/// Human-readable listing of the configured roles.
pub fn format_roles(directory: &RoleDirectory) -> String {
    let mut out = String::new();

    if directory.is_empty() {
        out.push_str("It looks like you haven't got any roles configured!\n");
        return out;
    }

    for role in directory.roles() {
        let _ = writeln!(out, "ARN: {}", role.arn);
        let _ = writeln!(out, "Name: {}", role.display_name);
        if role.is_default {
            out.push_str("Default: true\n");
        }
        if !role.aliases.is_empty() {
            out.push_str("Aliases:\n");
            for alias in &role.aliases {
                let _ = writeln!(out, "  - {}", alias);
            }
        }
        out.push('\n');
    }

    if directory.has_multiple_defaults() {
        out.push_str("Hey, it looks like you've got more than one role flagged as default!\n");
        out.push_str("The first one in the list is used if a role isn't specified via --role.\n");
    }

    out
}
