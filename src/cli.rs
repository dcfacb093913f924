//! Command-line arguments.

use crate::config::{Settings, CONFIG_DIR_NAME};
use crate::{Result, RooError};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "roo",
    version,
    about = "Assume an AWS IAM role with MFA and run a command with the temporary credentials",
    long_about = None,
    after_help = "Example: roo --role my_role_name -- aws sts get-caller-identity"
)]
pub struct Cli {
    #[arg(short = 'r', long, help = "The role ARN, name, or alias to assume")]
    pub role: Option<String>,

    #[arg(
        short = 'c',
        long,
        help = "MFA one-time code (the 6+ digit code that refreshes every 30 seconds)"
    )]
    pub code: Option<String>,

    #[arg(
        short = 'p',
        long,
        help = "Base AWS config profile to use for the role exchange"
    )]
    pub profile: Option<String>,

    #[arg(short = 'l', long, help = "Display the configured roles, then exit")]
    pub list: bool,

    #[arg(long, help = "Force a refresh of the cached credentials")]
    pub refresh: bool,

    #[arg(
        long,
        help = "Write the credentials to an AWS CLI profile instead of running a command"
    )]
    pub write_profile: bool,

    #[arg(long, help = "Name of the profile to write credentials to")]
    pub target_profile: Option<String>,

    #[arg(long, value_name = "FILE", help = "Config file (default: ~/.roo/config.yaml)")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Credential cache directory (default: ~/.roo/cache)")]
    pub cache_dir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = 90,
        help = "Refresh cached credentials this many seconds before they expire"
    )]
    pub refresh_window: u64,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, help = "Enable debug logging")]
    pub debug: bool,

    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND",
        help = "Command to run with the credentials"
    )]
    pub command: Vec<String>,
}

impl Cli {
    /// Builds runtime settings, applying flag and environment overrides.
    ///
    /// The home directory is only looked up when `--config` or `--cache-dir`
    /// is missing; with both given the config file's directory is the root.
    pub fn settings(&self) -> Result<Settings> {
        self.settings_with_home(dirs::home_dir())
    }

    /// [`settings`](Self::settings) with an explicit home directory.
    ///
    /// # Errors
    ///
    /// Fails if `home` is `None` and either path flag is missing.
    pub fn settings_with_home(&self, home: Option<PathBuf>) -> Result<Settings> {
        let base = match (&self.config, &self.cache_dir, home) {
            (Some(config), Some(_), _) => {
                Settings::new(config.parent().map(Path::to_path_buf).unwrap_or_default())
            }
            (_, _, Some(home)) => Settings::new(home.join(CONFIG_DIR_NAME)),
            _ => {
                return Err(RooError::Other(anyhow::anyhow!(
                    "unable to determine home directory; pass both --config and --cache-dir"
                )))
            }
        };
        Ok(self.apply(base))
    }

    /// Applies flag and environment overrides to `settings`.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(config) = &self.config {
            settings = settings.with_config_file(config);
        }
        if let Some(cache_dir) = &self.cache_dir {
            settings = settings.with_cache_dir(cache_dir);
        }

        settings
            .with_refresh_window(Duration::from_secs(self.refresh_window))
            .with_verbose(self.verbose)
            .with_debug(self.debug)
            .with_env_overrides()
    }
}
