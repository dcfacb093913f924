//! Runtime settings and the YAML role configuration.
//!
//! [`Settings`] carries the options for a single invocation (where the
//! config and cache live, the refresh window, logging verbosity) and is
//! passed explicitly to whatever needs it. [`ConfigFile`] is the user's
//! role configuration, read once at startup.

use crate::cache::DEFAULT_REFRESH_WINDOW;
use crate::directory::RoleDirectory;
use crate::role::RoleRecord;
use crate::{Result, RooError};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Directory under the user's home holding config and cache.
pub const CONFIG_DIR_NAME: &str = ".roo";

/// Config file name inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Cache directory name inside [`CONFIG_DIR_NAME`].
pub const CACHE_DIR_NAME: &str = "cache";

/// Runtime options for one invocation.
///
/// Use the builder pattern to override defaults:
///
/// ```
/// use roo::config::Settings;
/// use std::time::Duration;
///
/// let settings = Settings::new("/home/me/.roo")
///     .with_cache_dir("/tmp/roo-cache")
///     .with_refresh_window(Duration::from_secs(300))
///     .with_verbose(true);
///
/// assert_eq!(settings.config_file.to_str(), Some("/home/me/.roo/config.yaml"));
/// assert_eq!(settings.refresh_window, Duration::from_secs(300));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory holding the config file (default: `~/.roo`)
    pub config_dir: PathBuf,

    /// Role configuration file (default: `~/.roo/config.yaml`)
    pub config_file: PathBuf,

    /// Credential cache directory (default: `~/.roo/cache`)
    ///
    /// Configurable on its own so the cache can live somewhere that is
    /// cleared on reboot, such as `/tmp`.
    pub cache_dir: PathBuf,

    /// Refresh window (default: 90 seconds)
    pub refresh_window: Duration,

    /// Info-level logging
    pub verbose: bool,

    /// Debug-level logging plus identity checks
    pub debug: bool,
}

impl Settings {
    /// Creates settings rooted at `config_dir`.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            config_file: config_dir.join(CONFIG_FILE_NAME),
            cache_dir: config_dir.join(CACHE_DIR_NAME),
            config_dir,
            refresh_window: DEFAULT_REFRESH_WINDOW,
            verbose: false,
            debug: false,
        }
    }

    /// Creates settings rooted at `~/.roo`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            RooError::Other(anyhow::anyhow!("unable to determine home directory"))
        })?;
        Ok(Self::new(home.join(CONFIG_DIR_NAME)))
    }

    /// Sets the role configuration file.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = path.into();
        self
    }

    /// Sets the credential cache directory.
    pub fn with_cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_dir = path.into();
        self
    }

    /// Sets the refresh window.
    pub fn with_refresh_window(mut self, window: Duration) -> Self {
        self.refresh_window = window;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Reads `VERBOSE=true` / `DEBUG=true` from the environment, on top of
    /// whatever is already set.
    pub fn with_env_overrides(self) -> Self {
        let verbose = self.verbose || env_flag("VERBOSE");
        let debug = self.debug || env_flag("DEBUG");
        self.with_verbose(verbose).with_debug(debug)
    }

    /// Cache file path for a cache file name.
    pub fn cache_path(&self, file_name: &str) -> PathBuf {
        self.cache_dir.join(file_name)
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// The user's role configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Base AWS profile used for the identity exchange when `--profile` is not given
    #[serde(default)]
    pub default_profile: String,

    /// MFA device serial or ARN
    #[serde(default)]
    pub mfa_serial: String,

    /// Roles in declaration order
    #[serde(default)]
    pub roles: Vec<RoleRecord>,
}

impl ConfigFile {
    /// Loads the config file.
    ///
    /// # Errors
    ///
    /// - [`RooError::ConfigNotFound`] if the file does not exist
    /// - [`RooError::Config`] if it is not valid YAML for this shape
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RooError::ConfigNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        // An empty file (e.g. created by hand) is an empty config.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| RooError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        debug!(path = %path.display(), roles = config.roles.len(), "loaded config");
        Ok(config)
    }

    /// Example configuration written on first run.
    pub fn example() -> Self {
        Self {
            default_profile: String::new(),
            mfa_serial: "arn:aws:iam::000000000000:mfa/your_mfa_serial".to_string(),
            roles: vec![
                RoleRecord::new(
                    "one_of_your_accounts",
                    "arn:aws:iam::000000000000:role/DeleteOnly",
                )
                .as_default()
                .with_alias("delete")
                .with_alias("deleteprod"),
                RoleRecord::new(
                    "another_one_of_your_accounts",
                    "arn:aws:iam::111111111111:role/ReadOnly",
                )
                .with_alias("readonly")
                .with_alias("ro"),
            ],
        }
    }

    /// Writes the example configuration to `path` (mode 0600 on Unix).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn bootstrap(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(&Self::example())?;

        let mut file = std::fs::File::create(path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = file.metadata()?.permissions();
            perms.set_mode(0o600);
            file.set_permissions(perms)?;
        }

        file.write_all(yaml.as_bytes())?;
        file.flush()?;

        info!(path = %path.display(), "wrote example config");
        Ok(())
    }

    /// Role lookup over the configured roles.
    pub fn directory(&self) -> RoleDirectory {
        RoleDirectory::new(self.roles.clone())
    }
}

/// Creates `path` and any missing parents (mode 0700 on Unix).
///
/// Idempotent: an existing directory is left as it is.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.is_dir() {
        return Ok(());
    }

    std::fs::create_dir_all(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o700);
        std::fs::set_permissions(path, perms)?;
    }

    debug!(path = %path.display(), "created directory");
    Ok(())
}
