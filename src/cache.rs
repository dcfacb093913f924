//! On-disk credential cache.
//!
//! One [`CredentialCache`] owns one cache file, keyed by account and role
//! (see [`RoleArn::cache_file_name`](crate::role::RoleArn::cache_file_name)).
//! It answers whether the cached credentials are still usable, persists new
//! credentials after an exchange, and serves the current value.
//!
//! # Security
//!
//! - Cache files are owner read/write only (0600 on Unix), enforced on every
//!   write, including overwrites of files that had looser permissions
//! - Records are written to a temporary file in the cache directory and
//!   renamed into place, so readers never see a half-written record
//! - Secret keys and session tokens are never logged
//!
//! # Example
//!
//! ```no_run
//! use chrono::{Duration, Utc};
//! use roo::cache::CredentialCache;
//!
//! fn main() -> roo::Result<()> {
//!     let mut cache = CredentialCache::new("/tmp/roo-cache/111111111111-Admin.json");
//!
//!     if cache.needs_refresh(std::time::Duration::from_secs(90)) {
//!         cache.commit("AKIA...", "secret", "token", Utc::now() + Duration::hours(1))?;
//!     }
//!
//!     if let Some(creds) = cache.current() {
//!         println!("Using access key {}", creds.access_key_id);
//!     }
//!
//!     Ok(())
//! }
//! ```

use crate::{Result, RooError};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Default refresh window: credentials within 90 seconds of expiry are
/// treated as expired.
pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::from_secs(90);

/// Environment variable receiving the access key ID.
pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Environment variable receiving the secret access key.
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// Environment variable receiving the session token.
pub const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// Temporary credentials plus their expiry, as persisted to disk.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// Instant after which the issued credentials are invalid
    pub expires_at: DateTime<Utc>,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Session token
    pub session_token: String,
}

impl CredentialRecord {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            expires_at,
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
        }
    }

    /// A record missing any secret field counts as no record at all.
    pub fn is_complete(&self) -> bool {
        !self.access_key_id.is_empty()
            && !self.secret_access_key.is_empty()
            && !self.session_token.is_empty()
    }

    /// Instant from which the record should be refreshed, or `None` if the
    /// window reaches past the representable time range.
    pub fn refresh_at(&self, refresh_window: Duration) -> Option<DateTime<Utc>> {
        let window = TimeDelta::from_std(refresh_window).ok()?;
        self.expires_at.checked_sub_signed(window)
    }

    /// True if `now` is inside the refresh window or past expiry.
    pub fn needs_refresh_at(&self, refresh_window: Duration, now: DateTime<Utc>) -> bool {
        match self.refresh_at(refresh_window) {
            Some(refresh_at) => now >= refresh_at,
            None => true,
        }
    }

    /// Environment variables exporting these credentials.
    pub fn env_vars(&self) -> [(&'static str, &str); 3] {
        [
            (ENV_ACCESS_KEY_ID, self.access_key_id.as_str()),
            (ENV_SECRET_ACCESS_KEY, self.secret_access_key.as_str()),
            (ENV_SESSION_TOKEN, self.session_token.as_str()),
        ]
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("expires_at", &self.expires_at)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// Credential cache backed by a single file.
///
/// The cache directory must already exist; create it with
/// [`config::ensure_dir`](crate::config::ensure_dir) first.
#[derive(Debug)]
pub struct CredentialCache {
    path: PathBuf,
    refresh_window: Duration,
    record: Option<CredentialRecord>,
    loaded: bool,
}

impl CredentialCache {
    /// Creates a cache for `path` without touching the filesystem.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            refresh_window: DEFAULT_REFRESH_WINDOW,
            record: None,
            loaded: false,
        }
    }

    /// Sets the window used to flag stale-on-arrival credentials in
    /// [`commit`](Self::commit).
    pub fn with_refresh_window(mut self, refresh_window: Duration) -> Self {
        self.refresh_window = refresh_window;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the record from disk, replacing the in-memory copy.
    ///
    /// Returns `None` if:
    /// - the file does not exist
    /// - the file cannot be read
    /// - the file does not hold a complete record
    ///
    /// None of these are errors: a stale or corrupt cache must never stop the
    /// user from fetching fresh credentials. Unlike a missing file, the last
    /// two are logged as warnings.
    pub fn load(&mut self) -> Option<CredentialRecord> {
        self.record = read_record(&self.path);
        self.loaded = true;
        self.record.clone()
    }

    /// True if no usable record is cached, or `now >= expires_at - refresh_window`.
    ///
    /// Loads the cache file on first use; otherwise it does no I/O.
    pub fn needs_refresh(&mut self, refresh_window: Duration) -> bool {
        self.needs_refresh_at(refresh_window, Utc::now())
    }

    /// [`needs_refresh`](Self::needs_refresh) against an explicit clock.
    pub fn needs_refresh_at(&mut self, refresh_window: Duration, now: DateTime<Utc>) -> bool {
        match self.current() {
            Some(record) => record.needs_refresh_at(refresh_window, now),
            None => true,
        }
    }

    /// Replaces the cached record with freshly exchanged credentials.
    ///
    /// The in-memory record is updated before the write, so
    /// [`current`](Self::current) returns the new credentials even if
    /// persisting them fails.
    ///
    /// If the credentials already fall inside the refresh window a warning is
    /// logged, but they are still written.
    ///
    /// # Errors
    ///
    /// Returns [`RooError::CacheWrite`] if the record cannot be written.
    pub fn commit(
        &mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let record = CredentialRecord::new(access_key_id, secret_access_key, session_token, expires_at);
        self.commit_record(record)
    }

    /// [`commit`](Self::commit) for an already built record.
    pub fn commit_record(&mut self, record: CredentialRecord) -> Result<()> {
        let now = Utc::now();
        if record.needs_refresh_at(self.refresh_window, now) {
            warn!(
                now = %now,
                expires_at = %record.expires_at,
                refresh_window_secs = self.refresh_window.as_secs(),
                "new credentials expire within the refresh window"
            );
        }

        self.record = Some(record);
        self.loaded = true;

        if let Some(record) = &self.record {
            write_record(&self.path, record).map_err(|source| RooError::CacheWrite {
                path: self.path.clone(),
                source,
            })?;
            debug!(
                path = %self.path.display(),
                access_key_id = %record.access_key_id,
                "credentials written to cache"
            );
        }

        Ok(())
    }

    /// Most recently loaded or committed record.
    ///
    /// Loads from disk first if nothing has been loaded or committed yet.
    pub fn current(&mut self) -> Option<&CredentialRecord> {
        if !self.loaded {
            self.load();
        }
        self.record.as_ref()
    }
}

fn read_record(path: &Path) -> Option<CredentialRecord> {
    let data = match std::fs::read(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no cached credentials");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unable to read credential cache, ignoring it");
            return None;
        }
    };

    let record: CredentialRecord = match serde_json::from_slice(&data) {
        Ok(r) => r,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed credential cache, ignoring it");
            return None;
        }
    };

    if !record.is_complete() {
        warn!(path = %path.display(), "incomplete credential cache record, ignoring it");
        return None;
    }

    Some(record)
}

fn write_record(path: &Path, record: &CredentialRecord) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(record)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = file.as_file().metadata()?.permissions();
        perms.set_mode(0o600);
        file.as_file().set_permissions(perms)?;
    }

    file.write_all(&json)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use proptest::prelude::*;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    const WINDOW: Duration = Duration::from_secs(90);

    fn cache_in(dir: &tempfile::TempDir) -> CredentialCache {
        CredentialCache::new(dir.path().join("111111111111-Admin.json"))
    }

    #[test]
    fn test_commit_and_load() {
        let dir = tempdir().unwrap();
        let expires_at = Utc::now() + ChronoDuration::hours(1);

        let mut cache = cache_in(&dir);
        cache
            .commit("AKIAEXAMPLE", "secret-key", "session-token", expires_at)
            .unwrap();

        let mut reopened = cache_in(&dir);
        let loaded = reopened.load().unwrap();
        assert_eq!(loaded.access_key_id, "AKIAEXAMPLE");
        assert_eq!(loaded.secret_access_key, "secret-key");
        assert_eq!(loaded.session_token, "session-token");
        assert_eq!(loaded.expires_at, expires_at);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let mut cache = cache_in(&dir);

        assert!(cache.load().is_none());
        assert!(cache.current().is_none());
    }

    #[test]
    fn test_load_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut cache = cache_in(&dir);
        cache
            .commit("AKIA1", "s", "t", Utc::now() + ChronoDuration::hours(1))
            .unwrap();

        let first = cache.load();
        let second = cache.load();
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempdir().unwrap();
        let mut cache = cache_in(&dir);
        std::fs::write(cache.path(), b"{ this is not json").unwrap();

        assert!(cache.load().is_none());
        assert!(cache.needs_refresh(WINDOW));
    }

    #[test]
    fn test_load_partial_record() {
        let dir = tempdir().unwrap();
        let mut cache = cache_in(&dir);

        std::fs::write(
            cache.path(),
            br#"{"expiresAt":"2030-01-01T00:00:00Z","accessKeyId":"AKIA1"}"#,
        )
        .unwrap();
        assert!(cache.load().is_none());

        std::fs::write(
            cache.path(),
            br#"{"expiresAt":"2030-01-01T00:00:00Z","accessKeyId":"AKIA1","secretAccessKey":"","sessionToken":"t"}"#,
        )
        .unwrap();
        assert!(cache.load().is_none());
    }

    #[test]
    fn test_on_disk_format() {
        let dir = tempdir().unwrap();
        let mut cache = cache_in(&dir);
        cache
            .commit("AKIA1", "secret", "token", Utc::now() + ChronoDuration::hours(1))
            .unwrap();

        let raw = std::fs::read_to_string(cache.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["accessKeyId"], "AKIA1");
        assert_eq!(value["secretAccessKey"], "secret");
        assert_eq!(value["sessionToken"], "token");
        assert!(value["expiresAt"].is_string());
    }

    #[test]
    fn test_needs_refresh_without_record() {
        let dir = tempdir().unwrap();
        let mut cache = cache_in(&dir);

        assert!(cache.needs_refresh(WINDOW));
        assert!(cache.needs_refresh(Duration::ZERO));
    }

    #[test]
    fn test_needs_refresh_inside_window() {
        let dir = tempdir().unwrap();
        let mut cache = cache_in(&dir);
        cache
            .commit("AKIA1", "s", "t", Utc::now() + ChronoDuration::seconds(60))
            .unwrap();

        assert!(cache.needs_refresh(WINDOW));
    }

    #[test]
    fn test_needs_refresh_outside_window() {
        let dir = tempdir().unwrap();
        let mut cache = cache_in(&dir);
        cache
            .commit("AKIA1", "s", "t", Utc::now() + ChronoDuration::seconds(300))
            .unwrap();

        assert!(!cache.needs_refresh(WINDOW));
    }

    #[test]
    fn test_needs_refresh_boundaries() {
        let expires_at = Utc::now();
        let record = CredentialRecord::new("AKIA1", "s", "t", expires_at);

        let refresh_at = expires_at - ChronoDuration::seconds(90);
        assert!(record.needs_refresh_at(WINDOW, refresh_at));
        assert!(!record.needs_refresh_at(WINDOW, refresh_at - ChronoDuration::milliseconds(1)));

        // Zero window: usable right up to expiry.
        assert!(!record.needs_refresh_at(Duration::ZERO, expires_at - ChronoDuration::seconds(1)));
        assert!(record.needs_refresh_at(Duration::ZERO, expires_at));
    }

    #[test]
    fn test_needs_refresh_huge_window() {
        let record = CredentialRecord::new("AKIA1", "s", "t", Utc::now());
        assert!(record.needs_refresh_at(Duration::MAX, Utc::now()));
    }

    #[test]
    fn test_commit_stale_credentials_still_written() {
        let dir = tempdir().unwrap();
        let mut cache = cache_in(&dir);
        let expires_at = Utc::now() - ChronoDuration::minutes(5);

        cache.commit("AKIA1", "s", "t", expires_at).unwrap();

        let mut reopened = cache_in(&dir);
        assert_eq!(reopened.load().unwrap().expires_at, expires_at);
        assert!(reopened.needs_refresh(WINDOW));
    }

    #[test]
    fn test_commit_overwrites() {
        let dir = tempdir().unwrap();
        let mut cache = cache_in(&dir);
        let expires_at = Utc::now() + ChronoDuration::hours(1);

        cache.commit("AKIA1", "s1", "t1", expires_at).unwrap();
        cache.commit("AKIA2", "s2", "t2", expires_at).unwrap();

        let mut reopened = cache_in(&dir);
        assert_eq!(reopened.load().unwrap().access_key_id, "AKIA2");
    }

    #[cfg(unix)]
    #[test]
    fn test_commit_sets_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let mut cache = cache_in(&dir);

        std::fs::write(cache.path(), b"old").unwrap();
        std::fs::set_permissions(cache.path(), std::fs::Permissions::from_mode(0o644)).unwrap();

        cache
            .commit("AKIA1", "s", "t", Utc::now() + ChronoDuration::hours(1))
            .unwrap();

        let mode = std::fs::metadata(cache.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_commit_write_failure_keeps_memory_copy() {
        let dir = tempdir().unwrap();
        let mut cache = CredentialCache::new(dir.path().join("missing").join("x.json"));

        let result = cache.commit("AKIA1", "s", "t", Utc::now() + ChronoDuration::hours(1));
        assert!(matches!(result, Err(RooError::CacheWrite { .. })));

        let current = cache.current().unwrap();
        assert_eq!(current.access_key_id, "AKIA1");
    }

    #[test]
    fn test_current_loads_once() {
        let dir = tempdir().unwrap();
        let expires_at = Utc::now() + ChronoDuration::hours(1);
        cache_in(&dir).commit("AKIA1", "s", "t", expires_at).unwrap();

        let mut cache = cache_in(&dir);
        assert_eq!(cache.current().unwrap().access_key_id, "AKIA1");

        // A later write by someone else is not picked up without load().
        cache_in(&dir).commit("AKIA2", "s", "t", expires_at).unwrap();
        assert_eq!(cache.current().unwrap().access_key_id, "AKIA1");
        assert_eq!(cache.load().unwrap().access_key_id, "AKIA2");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let record = CredentialRecord::new("AKIA1", "super-secret", "session-tok", Utc::now());
        let debug = format!("{:?}", record);
        assert!(debug.contains("AKIA1"));
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("session-tok"));
    }

    #[test]
    fn test_env_vars() {
        let record = CredentialRecord::new("AKIA1", "s", "t", Utc::now());
        let vars = record.env_vars();
        assert_eq!(vars[0], ("AWS_ACCESS_KEY_ID", "AKIA1"));
        assert_eq!(vars[1], ("AWS_SECRET_ACCESS_KEY", "s"));
        assert_eq!(vars[2], ("AWS_SESSION_TOKEN", "t"));
    }

    #[test]
    #[traced_test]
    fn test_commit_stale_credentials_warns() {
        let dir = tempdir().unwrap();
        let mut cache = cache_in(&dir);

        cache
            .commit("AKIA1", "s", "t", Utc::now() + ChronoDuration::seconds(30))
            .unwrap();

        assert!(logs_contain("new credentials expire within the refresh window"));
    }

    #[test]
    #[traced_test]
    fn test_commit_fresh_credentials_do_not_warn() {
        let dir = tempdir().unwrap();
        let mut cache = cache_in(&dir);

        cache
            .commit("AKIA1", "s", "t", Utc::now() + ChronoDuration::hours(1))
            .unwrap();

        assert!(!logs_contain("new credentials expire within the refresh window"));
    }

    // 1000-01-01T00:00:00Z ..= 9999-12-31T23:59:59Z
    const MIN_SECS: i64 = -30_610_224_000;
    const MAX_SECS: i64 = 253_402_300_799;

    fn timestamp() -> impl Strategy<Value = DateTime<Utc>> {
        (MIN_SECS..=MAX_SECS, 0u32..1_000_000_000)
            .prop_map(|(secs, nanos)| DateTime::<Utc>::from_timestamp(secs, nanos).unwrap())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_commit_then_load_round_trips(
            access_key_id in "\\PC{1,40}",
            secret_access_key in "\\PC{1,64}",
            session_token in "\\PC{1,128}",
            expires_at in timestamp(),
        ) {
            let dir = tempdir().unwrap();
            let record = CredentialRecord::new(access_key_id, secret_access_key, session_token, expires_at);

            cache_in(&dir).commit_record(record.clone()).unwrap();
            let loaded = cache_in(&dir).load();

            prop_assert_eq!(loaded, Some(record));
        }

        #[test]
        fn prop_needs_refresh_matches_window(
            expires_at in timestamp(),
            window_ms in 0u64..100_000_000_000,
            offset_ms in -200_000_000_000i64..200_000_000_000,
        ) {
            let record = CredentialRecord::new("AKIA1", "s", "t", expires_at);
            let window = Duration::from_millis(window_ms);
            let now = expires_at + ChronoDuration::milliseconds(offset_ms);

            let window_delta = ChronoDuration::milliseconds(window_ms as i64);
            let expected = now + window_delta >= expires_at;

            prop_assert_eq!(record.needs_refresh_at(window, now), expected);
        }

        #[test]
        fn prop_zero_window_refreshes_exactly_at_expiry(
            expires_at in timestamp(),
            offset_ms in -1_000_000i64..1_000_000,
        ) {
            let record = CredentialRecord::new("AKIA1", "s", "t", expires_at);
            let now = expires_at + ChronoDuration::milliseconds(offset_ms);

            prop_assert_eq!(record.needs_refresh_at(Duration::ZERO, now), offset_ms >= 0);
        }
    }
}
