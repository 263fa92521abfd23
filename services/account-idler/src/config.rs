//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Every section is optional; a missing default config file means built-in
//! defaults. Credentials never live here, they come from the roster file.

use serde::Deserialize;
use session_pool::{SessionPolicy, StartupScheduler};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "account-idler.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub roster: RosterConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Where the account roster is read from
#[derive(Debug, Deserialize)]
pub struct RosterConfig {
    #[serde(default = "default_roster_path")]
    pub path: PathBuf,
}

/// Startup stagger and retry timing, all in seconds
#[derive(Debug, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_start_gap_min")]
    pub start_gap_min_secs: u64,
    #[serde(default = "default_start_gap_max")]
    pub start_gap_max_secs: u64,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_conflict_retry")]
    pub conflict_retry_secs: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct GuardConfig {
    /// Ask a human after this many automated codes were rejected in a row.
    #[serde(default)]
    pub max_automated_rejections: Option<u32>,
}

/// Prometheus exporter; disabled unless `listen_addr` is set
#[derive(Debug, Default, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub listen_addr: Option<SocketAddr>,
}

fn default_roster_path() -> PathBuf {
    PathBuf::from("accounts.json")
}

fn default_start_gap_min() -> u64 {
    12
}

fn default_start_gap_max() -> u64 {
    20
}

fn default_reconnect_delay() -> u64 {
    30 * 60
}

fn default_conflict_retry() -> u64 {
    2 * 60 * 60
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            path: default_roster_path(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            start_gap_min_secs: default_start_gap_min(),
            start_gap_max_secs: default_start_gap_max(),
            reconnect_delay_secs: default_reconnect_delay(),
            conflict_retry_secs: default_conflict_retry(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Roster path resolution order:
    /// 1. ROSTER_PATH env var
    /// 2. `[roster] path` from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.finish()
    }

    /// Like `load`, but a missing file at the default path yields defaults.
    /// An explicitly chosen path must exist.
    pub fn load_or_default(path: &Path) -> common::Result<Self> {
        if path == Path::new(DEFAULT_CONFIG_PATH) && !path.exists() {
            return Config::default().finish();
        }
        Self::load(path)
    }

    fn finish(mut self) -> common::Result<Self> {
        if let Ok(roster) = std::env::var("ROSTER_PATH") {
            self.roster.path = PathBuf::from(roster);
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> common::Result<()> {
        let schedule = &self.schedule;
        if schedule.start_gap_min_secs > schedule.start_gap_max_secs {
            return Err(common::Error::Config(format!(
                "start_gap_min_secs ({}) must not exceed start_gap_max_secs ({})",
                schedule.start_gap_min_secs, schedule.start_gap_max_secs
            )));
        }

        if schedule.reconnect_delay_secs == 0 {
            return Err(common::Error::Config(
                "reconnect_delay_secs must be greater than 0".into(),
            ));
        }

        if schedule.conflict_retry_secs == 0 {
            return Err(common::Error::Config(
                "conflict_retry_secs must be greater than 0".into(),
            ));
        }

        if self.guard.max_automated_rejections == Some(0) {
            return Err(common::Error::Config(
                "max_automated_rejections must be at least 1 when set".into(),
            ));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    pub fn startup_scheduler(&self) -> StartupScheduler {
        StartupScheduler::new(
            Duration::from_secs(self.schedule.start_gap_min_secs),
            Duration::from_secs(self.schedule.start_gap_max_secs),
        )
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            reconnect_delay: Duration::from_secs(self.schedule.reconnect_delay_secs),
            conflict_retry_period: Duration::from_secs(self.schedule.conflict_retry_secs),
            max_automated_rejections: self.guard.max_automated_rejections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that read or mutate environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("account-idler.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_full_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("ROSTER_PATH") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[roster]
path = "/etc/idler/accounts.json"

[schedule]
start_gap_min_secs = 5
start_gap_max_secs = 9
reconnect_delay_secs = 600
conflict_retry_secs = 3600

[guard]
max_automated_rejections = 3

[metrics]
listen_addr = "127.0.0.1:9100"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.roster.path, PathBuf::from("/etc/idler/accounts.json"));
        assert_eq!(config.schedule.start_gap_min_secs, 5);
        assert_eq!(config.guard.max_automated_rejections, Some(3));
        assert_eq!(
            config.metrics.listen_addr,
            Some("127.0.0.1:9100".parse().unwrap())
        );

        let policy = config.session_policy();
        assert_eq!(policy.reconnect_delay, Duration::from_secs(600));
        assert_eq!(policy.conflict_retry_period, Duration::from_secs(3600));
        assert_eq!(policy.max_automated_rejections, Some(3));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("ROSTER_PATH") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.roster.path, PathBuf::from("accounts.json"));
        assert_eq!(config.schedule.start_gap_min_secs, 12);
        assert_eq!(config.schedule.start_gap_max_secs, 20);
        assert_eq!(config.schedule.reconnect_delay_secs, 1800);
        assert_eq!(config.schedule.conflict_retry_secs, 7200);
        assert!(config.guard.max_automated_rejections.is_none());
        assert!(config.metrics.listen_addr.is_none());
    }

    #[test]
    fn test_roster_path_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[roster]\npath = \"from-file.json\"\n");

        unsafe { set_env("ROSTER_PATH", "/env/accounts.json") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("ROSTER_PATH") };

        assert_eq!(config.roster.path, PathBuf::from("/env/accounts.json"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/account-idler.toml"));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        let result = Config::load(&path);
        assert!(matches!(result, Err(common::Error::Toml(_))));
    }

    #[test]
    fn test_missing_default_file_falls_back_to_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("ROSTER_PATH") };
        let dir = tempfile::tempdir().unwrap();
        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let result = Config::load_or_default(Path::new(DEFAULT_CONFIG_PATH));
        std::env::set_current_dir(cwd).unwrap();

        let config = result.unwrap();
        assert_eq!(config.schedule.reconnect_delay_secs, 1800);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = Config::load_or_default(Path::new("/nonexistent/custom.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_reversed_start_gap_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[schedule]\nstart_gap_min_secs = 30\nstart_gap_max_secs = 10\n",
        );
        let err = Config::load(&path).unwrap_err();
        assert!(
            err.to_string().contains("start_gap_min_secs"),
            "got: {err}"
        );
    }

    #[test]
    fn test_zero_periods_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let path = write_config(&dir, "[schedule]\nreconnect_delay_secs = 0\n");
        assert!(Config::load(&path).is_err());

        let path = write_config(&dir, "[schedule]\nconflict_retry_secs = 0\n");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_zero_rejection_threshold_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[guard]\nmax_automated_rejections = 0\n");
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("max_automated_rejections"));
    }

    #[test]
    fn test_equal_start_gap_bounds_accepted() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[schedule]\nstart_gap_min_secs = 15\nstart_gap_max_secs = 15\n",
        );
        let config = Config::load(&path).unwrap();
        let slots = config.startup_scheduler().plan(3);
        assert_eq!(slots[2].offset, Duration::from_secs(30));
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = Config::resolve_path(Some("/custom/path.toml"));
        assert_eq!(path, PathBuf::from("/custom/path.toml"));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("/env/path.toml"));
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn test_resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        assert_eq!(
            path,
            PathBuf::from("/cli/wins.toml"),
            "CLI arg must take precedence over CONFIG_PATH env var"
        );
        unsafe { remove_env("CONFIG_PATH") };
    }
}
