//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/intake/config.toml)
//! 3. Environment variables (INTAKE_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::countries::DEFAULT_COUNTRIES_URL;

/// Environment variable prefix
const ENV_PREFIX: &str = "INTAKE";

/// Keys accepted by `Config::set`
pub const KEYS: [&str; 7] = [
    "server_addr",
    "server_url",
    "debounce_ms",
    "inactivity_ms",
    "countries_url",
    "data_dir",
    "log_file",
];

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the intake server binds to
    #[serde(default = "default_server_addr")]
    pub server_addr: String,

    /// Base URL clients use to reach the intake server
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Quiet period before a routine sync (milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Quiet period before the status becomes inactive (milliseconds)
    #[serde(default = "default_inactivity_ms")]
    pub inactivity_ms: u64,

    /// Source of the nationality option list
    #[serde(default = "default_countries_url")]
    pub countries_url: String,

    /// Directory for local files (logs)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log file for the terminal UIs (defaults to `{data_dir}/debug.log`)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            server_url: default_server_url(),
            debounce_ms: default_debounce_ms(),
            inactivity_ms: default_inactivity_ms(),
            countries_url: default_countries_url(),
            data_dir: default_data_dir(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (INTAKE_SERVER_URL, INTAKE_DEBOUNCE_MS, ...)
    /// 2. Config file (~/.config/intake/config.toml or INTAKE_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        for key in KEYS {
            let var = format!("{}_{}", ENV_PREFIX, key.to_ascii_uppercase());
            if let Ok(val) = std::env::var(&var) {
                if let Err(e) = self.set(key, &val) {
                    tracing::warn!("Ignoring {}: {}", var, e);
                }
            }
        }
    }

    /// Set a single key from its string form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "server_addr" => self.server_addr = value.to_string(),
            "server_url" => self.server_url = value.to_string(),
            "debounce_ms" => {
                self.debounce_ms = value
                    .parse()
                    .with_context(|| format!("Invalid debounce_ms: {}", value))?
            }
            "inactivity_ms" => {
                self.inactivity_ms = value
                    .parse()
                    .with_context(|| format!("Invalid inactivity_ms: {}", value))?
            }
            "countries_url" => self.countries_url = value.to_string(),
            "data_dir" => self.data_dir = PathBuf::from(value),
            // Empty string clears it
            "log_file" => {
                self.log_file = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            }
            _ => bail!("Unknown config key: {} (expected one of {})", key, KEYS.join(", ")),
        }
        Ok(())
    }

    /// Ensure data directory exists
    pub fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with INTAKE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("intake")
            .join("config.toml")
    }

    /// URL of the sync endpoint
    pub fn sync_url(&self) -> String {
        format!("{}/api/patient/sync", self.server_url.trim_end_matches('/'))
    }

    /// WebSocket URL of a relay channel
    pub fn channel_url(&self, channel: &str) -> String {
        let base = self.server_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}/api/channels/{}", base, channel)
    }

    /// Get the path of the UI log file
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("debug.log"))
    }
}

fn default_server_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_server_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_inactivity_ms() -> u64 {
    5000
}

fn default_countries_url() -> String {
    DEFAULT_COUNTRIES_URL.to_string()
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("intake")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "INTAKE_SERVER_ADDR",
        "INTAKE_SERVER_URL",
        "INTAKE_DEBOUNCE_MS",
        "INTAKE_INACTIVITY_MS",
        "INTAKE_COUNTRIES_URL",
        "INTAKE_DATA_DIR",
        "INTAKE_LOG_FILE",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server_addr, "0.0.0.0:3000");
        assert_eq!(config.server_url, "http://localhost:3000");
        assert_eq!(config.debounce_ms, 500);
        assert_eq!(config.inactivity_ms, 5000);
        assert_eq!(config.countries_url, DEFAULT_COUNTRIES_URL);
        assert!(config.data_dir.ends_with("intake"));
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_derived_urls() {
        let config = Config::default();
        assert_eq!(config.sync_url(), "http://localhost:3000/api/patient/sync");
        assert_eq!(
            config.channel_url("hospital-queue"),
            "ws://localhost:3000/api/channels/hospital-queue"
        );

        let config = Config {
            server_url: "https://intake.example.com/".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.sync_url(),
            "https://intake.example.com/api/patient/sync"
        );
        assert_eq!(
            config.channel_url("c"),
            "wss://intake.example.com/api/channels/c"
        );
    }

    #[test]
    fn test_log_path() {
        let mut config = Config {
            data_dir: PathBuf::from("/var/intake"),
            ..Config::default()
        };
        assert_eq!(config.log_path(), PathBuf::from("/var/intake/debug.log"));

        config.log_file = Some(PathBuf::from("/tmp/ui.log"));
        assert_eq!(config.log_path(), PathBuf::from("/tmp/ui.log"));
    }

    #[test]
    fn test_env_override_server_url() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("INTAKE_SERVER_URL", "http://10.0.0.5:3000");
        config.apply_env_overrides();

        assert_eq!(config.server_url, "http://10.0.0.5:3000");
    }

    #[test]
    fn test_env_override_timings() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("INTAKE_DEBOUNCE_MS", "250");
        env::set_var("INTAKE_INACTIVITY_MS", "not-a-number");
        config.apply_env_overrides();

        assert_eq!(config.debounce_ms, 250);
        // Unparseable values are ignored
        assert_eq!(config.inactivity_ms, 5000);
    }

    #[test]
    fn test_env_override_log_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("INTAKE_LOG_FILE", "/tmp/intake.log");
        config.apply_env_overrides();
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/intake.log")));

        // Empty string clears it
        env::set_var("INTAKE_LOG_FILE", "");
        config.apply_env_overrides();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_set_unknown_key() {
        let mut config = Config::default();
        let err = config.set("favorite_tag", "x").unwrap_err();
        assert!(err.to_string().contains("Unknown config key"));
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            server_url = "http://clinic.local:3000"
            debounce_ms = 300
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.server_url, "http://clinic.local:3000");
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.inactivity_ms, 5000);
    }

    #[test]
    fn test_save_and_load() {
        let _guard = EnvGuard::new(ENV_VARS);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("inactivity_ms", "8000").unwrap();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.inactivity_ms, 8000);
        assert_eq!(loaded.server_url, config.server_url);

        let overridden = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(overridden.inactivity_ms, 8000);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.debounce_ms, 500);
    }
}
