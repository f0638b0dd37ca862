//! Configuration management for curio.
//!
//! Loads configuration from ${CURIO_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for curio configuration and data directories.
    //!
    //! CURIO_HOME resolution order:
    //! 1. CURIO_HOME environment variable (if set)
    //! 2. $HOME/.config/curio (default)
    //! 3. ./.curio when no home directory is known

    use std::path::PathBuf;

    /// Returns the curio home directory.
    pub fn curio_home() -> PathBuf {
        if let Ok(home) = std::env::var("CURIO_HOME") {
            return PathBuf::from(home);
        }

        std::env::var_os("HOME").map_or_else(
            || PathBuf::from(".curio"),
            |h| PathBuf::from(h).join(".config").join("curio"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        curio_home().join("config.toml")
    }

    /// Returns the path to the persisted session file.
    pub fn session_path() -> PathBuf {
        curio_home().join("session.json")
    }

    /// Returns the directory for log files.
    pub fn logs_dir() -> PathBuf {
        curio_home().join("logs")
    }
}

/// Settings for the auth core and the hosted identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Base URL of the hosted auth service.
    pub url: String,
    /// Public API key sent as the `apikey` header.
    pub anon_key: String,
    /// Public site origin used to build the password-reset redirect.
    pub site_url: String,
    pub max_login_attempts: u32,
    pub lockout_window_secs: u64,
    pub monitor_interval_secs: u64,
    pub refresh_window_secs: u64,
    pub gate_timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
            site_url: "http://localhost:8080".to_string(),
            max_login_attempts: 5,
            lockout_window_secs: 15 * 60,
            monitor_interval_secs: 60,
            refresh_window_secs: 5 * 60,
            gate_timeout_secs: 5,
        }
    }
}

impl AuthConfig {
    pub fn lockout_window(&self) -> Duration {
        Duration::from_secs(self.lockout_window_secs)
    }

    pub fn monitor_interval(&self) -> Duration {
        // A zero interval would make tokio's interval panic.
        Duration::from_secs(self.monitor_interval_secs.max(1))
    }

    pub fn refresh_window(&self) -> Duration {
        Duration::from_secs(self.refresh_window_secs)
    }

    pub fn gate_timeout(&self) -> Duration {
        Duration::from_secs(self.gate_timeout_secs)
    }

    /// Where password-reset emails send the user back to.
    pub fn reset_redirect(&self) -> String {
        format!("{}/reset-password", self.site_url.trim_end_matches('/'))
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
}

impl Config {
    /// Loads configuration from the default path, then applies env overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&paths::config_path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// `CURIO_AUTH_URL` and `CURIO_ANON_KEY` win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("CURIO_AUTH_URL")
            && !url.trim().is_empty()
        {
            self.auth.url = url.trim().to_string();
        }
        if let Ok(key) = std::env::var("CURIO_ANON_KEY") {
            self.auth.anon_key = key.trim().to_string();
        }
    }

    /// Writes the default config template. Fails if the file exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.auth.max_login_attempts, 5);
        assert_eq!(config.auth.lockout_window(), Duration::from_secs(900));
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[auth]\nurl = \"https://auth.example.com\"\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.auth.url, "https://auth.example.com");
        assert_eq!(config.auth.gate_timeout_secs, 5);
        assert_eq!(config.auth.monitor_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let parsed: Config = toml::from_str(default_config_template()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nested").join("config.toml");

        Config::init(&config_path).unwrap();
        assert!(config_path.exists());

        let err = Config::init(&config_path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_reset_redirect_trims_trailing_slash() {
        let auth = AuthConfig {
            site_url: "https://curio.example/".to_string(),
            ..AuthConfig::default()
        };
        assert_eq!(auth.reset_redirect(), "https://curio.example/reset-password");
    }

    #[test]
    fn test_zero_monitor_interval_is_clamped() {
        let auth = AuthConfig {
            monitor_interval_secs: 0,
            ..AuthConfig::default()
        };
        assert_eq!(auth.monitor_interval(), Duration::from_secs(1));
    }
}
