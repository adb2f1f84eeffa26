use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::source::SourceKey;

/// Default User-Agent sent with outbound archive requests.
pub const DEFAULT_USER_AGENT: &str = "wind-toolkit/0.1";

/// Per-source overrides (e.g. a longer timeout for slow archives).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub timeout_secs: u64,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Optional default source key, e.g. "nasa_power" or "open_meteo".
    pub default_source: Option<String>,

    /// Overrides the User-Agent sent with outbound requests.
    pub user_agent: Option<String>,

    /// Example TOML:
    /// [sources.nasa_power]
    /// timeout_secs = 120
    pub sources: HashMap<String, SourceConfig>,
}

/// Resolved HTTP settings handed to a client constructor.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Config {
    /// Return the default source as a strongly-typed SourceKey.
    pub fn default_source_key(&self) -> Result<SourceKey> {
        let s = self.default_source.as_ref().ok_or_else(|| {
            anyhow!(
                "No default source configured.\n\
                 Hint: run `wind configure` (or pass --source) first."
            )
        })?;

        SourceKey::try_from(s.as_str())
    }

    /// Store default source as string.
    pub fn set_default_source(&mut self, key: SourceKey) {
        self.default_source = Some(key.as_str().to_string());
    }

    /// Request timeout for a source: explicit override, or the source's usual
    /// latency profile (the NASA archive is noticeably slower than Open-Meteo).
    pub fn source_timeout(&self, key: SourceKey) -> Duration {
        let default_secs = match key {
            SourceKey::NasaPower => 60,
            _ => 30,
        };
        let secs = self
            .sources
            .get(key.as_str())
            .map_or(default_secs, |cfg| cfg.timeout_secs);
        Duration::from_secs(secs)
    }

    /// Resolved HTTP options for a source's client constructor.
    pub fn http_options(&self, key: SourceKey) -> HttpOptions {
        HttpOptions {
            timeout: self.source_timeout(key),
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "wind-toolkit", "wind-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_source_key_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.default_source_key().unwrap_err();

        assert!(err.to_string().contains("No default source configured"));
    }

    #[test]
    fn set_default_source_roundtrips() {
        let mut cfg = Config::default();
        cfg.set_default_source(SourceKey::OpenMeteo);

        let key = cfg.default_source_key().expect("default source must exist");
        assert_eq!(key, SourceKey::OpenMeteo);
    }

    #[test]
    fn default_source_key_rejects_garbage_labels() {
        let cfg = Config {
            default_source: Some("doesnotexist".to_string()),
            ..Default::default()
        };

        let err = cfg.default_source_key().unwrap_err();
        assert!(err.to_string().contains("Unknown source"));
    }

    #[test]
    fn timeouts_fall_back_to_per_source_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.source_timeout(SourceKey::NasaPower), Duration::from_secs(60));
        assert_eq!(cfg.source_timeout(SourceKey::OpenMeteo), Duration::from_secs(30));
    }

    #[test]
    fn explicit_timeout_override_wins() {
        let mut cfg = Config::default();
        cfg.sources.insert(
            SourceKey::NasaPower.as_str().to_string(),
            SourceConfig { timeout_secs: 120 },
        );

        assert_eq!(cfg.source_timeout(SourceKey::NasaPower), Duration::from_secs(120));
        assert_eq!(cfg.source_timeout(SourceKey::OpenMeteo), Duration::from_secs(30));
    }

    #[test]
    fn http_options_use_default_user_agent_unless_overridden() {
        let cfg = Config::default();
        assert_eq!(cfg.http_options(SourceKey::OpenMeteo).user_agent, DEFAULT_USER_AGENT);

        let cfg = Config { user_agent: Some("custom/1.0".to_string()), ..Default::default() };
        assert_eq!(cfg.http_options(SourceKey::OpenMeteo).user_agent, "custom/1.0");
    }
}
